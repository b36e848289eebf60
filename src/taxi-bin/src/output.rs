// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Frame and trace writers.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use taxi_core::{Frame, Trace};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `<start_index> <seconds>` per line
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Serialize)]
struct FrameRecord<'a> {
    file: &'a str,
    channel: &'a str,
    start_index: usize,
    code: u64,
    seconds_of_day: u64,
    sub_second: u32,
    time: f64,
    valid: bool,
}

/// Writes decoded frames of successive channels to one sink.
pub struct FrameWriter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn write_channel(&mut self, file: &str, channel: &str, frames: &[Frame]) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                for frame in frames {
                    writeln!(self.out, "{} {:.6}", frame.start_index, frame.decoded_time())?;
                }
            }
            OutputFormat::Json => {
                for frame in frames {
                    let record = FrameRecord {
                        file,
                        channel,
                        start_index: frame.start_index,
                        code: frame.code,
                        seconds_of_day: frame.time.seconds_of_day,
                        sub_second: frame.time.sub_second,
                        time: frame.decoded_time(),
                        valid: frame.time.is_valid(),
                    };
                    serde_json::to_writer(&mut self.out, &record)?;
                    self.out.write_all(b"\n")?;
                }
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// One sample value per line, as read back by the text trace loader.
pub fn write_levels<W: Write>(trace: &Trace, mut out: W) -> io::Result<()> {
    for sample in &trace.samples {
        writeln!(out, "{}", sample)?;
    }
    out.flush()
}

// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Batch decoding over input files.
//!
//! Every file and every channel is decoded independently. The only state
//! carried between files is the last good frame time, used in warnings.

use std::io::Write;
use std::path::Path;

use tracing::{debug, error, info, warn};

use taxi_core::{DynResult, Frame};
use taxi_time::{DecodeError, FrameDecoder};

use crate::config::DecodeSettings;
use crate::input::{load_channels, Channel, LoadOptions};
use crate::output::FrameWriter;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub files: usize,
    pub failed_files: usize,
    pub channels: usize,
    pub empty_channels: usize,
    pub failed_channels: usize,
    pub frames: usize,
    pub out_of_range: usize,
    pub truncated: usize,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed_files == 0 && self.failed_channels == 0
    }
}

pub struct BatchDecoder<'a> {
    settings: &'a DecodeSettings,
    load: LoadOptions<'a>,
    last_good_time: Option<f64>,
    summary: BatchSummary,
}

impl<'a> BatchDecoder<'a> {
    pub fn new(settings: &'a DecodeSettings, load: LoadOptions<'a>) -> Self {
        Self {
            settings,
            load,
            last_good_time: None,
            summary: BatchSummary::default(),
        }
    }

    pub fn summary(&self) -> &BatchSummary {
        &self.summary
    }

    pub fn last_good_time(&self) -> Option<f64> {
        self.last_good_time
    }

    /// Decode every channel of one file. Load failures are logged and
    /// counted; only output errors are returned.
    pub fn run_file<W: Write>(&mut self, path: &Path, out: &mut FrameWriter<W>) -> DynResult<()> {
        self.summary.files += 1;
        let channels = match load_channels(path, &self.load) {
            Ok(channels) => channels,
            Err(e) => {
                error!("{}", e);
                self.summary.failed_files += 1;
                return Ok(());
            }
        };

        let file = path.display().to_string();
        for channel in &channels {
            self.summary.channels += 1;
            match self.decode_channel(channel) {
                Ok(frames) => {
                    self.report(&file, &channel.name, &frames);
                    out.write_channel(&file, &channel.name, &frames)?;
                }
                Err(e) => {
                    error!("{} channel {}: {}", file, channel.name, e);
                    self.summary.failed_channels += 1;
                }
            }
        }
        Ok(())
    }

    fn decode_channel(&mut self, channel: &Channel) -> Result<Vec<Frame>, DecodeError> {
        let decoder = FrameDecoder::for_trace(&self.settings.timing, &channel.trace)?;
        debug!(
            "channel {}: {} samples ({:.3e} s), {:.3} samples/bit",
            channel.name,
            channel.trace.len(),
            channel.trace.duration(),
            decoder.bit_samples()
        );

        let mut iter = decoder.frames(&channel.trace.samples);
        let frames: Vec<Frame> = iter.by_ref().collect();
        if let Some(start_index) = iter.truncated() {
            self.summary.truncated += 1;
            if self.settings.strict {
                return Err(DecodeError::Truncated {
                    start_index,
                    decoded: frames,
                });
            }
            debug!(
                "channel {}: dropped partial frame at sample {}",
                channel.name, start_index
            );
        }
        Ok(frames)
    }

    fn report(&mut self, file: &str, channel: &str, frames: &[Frame]) {
        let Some(first) = frames.first() else {
            self.summary.empty_channels += 1;
            match self.last_good_time {
                Some(t) => warn!("{} channel {}: no frames (last good time {:.6})", file, channel, t),
                None => warn!("{} channel {}: no frames", file, channel),
            }
            return;
        };

        self.summary.frames += frames.len();
        self.last_good_time = Some(first.decoded_time());

        let out_of_range = frames.iter().filter(|f| !f.time.is_valid()).count();
        if out_of_range > 0 {
            self.summary.out_of_range += out_of_range;
            warn!(
                "{} channel {}: {} of {} frames outside a day",
                file,
                channel,
                out_of_range,
                frames.len()
            );
        }
        info!(
            "{} channel {}: {} frames, first {:.6}",
            file,
            channel,
            frames.len(),
            first.decoded_time()
        );
    }
}

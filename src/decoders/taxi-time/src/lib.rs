// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! TAXI timestamp frame decoder.
//!
//! Frames are separated by a silent gap of several bit durations. Inside a
//! frame a start bit is followed by the data bits, with one sync bit after
//! every eight data bits. Each bit is sampled in the middle of its slot.

use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use taxi_core::{Frame, Trace};

pub const DEFAULT_BAUD: f64 = 25e6;
pub const DEFAULT_NUM_BITS: usize = 35;
pub const DEFAULT_FRAME_GAP_BITS: f64 = 8.5;
pub const DEFAULT_THRESHOLD: f64 = 0.0;
pub const MAX_NUM_BITS: usize = 64;

/// Data bits between two sync bits.
const SYNC_INTERVAL: usize = 8;
/// Start bit plus half a bit: centre of the first data slot.
const FIRST_BIT_OFFSET: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("sample interval must be finite and > 0, got {0}")]
    InvalidInterval(f64),

    #[error("invalid decoder configuration: {0}")]
    InvalidConfig(String),

    #[error("trace ends inside the frame starting at sample {start_index}")]
    Truncated {
        start_index: usize,
        /// Frames completed before the truncated one
        decoded: Vec<Frame>,
    },
}

/// Bit timing and thresholding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Line rate in bits per second
    pub baud: f64,
    /// Logical bits per frame, sync bits excluded
    pub num_bits: usize,
    /// Silence between frames, in bit durations
    pub frame_gap_bits: f64,
    /// Samples strictly above this level read as high
    pub threshold: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            num_bits: DEFAULT_NUM_BITS,
            frame_gap_bits: DEFAULT_FRAME_GAP_BITS,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), DecodeError> {
        if !self.baud.is_finite() || self.baud <= 0.0 {
            return Err(DecodeError::InvalidConfig(format!(
                "baud must be finite and > 0, got {}",
                self.baud
            )));
        }
        if self.num_bits == 0 || self.num_bits > MAX_NUM_BITS {
            return Err(DecodeError::InvalidConfig(format!(
                "num_bits must be in 1..={}, got {}",
                MAX_NUM_BITS, self.num_bits
            )));
        }
        if !self.frame_gap_bits.is_finite() || self.frame_gap_bits <= 0.0 {
            return Err(DecodeError::InvalidConfig(format!(
                "frame_gap_bits must be finite and > 0, got {}",
                self.frame_gap_bits
            )));
        }
        if self.threshold.is_nan() {
            return Err(DecodeError::InvalidConfig("threshold must not be NaN".into()));
        }
        Ok(())
    }
}

/// Decoder bound to one sample interval.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    num_bits: usize,
    threshold: f64,
    bit_samples: f64,
    gap_samples: f64,
}

impl FrameDecoder {
    pub fn new(config: &DecoderConfig, interval: f64) -> Result<Self, DecodeError> {
        config.validate()?;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(DecodeError::InvalidInterval(interval));
        }
        let bit_samples = 1.0 / config.baud / interval;
        let gap_samples = config.frame_gap_bits * bit_samples;
        if !bit_samples.is_finite() || !gap_samples.is_finite() {
            return Err(DecodeError::InvalidInterval(interval));
        }
        Ok(Self {
            num_bits: config.num_bits,
            threshold: config.threshold,
            bit_samples,
            gap_samples,
        })
    }

    pub fn for_trace(config: &DecoderConfig, trace: &Trace) -> Result<Self, DecodeError> {
        Self::new(config, trace.interval)
    }

    /// Samples per transmitted bit.
    pub fn bit_samples(&self) -> f64 {
        self.bit_samples
    }

    /// Minimum edge spacing, in samples, that opens a new frame.
    pub fn gap_samples(&self) -> f64 {
        self.gap_samples
    }

    /// Lazily decode `samples`. Every call scans from the beginning.
    pub fn frames<'a>(&self, samples: &'a [f64]) -> Frames<'a> {
        Frames {
            samples,
            num_bits: self.num_bits,
            threshold: self.threshold,
            bit_samples: self.bit_samples,
            gap_samples: self.gap_samples,
            cursor: 0,
            done: false,
            truncated: None,
        }
    }

    /// Decode all complete frames; a trailing partial frame is dropped.
    pub fn decode(&self, samples: &[f64]) -> Vec<Frame> {
        self.frames(samples).collect()
    }

    /// Like [`FrameDecoder::decode`], but a trailing partial frame is an error.
    pub fn decode_strict(&self, samples: &[f64]) -> Result<Vec<Frame>, DecodeError> {
        let mut frames = self.frames(samples);
        let decoded: Vec<Frame> = frames.by_ref().collect();
        match frames.truncated() {
            Some(start_index) => Err(DecodeError::Truncated {
                start_index,
                decoded,
            }),
            None => Ok(decoded),
        }
    }
}

/// Iterator over the frames of one sample slice.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    samples: &'a [f64],
    num_bits: usize,
    threshold: f64,
    bit_samples: f64,
    gap_samples: f64,
    cursor: usize,
    done: bool,
    truncated: Option<usize>,
}

impl Frames<'_> {
    /// Start index of a frame that was dropped because the samples ran out.
    /// Only meaningful once the iterator is exhausted.
    pub fn truncated(&self) -> Option<usize> {
        self.truncated
    }

    fn level(&self, index: usize) -> Option<bool> {
        self.samples.get(index).map(|&s| s > self.threshold)
    }

    // Index 0 has no predecessor and never counts as an edge.
    fn is_edge(&self, index: usize) -> bool {
        if index == 0 {
            return false;
        }
        match (self.level(index - 1), self.level(index)) {
            (Some(prev), Some(cur)) => prev != cur,
            _ => false,
        }
    }

    fn find_frame_start(&self) -> Option<usize> {
        let mut last_edge = self.cursor;
        for i in self.cursor..self.samples.len() {
            if !self.is_edge(i) {
                continue;
            }
            if ((i - last_edge) as f64) < self.gap_samples {
                last_edge = i;
                continue;
            }
            return Some(i);
        }
        None
    }

    fn sample_code(&self, start: usize) -> Option<u64> {
        let mut code = 0u64;
        for bit in 0..self.num_bits {
            let slot = bit + bit / SYNC_INTERVAL;
            // Saturates for huge bit durations; past the end either way.
            let offset = ((slot as f64 + FIRST_BIT_OFFSET) * self.bit_samples).round() as usize;
            let high = self.level(start.checked_add(offset)?)?;
            code = (code << 1) | u64::from(high);
        }
        Some(code)
    }
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.done {
            return None;
        }
        let Some(start) = self.find_frame_start() else {
            self.done = true;
            return None;
        };
        match self.sample_code(start) {
            Some(code) => {
                self.cursor = start;
                Some(Frame::new(start, code))
            }
            None => {
                self.done = true;
                self.truncated = Some(start);
                None
            }
        }
    }
}

impl FusedIterator for Frames<'_> {}

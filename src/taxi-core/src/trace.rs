// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

/// A uniformly sampled recording of one channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    /// Seconds per sample
    pub interval: f64,
    pub samples: Vec<f64>,
}

impl Trace {
    pub fn new(interval: f64, samples: Vec<f64>) -> Self {
        Self { interval, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        1.0 / self.interval
    }

    /// Recorded duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 * self.interval
    }
}

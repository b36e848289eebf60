// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Decoded TAXI timestamp frames.

use serde::{Deserialize, Serialize};

/// Width of the sub-second field at the bottom of a frame code.
pub const SUB_SECOND_BITS: u32 = 19;
/// Duration of one sub-second count.
pub const SUB_SECOND_UNIT_S: f64 = 2e-6;
/// Sub-second counts per second (1 s / 2 µs).
pub const SUB_SECOND_PER_SECOND: u32 = 500_000;
pub const SECONDS_PER_DAY: u64 = 86_400;

const SUB_SECOND_MASK: u64 = (1 << SUB_SECOND_BITS) - 1;

/// Time-of-day fields packed into a frame code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub seconds_of_day: u64,
    /// Counts of 2 µs
    pub sub_second: u32,
}

impl TimeOfDay {
    /// Split a frame code into seconds-of-day (upper bits) and the 19-bit
    /// sub-second count (lower bits).
    pub fn from_code(code: u64) -> Self {
        Self {
            seconds_of_day: code >> SUB_SECOND_BITS,
            sub_second: (code & SUB_SECOND_MASK) as u32,
        }
    }

    pub fn as_seconds(self) -> f64 {
        self.seconds_of_day as f64 + f64::from(self.sub_second) * SUB_SECOND_UNIT_S
    }

    /// Whether both fields fall within a single day.
    ///
    /// Decoding never rejects out-of-range values; this is for reporting.
    pub fn is_valid(self) -> bool {
        self.seconds_of_day < SECONDS_PER_DAY && self.sub_second < SUB_SECOND_PER_SECOND
    }
}

/// One decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Sample index of the edge that opened the frame
    pub start_index: usize,
    /// Raw bits, MSB first
    pub code: u64,
    pub time: TimeOfDay,
}

impl Frame {
    pub fn new(start_index: usize, code: u64) -> Self {
        Self {
            start_index,
            code,
            time: TimeOfDay::from_code(code),
        }
    }

    /// Seconds of day including the fractional part.
    pub fn decoded_time(&self) -> f64 {
        self.time.as_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_code_into_fields() {
        let code = (86_399u64 << 19) | 250_000;
        let tod = TimeOfDay::from_code(code);
        assert_eq!(tod.seconds_of_day, 86_399);
        assert_eq!(tod.sub_second, 250_000);
        assert_eq!(tod.as_seconds(), 86_399.5);
        assert!(tod.is_valid());
    }

    #[test]
    fn flags_out_of_range_fields() {
        assert!(!TimeOfDay::from_code(86_400 << 19).is_valid());
        assert!(!TimeOfDay::from_code(500_000).is_valid());
        assert!(TimeOfDay::from_code(499_999).is_valid());
    }

    #[test]
    fn frame_reports_decoded_time() {
        let frame = Frame::new(42, (12 << 19) | 1);
        assert_eq!(frame.start_index, 42);
        assert!((frame.decoded_time() - 12.000_002).abs() < 1e-9);
    }
}

// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! VCD capture to uniformly sampled trace.
//!
//! One scalar signal is pulled out of a simulation dump and held between
//! value changes, producing one sample per tick of the target sample rate.

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use vcd::{Command, IdCode, Parser, ScopeItem, Value};

use taxi_core::Trace;

#[derive(Debug, Error)]
pub enum VcdError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("VCD parse error: {0}")]
    Parse(String),

    #[error("VCD header has no $timescale")]
    MissingTimescale,

    #[error("signal '{0}' not found in VCD header")]
    SignalNotFound(String),

    #[error("signal '{name}' is {size} bits wide, expected a scalar")]
    NotScalar { name: String, size: u32 },

    #[error("timestamp #{current} follows #{previous}")]
    TimeWentBackwards { previous: u64, current: u64 },

    #[error("invalid resample configuration: {0}")]
    InvalidConfig(String),
}

/// Resampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Reference name of the signal to extract
    pub signal: String,
    /// Output sample rate in Hz
    pub sample_rate: f64,
    /// Sample value written while the signal is high
    pub high_value: f64,
    /// Sample value written while the signal is low, x or z
    pub low_value: f64,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            signal: "o_timing".to_string(),
            sample_rate: 625e6,
            high_value: 250.0,
            low_value: 0.0,
        }
    }
}

impl ResampleConfig {
    pub fn validate(&self) -> Result<(), VcdError> {
        if self.signal.trim().is_empty() {
            return Err(VcdError::InvalidConfig("signal must not be empty".into()));
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(VcdError::InvalidConfig(format!(
                "sample_rate must be finite and > 0, got {}",
                self.sample_rate
            )));
        }
        Ok(())
    }
}

/// A value change of the extracted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Time in VCD ticks
    pub time: u64,
    pub high: bool,
}

/// Value changes of one signal plus the tick length.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDump {
    /// Timescale multiplier and ticks per second, e.g. `(1, 10^15)` for 1 fs
    pub timescale: (u32, u64),
    pub transitions: Vec<Transition>,
}

impl SignalDump {
    /// Index of the output sample at or before `time`.
    fn sample_index(&self, time: u64, sample_rate: f64) -> usize {
        let (mult, per_second) = self.timescale;
        let ticks = time as f64 * f64::from(mult);
        (ticks * sample_rate / per_second as f64).floor() as usize
    }
}

fn find_scalar(items: &[ScopeItem], name: &str) -> Result<Option<IdCode>, VcdError> {
    for item in items {
        match item {
            ScopeItem::Var(var) if var.reference == name => {
                if var.size != 1 {
                    return Err(VcdError::NotScalar {
                        name: name.to_string(),
                        size: var.size,
                    });
                }
                return Ok(Some(var.code));
            }
            ScopeItem::Scope(scope) => {
                if let Some(code) = find_scalar(&scope.items, name)? {
                    return Ok(Some(code));
                }
            }
            _ => {}
        }
    }
    Ok(None)
}

/// Read every value change of `signal` from a VCD stream.
pub fn read_signal<R: BufRead>(reader: R, signal: &str) -> Result<SignalDump, VcdError> {
    let mut parser = Parser::new(reader);
    let header = parser
        .parse_header()
        .map_err(|e| VcdError::Parse(e.to_string()))?;
    let (mult, unit) = header.timescale.ok_or(VcdError::MissingTimescale)?;
    let code = find_scalar(&header.items, signal)?
        .ok_or_else(|| VcdError::SignalNotFound(signal.to_string()))?;

    let mut time = 0u64;
    let mut transitions = Vec::new();
    for command in parser {
        match command.map_err(|e| VcdError::Parse(e.to_string()))? {
            Command::Timestamp(t) => {
                if t < time {
                    return Err(VcdError::TimeWentBackwards {
                        previous: time,
                        current: t,
                    });
                }
                time = t;
            }
            Command::ChangeScalar(id, value) if id == code => {
                transitions.push(Transition {
                    time,
                    high: value == Value::V1,
                });
            }
            _ => {}
        }
    }
    debug!(
        "read {} transitions of '{}' (timescale {}/{} s)",
        transitions.len(),
        signal,
        mult,
        unit.divisor()
    );

    Ok(SignalDump {
        timescale: (mult, unit.divisor()),
        transitions,
    })
}

/// Hold each level until the next change. Nothing is emitted after the
/// final change since its duration is unknown.
pub fn resample(dump: &SignalDump, config: &ResampleConfig) -> Trace {
    let mut samples = Vec::new();
    let mut level = config.low_value;
    for transition in &dump.transitions {
        let index = dump.sample_index(transition.time, config.sample_rate);
        if index > samples.len() {
            samples.resize(index, level);
        }
        level = if transition.high {
            config.high_value
        } else {
            config.low_value
        };
    }
    Trace::new(1.0 / config.sample_rate, samples)
}

/// Extract `config.signal` from a VCD stream and resample it.
pub fn resample_vcd<R: BufRead>(reader: R, config: &ResampleConfig) -> Result<Trace, VcdError> {
    config.validate()?;
    let dump = read_signal(reader, &config.signal)?;
    Ok(resample(&dump, config))
}

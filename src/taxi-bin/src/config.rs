// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for the `taxi` tool.
//!
//! Config is loaded from the `[taxi]` section of `taxi-rs.toml`.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./taxi-rs.toml`
//! 3. `~/.config/taxi-rs/taxi-rs.toml`
//! 4. `/etc/taxi-rs/taxi-rs.toml`
//!
//! CLI arguments override config file values.

use serde::{Deserialize, Serialize};
use taxi_app::{parse_level, ConfigFile};
use taxi_time::DecoderConfig;
use taxi_vcd::ResampleConfig;

use crate::output::OutputFormat;

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxiConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Frame decoder settings
    pub decoder: DecodeSettings,
    /// VCD resampling settings
    pub vcd: ResampleConfig,
    /// Output settings
    pub output: OutputConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// Frame decoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeSettings {
    /// Bit timing and threshold
    #[serde(flatten)]
    pub timing: DecoderConfig,
    /// Seconds per sample for inputs that do not carry one (text traces)
    pub interval: Option<f64>,
    /// Channel names read from MAT files
    pub channels: Vec<String>,
    /// Treat a trailing partial frame as an error
    pub strict: bool,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            timing: DecoderConfig::default(),
            interval: None,
            channels: ["A", "B", "C", "D"].iter().map(|c| c.to_string()).collect(),
            strict: false,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Frame output format: "text" or "json"
    pub format: OutputFormat,
}

impl ConfigFile for TaxiConfig {
    fn section_key() -> &'static str {
        "taxi"
    }
}

impl TaxiConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(level) = self.general.log_level.as_deref() {
            if parse_level(level).is_none() {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ));
            }
        }

        self.decoder
            .timing
            .validate()
            .map_err(|e| format!("[decoder]: {}", e))?;
        if let Some(interval) = self.decoder.interval {
            if !interval.is_finite() || interval <= 0.0 {
                return Err(format!("[decoder].interval must be > 0, got {}", interval));
            }
        }
        if self.decoder.channels.iter().all(|c| c.trim().is_empty()) {
            return Err("[decoder].channels must name at least one channel".to_string());
        }

        self.vcd.validate().map_err(|e| format!("[vcd]: {}", e))?;
        Ok(())
    }

    /// Example configuration under the `[taxi]` section header.
    pub fn example_combined_toml() -> String {
        #[derive(Serialize)]
        struct Wrapper {
            taxi: TaxiConfig,
        }
        let example = TaxiConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            decoder: DecodeSettings {
                interval: Some(1.6e-9),
                ..DecodeSettings::default()
            },
            ..TaxiConfig::default()
        };
        toml::to_string_pretty(&Wrapper { taxi: example }).unwrap_or_default()
    }
}

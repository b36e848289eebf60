// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;
mod decode;
mod input;
mod output;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::info;

use taxi_app::{init_logging, ConfigFile};
use taxi_core::DynResult;

use config::TaxiConfig;
use decode::BatchDecoder;
use input::{InputError, LoadOptions};
use output::{write_levels, FrameWriter, OutputFormat};

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - TAXI timestamp decoder");

#[derive(Debug, Parser)]
#[command(
    name = "taxi",
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode timestamp frames from MAT, text or VCD captures
    Decode(DecodeArgs),
    /// Resample one VCD signal into a text trace
    Vcd(VcdArgs),
}

#[derive(Debug, Args)]
struct DecodeArgs {
    /// Input files
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,
    /// Line rate in bits per second
    #[arg(long)]
    baud: Option<f64>,
    /// Data bits per frame
    #[arg(long = "bits")]
    num_bits: Option<usize>,
    /// Inter-frame gap in bit durations
    #[arg(long = "gap-bits")]
    frame_gap_bits: Option<f64>,
    /// Samples above this level are high
    #[arg(long, allow_hyphen_values = true)]
    threshold: Option<f64>,
    /// Seconds per sample for text traces
    #[arg(long)]
    interval: Option<f64>,
    /// MAT channel to decode (repeatable)
    #[arg(short = 'c', long = "channel")]
    channels: Vec<String>,
    /// Output format
    #[arg(short = 'f', long, value_enum)]
    format: Option<OutputFormat>,
    /// Write frames here instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Fail a channel whose last frame is cut off
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Args)]
struct VcdArgs {
    /// VCD input file
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Output file (default: INPUT with ".txt" appended)
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Signal reference name
    #[arg(short = 's', long)]
    signal: Option<String>,
    /// Output sample rate in Hz
    #[arg(long = "sample-rate")]
    sample_rate: Option<f64>,
    /// Value written for high samples
    #[arg(long, allow_hyphen_values = true)]
    high: Option<f64>,
    /// Value written for low samples
    #[arg(long, allow_hyphen_values = true)]
    low: Option<f64>,
}

impl DecodeArgs {
    fn apply(&self, cfg: &mut TaxiConfig) {
        let timing = &mut cfg.decoder.timing;
        if let Some(baud) = self.baud {
            timing.baud = baud;
        }
        if let Some(bits) = self.num_bits {
            timing.num_bits = bits;
        }
        if let Some(gap) = self.frame_gap_bits {
            timing.frame_gap_bits = gap;
        }
        if let Some(threshold) = self.threshold {
            timing.threshold = threshold;
        }
        if self.interval.is_some() {
            cfg.decoder.interval = self.interval;
        }
        if !self.channels.is_empty() {
            cfg.decoder.channels = self.channels.clone();
        }
        if let Some(format) = self.format {
            cfg.output.format = format;
        }
        cfg.decoder.strict |= self.strict;
    }
}

impl VcdArgs {
    fn apply(&self, cfg: &mut TaxiConfig) {
        if let Some(ref signal) = self.signal {
            cfg.vcd.signal = signal.clone();
        }
        if let Some(rate) = self.sample_rate {
            cfg.vcd.sample_rate = rate;
        }
        if let Some(high) = self.high {
            cfg.vcd.high_value = high;
        }
        if let Some(low) = self.low {
            cfg.vcd.low_value = low;
        }
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let mut name = self.input.clone().into_os_string();
            name.push(".txt");
            PathBuf::from(name)
        })
    }
}

fn open_output(path: Option<&Path>) -> DynResult<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| {
            format!("failed to create {}: {}", path.display(), e)
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn run_decode(cfg: &TaxiConfig, args: &DecodeArgs) -> DynResult<()> {
    let load = LoadOptions {
        interval: cfg.decoder.interval,
        channels: &cfg.decoder.channels,
        vcd: &cfg.vcd,
    };
    let mut batch = BatchDecoder::new(&cfg.decoder, load);
    let mut writer = FrameWriter::new(open_output(args.output.as_deref())?, cfg.output.format);

    for path in &args.files {
        batch.run_file(path, &mut writer)?;
    }
    writer.flush()?;

    let summary = batch.summary();
    info!(
        "decoded {} frames from {} channels in {} files ({} empty, {} truncated, {} out of range)",
        summary.frames,
        summary.channels,
        summary.files,
        summary.empty_channels,
        summary.truncated,
        summary.out_of_range
    );
    if let Some(t) = batch.last_good_time() {
        info!("last good time {:.6}", t);
    }
    if !summary.is_success() {
        return Err(format!(
            "{} of {} files and {} channels failed",
            summary.failed_files, summary.files, summary.failed_channels
        )
        .into());
    }
    Ok(())
}

fn run_vcd(cfg: &TaxiConfig, args: &VcdArgs) -> DynResult<()> {
    let reader = File::open(&args.input)
        .map(io::BufReader::new)
        .map_err(|source| InputError::Io {
            path: args.input.clone(),
            source,
        })?;
    let trace = taxi_vcd::resample_vcd(reader, &cfg.vcd)
        .map_err(|e| format!("{}: {}", args.input.display(), e))?;

    let out_path = args.output_path();
    write_levels(&trace, open_output(Some(&out_path))?)?;
    info!(
        "wrote {} samples ({:.3e} s) of '{}' at {} Hz to {}",
        trace.len(),
        trace.duration(),
        cfg.vcd.signal,
        trace.sample_rate(),
        out_path.display()
    );
    Ok(())
}

fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", TaxiConfig::example_combined_toml());
        return Ok(());
    }

    let (mut cfg, config_path) = if let Some(ref path) = cli.config {
        let cfg = TaxiConfig::load_from_file(path)?;
        (cfg, Some(path.clone()))
    } else {
        TaxiConfig::load_from_default_paths()?
    };

    if cli.log_level.is_some() {
        cfg.general.log_level = cli.log_level.clone();
    }
    match &cli.command {
        Some(Command::Decode(args)) => args.apply(&mut cfg),
        Some(Command::Vcd(args)) => args.apply(&mut cfg),
        None => {}
    }
    cfg.validate()
        .map_err(|e| format!("Invalid configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    match cli.command {
        Some(Command::Decode(ref args)) => run_decode(&cfg, args),
        Some(Command::Vcd(ref args)) => run_vcd(&cfg, args),
        None => Err("no command given (expected `decode` or `vcd`, see --help)".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_args_override_config() {
        let cli = Cli::parse_from([
            "taxi", "decode", "--baud", "1e6", "--bits", "36", "--threshold", "-0.5", "-c", "B",
            "-c", "C", "--format", "json", "--strict", "a.mat",
        ]);
        let Some(Command::Decode(args)) = cli.command else {
            panic!("expected decode command");
        };
        let mut cfg = TaxiConfig::default();
        args.apply(&mut cfg);
        assert_eq!(cfg.decoder.timing.baud, 1e6);
        assert_eq!(cfg.decoder.timing.num_bits, 36);
        assert_eq!(cfg.decoder.timing.threshold, -0.5);
        assert_eq!(cfg.decoder.timing.frame_gap_bits, 8.5);
        assert_eq!(cfg.decoder.channels, vec!["B", "C"]);
        assert_eq!(cfg.output.format, OutputFormat::Json);
        assert!(cfg.decoder.strict);
        assert_eq!(args.files, vec![PathBuf::from("a.mat")]);
    }

    #[test]
    fn vcd_output_defaults_next_to_input() {
        let cli = Cli::parse_from(["taxi", "vcd", "--low", "-1", "sim/test.vcd"]);
        let Some(Command::Vcd(args)) = cli.command else {
            panic!("expected vcd command");
        };
        assert_eq!(args.output_path(), PathBuf::from("sim/test.vcd.txt"));
        let mut cfg = TaxiConfig::default();
        args.apply(&mut cfg);
        assert_eq!(cfg.vcd.low_value, -1.0);
        assert_eq!(cfg.vcd.signal, "o_timing");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

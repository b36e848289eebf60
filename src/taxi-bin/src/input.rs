// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Trace loaders: PicoScope MAT exports, text sample lists and VCD dumps.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use matfile::{MatFile, NumericData};
use thiserror::Error;
use tracing::debug;

use taxi_core::Trace;
use taxi_vcd::{ResampleConfig, VcdError};

/// MAT variable holding the sample interval.
const MAT_INTERVAL_NAME: &str = "Tinterval";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: not a sample value: '{text}'", path.display())]
    BadSample {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("{}: no sample interval (set [decoder].interval or --interval)", path.display())]
    MissingInterval { path: PathBuf },

    #[error("{}: invalid MAT file: {message}", path.display())]
    Mat { path: PathBuf, message: String },

    #[error("{}: {source}", path.display())]
    Vcd {
        path: PathBuf,
        #[source]
        source: VcdError,
    },

    #[error("{}: none of the channels {wanted:?} are present", path.display())]
    NoChannels { path: PathBuf, wanted: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Mat,
    Vcd,
    Text,
}

impl InputKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("mat") => Self::Mat,
            Some("vcd") => Self::Vcd,
            _ => Self::Text,
        }
    }
}

/// One named channel of a loaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    pub trace: Trace,
}

/// What the loaders need besides the path.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions<'a> {
    /// Fallback interval for inputs that do not carry one
    pub interval: Option<f64>,
    /// Channel names to pick from MAT files
    pub channels: &'a [String],
    pub vcd: &'a ResampleConfig,
}

fn open(path: &Path) -> Result<BufReader<File>, InputError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })
}

pub fn load_channels(path: &Path, opts: &LoadOptions<'_>) -> Result<Vec<Channel>, InputError> {
    match InputKind::from_path(path) {
        InputKind::Mat => load_mat(path, opts),
        InputKind::Vcd => {
            let trace = taxi_vcd::resample_vcd(open(path)?, opts.vcd).map_err(|source| {
                InputError::Vcd {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            Ok(vec![Channel {
                name: opts.vcd.signal.clone(),
                trace,
            }])
        }
        InputKind::Text => {
            let interval = opts.interval.ok_or_else(|| InputError::MissingInterval {
                path: path.to_path_buf(),
            })?;
            let samples = read_text_samples(open(path)?, path)?;
            Ok(vec![Channel {
                name: "trace".to_string(),
                trace: Trace::new(interval, samples),
            }])
        }
    }
}

/// Parse one value per line. Blank lines and `#` comments are skipped.
pub fn read_text_samples<R: BufRead>(reader: R, path: &Path) -> Result<Vec<f64>, InputError> {
    let mut samples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let value = text.parse::<f64>().map_err(|_| InputError::BadSample {
            path: path.to_path_buf(),
            line: idx + 1,
            text: text.to_string(),
        })?;
        samples.push(value);
    }
    Ok(samples)
}

fn widen(data: &NumericData) -> Vec<f64> {
    match data {
        NumericData::Double { real, .. } => real.clone(),
        NumericData::Single { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::Int8 { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::UInt8 { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::Int16 { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::UInt16 { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::Int32 { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::UInt32 { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::Int64 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::UInt64 { real, .. } => real.iter().map(|&v| v as f64).collect(),
    }
}

/// First column of a column-major matrix.
fn first_column(mut values: Vec<f64>, size: &[usize]) -> Vec<f64> {
    if let Some(&rows) = size.first() {
        if size.len() > 1 && rows < values.len() {
            values.truncate(rows);
        }
    }
    values
}

fn load_mat(path: &Path, opts: &LoadOptions<'_>) -> Result<Vec<Channel>, InputError> {
    let mat = MatFile::parse(open(path)?).map_err(|e| InputError::Mat {
        path: path.to_path_buf(),
        message: format!("{:?}", e),
    })?;

    let interval = mat
        .find_by_name(MAT_INTERVAL_NAME)
        .and_then(|arr| widen(arr.data()).first().copied())
        .or(opts.interval)
        .ok_or_else(|| InputError::MissingInterval {
            path: path.to_path_buf(),
        })?;

    let mut channels = Vec::new();
    for name in opts.channels {
        let Some(arr) = mat.find_by_name(name) else {
            debug!("{}: channel {} not present", path.display(), name);
            continue;
        };
        let samples = first_column(widen(arr.data()), arr.size());
        channels.push(Channel {
            name: name.clone(),
            trace: Trace::new(interval, samples),
        });
    }

    if channels.is_empty() {
        return Err(InputError::NoChannels {
            path: path.to_path_buf(),
            wanted: opts.channels.to_vec(),
        });
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn opts(interval: Option<f64>, vcd: &ResampleConfig) -> LoadOptions<'_> {
        LoadOptions {
            interval,
            channels: &[],
            vcd,
        }
    }

    #[test]
    fn classifies_by_extension() {
        assert_eq!(InputKind::from_path(Path::new("run_001.MAT")), InputKind::Mat);
        assert_eq!(InputKind::from_path(Path::new("sim/test.vcd")), InputKind::Vcd);
        assert_eq!(InputKind::from_path(Path::new("test.vcd.txt")), InputKind::Text);
        assert_eq!(InputKind::from_path(Path::new("trace")), InputKind::Text);
    }

    #[test]
    fn parses_text_samples() {
        let body = "# scope dump\n0\n\n250\n  -1.5 \n";
        let samples = read_text_samples(body.as_bytes(), Path::new("t.txt")).unwrap();
        assert_eq!(samples, vec![0.0, 250.0, -1.5]);
    }

    #[test]
    fn reports_line_of_bad_sample() {
        let err = read_text_samples("1\n2\nthree\n".as_bytes(), Path::new("t.txt")).unwrap_err();
        match err {
            InputError::BadSample { line, text, .. } => {
                assert_eq!(line, 3);
                assert_eq!(text, "three");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn text_needs_an_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.txt");
        std::fs::File::create(&path).unwrap().write_all(b"0\n1\n").unwrap();
        let vcd = ResampleConfig::default();

        assert!(matches!(
            load_channels(&path, &opts(None, &vcd)),
            Err(InputError::MissingInterval { .. })
        ));
        let channels = load_channels(&path, &opts(Some(2e-9), &vcd)).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].trace, Trace::new(2e-9, vec![0.0, 1.0]));
    }

    #[test]
    fn loads_vcd_through_resampler() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.vcd");
        let body = "$timescale 1 ns $end\n$scope module top $end\n$var wire 1 ! o_timing $end\n$upscope $end\n$enddefinitions $end\n#0\n0!\n#2\n1!\n#4\n0!\n";
        std::fs::File::create(&path).unwrap().write_all(body.as_bytes()).unwrap();
        let vcd = ResampleConfig {
            sample_rate: 1e9,
            ..ResampleConfig::default()
        };

        let channels = load_channels(&path, &opts(None, &vcd)).unwrap();
        assert_eq!(channels[0].name, "o_timing");
        assert_eq!(channels[0].trace.samples, vec![0.0, 0.0, 250.0, 250.0]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let vcd = ResampleConfig::default();
        let err = load_channels(Path::new("/nonexistent/trace.txt"), &opts(Some(1.0), &vcd)).unwrap_err();
        assert!(matches!(err, InputError::Io { .. }));
    }

    const MI_INT8: u32 = 1;
    const MI_INT16: u32 = 3;
    const MI_INT32: u32 = 5;
    const MI_UINT32: u32 = 6;
    const MI_DOUBLE: u32 = 9;
    const MI_MATRIX: u32 = 14;
    const MX_DOUBLE_CLASS: u32 = 6;
    const MX_INT16_CLASS: u32 = 10;

    // Tag plus payload, padded to 8 bytes.
    fn mat_element(data_type: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&data_type.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out.resize(out.len().next_multiple_of(8), 0);
        out
    }

    fn mat_column(name: &str, class: u32, data_type: u32, rows: usize, data: &[u8]) -> Vec<u8> {
        let mut flags = class.to_le_bytes().to_vec();
        flags.extend_from_slice(&0u32.to_le_bytes());
        let mut dims = (rows as i32).to_le_bytes().to_vec();
        dims.extend_from_slice(&1i32.to_le_bytes());

        let mut body = mat_element(MI_UINT32, &flags);
        body.extend(mat_element(MI_INT32, &dims));
        body.extend(mat_element(MI_INT8, name.as_bytes()));
        body.extend(mat_element(data_type, data));
        mat_element(MI_MATRIX, &body)
    }

    // Level 5, little endian: Tinterval (double) and channel A (int16).
    fn write_mat(path: &Path, interval: Option<f64>, a: &[i16]) {
        let mut header = b"MATLAB 5.0 MAT-file, written by a PicoScope export".to_vec();
        header.resize(116, b' ');
        header.extend_from_slice(&[0; 8]);
        header.extend_from_slice(&0x0100u16.to_le_bytes());
        header.extend_from_slice(b"IM");

        let mut bytes = header;
        if let Some(interval) = interval {
            bytes.extend(mat_column(
                MAT_INTERVAL_NAME,
                MX_DOUBLE_CLASS,
                MI_DOUBLE,
                1,
                &interval.to_le_bytes(),
            ));
        }
        let data: Vec<u8> = a.iter().flat_map(|v| v.to_le_bytes()).collect();
        bytes.extend(mat_column("A", MX_INT16_CLASS, MI_INT16, a.len(), &data));
        std::fs::write(path, bytes).unwrap();
    }

    fn mat_opts<'a>(
        interval: Option<f64>,
        channels: &'a [String],
        vcd: &'a ResampleConfig,
    ) -> LoadOptions<'a> {
        LoadOptions {
            interval,
            channels,
            vcd,
        }
    }

    #[test]
    fn loads_mat_channels_with_their_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scope_001.mat");
        write_mat(&path, Some(1.6e-9), &[-3, 0, 250, 250, 0]);
        let vcd = ResampleConfig::default();
        let wanted = vec!["A".to_string(), "B".to_string()];

        let channels = load_channels(&path, &mat_opts(Some(1.0), &wanted, &vcd)).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "A");
        assert_eq!(channels[0].trace.interval, 1.6e-9);
        assert_eq!(channels[0].trace.samples, vec![-3.0, 0.0, 250.0, 250.0, 0.0]);
    }

    #[test]
    fn mat_without_interval_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scope_002.mat");
        write_mat(&path, None, &[1, 2]);
        let vcd = ResampleConfig::default();
        let wanted = vec!["A".to_string()];

        let channels = load_channels(&path, &mat_opts(Some(4e-9), &wanted, &vcd)).unwrap();
        assert_eq!(channels[0].trace, Trace::new(4e-9, vec![1.0, 2.0]));
        assert!(matches!(
            load_channels(&path, &mat_opts(None, &wanted, &vcd)),
            Err(InputError::MissingInterval { .. })
        ));
    }

    #[test]
    fn mat_without_wanted_channels_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scope_003.mat");
        write_mat(&path, Some(1.6e-9), &[0, 250]);
        let vcd = ResampleConfig::default();
        let wanted = vec!["B".to_string(), "C".to_string()];

        match load_channels(&path, &mat_opts(None, &wanted, &vcd)).unwrap_err() {
            InputError::NoChannels { wanted: names, .. } => assert_eq!(names, wanted),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn garbage_mat_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mat");
        std::fs::write(&path, b"not a mat file").unwrap();
        let vcd = ResampleConfig::default();
        let wanted = vec!["A".to_string()];

        assert!(matches!(
            load_channels(&path, &mat_opts(Some(1.0), &wanted, &vcd)),
            Err(InputError::Mat { .. })
        ));
    }

    #[test]
    fn keeps_first_matrix_column() {
        assert_eq!(first_column(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]), vec![1.0, 2.0]);
        assert_eq!(first_column(vec![1.0, 2.0, 3.0], &[3, 1]), vec![1.0, 2.0, 3.0]);
        assert_eq!(first_column(vec![1.0, 2.0], &[1, 2]), vec![1.0]);
    }
}

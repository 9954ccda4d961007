//! Conversion of downloaded files with ffprobe/ffmpeg.

use super::MediaSettings;
use serde::Deserialize;
use std::path::Path;
use std::process::{Command, Stdio};
#[cfg(not(feature = "no_convert"))]
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("ffprobe failed: {0}")]
    ProbeFailed(String),

    #[error("ffmpeg failed: {0}")]
    ConversionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInfo {
    /// Comma separated list, e.g. "mov,mp4,m4a".
    pub format_name: String,
    pub bit_rate: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
    bit_rate: Option<String>,
}

pub fn probe(path: &Path) -> Result<AudioInfo, ConversionError> {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConversionError::ProbeFailed(stderr.to_string()));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| ConversionError::InvalidOutput(format!("JSON parse error: {}", e)))?;
    Ok(AudioInfo {
        format_name: probe.format.format_name,
        bit_rate: probe.format.bit_rate.and_then(|b| b.parse().ok()),
    })
}

/// A file is converted when its bitrate is above the target or its container
/// isn't the target format.
pub fn needs_conversion(info: &AudioInfo, settings: &MediaSettings) -> bool {
    let too_large = info
        .bit_rate
        .is_some_and(|bit_rate| bit_rate > settings.target_bitrate);
    let other_format = !info
        .format_name
        .split(',')
        .any(|name| name.trim() == settings.target_format);
    too_large || other_format
}

/// Converts the file in place when needed. Returns whether ffmpeg ran.
#[cfg(not(feature = "no_convert"))]
pub fn convert_if_needed(path: &Path, settings: &MediaSettings) -> Result<bool, ConversionError> {
    if !settings.convert {
        return Ok(false);
    }
    let start = Instant::now();
    let info = probe(path)?;
    debug!("Media info reading: {:?}", start.elapsed());
    if !needs_conversion(&info, settings) {
        return Ok(false);
    }

    let bit_rate = info
        .bit_rate
        .map_or(settings.target_bitrate, |b| b.min(settings.target_bitrate));
    let converted = path.with_extension(format!("converting.{}", settings.target_format));

    let start = Instant::now();
    let output = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(path)
        .args(["-f", &settings.target_format, "-b:a", &bit_rate.to_string()])
        .arg(&converted)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()?;

    if !output.status.success() {
        let _ = std::fs::remove_file(&converted);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConversionError::ConversionFailed(stderr.to_string()));
    }
    std::fs::rename(&converted, path)?;
    debug!("ffmpeg: {:?}", start.elapsed());
    Ok(true)
}

#[cfg(feature = "no_convert")]
pub fn convert_if_needed(_path: &Path, _settings: &MediaSettings) -> Result<bool, ConversionError> {
    debug!("Conversion disabled, keeping the file as downloaded");
    Ok(false)
}

use crate::sources::{AliasSettings, SourceSettings};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub bot_token: Option<String>,
    pub admin_id: Option<i64>,
    pub db_path: Option<String>,
    pub tracks_dir: Option<String>,
    pub http_timeout_sec: Option<u64>,
    pub poll_timeout_sec: Option<u64>,
    pub max_send_tries: Option<u32>,
    pub max_pages: Option<usize>,

    // Feature configs
    pub media: Option<MediaConfig>,
    pub sources: Option<Vec<SourceSettings>>,
    pub normalization: Option<AliasSettings>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MediaConfig {
    /// ffmpeg format name, e.g. "mp3".
    pub target_format: Option<String>,
    pub target_bitrate: Option<u32>,
    pub convert: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

mod file_config;

pub use file_config::{FileConfig, MediaConfig};

use crate::media::MediaSettings;
use crate::sources::{AliasSettings, SourceSettings};
use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// TOML values override them where present.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub bot_token: Option<String>,
    pub admin_id: Option<i64>,
    pub db_path: Option<PathBuf>,
    pub tracks_dir: Option<PathBuf>,
    pub http_timeout_sec: u64,
    pub poll_timeout_sec: u64,
    pub max_send_tries: u32,
    pub max_pages: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub bot_token: String,
    pub admin_id: i64,
    pub db_path: PathBuf,
    pub tracks_dir: PathBuf,
    pub http_timeout_sec: u64,
    pub poll_timeout_sec: u64,
    pub max_send_tries: u32,
    pub max_pages: usize,

    // Feature configs (with defaults)
    pub media: MediaSettings,
    pub sources: Vec<SourceSettings>,
    pub normalization: AliasSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let bot_token = file
            .bot_token
            .or_else(|| cli.bot_token.clone())
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("bot_token must be specified via --bot-token or in config file")
            })?;
        let admin_id = file.admin_id.or(cli.admin_id).ok_or_else(|| {
            anyhow!("admin_id must be specified via --admin-id or in config file")
        })?;

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from("musbot.db"));
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        let tracks_dir = file
            .tracks_dir
            .map(PathBuf::from)
            .or_else(|| cli.tracks_dir.clone())
            .unwrap_or_else(|| PathBuf::from("tracks"));
        if tracks_dir.is_file() {
            bail!("tracks_dir is not a directory: {:?}", tracks_dir);
        }

        let http_timeout_sec = file.http_timeout_sec.unwrap_or(cli.http_timeout_sec);
        let poll_timeout_sec = file.poll_timeout_sec.unwrap_or(cli.poll_timeout_sec);
        let max_send_tries = file.max_send_tries.unwrap_or(cli.max_send_tries);
        if max_send_tries == 0 {
            bail!("max_send_tries must be at least 1");
        }
        let max_pages = file.max_pages.unwrap_or(cli.max_pages);
        if max_pages == 0 {
            bail!("max_pages must be at least 1");
        }

        // Media settings - merge file config with defaults
        let media_file = file.media.unwrap_or_default();
        let defaults = MediaSettings::default();
        let media = MediaSettings {
            target_format: media_file.target_format.unwrap_or(defaults.target_format),
            target_bitrate: media_file.target_bitrate.unwrap_or(defaults.target_bitrate),
            convert: media_file.convert.unwrap_or(defaults.convert),
        };
        if media.target_format.is_empty()
            || !media.target_format.chars().all(|c| c.is_ascii_alphanumeric())
        {
            bail!("Invalid media target_format: {:?}", media.target_format);
        }

        let sources = file.sources.unwrap_or_else(SourceSettings::defaults);
        let normalization = file.normalization.unwrap_or_default();

        Ok(Self {
            bot_token,
            admin_id,
            db_path,
            tracks_dir,
            http_timeout_sec,
            poll_timeout_sec,
            max_send_tries,
            max_pages,
            media,
            sources,
            normalization,
        })
    }
}

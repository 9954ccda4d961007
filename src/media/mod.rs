//! Audio files on disk: download, conversion, tags and readable links.

mod converter;
mod fetch;
mod files;
mod tags;

pub use converter::{convert_if_needed, needs_conversion, probe, AudioInfo, ConversionError};
pub use fetch::{AudioFetcher, HttpAudioFetcher};
pub use files::{sanitize_file_name, MediaLibrary};
pub use tags::write_tags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSettings {
    /// ffmpeg format name, also used as the file extension.
    pub target_format: String,
    /// Bits per second.
    pub target_bitrate: u32,
    pub convert: bool,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            target_format: "mp3".to_string(),
            target_bitrate: 192_000,
            convert: true,
        }
    }
}

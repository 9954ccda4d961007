use anyhow::{Context, Result};
use id3::{Tag, TagLike, Version};
use std::path::Path;

/// Writes the title and artist frames, keeping any other frame of the file.
pub fn write_tags(path: &Path, title: &str, author: &str) -> Result<()> {
    let mut tag = Tag::read_from_path(path).unwrap_or_else(|_| Tag::new());
    tag.set_title(title);
    tag.set_artist(author);
    tag.write_to_path(path, Version::Id3v24)
        .with_context(|| format!("Failed to write tags to {:?}", path))
}

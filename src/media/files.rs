use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const FORBIDDEN_CHARS: &[char] = &['\\', '/', '|', ':', '*', '?', '<', '>', '"'];

/// Replaces characters that can't appear in a file name with `_`. Names that
/// would resolve to a directory (`""`, `.` and `..`) become `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| {
            if c.is_control() || FORBIDDEN_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    match name.trim() {
        "" | "." | ".." => "_".to_string(),
        _ => name,
    }
}

/// Downloaded tracks live in `<root>/DB/<library id>.<ext>`, with a link
/// named after the track at `<root>/<author>/<author> - <title>.<ext>`.
pub struct MediaLibrary {
    root: PathBuf,
    extension: String,
}

impl MediaLibrary {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Result<Self> {
        let root = root.into();
        let library = Self {
            root,
            extension: extension.to_string(),
        };
        fs::create_dir_all(library.db_dir())
            .with_context(|| format!("Failed to create media directory {:?}", library.db_dir()))?;
        Ok(library)
    }

    fn db_dir(&self) -> PathBuf {
        self.root.join("DB")
    }

    pub fn stored_path(&self, id: i64) -> PathBuf {
        self.db_dir().join(format!("{}.{}", id, self.extension))
    }

    pub fn link_path(&self, author: &str, title: &str) -> PathBuf {
        self.root.join(sanitize_file_name(author)).join(format!(
            "{}.{}",
            sanitize_file_name(&format!("{} - {}", author, title)),
            self.extension
        ))
    }

    pub fn has_file(&self, id: i64) -> bool {
        self.stored_path(id).is_file()
    }

    pub fn save(&self, id: i64, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.stored_path(id);
        fs::write(&path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }

    /// Link used when the shared name already belongs to another stored file.
    fn own_link_path(&self, id: i64, author: &str, title: &str) -> PathBuf {
        self.root.join(sanitize_file_name(author)).join(format!(
            "{} ({}).{}",
            sanitize_file_name(&format!("{} - {}", author, title)),
            id,
            self.extension
        ))
    }

    fn link_state(&self, id: i64, link: &Path) -> LinkState {
        if fs::symlink_metadata(link).is_err() {
            LinkState::Missing
        } else if links_to(link, &self.stored_path(id)) {
            LinkState::Ours
        } else {
            LinkState::Other
        }
    }

    /// Creates the named link to the stored file unless it already exists.
    /// A different track with the same author and title keeps its link and
    /// this one gets a name carrying its library id.
    pub fn link(&self, id: i64, author: &str, title: &str) -> Result<PathBuf> {
        let shared = self.link_path(author, title);
        let link = match self.link_state(id, &shared) {
            LinkState::Ours => return Ok(shared),
            LinkState::Missing => shared,
            LinkState::Other => {
                let own = self.own_link_path(id, author, title);
                match self.link_state(id, &own) {
                    LinkState::Ours => return Ok(own),
                    LinkState::Missing => {}
                    LinkState::Other => remove_if_exists(&own)?,
                }
                own
            }
        };
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        make_link(&self.stored_path(id), &link)
            .with_context(|| format!("Failed to link {:?}", link))?;
        Ok(link)
    }

    /// Removes the links of the stored file, leaving other tracks' links alone.
    pub fn unlink(&self, id: i64, author: &str, title: &str) -> Result<()> {
        for link in [
            self.link_path(author, title),
            self.own_link_path(id, author, title),
        ] {
            if self.link_state(id, &link) == LinkState::Ours {
                remove_if_exists(&link)?;
            }
        }
        Ok(())
    }

    pub fn remove(&self, id: i64, author: &str, title: &str) -> Result<()> {
        self.unlink(id, author, title)?;
        remove_if_exists(&self.stored_path(id))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LinkState {
    Missing,
    Ours,
    Other,
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != ErrorKind::NotFound => {
            Err(err).with_context(|| format!("Failed to remove {:?}", path))
        }
        _ => Ok(()),
    }
}

// Links sit one directory below the root, next to `DB`.
#[cfg(unix)]
fn make_link(target: &Path, link: &Path) -> std::io::Result<()> {
    let relative = match target.file_name() {
        Some(name) => Path::new("..").join("DB").join(name),
        None => target.to_path_buf(),
    };
    std::os::unix::fs::symlink(relative, link)
}

#[cfg(not(unix))]
fn make_link(target: &Path, link: &Path) -> std::io::Result<()> {
    fs::copy(target, link).map(|_| ())
}

#[cfg(unix)]
fn links_to(link: &Path, target: &Path) -> bool {
    fs::read_link(link)
        .map(|linked| linked.file_name() == target.file_name())
        .unwrap_or(false)
}

// Links are plain copies here, so compare contents.
#[cfg(not(unix))]
fn links_to(link: &Path, target: &Path) -> bool {
    match (fs::read(link), fs::read(target)) {
        (Ok(linked), Ok(stored)) => linked == stored,
        _ => false,
    }
}

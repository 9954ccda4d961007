#![allow(dead_code)]

use anyhow::Result;
use musbot::media::AudioFetcher;
use musbot::sources::{SourceEntry, SourceError, TrackSource};
use std::cell::RefCell;
use std::rc::Rc;

pub fn entry(url: &str, author: &str, title: &str, duration: Option<u32>) -> SourceEntry {
    SourceEntry {
        url: url.to_string(),
        title: title.to_string(),
        author: author.to_string(),
        duration,
    }
}

/// Two tracks by "Band" and one by someone else.
pub fn default_entries() -> Vec<SourceEntry> {
    vec![
        entry("https://music.test/2.mp3", "Band", "Beta", Some(200)),
        entry("https://music.test/3.mp3", "Other", "Gamma", None),
        entry("https://music.test/1.mp3", "Band", "Alpha", Some(65)),
    ]
}

/// `count` tracks by "Band", titled "Song 01", "Song 02", ...
pub fn numbered_entries(count: usize) -> Vec<SourceEntry> {
    (1..=count)
        .map(|i| {
            entry(
                &format!("https://music.test/{}.mp3", i),
                "Band",
                &format!("Song {:02}", i),
                Some(100 + i as u32),
            )
        })
        .collect()
}

/// Returns the same entries for any request.
pub struct StubSource {
    pub entries: Vec<SourceEntry>,
}

impl TrackSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    fn fetch(&self, _request: &str) -> Result<Vec<SourceEntry>, SourceError> {
        Ok(self.entries.clone())
    }
}

/// Serves `body` for every url and records what was asked for.
pub struct StubFetcher {
    pub body: Option<Vec<u8>>,
    pub requested: Rc<RefCell<Vec<String>>>,
}

impl AudioFetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>> {
        self.requested.borrow_mut().push(url.to_string());
        Ok(self.body.clone())
    }
}

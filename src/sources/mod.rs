//! Track sources and the aggregation of their results.

mod html;
mod loader;
mod normalize;

pub use html::{parse_duration, HtmlTrackSource, HttpPageFetcher, Page, PageFetcher, SourceSettings};
pub use loader::{matches_requirement, TrackLoader};
pub use normalize::{AliasSettings, AuthorNormalizer};

use thiserror::Error;

/// One raw result as scraped from a source page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Absolute url of the audio file.
    pub url: String,
    pub title: String,
    pub author: String,
    pub duration: Option<u32>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Invalid url {0}")]
    InvalidUrl(String),
    #[error("Unexpected page layout at {url}: {reason}")]
    Parse { url: String, reason: String },
}

/// A catalog that turns a search request into candidate entries.
pub trait TrackSource {
    fn name(&self) -> &str;

    /// Collects the entries of every result page for `request`.
    fn fetch(&self, request: &str) -> Result<Vec<SourceEntry>, SourceError>;
}

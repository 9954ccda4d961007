//! Scrapes search result pages of music catalogs described by CSS selectors.

use super::{SourceEntry, SourceError, TrackSource};
use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 12_3_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.4 Safari/605.1.15";

lazy_static! {
    static ref DURATION_REGEX: Regex =
        Regex::new(r"^([0-5]?\d):([0-5]?\d)(?::([0-5]?\d))?$").unwrap();
}

/// Layout of one catalog site, as found in the `[[sources]]` config tables.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceSettings {
    pub name: String,
    /// Prefix the url-encoded request is appended to.
    pub search_url: String,
    pub track_selector: String,
    /// Link to the audio file, looked up inside the track element.
    pub link_selector: String,
    pub title_selector: String,
    pub author_selector: String,
    pub duration_selector: String,
    pub pagination_selector: String,
    /// Class of the pagination link pointing at the page being shown.
    #[serde(default)]
    pub current_page_class: Option<String>,
}

impl SourceSettings {
    pub fn defaults() -> Vec<SourceSettings> {
        vec![
            SourceSettings {
                name: "ligaudio".to_string(),
                search_url: "https://web.ligaudio.ru/mp3/".to_string(),
                track_selector: "[itemprop=track]".to_string(),
                link_selector: "a[itemprop=url]".to_string(),
                title_selector: ".title[itemprop=name]".to_string(),
                author_selector: ".autor[itemprop=byArtist]".to_string(),
                duration_selector: ".d".to_string(),
                pagination_selector: ".pagination".to_string(),
                current_page_class: Some("this".to_string()),
            },
            SourceSettings {
                name: "hitmos".to_string(),
                search_url: "https://rus.hitmotop.com/search?q=".to_string(),
                track_selector: ".track__info".to_string(),
                link_selector: "a.track__download-btn".to_string(),
                title_selector: ".track__title".to_string(),
                author_selector: ".track__desc".to_string(),
                duration_selector: ".track__time".to_string(),
                pagination_selector: ".pagination".to_string(),
                current_page_class: None,
            },
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait PageFetcher {
    fn get(&self, url: &Url) -> Result<Page, SourceError>;
}

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout_sec: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpPageFetcher {
    fn get(&self, url: &Url) -> Result<Page, SourceError> {
        let network_error = |source| SourceError::Network {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(network_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(network_error)?;
        Ok(Page { status, body })
    }
}

struct Selectors {
    track: Selector,
    link: Selector,
    title: Selector,
    author: Selector,
    duration: Selector,
    pagination: Selector,
    pagination_link: Selector,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid CSS selector '{}': {}", css, e))
}

pub struct HtmlTrackSource {
    name: String,
    search_url: String,
    current_page_class: Option<String>,
    selectors: Selectors,
    max_pages: usize,
    fetcher: Arc<dyn PageFetcher>,
}

impl HtmlTrackSource {
    pub fn new(
        settings: &SourceSettings,
        max_pages: usize,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self> {
        Url::parse(&settings.search_url)
            .with_context(|| format!("Invalid search url for source {}", settings.name))?;
        let selectors = Selectors {
            track: selector(&settings.track_selector)?,
            link: selector(&settings.link_selector)?,
            title: selector(&settings.title_selector)?,
            author: selector(&settings.author_selector)?,
            duration: selector(&settings.duration_selector)?,
            pagination: selector(&settings.pagination_selector)?,
            pagination_link: selector("a[href]")?,
        };
        Ok(Self {
            name: settings.name.clone(),
            search_url: settings.search_url.clone(),
            current_page_class: settings.current_page_class.clone(),
            selectors,
            max_pages: max_pages.max(1),
            fetcher,
        })
    }

    fn entries_from_page(
        &self,
        page_url: &Url,
        document: &Html,
    ) -> Result<Vec<SourceEntry>, SourceError> {
        let parse_error = |reason: &str| SourceError::Parse {
            url: page_url.to_string(),
            reason: reason.to_string(),
        };

        let mut entries = Vec::new();
        for track in document.select(&self.selectors.track) {
            let href = track
                .select(&self.selectors.link)
                .next()
                .and_then(|link| link.value().attr("href"))
                .ok_or_else(|| parse_error("track without a download link"))?;
            let url = page_url
                .join(href)
                .map_err(|_| parse_error("track link is not a valid url"))?;
            let title = first_text(track, &self.selectors.title)
                .ok_or_else(|| parse_error("track without a title"))?;
            let author = first_text(track, &self.selectors.author)
                .ok_or_else(|| parse_error("track without an author"))?;
            let duration = first_text(track, &self.selectors.duration)
                .and_then(|text| parse_duration(&text));

            entries.push(SourceEntry {
                url: url.to_string(),
                title,
                author,
                duration,
            });
        }
        Ok(entries)
    }

    fn pagination_links(&self, page_url: &Url, document: &Html) -> Vec<Url> {
        let Some(pagination) = document.select(&self.selectors.pagination).next() else {
            return Vec::new();
        };
        pagination
            .select(&self.selectors.pagination_link)
            .filter(|link| match &self.current_page_class {
                Some(class) => !link.value().classes().any(|c| c == class),
                None => true,
            })
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| page_url.join(href).ok())
            .filter(|url| url.host_str() == page_url.host_str())
            .collect()
    }
}

impl TrackSource for HtmlTrackSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, request: &str) -> Result<Vec<SourceEntry>, SourceError> {
        let first = format!("{}{}", self.search_url, urlencoding::encode(request));
        let first = Url::parse(&first).map_err(|_| SourceError::InvalidUrl(first.clone()))?;

        let mut visited = HashSet::from([first.to_string()]);
        let mut queue = VecDeque::from([first]);
        let mut entries = Vec::new();
        let mut pages = 0;

        while let Some(page_url) = queue.pop_front() {
            if pages >= self.max_pages {
                debug!("{}: page limit of {} reached", self.name, self.max_pages);
                break;
            }
            pages += 1;

            let page = self.fetcher.get(&page_url)?;
            if !page.is_ok() {
                warn!(
                    "Server returned code {} for GET {}",
                    page.status, page_url
                );
                break;
            }

            let document = Html::parse_document(&page.body);
            entries.extend(self.entries_from_page(&page_url, &document)?);

            for link in self.pagination_links(&page_url, &document) {
                if visited.insert(link.to_string()) {
                    queue.push_back(link);
                }
            }
        }

        debug!(
            "{}: {} entries from {} page(s) for `{}`",
            self.name,
            entries.len(),
            pages,
            request
        );
        Ok(entries)
    }
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|found| {
            let text: String = found.text().collect();
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        })
}

/// Parses `M:SS` or `H:MM:SS` into seconds; anything else is unknown.
pub fn parse_duration(text: &str) -> Option<u32> {
    let captures = DURATION_REGEX.captures(text.trim())?;
    let number = |idx: usize| captures.get(idx).and_then(|m| m.as_str().parse::<u32>().ok());
    let mut seconds = number(1)? * 60 + number(2)?;
    if let Some(last) = number(3) {
        seconds = seconds * 60 + last;
    }
    Some(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct CannedPages {
        pages: HashMap<String, Page>,
        requested: Mutex<Vec<String>>,
    }

    impl CannedPages {
        fn new(pages: &[(&str, u16, &str)]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(url, status, body)| {
                        (
                            url.to_string(),
                            Page {
                                status: *status,
                                body: body.to_string(),
                            },
                        )
                    })
                    .collect(),
                requested: Mutex::new(Vec::new()),
            })
        }
    }

    impl PageFetcher for CannedPages {
        fn get(&self, url: &Url) -> Result<Page, SourceError> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(self.pages.get(url.as_str()).cloned().unwrap_or(Page {
                status: 404,
                body: String::new(),
            }))
        }
    }

    fn settings() -> SourceSettings {
        SourceSettings {
            name: "test".to_string(),
            search_url: "https://music.test/search?q=".to_string(),
            track_selector: ".track".to_string(),
            link_selector: "a.dl".to_string(),
            title_selector: ".title".to_string(),
            author_selector: ".author".to_string(),
            duration_selector: ".time".to_string(),
            pagination_selector: ".pages".to_string(),
            current_page_class: Some("this".to_string()),
        }
    }

    fn track_html(href: &str, author: &str, title: &str, time: &str) -> String {
        format!(
            r#"<div class="track"><a class="dl" href="{}">get</a>
               <span class="author"> {} </span><span class="title">{}</span>
               <span class="time">{}</span></div>"#,
            href, author, title, time
        )
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("3:05"), Some(185));
        assert_eq!(parse_duration(" 03:05 "), Some(185));
        assert_eq!(parse_duration("1:02:03"), Some(3723));
        assert_eq!(parse_duration("3:75"), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_fetch_extracts_entries_and_follows_pagination() {
        let first = format!(
            r#"<html><body>{}{}
               <div class="pages"><a class="this" href="/search?q=band">1</a>
               <a href="/search?q=band&amp;page=2">2</a>
               <a href="https://elsewhere.test/page/3">3</a></div></body></html>"#,
            track_html("/files/1.mp3", "Band", "First", "3:00"),
            track_html("https://cdn.music.test/2.mp3", "Band", "Second", "live"),
        );
        let second = format!(
            r#"<html><body>{}
               <div class="pages"><a href="/search?q=band">1</a>
               <a class="this" href="/search?q=band&amp;page=2">2</a></div></body></html>"#,
            track_html("/files/3.mp3", "Band", "Third", "1:00:01"),
        );
        let fetcher = CannedPages::new(&[
            ("https://music.test/search?q=band", 200, &first),
            ("https://music.test/search?q=band&page=2", 200, &second),
        ]);
        let source = HtmlTrackSource::new(&settings(), 5, fetcher.clone()).unwrap();

        let entries = source.fetch("band").unwrap();

        assert_eq!(
            entries,
            vec![
                SourceEntry {
                    url: "https://music.test/files/1.mp3".to_string(),
                    title: "First".to_string(),
                    author: "Band".to_string(),
                    duration: Some(180),
                },
                SourceEntry {
                    url: "https://cdn.music.test/2.mp3".to_string(),
                    title: "Second".to_string(),
                    author: "Band".to_string(),
                    duration: None,
                },
                SourceEntry {
                    url: "https://music.test/files/3.mp3".to_string(),
                    title: "Third".to_string(),
                    author: "Band".to_string(),
                    duration: Some(3601),
                },
            ]
        );
        // The other host and the already visited first page are never requested.
        assert_eq!(fetcher.requested.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_fetch_encodes_request() {
        let fetcher = CannedPages::new(&[(
            "https://music.test/search?q=a%20%26%20b",
            200,
            "<html></html>",
        )]);
        let source = HtmlTrackSource::new(&settings(), 5, fetcher.clone()).unwrap();

        assert!(source.fetch("a & b").unwrap().is_empty());
        assert_eq!(
            fetcher.requested.lock().unwrap().as_slice(),
            ["https://music.test/search?q=a%20%26%20b"]
        );
    }

    #[test]
    fn test_non_ok_page_keeps_collected_entries() {
        let first = format!(
            r#"<html><body>{}<div class="pages"><a href="/search?q=x&amp;page=2">2</a></div></body></html>"#,
            track_html("/1.mp3", "Band", "Only", "2:00"),
        );
        let fetcher = CannedPages::new(&[("https://music.test/search?q=x", 200, &first)]);
        let source = HtmlTrackSource::new(&settings(), 5, fetcher).unwrap();

        let entries = source.fetch("x").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Only");
    }

    #[test]
    fn test_page_limit() {
        let first = format!(
            r#"<html><body>{}<div class="pages"><a href="/search?q=x&amp;page=2">2</a></div></body></html>"#,
            track_html("/1.mp3", "Band", "Only", "2:00"),
        );
        let fetcher = CannedPages::new(&[("https://music.test/search?q=x", 200, &first)]);
        let source = HtmlTrackSource::new(&settings(), 1, fetcher.clone()).unwrap();

        assert_eq!(source.fetch("x").unwrap().len(), 1);
        assert_eq!(fetcher.requested.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_track_without_link_is_a_parse_error() {
        let page = r#"<html><body><div class="track"><span class="title">T</span>
            <span class="author">A</span></div></body></html>"#;
        let fetcher = CannedPages::new(&[("https://music.test/search?q=x", 200, page)]);
        let source = HtmlTrackSource::new(&settings(), 5, fetcher).unwrap();

        assert!(matches!(
            source.fetch("x"),
            Err(SourceError::Parse { .. })
        ));
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let mut bad = settings();
        bad.track_selector = "[[".to_string();
        let fetcher = CannedPages::new(&[]);
        assert!(HtmlTrackSource::new(&bad, 5, fetcher).is_err());
    }

    #[test]
    fn test_default_sources_are_valid() {
        let fetcher = CannedPages::new(&[]);
        for settings in SourceSettings::defaults() {
            HtmlTrackSource::new(&settings, 5, fetcher.clone()).unwrap();
        }
    }
}

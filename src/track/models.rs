use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

/// Tracks are shared between a pool and the action currently working on them.
pub type TrackRef = Rc<RefCell<Track>>;

/// One search result or library entry.
///
/// `url` is stored without its scheme. `stored_id` is the library row id and is
/// present only for tracks the user already downloaded. `sequence_key` is the
/// identity used for the track's button and never takes part in comparisons.
#[derive(Debug, Clone)]
pub struct Track {
    pub url: String,
    pub title: String,
    pub author: String,
    pub duration: Option<u32>,
    pub stored_id: Option<i64>,
    sequence_key: u64,
}

impl Track {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        duration: Option<u32>,
        stored_id: Option<i64>,
        sequence_key: u64,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            author: author.into(),
            duration,
            stored_id,
            sequence_key,
        }
    }

    pub fn sequence_key(&self) -> u64 {
        self.sequence_key
    }

    pub fn into_ref(self) -> TrackRef {
        Rc::new(RefCell::new(self))
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.author == other.author
            && self.title == other.title
            && self.duration == other.duration
            && self.stored_id == other.stored_id
    }
}

impl Eq for Track {}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

impl Ord for Track {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_text(&self.author, &other.author)
            .then_with(|| cmp_text(&self.title, &other.title))
            .then_with(|| self.duration.cmp(&other.duration))
            .then_with(|| self.url.cmp(&other.url))
            .then_with(|| self.stored_id.cmp(&other.stored_id))
    }
}

impl PartialOrd for Track {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Monotonic id source. Values handed out are strictly increasing for the
/// lifetime of the sequence, and observing a restored value only moves it forward.
#[derive(Debug, Default, Clone)]
pub struct IdSequence {
    last: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> u64 {
        self.last += 1;
        self.last
    }

    pub fn observe(&mut self, value: u64) {
        self.last = self.last.max(value);
    }

    pub fn last(&self) -> u64 {
        self.last
    }
}

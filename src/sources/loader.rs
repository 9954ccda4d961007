use super::{AuthorNormalizer, SourceEntry, TrackSource};
use crate::query::SearchQuery;
use crate::track::{strip_scheme, IdSequence, Track};
use std::time::Instant;
use tracing::{debug, error};

/// True when every whitespace separated token of `required` occurs in `value`,
/// ignoring case. No requirement always matches.
pub fn matches_requirement(value: &str, required: Option<&str>) -> bool {
    let Some(required) = required else {
        return true;
    };
    let value = value.to_lowercase();
    required
        .to_lowercase()
        .split_whitespace()
        .all(|token| value.contains(token))
}

/// Runs a search against every source and merges the results.
pub struct TrackLoader {
    sources: Vec<Box<dyn TrackSource>>,
    normalizer: AuthorNormalizer,
}

impl TrackLoader {
    pub fn new(sources: Vec<Box<dyn TrackSource>>, normalizer: AuthorNormalizer) -> Self {
        Self {
            sources,
            normalizer,
        }
    }

    /// Returns the matching tracks of all sources, sorted and without
    /// duplicates. A failing source is logged and skipped.
    pub fn load(&self, query: &SearchQuery, keys: &mut IdSequence) -> Vec<Track> {
        let start = Instant::now();
        let mut tracks = Vec::new();

        for source in &self.sources {
            let entries = match source.fetch(&query.request) {
                Ok(entries) => entries,
                Err(err) => {
                    error!("Source {} failed for `{}`: {}", source.name(), query.request, err);
                    continue;
                }
            };
            tracks.extend(
                entries
                    .into_iter()
                    .filter(|entry| self.accepts(entry, query))
                    .map(|entry| {
                        Track::new(
                            strip_scheme(&entry.url),
                            entry.title,
                            self.normalizer.normalize(&entry.author),
                            entry.duration,
                            None,
                            keys.next(),
                        )
                    }),
            );
        }

        tracks.sort();
        tracks.dedup();

        debug!(
            "Found {} tracks by request `{}` in {:?}",
            tracks.len(),
            query.request,
            start.elapsed()
        );
        tracks
    }

    fn accepts(&self, entry: &SourceEntry, query: &SearchQuery) -> bool {
        matches_requirement(&entry.title, query.title.as_deref())
            && matches_requirement(&entry.author, query.author.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse;
    use crate::sources::{AliasSettings, SourceError};

    struct FixedSource {
        name: &'static str,
        entries: Vec<SourceEntry>,
    }

    impl TrackSource for FixedSource {
        fn name(&self) -> &str {
            self.name
        }

        fn fetch(&self, _request: &str) -> Result<Vec<SourceEntry>, SourceError> {
            Ok(self.entries.clone())
        }
    }

    struct BrokenSource;

    impl TrackSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        fn fetch(&self, request: &str) -> Result<Vec<SourceEntry>, SourceError> {
            Err(SourceError::InvalidUrl(request.to_string()))
        }
    }

    fn entry(url: &str, author: &str, title: &str, duration: Option<u32>) -> SourceEntry {
        SourceEntry {
            url: url.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            duration,
        }
    }

    fn loader(sources: Vec<Box<dyn TrackSource>>) -> TrackLoader {
        TrackLoader::new(
            sources,
            AuthorNormalizer::new(&AliasSettings::default()).unwrap(),
        )
    }

    #[test]
    fn test_matches_requirement() {
        assert!(matches_requirement("Anything", None));
        assert!(matches_requirement("The Brain Song", Some("brain the")));
        assert!(matches_requirement("The Brain Song", Some("  song  ")));
        assert!(!matches_requirement("The Brain Song", Some("brain heart")));
    }

    #[test]
    fn test_merges_sorts_and_deduplicates() {
        let first = FixedSource {
            name: "first",
            entries: vec![
                entry("https://a.test/2", "beta", "Song", Some(100)),
                entry("https://a.test/1", "Alpha", "Song", Some(100)),
            ],
        };
        let second = FixedSource {
            name: "second",
            entries: vec![
                entry("https://a.test/1", "Alpha", "Song", Some(100)),
                entry("https://b.test/3", "Beta", "Song", None),
            ],
        };
        let loader = loader(vec![Box::new(first), Box::new(second)]);
        let mut keys = IdSequence::new();

        let tracks = loader.load(&parse("title: song"), &mut keys);
        let summary: Vec<_> = tracks
            .iter()
            .map(|t| (t.author.as_str(), t.url.as_str()))
            .collect();

        assert_eq!(
            summary,
            vec![("Alpha", "a.test/1"), ("Beta", "b.test/3"), ("beta", "a.test/2")]
        );
        // The dropped duplicate still consumed a key.
        let mut seen: Vec<_> = tracks.iter().map(|t| t.sequence_key()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 3);
        assert_eq!(keys.last(), 4);
    }

    #[test]
    fn test_filters_on_title_and_author() {
        let source = FixedSource {
            name: "fixed",
            entries: vec![
                entry("https://a.test/1", "Kanaria", "Brain", None),
                entry("https://a.test/2", "Kanaria", "King", None),
                entry("https://a.test/3", "Someone", "Brain (cover)", None),
            ],
        };
        let loader = loader(vec![Box::new(source)]);

        let tracks = loader.load(&parse("kanaria - brain"), &mut IdSequence::new());
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].url, "a.test/1");
    }

    #[test]
    fn test_normalizes_authors_after_filtering() {
        let source = FixedSource {
            name: "fixed",
            entries: vec![entry("https://a.test/1", "deco*27 ft. hatsune miku", "Ghost", None)],
        };
        let loader = loader(vec![Box::new(source)]);

        let tracks = loader.load(&parse("a: deco*27 ft"), &mut IdSequence::new());
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].author, "DECO*27 feat. Hatsune Miku");
    }

    #[test]
    fn test_broken_source_contributes_nothing() {
        let source = FixedSource {
            name: "fixed",
            entries: vec![entry("https://a.test/1", "Band", "Song", None)],
        };
        let loader = loader(vec![Box::new(BrokenSource), Box::new(source)]);

        let tracks = loader.load(&parse("Band"), &mut IdSequence::new());
        assert_eq!(tracks.len(), 1);
    }
}

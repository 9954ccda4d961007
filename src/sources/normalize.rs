use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::BTreeMap;

lazy_static! {
    static ref FEAT_REGEX: Regex = Regex::new(r"(?i)\b\s+(?:feat|ft)\.?\s+\b").unwrap();
    static ref SEPARATOR_REGEX: Regex =
        Regex::new(r"\b(?:\s*[,&]\s*|\s+(?:x|and)\s+)\b").unwrap();
}

const DEFAULT_ALIASES: &[&str] = &[
    "9Lana",
    "Ado",
    "Alan Walker",
    "Alba Sera",
    "Amala feat. Hatsune Miku, Kasane Teto",
    "Chiyo",
    "DECO*27 feat. Hatsune Miku",
    "Futakuchi Mana",
    "GUMI",
    "Harmony Team",
    "HaruWei",
    "Hatsune Miku",
    "Kasane Teto",
    "Megurine Luka",
    "higanbanban",
    "Narea",
    "Hiiragi Magnetite",
    "Hinomori Shizuku",
    "Jackie-O & Sati Akura",
    "Jinja",
    "Kagamine Rin",
    "Kusuriya no Hitorigoto",
    "[Labor of Love] Hoski",
    "LIQ feat. Hatsune Miku",
    "LiuVerdea",
    "May'n",
    "Melody Note",
    "Miku",
    "Neoni",
    "Noisia",
    "Onsa Media",
    "Planya Ch",
    "Reoni, Nyami",
    "Sati Akura",
    "SAWTOWNE",
    "SE[L] EI",
    "Utsu-P",
    "Vocaloid",
    "WEDNESDAY CAMPANELLA",
    "Yuyoyuppe",
    "Zephyrianna",
    "ZHIEND",
    "ZUTOMAYO",
    "Ёлка",
    "Amala",
];

const DEFAULT_REWRITES: &[(&str, &str)] = &[
    ("黒うさp", "Kurousa-P"),
    ("planya channel", "Planya Ch"),
];

/// Canonical author spellings, from the `[normalization]` config table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AliasSettings {
    /// Names rewritten to exactly this spelling wherever they appear in any case.
    pub aliases: Vec<String>,
    /// Phrase to canonical name.
    pub rewrites: BTreeMap<String, String>,
}

impl Default for AliasSettings {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_ALIASES.iter().map(|s| s.to_string()).collect(),
            rewrites: DEFAULT_REWRITES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

pub struct AuthorNormalizer {
    aliases: Vec<(Regex, String)>,
}

impl AuthorNormalizer {
    pub fn new(settings: &AliasSettings) -> Result<Self> {
        let pairs = settings
            .aliases
            .iter()
            .map(|alias| (alias.as_str(), alias.as_str()))
            .chain(
                settings
                    .rewrites
                    .iter()
                    .map(|(from, to)| (from.as_str(), to.as_str())),
            );

        let mut aliases = Vec::new();
        for (phrase, canonical) in pairs {
            // Authors are matched after separators were normalized, so the
            // phrase has to be too.
            let phrase = normalize_separators(phrase);
            if phrase.is_empty() {
                continue;
            }
            let regex = RegexBuilder::new(&regex::escape(&phrase))
                .case_insensitive(true)
                .build()
                .with_context(|| format!("Invalid author alias '{}'", phrase))?;
            aliases.push((regex, canonical.to_string()));
        }
        Ok(Self { aliases })
    }

    pub fn normalize(&self, author: &str) -> String {
        let mut author = normalize_separators(author);
        for (regex, canonical) in &self.aliases {
            author = replace_phrase(&author, regex, canonical);
        }
        author
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replaces every occurrence of `phrase` that isn't part of a longer word.
fn replace_phrase(text: &str, phrase: &Regex, canonical: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut copied = 0;
    let mut start = 0;
    while let Some(found) = phrase.find_at(text, start) {
        let before = text[..found.start()].chars().next_back();
        let after = text[found.end()..].chars().next();
        if before.map_or(true, |c| !is_word_char(c)) && after.map_or(true, |c| !is_word_char(c))
        {
            result.push_str(&text[copied..found.start()]);
            result.push_str(canonical);
            copied = found.end();
            start = found.end();
        } else {
            start = found.start() + text[found.start()..].chars().next().map_or(1, char::len_utf8);
        }
        if start > text.len() {
            break;
        }
    }
    result.push_str(&text[copied..]);
    result
}

fn normalize_separators(author: &str) -> String {
    let author = FEAT_REGEX.replace_all(author, " feat. ");
    SEPARATOR_REGEX.replace_all(&author, ", ").into_owned()
}

use super::Track;
use lazy_static::lazy_static;
use regex::Regex;

/// Width every button label is padded to, so the chat client renders the
/// buttons at full width.
const MIN_LABEL_LENGTH: usize = 200;

lazy_static! {
    static ref SCHEME_REGEX: Regex = Regex::new(r"^\w+://").unwrap();
}

pub fn format_duration(duration: Option<u32>) -> String {
    let Some(duration) = duration else {
        return "--:--".to_string();
    };
    let hours = duration / 3600;
    let mins = duration / 60 % 60;
    let secs = duration % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

pub fn button_label(track: &Track) -> String {
    let mark = if track.stored_id.is_some() { "✅" } else { "" };
    let label = format!(
        "{} {}   ⸺   {}   ⸺   {}",
        mark,
        format_duration(track.duration),
        track.author,
        track.title
    );
    format!("{:<width$}", label, width = MIN_LABEL_LENGTH)
}

pub fn strip_scheme(url: &str) -> String {
    SCHEME_REGEX.replace(url, "").into_owned()
}

pub fn add_scheme(url: &str) -> String {
    format!("https://{}", url)
}

mod format;
mod models;

pub use format::{add_scheme, button_label, format_duration, strip_scheme};
pub use models::{IdSequence, Track, TrackRef};

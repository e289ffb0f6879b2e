//! Check-output codec: line parsing, key sanitization and tag merging.

pub mod line;
pub mod tags;

pub use line::{ParsedLine, StripMetric, escape_key, parse_line, parse_timestamp, parse_value};
pub use tags::{Tags, merge_tags, render_tag_value};

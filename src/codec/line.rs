use serde::{Deserialize, Deserializer};

/// Key-shortening mode applied before a metric key is escaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StripMetric {
    #[default]
    Disabled,
    /// Drop the prefix the key shares with the client name.
    Host,
    /// Drop everything up to and including the first `<pattern>.`.
    Prefix(String),
}

impl StripMetric {
    pub fn from_setting(setting: Option<&str>) -> Self {
        match setting {
            None | Some("") => StripMetric::Disabled,
            Some("host") => StripMetric::Host,
            Some(pattern) => StripMetric::Prefix(pattern.to_string()),
        }
    }

    pub fn apply(&self, key: &str, client: &str) -> String {
        match self {
            StripMetric::Disabled => key.to_string(),
            StripMetric::Host => strip_host(key, client),
            StripMetric::Prefix(pattern) => strip_pattern(key, pattern),
        }
    }
}

// Accepts a string, or `false`/null for "disabled".
impl<'de> Deserialize<'de> for StripMetric {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Setting {
            Flag(bool),
            Pattern(String),
        }

        match Option::<Setting>::deserialize(deserializer)? {
            None | Some(Setting::Flag(false)) => Ok(StripMetric::Disabled),
            Some(Setting::Flag(true)) => Err(serde::de::Error::custom(
                "strip_metric must be \"host\" or a prefix pattern, not `true`",
            )),
            Some(Setting::Pattern(pattern)) => Ok(StripMetric::from_setting(Some(&pattern))),
        }
    }
}

/// One parsed line of check output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    /// Stripped and escaped measurement key, without tags.
    pub key: String,
    pub value: f64,
    pub timestamp: i64,
}

/// Parse `<key> <value> [<timestamp>]`.
///
/// Returns `None` for blank lines. A malformed value becomes `0.0` and a
/// missing or malformed timestamp becomes `0`; tokens past the third are
/// ignored.
pub fn parse_line(line: &str, client: &str, strip: &StripMetric) -> Option<ParsedLine> {
    let mut tokens = line.split_whitespace();
    let key = tokens.next()?;
    let value = tokens.next().map_or(0.0, parse_value);
    let timestamp = tokens.next().map_or(0, parse_timestamp);

    Some(ParsedLine {
        key: escape_key(&strip.apply(key, client)),
        value,
        timestamp,
    })
}

/// Leading decimal number of `token`, `0.0` when there is none or it is not
/// finite.
pub fn parse_value(token: &str) -> f64 {
    let token = token.trim();
    let bytes = token.as_bytes();

    let mut end = usize::from(token.starts_with(['-', '+']));
    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return 0.0;
    }

    // An exponent only counts when it has digits ("5e" reads as 5)
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'-' | b'+')) {
            exp += 1;
        }
        let exp_digits = count_digits(&bytes[exp..]);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    match token[..end].parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Leading integer of `token`, `0` if there is none.
pub fn parse_timestamp(token: &str) -> i64 {
    let token = token.trim();
    let digits_start = usize::from(token.starts_with(['-', '+']));
    let digits_end = token[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(token.len(), |i| i + digits_start);

    token[..digits_end].parse().unwrap_or(0)
}

/// Escape line-protocol reserved characters in a measurement key.
///
/// Single pass, so a backslash introduced for one character is never escaped
/// again by another rule.
pub fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ',' => escaped.push_str("\\,"),
            '"' => escaped.push_str("\\\""),
            c if c.is_whitespace() => escaped.push_str("\\ "),
            c => escaped.push(c),
        }
    }
    escaped
}

fn strip_host(key: &str, client: &str) -> String {
    let shared: usize = key
        .chars()
        .zip(client.chars())
        .take_while(|(k, c)| k == c)
        .map(|(k, _)| k.len_utf8())
        .sum();
    let rest = &key[shared..];
    rest.strip_prefix('.').unwrap_or(rest).to_string()
}

fn strip_pattern(key: &str, pattern: &str) -> String {
    let marker = format!("{pattern}.");
    match key.find(&marker) {
        Some(pos) => key[pos + marker.len()..].to_string(),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_line() {
        let parsed = parse_line("cpu.load 0.5 1000", "host1", &StripMetric::Disabled).unwrap();
        assert_eq!(parsed.key, "cpu.load");
        assert_eq!(parsed.value, 0.5);
        assert_eq!(parsed.timestamp, 1000);
    }

    #[test]
    fn test_missing_timestamp_is_zero() {
        let parsed = parse_line("cpu.load 3", "h", &StripMetric::Disabled).unwrap();
        assert_eq!(parsed.timestamp, 0);
        assert_eq!(parsed.value, 3.0);
    }

    #[test]
    fn test_malformed_value_is_zero() {
        for raw in ["abc", "NaN", "inf", "", "-", ".", "e5", "1e999"] {
            assert_eq!(parse_value(raw), 0.0, "value {raw:?}");
        }
        let parsed = parse_line("cpu.load oops 10", "h", &StripMetric::Disabled).unwrap();
        assert_eq!(parsed.value, 0.0);
        let parsed = parse_line("cpu.load", "h", &StripMetric::Disabled).unwrap();
        assert_eq!(parsed.value, 0.0);
    }

    #[test]
    fn test_value_leading_number() {
        assert_eq!(parse_value("12abc"), 12.0);
        assert_eq!(parse_value("1.5.2"), 1.5);
        assert_eq!(parse_value("-3.25ms"), -3.25);
        assert_eq!(parse_value("+.5"), 0.5);
        assert_eq!(parse_value("7."), 7.0);
        assert_eq!(parse_value("2e3x"), 2000.0);
        assert_eq!(parse_value("4e"), 4.0);
        assert_eq!(parse_value("1E-2"), 0.01);

        let parsed = parse_line("disk.used 42% 10", "h", &StripMetric::Disabled).unwrap();
        assert_eq!(parsed.value, 42.0);
    }

    #[test]
    fn test_timestamp_leading_integer() {
        assert_eq!(parse_timestamp("1000"), 1000);
        assert_eq!(parse_timestamp("1000.75"), 1000);
        assert_eq!(parse_timestamp("-5"), -5);
        assert_eq!(parse_timestamp("x1"), 0);
        assert_eq!(parse_timestamp(""), 0);
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert!(parse_line("", "h", &StripMetric::Disabled).is_none());
        assert!(parse_line("   \t ", "h", &StripMetric::Disabled).is_none());
    }

    #[test]
    fn test_extra_tokens_ignored() {
        let parsed = parse_line("a 1 2 3 4", "h", &StripMetric::Disabled).unwrap();
        assert_eq!((parsed.key.as_str(), parsed.timestamp), ("a", 2));
    }

    #[test]
    fn test_strip_host() {
        let strip = StripMetric::Host;
        assert_eq!(strip.apply("web01.prod.cpu.load", "web01.prod"), "cpu.load");
        assert_eq!(strip.apply("other.cpu", "web01"), "other.cpu");
        // Shared prefix is character-wise, not segment-wise.
        assert_eq!(strip.apply("web01x.cpu", "web01"), "x.cpu");
    }

    #[test]
    fn test_strip_pattern() {
        let strip = StripMetric::Prefix("prod".to_string());
        assert_eq!(strip.apply("dc1.prod.cpu.load", "h"), "cpu.load");
        assert_eq!(strip.apply("prod.a.prod.b", "h"), "a.prod.b");
        assert_eq!(strip.apply("staging.cpu", "h"), "staging.cpu");
        assert_eq!(strip.apply("production.cpu", "h"), "production.cpu");
    }

    #[test]
    fn test_strip_setting() {
        assert_eq!(StripMetric::from_setting(None), StripMetric::Disabled);
        assert_eq!(StripMetric::from_setting(Some("")), StripMetric::Disabled);
        assert_eq!(StripMetric::from_setting(Some("host")), StripMetric::Host);
        assert_eq!(
            StripMetric::from_setting(Some("app")),
            StripMetric::Prefix("app".to_string())
        );
    }

    #[test]
    fn test_escape_reserved_characters() {
        assert_eq!(escape_key("a,b"), "a\\,b");
        assert_eq!(escape_key("a b"), "a\\ b");
        assert_eq!(escape_key("a\"b"), "a\\\"b");
        assert_eq!(escape_key("a\\b"), "a\\\\b");
        assert_eq!(escape_key("plain.key"), "plain.key");
    }

    #[test]
    fn test_escape_leaves_no_bare_reserved_character() {
        let escaped = escape_key("x,\\\" ,y\\");
        let mut chars = escaped.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                let next = chars.next().unwrap();
                assert!(matches!(next, '\\' | ',' | '"' | ' '), "bad escape {next:?}");
            } else {
                assert!(!matches!(c, ',' | '"' | ' '), "bare {c:?} in {escaped}");
            }
        }
    }

    #[test]
    fn test_strip_then_escape() {
        let parsed = parse_line("web01.disk,sda 12 5", "web01", &StripMetric::Host).unwrap();
        assert_eq!(parsed.key, "disk\\,sda");
    }
}

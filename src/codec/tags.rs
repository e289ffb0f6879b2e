use std::collections::BTreeMap;

/// An ordered tag set. A key keeps the position of its first insertion;
/// later inserts of the same key overwrite the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    pairs: Vec<(String, String)>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render `key,tag=value,...`.
    ///
    /// Tag keys and values are written verbatim. A value containing `,`, ` `
    /// or `=` produces a malformed point.
    pub fn append_to(&self, key: &str) -> String {
        let mut series = String::with_capacity(key.len() + self.pairs.len() * 16);
        series.push_str(key);
        for (tag, value) in &self.pairs {
            series.push(',');
            series.push_str(tag);
            series.push('=');
            series.push_str(value);
        }
        series
    }
}

/// Merge tag sources in increasing priority: static instance tags, tags
/// embedded in the check, then `host=<client>`.
pub fn merge_tags(
    static_tags: &BTreeMap<String, String>,
    check_tags: &BTreeMap<String, serde_json::Value>,
    client: &str,
) -> Tags {
    let mut tags = Tags::new();
    for (key, value) in static_tags {
        tags.insert(key.as_str(), value.as_str());
    }
    for (key, value) in check_tags {
        tags.insert(key.as_str(), render_tag_value(value));
    }
    tags.insert("host", client);
    tags
}

/// Text of a tag value as it appears on the wire; strings are unquoted.
pub fn render_tag_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

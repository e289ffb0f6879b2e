use std::fmt;

/// One encoded line-protocol point:
/// `<key>,<tags> value=<v>[,duration=<d>] <timestamp>`.
///
/// Points are immutable once built. The buffer owns them until a flush joins
/// them into a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point(String);

impl Point {
    /// Assemble a point from an already escaped and tagged series key.
    pub fn new(series: &str, value: f64, duration: Option<f64>, timestamp: i64) -> Self {
        let mut line = String::with_capacity(series.len() + 48);
        line.push_str(series);
        line.push_str(" value=");
        line.push_str(&format_float(value));

        if let Some(duration) = duration {
            line.push_str(",duration=");
            line.push_str(&format_float(duration));
        }

        line.push(' ');
        line.push_str(&timestamp.to_string());

        Self(line)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Point {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Format a float field so it always reads as a float on the wire
/// (`1.0`, not `1`).
pub fn format_float(value: f64) -> String {
    format!("{value:?}")
}

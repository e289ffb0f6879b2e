use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Failed to decode event payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A decoded check-result payload.
///
/// Only lives for the duration of one ingestion call.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub client: ClientRef,
    pub check: CheckResult,
}

/// The originating client, sent either as a bare name or as an object with a
/// `name` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClientRef {
    Name(String),
    Named { name: String },
}

impl ClientRef {
    pub fn name(&self) -> &str {
        match self {
            ClientRef::Name(name) | ClientRef::Named { name } => name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckResult {
    /// Newline-delimited `<key> <value> [<timestamp>]` lines.
    #[serde(default)]
    pub output: String,
    #[serde(default, deserialize_with = "lenient_duration")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub time_precision: Option<String>,
    #[serde(default)]
    pub influxdb: Option<CheckOverrides>,
}

/// Per-check overrides carried under `check.influxdb`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckOverrides {
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub time_precision: Option<String>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, serde_json::Value>>,
}

impl RawEvent {
    pub fn decode(payload: &str) -> Result<Self, EventError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Database for this check, falling back to `default`.
    pub fn database<'a>(&'a self, default: Option<&'a str>) -> Option<&'a str> {
        self.check
            .influxdb
            .as_ref()
            .and_then(|o| o.database.as_deref())
            .or(default)
    }

    /// Time precision for this check, falling back to `default`.
    pub fn time_precision<'a>(&'a self, default: Option<&'a str>) -> Option<&'a str> {
        self.check
            .influxdb
            .as_ref()
            .and_then(|o| o.time_precision.as_deref())
            .or(self.check.time_precision.as_deref())
            .or(default)
    }

    /// Tags embedded in the check, empty when absent.
    pub fn check_tags(&self) -> BTreeMap<String, serde_json::Value> {
        self.check
            .influxdb
            .as_ref()
            .and_then(|o| o.tags.clone())
            .unwrap_or_default()
    }

    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.check.output.lines()
    }
}

fn lenient_duration<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(value)) => Some(value),
        Some(NumberOrText::Text(text)) => Some(crate::codec::parse_value(&text)),
        None => None,
    })
}

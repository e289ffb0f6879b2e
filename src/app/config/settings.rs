use super::ConfigError;
use super::serde_helpers::lenient_opt;
use crate::codec::{StripMetric, render_tag_value};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{error, warn};
use url::Url;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8086;
pub const DEFAULT_TIME_PRECISION: &str = "s";
pub const DEFAULT_BUFFER_MAX_SIZE: usize = 500;
pub const DEFAULT_BUFFER_MAX_AGE_SECS: u64 = 6;

/// URL scheme used to reach an instance, derived from its `use_ssl` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn from_use_ssl(use_ssl: bool) -> Self {
        if use_ssl { Scheme::Https } else { Scheme::Http }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings of one instance exactly as written in the settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InstanceSettings {
    pub host: Option<String>,
    #[serde(deserialize_with = "lenient_opt")]
    pub port: Option<u16>,
    pub use_ssl: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub time_precision: Option<String>,
    pub tags: Option<BTreeMap<String, serde_json::Value>>,
    pub strip_metric: StripMetric,
    #[serde(deserialize_with = "lenient_opt")]
    pub buffer_max_size: Option<usize>,
    /// Seconds.
    #[serde(deserialize_with = "lenient_opt")]
    pub buffer_max_age: Option<u64>,
}

impl InstanceSettings {
    /// Apply defaults and validate.
    pub fn resolve(self) -> Result<InstanceConfig, ConfigError> {
        let use_ssl = self.use_ssl.unwrap_or(false);
        let buffer_max_size = match self.buffer_max_size {
            Some(0) => {
                warn!("buffer_max_size 0 flushes on every point, using 1");
                1
            }
            size => size.unwrap_or(DEFAULT_BUFFER_MAX_SIZE),
        };
        let config = InstanceConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            use_ssl,
            protocol: Scheme::from_use_ssl(use_ssl),
            username: self.username,
            password: self.password,
            database: self.database,
            time_precision: self
                .time_precision
                .unwrap_or_else(|| DEFAULT_TIME_PRECISION.to_string()),
            tags: self
                .tags
                .unwrap_or_default()
                .iter()
                .map(|(k, v)| (k.clone(), render_tag_value(v)))
                .collect(),
            strip_metric: self.strip_metric,
            buffer_max_size,
            buffer_max_age: Duration::from_secs(
                self.buffer_max_age.unwrap_or(DEFAULT_BUFFER_MAX_AGE_SECS),
            ),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Resolved, immutable settings of one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceConfig {
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    pub protocol: Scheme,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub time_precision: String,
    pub tags: BTreeMap<String, String>,
    pub strip_metric: StripMetric,
    pub buffer_max_size: usize,
    pub buffer_max_age: Duration,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            use_ssl: false,
            protocol: Scheme::Http,
            username: None,
            password: None,
            database: None,
            time_precision: DEFAULT_TIME_PRECISION.to_string(),
            tags: BTreeMap::new(),
            strip_metric: StripMetric::Disabled,
            buffer_max_size: DEFAULT_BUFFER_MAX_SIZE,
            buffer_max_age: Duration::from_secs(DEFAULT_BUFFER_MAX_AGE_SECS),
        }
    }
}

impl InstanceConfig {
    /// `<protocol>://<host>:<port>`, without credentials.
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// The `/write` URL without query parameters.
    pub fn write_url(&self) -> Result<Url, ConfigError> {
        let raw = format!("{}/write", self.endpoint());
        Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(format!("'{raw}': {e}")))
    }
}

/// All configured instances, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    instances: BTreeMap<String, InstanceConfig>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a `.json` file, or TOML for any other extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Instances are read from `[instances.<name>]` tables, or from the
    /// top-level tables when there is no `instances` table.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut root: toml::Table = toml::from_str(content)?;
        let table = match root.remove("instances") {
            Some(toml::Value::Table(instances)) => instances,
            Some(_) => {
                return Err(ConfigError::InvalidConfig(
                    "`instances` must be a table".to_string(),
                ));
            }
            None => root,
        };

        let entries = table.into_iter().filter_map(|(name, value)| match value {
            toml::Value::Table(_) => Some((name, value.try_into::<InstanceSettings>())),
            _ => {
                warn!("Ignoring non-table settings entry '{}'", name);
                None
            }
        });
        Ok(Self::collect(entries))
    }

    /// Instances are the members of the root object, or of its `influxdb`
    /// member when that is the only key.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let root: serde_json::Value = serde_json::from_str(content)?;
        let serde_json::Value::Object(mut root) = root else {
            return Err(ConfigError::InvalidConfig(
                "settings root must be an object".to_string(),
            ));
        };

        if root.len() == 1 {
            if let Some(serde_json::Value::Object(nested)) = root.get("influxdb") {
                if nested.values().all(serde_json::Value::is_object) {
                    if let Some(serde_json::Value::Object(nested)) = root.remove("influxdb") {
                        root = nested;
                    }
                }
            }
        }

        let entries = root.into_iter().filter_map(|(name, value)| {
            if value.is_object() {
                Some((name, serde_json::from_value::<InstanceSettings>(value)))
            } else {
                warn!("Ignoring non-object settings entry '{}'", name);
                None
            }
        });
        Ok(Self::collect(entries))
    }

    // An instance that fails to deserialize or validate is logged and left
    // out; the remaining instances still load.
    fn collect<E: fmt::Display>(
        entries: impl Iterator<Item = (String, Result<InstanceSettings, E>)>,
    ) -> Self {
        let mut settings = Self::new();
        for (name, parsed) in entries {
            match parsed {
                Ok(raw) => match raw.resolve() {
                    Ok(config) => settings.insert(name, config),
                    Err(e) => error!("Failed to parse settings for instance {}: {}", name, e),
                },
                Err(e) => error!("Failed to parse settings for instance {}: {}", name, e),
            }
        }
        settings
    }

    pub fn insert(&mut self, name: impl Into<String>, config: InstanceConfig) {
        self.instances.insert(name.into(), config);
    }

    pub fn get(&self, name: &str) -> Option<&InstanceConfig> {
        self.instances.get(name)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }

    pub fn into_instances(self) -> impl Iterator<Item = (String, InstanceConfig)> {
        self.instances.into_iter()
    }
}

use influx_forwarder::app::config::{ConfigError, Scheme, Settings};
use influx_forwarder::codec::StripMetric;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_toml_instances() {
    let file = temp_file(
        ".toml",
        r#"
[instances.primary]
host = "influx-a.internal"
use_ssl = true
username = "writer"
password = "secret"
database = "sensu"
time_precision = "ms"
strip_metric = "host"
buffer_max_size = 100
buffer_max_age = 10

[instances.primary.tags]
region = "eu-west"

[instances.backup]
host = "influx-b.internal"
port = "9086"
"#,
    );

    let settings = Settings::from_file(file.path()).unwrap();
    assert_eq!(settings.len(), 2);
    assert_eq!(settings.names().collect::<Vec<_>>(), vec!["backup", "primary"]);

    let primary = settings.get("primary").unwrap();
    assert_eq!(primary.protocol, Scheme::Https);
    assert_eq!(primary.port, 8086);
    assert_eq!(primary.database.as_deref(), Some("sensu"));
    assert_eq!(primary.time_precision, "ms");
    assert_eq!(primary.strip_metric, StripMetric::Host);
    assert_eq!(primary.buffer_max_size, 100);
    assert_eq!(primary.buffer_max_age, Duration::from_secs(10));
    assert_eq!(primary.tags["region"], "eu-west");

    let backup = settings.get("backup").unwrap();
    assert_eq!(backup.protocol, Scheme::Http);
    assert_eq!(backup.port, 9086);
    assert_eq!(backup.buffer_max_size, 500);
    assert_eq!(backup.buffer_max_age, Duration::from_secs(6));
}

#[test]
fn test_load_toml_without_instances_table() {
    let settings = Settings::from_toml_str(
        r#"
[local]
database = "metrics"
"#,
    )
    .unwrap();
    assert_eq!(settings.get("local").unwrap().host, "localhost");
}

#[test]
fn test_load_json_nested_under_influxdb() {
    let file = temp_file(
        ".json",
        r#"{"influxdb": {
            "prod": {"host": "10.0.0.5", "port": 8086, "database": "graphite",
                     "tags": {"dc": "fra", "rack": 12}, "strip_metric": "servers"},
            "dev": {"host": "127.0.0.1", "use_ssl": false, "buffer_max_age": "2"}
        }}"#,
    );

    let settings = Settings::from_file(file.path()).unwrap();
    assert_eq!(settings.len(), 2);

    let prod = settings.get("prod").unwrap();
    assert_eq!(prod.tags["rack"], "12");
    assert_eq!(prod.strip_metric, StripMetric::Prefix("servers".to_string()));
    assert_eq!(settings.get("dev").unwrap().buffer_max_age, Duration::from_secs(2));
}

#[test]
fn test_single_json_instance_named_influxdb() {
    let settings =
        Settings::from_json_str(r#"{"influxdb": {"host": "db.local", "database": "x"}}"#)
            .unwrap();
    assert_eq!(settings.len(), 1);
    assert_eq!(settings.get("influxdb").unwrap().host, "db.local");
}

#[test]
fn test_broken_instance_does_not_drop_others() {
    let settings = Settings::from_json_str(
        r#"{
            "good": {"host": "a.local"},
            "bad_port": {"host": "b.local", "port": "not-a-port"},
            "zero_size": {"host": "c.local", "buffer_max_size": 0},
            "bad_host": {"host": "has space"},
            "scalar": 5
        }"#,
    )
    .unwrap();

    assert_eq!(
        settings.names().collect::<Vec<_>>(),
        vec!["good", "zero_size"]
    );
    assert_eq!(settings.get("zero_size").unwrap().buffer_max_size, 1);
}

#[test]
fn test_unparseable_files_are_errors() {
    assert!(matches!(
        Settings::from_toml_str("[instances"),
        Err(ConfigError::ParseError(_))
    ));
    assert!(matches!(
        Settings::from_json_str("{"),
        Err(ConfigError::JsonError(_))
    ));
    assert!(matches!(
        Settings::from_json_str("[1, 2]"),
        Err(ConfigError::InvalidConfig(_))
    ));
    assert!(matches!(
        Settings::from_file("/nonexistent/influx-forwarder.toml"),
        Err(ConfigError::FileError(_))
    ));
}

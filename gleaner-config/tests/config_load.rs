use gleaner_common::observability::LogFormat;
use gleaner_config::GleanerConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
sitemap_url: "https://${SITE_HOST}/sitemap.xml"
exclude: ["/search", "/tag/"]
output_dir: out
min_word_count: 5
tags: [h1, h2, p]
delay:
  min_secs: 1
  max_secs: 2
http:
  timeout_secs: 30
  user_agent: "gleaner-test"
log:
  format: json
  stderr: false
"#;

#[test]
#[serial]
fn loads_file_and_expands_env() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "gleaner.yaml", FILE_YAML);

    let config = temp_env::with_var("SITE_HOST", Some("docs.example.com"), || {
        GleanerConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load gleaner config")
    });

    assert_eq!(
        config.sitemap_url.as_deref(),
        Some("https://docs.example.com/sitemap.xml")
    );
    assert_eq!(config.exclude, vec!["/search", "/tag/"]);
    assert_eq!(config.output_dir, PathBuf::from("out"));
    assert_eq!(config.min_word_count, 5);
    assert_eq!(config.tags, vec!["h1", "h2", "p"]);
    assert_eq!(config.delay.min_secs, 1);
    assert_eq!(config.delay.max_secs, 2);
    assert_eq!(config.http.timeout_secs, 30);
    assert_eq!(config.http.user_agent.as_deref(), Some("gleaner-test"));
    assert_eq!(config.log.format, LogFormat::Json);
    assert!(!config.log.stderr);
}

#[test]
#[serial]
fn env_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "gleaner.yaml", FILE_YAML);

    let config = temp_env::with_vars(
        [
            ("SITE_HOST", Some("docs.example.com")),
            ("GLEANER_MIN_WORD_COUNT", Some("12")),
            ("GLEANER_DELAY__MAX_SECS", Some("9")),
            ("GLEANER_OUTPUT_DIR", Some("elsewhere")),
        ],
        || GleanerConfigLoader::new().with_file(&p).load().unwrap(),
    );

    assert_eq!(config.min_word_count, 12);
    assert_eq!(config.delay.max_secs, 9);
    assert_eq!(config.delay.min_secs, 1);
    assert_eq!(config.output_dir, PathBuf::from("elsewhere"));
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = GleanerConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .unwrap();

    assert!(config.sitemap_url.is_none());
    assert_eq!(config.min_word_count, 10);
    assert_eq!(config.tags, vec!["h1", "p"]);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = GleanerConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}

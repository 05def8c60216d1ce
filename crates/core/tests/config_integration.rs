//! trailscope.toml 통합 설정 테스트
//!
//! - trailscope.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use trailscope_core::config::{EnrichmentKey, KeyDateLayout, SinkKind, TrailscopeConfig};
use trailscope_core::error::{ConfigError, TrailscopeError};

const EXAMPLE: &str = include_str!("../../../trailscope.toml.example");

/// 환경변수를 설정하고 클로저 실행 후 원래 값으로 되돌립니다.
fn with_env<T>(key: &str, value: &str, f: impl FnOnce() -> T) -> T {
    let original = std::env::var(key).ok();
    // SAFETY: 환경변수 테스트는 serial_test로 직렬화됩니다.
    unsafe {
        std::env::set_var(key, value);
    }

    let result = f();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var(key, val),
            None => std::env::remove_var(key),
        }
    }
    result
}

// =============================================================================
// trailscope.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = TrailscopeConfig::parse(EXAMPLE).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.aws.region, "ap-northeast-2");
}

#[test]
fn example_config_passes_validation() {
    let config = TrailscopeConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let example = TrailscopeConfig::parse(EXAMPLE).expect("should parse");
    let defaults = TrailscopeConfig::default();

    assert_eq!(example.access_log.enrich_from, defaults.access_log.enrich_from);
    assert_eq!(example.access_log.key_date, defaults.access_log.key_date);
    assert_eq!(example.flow_log.key_date, defaults.flow_log.key_date);
    assert_eq!(example.audit.page_size, defaults.audit.page_size);
    assert_eq!(example.audit.excluded_user, defaults.audit.excluded_user);
    assert_eq!(example.sink.kind, defaults.sink.kind);
    assert_eq!(example.sink.output_dir, defaults.sink.output_dir);
}

#[test]
fn example_config_is_missing_credentials() {
    let config = TrailscopeConfig::parse(EXAMPLE).expect("should parse");
    let err = config.require_collection_settings().unwrap_err();
    assert!(matches!(
        err,
        TrailscopeError::Config(ConfigError::Missing { .. })
    ));
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_general_only() {
    let toml = r#"
[general]
log_level = "debug"
"#;
    let config = TrailscopeConfig::parse(toml).expect("should parse");
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.audit.excluded_user, "AISAWS");
}

#[test]
fn partial_config_access_log_only() {
    let toml = r#"
[access_log]
bucket = "my-access-logs"
enrich_from = "remote_ip"
"#;
    let config = TrailscopeConfig::parse(toml).expect("should parse");
    assert_eq!(config.access_log.bucket, "my-access-logs");
    assert_eq!(config.access_log.prefix, "");
    assert_eq!(config.access_log.enrich_from, EnrichmentKey::RemoteIp);
    assert_eq!(config.access_log.key_date, KeyDateLayout::Embedded);
}

#[test]
fn partial_config_regex_layout() {
    let toml = r#"
[flow_log.key_date]
kind = "regex"
pattern = "dt=(?P<year>\\d{4})-(?P<month>\\d{2})-(?P<day>\\d{2})"
"#;
    let config = TrailscopeConfig::parse(toml).expect("should parse");
    config.validate().expect("named groups present");
    match config.flow_log.key_date {
        KeyDateLayout::Regex { pattern } => assert!(pattern.starts_with("dt=")),
        other => panic!("unexpected layout: {other:?}"),
    }
}

#[test]
fn partial_config_file_sink() {
    let toml = r#"
[sink]
kind = "file"
output_dir = "/tmp/trailscope-out"
"#;
    let config = TrailscopeConfig::parse(toml).expect("should parse");
    assert_eq!(config.sink.kind, SinkKind::File);
    assert_eq!(config.sink.output_dir, "/tmp/trailscope-out");
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;
    let result = with_env("TRAILSCOPE_GENERAL_LOG_LEVEL", "error", || {
        let mut config = TrailscopeConfig::parse(toml).expect("should parse");
        config.apply_env_overrides();
        config.general.log_level
    });
    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_credentials() {
    let config = with_env("TRAILSCOPE_AWS_ACCESS_KEY", "AKIAENV", || {
        with_env("TRAILSCOPE_AWS_SECRET_KEY", "secret-env", || {
            let mut config = TrailscopeConfig::default();
            config.apply_env_overrides();
            config
        })
    });
    assert_eq!(config.aws.access_key, "AKIAENV");
    assert_eq!(config.aws.secret_key, "secret-env");
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let page_size = with_env("TRAILSCOPE_AUDIT_PAGE_SIZE", "25", || {
        let mut config = TrailscopeConfig::default();
        config.apply_env_overrides();
        config.audit.page_size
    });
    assert_eq!(page_size, 25);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_numeric_keeps_value() {
    let page_size = with_env("TRAILSCOPE_AUDIT_PAGE_SIZE", "lots", || {
        let mut config = TrailscopeConfig::default();
        config.apply_env_overrides();
        config.audit.page_size
    });
    assert_eq!(page_size, 50);
}

#[test]
#[serial_test::serial]
fn env_override_geoip_and_sink() {
    let config = with_env("TRAILSCOPE_GEOIP_DB_PATH", "/data/country.mmdb", || {
        with_env("TRAILSCOPE_SINK_KIND", "file", || {
            let mut config = TrailscopeConfig::default();
            config.apply_env_overrides();
            config
        })
    });
    assert_eq!(config.geoip.db_path, "/data/country.mmdb");
    assert_eq!(config.sink.kind, SinkKind::File);
}

#[tokio::test]
#[serial_test::serial]
async fn load_applies_env_after_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("trailscope.toml");
    std::fs::write(&path, "[flow_log]\nbucket = \"from-file\"\n").expect("write config");

    let original = std::env::var("TRAILSCOPE_FLOW_LOG_BUCKET").ok();
    // SAFETY: 환경변수 테스트는 serial_test로 직렬화됩니다.
    unsafe {
        std::env::set_var("TRAILSCOPE_FLOW_LOG_BUCKET", "from-env");
    }
    let result = TrailscopeConfig::load(&path).await;
    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("TRAILSCOPE_FLOW_LOG_BUCKET", val),
            None => std::env::remove_var("TRAILSCOPE_FLOW_LOG_BUCKET"),
        }
    }

    let config = result.expect("should load");
    assert_eq!(config.flow_log.bucket, "from-env");
}

// =============================================================================
// 에러 케이스 테스트
// =============================================================================

#[test]
fn empty_string_parses_with_defaults() {
    let config = TrailscopeConfig::parse("").expect("empty should parse");
    assert_eq!(config.general.log_level, "info");
}

#[test]
fn comments_only_parses_with_defaults() {
    let config = TrailscopeConfig::parse("# nothing here\n# still nothing\n").expect("should parse");
    assert_eq!(config.sink.kind, SinkKind::Mongodb);
}

#[test]
fn malformed_toml_returns_parse_error() {
    let err = TrailscopeConfig::parse("[general\nlog_level = ").unwrap_err();
    assert!(matches!(
        err,
        TrailscopeError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn unknown_layout_kind_returns_parse_error() {
    let toml = r#"
[flow_log.key_date]
kind = "template"
"#;
    assert!(TrailscopeConfig::parse(toml).is_err());
}

#[test]
fn unknown_sink_kind_returns_parse_error() {
    assert!(TrailscopeConfig::parse("[sink]\nkind = \"postgres\"\n").is_err());
}

#[test]
fn wrong_type_for_numeric_field() {
    assert!(TrailscopeConfig::parse("[audit]\npage_size = \"fifty\"\n").is_err());
}

#[test]
fn unknown_section_is_ignored() {
    let toml = r#"
[general]
log_level = "warn"

[future_feature]
enabled = true
"#;
    let config = TrailscopeConfig::parse(toml).expect("unknown sections ignored");
    assert_eq!(config.general.log_level, "warn");
}

#[tokio::test]
async fn from_file_nonexistent_returns_file_not_found() {
    let result = TrailscopeConfig::from_file("/tmp/trailscope_test_nonexistent_12345.toml").await;
    assert!(matches!(
        result.unwrap_err(),
        TrailscopeError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn from_file_rejects_invalid_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("trailscope.toml");
    std::fs::write(&path, "[audit]\npage_size = 500\n").expect("write config");

    let err = TrailscopeConfig::from_file(&path).await.unwrap_err();
    assert!(matches!(
        err,
        TrailscopeError::Config(ConfigError::InvalidValue { .. })
    ));
}

// =============================================================================
// 직렬화 라운드트립 테스트
// =============================================================================

#[test]
fn example_config_serialize_roundtrip() {
    let config = TrailscopeConfig::parse(EXAMPLE).expect("should parse");
    let serialized = toml::to_string_pretty(&config).expect("should serialize");
    let reparsed = TrailscopeConfig::parse(&serialized).expect("should reparse");

    assert_eq!(config.flow_log.key_date, reparsed.flow_log.key_date);
    assert_eq!(config.access_log.enrich_from, reparsed.access_log.enrich_from);
    assert_eq!(config.aws.region, reparsed.aws.region);
}

//! 설정 관리: trailscope.toml 파싱 및 런타임 설정
//!
//! [`TrailscopeConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TRAILSCOPE_AWS_REGION=ap-northeast-2` 형식)
//! 3. 설정 파일 (`trailscope.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), trailscope_core::error::TrailscopeError> {
//! use trailscope_core::config::TrailscopeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TrailscopeConfig::load("trailscope.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TrailscopeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TrailscopeError};

/// LookupEvents API가 허용하는 최대 페이지 크기
pub const MAX_AUDIT_PAGE_SIZE: i32 = 50;

/// Trailscope 통합 설정
///
/// `trailscope.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailscopeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// AWS 자격증명 및 리전
    #[serde(default)]
    pub aws: AwsConfig,
    /// 액세스 로그 소스 설정
    #[serde(default)]
    pub access_log: AccessLogConfig,
    /// 플로우 로그 소스 설정
    #[serde(default)]
    pub flow_log: FlowLogConfig,
    /// 감사 이벤트 소스 설정
    #[serde(default)]
    pub audit: AuditConfig,
    /// 국가 조회 DB 설정
    #[serde(default)]
    pub geoip: GeoIpConfig,
    /// 레코드 저장소 설정
    #[serde(default)]
    pub sink: SinkConfig,
}

impl TrailscopeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TrailscopeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TrailscopeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TrailscopeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TrailscopeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TrailscopeError> {
        toml::from_str(toml_str).map_err(|e| {
            TrailscopeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TRAILSCOPE_{SECTION}_{FIELD}`
    /// 예: `TRAILSCOPE_GEOIP_DB_PATH=GeoLite2-Country.mmdb`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TRAILSCOPE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TRAILSCOPE_GENERAL_LOG_FORMAT");

        // AWS
        override_string(&mut self.aws.access_key, "TRAILSCOPE_AWS_ACCESS_KEY");
        override_string(&mut self.aws.secret_key, "TRAILSCOPE_AWS_SECRET_KEY");
        override_string(&mut self.aws.region, "TRAILSCOPE_AWS_REGION");

        // Access log
        override_string(&mut self.access_log.bucket, "TRAILSCOPE_ACCESS_LOG_BUCKET");
        override_string(&mut self.access_log.prefix, "TRAILSCOPE_ACCESS_LOG_PREFIX");

        // Flow log
        override_string(&mut self.flow_log.bucket, "TRAILSCOPE_FLOW_LOG_BUCKET");
        override_string(&mut self.flow_log.prefix, "TRAILSCOPE_FLOW_LOG_PREFIX");

        // Audit
        override_i32(&mut self.audit.page_size, "TRAILSCOPE_AUDIT_PAGE_SIZE");
        override_string(
            &mut self.audit.excluded_user,
            "TRAILSCOPE_AUDIT_EXCLUDED_USER",
        );

        // GeoIP
        override_string(&mut self.geoip.db_path, "TRAILSCOPE_GEOIP_DB_PATH");

        // Sink
        override_sink_kind(&mut self.sink.kind, "TRAILSCOPE_SINK_KIND");
        override_string(&mut self.sink.mongodb_uri, "TRAILSCOPE_SINK_MONGODB_URI");
        override_string(&mut self.sink.output_dir, "TRAILSCOPE_SINK_OUTPUT_DIR");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 자격증명처럼 수집 시점에만 필요한 값은 [`require_collection_settings`](Self::require_collection_settings)에서 확인합니다.
    pub fn validate(&self) -> Result<(), TrailscopeError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.audit.page_size < 1 || self.audit.page_size > MAX_AUDIT_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "audit.page_size".to_owned(),
                reason: format!("must be 1-{MAX_AUDIT_PAGE_SIZE}"),
            }
            .into());
        }

        self.access_log.key_date.validate("access_log.key_date")?;
        self.flow_log.key_date.validate("flow_log.key_date")?;

        if self.sink.kind == SinkKind::File && self.sink.output_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sink.output_dir".to_owned(),
                reason: "must not be empty when sink.kind = \"file\"".to_owned(),
            }
            .into());
        }

        Ok(())
    }

    /// 수집 실행 전에 필수 값(자격증명, 버킷, 저장소 주소)이 채워졌는지 확인합니다.
    ///
    /// 누락된 값이 있으면 어떤 어댑터도 시작하지 않고 실패합니다.
    pub fn require_collection_settings(&self) -> Result<(), TrailscopeError> {
        let required = [
            ("aws.access_key", &self.aws.access_key),
            ("aws.secret_key", &self.aws.secret_key),
            ("aws.region", &self.aws.region),
            ("access_log.bucket", &self.access_log.bucket),
            ("flow_log.bucket", &self.flow_log.bucket),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing {
                    field: field.to_owned(),
                }
                .into());
            }
        }

        if self.sink.kind == SinkKind::Mongodb && self.sink.mongodb_uri.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "sink.mongodb_uri".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// AWS 자격증명 및 리전
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// 액세스 키 ID
    pub access_key: String,
    /// 시크릿 액세스 키
    pub secret_key: String,
    /// 리전 (예: ap-northeast-2)
    pub region: String,
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("region", &self.region)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "***" }
}

/// 오브젝트 키에서 로그 날짜를 찾는 방식
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyDateLayout {
    /// 키 어디서든 처음 나오는 `YYYY-MM-DD`
    Embedded,
    /// `/`로 나눈 경로에서 끝에서 `year_from_end`번째 세그먼트가 연도, 그 뒤 두 세그먼트가 월/일
    Segments { year_from_end: usize },
    /// `year`, `month`, `day` 이름 그룹을 가진 정규식
    Regex { pattern: String },
}

impl KeyDateLayout {
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        match self {
            Self::Embedded => Ok(()),
            Self::Segments { year_from_end } if *year_from_end < 3 => {
                Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "year_from_end must be at least 3 (year/month/day)".to_owned(),
                })
            }
            Self::Segments { .. } => Ok(()),
            Self::Regex { pattern } => {
                let missing: Vec<&str> = ["year", "month", "day"]
                    .into_iter()
                    .filter(|group| !pattern.contains(&format!("(?P<{group}>")))
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidValue {
                        field: field.to_owned(),
                        reason: format!("pattern is missing named groups: {}", missing.join(", ")),
                    })
                }
            }
        }
    }
}

/// 액세스 로그의 국가 조회 키
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentKey {
    /// requester 토큰 (기존 수집 데이터와 호환)
    #[default]
    Requester,
    /// 보정된 remote_ip 필드
    RemoteIp,
}

/// 액세스 로그 소스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// 로그가 저장된 버킷
    pub bucket: String,
    /// 버킷 내 접두사 (예: "logs/s3/")
    pub prefix: String,
    /// 국가 조회에 사용할 필드
    pub enrich_from: EnrichmentKey,
    /// 키에서 날짜를 찾는 방식
    pub key_date: KeyDateLayout,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: String::new(),
            enrich_from: EnrichmentKey::Requester,
            key_date: KeyDateLayout::Embedded,
        }
    }
}

/// 플로우 로그 소스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowLogConfig {
    /// 로그가 저장된 버킷
    pub bucket: String,
    /// 버킷 내 접두사 (예: "logs/vpc/")
    pub prefix: String,
    /// 키에서 날짜를 찾는 방식
    pub key_date: KeyDateLayout,
}

impl Default for FlowLogConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: String::new(),
            key_date: KeyDateLayout::Segments { year_from_end: 5 },
        }
    }
}

/// 감사 이벤트 소스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// LookupEvents 페이지 크기 (1-50)
    pub page_size: i32,
    /// 수집에서 제외할 시스템 계정 이름
    pub excluded_user: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_AUDIT_PAGE_SIZE,
            excluded_user: "AISAWS".to_owned(),
        }
    }
}

/// 국가 조회 DB 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoIpConfig {
    /// MaxMind 국가 DB 경로 (상대 경로는 작업 디렉토리 기준)
    ///
    /// 비어 있으면 첫 조회 시점에 설정 에러가 발생합니다.
    pub db_path: String,
}

/// 저장소 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// MongoDB (소스 = 데이터베이스, 기간 레이블 = 컬렉션)
    #[default]
    Mongodb,
    /// 로컬 JSON 파일 (`{output_dir}/{source}.{label}.json`)
    File,
}

impl std::str::FromStr for SinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongodb" => Ok(Self::Mongodb),
            "file" => Ok(Self::File),
            other => Err(ConfigError::InvalidValue {
                field: "sink.kind".to_owned(),
                reason: format!("unknown sink '{other}', expected 'mongodb' or 'file'"),
            }),
        }
    }
}

/// 레코드 저장소 설정
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// 저장소 종류
    pub kind: SinkKind,
    /// MongoDB 연결 문자열
    pub mongodb_uri: String,
    /// 파일 저장소 출력 디렉토리
    pub output_dir: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Mongodb,
            mongodb_uri: String::new(),
            output_dir: "logs".to_owned(),
        }
    }
}

impl std::fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkConfig")
            .field("kind", &self.kind)
            .field("mongodb_uri", &redact(&self.mongodb_uri))
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_i32(target: &mut i32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<i32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse i32 from env var, ignoring"
            ),
        }
    }
}

fn override_sink_kind(target: &mut SinkKind, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<SinkKind>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse sink kind from env var, ignoring"
            ),
        }
    }
}

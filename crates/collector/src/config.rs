//! 수집기 설정
//!
//! [`CollectorConfig`]는 core의 [`TrailscopeConfig`]에서 수집에 필요한 값만 모은
//! 런타임 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use trailscope_core::config::TrailscopeConfig;
//! use trailscope_collector::config::CollectorConfig;
//!
//! let core_config = TrailscopeConfig::default();
//! let config = CollectorConfig::from_core(&core_config);
//! ```

use serde::{Deserialize, Serialize};
use trailscope_core::config::{
    EnrichmentKey, KeyDateLayout, MAX_AUDIT_PAGE_SIZE, TrailscopeConfig,
};

use crate::error::CollectorError;
use crate::source::key_date::KeyDateExtractor;

/// 오브젝트 스토리지 소스 하나의 위치와 날짜 추출 방식
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSourceConfig {
    /// 버킷 이름
    pub bucket: String,
    /// 키 접두사
    pub prefix: String,
    /// 키에서 날짜를 찾는 방식
    pub key_date: KeyDateLayout,
}

/// 수집기 런타임 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// 액세스 로그 위치
    pub access_log: ObjectSourceConfig,
    /// 플로우 로그 위치
    pub flow_log: ObjectSourceConfig,
    /// 액세스 로그 국가 조회 키
    pub enrich_from: EnrichmentKey,
    /// LookupEvents 페이지 크기
    pub audit_page_size: i32,
    /// 수집에서 제외할 시스템 계정 (빈 문자열이면 제외 없음)
    pub excluded_user: String,
    /// 국가 조회 DB 경로 (빈 문자열이면 첫 조회 시 설정 에러)
    pub geoip_db_path: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::from_core(&TrailscopeConfig::default())
    }
}

impl CollectorConfig {
    /// core 설정에서 수집기 설정을 생성합니다.
    pub fn from_core(core: &TrailscopeConfig) -> Self {
        Self {
            access_log: ObjectSourceConfig {
                bucket: core.access_log.bucket.clone(),
                prefix: core.access_log.prefix.clone(),
                key_date: core.access_log.key_date.clone(),
            },
            flow_log: ObjectSourceConfig {
                bucket: core.flow_log.bucket.clone(),
                prefix: core.flow_log.prefix.clone(),
                key_date: core.flow_log.key_date.clone(),
            },
            enrich_from: core.access_log.enrich_from,
            audit_page_size: core.audit.page_size,
            excluded_user: core.audit.excluded_user.clone(),
            geoip_db_path: core.geoip.db_path.clone(),
        }
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 정규식 날짜 추출 방식은 여기서 컴파일해 봅니다.
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.audit_page_size < 1 || self.audit_page_size > MAX_AUDIT_PAGE_SIZE {
            return Err(CollectorError::Config {
                field: "audit_page_size".to_owned(),
                reason: format!("must be 1-{MAX_AUDIT_PAGE_SIZE}"),
            });
        }

        KeyDateExtractor::new(&self.access_log.key_date)?;
        KeyDateExtractor::new(&self.flow_log.key_date)?;

        Ok(())
    }
}

/// 수집기 설정 빌더
#[derive(Default)]
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 액세스 로그 버킷과 접두사를 설정합니다.
    pub fn access_log(mut self, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.config.access_log.bucket = bucket.into();
        self.config.access_log.prefix = prefix.into();
        self
    }

    /// 플로우 로그 버킷과 접두사를 설정합니다.
    pub fn flow_log(mut self, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.config.flow_log.bucket = bucket.into();
        self.config.flow_log.prefix = prefix.into();
        self
    }

    /// 플로우 로그 날짜 추출 방식을 설정합니다.
    pub fn flow_log_key_date(mut self, layout: KeyDateLayout) -> Self {
        self.config.flow_log.key_date = layout;
        self
    }

    /// 액세스 로그 날짜 추출 방식을 설정합니다.
    pub fn access_log_key_date(mut self, layout: KeyDateLayout) -> Self {
        self.config.access_log.key_date = layout;
        self
    }

    /// 액세스 로그 국가 조회 키를 설정합니다.
    pub fn enrich_from(mut self, key: EnrichmentKey) -> Self {
        self.config.enrich_from = key;
        self
    }

    /// 감사 이벤트 페이지 크기를 설정합니다.
    pub fn audit_page_size(mut self, size: i32) -> Self {
        self.config.audit_page_size = size;
        self
    }

    /// 제외할 시스템 계정을 설정합니다.
    pub fn excluded_user(mut self, user: impl Into<String>) -> Self {
        self.config.excluded_user = user.into();
        self
    }

    /// 국가 조회 DB 경로를 설정합니다.
    pub fn geoip_db_path(mut self, path: impl Into<String>) -> Self {
        self.config.geoip_db_path = path.into();
        self
    }

    /// 설정을 검증하고 `CollectorConfig`를 생성합니다.
    pub fn build(self) -> Result<CollectorConfig, CollectorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

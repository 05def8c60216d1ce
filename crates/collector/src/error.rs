//! 수집기 에러 타입
//!
//! [`CollectorError`]는 수집기 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<CollectorError> for TrailscopeError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 라인/이벤트 단위 파싱 실패는 여기 없습니다. 그런 실패는 드롭 후
//! [`DropStats`](crate::source::DropStats)에 집계됩니다.

use trailscope_core::error::{ConfigError, StorageError, TrailscopeError, UpstreamError};

/// 수집기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// 설정 에러 (실행 전체 중단)
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 국가 조회 DB를 열 수 없음 (첫 조회 시점에 발생, 실행 전체 중단)
    #[error("country database unavailable at '{path}': {reason}")]
    GeoDatabase {
        /// 해석된 DB 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 업스트림 API 호출 실패 (해당 소스만 중단)
    #[error("{service} api error: {reason}")]
    Upstream {
        /// 서비스 이름 (s3, cloudtrail)
        service: String,
        /// 에러 사유
        reason: String,
    },

    /// 객체 다운로드 실패 (해당 소스만 중단)
    #[error("download failed: {key}: {reason}")]
    Download {
        /// 객체 키
        key: String,
        /// 에러 사유
        reason: String,
    },

    /// 저장소 연결 실패
    #[error("sink connection error: {0}")]
    SinkConnection(String),

    /// 저장소 쓰기 실패
    #[error("sink write error: {target}: {reason}")]
    SinkWrite {
        /// 저장 주소 (`{source}.{label}`)
        target: String,
        /// 에러 사유
        reason: String,
    },

    /// 호출자가 취소함
    #[error("collection cancelled")]
    Cancelled,

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// 직렬화 에러
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CollectorError {
    /// 실행 전체를 중단해야 하는 설정 에러인지 확인합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::GeoDatabase { .. } | Self::Regex(_) | Self::Cancelled
        )
    }
}

impl From<CollectorError> for TrailscopeError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::Config { field, reason } => {
                TrailscopeError::Config(ConfigError::InvalidValue { field, reason })
            }
            CollectorError::GeoDatabase { path, reason } => {
                TrailscopeError::Config(ConfigError::InvalidValue {
                    field: "geoip.db_path".to_owned(),
                    reason: format!("{path}: {reason}"),
                })
            }
            CollectorError::Regex(e) => TrailscopeError::Config(ConfigError::InvalidValue {
                field: "key_date.pattern".to_owned(),
                reason: e.to_string(),
            }),
            CollectorError::Upstream { service, reason } => {
                TrailscopeError::Upstream(UpstreamError::Api { service, reason })
            }
            CollectorError::Download { key, reason } => {
                TrailscopeError::Upstream(UpstreamError::Download { key, reason })
            }
            CollectorError::SinkConnection(reason) => {
                TrailscopeError::Storage(StorageError::Connection(reason))
            }
            CollectorError::SinkWrite { target, reason } => {
                TrailscopeError::Storage(StorageError::Write { target, reason })
            }
            CollectorError::Serialization(e) => TrailscopeError::Storage(StorageError::Write {
                target: "serialization".to_owned(),
                reason: e.to_string(),
            }),
            CollectorError::Cancelled => TrailscopeError::Cancelled,
            CollectorError::Io(e) => TrailscopeError::Io(e),
        }
    }
}

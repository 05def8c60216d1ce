//! 에러 타입: 도메인별 에러 정의
//!
//! 레코드/라인 단위 파싱 실패는 에러로 전파되지 않습니다 (드롭 후 카운트).
//! 여기 정의된 에러는 실행 전체 또는 소스 하나를 중단시키는 실패만 표현합니다.

/// Trailscope 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TrailscopeError {
    /// 설정 관련 에러 (치명적, 부분 작업 없음)
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 수집 기간 에러 (어댑터 시작 전 치명적)
    #[error("range error: {0}")]
    Range(#[from] RangeError),

    /// 업스트림 API 에러 (해당 소스만 중단)
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// 저장소 에러 (소스별로 기록 후 계속 진행)
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 호출자가 수집을 취소함
    #[error("collection cancelled")]
    Cancelled,
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// 필수 설정 누락
    #[error("missing required config value '{field}'")]
    Missing { field: String },
}

/// 수집 기간 에러
#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    /// `YYYY-MM-DD` 형식이 아닌 날짜
    #[error("invalid date format: '{input}' (expected YYYY-MM-DD)")]
    InvalidDateFormat { input: String },
}

/// 업스트림 API 에러
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// API 호출 실패 (목록 조회, 페이지 조회)
    #[error("{service} api call failed: {reason}")]
    Api { service: String, reason: String },

    /// 객체 다운로드 실패
    #[error("failed to download '{key}': {reason}")]
    Download { key: String, reason: String },
}

/// 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 쓰기 실패
    #[error("write to {target} failed: {reason}")]
    Write { target: String, reason: String },
}

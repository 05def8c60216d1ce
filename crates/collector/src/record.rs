//! 정규화 레코드: 소스별 출력 스키마
//!
//! 필드 이름은 저장소를 읽는 쪽 (집계 쿼리, 분석 파이프라인)과의 계약이므로
//! serde 이름을 바꾸면 안 됩니다.

use serde::{Deserialize, Serialize};

/// 정수로 읽히면 정수, 아니면 원문 그대로 두는 필드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    /// 정수로 변환된 값
    Int(i64),
    /// 원문 (`-` 등)
    Text(String),
}

impl NumericField {
    /// 토큰을 정수로 변환해 보고, 실패하면 원문을 유지합니다.
    pub fn parse(token: &str) -> Self {
        token
            .parse::<i64>()
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Text(token.to_owned()))
    }

    /// 정수 값
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

/// 오브젝트 스토리지 서버 액세스 로그 한 줄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub bucket_owner: String,
    pub bucket: String,
    /// RFC 3339 시각, 변환에 실패하면 원래 대괄호 토큰
    pub time: String,
    pub remote_ip: Option<String>,
    pub requester: String,
    pub request_id: String,
    pub operation: String,
    pub key: Option<String>,
    pub request_uri: String,
    pub http_status: String,
    pub status_code: Option<String>,
    pub bytes_sent: NumericField,
    pub object_size: NumericField,
    pub total_time: NumericField,
    pub turnaround_time: NumericField,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub version_id: Option<String>,
    pub country: Option<String>,
}

/// 네트워크 플로우 로그 한 줄 (기본 14개 필드 형식)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLogEntry {
    pub version: String,
    pub account_id: String,
    pub interface_id: String,
    pub srcaddr: String,
    pub dstaddr: String,
    pub srcport: u16,
    pub dstport: u16,
    pub protocol: String,
    pub packets: u64,
    pub bytes: u64,
    /// 집계 구간 시작 (epoch 초)
    pub start: i64,
    /// 집계 구간 끝 (epoch 초)
    pub end: i64,
    pub action: String,
    pub log_status: String,
    pub country: Option<String>,
}

/// 감사 이벤트가 참조한 리소스
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuditResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
}

/// LookupEvents API가 돌려준 감사 이벤트 + 국가 코드
///
/// API 필드는 응답에 있을 때만 직렬화됩니다. `country`는 항상 포함됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuditEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS+00:00`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<AuditResource>,
    /// 원본 이벤트 JSON 문자열
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_trail_event: Option<String>,
    #[serde(rename = "country")]
    pub country: Option<String>,
}

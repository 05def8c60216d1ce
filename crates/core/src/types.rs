//! 도메인 타입: 수집 기간, 저장 주소, 소스 종류

use std::fmt;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RangeError;

/// 입력 날짜 형식
const DATE_FORMAT: &str = "%Y-%m-%d";

/// 수집 기간: 반열린 구간 `[start, end_exclusive)`
///
/// `end_exclusive`는 입력 종료일 + 1일이므로 두 입력 날짜 모두 구간에 포함됩니다.
/// 수집 실행마다 한 번 생성되며 모든 어댑터가 읽기 전용으로 공유합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end_exclusive: NaiveDate,
}

impl DateRange {
    /// 두 `YYYY-MM-DD` 문자열을 수집 기간으로 변환합니다.
    ///
    /// 시작일이 종료일보다 늦어도 에러가 아닙니다. 이 경우 빈 구간이 됩니다.
    pub fn parse(start: &str, end: &str) -> Result<Self, RangeError> {
        let start = parse_date(start)?;
        let end_inclusive = parse_date(end)?;
        let end_exclusive = end_inclusive.checked_add_days(Days::new(1)).ok_or_else(|| {
            RangeError::InvalidDateFormat {
                input: end.to_owned(),
            }
        })?;
        Ok(Self {
            start,
            end_exclusive,
        })
    }

    /// 포함 시작일
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// 제외 종료일 (입력 종료일 + 1일)
    pub fn end_exclusive(&self) -> NaiveDate {
        self.end_exclusive
    }

    /// 호출자가 입력한 종료일
    pub fn end_inclusive(&self) -> NaiveDate {
        self.end_exclusive.pred_opt().unwrap_or(self.end_exclusive)
    }

    /// 날짜가 구간 안에 있는지 확인합니다.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end_exclusive
    }

    /// 시작일이 종료일보다 늦어 아무 날짜도 포함하지 않는 구간인지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.end_exclusive <= self.start
    }

    /// 구간 시작 시각 (UTC 자정)
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// 구간 종료 시각 (제외, UTC 자정)
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_exclusive.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// 저장 주소에 쓰이는 레이블 (`{start}_to_{end}`)
    pub fn label(&self) -> String {
        format!("{}_to_{}", self.start, self.end_inclusive())
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end_exclusive)
    }
}

fn parse_date(input: &str) -> Result<NaiveDate, RangeError> {
    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| {
        RangeError::InvalidDateFormat {
            input: input.to_owned(),
        }
    })
}

/// 수집 소스 종류
///
/// `as_str()` 값은 저장소의 데이터베이스 이름으로 그대로 쓰입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// 오브젝트 스토리지 서버 액세스 로그
    #[serde(rename = "s3accesslog")]
    AccessLog,
    /// 네트워크 인터페이스 플로우 로그
    #[serde(rename = "vpcflow")]
    FlowLog,
    /// 감사 이벤트 API
    #[serde(rename = "cloudtrail")]
    AuditEvent,
}

impl SourceKind {
    /// 실행 순서대로 나열한 전체 소스
    pub const ALL: [SourceKind; 3] = [Self::AccessLog, Self::FlowLog, Self::AuditEvent];

    /// 저장소 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessLog => "s3accesslog",
            Self::FlowLog => "vpcflow",
            Self::AuditEvent => "cloudtrail",
        }
    }

    /// 진행 메시지에 쓰이는 표시 이름
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AccessLog => "S3 Access Log",
            Self::FlowLog => "VPC Flow Log",
            Self::AuditEvent => "CloudTrail",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 저장 주소: `(source_name, range_label)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    /// 소스 이름 (데이터베이스)
    pub source_name: String,
    /// 기간 레이블 (컬렉션)
    pub range_label: String,
}

impl CollectionKey {
    /// 소스와 수집 기간으로 주소를 만듭니다.
    pub fn new(source: SourceKind, range: &DateRange) -> Self {
        Self {
            source_name: source.as_str().to_owned(),
            range_label: range.label(),
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source_name, self.range_label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn parse_makes_end_exclusive() {
        let range = DateRange::parse("2025-05-01", "2025-05-03").unwrap();
        assert_eq!(range.start(), date("2025-05-01"));
        assert_eq!(range.end_exclusive(), date("2025-05-04"));
        assert_eq!(range.end_inclusive(), date("2025-05-03"));
    }

    #[test]
    fn contains_is_half_open() {
        let range = DateRange::parse("2025-05-01", "2025-05-03").unwrap();
        assert!(range.contains(date("2025-05-01")));
        assert!(range.contains(date("2025-05-03")));
        assert!(!range.contains(date("2025-05-04")));
        assert!(!range.contains(date("2025-04-30")));
    }

    #[test]
    fn single_day_range() {
        let range = DateRange::parse("2025-05-23", "2025-05-23").unwrap();
        assert!(range.contains(date("2025-05-23")));
        assert!(!range.is_empty());
        assert_eq!(range.label(), "2025-05-23_to_2025-05-23");
    }

    #[test]
    fn month_and_year_rollover() {
        let range = DateRange::parse("2024-12-30", "2024-12-31").unwrap();
        assert_eq!(range.end_exclusive(), date("2025-01-01"));

        let leap = DateRange::parse("2024-02-28", "2024-02-29").unwrap();
        assert_eq!(leap.end_exclusive(), date("2024-03-01"));
    }

    #[test]
    fn inverted_range_is_empty_not_error() {
        let range = DateRange::parse("2025-05-10", "2025-05-01").unwrap();
        assert!(range.is_empty());
        assert!(!range.contains(date("2025-05-05")));
        assert!(range.end_exclusive() < range.start());
    }

    #[test]
    fn invalid_formats_rejected() {
        for bad in ["2025/05/01", "05-01-2025", "2025-13-01", "2025-02-30", "", "yesterday"] {
            let err = DateRange::parse(bad, "2025-05-01").unwrap_err();
            assert!(matches!(err, RangeError::InvalidDateFormat { .. }), "{bad}");
        }
        assert!(DateRange::parse("2025-05-01", "not-a-date").is_err());
    }

    #[test]
    fn time_bounds_are_utc_midnight() {
        let range = DateRange::parse("2025-05-01", "2025-05-03").unwrap();
        assert_eq!(range.start_time().to_rfc3339(), "2025-05-01T00:00:00+00:00");
        assert_eq!(range.end_time().to_rfc3339(), "2025-05-04T00:00:00+00:00");
    }

    #[test]
    fn collection_key_uses_inclusive_end() {
        let range = DateRange::parse("2025-05-20", "2025-05-22").unwrap();
        let key = CollectionKey::new(SourceKind::FlowLog, &range);
        assert_eq!(key.source_name, "vpcflow");
        assert_eq!(key.range_label, "2025-05-20_to_2025-05-22");
        assert_eq!(key.to_string(), "vpcflow.2025-05-20_to_2025-05-22");
    }

    #[test]
    fn source_order_matches_collection_order() {
        let names: Vec<_> = SourceKind::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["s3accesslog", "vpcflow", "cloudtrail"]);
    }

    #[test]
    fn source_kind_serde_names() {
        let json = serde_json::to_string(&SourceKind::AuditEvent).unwrap();
        assert_eq!(json, "\"cloudtrail\"");
        let parsed: SourceKind = serde_json::from_str("\"vpcflow\"").unwrap();
        assert_eq!(parsed, SourceKind::FlowLog);
    }
}

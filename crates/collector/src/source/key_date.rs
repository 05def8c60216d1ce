//! 오브젝트 키 → 로그 날짜 추출
//!
//! 설정의 [`KeyDateLayout`]을 한 번 컴파일해 두고 목록 조회 중 키마다 호출합니다.
//! 날짜를 찾지 못한 키는 다운로드 대상에서 빠집니다.

use chrono::NaiveDate;
use regex::Regex;
use trailscope_core::config::KeyDateLayout;

use crate::error::CollectorError;

/// 키 어디서든 `YYYY-MM-DD`를 찾는 패턴
const EMBEDDED_DATE_PATTERN: &str = r"(\d{4}-\d{2}-\d{2})";

/// 컴파일된 키 날짜 추출기
#[derive(Debug, Clone)]
pub enum KeyDateExtractor {
    /// 처음 나오는 `YYYY-MM-DD`
    Embedded(Regex),
    /// 끝에서 `year_from_end`번째 경로 세그먼트부터 연/월/일
    Segments { year_from_end: usize },
    /// `year`, `month`, `day` 이름 그룹
    Pattern(Regex),
}

impl KeyDateExtractor {
    /// 설정된 방식을 컴파일합니다.
    pub fn new(layout: &KeyDateLayout) -> Result<Self, CollectorError> {
        match layout {
            KeyDateLayout::Embedded => Ok(Self::Embedded(Regex::new(EMBEDDED_DATE_PATTERN)?)),
            KeyDateLayout::Segments { year_from_end } => {
                if *year_from_end < 3 {
                    return Err(CollectorError::Config {
                        field: "key_date.year_from_end".to_owned(),
                        reason: "must be at least 3".to_owned(),
                    });
                }
                Ok(Self::Segments {
                    year_from_end: *year_from_end,
                })
            }
            KeyDateLayout::Regex { pattern } => {
                let regex = Regex::new(pattern)?;
                let names: Vec<&str> = regex.capture_names().flatten().collect();
                for group in ["year", "month", "day"] {
                    if !names.contains(&group) {
                        return Err(CollectorError::Config {
                            field: "key_date.pattern".to_owned(),
                            reason: format!("missing named group '{group}'"),
                        });
                    }
                }
                Ok(Self::Pattern(regex))
            }
        }
    }

    /// 키에서 날짜를 추출합니다. 찾지 못하거나 달력에 없는 날짜면 `None`.
    pub fn extract(&self, key: &str) -> Option<NaiveDate> {
        match self {
            Self::Embedded(regex) => {
                let found = regex.find(key)?;
                NaiveDate::parse_from_str(found.as_str(), "%Y-%m-%d").ok()
            }
            Self::Segments { year_from_end } => {
                let parts: Vec<&str> = key.split('/').collect();
                if parts.len() < (*year_from_end).max(4) {
                    return None;
                }
                let base = parts.len() - year_from_end;
                ymd(parts[base], parts[base + 1], parts[base + 2])
            }
            Self::Pattern(regex) => {
                let caps = regex.captures(key)?;
                ymd(
                    caps.name("year")?.as_str(),
                    caps.name("month")?.as_str(),
                    caps.name("day")?.as_str(),
                )
            }
        }
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn embedded_finds_first_date_anywhere() {
        let ex = KeyDateExtractor::new(&KeyDateLayout::Embedded).unwrap();
        assert_eq!(
            ex.extract("logs/s3/2025-05-01-12-30-00-ABCDEF0123456789"),
            date(2025, 5, 1)
        );
        assert_eq!(ex.extract("a/2025-05-02/b/2025-06-01.gz"), date(2025, 5, 2));
        assert_eq!(ex.extract("logs/no-date-here.gz"), None);
    }

    #[test]
    fn embedded_invalid_calendar_date_skipped() {
        let ex = KeyDateExtractor::new(&KeyDateLayout::Embedded).unwrap();
        assert_eq!(ex.extract("logs/2025-13-45-x"), None);
    }

    #[test]
    fn segments_default_depth() {
        let ex = KeyDateExtractor::new(&KeyDateLayout::Segments { year_from_end: 5 }).unwrap();
        assert_eq!(
            ex.extract("AWSLogs/123456789012/vpcflowlogs/ap-northeast-2/2025/05/20/13/flow.log.gz"),
            date(2025, 5, 20)
        );
    }

    #[test]
    fn segments_standard_layout_with_depth_four() {
        let ex = KeyDateExtractor::new(&KeyDateLayout::Segments { year_from_end: 4 }).unwrap();
        assert_eq!(
            ex.extract("AWSLogs/123456789012/vpcflowlogs/ap-northeast-2/2025/05/20/flow.log.gz"),
            date(2025, 5, 20)
        );
    }

    #[test]
    fn segments_too_few_or_non_numeric_skipped() {
        let ex = KeyDateExtractor::new(&KeyDateLayout::Segments { year_from_end: 5 }).unwrap();
        assert_eq!(ex.extract("a/b/c"), None);
        assert_eq!(ex.extract("2025/05/20/x"), None);
        assert_eq!(ex.extract("p/yyyy/05/20/13/f.gz"), None);
    }

    #[test]
    fn segments_depth_below_three_rejected() {
        assert!(KeyDateExtractor::new(&KeyDateLayout::Segments { year_from_end: 2 }).is_err());
    }

    #[test]
    fn regex_named_groups() {
        let ex = KeyDateExtractor::new(&KeyDateLayout::Regex {
            pattern: r"dt=(?P<year>\d{4})(?P<month>\d{2})(?P<day>\d{2})".to_owned(),
        })
        .unwrap();
        assert_eq!(ex.extract("flow/dt=20250521/part-0.gz"), date(2025, 5, 21));
        assert_eq!(ex.extract("flow/part-0.gz"), None);
    }

    #[test]
    fn regex_without_named_groups_rejected() {
        let err = KeyDateExtractor::new(&KeyDateLayout::Regex {
            pattern: r"(\d{4})/(\d{2})/(\d{2})".to_owned(),
        })
        .unwrap_err();
        assert!(matches!(err, CollectorError::Config { .. }));
    }

    #[test]
    fn invalid_regex_rejected() {
        let err = KeyDateExtractor::new(&KeyDateLayout::Regex {
            pattern: "(?P<year>".to_owned(),
        })
        .unwrap_err();
        assert!(matches!(err, CollectorError::Regex(_)));
    }
}

//! 서버 액세스 로그 파서
//!
//! 공백으로 구분되고 따옴표로 묶인 필드를 가진 한 줄을 POSIX 셸 방식으로 토큰화합니다.
//! `#`은 주석이 아니라 일반 문자입니다 (`#`으로 시작하는 키도 그대로 남음).
//!
//! ```text
//! owner bucket [06/Feb/2019:00:00:38 +0000] 192.0.2.3 requester reqid REST.GET.OBJECT key "GET /key HTTP/1.1" 200 - 113 113 7 6 "-" "curl/7.15.1" -
//! ```
//!
//! 대괄호 시각은 공백 때문에 두 토큰 (`[06/Feb/2019:00:00:38`, `+0000]`)으로 나뉩니다.
//! 이 때문에 시각 이후 필드는 한 칸씩 밀리며, 원격 IP 보정 규칙이 이를 흡수합니다.
//!
//! # 사용 예시
//! ```ignore
//! use trailscope_collector::parser::{AccessLogParser, LineParser};
//!
//! let entry = AccessLogParser::new().parse_line(line).unwrap();
//! assert_eq!(entry.bucket, "awsexamplebucket1");
//! ```

use std::sync::LazyLock;

use chrono::DateTime;
use regex::Regex;

use super::LineParser;
use crate::record::{AccessLogEntry, NumericField};

/// 한 줄이 레코드가 되기 위한 최소 토큰 수
pub const MIN_ACCESS_LOG_TOKENS: usize = 18;

/// 대괄호를 벗긴 시각 + 오프셋 형식
const ACCESS_LOG_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// 빈 값 표시
const PLACEHOLDER: &str = "-";

/// 요청자 토큰이 `숫자.숫자.숫자.숫자`로 시작하는지 (뒤에 다른 문자가 있어도 됨)
static DOTTED_QUAD_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+\.\d+").ok());

/// 서버 액세스 로그 파서
#[derive(Debug, Clone, Default)]
pub struct AccessLogParser;

impl AccessLogParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

impl LineParser for AccessLogParser {
    type Record = AccessLogEntry;

    fn format_name(&self) -> &'static str {
        "s3accesslog"
    }

    fn parse_line(&self, line: &str) -> Option<AccessLogEntry> {
        let parts = split_words(line)?;
        if parts.len() < MIN_ACCESS_LOG_TOKENS {
            return None;
        }

        let time = normalize_time(&parts[2], &parts[3]);

        let requester = parts[4].clone();
        let remote_ip = if parts[3].starts_with('+') || parts[3] == PLACEHOLDER {
            starts_with_dotted_quad(&requester).then(|| requester.clone())
        } else {
            Some(parts[3].clone())
        };

        let mut user_agent = non_placeholder(&parts[16]);
        let mut version_id = non_placeholder(&parts[17]);
        if version_id.as_deref().is_some_and(|v| v.starts_with("Mozilla")) {
            user_agent = version_id.take();
        }

        Some(AccessLogEntry {
            bucket_owner: parts[0].clone(),
            bucket: parts[1].clone(),
            time,
            remote_ip,
            requester,
            request_id: parts[5].clone(),
            operation: parts[6].clone(),
            key: non_placeholder(&parts[7]),
            request_uri: parts[8].clone(),
            http_status: parts[9].clone(),
            status_code: non_placeholder(&parts[10]),
            bytes_sent: NumericField::parse(&parts[11]),
            object_size: NumericField::parse(&parts[12]),
            total_time: NumericField::parse(&parts[13]),
            turnaround_time: NumericField::parse(&parts[14]),
            referrer: non_placeholder(&parts[15]),
            user_agent,
            version_id,
            country: None,
        })
    }
}

/// 대괄호 시각 토큰과 뒤따르는 오프셋 토큰을 RFC 3339로 바꿉니다.
///
/// 결합 조건이 맞지 않거나 파싱에 실패하면 원래 시각 토큰을 그대로 돌려줍니다.
fn normalize_time(time_token: &str, next_token: &str) -> String {
    if !(time_token.starts_with('[') && next_token.starts_with('+')) {
        return time_token.to_owned();
    }
    let combined = format!("{time_token} {next_token}");
    let inner = combined.trim_matches(|c| c == '[' || c == ']');
    DateTime::parse_from_str(inner, ACCESS_LOG_TIME_FORMAT)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|_| time_token.to_owned())
}

fn non_placeholder(token: &str) -> Option<String> {
    (token != PLACEHOLDER).then(|| token.to_owned())
}

fn starts_with_dotted_quad(s: &str) -> bool {
    DOTTED_QUAD_PREFIX
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

/// POSIX 셸 규칙으로 한 줄을 단어로 나눕니다. 주석은 처리하지 않습니다.
///
/// - 작은따옴표 안은 문자 그대로
/// - 큰따옴표 안에서 `\`는 `"`와 `\`만 이스케이프
/// - 따옴표 밖의 `\`는 다음 문자를 그대로 취함
/// - 따옴표는 단어 중간에 올 수 있고 `""`는 빈 단어
///
/// 닫히지 않은 따옴표나 줄 끝의 `\`는 `None`입니다.
fn split_words(line: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\\' => {
                current.push(chars.next()?);
                in_word = true;
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '\'' => break,
                        ch => current.push(ch),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => {
                            let escaped = chars.next()?;
                            if escaped != '"' && escaped != '\\' {
                                current.push('\\');
                            }
                            current.push(escaped);
                        }
                        ch => current.push(ch),
                    }
                }
            }
            ch => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Some(words)
}

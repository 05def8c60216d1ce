//! 네트워크 플로우 로그 파서 (기본 14개 필드 형식)
//!
//! ```text
//! version account-id interface-id srcaddr dstaddr srcport dstport protocol packets bytes start end action log-status
//! 2 123456789010 eni-1235b8ca123456789 172.31.16.139 172.31.16.21 20641 22 6 20 4249 1418530010 1418530070 ACCEPT OK
//! ```
//!
//! 포트, 패킷 수, 바이트 수, 시작/끝 시각은 정수여야 합니다. 하나라도 실패하면 줄 전체가 드롭됩니다
//! (`NODATA`/`SKIPDATA` 줄의 `-` 포함).

use super::LineParser;
use crate::record::FlowLogEntry;

/// 한 줄이 레코드가 되기 위한 최소 토큰 수
pub const MIN_FLOW_LOG_TOKENS: usize = 14;

/// 플로우 로그 파서
#[derive(Debug, Clone, Default)]
pub struct FlowLogParser;

impl FlowLogParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

impl LineParser for FlowLogParser {
    type Record = FlowLogEntry;

    fn format_name(&self) -> &'static str {
        "vpcflow"
    }

    fn is_header(&self, line: &str) -> bool {
        line.split_whitespace()
            .next()
            .is_some_and(|first| first.eq_ignore_ascii_case("version"))
    }

    fn parse_line(&self, line: &str) -> Option<FlowLogEntry> {
        if self.is_header(line) {
            return None;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < MIN_FLOW_LOG_TOKENS {
            return None;
        }

        Some(FlowLogEntry {
            version: fields[0].to_owned(),
            account_id: fields[1].to_owned(),
            interface_id: fields[2].to_owned(),
            srcaddr: fields[3].to_owned(),
            dstaddr: fields[4].to_owned(),
            srcport: fields[5].parse().ok()?,
            dstport: fields[6].parse().ok()?,
            protocol: fields[7].to_owned(),
            packets: fields[8].parse().ok()?,
            bytes: fields[9].parse().ok()?,
            start: fields[10].parse().ok()?,
            end: fields[11].parse().ok()?,
            action: fields[12].to_owned(),
            log_status: fields[13].to_owned(),
            country: None,
        })
    }
}

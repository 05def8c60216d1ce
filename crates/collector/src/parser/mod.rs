//! 라인 파서: 위치 기반 로그 형식 디코더
//!
//! 두 파서는 서로 독립적이며 한 줄을 받아 레코드 하나를 돌려주거나, 형식이 맞지 않으면
//! `None`을 돌려줍니다. 파싱 실패는 에러가 아니라 드롭 대상입니다.
//!
//! # 지원 형식
//! - 오브젝트 스토리지 서버 액세스 로그 ([`AccessLogParser`])
//! - 네트워크 플로우 로그 ([`FlowLogParser`])
//!
//! 국가 코드는 파서가 채우지 않습니다. 소스 어댑터가 [`GeoEnricher`](crate::geo::GeoEnricher)로 붙입니다.

pub mod access_log;
pub mod flow_log;

pub use access_log::AccessLogParser;
pub use flow_log::FlowLogParser;

/// 한 줄 단위 로그 파서
pub trait LineParser: Send + Sync {
    /// 파싱 결과 레코드
    type Record;

    /// 형식 이름 (로그/메트릭 레이블용)
    fn format_name(&self) -> &'static str;

    /// 한 줄을 파싱합니다. 레코드가 아니거나 형식이 맞지 않으면 `None`.
    fn parse_line(&self, line: &str) -> Option<Self::Record>;

    /// 드롭으로 세지 않고 건너뛸 헤더 줄인지 확인합니다.
    fn is_header(&self, _line: &str) -> bool {
        false
    }
}

/// 본문을 줄 단위로 파싱합니다. 빈 줄과 헤더는 건너뛰고 드롭된 줄 수를 함께 반환합니다.
pub fn parse_body<P: LineParser>(parser: &P, body: &str) -> (Vec<P::Record>, u64) {
    let mut records = Vec::new();
    let mut dropped = 0u64;
    for line in body.lines() {
        if line.trim().is_empty() || parser.is_header(line) {
            continue;
        }
        match parser.parse_line(line) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }
    (records, dropped)
}

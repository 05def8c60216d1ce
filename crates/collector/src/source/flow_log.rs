//! 플로우 로그 어댑터
//!
//! 액세스 로그 어댑터와 같은 목록/다운로드 흐름을 쓰지만, 기본 날짜 추출은 경로
//! 세그먼트 위치 기반입니다. 국가 코드는 `srcaddr`로 조회합니다.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use trailscope_core::types::{DateRange, SourceKind};

use super::{DropStats, KeyDateExtractor, LogSource, ObjectStore, SourceOutput, scan_objects};
use crate::config::ObjectSourceConfig;
use crate::error::CollectorError;
use crate::geo::GeoEnricher;
use crate::parser::{FlowLogParser, parse_body};
use crate::record::FlowLogEntry;

/// 플로우 로그 어댑터
pub struct FlowLogSource<S> {
    store: Arc<S>,
    location: ObjectSourceConfig,
    extractor: KeyDateExtractor,
    parser: FlowLogParser,
}

impl<S: ObjectStore> FlowLogSource<S> {
    /// 어댑터를 만듭니다.
    pub fn new(store: Arc<S>, location: ObjectSourceConfig) -> Result<Self, CollectorError> {
        let extractor = KeyDateExtractor::new(&location.key_date)?;
        Ok(Self {
            store,
            location,
            extractor,
            parser: FlowLogParser::new(),
        })
    }
}

impl<S: ObjectStore> LogSource for FlowLogSource<S> {
    type Record = FlowLogEntry;

    fn kind(&self) -> SourceKind {
        SourceKind::FlowLog
    }

    async fn collect(
        &self,
        range: &DateRange,
        geo: &GeoEnricher,
        cancel: &CancellationToken,
        progress: &mut Vec<String>,
    ) -> Result<SourceOutput<FlowLogEntry>, CollectorError> {
        progress.push(format!("[+] collection window: {range}"));
        if range.is_empty() {
            tracing::warn!(%range, "start date is after end date, no object will match");
        }

        let mut records = Vec::new();
        let mut stats = DropStats::default();

        scan_objects(
            self.store.as_ref(),
            &self.location.bucket,
            &self.location.prefix,
            &self.extractor,
            range,
            cancel,
            progress,
            &mut stats,
            |key, text, stats| {
                let (entries, dropped) = parse_body(&self.parser, text);
                stats.lines_dropped += dropped;
                tracing::debug!(key, parsed = entries.len(), dropped, "flow log object parsed");
                for mut entry in entries {
                    entry.country = geo.lookup_country(&entry.srcaddr)?;
                    records.push(entry);
                }
                Ok(())
            },
        )
        .await?;

        progress.push(format!(
            "[+] parsed flow log records: {} (dropped lines: {}, unreadable files: {})",
            records.len(),
            stats.lines_dropped,
            stats.objects_unreadable
        ));
        Ok(SourceOutput { records, stats })
    }
}

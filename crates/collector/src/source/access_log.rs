//! 액세스 로그 어댑터
//!
//! 버킷 접두사 아래 객체를 순회하며 키에 들어 있는 날짜로 기간을 거르고,
//! 기간 안의 파일을 줄 단위로 파싱한 뒤 국가 코드를 붙입니다.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use trailscope_core::config::EnrichmentKey;
use trailscope_core::types::{DateRange, SourceKind};

use super::{DropStats, KeyDateExtractor, LogSource, ObjectStore, SourceOutput, scan_objects};
use crate::config::ObjectSourceConfig;
use crate::error::CollectorError;
use crate::geo::GeoEnricher;
use crate::parser::{AccessLogParser, parse_body};
use crate::record::AccessLogEntry;

/// 액세스 로그 어댑터
pub struct AccessLogSource<S> {
    store: Arc<S>,
    location: ObjectSourceConfig,
    enrich_from: EnrichmentKey,
    extractor: KeyDateExtractor,
    parser: AccessLogParser,
}

impl<S: ObjectStore> AccessLogSource<S> {
    /// 어댑터를 만듭니다. 날짜 추출 방식은 여기서 컴파일됩니다.
    pub fn new(
        store: Arc<S>,
        location: ObjectSourceConfig,
        enrich_from: EnrichmentKey,
    ) -> Result<Self, CollectorError> {
        let extractor = KeyDateExtractor::new(&location.key_date)?;
        Ok(Self {
            store,
            location,
            enrich_from,
            extractor,
            parser: AccessLogParser::new(),
        })
    }

    fn enrichment_key<'a>(&self, entry: &'a AccessLogEntry) -> Option<&'a str> {
        match self.enrich_from {
            EnrichmentKey::Requester => Some(entry.requester.as_str()),
            EnrichmentKey::RemoteIp => entry.remote_ip.as_deref(),
        }
    }
}

impl<S: ObjectStore> LogSource for AccessLogSource<S> {
    type Record = AccessLogEntry;

    fn kind(&self) -> SourceKind {
        SourceKind::AccessLog
    }

    async fn collect(
        &self,
        range: &DateRange,
        geo: &GeoEnricher,
        cancel: &CancellationToken,
        progress: &mut Vec<String>,
    ) -> Result<SourceOutput<AccessLogEntry>, CollectorError> {
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
                tracing::debug!(key, parsed = entries.len(), dropped, "access log object parsed");
                for mut entry in entries {
                    let country = geo.lookup_optional(self.enrichment_key(&entry))?;
                    entry.country = country;
                    records.push(entry);
                }
                Ok(())
            },
        )
        .await?;

        progress.push(format!(
            "[+] parsed access log records: {} (dropped lines: {}, unreadable files: {})",
            records.len(),
            stats.lines_dropped,
            stats.objects_unreadable
        ));
        Ok(SourceOutput { records, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::mock::CountingDatabase;
    use crate::source::mock::MemoryObjectStore;
    use trailscope_core::config::KeyDateLayout;

    const LINE_A: &str = r#"owner my-bucket 2025-05-01T10:00:00Z 203.0.113.7 8.8.8.8 REQ1 REST.GET.OBJECT a.jpg "GET /a.jpg HTTP/1.1" 200 - 10 20 3 1 "-" "curl/8.0" -"#;
    const LINE_B: &str = r#"owner my-bucket 2025-05-01T11:00:00Z - arn:aws:iam::1:user/bob REQ2 REST.PUT.OBJECT b.jpg "PUT /b.jpg HTTP/1.1" 200 - 0 20 3 1 "-" "aws-cli/2" -"#;

    fn location() -> ObjectSourceConfig {
        ObjectSourceConfig {
            bucket: "logs-bucket".to_owned(),
            prefix: "s3/".to_owned(),
            key_date: KeyDateLayout::Embedded,
        }
    }

    fn geo() -> (Arc<CountingDatabase>, GeoEnricher) {
        let db = Arc::new(
            CountingDatabase::new()
                .with_country("8.8.8.8", "US")
                .with_country("203.0.113.7", "AU"),
        );
        (db.clone(), GeoEnricher::with_database(db))
    }

    #[tokio::test]
    async fn enriches_from_requester_by_default() {
        let store = Arc::new(
            MemoryObjectStore::new()
                .with_object("s3/2025-05-01-00-00-00-AAAA", format!("{LINE_A}\n{LINE_B}\nshort line\n")),
        );
        let source = AccessLogSource::new(store, location(), EnrichmentKey::Requester).unwrap();
        let (_, geo) = geo();
        let range = DateRange::parse("2025-05-01", "2025-05-01").unwrap();
        let mut progress = Vec::new();

        let output = source
            .collect(&range, &geo, &CancellationToken::new(), &mut progress)
            .await
            .unwrap();

        assert_eq!(output.records.len(), 2);
        assert_eq!(output.records[0].country.as_deref(), Some("US"));
        assert_eq!(output.records[1].country, None);
        assert_eq!(output.stats.lines_dropped, 1);
        assert!(progress[0].starts_with("[+] collection window: 2025-05-01 ~ 2025-05-02"));
        assert!(progress.last().unwrap().contains("parsed access log records: 2"));
    }

    #[tokio::test]
    async fn enriches_from_remote_ip_when_configured() {
        let store = Arc::new(MemoryObjectStore::new().with_object("s3/2025-05-01-x", LINE_A));
        let source = AccessLogSource::new(store, location(), EnrichmentKey::RemoteIp).unwrap();
        let (_, geo) = geo();
        let range = DateRange::parse("2025-05-01", "2025-05-01").unwrap();

        let output = source
            .collect(&range, &geo, &CancellationToken::new(), &mut Vec::new())
            .await
            .unwrap();
        assert_eq!(output.records[0].country.as_deref(), Some("AU"));
    }

    #[tokio::test]
    async fn gzip_objects_are_decompressed() {
        let store = Arc::new(
            MemoryObjectStore::new().with_gzip_object("s3/2025-05-02-x.gz", &format!("{LINE_A}\n")),
        );
        let source = AccessLogSource::new(store, location(), EnrichmentKey::Requester).unwrap();
        let (_, geo) = geo();
        let range = DateRange::parse("2025-05-01", "2025-05-03").unwrap();

        let output = source
            .collect(&range, &geo, &CancellationToken::new(), &mut Vec::new())
            .await
            .unwrap();
        assert_eq!(output.records.len(), 1);
    }

    #[tokio::test]
    async fn inverted_range_fetches_nothing() {
        let store = Arc::new(MemoryObjectStore::new().with_object("s3/2025-05-05-x", LINE_A));
        let source = AccessLogSource::new(store.clone(), location(), EnrichmentKey::Requester).unwrap();
        let (_, geo) = geo();
        let range = DateRange::parse("2025-05-10", "2025-05-01").unwrap();

        let output = source
            .collect(&range, &geo, &CancellationToken::new(), &mut Vec::new())
            .await
            .unwrap();
        assert!(output.records.is_empty());
        assert!(store.fetched_keys().is_empty());
        assert_eq!(output.stats.objects_out_of_range, 1);
    }

    #[tokio::test]
    async fn missing_geo_database_aborts_with_config_error() {
        let store = Arc::new(MemoryObjectStore::new().with_object("s3/2025-05-01-x", LINE_A));
        let source = AccessLogSource::new(store, location(), EnrichmentKey::Requester).unwrap();
        let geo = GeoEnricher::new("");
        let range = DateRange::parse("2025-05-01", "2025-05-01").unwrap();

        let err = source
            .collect(&range, &geo, &CancellationToken::new(), &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}

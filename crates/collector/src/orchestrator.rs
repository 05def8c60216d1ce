//! 수집 오케스트레이션 -- 소스 순차 실행, 진행 메시지 스트리밍, 배치 저장
//!
//! [`Collector`]는 액세스 로그, 플로우 로그, 감사 이벤트 순서로 어댑터를 하나씩
//! 실행합니다. 어댑터가 끝나면 그 어댑터의 진행 메시지를 모두 내보낸 뒤 결과를
//! 저장소에 넘기고 다음 어댑터로 넘어갑니다.
//!
//! # 흐름
//! ```text
//! AccessLogSource -> sink -> FlowLogSource -> sink -> AuditEventSource -> sink -> summary
//!        \______________________ progress (mpsc) ______________________/
//! ```
//!
//! 업스트림/다운로드 실패는 해당 소스만 실패로 기록하고 계속 진행합니다.
//! 설정 에러와 취소는 실행 전체를 중단합니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use trailscope_core::metrics as m;
use trailscope_core::types::{CollectionKey, DateRange, SourceKind};

use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::geo::GeoEnricher;
use crate::sink::{RecordSink, SinkOutcome, persist_batch};
use crate::source::{
    AccessLogSource, AuditEventSource, AuditTrail, DropStats, FlowLogSource, LogSource,
    ObjectStore, ensure_not_cancelled,
};

/// 소스 하나의 실행 결과
#[derive(Debug, Clone)]
pub struct SourceReport {
    /// 소스 종류
    pub source: SourceKind,
    /// 수집된 레코드 수
    pub records: usize,
    /// 드롭 통계
    pub stats: DropStats,
    /// 저장 결과 (수집 실패 시 `None`)
    pub sink: Option<SinkOutcome>,
    /// 수집 실패 사유
    pub error: Option<String>,
    /// 소요 시간
    pub elapsed: Duration,
}

impl SourceReport {
    /// 수집 또는 저장이 실패했는지 확인합니다.
    pub fn is_failed(&self) -> bool {
        self.error.is_some() || self.sink.as_ref().is_some_and(SinkOutcome::is_failed)
    }
}

/// 한 번의 수집 실행 결과
#[derive(Debug, Clone)]
pub struct CollectionSummary {
    /// 실행 ID (로그 span과 같음)
    pub run_id: String,
    /// 기간 레이블 (컬렉션 이름)
    pub range_label: String,
    /// 실행 순서대로의 소스별 결과
    pub reports: Vec<SourceReport>,
}

impl CollectionSummary {
    /// 실패한 소스가 하나라도 있는지 확인합니다.
    pub fn has_failures(&self) -> bool {
        self.reports.iter().any(SourceReport::is_failed)
    }

    /// 전체 레코드 수
    pub fn total_records(&self) -> usize {
        self.reports.iter().map(|r| r.records).sum()
    }

    /// 종류로 소스 결과를 찾습니다.
    pub fn report(&self, source: SourceKind) -> Option<&SourceReport> {
        self.reports.iter().find(|r| r.source == source)
    }
}

/// 세 소스를 순서대로 실행하는 수집기
///
/// # 사용 예시
/// ```ignore
/// use trailscope_collector::{CollectorBuilder, CollectorConfig};
///
/// let collector = CollectorBuilder::new(CollectorConfig::from_core(&core))
///     .object_store(Arc::new(S3ObjectStore::new(&sdk)))
///     .audit_trail(Arc::new(CloudTrailClient::new(&sdk)))
///     .sink(AnySink::from_config(&core.sink).await?)
///     .build()?;
///
/// let summary = collector.run(&range, progress_tx, CancellationToken::new()).await?;
/// ```
pub struct Collector<S, A, K> {
    access_log: AccessLogSource<S>,
    flow_log: FlowLogSource<S>,
    audit: AuditEventSource<A>,
    geo: GeoEnricher,
    sink: K,
}

impl<S, A, K> Collector<S, A, K> {
    /// 저장소를 반환합니다.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// 실행 간 공유되는 국가 보강기를 반환합니다.
    pub fn geo(&self) -> &GeoEnricher {
        &self.geo
    }
}

impl<S, A, K> Collector<S, A, K>
where
    S: ObjectStore,
    A: AuditTrail,
    K: RecordSink,
{
    /// 수집을 실행합니다.
    ///
    /// 진행 메시지는 `progress`로 순서대로 전송됩니다. 수신측이 닫혀도 수집은 계속됩니다.
    ///
    /// # Errors
    /// 설정 에러, 국가 DB 에러, 취소 시 즉시 중단하고 에러를 반환합니다.
    pub async fn run(
        &self,
        range: &DateRange,
        progress: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<CollectionSummary, CollectorError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("collection", run_id = %run_id, range = %range);
        self.run_inner(run_id, range, &progress, &cancel)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: String,
        range: &DateRange,
        progress: &mpsc::Sender<String>,
        cancel: &CancellationToken,
    ) -> Result<CollectionSummary, CollectorError> {
        tracing::info!("collection run started");
        let mut reports = Vec::with_capacity(SourceKind::ALL.len());

        reports.push(self.run_source(1, &self.access_log, range, progress, cancel).await?);
        reports.push(self.run_source(2, &self.flow_log, range, progress, cancel).await?);
        reports.push(self.run_source(3, &self.audit, range, progress, cancel).await?);

        let summary = CollectionSummary {
            run_id,
            range_label: range.label(),
            reports,
        };

        if summary.has_failures() {
            emit(progress, "\n=== collection finished with errors ===".to_owned()).await;
            tracing::warn!(records = summary.total_records(), "collection run finished with failures");
        } else {
            emit(progress, "\n=== all logs collected and stored ===".to_owned()).await;
            tracing::info!(records = summary.total_records(), "collection run finished");
        }
        Ok(summary)
    }

    async fn run_source<L: LogSource>(
        &self,
        step: usize,
        source: &L,
        range: &DateRange,
        progress: &mpsc::Sender<String>,
        cancel: &CancellationToken,
    ) -> Result<SourceReport, CollectorError> {
        ensure_not_cancelled(cancel)?;
        let kind = source.kind();
        emit(
            progress,
            format!("\n>>> [Step {step}] {} collection started", kind.display_name()),
        )
        .await;

        let started = Instant::now();
        let mut messages = Vec::new();
        let result = source.collect(range, &self.geo, cancel, &mut messages).await;
        let elapsed = started.elapsed();

        for message in messages {
            emit(progress, message).await;
        }

        metrics::histogram!(m::COLLECTOR_SOURCE_DURATION_SECONDS, m::LABEL_SOURCE => kind.as_str())
            .record(elapsed.as_secs_f64());

        let output = match result {
            Ok(output) => output,
            Err(e) if e.is_fatal() => {
                metrics::counter!(
                    m::COLLECTOR_SOURCE_RUNS_TOTAL,
                    m::LABEL_SOURCE => kind.as_str(),
                    m::LABEL_RESULT => "failure"
                )
                .increment(1);
                tracing::error!(source = kind.as_str(), error = %e, "collection aborted");
                emit(progress, format!("[ERROR] {} collection aborted: {e}", kind.display_name())).await;
                return Err(e);
            }
            Err(e) => {
                metrics::counter!(
                    m::COLLECTOR_SOURCE_RUNS_TOTAL,
                    m::LABEL_SOURCE => kind.as_str(),
                    m::LABEL_RESULT => "failure"
                )
                .increment(1);
                tracing::error!(source = kind.as_str(), error = %e, "source collection failed, continuing");
                emit(progress, format!("[ERROR] {} collection failed: {e}", kind.display_name())).await;
                return Ok(SourceReport {
                    source: kind,
                    records: 0,
                    stats: DropStats::default(),
                    sink: None,
                    error: Some(e.to_string()),
                    elapsed,
                });
            }
        };

        output.stats.emit_metrics(kind);
        metrics::counter!(m::COLLECTOR_RECORDS_COLLECTED_TOTAL, m::LABEL_SOURCE => kind.as_str())
            .increment(output.records.len() as u64);
        metrics::counter!(
            m::COLLECTOR_SOURCE_RUNS_TOTAL,
            m::LABEL_SOURCE => kind.as_str(),
            m::LABEL_RESULT => "success"
        )
        .increment(1);
        tracing::info!(
            source = kind.as_str(),
            records = output.records.len(),
            lines_dropped = output.stats.lines_dropped,
            objects_unreadable = output.stats.objects_unreadable,
            events_excluded = output.stats.events_excluded,
            elapsed_ms = elapsed.as_millis() as u64,
            "source collected"
        );

        let key = CollectionKey::new(kind, range);
        let outcome = persist_batch(&self.sink, &key, &output.records).await;
        let line = match &outcome {
            SinkOutcome::Skipped => format!("[DB] {key}: no documents to insert"),
            SinkOutcome::Written(n) => format!("[DB] {key}: {n} documents inserted"),
            SinkOutcome::Failed(reason) => format!("[ERROR] {key}: insert failed: {reason}"),
        };
        emit(progress, line).await;

        Ok(SourceReport {
            source: kind,
            records: output.records.len(),
            stats: output.stats,
            sink: Some(outcome),
            error: None,
            elapsed,
        })
    }
}

async fn emit(progress: &mpsc::Sender<String>, message: String) {
    if progress.send(message).await.is_err() {
        tracing::trace!("progress receiver closed");
    }
}

/// [`Collector`] 빌더
pub struct CollectorBuilder<S, A, K> {
    config: CollectorConfig,
    object_store: Option<Arc<S>>,
    audit_trail: Option<Arc<A>>,
    sink: Option<K>,
    geo: Option<GeoEnricher>,
}

impl<S, A, K> CollectorBuilder<S, A, K>
where
    S: ObjectStore,
    A: AuditTrail,
    K: RecordSink,
{
    /// 새 빌더를 생성합니다.
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            object_store: None,
            audit_trail: None,
            sink: None,
            geo: None,
        }
    }

    /// 두 오브젝트 스토리지 소스가 공유할 스토어를 설정합니다.
    pub fn object_store(mut self, store: Arc<S>) -> Self {
        self.object_store = Some(store);
        self
    }

    /// 감사 이벤트 API를 설정합니다.
    pub fn audit_trail(mut self, trail: Arc<A>) -> Self {
        self.audit_trail = Some(trail);
        self
    }

    /// 저장소를 설정합니다.
    pub fn sink(mut self, sink: K) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 국가 보강기를 직접 지정합니다.
    ///
    /// 지정하지 않으면 설정의 DB 경로로 만든 보강기를 씁니다.
    pub fn geo(mut self, geo: GeoEnricher) -> Self {
        self.geo = Some(geo);
        self
    }

    /// 수집기를 빌드합니다.
    ///
    /// # Errors
    /// 설정 검증 실패 또는 필수 구성 요소 누락 시 [`CollectorError::Config`]
    pub fn build(self) -> Result<Collector<S, A, K>, CollectorError> {
        self.config.validate()?;

        let store = self.object_store.ok_or_else(|| missing("object_store"))?;
        let trail = self.audit_trail.ok_or_else(|| missing("audit_trail"))?;
        let sink = self.sink.ok_or_else(|| missing("sink"))?;
        let geo = self
            .geo
            .unwrap_or_else(|| GeoEnricher::new(self.config.geoip_db_path.clone()));

        Ok(Collector {
            access_log: AccessLogSource::new(
                Arc::clone(&store),
                self.config.access_log,
                self.config.enrich_from,
            )?,
            flow_log: FlowLogSource::new(store, self.config.flow_log)?,
            audit: AuditEventSource::new(
                trail,
                self.config.audit_page_size,
                self.config.excluded_user,
            ),
            geo,
            sink,
        })
    }
}

fn missing(component: &str) -> CollectorError {
    CollectorError::Config {
        field: component.to_owned(),
        reason: "not set on builder".to_owned(),
    }
}

//! 소스 어댑터: 업스트림 조회, 날짜 필터, 다운로드, 파싱, 국가 정보 보강
//!
//! 각 어댑터는 [`LogSource`]를 구현하며 수집 기간과 [`GeoEnricher`]를 빌려서
//! 정규화 레코드 목록과 드롭 통계를 돌려줍니다. 진행 메시지는 호출자가 넘긴
//! 버퍼에 순서대로 쌓입니다.
//!
//! # 어댑터
//! - [`AccessLogSource`]: 오브젝트 스토리지 액세스 로그
//! - [`FlowLogSource`]: 오브젝트 스토리지 플로우 로그
//! - [`AuditEventSource`]: 감사 이벤트 페이지 API
//!
//! 업스트림 API는 [`ObjectStore`], [`AuditTrail`] trait 뒤에 있습니다.

pub mod access_log;
pub mod audit;
pub mod flow_log;
pub mod key_date;

pub use access_log::AccessLogSource;
pub use audit::AuditEventSource;
pub use flow_log::FlowLogSource;
pub use key_date::KeyDateExtractor;

use std::future::Future;
use std::io::Read;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use trailscope_core::metrics as m;
use trailscope_core::types::{DateRange, SourceKind};

use crate::error::CollectorError;
use crate::geo::GeoEnricher;
use crate::record::AuditEvent;

/// 목록 조회 결과의 객체 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// 객체 키
    pub key: String,
    /// 크기 (바이트)
    pub size: Option<i64>,
}

/// 목록 조회 한 페이지
#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    /// 이 페이지의 객체
    pub objects: Vec<ObjectSummary>,
    /// 다음 페이지 토큰 (없으면 마지막 페이지)
    pub continuation: Option<String>,
}

/// 오브젝트 스토리지 추상화
///
/// 실제 구현은 [`S3ObjectStore`](crate::aws::S3ObjectStore)입니다.
pub trait ObjectStore: Send + Sync {
    /// 접두사 아래 객체 목록의 한 페이지를 조회합니다.
    ///
    /// # Errors
    /// 호출 실패 시 [`CollectorError::Upstream`]
    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> impl Future<Output = Result<ObjectListing, CollectorError>> + Send;

    /// 객체 본문을 내려받습니다.
    ///
    /// # Errors
    /// 다운로드 실패 시 [`CollectorError::Download`]
    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<Bytes, CollectorError>> + Send;
}

/// 감사 이벤트 조회 한 페이지
#[derive(Debug, Clone, Default)]
pub struct AuditPage {
    /// 이벤트 (`country`는 비어 있음)
    pub events: Vec<AuditEvent>,
    /// 다음 페이지 커서
    pub next_token: Option<String>,
}

/// 감사 이벤트 API 추상화
///
/// 실제 구현은 [`CloudTrailClient`](crate::aws::CloudTrailClient)입니다.
pub trait AuditTrail: Send + Sync {
    /// `[start, end)` 구간 이벤트의 한 페이지를 조회합니다.
    ///
    /// # Errors
    /// 호출 실패 시 [`CollectorError::Upstream`]
    fn lookup_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page_size: i32,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<AuditPage, CollectorError>> + Send;
}

/// 소스별 드롭/건너뜀 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropStats {
    /// 목록에서 본 객체 수
    pub objects_listed: u64,
    /// 내려받은 객체 수
    pub objects_fetched: u64,
    /// 키에서 날짜를 찾지 못해 건너뛴 객체 수
    pub objects_without_date: u64,
    /// 기간 밖이라 건너뛴 객체 수
    pub objects_out_of_range: u64,
    /// 압축 해제나 UTF-8 디코딩에 실패한 객체 수
    pub objects_unreadable: u64,
    /// 형식이 맞지 않아 드롭된 줄 수
    pub lines_dropped: u64,
    /// 제외 계정이라 드롭된 이벤트 수
    pub events_excluded: u64,
    /// 내장 JSON을 읽지 못한 이벤트 수 (이벤트는 유지)
    pub payloads_unparsable: u64,
}

impl DropStats {
    /// 메트릭 카운터에 반영합니다.
    pub fn emit_metrics(&self, source: SourceKind) {
        let name = source.as_str();
        metrics::counter!(m::COLLECTOR_OBJECTS_FETCHED_TOTAL, m::LABEL_SOURCE => name)
            .increment(self.objects_fetched);
        metrics::counter!(m::COLLECTOR_OBJECTS_SKIPPED_TOTAL, m::LABEL_SOURCE => name)
            .increment(self.objects_without_date + self.objects_out_of_range);
        for (reason, count) in [
            ("unreadable_object", self.objects_unreadable),
            ("parse_error", self.lines_dropped),
            ("excluded", self.events_excluded),
        ] {
            if count > 0 {
                metrics::counter!(
                    m::COLLECTOR_RECORDS_DROPPED_TOTAL,
                    m::LABEL_SOURCE => name,
                    m::LABEL_REASON => reason
                )
                .increment(count);
            }
        }
    }
}

/// 어댑터 하나의 수집 결과
#[derive(Debug, Clone)]
pub struct SourceOutput<R> {
    /// 정규화 레코드
    pub records: Vec<R>,
    /// 드롭 통계
    pub stats: DropStats,
}

/// 수집 소스 어댑터
pub trait LogSource: Send + Sync {
    /// 이 소스가 만드는 레코드
    type Record: Serialize + Send + Sync;

    /// 소스 종류 (저장소 이름, 실행 순서)
    fn kind(&self) -> SourceKind;

    /// 수집 기간의 레코드를 모읍니다.
    ///
    /// 진행 메시지는 `progress`에 순서대로 추가됩니다. 에러로 끝나도 그 전까지의
    /// 메시지는 남아 있습니다.
    ///
    /// # Errors
    /// - 업스트림 호출/다운로드 실패: 이 소스만 중단
    /// - 국가 DB 설정 에러: 실행 전체 중단 ([`CollectorError::is_fatal`])
    /// - 취소: [`CollectorError::Cancelled`]
    fn collect(
        &self,
        range: &DateRange,
        geo: &GeoEnricher,
        cancel: &CancellationToken,
        progress: &mut Vec<String>,
    ) -> impl Future<Output = Result<SourceOutput<Self::Record>, CollectorError>> + Send;
}

pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), CollectorError> {
    if cancel.is_cancelled() {
        Err(CollectorError::Cancelled)
    } else {
        Ok(())
    }
}

/// 객체 본문을 텍스트로 바꿉니다. `.gz` 키는 먼저 압축을 풉니다.
///
/// 손상된 gzip이나 UTF-8이 아닌 본문은 `None`입니다.
pub fn decode_object(key: &str, body: &[u8]) -> Option<String> {
    if key.ends_with(".gz") {
        let mut decoder = flate2::read::GzDecoder::new(body);
        let mut text = String::new();
        decoder.read_to_string(&mut text).ok()?;
        Some(text)
    } else {
        String::from_utf8(body.to_vec()).ok()
    }
}

/// 오브젝트 스토리지 공통 흐름: 목록 페이지 순회 → 키 날짜 필터 → 다운로드 → 디코딩
///
/// 기간 안의 객체마다 `on_object(key, text)`를 호출합니다. 읽을 수 없는 객체는
/// 통계에만 남기고 건너뜁니다.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn scan_objects<S, F>(
    store: &S,
    bucket: &str,
    prefix: &str,
    extractor: &KeyDateExtractor,
    range: &DateRange,
    cancel: &CancellationToken,
    progress: &mut Vec<String>,
    stats: &mut DropStats,
    mut on_object: F,
) -> Result<(), CollectorError>
where
    S: ObjectStore,
    F: FnMut(&str, &str, &mut DropStats) -> Result<(), CollectorError> + Send,
{
    progress.push(format!("[*] listing objects in bucket ({bucket})"));
    progress.push("[*] filtering and fetching log files...".to_owned());

    let mut continuation = None;
    loop {
        ensure_not_cancelled(cancel)?;
        let page = store.list_objects(bucket, prefix, continuation).await?;

        for object in &page.objects {
            stats.objects_listed += 1;
            let Some(log_date) = extractor.extract(&object.key) else {
                stats.objects_without_date += 1;
                continue;
            };
            if !range.contains(log_date) {
                stats.objects_out_of_range += 1;
                continue;
            }

            ensure_not_cancelled(cancel)?;
            let body = store.get_object(bucket, &object.key).await?;
            stats.objects_fetched += 1;
            tracing::debug!(bucket, key = object.key.as_str(), bytes = body.len(), "object fetched");

            match decode_object(&object.key, &body) {
                Some(text) => on_object(&object.key, &text, stats)?,
                None => {
                    stats.objects_unreadable += 1;
                    tracing::warn!(key = object.key.as_str(), "object could not be decoded, skipping");
                }
            }
        }

        progress.push(format!("[+] total log files fetched: {}", stats.objects_fetched));

        continuation = page.continuation;
        if continuation.is_none() {
            break;
        }
    }
    Ok(())
}

//! 메트릭 상수 및 설명 등록
//!
//! 수집 실행 중 기록되는 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않으면 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `trailscope_`
//! - 모듈명: `collector_`, `geo_`, `sink_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use trailscope_core::metrics::{COLLECTOR_RECORDS_COLLECTED_TOTAL, LABEL_SOURCE};
//!
//! metrics::counter!(COLLECTOR_RECORDS_COLLECTED_TOTAL, LABEL_SOURCE => "vpcflow").increment(10);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 소스 레이블 키 (s3accesslog, vpcflow, cloudtrail)
pub const LABEL_SOURCE: &str = "source";

/// 드롭 사유 레이블 키 (parse_error, out_of_range, no_date, excluded)
pub const LABEL_REASON: &str = "reason";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Collector 메트릭 ──────────────────────────────────────────────

/// Collector: 수집된 레코드 수 (counter, label: source)
pub const COLLECTOR_RECORDS_COLLECTED_TOTAL: &str = "trailscope_collector_records_collected_total";

/// Collector: 드롭된 라인/이벤트 수 (counter, labels: source, reason)
pub const COLLECTOR_RECORDS_DROPPED_TOTAL: &str = "trailscope_collector_records_dropped_total";

/// Collector: 다운로드한 객체 수 (counter, label: source)
pub const COLLECTOR_OBJECTS_FETCHED_TOTAL: &str = "trailscope_collector_objects_fetched_total";

/// Collector: 키 날짜 필터로 건너뛴 객체 수 (counter, label: source)
pub const COLLECTOR_OBJECTS_SKIPPED_TOTAL: &str = "trailscope_collector_objects_skipped_total";

/// Collector: 조회한 감사 이벤트 페이지 수 (counter)
pub const COLLECTOR_AUDIT_PAGES_TOTAL: &str = "trailscope_collector_audit_pages_total";

/// Collector: 소스 단위 수집 실행 결과 (counter, labels: source, result)
pub const COLLECTOR_SOURCE_RUNS_TOTAL: &str = "trailscope_collector_source_runs_total";

/// Collector: 소스 하나의 수집 소요 시간 (histogram, 초, label: source)
pub const COLLECTOR_SOURCE_DURATION_SECONDS: &str =
    "trailscope_collector_source_duration_seconds";

// ─── Geo 메트릭 ────────────────────────────────────────────────────

/// Geo: 캐시 적중 수 (counter)
pub const GEO_CACHE_HITS_TOTAL: &str = "trailscope_geo_cache_hits_total";

/// Geo: DB 조회 수 (counter)
pub const GEO_LOOKUPS_TOTAL: &str = "trailscope_geo_lookups_total";

// ─── Sink 메트릭 ───────────────────────────────────────────────────

/// Sink: 저장된 레코드 수 (counter, label: source)
pub const SINK_RECORDS_WRITTEN_TOTAL: &str = "trailscope_sink_records_written_total";

/// Sink: 쓰기 실패 수 (counter, label: source)
pub const SINK_WRITE_FAILURES_TOTAL: &str = "trailscope_sink_write_failures_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 소스 수집 소요 시간 히스토그램 버킷 (초)
///
/// 100ms ~ 600s 범위 (객체 다운로드와 페이지 조회 포함)
pub const SOURCE_DURATION_BUCKETS: [f64; 9] = [0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 180.0, 600.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    // Collector
    describe_counter!(
        COLLECTOR_RECORDS_COLLECTED_TOTAL,
        "Total number of records collected per source"
    );
    describe_counter!(
        COLLECTOR_RECORDS_DROPPED_TOTAL,
        "Total number of lines or events dropped, by reason"
    );
    describe_counter!(
        COLLECTOR_OBJECTS_FETCHED_TOTAL,
        "Total number of storage objects downloaded"
    );
    describe_counter!(
        COLLECTOR_OBJECTS_SKIPPED_TOTAL,
        "Total number of storage objects skipped by key date"
    );
    describe_counter!(
        COLLECTOR_AUDIT_PAGES_TOTAL,
        "Total number of audit event pages fetched"
    );
    describe_counter!(
        COLLECTOR_SOURCE_RUNS_TOTAL,
        "Source adapter runs by result"
    );
    describe_histogram!(
        COLLECTOR_SOURCE_DURATION_SECONDS,
        "Time to collect a single source in seconds"
    );

    // Geo
    describe_counter!(GEO_CACHE_HITS_TOTAL, "Country lookups served from cache");
    describe_counter!(GEO_LOOKUPS_TOTAL, "Country lookups against the database");

    // Sink
    describe_counter!(
        SINK_RECORDS_WRITTEN_TOTAL,
        "Total number of records persisted"
    );
    describe_counter!(SINK_WRITE_FAILURES_TOTAL, "Total number of failed batch writes");
}

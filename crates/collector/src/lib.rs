#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`source`]: 소스 어댑터 (액세스 로그, 플로우 로그, 감사 이벤트)와 업스트림 trait
//! - [`parser`]: 액세스 로그/플로우 로그 라인 파서
//! - [`geo`]: IP → 국가 코드 보강 (지연 초기화 + 캐시)
//! - [`sink`]: MongoDB / JSON 파일 저장소
//! - [`orchestrator`]: 순차 실행과 진행 메시지 스트리밍
//! - [`aws`]: S3, CloudTrail 클라이언트
//! - [`record`]: 저장되는 레코드 형식
//! - [`config`]: 수집기 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입

pub mod aws;
pub mod config;
pub mod error;
pub mod geo;
pub mod orchestrator;
pub mod parser;
pub mod record;
pub mod sink;
pub mod source;

// --- 주요 타입 re-export ---

// 오케스트레이터
pub use orchestrator::{CollectionSummary, Collector, CollectorBuilder, SourceReport};

// 설정
pub use config::{CollectorConfig, CollectorConfigBuilder, ObjectSourceConfig};

// 에러
pub use error::CollectorError;

// 보강
pub use geo::{CountryDatabase, GeoEnricher, MaxMindCountryDatabase};

// 파서
pub use parser::{AccessLogParser, FlowLogParser, LineParser};

// 레코드
pub use record::{AccessLogEntry, AuditEvent, AuditResource, FlowLogEntry, NumericField};

// 소스
pub use source::{
    AccessLogSource, AuditEventSource, AuditPage, AuditTrail, DropStats, FlowLogSource, LogSource,
    ObjectListing, ObjectStore, ObjectSummary, SourceOutput,
};

// 저장소
pub use sink::{AnySink, JsonFileSink, MongoSink, RecordSink, SinkOutcome};

// AWS
pub use aws::{CloudTrailClient, S3ObjectStore, aws_sdk_config};

//! 레코드 저장소
//!
//! 한 소스의 수집 결과는 `(source_name, range_label)` 주소에 한 번에 기록됩니다.
//! 문서 DB에서는 데이터베이스와 컬렉션, 파일 저장소에서는 파일 하나입니다.
//!
//! 저장 실패는 실행을 멈추지 않습니다. [`persist_batch`]가 실패를 로그와 메트릭으로
//! 남기고 [`SinkOutcome::Failed`]를 돌려줍니다.

pub mod file;
pub mod mongo;

pub use file::JsonFileSink;
pub use mongo::MongoSink;

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use trailscope_core::config::{SinkConfig, SinkKind};
use trailscope_core::metrics as m;
use trailscope_core::types::CollectionKey;

use crate::error::CollectorError;

/// 문서 배치를 받는 저장소
pub trait RecordSink: Send + Sync {
    /// 저장소 종류 이름 (로그용)
    fn name(&self) -> &'static str;

    /// `key` 주소에 문서를 한 번에 기록합니다. 빈 배치로는 호출되지 않습니다.
    ///
    /// # Errors
    /// 연결/쓰기 실패 시 [`CollectorError::SinkConnection`] 또는 [`CollectorError::SinkWrite`]
    fn insert_many(
        &self,
        key: &CollectionKey,
        documents: Vec<Value>,
    ) -> impl Future<Output = Result<(), CollectorError>> + Send;
}

/// 배치 저장 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    /// 빈 배치라 아무것도 쓰지 않음
    Skipped,
    /// 기록한 문서 수
    Written(usize),
    /// 실패 사유
    Failed(String),
}

impl SinkOutcome {
    /// 실패 여부
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// 설정에 따라 고른 저장소
pub enum AnySink {
    /// MongoDB
    Mongo(MongoSink),
    /// JSON 파일
    File(JsonFileSink),
}

impl AnySink {
    /// 설정으로 저장소를 만듭니다.
    ///
    /// # Errors
    /// MongoDB URI가 잘못된 경우 [`CollectorError::SinkConnection`]
    pub async fn from_config(config: &SinkConfig) -> Result<Self, CollectorError> {
        match config.kind {
            SinkKind::Mongodb => Ok(Self::Mongo(MongoSink::connect(&config.mongodb_uri).await?)),
            SinkKind::File => Ok(Self::File(JsonFileSink::new(&config.output_dir))),
        }
    }
}

impl RecordSink for AnySink {
    fn name(&self) -> &'static str {
        match self {
            Self::Mongo(sink) => sink.name(),
            Self::File(sink) => sink.name(),
        }
    }

    async fn insert_many(
        &self,
        key: &CollectionKey,
        documents: Vec<Value>,
    ) -> Result<(), CollectorError> {
        match self {
            Self::Mongo(sink) => sink.insert_many(key, documents).await,
            Self::File(sink) => sink.insert_many(key, documents).await,
        }
    }
}

/// 레코드를 저장 가능한 JSON 문서로 바꿉니다.
///
/// 부호 있는 64비트 범위를 넘는 정수는 문자열로 바꿉니다.
///
/// # Errors
/// 직렬화 실패 시 [`CollectorError::Serialization`]
pub fn normalize_records<R: Serialize>(records: &[R]) -> Result<Vec<Value>, CollectorError> {
    records
        .iter()
        .map(|record| {
            let mut value = serde_json::to_value(record)?;
            clamp_wide_integers(&mut value);
            Ok(value)
        })
        .collect()
}

fn clamp_wide_integers(value: &mut Value) {
    match value {
        Value::Number(n) if n.is_u64() && n.as_i64().is_none() => {
            *value = Value::String(n.to_string());
        }
        Value::Array(items) => items.iter_mut().for_each(clamp_wide_integers),
        Value::Object(map) => map.values_mut().for_each(clamp_wide_integers),
        _ => {}
    }
}

/// 한 소스의 결과를 저장합니다.
///
/// 빈 배치는 저장소를 호출하지 않습니다. 실패는 에러 로그와 메트릭으로 남기고
/// [`SinkOutcome::Failed`]로 돌려줍니다.
pub async fn persist_batch<S, R>(sink: &S, key: &CollectionKey, records: &[R]) -> SinkOutcome
where
    S: RecordSink,
    R: Serialize + Sync,
{
    if records.is_empty() {
        tracing::info!(collection = %key, "no documents to insert");
        return SinkOutcome::Skipped;
    }

    let result = match normalize_records(records) {
        Ok(documents) => sink.insert_many(key, documents).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            metrics::counter!(m::SINK_RECORDS_WRITTEN_TOTAL, m::LABEL_SOURCE => key.source_name.clone())
                .increment(records.len() as u64);
            tracing::info!(collection = %key, sink = sink.name(), count = records.len(), "documents inserted");
            SinkOutcome::Written(records.len())
        }
        Err(e) => {
            metrics::counter!(m::SINK_WRITE_FAILURES_TOTAL, m::LABEL_SOURCE => key.source_name.clone())
                .increment(1);
            tracing::error!(collection = %key, sink = sink.name(), error = %e, "failed to insert documents");
            SinkOutcome::Failed(e.to_string())
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MemorySink;
    use super::*;
    use serde_json::json;
    use trailscope_core::types::{DateRange, SourceKind};

    #[derive(Serialize)]
    struct Row {
        id: u32,
        bytes: u64,
    }

    fn key() -> CollectionKey {
        let range = DateRange::parse("2025-05-01", "2025-05-03").unwrap();
        CollectionKey::new(SourceKind::FlowLog, &range)
    }

    #[test]
    fn wide_unsigned_integers_become_strings() {
        let docs = normalize_records(&[Row {
            id: 1,
            bytes: u64::MAX,
        }])
        .unwrap();
        assert_eq!(docs[0], json!({ "id": 1, "bytes": u64::MAX.to_string() }));
    }

    #[test]
    fn nested_values_are_clamped() {
        let mut value = json!({ "a": [1, u64::MAX], "b": { "c": -5 } });
        clamp_wide_integers(&mut value);
        assert_eq!(value, json!({ "a": [1, u64::MAX.to_string()], "b": { "c": -5 } }));
    }

    #[tokio::test]
    async fn empty_batch_is_not_written() {
        let sink = MemorySink::new();
        let outcome = persist_batch::<_, Row>(&sink, &key(), &[]).await;
        assert_eq!(outcome, SinkOutcome::Skipped);
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn batch_written_to_single_address() {
        let sink = MemorySink::new();
        let rows = [Row { id: 1, bytes: 10 }, Row { id: 2, bytes: 20 }];
        let outcome = persist_batch(&sink, &key(), &rows).await;

        assert_eq!(outcome, SinkOutcome::Written(2));
        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0.to_string(), "vpcflow.2025-05-01_to_2025-05-03");
        assert_eq!(batches[0].1.len(), 2);
    }

    #[tokio::test]
    async fn write_failure_is_reported_not_raised() {
        let sink = MemorySink::failing();
        let outcome = persist_batch(&sink, &key(), &[Row { id: 1, bytes: 1 }]).await;
        assert!(outcome.is_failed());
    }
}

//! MongoDB 저장소
//!
//! 소스 이름이 데이터베이스, 기간 레이블이 컬렉션입니다.

use mongodb::Client;
use mongodb::bson::{self, Document};
use serde_json::Value;
use trailscope_core::types::CollectionKey;

use super::RecordSink;
use crate::error::CollectorError;

/// MongoDB 저장소
#[derive(Debug, Clone)]
pub struct MongoSink {
    client: Client,
}

impl MongoSink {
    /// URI로 클라이언트를 만듭니다. 실제 연결은 첫 쓰기 때 맺어집니다.
    ///
    /// # Errors
    /// URI가 비었거나 해석할 수 없으면 [`CollectorError::SinkConnection`]
    pub async fn connect(uri: &str) -> Result<Self, CollectorError> {
        if uri.is_empty() {
            return Err(CollectorError::SinkConnection(
                "mongodb uri is empty".to_owned(),
            ));
        }
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| CollectorError::SinkConnection(format!("invalid mongodb uri: {e}")))?;
        Ok(Self { client })
    }
}

fn to_documents(key: &CollectionKey, documents: Vec<Value>) -> Result<Vec<Document>, CollectorError> {
    documents
        .iter()
        .map(|value| {
            bson::to_document(value).map_err(|e| CollectorError::SinkWrite {
                target: key.to_string(),
                reason: format!("bson conversion failed: {e}"),
            })
        })
        .collect()
}

impl RecordSink for MongoSink {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn insert_many(
        &self,
        key: &CollectionKey,
        documents: Vec<Value>,
    ) -> Result<(), CollectorError> {
        let documents = to_documents(key, documents)?;
        let collection = self
            .client
            .database(&key.source_name)
            .collection::<Document>(&key.range_label);

        let result = collection
            .insert_many(documents)
            .await
            .map_err(|e| CollectorError::SinkWrite {
                target: key.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(collection = %key, inserted = result.inserted_ids.len(), "mongodb insert_many completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trailscope_core::types::{DateRange, SourceKind};

    #[tokio::test]
    async fn empty_uri_rejected() {
        let err = MongoSink::connect("").await.unwrap_err();
        assert!(matches!(err, CollectorError::SinkConnection(_)));
    }

    #[tokio::test]
    async fn malformed_uri_rejected() {
        let err = MongoSink::connect("not-a-uri").await.unwrap_err();
        assert!(matches!(err, CollectorError::SinkConnection(_)));
    }

    #[test]
    fn documents_keep_field_names() {
        let range = DateRange::parse("2025-05-01", "2025-05-01").unwrap();
        let key = CollectionKey::new(SourceKind::AuditEvent, &range);
        let docs = to_documents(&key, vec![json!({ "EventId": "e-1", "country": null, "Size": 3 })]).unwrap();

        assert_eq!(docs[0].get_str("EventId").unwrap(), "e-1");
        assert!(docs[0].contains_key("country"));
        assert_eq!(docs[0].get_i64("Size").ok().or(docs[0].get_i32("Size").ok().map(i64::from)), Some(3));
    }

    #[test]
    fn non_object_document_rejected() {
        let range = DateRange::parse("2025-05-01", "2025-05-01").unwrap();
        let key = CollectionKey::new(SourceKind::AuditEvent, &range);
        let err = to_documents(&key, vec![json!([1, 2])]).unwrap_err();
        assert!(matches!(err, CollectorError::SinkWrite { .. }));
    }
}

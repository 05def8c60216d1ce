//! JSON 파일 저장소
//!
//! `{output_dir}/{source_name}.{range_label}.json`에 문서 배열을 씁니다.
//! 같은 주소로 다시 수집하면 파일을 덮어씁니다.

use std::path::{Path, PathBuf};

use serde_json::Value;
use trailscope_core::types::CollectionKey;

use super::RecordSink;
use crate::error::CollectorError;

/// JSON 파일 저장소
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    output_dir: PathBuf,
}

impl JsonFileSink {
    /// 출력 디렉토리를 지정해 만듭니다. 디렉토리는 첫 쓰기 때 생성됩니다.
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// 주소에 해당하는 파일 경로
    pub fn path_for(&self, key: &CollectionKey) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}.json", key.source_name, key.range_label))
    }
}

impl RecordSink for JsonFileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn insert_many(
        &self,
        key: &CollectionKey,
        documents: Vec<Value>,
    ) -> Result<(), CollectorError> {
        let write_err = |reason: String| CollectorError::SinkWrite {
            target: key.to_string(),
            reason,
        };

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| write_err(format!("create '{}': {e}", self.output_dir.display())))?;

        let body = serde_json::to_vec_pretty(&documents)?;
        let path = self.path_for(key);
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| write_err(format!("write '{}': {e}", path.display())))?;

        tracing::debug!(path = %path.display(), count = documents.len(), "json file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trailscope_core::types::{DateRange, SourceKind};

    fn key() -> CollectionKey {
        let range = DateRange::parse("2025-05-01", "2025-05-03").unwrap();
        CollectionKey::new(SourceKind::AccessLog, &range)
    }

    #[tokio::test]
    async fn writes_array_under_address_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("nested"));

        sink.insert_many(&key(), vec![json!({ "a": 1 }), json!({ "a": 2 })])
            .await
            .unwrap();

        let path = dir
            .path()
            .join("nested")
            .join("s3accesslog.2025-05-01_to_2025-05-03.json");
        let written: Vec<Value> = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(written, vec![json!({ "a": 1 }), json!({ "a": 2 })]);
    }

    #[tokio::test]
    async fn unwritable_directory_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let sink = JsonFileSink::new(&blocker);

        let err = sink.insert_many(&key(), vec![json!({})]).await.unwrap_err();
        assert!(matches!(err, CollectorError::SinkWrite { .. }));
    }
}

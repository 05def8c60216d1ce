//! AWS 업스트림 구현
//!
//! [`ObjectStore`]와 [`AuditTrail`] trait의 실제 구현입니다. 테스트는 `source::mock`의
//! 인메모리 구현을 씁니다.
//!
//! ```text
//! ┌───────────────┐      ┌───────────────┐
//! │ AccessLog /   │      │ AuditEvent    │
//! │ FlowLog Source│      │ Source        │
//! └──────┬────────┘      └──────┬────────┘
//!        ▼                      ▼
//!   ObjectStore (trait)     AuditTrail (trait)
//!        │                      │
//!        ▼                      ▼
//!   S3ObjectStore          CloudTrailClient
//! ```
//!
//! 자격 증명은 설정 파일의 정적 키를 씁니다.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudtrail::primitives::DateTime as SmithyDateTime;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use trailscope_core::config::AwsConfig;

use crate::error::CollectorError;
use crate::record::{AuditEvent, AuditResource};
use crate::source::{AuditPage, AuditTrail, ObjectListing, ObjectStore, ObjectSummary};

/// 자격 증명 공급자 이름
const CREDENTIALS_PROVIDER: &str = "trailscope";

/// 감사 이벤트 시각 표기 (`2025-05-01 09:00:00+00:00`)
const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// 정적 키와 리전으로 SDK 공통 설정을 만듭니다.
pub async fn aws_sdk_config(aws: &AwsConfig) -> SdkConfig {
    let credentials = Credentials::new(
        aws.access_key.clone(),
        aws.secret_key.clone(),
        None,
        None,
        CREDENTIALS_PROVIDER,
    );
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(aws.region.clone()))
        .credentials_provider(credentials)
        .load()
        .await
}

/// S3 기반 [`ObjectStore`]
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    /// SDK 공통 설정으로 클라이언트를 만듭니다.
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
        }
    }
}

impl ObjectStore for S3ObjectStore {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectListing, CollectorError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|e| CollectorError::Upstream {
                service: "s3".to_owned(),
                reason: format!("list objects in '{bucket}' failed: {}", DisplayErrorContext(&e)),
            })?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                object.key().map(|key| ObjectSummary {
                    key: key.to_owned(),
                    size: object.size(),
                })
            })
            .collect();

        let continuation = if output.is_truncated().unwrap_or(false) {
            output
                .next_continuation_token()
                .filter(|token| !token.is_empty())
                .map(str::to_owned)
        } else {
            None
        };

        Ok(ObjectListing {
            objects,
            continuation,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, CollectorError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| CollectorError::Download {
                key: key.to_owned(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        let body = output.body.collect().await.map_err(|e| CollectorError::Download {
            key: key.to_owned(),
            reason: format!("body stream failed: {e}"),
        })?;
        Ok(body.into_bytes())
    }
}

/// CloudTrail 기반 [`AuditTrail`]
#[derive(Debug, Clone)]
pub struct CloudTrailClient {
    client: aws_sdk_cloudtrail::Client,
}

impl CloudTrailClient {
    /// SDK 공통 설정으로 클라이언트를 만듭니다.
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudtrail::Client::new(sdk_config),
        }
    }
}

impl AuditTrail for CloudTrailClient {
    async fn lookup_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page_size: i32,
        next_token: Option<String>,
    ) -> Result<AuditPage, CollectorError> {
        let output = self
            .client
            .lookup_events()
            .start_time(SmithyDateTime::from_secs(start.timestamp()))
            .end_time(SmithyDateTime::from_secs(end.timestamp()))
            .max_results(page_size)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| CollectorError::Upstream {
                service: "cloudtrail".to_owned(),
                reason: format!("lookup events failed: {}", DisplayErrorContext(&e)),
            })?;

        let events = output.events().iter().map(convert_event).collect();
        Ok(AuditPage {
            events,
            next_token: output.next_token().map(str::to_owned),
        })
    }
}

fn convert_event(event: &aws_sdk_cloudtrail::types::Event) -> AuditEvent {
    AuditEvent {
        event_id: event.event_id().map(str::to_owned),
        event_name: event.event_name().map(str::to_owned),
        read_only: event.read_only().map(str::to_owned),
        access_key_id: event.access_key_id().map(str::to_owned),
        event_time: event
            .event_time()
            .and_then(|t| format_event_time(t.secs(), t.subsec_nanos())),
        event_source: event.event_source().map(str::to_owned),
        username: event.username().map(str::to_owned),
        resources: event
            .resources()
            .iter()
            .map(|r| AuditResource {
                resource_type: r.resource_type().map(str::to_owned),
                resource_name: r.resource_name().map(str::to_owned),
            })
            .collect(),
        cloud_trail_event: event.cloud_trail_event().map(str::to_owned),
        country: None,
    }
}

/// epoch 초/나노초를 UTC 오프셋이 붙은 문자열로 바꿉니다.
pub(crate) fn format_event_time(secs: i64, nanos: u32) -> Option<String> {
    DateTime::<Utc>::from_timestamp(secs, nanos).map(|t| t.format(EVENT_TIME_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_time_keeps_utc_offset() {
        // 2025-05-01T09:00:00Z
        assert_eq!(
            format_event_time(1_746_090_000, 0).as_deref(),
            Some("2025-05-01 09:00:00+00:00")
        );
    }

    #[test]
    fn event_time_out_of_range_is_none() {
        assert_eq!(format_event_time(i64::MAX, 0), None);
    }

    #[test]
    fn converts_sdk_event() {
        let event = aws_sdk_cloudtrail::types::Event::builder()
            .event_id("e-1")
            .event_name("ConsoleLogin")
            .read_only("false")
            .event_time(SmithyDateTime::from_secs(1_746_090_000))
            .username("alice")
            .resources(
                aws_sdk_cloudtrail::types::Resource::builder()
                    .resource_type("AWS::S3::Bucket")
                    .resource_name("my-bucket")
                    .build(),
            )
            .cloud_trail_event(r#"{"sourceIPAddress":"8.8.8.8"}"#)
            .build();

        let converted = convert_event(&event);
        assert_eq!(converted.event_id.as_deref(), Some("e-1"));
        assert_eq!(converted.event_time.as_deref(), Some("2025-05-01 09:00:00+00:00"));
        assert_eq!(converted.resources.len(), 1);
        assert_eq!(converted.resources[0].resource_name.as_deref(), Some("my-bucket"));
        assert_eq!(converted.access_key_id, None);
        assert_eq!(converted.country, None);
    }
}

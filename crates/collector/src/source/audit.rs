//! 감사 이벤트 어댑터
//!
//! LookupEvents를 커서가 없을 때까지 페이지 단위로 호출해 모두 모은 뒤,
//! 각 이벤트의 내장 JSON에서 사용자와 요청 IP를 읽어 제외 여부와 국가 코드를 정합니다.
//!
//! 페이지 호출이 한 번이라도 실패하면 이미 받은 페이지도 버리고 에러를 돌려줍니다.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use trailscope_core::metrics as m;
use trailscope_core::types::{DateRange, SourceKind};

use super::{AuditTrail, DropStats, LogSource, SourceOutput, ensure_not_cancelled};
use crate::error::CollectorError;
use crate::geo::GeoEnricher;
use crate::record::AuditEvent;

struct PayloadFields<'p> {
    excluded: bool,
    source_ip: Option<&'p str>,
}

/// 감사 이벤트 어댑터
pub struct AuditEventSource<A> {
    trail: Arc<A>,
    page_size: i32,
    excluded_user: String,
}

impl<A: AuditTrail> AuditEventSource<A> {
    /// 어댑터를 만듭니다. `excluded_user`가 비어 있으면 아무 이벤트도 제외하지 않습니다.
    pub fn new(trail: Arc<A>, page_size: i32, excluded_user: impl Into<String>) -> Self {
        Self {
            trail,
            page_size,
            excluded_user: excluded_user.into(),
        }
    }

    async fn fetch_all(
        &self,
        range: &DateRange,
        cancel: &CancellationToken,
    ) -> Result<Vec<AuditEvent>, CollectorError> {
        let mut events = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            ensure_not_cancelled(cancel)?;
            let page = self
                .trail
                .lookup_events(
                    range.start_time(),
                    range.end_time(),
                    self.page_size,
                    next_token.take(),
                )
                .await?;
            metrics::counter!(m::COLLECTOR_AUDIT_PAGES_TOTAL).increment(1);
            tracing::debug!(events = page.events.len(), "audit event page fetched");
            events.extend(page.events);

            next_token = page.next_token.filter(|t| !t.is_empty());
            if next_token.is_none() {
                break;
            }
        }
        Ok(events)
    }

    /// 내장 페이로드에서 제외 여부와 원본 IP를 읽습니다.
    ///
    /// 페이로드가 객체가 아니거나 `userIdentity`가 있는데 객체가 아니면 (`null` 포함)
    /// `None`입니다. 이 경우 이벤트는 IP 없이 유지됩니다.
    fn inspect<'p>(&self, payload: &'p Value) -> Option<PayloadFields<'p>> {
        let object = payload.as_object()?;
        let user_name = match object.get("userIdentity") {
            None => None,
            Some(Value::Object(identity)) => identity.get("userName").and_then(Value::as_str),
            Some(_) => return None,
        };
        Some(PayloadFields {
            excluded: !self.excluded_user.is_empty()
                && user_name == Some(self.excluded_user.as_str()),
            source_ip: object.get("sourceIPAddress").and_then(Value::as_str),
        })
    }
}

impl<A: AuditTrail> LogSource for AuditEventSource<A> {
    type Record = AuditEvent;

    fn kind(&self) -> SourceKind {
        SourceKind::AuditEvent
    }

    async fn collect(
        &self,
        range: &DateRange,
        geo: &GeoEnricher,
        cancel: &CancellationToken,
        progress: &mut Vec<String>,
    ) -> Result<SourceOutput<AuditEvent>, CollectorError> {
        progress.push(format!("[+] collection window: {range}"));
        let mut stats = DropStats::default();

        if range.is_empty() {
            tracing::warn!(%range, "start date is after end date, skipping audit event lookup");
            progress.push("[+] total events: 0".to_owned());
            return Ok(SourceOutput {
                records: Vec::new(),
                stats,
            });
        }

        progress.push("[*] looking up audit events...".to_owned());
        let events = self.fetch_all(range, cancel).await?;
        progress.push(format!("[+] total events: {}", events.len()));

        let mut records = Vec::with_capacity(events.len());
        for mut event in events {
            let payload = match event.cloud_trail_event.as_deref() {
                Some(raw) => match serde_json::from_str::<Value>(raw) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        stats.payloads_unparsable += 1;
                        tracing::debug!(
                            event_id = event.event_id.as_deref().unwrap_or("-"),
                            error = %e,
                            "embedded event payload is not valid JSON"
                        );
                        None
                    }
                },
                None => None,
            };

            let fields = payload.as_ref().and_then(|p| {
                let fields = self.inspect(p);
                if fields.is_none() {
                    stats.payloads_unparsable += 1;
                    tracing::debug!(
                        event_id = event.event_id.as_deref().unwrap_or("-"),
                        "embedded event payload has an unexpected shape"
                    );
                }
                fields
            });

            if fields.as_ref().is_some_and(|f| f.excluded) {
                stats.events_excluded += 1;
                continue;
            }

            event.country = geo.lookup_optional(fields.and_then(|f| f.source_ip))?;
            records.push(event);
        }

        progress.push(format!(
            "[+] events to store after filtering: {} (excluded: {})",
            records.len(),
            stats.events_excluded
        ));
        Ok(SourceOutput { records, stats })
    }
}

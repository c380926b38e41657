//! 수집 프로세서 -- 탐지, 파싱, 정규화, 저장, 통계 집계
//!
//! 원본 페이로드 하나를 받아 형식을 판별하고, 파서가 만든 레코드를
//! 정규화 이벤트로 저장합니다. 저장 실패는 전파하고, 통계 실패는
//! 로그 후 흡수합니다.

use std::sync::Arc;

use chrono::{Duration, Utc};
use logwarden_core::metrics::{
    INGEST_EVENTS_STORED_TOTAL, INGEST_LATENCY_AVG_SECONDS, INGEST_LATENCY_MAX_SECONDS,
    INGEST_PAYLOADS_TOTAL, INGEST_PROCESSING_DURATION_SECONDS, LABEL_FORMAT,
};
use logwarden_core::stats::MetricsStore;
use logwarden_core::storage::EventStorage;
use logwarden_core::types::{IngestOutcome, LogFormat, NormalizedEvent, RawLog};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::correlate::correlation_key;
use crate::detect::detect_format;
use crate::error::PipelineError;
use crate::parser::ParserRegistry;

/// 통계 해시/집합 키
const STATS_EVENTS_BY_FORMAT: &str = "events_by_format";
const STATS_EVENTS_TOTAL: &str = "events_total";
const STATS_EVENT_RATE: &str = "event_rate";
const STATS_INGEST_LATENCY: &str = "ingest_latency";
const STATS_LAST_BATCH: &str = "last_batch";

/// 수집 프로세서
///
/// 저장소와 통계 저장소를 주입받아 동작합니다. 전역 싱글턴에
/// 의존하지 않으므로 워커마다 복제하여 사용할 수 있습니다.
#[derive(Clone)]
pub struct IngestProcessor {
    storage: Arc<dyn EventStorage>,
    metrics: Arc<dyn MetricsStore>,
    parsers: Arc<ParserRegistry>,
}

impl IngestProcessor {
    /// 의존성을 주입받아 프로세서를 생성합니다.
    pub fn new(storage: Arc<dyn EventStorage>, metrics: Arc<dyn MetricsStore>) -> Self {
        Self {
            storage,
            metrics,
            parsers: Arc::new(ParserRegistry::with_defaults()),
        }
    }

    /// 페이로드 하나를 수집합니다.
    ///
    /// 공백뿐인 페이로드는 저장소를 건드리지 않고
    /// `{stored: 0, format: unknown}`을 반환합니다.
    ///
    /// # Errors
    /// 저장소 호출이 실패하면 전파합니다. 통계 실패는 흡수합니다.
    pub async fn process(
        &self,
        source: &str,
        content: &str,
    ) -> Result<IngestOutcome, PipelineError> {
        let trace_id = Uuid::new_v4();
        let started = std::time::Instant::now();
        metrics::counter!(INGEST_PAYLOADS_TOTAL).increment(1);

        if content.trim().is_empty() {
            tracing::debug!(%trace_id, source, "blank payload, nothing to ingest");
            return Ok(IngestOutcome {
                stored: 0,
                format: LogFormat::Unknown,
            });
        }

        let received_at = Utc::now();
        let format = detect_format(content);
        let records = self.parsers.parse(format, content);

        let hash = format!("{:x}", Sha256::digest(content.as_bytes()));
        let raw = RawLog {
            id: None,
            source: source.to_owned(),
            received_at,
            payload: content.to_owned(),
            format,
            hash,
        };
        let raw_id = self.storage.store_raw(raw).await?;

        let events: Vec<NormalizedEvent> = records
            .into_iter()
            .map(|record| {
                let key = correlation_key(record.app.as_deref(), &record.metadata);
                NormalizedEvent {
                    id: None,
                    raw_id: Some(raw_id),
                    ts: record.timestamp.unwrap_or(received_at),
                    host: record.host,
                    app: record.app,
                    severity: record.severity,
                    message: record.message.unwrap_or_default(),
                    metadata: record.metadata,
                    correlation_key: key,
                }
            })
            .collect();

        let stored = events.len();
        if stored > 0 {
            let latencies: Vec<f64> = events
                .iter()
                .map(|e| (received_at - e.ts).max(Duration::zero()))
                .map(|d| d.num_milliseconds() as f64 / 1000.0)
                .collect();
            let last_event_ts = events
                .iter()
                .map(|e| e.ts)
                .max()
                .unwrap_or(received_at);

            let ids = self.storage.store_normalized_batch(events).await?;
            self.storage.attach_normalized_to_raw(raw_id, &ids).await?;

            self.record_stats(format, &ids, &latencies, last_event_ts)
                .await;
        }

        metrics::counter!(INGEST_EVENTS_STORED_TOTAL, LABEL_FORMAT => format.as_str())
            .increment(stored as u64);
        metrics::histogram!(INGEST_PROCESSING_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        tracing::info!(%trace_id, source, format = %format, stored, "payload ingested");
        Ok(IngestOutcome { stored, format })
    }

    /// 수집 통계를 기록합니다. 실패는 로그 후 흡수합니다.
    async fn record_stats(
        &self,
        format: LogFormat,
        event_ids: &[i64],
        latencies: &[f64],
        last_event_ts: chrono::DateTime<Utc>,
    ) {
        let now = Utc::now();
        let count = event_ids.len() as u64;

        if let Err(e) = self.metrics.incr_counter(STATS_EVENTS_TOTAL, count).await {
            tracing::warn!(error = %e, "failed to bump event counter");
        }
        if let Err(e) = self
            .metrics
            .hash_incr(STATS_EVENTS_BY_FORMAT, format.as_str(), count)
            .await
        {
            tracing::warn!(error = %e, "failed to bump per-format counter");
        }
        for id in event_ids {
            if let Err(e) = self
                .metrics
                .windowed_add(STATS_EVENT_RATE, &id.to_string(), now)
                .await
            {
                tracing::warn!(error = %e, "failed to register event-rate membership");
                break;
            }
        }
        for latency in latencies {
            if let Err(e) = self
                .metrics
                .observe_latency(STATS_INGEST_LATENCY, *latency)
                .await
            {
                tracing::warn!(error = %e, "failed to record ingest latency");
                break;
            }
        }
        if let Err(e) = self
            .metrics
            .record_batch(STATS_LAST_BATCH, count, last_event_ts)
            .await
        {
            tracing::warn!(error = %e, "failed to record batch snapshot");
        }
        match self.metrics.latency_stats(STATS_INGEST_LATENCY).await {
            Ok(stats) => {
                metrics::gauge!(INGEST_LATENCY_AVG_SECONDS).set(stats.average());
                metrics::gauge!(INGEST_LATENCY_MAX_SECONDS).set(stats.max);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read latency summary");
            }
        }
    }
}

impl std::fmt::Debug for IngestProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestProcessor").finish_non_exhaustive()
    }
}

//! 애널라이저 루프 -- 신규 이벤트에 대한 규칙 매칭과 이상 탐지
//!
//! 주기적으로 저장소에서 최근 이벤트를 가져와 규칙 엔진과 이상
//! 탐지기를 실행하고, 알림/이상 징후를 기록합니다. 이벤트 하나의
//! 실패는 로그 후 다음 이벤트로 진행하며, 저장소 조회 실패 같은
//! 바깥 루프의 오류만 전파됩니다.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use logwarden_core::metrics::{
    ANALYZER_ALERTS_TOTAL, ANALYZER_ANOMALIES_TOTAL, ANALYZER_EVENTS_EVALUATED_TOTAL,
    ANALYZER_RULE_MATCHES_TOTAL, ANALYZER_RULES_LOADED, LABEL_RULE_ID,
};
use logwarden_core::stats::MetricsStore;
use logwarden_core::storage::{EventQuery, EventStorage};
use logwarden_core::types::{Alert, Anomaly, NormalizedEvent};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::anomaly::AnomalyDetector;
use crate::error::PipelineError;
use crate::notifier::Notifier;
use crate::rule::{RuleEngine, RuleInput};

/// 한 번의 폴링에서 가져오는 최대 이벤트 수
const FETCH_LIMIT: usize = 200;
/// 최근 처리 ID 집합의 상한 -- 초과분은 오래된 ID부터 제거
const MAX_TRACKED_IDS: usize = 10_000;
/// 알림 레이트 윈도우 집합 키
const STATS_ALERT_RATE: &str = "alert_rate";

/// 애널라이저 루프
///
/// 배포당 하나만 실행해야 합니다. 처리 ID 추적이 프로세스
/// 로컬이므로 둘 이상 실행하면 이벤트가 중복 처리됩니다.
pub struct AnalyzerLoop {
    storage: Arc<dyn EventStorage>,
    metrics: Arc<dyn MetricsStore>,
    engine: Arc<RuleEngine>,
    detector: AnomalyDetector,
    notifier: Notifier,
    poll_interval: Duration,
    alert_min_level: u8,
    /// 처리된 최근 이벤트 ID (상한 초과 시 오래된 것부터 제거)
    recent_ids: BTreeSet<i64>,
    /// recent_ids에서 밀려난 ID의 상한 -- 이 값 이하는 처리된 것으로 간주
    pruned_below: i64,
}

impl AnalyzerLoop {
    /// 의존성을 주입받아 루프를 생성합니다.
    pub fn new(
        storage: Arc<dyn EventStorage>,
        metrics: Arc<dyn MetricsStore>,
        engine: Arc<RuleEngine>,
        detector: AnomalyDetector,
        notifier: Notifier,
        poll_interval: Duration,
        alert_min_level: u8,
    ) -> Self {
        metrics::gauge!(ANALYZER_RULES_LOADED).set(engine.rule_count() as f64);
        Self {
            storage,
            metrics,
            engine,
            detector,
            notifier,
            poll_interval,
            alert_min_level,
            recent_ids: BTreeSet::new(),
            pruned_below: 0,
        }
    }

    /// 취소될 때까지 폴링을 반복합니다.
    ///
    /// # Errors
    /// 저장소 조회가 실패하면 전파합니다. 감독 재시작은 운영자의
    /// 몫입니다.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), PipelineError> {
        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            alert_min_level = self.alert_min_level,
            rules = self.engine.rule_count(),
            "analyzer loop started"
        );

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!("analyzer loop stopping");
                    return Ok(());
                }
                () = tokio::time::sleep(self.poll_interval) => {
                    self.run_pass().await?;
                }
            }
        }
    }

    /// 폴링 한 번을 수행합니다.
    pub async fn run_pass(&mut self) -> Result<(), PipelineError> {
        let query = EventQuery {
            limit: FETCH_LIMIT,
            ..Default::default()
        };
        let mut events = self.storage.list_events(&query).await?;
        // 최신순으로 반환되므로 오래된 것부터 처리
        events.reverse();

        for event in events {
            let Some(event_id) = event.id else { continue };
            if self.is_seen(event_id) {
                continue;
            }

            if let Err(e) = self.analyze_event(&event).await {
                tracing::warn!(
                    event_id,
                    error = %e,
                    "failed to analyze event, advancing to next"
                );
            }
            self.mark_seen(event_id);
        }

        Ok(())
    }

    fn is_seen(&self, event_id: i64) -> bool {
        event_id <= self.pruned_below || self.recent_ids.contains(&event_id)
    }

    fn mark_seen(&mut self, event_id: i64) {
        self.recent_ids.insert(event_id);
        while self.recent_ids.len() > MAX_TRACKED_IDS {
            if let Some(oldest) = self.recent_ids.pop_first() {
                self.pruned_below = self.pruned_below.max(oldest);
            }
        }
    }

    async fn analyze_event(&mut self, event: &NormalizedEvent) -> Result<(), PipelineError> {
        metrics::counter!(ANALYZER_EVENTS_EVALUATED_TOTAL).increment(1);

        let input = Self::rule_input(event);
        for matched in self.engine.matches(&input) {
            metrics::counter!(ANALYZER_RULE_MATCHES_TOTAL, LABEL_RULE_ID => matched.id.clone())
                .increment(1);
            if matched.severity < self.alert_min_level {
                continue;
            }

            let alert = Alert {
                id: None,
                created_at: Utc::now(),
                rule_id: Some(matched.id.clone()),
                level: matched.severity,
                title: matched.title.clone(),
                description: matched.description.clone(),
                tags: matched.tags.clone(),
                evidence: json!({
                    "log_id": event.id,
                    "msg": event.message,
                }),
            };
            let stored = self.notifier.persist_and_notify(alert).await?;
            metrics::counter!(ANALYZER_ALERTS_TOTAL).increment(1);

            if let Some(alert_id) = stored.id
                && let Err(e) = self
                    .metrics
                    .windowed_add(STATS_ALERT_RATE, &alert_id.to_string(), Utc::now())
                    .await
            {
                tracing::warn!(error = %e, "failed to register alert-rate membership");
            }
        }

        let verdict = self.detector.update(
            event.host.as_deref(),
            event.app.as_deref(),
            event.severity.as_deref(),
            event.ts,
        );
        if verdict.is_anomalous {
            let signal = AnomalyDetector::signal_key(
                event.host.as_deref(),
                event.app.as_deref(),
                event.severity.as_deref(),
            );
            let anomaly = Anomaly {
                id: None,
                created_at: Utc::now(),
                signal: signal.clone(),
                score: verdict.score,
                window_minutes: self.detector.window_minutes(),
                details: json!({"log_id": event.id}),
            };
            self.storage.store_anomaly(anomaly).await?;
            metrics::counter!(ANALYZER_ANOMALIES_TOTAL).increment(1);
            tracing::warn!(signal = %signal, score = verdict.score, "rate anomaly recorded");
        }

        Ok(())
    }

    /// 이벤트를 규칙 매칭용 평탄 뷰로 변환합니다.
    fn rule_input(event: &NormalizedEvent) -> RuleInput {
        let mut attrs = HashMap::new();
        if let Some(host) = &event.host {
            attrs.insert("host".to_owned(), host.clone());
        }
        if let Some(app) = &event.app {
            attrs.insert("app".to_owned(), app.clone());
        }
        if let Some(severity) = &event.severity {
            attrs.insert("severity".to_owned(), severity.clone());
        }
        for (attr, aliases) in [
            ("srcip", ["srcip", "src_ip"].as_slice()),
            ("dstip", ["dstip", "dest_ip"].as_slice()),
        ] {
            if let Some(value) = aliases.iter().find_map(|key| {
                event
                    .metadata
                    .get(key)
                    .and_then(serde_json::Value::as_str)
            }) {
                attrs.insert(attr.to_owned(), value.to_owned());
            }
        }

        RuleInput {
            message: event.message.clone(),
            attrs,
        }
    }
}

impl std::fmt::Debug for AnalyzerLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerLoop")
            .field("poll_interval", &self.poll_interval)
            .field("alert_min_level", &self.alert_min_level)
            .field("tracked_ids", &self.recent_ids.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logwarden_core::notify::TracingChannel;
    use logwarden_core::stats::MemoryMetricsStore;
    use logwarden_core::storage::MemoryStorage;

    async fn engine_from(yaml: &str) -> Arc<RuleEngine> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yml");
        tokio::fs::write(&path, yaml).await.unwrap();
        Arc::new(RuleEngine::load(&path).await.unwrap())
    }

    fn event(id: i64, app: &str, message: &str) -> NormalizedEvent {
        NormalizedEvent {
            id: None,
            raw_id: None,
            ts: Utc::now(),
            host: Some("web-01".to_owned()),
            app: Some(app.to_owned()),
            severity: Some("err".to_owned()),
            message: format!("{message} #{id}"),
            metadata: json!({}),
            correlation_key: "*|*|*".to_owned(),
        }
    }

    async fn analyzer(storage: Arc<MemoryStorage>, engine: Arc<RuleEngine>) -> AnalyzerLoop {
        let metrics = Arc::new(MemoryMetricsStore::new());
        let notifier = Notifier::new(
            storage.clone(),
            Arc::new(TracingChannel::new()),
            vec!["ops".to_owned()],
        );
        AnalyzerLoop::new(
            storage,
            metrics,
            engine,
            AnomalyDetector::default(),
            notifier,
            Duration::from_secs(10),
            5,
        )
    }

    #[tokio::test]
    async fn matching_event_produces_alert() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = engine_from(
            "- id: errs\n  title: Errors\n  severity: 7\n  patterns: [\"error\"]\n",
        )
        .await;
        storage
            .store_normalized_batch(vec![event(1, "nginx", "fatal error")])
            .await
            .unwrap();

        let mut analyzer = analyzer(storage.clone(), engine).await;
        analyzer.run_pass().await.unwrap();

        let alerts = storage.list_alerts(10).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rule_id.as_deref(), Some("errs"));
        assert_eq!(alerts[0].level, 7);
        assert_eq!(alerts[0].evidence["log_id"], 1);
        assert!(
            alerts[0].evidence["msg"]
                .as_str()
                .unwrap()
                .contains("fatal error")
        );
    }

    #[tokio::test]
    async fn below_min_level_matches_are_not_alerted() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = engine_from(
            "- id: low\n  title: Low\n  severity: 2\n  patterns: [\"error\"]\n",
        )
        .await;
        storage
            .store_normalized_batch(vec![event(1, "nginx", "minor error")])
            .await
            .unwrap();

        let mut analyzer = analyzer(storage.clone(), engine).await;
        analyzer.run_pass().await.unwrap();
        assert!(storage.list_alerts(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_are_processed_exactly_once() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = engine_from(
            "- id: errs\n  title: Errors\n  severity: 7\n  patterns: [\"error\"]\n",
        )
        .await;
        storage
            .store_normalized_batch(vec![event(1, "nginx", "error")])
            .await
            .unwrap();

        let mut analyzer = analyzer(storage.clone(), engine).await;
        analyzer.run_pass().await.unwrap();
        analyzer.run_pass().await.unwrap();

        assert_eq!(storage.list_alerts(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn new_events_between_passes_are_picked_up() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = engine_from(
            "- id: errs\n  title: Errors\n  severity: 7\n  patterns: [\"error\"]\n",
        )
        .await;
        storage
            .store_normalized_batch(vec![event(1, "nginx", "error")])
            .await
            .unwrap();

        let mut analyzer = analyzer(storage.clone(), engine).await;
        analyzer.run_pass().await.unwrap();

        storage
            .store_normalized_batch(vec![event(2, "nginx", "error")])
            .await
            .unwrap();
        analyzer.run_pass().await.unwrap();

        assert_eq!(storage.list_alerts(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn filter_mismatch_produces_no_alert() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = engine_from(
            "- id: errs\n  title: Errors\n  severity: 7\n  patterns: [\"error\"]\n  filters:\n    app: [\"postgres\"]\n",
        )
        .await;
        storage
            .store_normalized_batch(vec![event(1, "nginx", "error")])
            .await
            .unwrap();

        let mut analyzer = analyzer(storage.clone(), engine).await;
        analyzer.run_pass().await.unwrap();
        assert!(storage.list_alerts(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = engine_from("- id: r\n  title: R\n  severity: 5\n").await;
        let mut analyzer = analyzer(storage, engine).await;

        let token = CancellationToken::new();
        token.cancel();
        analyzer.run(token).await.unwrap();
    }

    #[tokio::test]
    async fn anomaly_is_persisted_when_detector_flags() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = engine_from("- id: r\n  title: R\n  severity: 10\n  patterns: [\"nomatch\"]\n").await;
        let metrics = Arc::new(MemoryMetricsStore::new());
        let notifier = Notifier::new(storage.clone(), Arc::new(TracingChannel::new()), vec![]);
        // 낮은 임계값과 넓은 윈도우로 급증을 쉽게 탐지
        let detector = AnomalyDetector::new(120, 1.0);
        let mut analyzer = AnalyzerLoop::new(
            storage.clone(),
            metrics,
            engine,
            detector,
            notifier,
            Duration::from_secs(10),
            5,
        );

        // 평탄한 이력을 만든 뒤 한 분에 몰린 급증 이벤트를 저장
        let base = Utc::now() - chrono::Duration::minutes(10);
        let mut events = Vec::new();
        let mut id = 0;
        for m in 0..4 {
            id += 1;
            let mut e = event(id, "nginx", "steady");
            e.ts = base + chrono::Duration::minutes(m);
            events.push(e);
        }
        for _ in 0..20 {
            id += 1;
            let mut e = event(id, "nginx", "burst");
            e.ts = base + chrono::Duration::minutes(5);
            events.push(e);
        }
        storage.store_normalized_batch(events).await.unwrap();

        analyzer.run_pass().await.unwrap();
        assert!(!storage.list_anomalies(10).await.unwrap().is_empty());
    }
}

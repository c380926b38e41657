//! 스토리지 추상화 — 이벤트/알림/이상 징후 저장소
//!
//! [`EventStorage`]는 수집/분석 경로가 의존하는 유일한 저장 인터페이스입니다.
//! 실제 백엔드(PostgreSQL 등)는 이 trait 구현으로 주입되며,
//! 테스트와 단일 프로세스 실행에는 [`MemoryStorage`]를 사용합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logwarden_core::storage::{EventStorage, MemoryStorage};
//!
//! let storage = MemoryStorage::new();
//! let raw_id = storage.store_raw(raw).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::types::{Alert, Anomaly, NormalizedEvent, RawLog};

/// 이벤트 조회 필터
///
/// 모든 필드는 선택적이며, 지정된 필드만 AND 조건으로 적용됩니다.
#[derive(Debug, Clone)]
pub struct EventQuery {
    /// 시작 시각 (포함)
    pub start: Option<DateTime<Utc>>,
    /// 종료 시각 (포함)
    pub end: Option<DateTime<Utc>>,
    /// 호스트명 (정확히 일치)
    pub host: Option<String>,
    /// 애플리케이션명 (정확히 일치)
    pub app: Option<String>,
    /// 심각도 (정확히 일치)
    pub severity: Option<String>,
    /// 메시지 부분 문자열
    pub text: Option<String>,
    /// 최대 반환 개수
    pub limit: usize,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            host: None,
            app: None,
            severity: None,
            text: None,
            limit: 100,
        }
    }
}

/// 이벤트 저장소 trait
///
/// 저장 실패는 복구 불가능하므로 [`StorageError`]로 전파됩니다.
#[async_trait]
pub trait EventStorage: Send + Sync {
    /// 원본 로그를 저장하고 부여된 ID를 반환합니다.
    async fn store_raw(&self, raw: RawLog) -> Result<i64, StorageError>;

    /// 원본 로그 배치를 저장하고 부여된 ID 목록을 반환합니다.
    async fn store_raw_batch(&self, raws: Vec<RawLog>) -> Result<Vec<i64>, StorageError>;

    /// 정규화 이벤트 배치를 저장하고 부여된 ID 목록을 반환합니다.
    async fn store_normalized_batch(
        &self,
        events: Vec<NormalizedEvent>,
    ) -> Result<Vec<i64>, StorageError>;

    /// 필터 조건에 맞는 이벤트를 최신순으로 조회합니다.
    async fn list_events(&self, query: &EventQuery) -> Result<Vec<NormalizedEvent>, StorageError>;

    /// 알림을 저장하고 ID가 부여된 알림을 반환합니다.
    async fn store_alert(&self, alert: Alert) -> Result<Alert, StorageError>;

    /// 최근 알림을 최신순으로 조회합니다.
    async fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>, StorageError>;

    /// 이상 징후를 저장하고 부여된 ID를 반환합니다.
    async fn store_anomaly(&self, anomaly: Anomaly) -> Result<i64, StorageError>;

    /// 최근 이상 징후를 최신순으로 조회합니다.
    async fn list_anomalies(&self, limit: usize) -> Result<Vec<Anomaly>, StorageError>;

    /// 정규화 이벤트들을 원본 로그에 연결합니다.
    async fn attach_normalized_to_raw(
        &self,
        raw_id: i64,
        normalized_ids: &[i64],
    ) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    raws: Vec<RawLog>,
    events: Vec<NormalizedEvent>,
    alerts: Vec<Alert>,
    anomalies: Vec<Anomaly>,
    next_raw_id: i64,
    next_event_id: i64,
    next_alert_id: i64,
    next_anomaly_id: i64,
}

/// 인메모리 저장소
///
/// 단조 증가 ID를 부여하며, 단일 프로세스 실행과 테스트에 사용됩니다.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStorage for MemoryStorage {
    async fn store_raw(&self, mut raw: RawLog) -> Result<i64, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.next_raw_id += 1;
        let id = inner.next_raw_id;
        raw.id = Some(id);
        inner.raws.push(raw);
        Ok(id)
    }

    async fn store_raw_batch(&self, raws: Vec<RawLog>) -> Result<Vec<i64>, StorageError> {
        let mut inner = self.inner.lock().await;
        let mut ids = Vec::with_capacity(raws.len());
        for mut raw in raws {
            inner.next_raw_id += 1;
            let id = inner.next_raw_id;
            raw.id = Some(id);
            inner.raws.push(raw);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn store_normalized_batch(
        &self,
        events: Vec<NormalizedEvent>,
    ) -> Result<Vec<i64>, StorageError> {
        let mut inner = self.inner.lock().await;
        let mut ids = Vec::with_capacity(events.len());
        for mut event in events {
            inner.next_event_id += 1;
            let id = inner.next_event_id;
            event.id = Some(id);
            inner.events.push(event);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn list_events(&self, query: &EventQuery) -> Result<Vec<NormalizedEvent>, StorageError> {
        let inner = self.inner.lock().await;
        let mut matched: Vec<NormalizedEvent> = inner
            .events
            .iter()
            .filter(|e| {
                if let Some(start) = query.start
                    && e.ts < start
                {
                    return false;
                }
                if let Some(end) = query.end
                    && e.ts > end
                {
                    return false;
                }
                if let Some(host) = &query.host
                    && e.host.as_deref() != Some(host.as_str())
                {
                    return false;
                }
                if let Some(app) = &query.app
                    && e.app.as_deref() != Some(app.as_str())
                {
                    return false;
                }
                if let Some(severity) = &query.severity
                    && e.severity.as_deref() != Some(severity.as_str())
                {
                    return false;
                }
                if let Some(text) = &query.text
                    && !e.message.contains(text.as_str())
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();
        // 최신순 (ID 내림차순)
        matched.sort_by(|a, b| b.id.cmp(&a.id));
        matched.truncate(query.limit);
        Ok(matched)
    }

    async fn store_alert(&self, mut alert: Alert) -> Result<Alert, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.next_alert_id += 1;
        alert.id = Some(inner.next_alert_id);
        inner.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>, StorageError> {
        let inner = self.inner.lock().await;
        let mut alerts = inner.alerts.clone();
        alerts.sort_by(|a, b| b.id.cmp(&a.id));
        alerts.truncate(limit);
        Ok(alerts)
    }

    async fn store_anomaly(&self, mut anomaly: Anomaly) -> Result<i64, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.next_anomaly_id += 1;
        let id = inner.next_anomaly_id;
        anomaly.id = Some(id);
        inner.anomalies.push(anomaly);
        Ok(id)
    }

    async fn list_anomalies(&self, limit: usize) -> Result<Vec<Anomaly>, StorageError> {
        let inner = self.inner.lock().await;
        let mut anomalies = inner.anomalies.clone();
        anomalies.sort_by(|a, b| b.id.cmp(&a.id));
        anomalies.truncate(limit);
        Ok(anomalies)
    }

    async fn attach_normalized_to_raw(
        &self,
        raw_id: i64,
        normalized_ids: &[i64],
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        if !inner.raws.iter().any(|r| r.id == Some(raw_id)) {
            return Err(StorageError::InvalidReference(format!(
                "raw log {} does not exist",
                raw_id
            )));
        }
        for event in inner.events.iter_mut() {
            if let Some(id) = event.id
                && normalized_ids.contains(&id)
            {
                event.raw_id = Some(raw_id);
            }
        }
        Ok(())
    }
}

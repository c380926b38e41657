//! 운영 통계 저장소 — 카운터/해시/윈도우 집합
//!
//! [`MetricsStore`]는 수집량, 형식별 분포, 일별 고유 소스 같은
//! 애플리케이션 수준 통계를 담는 백엔드 추상화입니다.
//! 본 경로를 막지 않도록 모든 실패는 [`MetricsError`]로 반환되며,
//! 호출부는 로그 후 흡수합니다.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::error::MetricsError;

/// 운영 통계 저장소 trait
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// 카운터를 증가시키고 증가 후 값을 반환합니다.
    async fn incr_counter(&self, name: &str, by: u64) -> Result<u64, MetricsError>;

    /// 해시 필드를 증가시킵니다 (형식별 이벤트 수 등).
    async fn hash_incr(&self, key: &str, field: &str, by: u64) -> Result<(), MetricsError>;

    /// 해시 전체를 조회합니다.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, u64>, MetricsError>;

    /// 윈도우 집합에 멤버를 추가합니다 (일별 고유 소스 등).
    async fn windowed_add(
        &self,
        key: &str,
        member: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MetricsError>;

    /// 윈도우 내 고유 멤버 수를 반환합니다.
    ///
    /// `now - window` 이전에 추가된 멤버는 집계 전에 제거됩니다.
    async fn windowed_count(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<usize, MetricsError>;

    /// 처리 지연 시간 관측값을 누적 요약에 반영합니다.
    async fn observe_latency(&self, name: &str, secs: f64) -> Result<(), MetricsError>;

    /// 누적 지연 시간 요약을 조회합니다. 관측값이 없으면 0 요약을 반환합니다.
    async fn latency_stats(&self, name: &str) -> Result<LatencyStats, MetricsError>;

    /// 마지막 배치 스냅샷을 기록합니다 (크기, 마지막 이벤트 시각).
    async fn record_batch(
        &self,
        key: &str,
        size: u64,
        last_event_ts: DateTime<Utc>,
    ) -> Result<(), MetricsError>;

    /// 마지막 배치 스냅샷을 조회합니다.
    async fn last_batch(&self, key: &str) -> Result<Option<BatchSnapshot>, MetricsError>;
}

/// 지연 시간 누적 요약
///
/// 관측값 전체를 보관하지 않고 count/sum/max만 유지하므로
/// 데몬 수명 동안 메모리가 증가하지 않습니다.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    /// 관측 횟수
    pub count: u64,
    /// 관측값 합계 (초)
    pub sum: f64,
    /// 최대 관측값 (초)
    pub max: f64,
}

impl LatencyStats {
    /// 이동 평균 (관측값이 없으면 0.0)
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn observe(&mut self, secs: f64) {
        self.count += 1;
        self.sum += secs;
        if secs > self.max {
            self.max = secs;
        }
    }
}

/// 마지막으로 저장된 배치의 스냅샷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSnapshot {
    /// 배치에 포함된 이벤트 수
    pub size: u64,
    /// 배치 내 가장 최근 이벤트의 타임스탬프
    pub last_event_ts: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StatsInner {
    counters: HashMap<String, u64>,
    hashes: HashMap<String, HashMap<String, u64>>,
    // member -> 마지막 추가 시각
    windowed: HashMap<String, HashMap<String, DateTime<Utc>>>,
    latencies: HashMap<String, LatencyStats>,
    batches: HashMap<String, BatchSnapshot>,
}

/// 인메모리 통계 저장소
#[derive(Debug, Clone, Default)]
pub struct MemoryMetricsStore {
    inner: Arc<Mutex<StatsInner>>,
}

impl MemoryMetricsStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsStore for MemoryMetricsStore {
    async fn incr_counter(&self, name: &str, by: u64) -> Result<u64, MetricsError> {
        let mut inner = self.inner.lock().await;
        let counter = inner.counters.entry(name.to_owned()).or_insert(0);
        *counter += by;
        Ok(*counter)
    }

    async fn hash_incr(&self, key: &str, field: &str, by: u64) -> Result<(), MetricsError> {
        let mut inner = self.inner.lock().await;
        *inner
            .hashes
            .entry(key.to_owned())
            .or_default()
            .entry(field.to_owned())
            .or_insert(0) += by;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, u64>, MetricsError> {
        let inner = self.inner.lock().await;
        Ok(inner.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn windowed_add(
        &self,
        key: &str,
        member: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MetricsError> {
        let mut inner = self.inner.lock().await;
        inner
            .windowed
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned(), now);
        Ok(())
    }

    async fn windowed_count(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<usize, MetricsError> {
        let mut inner = self.inner.lock().await;
        let Some(members) = inner.windowed.get_mut(key) else {
            return Ok(0);
        };
        let cutoff = now - window;
        members.retain(|_, added_at| *added_at >= cutoff);
        Ok(members.len())
    }

    async fn observe_latency(&self, name: &str, secs: f64) -> Result<(), MetricsError> {
        let mut inner = self.inner.lock().await;
        inner
            .latencies
            .entry(name.to_owned())
            .or_default()
            .observe(secs);
        Ok(())
    }

    async fn latency_stats(&self, name: &str) -> Result<LatencyStats, MetricsError> {
        let inner = self.inner.lock().await;
        Ok(inner.latencies.get(name).copied().unwrap_or_default())
    }

    async fn record_batch(
        &self,
        key: &str,
        size: u64,
        last_event_ts: DateTime<Utc>,
    ) -> Result<(), MetricsError> {
        let mut inner = self.inner.lock().await;
        inner.batches.insert(
            key.to_owned(),
            BatchSnapshot {
                size,
                last_event_ts,
            },
        );
        Ok(())
    }

    async fn last_batch(&self, key: &str) -> Result<Option<BatchSnapshot>, MetricsError> {
        let inner = self.inner.lock().await;
        Ok(inner.batches.get(key).copied())
    }
}

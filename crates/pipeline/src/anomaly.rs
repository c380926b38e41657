//! 통계적 이상 탐지기
//!
//! 시그널(`host|app|severity`)별로 분 단위 버킷 카운트를 유지하고,
//! 최신 버킷이 과거 평균에서 z-score 기준으로 얼마나 벗어났는지
//! 계산합니다. 버킷 타임스탬프는 시그널 내에서 순증가합니다.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, DurationRound, Utc};

/// 기본 z-score 임계값
pub const DEFAULT_THRESHOLD: f64 = 3.0;
/// 기본 윈도우 크기 (분)
pub const DEFAULT_WINDOW_MINUTES: u32 = 5;

/// 시그널 하나의 분 단위 버킷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowStat {
    /// 분 단위로 절삭된 버킷 타임스탬프
    pub bucket: DateTime<Utc>,
    /// 버킷 내 이벤트 수
    pub count: u64,
}

/// 탐지 결과
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyVerdict {
    /// 임계값 초과 여부
    pub is_anomalous: bool,
    /// 최신 버킷의 z-score (이력 부족/표준편차 0이면 0.0)
    pub score: f64,
}

/// 이상 탐지기
///
/// 시그널 수는 관측된 host/app/severity 조합 수만큼 늘어납니다.
/// 호출자는 update를 직렬화해야 합니다 (애널라이저 루프가 단독
/// 소유).
#[derive(Debug)]
pub struct AnomalyDetector {
    window: Duration,
    threshold: f64,
    signals: HashMap<String, VecDeque<WindowStat>>,
}

impl AnomalyDetector {
    /// 윈도우 크기(분)와 임계값으로 탐지기를 생성합니다.
    pub fn new(window_minutes: u32, threshold: f64) -> Self {
        Self {
            window: Duration::minutes(i64::from(window_minutes)),
            threshold,
            signals: HashMap::new(),
        }
    }

    /// 시그널 키를 만듭니다. 빈 세그먼트는 `*`로 대체됩니다.
    pub fn signal_key(host: Option<&str>, app: Option<&str>, severity: Option<&str>) -> String {
        fn seg(v: Option<&str>) -> &str {
            v.filter(|s| !s.is_empty()).unwrap_or("*")
        }
        format!("{}|{}|{}", seg(host), seg(app), seg(severity))
    }

    /// 윈도우 크기 (분)
    pub fn window_minutes(&self) -> u32 {
        u32::try_from(self.window.num_minutes()).unwrap_or(u32::MAX)
    }

    /// 현재 추적 중인 시그널 수
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// 이벤트 하나를 반영하고 이상 여부를 판정합니다.
    ///
    /// 타임스탬프를 분으로 절삭하여 해당 버킷을 증가시키거나 새
    /// 버킷을 추가하고, 윈도우보다 오래된 버킷을 제거합니다. 버킷이
    /// 3개 미만이거나 카운트 이력이 완전히 평탄하면 판정하지
    /// 않습니다.
    pub fn update(
        &mut self,
        host: Option<&str>,
        app: Option<&str>,
        severity: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> AnomalyVerdict {
        let key = Self::signal_key(host, app, severity);
        let minute = timestamp
            .duration_trunc(Duration::minutes(1))
            .unwrap_or(timestamp);

        let history = self.signals.entry(key).or_default();

        match history.back_mut() {
            Some(latest) if latest.bucket == minute => latest.count += 1,
            Some(latest) if latest.bucket > minute => {
                // 순증가 불변식 유지: 과거로 거슬러 온 타임스탬프는
                // 최신 버킷에 합산
                latest.count += 1;
            }
            _ => history.push_back(WindowStat {
                bucket: minute,
                count: 1,
            }),
        }

        let cutoff = minute - self.window;
        while history.front().is_some_and(|s| s.bucket < cutoff) {
            history.pop_front();
        }

        if history.len() < 3 {
            return AnomalyVerdict {
                is_anomalous: false,
                score: 0.0,
            };
        }

        let counts: Vec<f64> = history.iter().map(|s| s.count as f64).collect();
        let mean = counts.iter().sum::<f64>() / counts.len() as f64;
        let variance =
            counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / counts.len() as f64;
        let stddev = variance.sqrt();

        if stddev == 0.0 {
            return AnomalyVerdict {
                is_anomalous: false,
                score: 0.0,
            };
        }

        let latest = *counts.last().unwrap_or(&0.0);
        let score = (latest - mean) / stddev;
        AnomalyVerdict {
            is_anomalous: score >= self.threshold,
            score,
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MINUTES, DEFAULT_THRESHOLD)
    }
}

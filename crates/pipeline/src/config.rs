//! 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의
//! [`LogwardenConfig`](logwarden_core::config::LogwardenConfig)에서
//! 파이프라인 구성에 필요한 값을 추려 만든 뷰입니다.
//!
//! # 사용 예시
//! ```ignore
//! use logwarden_core::config::LogwardenConfig;
//! use logwarden_pipeline::config::PipelineConfig;
//!
//! let core_config = LogwardenConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 규칙 YAML 파일 경로
    pub rules_path: String,
    /// 애널라이저 폴링 간격 (초)
    pub poll_interval_secs: u64,
    /// 알림을 생성하는 최소 규칙 심각도
    pub alert_min_level: u8,
    /// 이상 탐지 윈도우 (분)
    pub anomaly_window_min: u32,
    /// 이상 탐지 z-score 임계값
    pub anomaly_threshold: f64,
    /// 알림 수신자 목록
    pub recipients: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rules_path: "/etc/logwarden/rules.yml".to_owned(),
            poll_interval_secs: 10,
            alert_min_level: 5,
            anomaly_window_min: 5,
            anomaly_threshold: 3.0,
            recipients: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &logwarden_core::config::LogwardenConfig) -> Self {
        Self {
            rules_path: core.analyzer.rules_path.clone(),
            poll_interval_secs: core.analyzer.poll_interval_secs,
            alert_min_level: core.analyzer.alert_min_level,
            anomaly_window_min: core.analyzer.anomaly_window_min,
            anomaly_threshold: core.analyzer.anomaly_threshold,
            recipients: core.notify.recipients.clone(),
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PipelineError> {
        const MAX_POLL_INTERVAL_SECS: u64 = 3600;
        const MAX_WINDOW_MINUTES: u32 = 1440; // 하루

        if self.rules_path.is_empty() {
            return Err(PipelineError::Config {
                field: "rules_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(PipelineError::Config {
                field: "poll_interval_secs".to_owned(),
                reason: format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            });
        }

        if self.alert_min_level > 10 {
            return Err(PipelineError::Config {
                field: "alert_min_level".to_owned(),
                reason: "must be 0-10".to_owned(),
            });
        }

        if self.anomaly_window_min == 0 || self.anomaly_window_min > MAX_WINDOW_MINUTES {
            return Err(PipelineError::Config {
                field: "anomaly_window_min".to_owned(),
                reason: format!("must be 1-{MAX_WINDOW_MINUTES}"),
            });
        }

        if !self.anomaly_threshold.is_finite() || self.anomaly_threshold <= 0.0 {
            return Err(PipelineError::Config {
                field: "anomaly_threshold".to_owned(),
                reason: "must be a positive finite number".to_owned(),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 규칙 파일 경로를 설정합니다.
    pub fn rules_path(mut self, path: impl Into<String>) -> Self {
        self.config.rules_path = path.into();
        self
    }

    /// 폴링 간격(초)을 설정합니다.
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs;
        self
    }

    /// 최소 알림 심각도를 설정합니다.
    pub fn alert_min_level(mut self, level: u8) -> Self {
        self.config.alert_min_level = level;
        self
    }

    /// 이상 탐지 윈도우(분)를 설정합니다.
    pub fn anomaly_window_min(mut self, minutes: u32) -> Self {
        self.config.anomaly_window_min = minutes;
        self
    }

    /// 이상 탐지 임계값을 설정합니다.
    pub fn anomaly_threshold(mut self, threshold: f64) -> Self {
        self.config.anomaly_threshold = threshold;
        self
    }

    /// 알림 수신자 목록을 설정합니다.
    pub fn recipients(mut self, recipients: Vec<String>) -> Self {
        self.config.recipients = recipients;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//! 설정 관리 — logwarden.toml 파싱 및 런타임 설정
//!
//! [`LogwardenConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGWARDEN_ANALYZER_RULES_PATH=/etc/rules.yml` 형식)
//! 3. 설정 파일 (`logwarden.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logwarden_core::error::LogwardenError> {
//! use logwarden_core::config::LogwardenConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogwardenConfig::load("logwarden.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogwardenConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogwardenError};

/// Logwarden 통합 설정
///
/// `logwarden.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogwardenConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집 설정
    #[serde(default)]
    pub ingest: IngestConfig,
    /// 분석 루프 설정
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// 알림 설정
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl LogwardenConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogwardenError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogwardenError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogwardenError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogwardenError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogwardenError> {
        toml::from_str(toml_str).map_err(|e| {
            LogwardenError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGWARDEN_{SECTION}_{FIELD}`
    /// 예: `LOGWARDEN_ANALYZER_ALERT_MIN_LEVEL=7`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGWARDEN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGWARDEN_GENERAL_LOG_FORMAT");

        // Ingest
        override_u32(&mut self.ingest.max_file_mb, "LOGWARDEN_INGEST_MAX_FILE_MB");
        override_usize(
            &mut self.ingest.queue_capacity,
            "LOGWARDEN_INGEST_QUEUE_CAPACITY",
        );

        // Analyzer
        override_string(
            &mut self.analyzer.rules_path,
            "LOGWARDEN_ANALYZER_RULES_PATH",
        );
        override_u64(
            &mut self.analyzer.poll_interval_secs,
            "LOGWARDEN_ANALYZER_POLL_INTERVAL_SECS",
        );
        override_u8(
            &mut self.analyzer.alert_min_level,
            "LOGWARDEN_ANALYZER_ALERT_MIN_LEVEL",
        );
        override_u32(
            &mut self.analyzer.anomaly_window_min,
            "LOGWARDEN_ANALYZER_ANOMALY_WINDOW_MIN",
        );
        override_f64(
            &mut self.analyzer.anomaly_threshold,
            "LOGWARDEN_ANALYZER_ANOMALY_THRESHOLD",
        );

        // Notify
        override_csv(&mut self.notify.recipients, "LOGWARDEN_NOTIFY_RECIPIENTS");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogwardenError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        const MAX_FILE_MB: u32 = 1024;
        if self.ingest.max_file_mb == 0 || self.ingest.max_file_mb > MAX_FILE_MB {
            return Err(ConfigError::InvalidValue {
                field: "ingest.max_file_mb".to_owned(),
                reason: format!("must be 1-{}", MAX_FILE_MB),
            }
            .into());
        }

        if self.ingest.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ingest.queue_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.analyzer.rules_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "analyzer.rules_path".to_owned(),
                reason: "rules path must not be empty".to_owned(),
            }
            .into());
        }

        if self.analyzer.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "analyzer.poll_interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        const MAX_ALERT_LEVEL: u8 = 10;
        if self.analyzer.alert_min_level > MAX_ALERT_LEVEL {
            return Err(ConfigError::InvalidValue {
                field: "analyzer.alert_min_level".to_owned(),
                reason: format!("must be 0-{}", MAX_ALERT_LEVEL),
            }
            .into());
        }

        const MAX_WINDOW_MIN: u32 = 1440; // 24 hours
        if self.analyzer.anomaly_window_min == 0
            || self.analyzer.anomaly_window_min > MAX_WINDOW_MIN
        {
            return Err(ConfigError::InvalidValue {
                field: "analyzer.anomaly_window_min".to_owned(),
                reason: format!("must be 1-{}", MAX_WINDOW_MIN),
            }
            .into());
        }

        if !self.analyzer.anomaly_threshold.is_finite() || self.analyzer.anomaly_threshold <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "analyzer.anomaly_threshold".to_owned(),
                reason: "must be a positive finite number".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 수집 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 업로드 파일 최대 크기 (MB)
    pub max_file_mb: u32,
    /// 수집 큐 용량
    pub queue_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_mb: 50,
            queue_capacity: 1024,
        }
    }
}

/// 분석 루프 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// 탐지 룰 파일 경로 (YAML)
    pub rules_path: String,
    /// 폴링 주기 (초)
    pub poll_interval_secs: u64,
    /// 알림 생성 최소 룰 레벨 (0-10)
    pub alert_min_level: u8,
    /// 이상 탐지 윈도우 (분)
    pub anomaly_window_min: u32,
    /// 이상 탐지 z-score 임계값
    pub anomaly_threshold: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rules_path: "/etc/logwarden/rules.yml".to_owned(),
            poll_interval_secs: 10,
            alert_min_level: 5,
            anomaly_window_min: 5,
            anomaly_threshold: 3.0,
        }
    }
}

/// 알림 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// 알림 수신자 목록
    pub recipients: Vec<String>,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u8(target: &mut u8, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u8>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u8 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

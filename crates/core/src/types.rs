//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 모든 모듈이 공유하는 데이터 구조를 정의합니다.
//! 수집된 원본 로그, 정규화 이벤트, 알림, 이상 징후가 여기에 속합니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 로그 형식
///
/// 형식 탐지기가 판별하는 입력 로그의 형식입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// RFC 3164 / RFC 5424 syslog
    Syslog,
    /// 한 줄에 JSON 객체 하나 (NDJSON)
    JsonLines,
    /// Graylog Extended Log Format
    Gelf,
    /// Wazuh 알림 JSON
    Wazuh,
    /// Suricata EVE NDJSON
    Suricata,
    /// 판별 불가
    #[default]
    Unknown,
}

impl LogFormat {
    /// 저장/메트릭 라벨에 사용하는 문자열 표현을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syslog => "syslog",
            Self::JsonLines => "json_lines",
            Self::Gelf => "gelf",
            Self::Wazuh => "wazuh",
            Self::Suricata => "suricata",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 원본 로그
///
/// 수신한 페이로드를 가공 없이 보존합니다. `hash`는 페이로드의
/// SHA-256 16진수 문자열로, 중복 수신 판별에 사용됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    /// 저장소가 부여하는 ID (저장 전에는 None)
    pub id: Option<i64>,
    /// 수신 소스 (업로드 채널, 파일명 등)
    pub source: String,
    /// 수신 시각
    pub received_at: DateTime<Utc>,
    /// 원본 페이로드
    pub payload: String,
    /// 탐지된 형식
    pub format: LogFormat,
    /// 페이로드 SHA-256 해시
    pub hash: String,
}

impl fmt::Display for RawLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} bytes)",
            self.format,
            self.source,
            self.payload.len(),
        )
    }
}

/// 정규화 이벤트
///
/// 파서가 형식별 레코드를 공통 스키마로 변환한 결과입니다.
/// 원본에 없던 필드는 None으로 남습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// 저장소가 부여하는 ID (저장 전에는 None)
    pub id: Option<i64>,
    /// 원본 로그 ID (배치 저장 후 연결)
    pub raw_id: Option<i64>,
    /// 이벤트 시각 (원본에 없으면 수신 시각)
    pub ts: DateTime<Utc>,
    /// 호스트명
    pub host: Option<String>,
    /// 애플리케이션/프로세스명
    pub app: Option<String>,
    /// 심각도 (형식별 표기를 그대로 보존: "err", "5" 등)
    pub severity: Option<String>,
    /// 로그 메시지
    pub message: String,
    /// 파싱된 전체 레코드
    pub metadata: serde_json::Value,
    /// 상관관계 키 (`src|dst|app`)
    pub correlation_key: String,
}

impl fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.severity.as_deref().unwrap_or("-"),
            self.host.as_deref().unwrap_or("-"),
            self.app.as_deref().unwrap_or("-"),
            self.message,
        )
    }
}

/// 보안 알림
///
/// 탐지 룰에 매칭되어 생성된 알림을 나타냅니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 저장소가 부여하는 ID (저장 전에는 None)
    pub id: Option<i64>,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 매칭된 룰 ID
    pub rule_id: Option<String>,
    /// 심각도 레벨 (0-10)
    pub level: u8,
    /// 알림 제목
    pub title: String,
    /// 상세 설명
    pub description: String,
    /// 룰 태그
    pub tags: Vec<String>,
    /// 근거 (이벤트 ID, 메시지 등)
    pub evidence: serde_json::Value,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[L{}] {} (rule: {})",
            self.level,
            self.title,
            self.rule_id.as_deref().unwrap_or("-"),
        )
    }
}

/// 이상 징후
///
/// 시그널별 분당 발생량의 z-score가 임계값을 넘었을 때 기록됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    /// 저장소가 부여하는 ID (저장 전에는 None)
    pub id: Option<i64>,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 시그널 키 (`host|app|severity`)
    pub signal: String,
    /// z-score
    pub score: f64,
    /// 관측 윈도우 (분)
    pub window_minutes: u32,
    /// 상세 정보 (이벤트 ID 등)
    pub details: serde_json::Value,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} z={:.2} window={}m",
            self.signal, self.score, self.window_minutes,
        )
    }
}

/// 수집 결과
///
/// 한 번의 수집 처리가 저장한 이벤트 수와 탐지된 형식을 담습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// 저장된 정규화 이벤트 수
    pub stored: usize,
    /// 탐지된 로그 형식
    pub format: LogFormat,
}

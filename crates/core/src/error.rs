//! 에러 타입 — 도메인별 에러 정의
//!
//! 에러는 처리 정책에 따라 구분됩니다. 스토리지 에러는 호출자로
//! 전파하고, 메트릭/알림 전송 에러는 호출부에서 로그 후 흡수하며,
//! 설정과 룰 파일 로딩 실패는 기동 단계에서 치명적입니다.

/// Logwarden 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogwardenError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 큐 에러
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// 메트릭 저장소 에러
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// 알림 전송 에러
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 룰 로딩 실패
    #[error("rule load failed: {0}")]
    RuleLoad(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 지원하지 않는 형식
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 파싱 실패
    #[error("parse failed: {reason}")]
    Failed { reason: String },

    /// 입력 데이터 초과
    #[error("input too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

/// 스토리지 에러
///
/// 수집/분석 경로에서 복구 불가능하므로 항상 호출자로 전파됩니다.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 백엔드 사용 불가
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// 쿼리 실패
    #[error("query failed: {0}")]
    Query(String),

    /// 참조 무결성 위반 (존재하지 않는 raw ID 등)
    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

/// 큐 에러
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// 큐가 가득 참
    #[error("queue full: capacity {capacity}")]
    Full { capacity: usize },

    /// 큐가 닫힘
    #[error("queue closed")]
    Closed,
}

/// 메트릭 저장소 에러
///
/// 수집/분석 본 경로를 막지 않도록 호출부에서 로그 후 흡수합니다.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// 백엔드 사용 불가
    #[error("metrics backend unavailable: {0}")]
    Unavailable(String),
}

/// 알림 전송 에러
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// 수신자에게 전송 실패
    #[error("delivery failed to '{recipient}': {reason}")]
    Delivery { recipient: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: LogwardenError = ConfigError::InvalidValue {
            field: "general.log_level".to_owned(),
            reason: "must be one of: trace, debug, info, warn, error".to_owned(),
        }
        .into();
        assert!(matches!(err, LogwardenError::Config(_)));
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::Unavailable("connection refused".to_owned());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn queue_full_display() {
        let err = QueueError::Full { capacity: 1024 };
        assert!(err.to_string().contains("1024"));
    }

    #[test]
    fn notify_error_display() {
        let err = NotifyError::Delivery {
            recipient: "ops".to_owned(),
            reason: "timeout".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ops"));
        assert!(msg.contains("timeout"));
    }
}

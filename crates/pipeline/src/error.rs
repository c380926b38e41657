//! 파이프라인 에러 타입
//!
//! [`PipelineError`]는 수집/분석 파이프라인 내부에서 발생하는 모든 에러를
//! 표현합니다. `From<PipelineError> for LogwardenError` 변환이 구현되어
//! 있어 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logwarden_core::error::{LogwardenError, StorageError};

/// 수집/분석 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 로그 파싱 실패
    #[error("parse error: {format}: {reason}")]
    Parse {
        /// 파서 형식 (syslog, gelf 등)
        format: String,
        /// 실패 사유
        reason: String,
    },

    /// 룰 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 룰 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 룰 유효성 검증 실패
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// 문제가 된 룰 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 스토리지 에러 (호출자로 전파)
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 백그라운드 작업 실패 (spawn_blocking join 등)
    #[error("task error: {0}")]
    Task(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PipelineError> for LogwardenError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Storage(e) => LogwardenError::Storage(e),
            PipelineError::RuleLoad { .. } => LogwardenError::Pipeline(
                logwarden_core::error::PipelineError::RuleLoad(err.to_string()),
            ),
            other => LogwardenError::Pipeline(logwarden_core::error::PipelineError::InitFailed(
                other.to_string(),
            )),
        }
    }
}

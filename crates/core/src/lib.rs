//! Logwarden 공통 크레이트
//!
//! 도메인 타입, 에러 계층, 설정, 저장소/큐/알림/통계 추상화를 제공합니다.
//! 파이프라인과 데몬은 이 크레이트의 trait에만 의존하며,
//! 실제 백엔드는 실행 시점에 주입됩니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod queue;
pub mod stats;
pub mod storage;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{
    ConfigError, LogwardenError, MetricsError, NotifyError, ParseError, PipelineError, QueueError,
    StorageError,
};

// 설정
pub use config::LogwardenConfig;

// 저장소
pub use storage::{EventQuery, EventStorage, MemoryStorage};

// 통계
pub use stats::{BatchSnapshot, LatencyStats, MemoryMetricsStore, MetricsStore};

// 큐
pub use queue::{IngestJob, IngestQueue, MemoryQueue};

// 알림 채널
pub use notify::{NotificationChannel, TracingChannel};

// 도메인 타입
pub use types::{Alert, Anomaly, IngestOutcome, LogFormat, NormalizedEvent, RawLog};

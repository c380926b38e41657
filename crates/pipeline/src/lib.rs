//! logwarden 로그 분석 파이프라인
//!
//! 이 크레이트는 수집된 로그를 정규화하고 분석하는 핵심 파이프라인을
//! 제공합니다:
//!
//! - [`detect`]: 로그 형식 자동 판별
//! - [`parser`]: 형식별 파서 (syslog, JSON-lines, GELF, Wazuh, Suricata)
//! - [`correlate`]: 상관 키 빌더
//! - [`rule`]: YAML 시그니처 규칙 엔진
//! - [`anomaly`]: 분 단위 버킷 기반 z-score 이상 탐지
//! - [`ingest`]: 수집 프로세서 (탐지 → 파싱 → 정규화 → 저장 → 통계)
//! - [`analyzer`]: 규칙 매칭/이상 탐지를 구동하는 폴링 루프
//! - [`notifier`]: 영속화 우선 알림 디스패처
//! - [`validation`]: 업로드 첨부 파일 안전성 검증
//!
//! # 구성 흐름
//! ```text
//! upload ─▶ validation ─▶ ingest ─▶ storage ─▶ analyzer ─▶ notifier
//!                          │                      │
//!                          └─ stats               └─ anomaly
//! ```

pub mod analyzer;
pub mod anomaly;
pub mod config;
pub mod correlate;
pub mod detect;
pub mod error;
pub mod ingest;
pub mod notifier;
pub mod parser;
pub mod rule;
pub mod summary;
pub mod validation;

pub use analyzer::AnalyzerLoop;
pub use anomaly::{AnomalyDetector, AnomalyVerdict};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use correlate::correlation_key;
pub use detect::detect_format;
pub use error::PipelineError;
pub use ingest::IngestProcessor;
pub use notifier::Notifier;
pub use parser::{FormatParser, ParsedRecord, ParserRegistry};
pub use rule::{Rule, RuleEngine, RuleInput, RuleMatch};
pub use summary::{EventSummary, summarize};
pub use validation::{ValidationVerdict, validate_attachment, validate_attachment_sync};

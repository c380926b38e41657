//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logwarden_`
//! - 모듈명: `ingest_`, `analyzer_`, `notify_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logwarden_core::metrics::INGEST_EVENTS_STORED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 로그 형식 레이블 키 (syslog, json_lines, gelf, wazuh, suricata, unknown)
pub const LABEL_FORMAT: &str = "format";

/// 룰 ID 레이블 키
pub const LABEL_RULE_ID: &str = "rule_id";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 거부 사유 레이블 키 (extension, mime, path_traversal 등)
pub const LABEL_REASON: &str = "reason";

// ─── Ingest 메트릭 ──────────────────────────────────────────────────

/// Ingest: 수신한 전체 페이로드 수 (counter)
pub const INGEST_PAYLOADS_TOTAL: &str = "logwarden_ingest_payloads_total";

/// Ingest: 검증 단계에서 거절된 업로드 수 (counter)
pub const INGEST_REJECTED_TOTAL: &str = "logwarden_ingest_rejected_total";

/// Ingest: 저장된 정규화 이벤트 수 (counter, label: format)
pub const INGEST_EVENTS_STORED_TOTAL: &str = "logwarden_ingest_events_stored_total";

/// Ingest: 처리 지연 시간 (histogram, 초)
pub const INGEST_PROCESSING_DURATION_SECONDS: &str =
    "logwarden_ingest_processing_duration_seconds";

/// Ingest: 이벤트 지연 시간 이동 평균 (gauge, 초)
pub const INGEST_LATENCY_AVG_SECONDS: &str = "logwarden_ingest_latency_avg_seconds";

/// Ingest: 이벤트 지연 시간 최대값 (gauge, 초)
pub const INGEST_LATENCY_MAX_SECONDS: &str = "logwarden_ingest_latency_max_seconds";

// ─── Analyzer 메트릭 ────────────────────────────────────────────────

/// Analyzer: 평가된 이벤트 수 (counter)
pub const ANALYZER_EVENTS_EVALUATED_TOTAL: &str = "logwarden_analyzer_events_evaluated_total";

/// Analyzer: 룰 매칭 수 (counter)
pub const ANALYZER_RULE_MATCHES_TOTAL: &str = "logwarden_analyzer_rule_matches_total";

/// Analyzer: 생성된 알림 수 (counter)
pub const ANALYZER_ALERTS_TOTAL: &str = "logwarden_analyzer_alerts_total";

/// Analyzer: 기록된 이상 징후 수 (counter)
pub const ANALYZER_ANOMALIES_TOTAL: &str = "logwarden_analyzer_anomalies_total";

/// Analyzer: 로드된 룰 수 (gauge)
pub const ANALYZER_RULES_LOADED: &str = "logwarden_analyzer_rules_loaded";

// ─── Notify 메트릭 ──────────────────────────────────────────────────

/// Notify: 전송 시도 수 (counter, label: result)
pub const NOTIFY_DELIVERIES_TOTAL: &str = "logwarden_notify_deliveries_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// `metrics::describe_counter!()`, `describe_gauge!()`, `describe_histogram!()`을
/// 호출하여 Prometheus HELP 텍스트를 설정합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `logwarden-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Ingest
    describe_counter!(
        INGEST_PAYLOADS_TOTAL,
        "Total number of payloads received for ingestion"
    );
    describe_counter!(
        INGEST_REJECTED_TOTAL,
        "Total number of uploads rejected by attachment validation"
    );
    describe_counter!(
        INGEST_EVENTS_STORED_TOTAL,
        "Total number of normalized events stored, per detected format"
    );
    describe_histogram!(
        INGEST_PROCESSING_DURATION_SECONDS,
        "Time to process a single ingest payload in seconds"
    );
    describe_gauge!(
        INGEST_LATENCY_AVG_SECONDS,
        "Rolling average event ingest latency in seconds"
    );
    describe_gauge!(
        INGEST_LATENCY_MAX_SECONDS,
        "Maximum observed event ingest latency in seconds"
    );

    // Analyzer
    describe_counter!(
        ANALYZER_EVENTS_EVALUATED_TOTAL,
        "Total number of events evaluated by the analyzer loop"
    );
    describe_counter!(
        ANALYZER_RULE_MATCHES_TOTAL,
        "Total number of detection rule matches"
    );
    describe_counter!(
        ANALYZER_ALERTS_TOTAL,
        "Total number of alerts persisted and dispatched"
    );
    describe_counter!(
        ANALYZER_ANOMALIES_TOTAL,
        "Total number of rate anomalies recorded"
    );
    describe_gauge!(
        ANALYZER_RULES_LOADED,
        "Number of detection rules currently loaded"
    );

    // Notify
    describe_counter!(
        NOTIFY_DELIVERIES_TOTAL,
        "Total number of alert delivery attempts, per result"
    );
}

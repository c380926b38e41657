//! 로그 파싱 모듈 — syslog, JSON-lines, GELF, Wazuh, Suricata EVE 파서
//!
//! [`ParserRegistry`]는 탐지된 [`LogFormat`]에 맞는 파서로 입력을
//! 전달합니다. 각 파서는 [`FormatParser`] trait을 구현하며,
//! 파싱 불가능한 줄은 건너뛰고 배치 전체를 실패시키지 않습니다.
//!
//! # 사용 예시
//! ```ignore
//! use logwarden_pipeline::parser::ParserRegistry;
//! use logwarden_core::types::LogFormat;
//!
//! let registry = ParserRegistry::with_defaults();
//! let records = registry.parse(LogFormat::Syslog, "<13>Jan  1 00:00:00 host app: msg");
//! ```

pub mod gelf;
pub mod json_lines;
pub mod suricata;
pub mod syslog;
pub mod wazuh;

pub use gelf::GelfParser;
pub use json_lines::JsonLinesParser;
pub use suricata::SuricataParser;
pub use syslog::SyslogParser;
pub use wazuh::WazuhParser;

use chrono::{DateTime, NaiveDateTime, Utc};
use logwarden_core::types::LogFormat;

/// syslog severity 이름 테이블 (RFC 5424 Section 6.2.1, `pri % 8` 인덱스)
pub(crate) const SEVERITY_NAMES: [&str; 8] = [
    "emerg", "alert", "crit", "err", "warning", "notice", "info", "debug",
];

/// 파싱된 단일 레코드
///
/// 형식별 파서의 공통 출력입니다. 원본에 없던 필드는 None으로 남고,
/// 타임스탬프가 없으면 호출자가 수신 시각으로 대체합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    /// 이벤트 시각 (UTC)
    pub timestamp: Option<DateTime<Utc>>,
    /// 호스트명
    pub host: Option<String>,
    /// 애플리케이션/프로세스명
    pub app: Option<String>,
    /// 심각도 (형식별 표기 그대로)
    pub severity: Option<String>,
    /// 로그 메시지
    pub message: Option<String>,
    /// 파싱된 전체 레코드
    pub metadata: serde_json::Value,
}

impl Default for ParsedRecord {
    fn default() -> Self {
        Self {
            timestamp: None,
            host: None,
            app: None,
            severity: None,
            message: None,
            metadata: serde_json::Value::Null,
        }
    }
}

/// 형식별 파서 trait
///
/// 파싱은 최선 노력(best-effort) 방식입니다. 실패한 줄은 결과에서
/// 빠지며, 반환 길이는 입력 줄 수보다 작을 수 있습니다.
pub trait FormatParser: Send + Sync {
    /// 이 파서가 처리하는 형식
    fn format(&self) -> LogFormat;

    /// 원시 텍스트를 레코드 목록으로 변환합니다.
    fn parse(&self, content: &str) -> Vec<ParsedRecord>;
}

/// 파서 레지스트리 — 형식별 파서 디스패치
pub struct ParserRegistry {
    parsers: Vec<Box<dyn FormatParser>>,
}

impl ParserRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// 전체 파서 세트로 레지스트리를 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(Box::new(SyslogParser::new()))
            .register(Box::new(JsonLinesParser::new()))
            .register(Box::new(GelfParser::new()))
            .register(Box::new(WazuhParser::new()))
            .register(Box::new(SuricataParser::new()))
    }

    /// 파서를 등록합니다.
    pub fn register(mut self, parser: Box<dyn FormatParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    /// 지정한 형식의 파서로 입력을 파싱합니다.
    ///
    /// 등록되지 않은 형식(unknown 포함)은 빈 목록을 반환합니다.
    pub fn parse(&self, format: LogFormat, content: &str) -> Vec<ParsedRecord> {
        match self.parsers.iter().find(|p| p.format() == format) {
            Some(parser) => parser.parse(content),
            None => Vec::new(),
        }
    }

    /// 등록된 형식 목록을 반환합니다.
    pub fn registered_formats(&self) -> Vec<LogFormat> {
        self.parsers.iter().map(|p| p.format()).collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// --- 공용 변환 헬퍼 ---

/// JSON 값을 타임스탬프로 변환합니다.
///
/// 숫자는 epoch 초/밀리초로, 문자열은 [`parse_datetime_str`]로 처리합니다.
pub(crate) fn value_to_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // 13자리 이상이면 밀리초로 간주
                let secs = if i > 9_999_999_999 { i / 1000 } else { i };
                DateTime::from_timestamp(secs, 0)
            } else {
                n.as_f64()
                    .and_then(|f| DateTime::from_timestamp(f.trunc() as i64, 0))
            }
        }
        serde_json::Value::String(s) => parse_datetime_str(s),
        _ => None,
    }
}

/// 날짜 문자열을 UTC로 파싱합니다.
///
/// RFC 3339를 먼저 시도하고, 타임존 없는 표기는 UTC로 간주합니다.
/// epoch 숫자 문자열도 허용합니다. 실패하면 None을 반환합니다.
pub(crate) fn parse_datetime_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }

    if let Ok(epoch) = s.parse::<i64>() {
        let secs = if epoch > 9_999_999_999 {
            epoch / 1000
        } else {
            epoch
        };
        return DateTime::from_timestamp(secs, 0);
    }

    None
}

/// JSON 값을 표시용 문자열로 변환합니다.
///
/// 객체/배열/null은 None을 반환합니다.
pub(crate) fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn with_defaults_registers_all_formats() {
        let registry = ParserRegistry::with_defaults();
        let formats = registry.registered_formats();
        assert_eq!(formats.len(), 5);
        assert!(formats.contains(&LogFormat::Syslog));
        assert!(formats.contains(&LogFormat::JsonLines));
        assert!(formats.contains(&LogFormat::Gelf));
        assert!(formats.contains(&LogFormat::Wazuh));
        assert!(formats.contains(&LogFormat::Suricata));
    }

    #[test]
    fn unknown_format_yields_no_records() {
        let registry = ParserRegistry::with_defaults();
        let records = registry.parse(LogFormat::Unknown, "anything");
        assert!(records.is_empty());
    }

    #[test]
    fn severity_names_table() {
        assert_eq!(SEVERITY_NAMES[0], "emerg");
        assert_eq!(SEVERITY_NAMES[3], "err");
        assert_eq!(SEVERITY_NAMES[7], "debug");
    }

    #[test]
    fn value_to_timestamp_epoch_seconds() {
        let ts = value_to_timestamp(&serde_json::json!(1_705_320_000)).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn value_to_timestamp_epoch_millis() {
        let ts = value_to_timestamp(&serde_json::json!(1_705_320_000_000i64)).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn value_to_timestamp_fractional_epoch() {
        let ts = value_to_timestamp(&serde_json::json!(1_705_320_000.75)).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn parse_datetime_str_rfc3339_with_offset() {
        let ts = parse_datetime_str("2024-01-15T21:00:00+09:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn parse_datetime_str_naive_assumed_utc() {
        let ts = parse_datetime_str("2024-01-15 12:00:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn parse_datetime_str_invalid_is_none() {
        assert_eq!(parse_datetime_str("not-a-date"), None);
        assert_eq!(parse_datetime_str(""), None);
    }

    #[test]
    fn value_to_string_coerces_scalars() {
        assert_eq!(
            value_to_string(&serde_json::json!("text")),
            Some("text".to_owned())
        );
        assert_eq!(value_to_string(&serde_json::json!(5)), Some("5".to_owned()));
        assert_eq!(
            value_to_string(&serde_json::json!(true)),
            Some("true".to_owned())
        );
        assert_eq!(value_to_string(&serde_json::json!({"a": 1})), None);
        assert_eq!(value_to_string(&serde_json::Value::Null), None);
    }
}

//! GELF 파서
//!
//! 단일 객체, 객체 배열, `_id`가 포함된 자기 서술 객체를 모두
//! 허용합니다. `level` 정수는 syslog severity 이름 테이블로
//! 변환됩니다.

use logwarden_core::types::LogFormat;

use super::{FormatParser, ParsedRecord, SEVERITY_NAMES, value_to_string, value_to_timestamp};

/// GELF 파서
pub struct GelfParser;

impl GelfParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// GELF level 정수를 severity 이름으로 변환합니다.
    fn level_to_severity(level: i64) -> Option<&'static str> {
        usize::try_from(level)
            .ok()
            .and_then(|i| SEVERITY_NAMES.get(i))
            .copied()
    }

    fn convert(value: serde_json::Value) -> Option<ParsedRecord> {
        let obj = value.as_object()?;

        let timestamp = obj.get("timestamp").and_then(value_to_timestamp);
        let host = obj
            .get("host")
            .or_else(|| obj.get("_host"))
            .and_then(value_to_string);
        let app = obj
            .get("facility")
            .or_else(|| obj.get("_app"))
            .and_then(value_to_string);
        let severity = obj
            .get("level")
            .and_then(serde_json::Value::as_i64)
            .and_then(Self::level_to_severity)
            .map(str::to_owned);
        let message = obj
            .get("short_message")
            .or_else(|| obj.get("message"))
            .and_then(value_to_string);

        Some(ParsedRecord {
            timestamp,
            host,
            app,
            severity,
            message,
            metadata: value,
        })
    }
}

impl Default for GelfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatParser for GelfParser {
    fn format(&self) -> LogFormat {
        LogFormat::Gelf
    }

    fn parse(&self, content: &str) -> Vec<ParsedRecord> {
        // 전체를 하나의 JSON 문서로 먼저 시도 (객체 또는 배열)
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(content.trim()) {
            return match value {
                serde_json::Value::Array(items) => {
                    items.into_iter().filter_map(Self::convert).collect()
                }
                obj @ serde_json::Value::Object(_) => {
                    Self::convert(obj).into_iter().collect()
                }
                _ => Vec::new(),
            };
        }

        // NDJSON 폴백: 줄 단위 파싱
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok().and_then(Self::convert))
            .collect()
    }
}

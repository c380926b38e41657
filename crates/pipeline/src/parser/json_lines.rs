//! JSON-lines 파서
//!
//! 한 줄에 JSON 객체 하나(NDJSON)인 입력을 파싱합니다.
//! 잘 알려진 키(timestamp/ts, host, app, severity, message/msg)를
//! 읽고 전체 객체를 메타데이터로 보존합니다.

use logwarden_core::types::LogFormat;

use super::{FormatParser, ParsedRecord, value_to_string, value_to_timestamp};

/// JSON-lines 파서
pub struct JsonLinesParser;

impl JsonLinesParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    fn parse_line(line: &str) -> Option<ParsedRecord> {
        let value: serde_json::Value = serde_json::from_str(line).ok()?;
        let obj = value.as_object()?;

        let timestamp = obj
            .get("timestamp")
            .or_else(|| obj.get("ts"))
            .and_then(value_to_timestamp);
        let host = obj.get("host").and_then(value_to_string);
        let app = obj.get("app").and_then(value_to_string);
        let severity = obj.get("severity").and_then(value_to_string);
        let message = obj
            .get("message")
            .or_else(|| obj.get("msg"))
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

impl Default for JsonLinesParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatParser for JsonLinesParser {
    fn format(&self) -> LogFormat {
        LogFormat::JsonLines
    }

    fn parse(&self, content: &str) -> Vec<ParsedRecord> {
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(Self::parse_line)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parse_basic_object() {
        let parser = JsonLinesParser::new();
        let records =
            parser.parse(r#"{"host":"web","app":"nginx","severity":"err","message":"boom"}"#);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.host.as_deref(), Some("web"));
        assert_eq!(r.app.as_deref(), Some("nginx"));
        assert_eq!(r.severity.as_deref(), Some("err"));
        assert_eq!(r.message.as_deref(), Some("boom"));
    }

    #[test]
    fn msg_key_is_a_fallback_for_message() {
        let parser = JsonLinesParser::new();
        let records = parser.parse(r#"{"msg":"fallback works"}"#);
        assert_eq!(records[0].message.as_deref(), Some("fallback works"));
    }

    #[test]
    fn timestamp_from_epoch_number() {
        let parser = JsonLinesParser::new();
        let records = parser.parse(r#"{"ts":1704067200,"message":"midnight"}"#);
        assert_eq!(
            records[0].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn timestamp_from_date_string() {
        let parser = JsonLinesParser::new();
        let records = parser.parse(r#"{"timestamp":"2024-01-01T00:00:00Z","message":"m"}"#);
        assert_eq!(
            records[0].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn unparseable_timestamp_is_absent() {
        let parser = JsonLinesParser::new();
        let records = parser.parse(r#"{"timestamp":"garbage","message":"m"}"#);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, None);
    }

    #[test]
    fn bad_lines_are_skipped() {
        let parser = JsonLinesParser::new();
        let content = "{\"message\":\"one\"}\nnot json\n[1,2,3]\n{\"message\":\"two\"}";
        let records = parser.parse(content);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message.as_deref(), Some("one"));
        assert_eq!(records[1].message.as_deref(), Some("two"));
    }

    #[test]
    fn full_object_is_retained_as_metadata() {
        let parser = JsonLinesParser::new();
        let records = parser.parse(r#"{"message":"m","request_id":"abc-123"}"#);
        assert_eq!(records[0].metadata["request_id"], "abc-123");
    }

    #[test]
    fn numeric_severity_is_stringified() {
        let parser = JsonLinesParser::new();
        let records = parser.parse(r#"{"severity":5,"message":"m"}"#);
        assert_eq!(records[0].severity.as_deref(), Some("5"));
    }
}

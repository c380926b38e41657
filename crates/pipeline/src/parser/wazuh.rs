//! Wazuh alert JSON 파서
//!
//! 단일 객체 또는 객체 배열을 허용합니다. 중첩된 `rule.id`,
//! `rule.level`, `agent.name`을 추출하고 전체 객체를 보존합니다.

use logwarden_core::types::LogFormat;
use serde_json::json;

use super::{FormatParser, ParsedRecord, parse_datetime_str, value_to_string};

/// Wazuh alert 파서
pub struct WazuhParser;

impl WazuhParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    fn convert(entry: serde_json::Value) -> Option<ParsedRecord> {
        let obj = entry.as_object()?;

        let rule = obj.get("rule").and_then(|v| v.as_object());
        let rule_id = rule
            .and_then(|r| r.get("id"))
            .and_then(value_to_string);
        let level = rule.and_then(|r| r.get("level")).and_then(|v| v.as_i64());
        let agent = obj
            .get("agent")
            .and_then(|v| v.as_object())
            .and_then(|a| a.get("name"))
            .and_then(value_to_string);
        let timestamp = obj
            .get("timestamp")
            .and_then(|v| v.as_str())
            .and_then(parse_datetime_str);
        let srcip = obj.get("srcip").and_then(value_to_string);
        let dstip = obj.get("dstip").and_then(value_to_string);

        let metadata = json!({
            "rule_id": rule_id,
            "level": level,
            "agent": agent,
            "srcip": srcip,
            "dstip": dstip,
            "full": entry,
        });

        Some(ParsedRecord {
            timestamp,
            host: agent,
            app: Some("wazuh".to_owned()),
            severity: level.map(|l| l.to_string()),
            message: None,
            metadata,
        })
    }
}

impl Default for WazuhParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatParser for WazuhParser {
    fn format(&self) -> LogFormat {
        LogFormat::Wazuh
    }

    fn parse(&self, content: &str) -> Vec<ParsedRecord> {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(content.trim()) {
            return match value {
                serde_json::Value::Array(items) => {
                    items.into_iter().filter_map(Self::convert).collect()
                }
                obj @ serde_json::Value::Object(_) => Self::convert(obj).into_iter().collect(),
                _ => Vec::new(),
            };
        }

        // NDJSON 폴백
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok().and_then(Self::convert))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "timestamp": "2024-03-10T08:15:00Z",
        "rule": {"id": 5710, "level": 5, "description": "sshd: attempt to login using a non-existent user"},
        "agent": {"name": "agent-01"},
        "srcip": "203.0.113.9",
        "dstip": "10.0.0.5",
        "full_log": "Mar 10 08:15:00 host sshd[2412]: Invalid user admin"
    }"#;

    #[test]
    fn extracts_nested_rule_and_agent() {
        let parser = WazuhParser::new();
        let records = parser.parse(SAMPLE);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.host.as_deref(), Some("agent-01"));
        assert_eq!(r.app.as_deref(), Some("wazuh"));
        assert_eq!(r.severity.as_deref(), Some("5"));
        assert_eq!(r.metadata["rule_id"], "5710");
        assert_eq!(r.metadata["level"], 5);
        assert!(r.timestamp.is_some());
    }

    #[test]
    fn rule_id_is_stringified() {
        let parser = WazuhParser::new();
        let records = parser.parse(r#"{"rule":{"id":1002,"level":2}}"#);
        assert_eq!(records[0].metadata["rule_id"], "1002");
    }

    #[test]
    fn src_and_dst_ips_are_preserved() {
        let parser = WazuhParser::new();
        let records = parser.parse(SAMPLE);
        assert_eq!(records[0].metadata["srcip"], "203.0.113.9");
        assert_eq!(records[0].metadata["dstip"], "10.0.0.5");
    }

    #[test]
    fn full_object_is_retained() {
        let parser = WazuhParser::new();
        let records = parser.parse(SAMPLE);
        assert!(
            records[0].metadata["full"]["full_log"]
                .as_str()
                .unwrap()
                .contains("Invalid user")
        );
    }

    #[test]
    fn missing_rule_yields_record_without_severity() {
        let parser = WazuhParser::new();
        let records = parser.parse(r#"{"agent":{"name":"a"}}"#);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, None);
        assert_eq!(records[0].metadata["rule_id"], serde_json::Value::Null);
    }

    #[test]
    fn array_payload_converts_each_object() {
        let parser = WazuhParser::new();
        let records = parser.parse(r#"[{"rule":{"id":1,"level":3}},{"rule":{"id":2,"level":8}},5]"#);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].severity.as_deref(), Some("8"));
    }

    #[test]
    fn invalid_payload_yields_nothing() {
        let parser = WazuhParser::new();
        assert!(parser.parse("not json").is_empty());
    }
}

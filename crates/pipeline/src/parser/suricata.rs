//! Suricata EVE NDJSON 파서
//!
//! 줄 단위 JSON 이벤트에서 사람이 읽을 메시지를 합성합니다.
//! alert.signature + [category] → http 메서드/URL → event_type →
//! message 순으로 폴백합니다.

use logwarden_core::types::LogFormat;
use serde_json::json;

use super::{FormatParser, ParsedRecord, value_to_string, value_to_timestamp};

/// Suricata EVE 파서
pub struct SuricataParser;

impl SuricataParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// 이벤트에서 표시용 메시지를 합성합니다.
    fn build_message(event: &serde_json::Value) -> String {
        let alert = &event["alert"];
        if let Some(signature) = alert["signature"].as_str() {
            return match alert["category"].as_str() {
                Some(category) => format!("{} [{}]", signature, category),
                None => signature.to_owned(),
            };
        }

        if let Some(http) = event.get("http") {
            let method = http.get("http_method").and_then(value_to_string);
            let uri = http
                .get("url")
                .or_else(|| http.get("hostname"))
                .and_then(value_to_string);
            if method.is_some() || uri.is_some() {
                return [method, uri]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        }

        if let Some(event_type) = event.get("event_type").and_then(value_to_string) {
            return event_type;
        }

        event
            .get("message")
            .and_then(value_to_string)
            .unwrap_or_default()
    }

    fn parse_line(line: &str) -> Option<ParsedRecord> {
        let payload: serde_json::Value = serde_json::from_str(line).ok()?;
        payload.as_object()?;

        let timestamp = payload
            .get("timestamp")
            .or_else(|| payload.get("event_timestamp"))
            .and_then(value_to_timestamp);
        let host = payload
            .get("host")
            .or_else(|| payload.get("src_ip"))
            .or_else(|| payload.get("dest_ip"))
            .and_then(value_to_string);
        let event_type = payload.get("event_type").and_then(value_to_string);
        let app = match &event_type {
            Some(et) => format!("suricata:{}", et),
            None => "suricata".to_owned(),
        };

        let alert = &payload["alert"];
        let severity = alert
            .get("severity")
            .or_else(|| alert.get("priority"))
            .and_then(value_to_string);

        let message = Self::build_message(&payload);
        let src_ip = payload.get("src_ip").and_then(value_to_string);
        let dest_ip = payload.get("dest_ip").and_then(value_to_string);

        let metadata = json!({
            "event_type": event_type,
            "src_ip": src_ip,
            "dest_ip": dest_ip,
            "raw": payload,
        });

        Some(ParsedRecord {
            timestamp,
            host,
            app: Some(app),
            severity,
            message: Some(message),
            metadata,
        })
    }
}

impl Default for SuricataParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatParser for SuricataParser {
    fn format(&self) -> LogFormat {
        LogFormat::Suricata
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

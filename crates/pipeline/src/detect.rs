//! 형식 탐지기 — 입력 샘플의 로그 형식 판별
//!
//! [`detect_format`]은 상태 없는 순수 함수로, 첫 번째 비어 있지 않은
//! 줄만 검사합니다. 혼합 형식 입력은 첫 줄의 형식이 배치 전체를
//! 대표합니다.

use std::sync::LazyLock;

use logwarden_core::types::LogFormat;
use regex::Regex;

/// RFC 3164 헤더 힌트: `<PRI>Mmm dd HH:MM:SS`
static SYSLOG_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<\d+>[A-Z][a-z]{2} +\d{1,2} \d{2}:\d{2}:\d{2}")
        .expect("syslog hint regex is valid")
});

/// 입력 샘플의 로그 형식을 판별합니다.
///
/// # 판별 순서
/// 1. 첫 줄이 JSON 객체면 키 검사: wazuh → suricata → gelf → json_lines
/// 2. syslog 헤더 패턴 또는 토큰 휴리스틱 → syslog
/// 3. 모든 비어 있지 않은 줄이 `{`로 시작 → json_lines
/// 4. 그 외 → unknown
pub fn detect_format(content: &str) -> LogFormat {
    let Some(first_line) = content.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return LogFormat::Unknown;
    };

    if let Ok(serde_json::Value::Object(obj)) = serde_json::from_str(first_line) {
        // wazuh 키는 gelf/suricata보다 먼저 검사합니다.
        if obj.contains_key("rule") || obj.contains_key("agent") || obj.contains_key("decoder") {
            return LogFormat::Wazuh;
        }
        let has_eve_shape = obj.get("event_type").is_some_and(|v| v.is_string())
            || obj.get("alert").is_some_and(|v| v.is_object())
            || (obj.contains_key("src_ip") && obj.contains_key("dest_ip"));
        if has_eve_shape {
            return LogFormat::Suricata;
        }
        if obj.contains_key("short_message")
            || obj.contains_key("full_message")
            || obj.contains_key("_id")
        {
            return LogFormat::Gelf;
        }
        return LogFormat::JsonLines;
    }

    if SYSLOG_HINT.is_match(first_line) {
        return LogFormat::Syslog;
    }

    // "Mmm dd HH:MM:SS host ..." 형태: 둘째 토큰이 날짜 숫자
    let tokens: Vec<&str> = first_line.split_whitespace().collect();
    if tokens.len() >= 3 && !tokens[1].is_empty() && tokens[1].bytes().all(|b| b.is_ascii_digit())
    {
        return LogFormat::Syslog;
    }

    if content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .all(|l| l.starts_with('{'))
    {
        return LogFormat::JsonLines;
    }

    LogFormat::Unknown
}

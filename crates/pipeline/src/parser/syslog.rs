//! Syslog 파서 — RFC 5424 / RFC 3164
//!
//! 줄 단위로 RFC 5424를 먼저 시도하고, 실패하면 RFC 3164(BSD)로
//! 폴백합니다. PRI 값은 `pri % 8`로 severity 이름에 매핑됩니다.
//!
//! # 메시지 형식
//! ```text
//! RFC 5424: <PRI>1 TIMESTAMP HOSTNAME APP-NAME PROCID MSGID SD MSG
//! RFC 3164: <PRI>Mmm dd HH:MM:SS hostname tag[pid]: msg
//! ```

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use logwarden_core::types::LogFormat;
use regex::Regex;
use serde_json::json;

use super::{FormatParser, ParsedRecord, SEVERITY_NAMES, parse_datetime_str};

/// RFC 5424에서 유효한 최대 PRI 값
/// facility 최댓값 23 * 8 + severity 최댓값 7 = 191
const MAX_SYSLOG_PRI: u32 = 191;

static RFC5424: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^
        <(?P<pri>\d{1,3})>1\x20
        (?P<ts>\S+)\x20
        (?P<host>\S+)\x20
        (?P<app>\S+)\x20
        (?P<pid>\S+)\x20
        (?P<msgid>\S+)\x20
        (?P<sd>-|\[.*\])
        (?:\x20(?P<msg>.*))?$",
    )
    .expect("RFC 5424 regex is valid")
});

static RFC3164: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^
        (?:<(?P<pri>\d{1,3})>)?
        (?P<ts>[A-Z][a-z]{2}\x20+\d{1,2}\x20\d{2}:\d{2}:\d{2})\x20
        (?P<host>\S+)\x20
        (?P<tag>[\w\-/\.]+)
        (?:\[(?P<pid>\d+)\])?
        :\x20?
        (?P<msg>.*)$",
    )
    .expect("RFC 3164 regex is valid")
});

/// Syslog 파서
pub struct SyslogParser;

impl SyslogParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// PRI 값에서 severity 이름을 얻습니다.
    ///
    /// PRI = facility * 8 + severity
    fn pri_to_severity(pri: u32) -> Option<&'static str> {
        if pri > MAX_SYSLOG_PRI {
            return None;
        }
        Some(SEVERITY_NAMES[(pri % 8) as usize])
    }

    /// BSD 타임스탬프를 파싱합니다.
    ///
    /// 연도 정보가 없으므로 현재 연도를 가정하고 UTC로 정규화합니다.
    fn parse_bsd_timestamp(ts: &str) -> Option<DateTime<Utc>> {
        let collapsed: Vec<&str> = ts.split_whitespace().collect();
        if collapsed.len() != 3 {
            return None;
        }
        let with_year = format!(
            "{} {} {} {}",
            Utc::now().year(),
            collapsed[0],
            collapsed[1],
            collapsed[2]
        );
        NaiveDateTime::parse_from_str(&with_year, "%Y %b %d %H:%M:%S")
            .ok()
            .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
    }

    /// 한 줄을 RFC 5424로 파싱합니다.
    fn parse_rfc5424_line(line: &str) -> Option<ParsedRecord> {
        let caps = RFC5424.captures(line)?;

        let pri: u32 = caps.name("pri")?.as_str().parse().ok()?;
        if pri > MAX_SYSLOG_PRI {
            return None;
        }
        let severity = Self::pri_to_severity(pri);

        let ts = caps.name("ts").map(|m| m.as_str()).filter(|s| *s != "-");
        let timestamp = ts.and_then(parse_datetime_str);

        let nil = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str())
                .filter(|s| *s != "-")
                .map(str::to_owned)
        };
        let host = nil("host");
        let app = nil("app");
        let pid = nil("pid");
        let msgid = nil("msgid");
        let sd = nil("sd");
        let message = caps.name("msg").map(|m| m.as_str().to_owned());

        let metadata = json!({
            "pri": pri,
            "facility": pri / 8,
            "severity": severity,
            "host": host,
            "app": app,
            "pid": pid,
            "msgid": msgid,
            "structured_data": sd,
            "message": message,
        });

        Some(ParsedRecord {
            timestamp,
            host,
            app,
            severity: severity.map(str::to_owned),
            message,
            metadata,
        })
    }

    /// 한 줄을 RFC 3164로 파싱합니다.
    fn parse_rfc3164_line(line: &str) -> Option<ParsedRecord> {
        let caps = RFC3164.captures(line)?;

        let pri: Option<u32> = caps.name("pri").and_then(|m| m.as_str().parse().ok());
        if pri.is_some_and(|p| p > MAX_SYSLOG_PRI) {
            return None;
        }
        let severity = pri.and_then(Self::pri_to_severity);

        let timestamp = caps
            .name("ts")
            .and_then(|m| Self::parse_bsd_timestamp(m.as_str()));
        let host = caps.name("host").map(|m| m.as_str().to_owned());
        let app = caps.name("tag").map(|m| m.as_str().to_owned());
        let pid = caps.name("pid").map(|m| m.as_str().to_owned());
        let message = caps.name("msg").map(|m| m.as_str().to_owned());

        let metadata = json!({
            "pri": pri,
            "severity": severity,
            "host": host,
            "app": app,
            "pid": pid,
            "message": message,
        });

        Some(ParsedRecord {
            timestamp,
            host,
            app,
            severity: severity.map(str::to_owned),
            message,
            metadata,
        })
    }
}

impl Default for SyslogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatParser for SyslogParser {
    fn format(&self) -> LogFormat {
        LogFormat::Syslog
    }

    fn parse(&self, content: &str) -> Vec<ParsedRecord> {
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|line| {
                Self::parse_rfc5424_line(line).or_else(|| Self::parse_rfc3164_line(line))
            })
            .collect()
    }
}

//! 이벤트 요약 -- 조회 결과의 심각도/앱별 분포
//!
//! `/status` 류의 화면에 보여줄 간단한 집계를 만듭니다.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use logwarden_core::types::NormalizedEvent;

/// 값이 없는 이벤트가 집계되는 버킷 이름
const UNKNOWN_BUCKET: &str = "unknown";

/// 이벤트 집합의 요약
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSummary {
    /// 전체 이벤트 수
    pub total: usize,
    /// 심각도별 이벤트 수
    pub by_severity: BTreeMap<String, usize>,
    /// 애플리케이션별 이벤트 수
    pub by_app: BTreeMap<String, usize>,
    /// 가장 오래된 이벤트 시각
    pub first_ts: Option<DateTime<Utc>>,
    /// 가장 최근 이벤트 시각
    pub last_ts: Option<DateTime<Utc>>,
}

/// 이벤트 목록을 요약합니다.
pub fn summarize(events: &[NormalizedEvent]) -> EventSummary {
    let mut summary = EventSummary {
        total: events.len(),
        ..Default::default()
    };

    for event in events {
        let severity = event.severity.as_deref().unwrap_or(UNKNOWN_BUCKET);
        *summary.by_severity.entry(severity.to_owned()).or_insert(0) += 1;

        let app = event.app.as_deref().unwrap_or(UNKNOWN_BUCKET);
        *summary.by_app.entry(app.to_owned()).or_insert(0) += 1;

        summary.first_ts = Some(match summary.first_ts {
            Some(first) => first.min(event.ts),
            None => event.ts,
        });
        summary.last_ts = Some(match summary.last_ts {
            Some(last) => last.max(event.ts),
            None => event.ts,
        });
    }

    summary
}

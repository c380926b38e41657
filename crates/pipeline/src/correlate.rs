//! 상관 키 빌더
//!
//! 이벤트 필드에서 `source|destination|application` 형태의 그룹화
//! 키를 만듭니다. 각 세그먼트는 별칭 목록을 차례로 시도하고,
//! 없으면 `*`로 대체합니다.

/// source 세그먼트의 필드 별칭 (순서대로 시도)
const SOURCE_ALIASES: &[&str] = &["srcip", "src_ip", "source_ip"];
/// destination 세그먼트의 필드 별칭
const DEST_ALIASES: &[&str] = &["dstip", "dest_ip", "destination_ip"];
/// application 세그먼트의 필드 별칭
const APP_ALIASES: &[&str] = &["app", "program"];

fn lookup(metadata: &serde_json::Value, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|key| {
        metadata
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    })
}

/// 정규화된 이벤트의 필드에서 상관 키를 만듭니다.
///
/// `app`은 이벤트 자체의 애플리케이션 필드가 우선이고, 메타데이터의
/// 별칭은 그 다음입니다. 모든 세그먼트가 없으면 `*|*|*`입니다.
pub fn correlation_key(app: Option<&str>, metadata: &serde_json::Value) -> String {
    let src = lookup(metadata, SOURCE_ALIASES).unwrap_or_else(|| "*".to_owned());
    let dst = lookup(metadata, DEST_ALIASES).unwrap_or_else(|| "*".to_owned());
    let app = app
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .or_else(|| lookup(metadata, APP_ALIASES))
        .unwrap_or_else(|| "*".to_owned());

    format!("{src}|{dst}|{app}")
}

//! 규칙 엔진 -- 시그니처 로드, 원자적 교체, 이벤트 매칭
//!
//! 규칙 목록은 `Arc`로 감싸 읽기 잠금 없이 공유하고, 리로드 시
//! 참조를 통째로 교체합니다. 매칭 호출이 부분적으로 갱신된 규칙
//! 목록을 관찰하는 일은 없습니다.

mod loader;
mod types;

pub use loader::RuleLoader;
pub use types::{CompiledFilter, CompiledPattern, CompiledRule, Rule};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::PipelineError;

/// 매칭 대상 이벤트의 평탄화된 뷰
///
/// 애널라이저가 정규화 이벤트와 메타데이터에서 만듭니다.
#[derive(Debug, Default, Clone)]
pub struct RuleInput {
    /// 메시지 본문
    pub message: String,
    /// 필터가 참조하는 속성 (host, app, severity, srcip, dstip 등)
    pub attrs: HashMap<String, String>,
}

/// 매칭된 규칙의 요약 -- 알림 생성에 필요한 필드만 복제합니다.
#[derive(Debug, Clone)]
pub struct RuleMatch {
    /// 규칙 ID
    pub id: String,
    /// 규칙 제목
    pub title: String,
    /// 규칙 설명
    pub description: String,
    /// 심각도 (0-10)
    pub severity: u8,
    /// 분류 태그
    pub tags: Vec<String>,
}

/// 규칙 엔진
pub struct RuleEngine {
    rules_path: PathBuf,
    rules: RwLock<Arc<Vec<CompiledRule>>>,
}

impl RuleEngine {
    /// 규칙 파일을 로드하여 엔진을 생성합니다.
    ///
    /// # Errors
    /// 규칙 파일이 없거나 항목이 잘못되면 실패합니다. 규칙 없이
    /// 기동하는 것은 구성 오류로 취급합니다.
    pub async fn load(rules_path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let rules_path = rules_path.as_ref().to_path_buf();
        let compiled = Self::load_compiled(&rules_path).await?;
        Ok(Self {
            rules_path,
            rules: RwLock::new(Arc::new(compiled)),
        })
    }

    /// 규칙 파일을 다시 읽어 규칙 목록을 원자적으로 교체합니다.
    ///
    /// 실패하면 기존 규칙이 그대로 유지됩니다.
    pub async fn reload(&self) -> Result<usize, PipelineError> {
        let compiled = Self::load_compiled(&self.rules_path).await?;
        let count = compiled.len();
        let mut guard = self
            .rules
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Arc::new(compiled);
        drop(guard);
        tracing::info!(count, "rules reloaded");
        Ok(count)
    }

    async fn load_compiled(path: &Path) -> Result<Vec<CompiledRule>, PipelineError> {
        let rules = RuleLoader::load_file(path).await?;
        Ok(rules.into_iter().map(CompiledRule::compile).collect())
    }

    /// 현재 로드된 규칙 수
    pub fn rule_count(&self) -> usize {
        self.snapshot().len()
    }

    fn snapshot(&self) -> Arc<Vec<CompiledRule>> {
        Arc::clone(
            &self
                .rules
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }

    /// 이벤트를 모든 규칙과 매칭하고, 매칭된 규칙을 로드 순서대로
    /// 반환합니다.
    ///
    /// 규칙마다 먼저 속성 필터를 모두 적용합니다. 허용 목록이 빈
    /// 필터는 no-op이고, 대상 속성이 이벤트에 없으면 규칙이
    /// 탈락합니다. 필터를 통과한 뒤 패턴이 하나라도 있으면 메시지가
    /// 그중 하나에 매칭되어야 합니다. 패턴이 없는 규칙은 필터만으로
    /// 매칭됩니다.
    pub fn matches(&self, input: &RuleInput) -> Vec<RuleMatch> {
        let rules = self.snapshot();
        rules
            .iter()
            .filter(|compiled| Self::rule_matches(compiled, input))
            .map(|compiled| RuleMatch {
                id: compiled.rule.id.clone(),
                title: compiled.rule.title.clone(),
                description: compiled.rule.description.clone(),
                severity: compiled.rule.severity,
                tags: compiled.rule.tags.clone(),
            })
            .collect()
    }

    fn rule_matches(compiled: &CompiledRule, input: &RuleInput) -> bool {
        for filter in &compiled.filters {
            if filter.allowed.is_empty() {
                continue;
            }
            let Some(value) = input.attrs.get(&filter.attribute) else {
                return false;
            };
            if !filter.allowed.iter().any(|glob| glob.is_match(value)) {
                return false;
            }
        }

        if compiled.patterns.is_empty() {
            return true;
        }
        compiled
            .patterns
            .iter()
            .any(|pattern| pattern.is_match(&input.message))
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules_path", &self.rules_path)
            .field("rule_count", &self.rule_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn engine_from(yaml: &str) -> RuleEngine {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yml");
        tokio::fs::write(&path, yaml).await.unwrap();
        RuleEngine::load(&path).await.unwrap()
    }

    fn input(message: &str, attrs: &[(&str, &str)]) -> RuleInput {
        RuleInput {
            message: message.to_owned(),
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn missing_rules_file_is_fatal() {
        assert!(RuleEngine::load("/nonexistent/rules.yml").await.is_err());
    }

    #[tokio::test]
    async fn pattern_and_filter_must_both_pass() {
        let engine = engine_from(
            r#"
- id: app_errors
  title: Application Errors
  severity: 6
  patterns: ["error"]
  filters:
    app: ["app*"]
"#,
        )
        .await;

        let hit = engine.matches(&input("critical error", &[("app", "app1")]));
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].id, "app_errors");

        let miss = engine.matches(&input("critical error", &[("app", "other")]));
        assert!(miss.is_empty());
    }

    #[tokio::test]
    async fn missing_filter_attribute_fails_rule() {
        let engine = engine_from(
            r#"
- id: r
  title: R
  severity: 5
  patterns: ["error"]
  filters:
    app: ["sshd"]
"#,
        )
        .await;
        assert!(engine.matches(&input("error here", &[])).is_empty());
    }

    #[tokio::test]
    async fn empty_filter_list_is_a_noop() {
        let engine = engine_from(
            r#"
- id: r
  title: R
  severity: 5
  patterns: ["error"]
  filters:
    app: []
"#,
        )
        .await;
        assert_eq!(engine.matches(&input("error here", &[])).len(), 1);
    }

    #[tokio::test]
    async fn rule_without_patterns_matches_on_filters_alone() {
        let engine = engine_from(
            r#"
- id: any_sshd
  title: Any sshd event
  severity: 2
  filters:
    app: ["sshd"]
"#,
        )
        .await;
        assert_eq!(
            engine
                .matches(&input("whatever", &[("app", "sshd")]))
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn all_matching_rules_returned_in_load_order() {
        let engine = engine_from(
            r#"
- id: first
  title: First
  severity: 3
  patterns: ["error"]
- id: second
  title: Second
  severity: 8
  patterns: ["/err.r/"]
"#,
        )
        .await;
        let matched = engine.matches(&input("an error occurred", &[]));
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].id, "first");
        assert_eq!(matched[1].id, "second");
    }

    #[tokio::test]
    async fn matching_is_case_insensitive() {
        let engine = engine_from(
            r#"
- id: r
  title: R
  severity: 5
  patterns: ["failed password"]
"#,
        )
        .await;
        assert_eq!(
            engine.matches(&input("FAILED PASSWORD for root", &[])).len(),
            1
        );
    }

    #[tokio::test]
    async fn malformed_regex_pattern_never_matches_but_does_not_crash() {
        let engine = engine_from(
            r#"
- id: broken
  title: Broken regex
  severity: 5
  patterns: ["/[unclosed/"]
"#,
        )
        .await;
        assert!(engine.matches(&input("[unclosed", &[])).is_empty());
    }

    #[tokio::test]
    async fn reload_swaps_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yml");
        tokio::fs::write(&path, "- id: a\n  title: A\n  severity: 5\n")
            .await
            .unwrap();

        let engine = RuleEngine::load(&path).await.unwrap();
        assert_eq!(engine.rule_count(), 1);

        tokio::fs::write(
            &path,
            "- id: a\n  title: A\n  severity: 5\n- id: b\n  title: B\n  severity: 6\n",
        )
        .await
        .unwrap();
        assert_eq!(engine.reload().await.unwrap(), 2);
        assert_eq!(engine.rule_count(), 2);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yml");
        tokio::fs::write(&path, "- id: a\n  title: A\n  severity: 5\n")
            .await
            .unwrap();

        let engine = RuleEngine::load(&path).await.unwrap();
        tokio::fs::write(&path, "not: [valid: yaml: {{{").await.unwrap();
        assert!(engine.reload().await.is_err());
        assert_eq!(engine.rule_count(), 1);
    }
}

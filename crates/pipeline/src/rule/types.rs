//! 시그니처 규칙 데이터 타입
//!
//! YAML 규칙 파일에서 역직렬화되는 구조체와 로드 시 컴파일되는
//! 패턴 표현을 정의합니다.

use std::collections::HashMap;

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// 시그니처 규칙 -- YAML 규칙 파일의 한 항목에 대응합니다.
///
/// # YAML 스키마
/// ```yaml
/// - id: ssh_brute_force
///   title: SSH Brute Force Attempt
///   description: Repeated failed SSH logins
///   severity: 7
///   patterns:
///     - "Failed password"
///     - "/invalid user \\w+/"
///   tags:
///     - authentication
///   filters:
///     app: ["sshd"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// 규칙 고유 ID (파일 내에서 유일해야 함)
    pub id: String,
    /// 규칙 제목 (알림에 표시)
    pub title: String,
    /// 규칙 설명
    #[serde(default)]
    pub description: String,
    /// 심각도 (0-10)
    pub severity: u8,
    /// 메시지 매칭 패턴 (OR 결합, 대소문자 무시)
    #[serde(default)]
    pub patterns: Vec<String>,
    /// 분류 태그
    #[serde(default)]
    pub tags: Vec<String>,
    /// 속성 필터: 이벤트 속성명 -> 허용 glob 목록 (AND 결합)
    #[serde(default)]
    pub filters: HashMap<String, Vec<String>>,
}

impl Rule {
    /// 규칙의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.id.is_empty() {
            return Err(PipelineError::RuleValidation {
                rule_id: "(empty)".to_owned(),
                reason: "rule id must not be empty".to_owned(),
            });
        }

        if self.id.len() > 256 {
            return Err(PipelineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule id must not exceed 256 characters".to_owned(),
            });
        }

        if self.title.is_empty() {
            return Err(PipelineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule title must not be empty".to_owned(),
            });
        }

        if self.severity > 10 {
            return Err(PipelineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: format!("severity must be 0-10, got {}", self.severity),
            });
        }

        Ok(())
    }
}

/// 로드 시 컴파일된 메시지 패턴
///
/// `/.../`로 감싼 패턴은 정규식, glob 메타문자를 포함하면 glob,
/// 그 외는 대소문자 무시 부분 문자열입니다. 컴파일에 실패한
/// 패턴은 경고를 남기고 절대 매칭되지 않습니다.
#[derive(Debug)]
pub enum CompiledPattern {
    /// `/.../` 정규식 (대소문자 무시)
    Regex(Regex),
    /// glob 패턴 (대소문자 무시)
    Glob(GlobMatcher),
    /// 부분 문자열 (소문자로 정규화)
    Substring(String),
    /// 컴파일 실패 -- 절대 매칭되지 않음
    Invalid,
}

impl CompiledPattern {
    /// 패턴 문자열을 분류하고 컴파일합니다.
    pub fn compile(pattern: &str, rule_id: &str) -> Self {
        if let Some(inner) = pattern
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
            .filter(|_| pattern.len() >= 2)
        {
            return match Regex::new(&format!("(?i){inner}")) {
                Ok(re) => Self::Regex(re),
                Err(e) => {
                    tracing::warn!(
                        rule_id = %rule_id,
                        pattern = %pattern,
                        error = %e,
                        "invalid regex pattern, treating as never-matching"
                    );
                    Self::Invalid
                }
            };
        }

        if pattern.contains(['*', '?', '[']) {
            return match GlobBuilder::new(pattern).case_insensitive(true).build() {
                Ok(glob) => Self::Glob(glob.compile_matcher()),
                Err(e) => {
                    tracing::warn!(
                        rule_id = %rule_id,
                        pattern = %pattern,
                        error = %e,
                        "invalid glob pattern, treating as never-matching"
                    );
                    Self::Invalid
                }
            };
        }

        Self::Substring(pattern.to_lowercase())
    }

    /// 메시지가 이 패턴에 매칭되는지 검사합니다.
    pub fn is_match(&self, message: &str) -> bool {
        match self {
            Self::Regex(re) => re.is_match(message),
            Self::Glob(glob) => glob.is_match(message),
            Self::Substring(needle) => message.to_lowercase().contains(needle),
            Self::Invalid => false,
        }
    }
}

/// 컴파일된 속성 필터: 속성명과 허용 glob 목록
#[derive(Debug)]
pub struct CompiledFilter {
    /// 이벤트 속성명
    pub attribute: String,
    /// 허용 glob 목록 (비어 있으면 no-op)
    pub allowed: Vec<GlobMatcher>,
}

impl CompiledFilter {
    /// 필터 항목 하나를 컴파일합니다. 잘못된 glob은 건너뜁니다.
    pub fn compile(attribute: &str, patterns: &[String], rule_id: &str) -> Self {
        let allowed = patterns
            .iter()
            .filter_map(|p| {
                match GlobBuilder::new(p).case_insensitive(true).build() {
                    Ok(glob) => Some(glob.compile_matcher()),
                    Err(e) => {
                        tracing::warn!(
                            rule_id = %rule_id,
                            attribute = %attribute,
                            pattern = %p,
                            error = %e,
                            "invalid filter glob, skipping"
                        );
                        None
                    }
                }
            })
            .collect();

        Self {
            attribute: attribute.to_owned(),
            allowed,
        }
    }
}

/// 컴파일된 규칙 -- 원본 규칙과 미리 컴파일된 패턴/필터
#[derive(Debug)]
pub struct CompiledRule {
    /// 원본 규칙
    pub rule: Rule,
    /// 컴파일된 메시지 패턴
    pub patterns: Vec<CompiledPattern>,
    /// 컴파일된 속성 필터
    pub filters: Vec<CompiledFilter>,
}

impl CompiledRule {
    /// 규칙의 패턴과 필터를 컴파일합니다.
    pub fn compile(rule: Rule) -> Self {
        let patterns = rule
            .patterns
            .iter()
            .map(|p| CompiledPattern::compile(p, &rule.id))
            .collect();

        // 필터 순서를 결정적으로 유지하기 위해 속성명으로 정렬
        let mut entries: Vec<(&String, &Vec<String>)> = rule.filters.iter().collect();
        entries.sort_by_key(|(name, _)| name.as_str());
        let filters = entries
            .into_iter()
            .map(|(name, patterns)| CompiledFilter::compile(name, patterns, &rule.id))
            .collect();

        Self {
            rule,
            patterns,
            filters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rule() -> Rule {
        Rule {
            id: "ssh_brute".to_owned(),
            title: "SSH Brute Force".to_owned(),
            description: "Repeated failed logins".to_owned(),
            severity: 7,
            patterns: vec!["Failed password".to_owned()],
            tags: vec!["authentication".to_owned()],
            filters: HashMap::from([("app".to_owned(), vec!["sshd".to_owned()])]),
        }
    }

    #[test]
    fn valid_rule_passes_validation() {
        sample_rule().validate().unwrap();
    }

    #[test]
    fn empty_id_fails_validation() {
        let mut rule = sample_rule();
        rule.id = String::new();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn too_long_id_fails_validation() {
        let mut rule = sample_rule();
        rule.id = "x".repeat(300);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn empty_title_fails_validation() {
        let mut rule = sample_rule();
        rule.title = String::new();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn severity_above_ten_fails_validation() {
        let mut rule = sample_rule();
        rule.severity = 11;
        assert!(rule.validate().is_err());
    }

    #[test]
    fn substring_pattern_is_case_insensitive() {
        let p = CompiledPattern::compile("Failed Password", "r");
        assert!(p.is_match("FAILED PASSWORD for root"));
        assert!(!p.is_match("accepted publickey"));
    }

    #[test]
    fn slash_wrapped_pattern_is_regex() {
        let p = CompiledPattern::compile(r"/invalid user \w+/", "r");
        assert!(matches!(p, CompiledPattern::Regex(_)));
        assert!(p.is_match("Invalid User admin from 1.2.3.4"));
    }

    #[test]
    fn glob_metacharacters_select_glob() {
        let p = CompiledPattern::compile("*denied*", "r");
        assert!(matches!(p, CompiledPattern::Glob(_)));
        assert!(p.is_match("access DENIED by policy"));
    }

    #[test]
    fn invalid_regex_never_matches() {
        let p = CompiledPattern::compile("/[unclosed/", "r");
        assert!(matches!(p, CompiledPattern::Invalid));
        assert!(!p.is_match("anything"));
    }

    #[test]
    fn rule_from_yaml_list() {
        let yaml = r#"
- id: ssh_brute
  title: SSH Brute Force
  severity: 7
  patterns:
    - "Failed password"
  filters:
    app: ["sshd"]
- id: disk_full
  title: Disk Full
  severity: 5
  patterns:
    - "/no space left/"
"#;
        let rules: Vec<Rule> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, "ssh_brute");
        assert!(rules[0].filters.contains_key("app"));
        assert!(rules[1].filters.is_empty());
    }
}

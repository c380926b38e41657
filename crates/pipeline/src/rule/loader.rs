//! 규칙 파일 로더 -- YAML 규칙 파일을 디스크에서 로드합니다.
//!
//! 하나의 YAML 파일이 규칙 목록을 담습니다. 파일이 없거나 항목이
//! 잘못되면 로드 전체가 실패합니다 (규칙 없이 기동하지 않음).
//! 중복 ID는 경고를 남기고 뒤의 항목을 건너뜁니다.

use std::collections::HashSet;
use std::path::Path;

use crate::error::PipelineError;

use super::types::Rule;

const MAX_RULE_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const MAX_RULES_COUNT: usize = 10_000;

/// 규칙 파일 로더
pub struct RuleLoader;

impl RuleLoader {
    /// YAML 파일에서 규칙 목록을 로드합니다.
    ///
    /// # Errors
    /// - 파일이 없거나 읽을 수 없는 경우
    /// - YAML 파싱에 실패한 경우
    /// - 항목의 유효성 검증에 실패한 경우
    /// - 규칙 수가 `MAX_RULES_COUNT`를 초과하는 경우
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Vec<Rule>, PipelineError> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| PipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(PipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file: {e}"),
            })?;

        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// YAML 문자열을 파싱하여 규칙 목록을 생성합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<Vec<Rule>, PipelineError> {
        let rules: Vec<Rule> =
            serde_yaml::from_str(yaml_str).map_err(|e| PipelineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        if rules.len() > MAX_RULES_COUNT {
            return Err(PipelineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("too many rules: {} (max {MAX_RULES_COUNT})", rules.len()),
            });
        }

        let mut seen_ids = HashSet::new();
        let mut out = Vec::with_capacity(rules.len());
        for rule in rules {
            rule.validate()?;
            if !seen_ids.insert(rule.id.clone()) {
                tracing::warn!(rule_id = %rule.id, source = %source, "duplicate rule id, skipping");
                continue;
            }
            out.push(rule);
        }

        tracing::info!(source = %source, count = out.len(), "loaded signature rules");
        Ok(out)
    }
}

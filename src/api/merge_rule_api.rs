// ==========================================
// 销售预算报表系统 - 客户合并规则 API
// ==========================================
// 职责: 规则增删改查 + 重叠诊断
// 约束: 原始客户按 TRIM + UPPER 去重；规则只在读取时应用
// ==========================================

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::report_api::parse_division;
use crate::domain::merge_rule::{MergeRule, MergeRuleInput, MergeRuleOverlap, ValidatedMergeRule};
use crate::domain::types::canonical_name;
use crate::engine::find_overlaps;
use crate::repository::{MergeRuleFilter, MergeRuleRepository, RepositoryError};

/// 校验并规范化规则输入
///
/// # 规则
/// - 事业部代码可识别
/// - 销售员、合并名非空
/// - 原始客户至少一个；空白项丢弃；按规范化键去重（保留首次出现的写法）
pub fn validate_merge_rule(input: MergeRuleInput) -> ApiResult<ValidatedMergeRule> {
    let division = parse_division(&input.division)?;

    let sales_rep = input.sales_rep.trim().to_string();
    if sales_rep.is_empty() {
        return Err(ApiError::ValidationError("销售员不能为空".to_string()));
    }

    let merged_customer_name = input.merged_customer_name.trim().to_string();
    if merged_customer_name.is_empty() {
        return Err(ApiError::ValidationError("合并后客户名不能为空".to_string()));
    }

    let mut seen = HashSet::new();
    let original_customers: Vec<String> = input
        .original_customers
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(canonical_name(c)))
        .map(|c| c.to_string())
        .collect();
    if original_customers.is_empty() {
        return Err(ApiError::ValidationError(
            "至少需要一个原始客户名".to_string(),
        ));
    }

    let note = input
        .note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(ValidatedMergeRule {
        division,
        sales_rep,
        merged_customer_name,
        original_customers,
        is_active: input.is_active.unwrap_or(true),
        note,
    })
}

// ==========================================
// MergeRuleApi - 合并规则 API
// ==========================================
pub struct MergeRuleApi {
    repo: Arc<MergeRuleRepository>,
}

impl MergeRuleApi {
    pub fn new(repo: Arc<MergeRuleRepository>) -> Self {
        Self { repo }
    }

    /// 新建规则
    pub fn create(&self, input: MergeRuleInput) -> ApiResult<MergeRule> {
        let rule = validate_merge_rule(input)?;
        let id = self.repo.insert(&rule)?;
        info!(
            rule_id = id,
            division = %rule.division,
            sales_rep = %rule.sales_rep,
            members = rule.original_customers.len(),
            "合并规则已创建"
        );
        self.get(id)
    }

    /// 整体替换规则内容
    pub fn update(&self, id: i64, input: MergeRuleInput) -> ApiResult<MergeRule> {
        let rule = validate_merge_rule(input)?;
        self.repo.update(id, &rule)?;
        info!(rule_id = id, members = rule.original_customers.len(), "合并规则已更新");
        self.get(id)
    }

    /// 启用 / 停用
    pub fn set_active(&self, id: i64, is_active: bool) -> ApiResult<MergeRule> {
        self.repo.set_active(id, is_active)?;
        info!(rule_id = id, is_active, "合并规则状态已变更");
        self.get(id)
    }

    pub fn delete(&self, id: i64) -> ApiResult<()> {
        self.repo.delete(id)?;
        info!(rule_id = id, "合并规则已删除");
        Ok(())
    }

    pub fn get(&self, id: i64) -> ApiResult<MergeRule> {
        self.repo.find_by_id(id)?.ok_or_else(|| {
            RepositoryError::NotFound {
                entity: "MergeRule".to_string(),
                id: id.to_string(),
            }
            .into()
        })
    }

    /// 查询规则
    ///
    /// # 参数
    /// - division: 事业部（None 表示全部）
    /// - sales_rep: 销售员（忽略大小写）
    /// - active_only: 仅有效规则
    pub fn list(
        &self,
        division: Option<&str>,
        sales_rep: Option<&str>,
        active_only: bool,
    ) -> ApiResult<Vec<MergeRule>> {
        let division = match division.map(str::trim).filter(|s| !s.is_empty()) {
            Some(d) => Some(parse_division(d)?),
            None => None,
        };
        let filter = MergeRuleFilter {
            division,
            sales_rep: sales_rep
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            active_only,
        };
        Ok(self.repo.list(&filter)?)
    }

    /// 有效规则的重叠（同一作用域内同一客户出现在多条规则中）
    pub fn find_conflicts(
        &self,
        division: &str,
        sales_rep: Option<&str>,
    ) -> ApiResult<Vec<MergeRuleOverlap>> {
        let division = parse_division(division)?;
        let sales_rep = sales_rep.map(str::trim).filter(|s| !s.is_empty());
        let rules = self.repo.list(&MergeRuleFilter {
            division: Some(division),
            sales_rep: sales_rep.map(str::to_string),
            active_only: true,
        })?;
        Ok(find_overlaps(division, &rules, sales_rep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Division;

    fn input(originals: &[&str]) -> MergeRuleInput {
        MergeRuleInput {
            division: "fp".to_string(),
            sales_rep: " Narek ".to_string(),
            merged_customer_name: "ACME Group ".to_string(),
            original_customers: originals.iter().map(|s| s.to_string()).collect(),
            is_active: None,
            note: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_validate_dedups_by_canonical_key() {
        let rule = validate_merge_rule(input(&["ACME LLC", " acme llc", "", "ACME FZE"])).unwrap();

        assert_eq!(rule.division, Division::Fp);
        assert_eq!(rule.sales_rep, "Narek");
        assert_eq!(rule.merged_customer_name, "ACME Group");
        assert_eq!(rule.original_customers, vec!["ACME LLC", "ACME FZE"]);
        assert!(rule.is_active);
        assert_eq!(rule.note, None);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(matches!(
            validate_merge_rule(input(&["  "])),
            Err(ApiError::ValidationError(_))
        ));

        let mut bad_division = input(&["ACME"]);
        bad_division.division = "XX".to_string();
        assert!(matches!(
            validate_merge_rule(bad_division),
            Err(ApiError::ValidationError(_))
        ));

        let mut no_rep = input(&["ACME"]);
        no_rep.sales_rep = " ".to_string();
        assert!(validate_merge_rule(no_rep).is_err());

        let mut no_name = input(&["ACME"]);
        no_name.merged_customer_name = String::new();
        assert!(validate_merge_rule(no_name).is_err());
    }
}

// ==========================================
// 销售预算报表系统 - 客户合并查找表
// ==========================================
// 职责: 将有效合并规则索引为 (销售员键, 客户键) → 规则
// 口径: 名称统一 TRIM + UPPER（见 domain::types::canonical_name）
// 冲突: 规则按 id 升序处理，先入者生效
// ==========================================

use crate::domain::merge_rule::{MergeRule, MergeRuleOverlap};
use crate::domain::types::{canonical_name, Division};
use std::collections::HashMap;
use tracing::debug;

/// 命中的合并目标
#[derive(Debug, Clone, PartialEq)]
pub struct MergeTarget {
    pub rule_id: i64,
    pub merged_customer_name: String,
}

// ==========================================
// MergeLookup - 合并查找表
// ==========================================
#[derive(Debug, Default)]
pub struct MergeLookup {
    targets: HashMap<(String, String), MergeTarget>,
    overlaps: Vec<MergeRuleOverlap>,
}

impl MergeLookup {
    /// 构建指定事业部的查找表
    ///
    /// # 参数
    /// - division: 事业部（其他事业部的规则被忽略）
    /// - rules: 规则集合（可含无效规则，构建时过滤）
    pub fn build(division: Division, rules: &[MergeRule]) -> Self {
        let mut active: Vec<&MergeRule> = rules
            .iter()
            .filter(|r| r.is_active && r.division == division)
            .collect();
        active.sort_by_key(|r| r.id);

        let mut targets: HashMap<(String, String), MergeTarget> = HashMap::new();
        let mut overlaps = Vec::new();

        for rule in active {
            let rep_key = rule.sales_rep_key();
            let merged_name = rule.merged_customer_name.trim().to_string();

            for original in &rule.original_customers {
                let customer_key = canonical_name(original);
                if customer_key.is_empty() {
                    continue;
                }

                let key = (rep_key.clone(), customer_key);
                if let Some(existing) = targets.get(&key) {
                    if existing.rule_id != rule.id {
                        debug!(
                            division = %division,
                            sales_rep = %rep_key,
                            customer = %key.1,
                            winning_rule_id = existing.rule_id,
                            shadowed_rule_id = rule.id,
                            "合并规则重叠，保留 id 较小的规则"
                        );
                        overlaps.push(MergeRuleOverlap {
                            division,
                            sales_rep_key: rep_key.clone(),
                            customer_key: key.1.clone(),
                            winning_rule_id: existing.rule_id,
                            shadowed_rule_id: rule.id,
                        });
                    }
                    continue;
                }

                targets.insert(
                    key,
                    MergeTarget {
                        rule_id: rule.id,
                        merged_customer_name: merged_name.clone(),
                    },
                );
            }
        }

        Self {
            targets,
            overlaps,
        }
    }

    /// 查询原始客户的合并目标
    pub fn resolve(&self, sales_rep: &str, customer: &str) -> Option<&MergeTarget> {
        self.targets
            .get(&(canonical_name(sales_rep), canonical_name(customer)))
    }

    /// 构建期间发现的重叠
    pub fn overlaps(&self) -> &[MergeRuleOverlap] {
        &self.overlaps
    }
}

/// 查找指定事业部内有效规则的重叠（可按销售员过滤）
pub fn find_overlaps(
    division: Division,
    rules: &[MergeRule],
    sales_rep: Option<&str>,
) -> Vec<MergeRuleOverlap> {
    let rep_filter = sales_rep.map(canonical_name);
    MergeLookup::build(division, rules)
        .overlaps
        .into_iter()
        .filter(|o| match &rep_filter {
            Some(rep) => &o.sales_rep_key == rep,
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rule(id: i64, sales_rep: &str, merged: &str, originals: &[&str], active: bool) -> MergeRule {
        MergeRule {
            id,
            division: Division::Fp,
            sales_rep: sales_rep.to_string(),
            merged_customer_name: merged.to_string(),
            original_customers: originals.iter().map(|s| s.to_string()).collect(),
            is_active: active,
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_resolve_ignores_case_and_whitespace() {
        let rules = vec![rule(1, "Narek", "ACME Group", &["ACME LLC"], true)];
        let lookup = MergeLookup::build(Division::Fp, &rules);

        let target = lookup.resolve("narek ", " acme llc").unwrap();
        assert_eq!(target.merged_customer_name, "ACME Group");
        assert!(lookup.resolve("Narek", "Other Co").is_none());
    }

    #[test]
    fn test_rules_scoped_by_sales_rep() {
        let rules = vec![rule(1, "Narek", "ACME Group", &["ACME LLC"], true)];
        let lookup = MergeLookup::build(Division::Fp, &rules);

        assert!(lookup.resolve("Sofia", "ACME LLC").is_none());
    }

    #[test]
    fn test_inactive_and_foreign_division_rules_ignored() {
        let mut other = rule(2, "Narek", "Foreign", &["BETA"], true);
        other.division = Division::Hc;
        let rules = vec![rule(1, "Narek", "ACME Group", &["ACME LLC"], false), other];
        let lookup = MergeLookup::build(Division::Fp, &rules);

        assert!(lookup.resolve("Narek", "ACME LLC").is_none());
        assert!(lookup.resolve("Narek", "BETA").is_none());
        assert!(lookup.overlaps().is_empty());
    }

    #[test]
    fn test_lowest_rule_id_wins_on_overlap() {
        // 故意乱序传入
        let rules = vec![
            rule(7, "Narek", "Later Group", &["ACME LLC"], true),
            rule(3, "Narek", "ACME Group", &["acme llc", "ACME FZE"], true),
        ];
        let lookup = MergeLookup::build(Division::Fp, &rules);

        let target = lookup.resolve("Narek", "ACME LLC").unwrap();
        assert_eq!(target.rule_id, 3);
        assert_eq!(target.merged_customer_name, "ACME Group");
        assert_eq!(lookup.overlaps().len(), 1);
        assert_eq!(lookup.overlaps()[0].winning_rule_id, 3);
        assert_eq!(lookup.overlaps()[0].shadowed_rule_id, 7);
    }

    #[test]
    fn test_find_overlaps_filters_sales_rep() {
        let rules = vec![
            rule(1, "Narek", "A", &["X"], true),
            rule(2, "Narek", "B", &["x "], true),
            rule(3, "Sofia", "C", &["Y"], true),
            rule(4, "Sofia", "D", &["Y"], true),
        ];

        assert_eq!(find_overlaps(Division::Fp, &rules, None).len(), 2);
        let narek = find_overlaps(Division::Fp, &rules, Some("NAREK"));
        assert_eq!(narek.len(), 1);
        assert_eq!(narek[0].customer_key, "X");
    }
}

// ==========================================
// 销售预算报表系统 - 客户合并规则领域模型
// ==========================================
// 对齐: customer_merge_rule / customer_merge_rule_member 表
// 红线: 合并规则只在读取时应用，不回写事实数据
// ==========================================

use crate::domain::types::{canonical_name, Division};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// MergeRule - 客户合并规则
// ==========================================
// 作用域: (division, sales_rep)
// 冲突: 同作用域内同一客户命中多条有效规则时，id 最小者生效
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRule {
    pub id: i64,
    pub division: Division,
    pub sales_rep: String,
    pub merged_customer_name: String,     // 合并后的显示名
    pub original_customers: Vec<String>,  // 被合并的原始客户名
    pub is_active: bool,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MergeRule {
    pub fn sales_rep_key(&self) -> String {
        canonical_name(&self.sales_rep)
    }
}

// ==========================================
// MergeRuleInput - 创建/更新规则的输入
// ==========================================
// 事业部保持字符串，由 API 层校验并给出明确错误
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeRuleInput {
    pub division: String,
    #[serde(alias = "salesRep")]
    pub sales_rep: String,
    #[serde(alias = "mergedCustomerName", alias = "merged_name")]
    pub merged_customer_name: String,
    #[serde(alias = "originalCustomers")]
    pub original_customers: Vec<String>,
    #[serde(default, alias = "isActive")]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub note: Option<String>,
}

/// 校验通过后的规则内容（成员已去重、已 TRIM）
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMergeRule {
    pub division: Division,
    pub sales_rep: String,
    pub merged_customer_name: String,
    pub original_customers: Vec<String>,
    pub is_active: bool,
    pub note: Option<String>,
}

// ==========================================
// MergeRuleOverlap - 有效规则重叠
// ==========================================
// 用途: 管理端提示（数据不一致但不阻断）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRuleOverlap {
    pub division: Division,
    pub sales_rep_key: String,
    pub customer_key: String,
    pub winning_rule_id: i64,
    pub shadowed_rule_id: i64,
}

// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use sales_budget_report::domain::{Fact, FactRecordInput, MergeRuleInput};
use sales_budget_report::{Division, RecordType, ValueType};

// ==========================================
// Fact 构建器
// ==========================================

pub struct FactBuilder {
    fact: Fact,
}

impl FactBuilder {
    /// 默认: FP / 2025 / 1月 / AMOUNT / BUDGET
    pub fn new(sales_rep: &str, customer: &str) -> Self {
        Self {
            fact: Fact {
                division: Division::Fp,
                year: 2025,
                month: 1,
                sales_rep: sales_rep.to_string(),
                customer: customer.to_string(),
                country: "UAE".to_string(),
                product_group: "Shrink Film".to_string(),
                value_type: ValueType::Amount,
                record_type: RecordType::Budget,
                value: 0.0,
            },
        }
    }

    pub fn division(mut self, division: Division) -> Self {
        self.fact.division = division;
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.fact.year = year;
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.fact.month = month;
        self
    }

    pub fn country(mut self, country: &str) -> Self {
        self.fact.country = country.to_string();
        self
    }

    pub fn product_group(mut self, product_group: &str) -> Self {
        self.fact.product_group = product_group.to_string();
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.fact.value_type = value_type;
        self
    }

    pub fn record_type(mut self, record_type: RecordType) -> Self {
        self.fact.record_type = record_type;
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.fact.value = value;
        self
    }

    pub fn build(self) -> Fact {
        self.fact
    }
}

// ==========================================
// 导入记录 / 规则输入
// ==========================================

/// 扁平导入记录（维度由导入上下文补齐）
pub fn record(customer: &str, month: u32, value: f64) -> FactRecordInput {
    FactRecordInput {
        customer: Some(customer.to_string()),
        country: Some("UAE".to_string()),
        product_group: Some("Shrink Film".to_string()),
        month: Some(month),
        value: Some(value),
        ..Default::default()
    }
}

/// 合并规则输入（FP 事业部，默认启用）
pub fn merge_rule_input(sales_rep: &str, merged: &str, originals: &[&str]) -> MergeRuleInput {
    MergeRuleInput {
        division: "FP".to_string(),
        sales_rep: sales_rep.to_string(),
        merged_customer_name: merged.to_string(),
        original_customers: originals.iter().map(|s| s.to_string()).collect(),
        is_active: Some(true),
        note: None,
    }
}

// ==========================================
// 销售预算报表系统 - 事实数据领域模型
// ==========================================
// 对齐: sales_fact 表
// 约束: value 以 value_type 的基础单位存储（KGS → 千克）
// ==========================================

use crate::domain::types::{canonical_name, Division, Quantity, RecordType, ValueType};
use serde::{Deserialize, Serialize};

// ==========================================
// Fact - 一条销售/预算观测值
// ==========================================
// 用途: 导入层写入，报表层只读
// 唯一性: (division, year, month, sales_rep_key, customer, country,
//          product_group, value_type, record_type)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub division: Division,
    pub year: i32,
    pub month: u32,           // 1-12
    pub sales_rep: String,    // 显示名（大小写不敏感身份）
    pub customer: String,     // 原始客户名
    pub country: String,
    pub product_group: String,
    pub value_type: ValueType,
    pub record_type: RecordType,
    pub value: f64,           // 基础单位，可为负
}

/// 事实唯一键（与存储层唯一约束一致）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactKey {
    pub division: Division,
    pub year: i32,
    pub month: u32,
    pub sales_rep_key: String,
    pub customer: String,
    pub country: String,
    pub product_group: String,
    pub value_type: &'static str,
    pub record_type: &'static str,
}

impl Fact {
    /// 带单位的数值
    pub fn quantity(&self) -> Quantity {
        Quantity::new(self.value, self.value_type.base_unit())
    }

    /// 销售员身份键（TRIM + UPPER）
    pub fn sales_rep_key(&self) -> String {
        canonical_name(&self.sales_rep)
    }

    pub fn key(&self) -> FactKey {
        FactKey {
            division: self.division,
            year: self.year,
            month: self.month,
            sales_rep_key: self.sales_rep_key(),
            customer: self.customer.trim().to_string(),
            country: self.country.trim().to_string(),
            product_group: self.product_group.trim().to_string(),
            value_type: self.value_type.to_db_str(),
            record_type: self.record_type.to_db_str(),
        }
    }
}

// ==========================================
// RawFactRecord - 导入原始记录（字段映射后、校验前）
// ==========================================
// 代码类字段保持字符串，便于 DQ 报告原值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFactRecord {
    pub division: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub sales_rep: Option<String>,
    pub customer: Option<String>,
    pub country: Option<String>,
    pub product_group: Option<String>,
    pub value_type: Option<String>,
    pub record_type: Option<String>,
    pub value: Option<f64>,

    // 元信息
    pub row_number: usize,                   // 原始文件行号（从 1 开始）
    pub invalid_fields: Vec<(String, String)>, // 无法解析的字段 (字段名, 原值)
}

// ==========================================
// FactRecordInput - JSON 接口输入的扁平记录
// ==========================================
// 兼容前端导出的 camelCase 字段名
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactRecordInput {
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default, alias = "salesRep", alias = "salesrep")]
    pub sales_rep: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, alias = "productGroup", alias = "pgcombine")]
    pub product_group: Option<String>,
    #[serde(default, alias = "valueType", alias = "values_type")]
    pub value_type: Option<String>,
    #[serde(default, alias = "type")]
    pub record_type: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

impl FactRecordInput {
    pub fn into_raw(self, row_number: usize) -> RawFactRecord {
        RawFactRecord {
            division: self.division,
            year: self.year,
            month: self.month,
            sales_rep: self.sales_rep,
            customer: self.customer,
            country: self.country,
            product_group: self.product_group,
            value_type: self.value_type,
            record_type: self.record_type,
            value: self.value,
            row_number,
            invalid_fields: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Unit;

    fn fact(sales_rep: &str, customer: &str) -> Fact {
        Fact {
            division: Division::Fp,
            year: 2025,
            month: 1,
            sales_rep: sales_rep.to_string(),
            customer: customer.to_string(),
            country: "UAE".to_string(),
            product_group: "Plain".to_string(),
            value_type: ValueType::Kgs,
            record_type: RecordType::Budget,
            value: 500.0,
        }
    }

    #[test]
    fn test_key_ignores_sales_rep_case() {
        assert_eq!(fact("Narek", "ACME").key(), fact(" NAREK ", "ACME").key());
        assert_ne!(fact("Narek", "ACME").key(), fact("Narek", "Acme").key());
    }

    #[test]
    fn test_quantity_uses_base_unit() {
        assert_eq!(fact("Narek", "ACME").quantity().unit, Unit::Kg);
    }

    #[test]
    fn test_record_input_accepts_camel_case() {
        let input: FactRecordInput = serde_json::from_str(
            r#"{"salesRep":"Narek","customer":"ACME LLC","productGroup":"Plain","month":3,"value":12.5,"type":"BUDGET"}"#,
        )
        .unwrap();
        let raw = input.into_raw(7);
        assert_eq!(raw.sales_rep.as_deref(), Some("Narek"));
        assert_eq!(raw.product_group.as_deref(), Some("Plain"));
        assert_eq!(raw.record_type.as_deref(), Some("BUDGET"));
        assert_eq!(raw.month, Some(3));
        assert_eq!(raw.row_number, 7);
    }
}

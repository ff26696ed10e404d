// ==========================================
// 销售预算报表系统 - 报表结果模型
// ==========================================

use crate::domain::types::{Division, RecordType, Unit, ValueType};
use serde::{Deserialize, Serialize};

// ==========================================
// AggregatedRow - 汇总行
// ==========================================
// 分组: (sales_rep, customer, country, product_group, month)
// 单位: 与输入事实一致，由调用方负责换算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub sales_rep: String,
    pub customer: String,
    pub country: String,
    pub product_group: String,
    pub month: u32,
    pub value: f64,
}

// ==========================================
// AggregationReport - 报表接口返回
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    pub division: Division,
    pub year: i32,
    pub value_type: ValueType,
    pub record_type: RecordType,
    pub unit: Unit,
    pub total: f64,
    pub rows: Vec<AggregatedRow>,
}

// ==========================================
// CustomerResolution - 原始客户名的合并去向
// ==========================================
// 用途: 合并规则维护页面 / 诊断脚本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerResolution {
    pub sales_rep: String,
    pub customer: String,
    pub fact_count: i64,
    pub merged_customer_name: Option<String>,
    pub rule_id: Option<i64>,
}

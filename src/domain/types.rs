// ==========================================
// 销售预算报表系统 - 领域类型定义
// ==========================================
// 职责: 事业部 / 数值类型 / 记录类型 / 计量单位
// 约束: 数据库存储与 JSON 序列化统一使用大写代码
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 名称规范化
// ==========================================
// 销售员与客户名的唯一比较口径: TRIM + UPPER
// 引擎匹配与存储层 *_key 列共用此函数
pub fn canonical_name(s: &str) -> String {
    s.trim().to_uppercase()
}

// ==========================================
// 事业部 (Division)
// ==========================================
// 所有事实数据与合并规则按事业部分区
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Division {
    Fp,
    Hc,
    Tf,
    Sb,
    Hcm,
}

impl Division {
    /// 全部事业部（按代码排序）
    pub const ALL: [Division; 5] = [
        Division::Fp,
        Division::Hc,
        Division::Hcm,
        Division::Sb,
        Division::Tf,
    ];

    /// 从代码解析（忽略大小写与首尾空白）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "FP" => Some(Division::Fp),
            "HC" => Some(Division::Hc),
            "TF" => Some(Division::Tf),
            "SB" => Some(Division::Sb),
            "HCM" => Some(Division::Hcm),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Division::Fp => "FP",
            Division::Hc => "HC",
            Division::Tf => "TF",
            Division::Sb => "SB",
            Division::Hcm => "HCM",
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 计量单位 (Unit)
// ==========================================
// KGS 一律以千克落库；吨 (MT) 只出现在导入源与展示层
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Unit {
    Currency,
    Kg,
    Mt,
}

impl Unit {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CURRENCY" | "AMOUNT" => Some(Unit::Currency),
            "KG" | "KGS" => Some(Unit::Kg),
            "MT" | "TON" | "TONS" | "T" => Some(Unit::Mt),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Unit::Currency => "CURRENCY",
            Unit::Kg => "KG",
            Unit::Mt => "MT",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 带单位的数量 (Quantity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

/// 1 吨 = 1000 千克
pub const KG_PER_MT: f64 = 1000.0;

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// 换算到目标单位
    ///
    /// # 返回
    /// - Some(Quantity): 可换算（KG ↔ MT，或同单位）
    /// - None: 量纲不兼容（例如 CURRENCY → KG）
    pub fn convert_to(&self, target: Unit) -> Option<Quantity> {
        let value = match (self.unit, target) {
            (from, to) if from == to => self.value,
            (Unit::Kg, Unit::Mt) => self.value / KG_PER_MT,
            (Unit::Mt, Unit::Kg) => self.value * KG_PER_MT,
            _ => return None,
        };
        Some(Quantity::new(value, target))
    }
}

// ==========================================
// 数值类型 (Value Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValueType {
    Amount, // 销售金额
    Kgs,    // 销量（千克）
    Morm,   // 原料毛利
}

impl ValueType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "AMOUNT" | "VALUE" => Some(ValueType::Amount),
            "KGS" | "KG" | "QTY" => Some(ValueType::Kgs),
            "MORM" => Some(ValueType::Morm),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ValueType::Amount => "AMOUNT",
            ValueType::Kgs => "KGS",
            ValueType::Morm => "MORM",
        }
    }

    /// 落库使用的基础单位
    pub fn base_unit(&self) -> Unit {
        match self {
            ValueType::Kgs => Unit::Kg,
            ValueType::Amount | ValueType::Morm => Unit::Currency,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 记录类型 (Record Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    Budget,
    Actual,
}

impl RecordType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BUDGET" => Some(RecordType::Budget),
            "ACTUAL" | "ACTUALS" => Some(RecordType::Actual),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            RecordType::Budget => "BUDGET",
            RecordType::Actual => "ACTUAL",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

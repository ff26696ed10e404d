// ==========================================
// 销售预算报表系统 - 导入领域模型
// ==========================================
// 对齐: import_batch 表
// ==========================================

use crate::domain::types::{Division, RecordType, Unit, ValueType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ImportContext - 上传上下文
// ==========================================
// 文件行内缺失的字段由上下文补齐（行内值优先）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportContext {
    #[serde(default)]
    pub division: Option<Division>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub sales_rep: Option<String>,
    #[serde(default)]
    pub value_type: Option<ValueType>,
    #[serde(default)]
    pub record_type: Option<RecordType>,
    /// 源文件数值单位（仅 KGS 有意义：KG / MT）
    #[serde(default)]
    pub source_unit: Option<Unit>,
    #[serde(default)]
    pub imported_by: Option<String>,
}

// ==========================================
// SourceFormat - 源文件格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceFormat {
    Csv,
    Excel,
    Html,
    Json,
}

impl SourceFormat {
    /// 按扩展名判断
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_lowercase().as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xlsx" | "xls" => Some(SourceFormat::Excel),
            "html" | "htm" => Some(SourceFormat::Html),
            "json" => Some(SourceFormat::Json),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "CSV",
            SourceFormat::Excel => "EXCEL",
            SourceFormat::Html => "HTML",
            SourceFormat::Json => "JSON",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "CSV" => SourceFormat::Csv,
            "EXCEL" => SourceFormat::Excel,
            "HTML" => SourceFormat::Html,
            _ => SourceFormat::Json,
        }
    }
}

// ==========================================
// ImportBatch - 导入批次
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,                  // 批次 ID（UUID）
    pub division: Option<Division>,        // 上下文事业部
    pub year: Option<i32>,
    pub record_type: Option<RecordType>,
    pub value_type: Option<ValueType>,
    pub sales_rep: Option<String>,
    pub file_name: Option<String>,
    pub source_format: SourceFormat,
    pub total_rows: i32,                   // 映射后的记录数
    pub success_rows: i32,                 // 落库记录数
    pub blocked_rows: i32,                 // 阻断（DQ ERROR）
    pub warning_rows: i32,                 // 警告（DQ WARNING）
    pub imported_at: DateTime<Utc>,
    pub imported_by: Option<String>,
    pub elapsed_ms: i64,
    pub dq_report_json: Option<String>,
}

// ==========================================
// DqLevel - 数据质量级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DqLevel {
    Error,    // 错误（阻断该行）
    Warning,  // 警告（允许导入）
    Info,     // 提示（仅记录）
    Conflict, // 冲突（同文件重复键，后者覆盖前者）
}

// ==========================================
// DqViolation - 数据质量违规
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqViolation {
    pub row_number: usize,
    pub customer: Option<String>,
    pub level: DqLevel,
    pub field: String,
    pub message: String,
}

// ==========================================
// DqSummary - 数据质量汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DqSummary {
    pub total_rows: usize,
    pub success: usize,
    pub blocked: usize,
    pub warning: usize,
    pub conflict: usize,
}

// ==========================================
// DqReport - 数据质量报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqReport {
    pub batch_id: String,
    pub summary: DqSummary,
    pub violations: Vec<DqViolation>,
}

// ==========================================
// ImportResult - 导入结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub batch: ImportBatch,
    pub summary: DqSummary,
    pub violations: Vec<DqViolation>,
    pub elapsed_time: std::time::Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(SourceFormat::from_extension("CSV"), Some(SourceFormat::Csv));
        assert_eq!(SourceFormat::from_extension("xls"), Some(SourceFormat::Excel));
        assert_eq!(SourceFormat::from_extension("htm"), Some(SourceFormat::Html));
        assert_eq!(SourceFormat::from_extension("pdf"), None);
    }

    #[test]
    fn test_import_context_deserializes_codes() {
        let ctx: ImportContext = serde_json::from_str(
            r#"{"division":"HC","year":2025,"value_type":"KGS","record_type":"BUDGET","source_unit":"MT"}"#,
        )
        .unwrap();
        assert_eq!(ctx.division, Some(Division::Hc));
        assert_eq!(ctx.value_type, Some(ValueType::Kgs));
        assert_eq!(ctx.source_unit, Some(Unit::Mt));
        assert!(ctx.sales_rep.is_none());
    }
}

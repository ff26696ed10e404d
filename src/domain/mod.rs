// ==========================================
// 销售预算报表系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod fact;
pub mod import;
pub mod merge_rule;
pub mod report;
pub mod types;

// 重导出核心类型
pub use fact::{Fact, FactKey, FactRecordInput, RawFactRecord};
pub use import::{
    DqLevel, DqReport, DqSummary, DqViolation, ImportBatch, ImportContext, ImportResult,
    SourceFormat,
};
pub use merge_rule::{MergeRule, MergeRuleInput, MergeRuleOverlap, ValidatedMergeRule};
pub use report::{AggregatedRow, AggregationReport, CustomerResolution};
pub use types::{canonical_name, Division, Quantity, RecordType, Unit, ValueType, KG_PER_MT};

// ==========================================
// 销售预算报表系统 - 预算导入 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 管道: 解析 → 字段映射 → 清洗 → DQ 校验 → 单位归一 → 落库
// ==========================================

use crate::domain::fact::{Fact, FactRecordInput, RawFactRecord};
use crate::domain::import::{DqReport, DqSummary, DqViolation, ImportContext, ImportResult};
use crate::importer::error::ImporterResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// BudgetImporter Trait
// ==========================================
// 用途: 预算导入主接口
// 实现者: BudgetImporterImpl
#[async_trait]
pub trait BudgetImporter: Send + Sync {
    /// 从文件导入（按扩展名选择解析器）
    ///
    /// # 参数
    /// - file_path: .csv / .xlsx / .xls / .html
    /// - context: 上传上下文（补齐行内缺失字段）
    ///
    /// # 返回
    /// - Ok(ImportResult): 批次信息 + DQ 汇总 + 违规明细
    /// - Err: 文件读取错误、格式错误、数据库错误
    async fn import_from_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        context: ImportContext,
    ) -> ImporterResult<ImportResult>;

    /// 从内存中的上传内容导入
    async fn import_from_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        context: ImportContext,
    ) -> ImporterResult<ImportResult>;

    /// 导入已结构化的扁平记录（跳过解析与字段映射）
    async fn import_records(
        &self,
        records: Vec<FactRecordInput>,
        context: ImportContext,
    ) -> ImporterResult<ImportResult>;

    /// 批量导入多个文件（并发执行）
    ///
    /// # 说明
    /// - 每个文件独立成批，某个文件失败不影响其他文件
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
        context: ImportContext,
    ) -> Vec<Result<ImportResult, String>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser, ExcelParser, HtmlEmbeddedParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录（HashMap<列名, 值>）
    fn parse_to_raw_records(&self, file_path: &Path) -> ImporterResult<Vec<HashMap<String, String>>>;

    /// 解析内存内容
    ///
    /// # 参数
    /// - extension: 小写扩展名（Excel 需区分 xlsx / xls）
    fn parse_bytes(
        &self,
        bytes: &[u8],
        extension: &str,
    ) -> ImporterResult<Vec<HashMap<String, String>>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 字段映射接口（阶段 1）
// 实现者: FieldMapperImpl
pub trait FieldMapper: Send + Sync {
    /// 将原始行映射为记录
    ///
    /// # 说明
    /// - 宽表行（Jan..Dec 列）展开为每个非空月份一条
    /// - 数值无法解析时记入 invalid_fields，由 DQ 阶段阻断
    fn map_to_raw_records(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> Vec<RawFactRecord>;

    /// 用上传上下文补齐缺失字段（行内值优先）
    fn apply_context(&self, record: &mut RawFactRecord, context: &ImportContext);
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 数据清洗接口（阶段 2）
// 实现者: DataCleanerImpl
pub trait DataCleaner: Send + Sync {
    /// 清洗名称文本（TRIM + 压缩内部连续空白）
    fn clean_text(&self, value: &str) -> String;

    /// 标准化 NULL 值（空字符串/空白 → None）
    fn normalize_null(&self, value: Option<String>) -> Option<String>;

    /// 清洗整条记录
    fn clean_record(&self, record: RawFactRecord) -> RawFactRecord;
}

// ==========================================
// DqValidator Trait
// ==========================================
// 用途: 数据质量校验接口（阶段 3）
// 实现者: DqValidatorImpl

/// 校验结果
#[derive(Debug, Clone, Default)]
pub struct DqOutcome {
    /// 通过校验的 (行号, 事实)，同文件重复键仅保留最后一条
    pub facts: Vec<(usize, Fact)>,
    /// 全部违规（ERROR / WARNING / CONFLICT）
    pub violations: Vec<DqViolation>,
    pub summary: DqSummary,
}

pub trait DqValidator: Send + Sync {
    /// 校验并转换为事实
    fn validate(&self, records: Vec<RawFactRecord>) -> DqOutcome;

    /// 生成 DQ 报告（随批次落库）
    fn generate_dq_report(&self, batch_id: &str, outcome: &DqOutcome) -> DqReport {
        DqReport {
            batch_id: batch_id.to_string(),
            summary: outcome.summary.clone(),
            violations: outcome.violations.clone(),
        }
    }
}

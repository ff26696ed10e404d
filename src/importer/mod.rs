// ==========================================
// 销售预算报表系统 - 导入层
// ==========================================
// 职责: 外部预算/实绩数据导入,生成事实数据
// 支持: Excel, CSV, 内嵌 JSON 的 HTML 导出文件, 扁平 JSON 记录
// ==========================================

// 模块声明
pub mod budget_importer_impl;
pub mod budget_importer_trait;
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;

// 重导出核心类型
pub use budget_importer_impl::BudgetImporterImpl;
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use dq_validator::DqValidator as DqValidatorImpl;
pub use error::{ImportError, ImporterResult};
pub use field_mapper::{parse_month, FieldMapper as FieldMapperImpl};
pub use file_parser::{CsvParser, ExcelParser, HtmlEmbeddedParser, UniversalFileParser};

// 重导出 Trait 接口
pub use budget_importer_trait::{
    BudgetImporter, DataCleaner, DqOutcome, DqValidator, FieldMapper, FileParser,
};

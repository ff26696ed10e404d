// ==========================================
// 销售预算报表系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 HTTP 路由与命令行工具调用
// ==========================================

pub mod config_api;
pub mod error;
pub mod import_api;
pub mod merge_rule_api;
pub mod report_api;

// 重导出核心类型
pub use config_api::ConfigApi;
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportApiResponse, DEFAULT_BATCH_LIMIT};
pub use merge_rule_api::{validate_merge_rule, MergeRuleApi};
pub use report_api::ReportApi;

// ==========================================
// 销售预算报表系统 - 核心库
// ==========================================
// 技术栈: axum + Rust + SQLite
// 系统定位: 按事业部存储销售/预算事实，按客户合并规则汇总报表
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 客户合并与汇总
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - HTTP 集成
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{canonical_name, Division, Quantity, RecordType, Unit, ValueType};

// 领域实体
pub use domain::{
    AggregatedRow, AggregationReport, Fact, ImportBatch, ImportContext, MergeRule,
    MergeRuleInput,
};

// 引擎
pub use engine::{aggregate, AggregationQuery, Aggregator, ReportError};

// API
pub use api::{ApiError, ConfigApi, ImportApi, MergeRuleApi, ReportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "销售预算报表系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

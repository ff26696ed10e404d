// ==========================================
// 销售预算报表系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod fact_repo;
pub mod import_batch_repo;
pub mod merge_rule_repo;
pub mod report_snapshot_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use fact_repo::{CustomerFactCount, FactRepository, FactScope};
pub use import_batch_repo::ImportBatchRepository;
pub use merge_rule_repo::{MergeRuleFilter, MergeRuleRepository};
pub use report_snapshot_repo::{ReportSnapshot, ReportSnapshotRepository};

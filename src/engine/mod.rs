// ==========================================
// 销售预算报表系统 - 引擎层
// ==========================================
// 职责: 客户合并 + 预算汇总（纯计算）
// 红线: Engine 不拼 SQL，不持有连接
// ==========================================

pub mod aggregator;
pub mod customer_merge;
pub mod error;

// 重导出核心引擎
pub use aggregator::{aggregate, AggregationQuery, Aggregator};
pub use customer_merge::{find_overlaps, MergeLookup, MergeTarget};
pub use error::{ReportError, ReportResult};

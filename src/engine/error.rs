// ==========================================
// 销售预算报表系统 - 报表引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束: 引擎不做重试，错误原样上抛
// ==========================================

use thiserror::Error;

/// 报表引擎错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    /// 查询参数不合法（事业部代码 / 年份）
    #[error("参数校验失败: {0}")]
    Validation(String),

    /// 事实表或合并规则表不可读
    #[error("数据源不可用: {0}")]
    StoreUnavailable(String),
}

/// Result 类型别名
pub type ReportResult<T> = Result<T, ReportError>;

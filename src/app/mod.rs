// ==========================================
// 销售预算报表系统 - 应用层
// ==========================================
// 职责: HTTP 集成,连接前端与后端
// ==========================================

pub mod http;
pub mod state;

// 重导出
pub use http::build_router;
pub use state::{get_bind_addr, get_default_db_path, AppState};

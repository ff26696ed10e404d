// ==========================================
// 销售预算报表系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 约束: 所有仓储共享同一个 SQLite 连接
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{ConfigApi, ImportApi, MergeRuleApi, ReportApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::BudgetImporterImpl;
use crate::repository::{
    FactRepository, ImportBatchRepository, MergeRuleRepository, ReportSnapshotRepository,
};

/// 默认监听地址
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8088";

/// 应用状态
///
/// 包含所有API实例和共享资源
/// 在 HTTP 路由中以 Arc<AppState> 共享
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 报表API
    pub report_api: Arc<ReportApi>,

    /// 合并规则API
    pub merge_rule_api: Arc<MergeRuleApi>,

    /// 预算导入API
    pub import_api: Arc<ImportApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并应用统一 PRAGMA
    /// 2. 建表（幂等）
    /// 3. 创建所有Repository与API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库结构初始化失败: {}", e))?;

        let mut state = Self::from_connection(Arc::new(Mutex::new(conn)));
        state.db_path = db_path;

        tracing::info!("AppState初始化完成");
        Ok(state)
    }

    /// 基于已打开（且已建表）的连接组装状态
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let fact_repo = Arc::new(FactRepository::from_connection(conn.clone()));
        let merge_rule_repo = Arc::new(MergeRuleRepository::from_connection(conn.clone()));
        let snapshot_repo = Arc::new(ReportSnapshotRepository::from_connection(conn.clone()));
        let batch_repo = Arc::new(ImportBatchRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()));

        // ==========================================
        // 初始化API层
        // ==========================================
        let report_api = Arc::new(ReportApi::new(
            snapshot_repo,
            fact_repo,
            merge_rule_repo.clone(),
            config_manager.clone(),
        ));
        let merge_rule_api = Arc::new(MergeRuleApi::new(merge_rule_repo));
        let importer = BudgetImporterImpl::with_default_components(conn, config_manager.clone());
        let import_api = Arc::new(ImportApi::new(importer, batch_repo));
        let config_api = Arc::new(ConfigApi::new(config_manager));

        Self {
            db_path: String::new(),
            report_api,
            merge_rule_api,
            import_api,
            config_api,
        }
    }
}

/// 获取默认数据库路径
///
/// 优先级: SALES_REPORT_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("SALES_REPORT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./sales_report.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("sales-budget-report");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("sales_report.db");
        }
    }

    path.to_string_lossy().to_string()
}

/// 获取监听地址（SALES_REPORT_BIND，默认 127.0.0.1:8088）
pub fn get_bind_addr() -> String {
    std::env::var("SALES_REPORT_BIND")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
}

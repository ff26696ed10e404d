// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用辅助函数
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::{Arc, Mutex};

use axum::Router;
use tempfile::NamedTempFile;

use sales_budget_report::api::{ConfigApi, ImportApi, MergeRuleApi, ReportApi};
use sales_budget_report::app::{build_router, AppState};
use sales_budget_report::config::ConfigManager;
use sales_budget_report::db::open_sqlite_connection;
use sales_budget_report::domain::Fact;
use sales_budget_report::repository::{FactRepository, ImportBatchRepository};

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 包含所有API实例和必要的依赖（共享同一个连接）
pub struct ApiTestEnv {
    pub db_path: String,
    pub state: Arc<AppState>,
    pub report_api: Arc<ReportApi>,
    pub merge_rule_api: Arc<MergeRuleApi>,
    pub import_api: Arc<ImportApi>,
    pub config_api: Arc<ConfigApi>,

    // Repository层（用于测试数据准备）
    pub fact_repo: Arc<FactRepository>,
    pub batch_repo: Arc<ImportBatchRepository>,
    pub config_manager: Arc<ConfigManager>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建新的API测试环境
    ///
    /// # 说明
    /// - 使用临时数据库文件
    /// - 初始化所有Repository和API
    pub fn new() -> Result<Self, String> {
        let (temp_file, db_path) = test_helpers::create_test_db()
            .map_err(|e| format!("创建测试数据库失败: {}", e))?;

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let state = Arc::new(AppState::from_connection(conn.clone()));

        Ok(Self {
            db_path,
            report_api: state.report_api.clone(),
            merge_rule_api: state.merge_rule_api.clone(),
            import_api: state.import_api.clone(),
            config_api: state.config_api.clone(),
            state,
            fact_repo: Arc::new(FactRepository::from_connection(conn.clone())),
            batch_repo: Arc::new(ImportBatchRepository::from_connection(conn.clone())),
            config_manager: Arc::new(ConfigManager::from_connection(conn)),
            _temp_file: temp_file,
        })
    }

    /// 直接写入事实（绕过导入流程）
    pub fn seed_facts(&self, facts: &[Fact]) {
        self.fact_repo
            .upsert_many(facts, None)
            .expect("写入测试事实失败");
    }

    /// 通过独立连接删除一张表，模拟存储损坏
    pub fn drop_table(&self, table: &str) {
        let conn = open_sqlite_connection(&self.db_path).expect("无法打开数据库");
        conn.execute_batch(&format!("DROP TABLE {}", table))
            .expect("删除表失败");
    }

    /// HTTP 路由（与生产入口相同的装配）
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }
}

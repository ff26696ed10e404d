// ==========================================
// 销售预算报表系统 - 配置管理 API
// ==========================================
// 职责: 配置查询、更新、快照
// ==========================================

use std::sync::Arc;

use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigEntry, ConfigManager};

/// 配置管理API
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    /// 查询所有配置
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigEntry>> {
        Ok(self.config_manager.list_all()?)
    }

    /// 查询单个配置
    pub fn get_config(&self, key: &str) -> ApiResult<String> {
        self.config_manager
            .get(key)?
            .ok_or_else(|| ApiError::NotFound(format!("配置项 {} 不存在", key)))
    }

    /// 更新配置
    ///
    /// # 返回
    /// - Err(InvalidInput): 已知键的取值不合法
    pub fn update_config(&self, key: &str, value: &str) -> ApiResult<()> {
        self.config_manager.set(key, value)?;
        info!(key = %key, value = %value, "配置已更新");
        Ok(())
    }

    /// 配置快照（JSON）
    pub fn get_config_snapshot(&self) -> ApiResult<String> {
        Ok(self.config_manager.get_config_snapshot()?)
    }
}

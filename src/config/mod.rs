// ==========================================
// 销售预算报表系统 - 配置层
// ==========================================
// 职责: 运行期配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigEntry, ConfigManager, DEFAULT_MAX_ROWS};
pub use import_config_trait::{ImportConfigReader, ReplaceMode};

// ==========================================
// 销售预算报表系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::import_config_trait::{ImportConfigReader, ReplaceMode};
use crate::db::open_sqlite_connection;
use crate::domain::types::Unit;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// 默认单次导入最大记录数
pub const DEFAULT_MAX_ROWS: usize = 100_000;

// ==========================================
// ConfigEntry - 配置项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取配置值，带默认值
    fn get_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值（已知键会先做格式校验）
    ///
    /// # 返回
    /// - Err(ValidationError): 键为空或已知键的值不合法
    pub fn set(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(RepositoryError::ValidationError("配置键不能为空".to_string()));
        }
        let value = value.trim();
        validate_value(key, value)?;

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now()],
        )?;
        Ok(())
    }

    /// 列出全部配置（按键排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<ConfigEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key, value, updated_at FROM config_kv ORDER BY key")?;
        let entries = stmt
            .query_map([], |row| {
                Ok(ConfigEntry {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 记入导入批次，便于追溯当时的导入口径
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let config_map: BTreeMap<String, String> = self
            .list_all()?
            .into_iter()
            .map(|e| (e.key, e.value))
            .collect();

        serde_json::to_string(&json!(config_map))
            .map_err(|e| RepositoryError::InternalError(e.to_string()))
    }

    // ===== 类型化读取 =====

    pub fn replace_mode(&self) -> RepositoryResult<ReplaceMode> {
        let value = self.get_or_default(config_keys::IMPORT_REPLACE_MODE, "TUPLE")?;
        Ok(ReplaceMode::from_str(&value).unwrap_or_else(|| {
            warn!(config_key = config_keys::IMPORT_REPLACE_MODE, raw_value = %value, "配置格式错误，使用 TUPLE");
            ReplaceMode::Tuple
        }))
    }

    pub fn max_rows(&self) -> RepositoryResult<usize> {
        let value = self.get_or_default(config_keys::IMPORT_MAX_ROWS, "100000")?;
        Ok(value
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_ROWS))
    }

    pub fn default_source_unit(&self) -> RepositoryResult<Unit> {
        let value = self.get_or_default(config_keys::IMPORT_DEFAULT_SOURCE_UNIT, "KG")?;
        match Unit::from_str(&value) {
            Some(unit @ (Unit::Kg | Unit::Mt)) => Ok(unit),
            _ => {
                warn!(config_key = config_keys::IMPORT_DEFAULT_SOURCE_UNIT, raw_value = %value, "配置格式错误，使用 KG");
                Ok(Unit::Kg)
            }
        }
    }

    /// 报表默认展示单位
    ///
    /// # 返回
    /// - None: 未配置，按数值类型的基础单位展示
    pub fn report_default_unit(&self) -> RepositoryResult<Option<Unit>> {
        Ok(self
            .get(config_keys::REPORT_DEFAULT_UNIT)?
            .and_then(|v| Unit::from_str(&v)))
    }
}

/// 已知键的取值校验；未知键原样接受
fn validate_value(key: &str, value: &str) -> RepositoryResult<()> {
    let ok = match key {
        config_keys::IMPORT_REPLACE_MODE => ReplaceMode::from_str(value).is_some(),
        config_keys::IMPORT_MAX_ROWS => value.parse::<usize>().map(|n| n > 0).unwrap_or(false),
        config_keys::IMPORT_DEFAULT_SOURCE_UNIT => {
            matches!(Unit::from_str(value), Some(Unit::Kg | Unit::Mt))
        }
        config_keys::REPORT_DEFAULT_UNIT => Unit::from_str(value).is_some(),
        _ => true,
    };

    if ok {
        Ok(())
    } else {
        Err(RepositoryError::FieldValueError {
            field: key.to_string(),
            message: format!("非法取值: {}", value),
        })
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_replace_mode(&self) -> RepositoryResult<ReplaceMode> {
        self.replace_mode()
    }

    async fn get_max_rows(&self) -> RepositoryResult<usize> {
        self.max_rows()
    }

    async fn get_default_source_unit(&self) -> RepositoryResult<Unit> {
        self.default_source_unit()
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导入
    pub const IMPORT_REPLACE_MODE: &str = "import.replace_mode";
    pub const IMPORT_MAX_ROWS: &str = "import.max_rows";
    pub const IMPORT_DEFAULT_SOURCE_UNIT: &str = "import.default_source_unit";

    // 报表
    pub const REPORT_DEFAULT_UNIT: &str = "report.default_unit";
}

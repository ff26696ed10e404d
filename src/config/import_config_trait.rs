// ==========================================
// 销售预算报表系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::Unit;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ReplaceMode - 导入覆盖模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplaceMode {
    /// 仅按事实元组 upsert
    Tuple,
    /// 先删除 (事业部, 年份, 记录类型, 数值类型, 文件内销售员) 范围，再写入
    Scope,
}

impl ReplaceMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TUPLE" => Some(ReplaceMode::Tuple),
            "SCOPE" => Some(ReplaceMode::Scope),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReplaceMode::Tuple => "TUPLE",
            ReplaceMode::Scope => "SCOPE",
        }
    }
}

impl fmt::Display for ReplaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取导入覆盖模式
    ///
    /// # 默认值
    /// - TUPLE
    async fn get_replace_mode(&self) -> RepositoryResult<ReplaceMode>;

    /// 获取单次导入的最大记录数（超出则拒绝整个文件）
    ///
    /// # 默认值
    /// - 100000
    async fn get_max_rows(&self) -> RepositoryResult<usize>;

    /// 获取 KGS 源文件的默认单位（上传上下文未声明时使用）
    ///
    /// # 默认值
    /// - KG
    async fn get_default_source_unit(&self) -> RepositoryResult<Unit>;
}

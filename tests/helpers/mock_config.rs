// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use sales_budget_report::config::{ImportConfigReader, ReplaceMode};
use sales_budget_report::repository::RepositoryResult;
use sales_budget_report::Unit;

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub replace_mode: ReplaceMode,
    pub max_rows: usize,
    pub default_source_unit: Unit,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            replace_mode: ReplaceMode::Tuple,
            max_rows: 100_000,
            default_source_unit: Unit::Kg,
        }
    }
}

impl MockConfig {
    /// 范围覆盖模式
    pub fn scope_mode() -> Self {
        Self {
            replace_mode: ReplaceMode::Scope,
            ..Self::default()
        }
    }

    /// 限制单次导入记录数
    pub fn with_max_rows(max_rows: usize) -> Self {
        Self {
            max_rows,
            ..Self::default()
        }
    }

    /// KGS 源文件默认以吨计
    pub fn tonnes() -> Self {
        Self {
            default_source_unit: Unit::Mt,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ImportConfigReader for MockConfig {
    async fn get_replace_mode(&self) -> RepositoryResult<ReplaceMode> {
        Ok(self.replace_mode)
    }

    async fn get_max_rows(&self) -> RepositoryResult<usize> {
        Ok(self.max_rows)
    }

    async fn get_default_source_unit(&self) -> RepositoryResult<Unit> {
        Ok(self.default_source_unit)
    }
}

// ==========================================
// 销售预算报表系统 - 预算导入 API
// ==========================================
// 职责: 封装导入器；批次查询
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::fact::FactRecordInput;
use crate::domain::import::{
    DqSummary, DqViolation, ImportBatch, ImportContext, ImportResult, SourceFormat,
};
use crate::importer::{BudgetImporter, BudgetImporterImpl};
use crate::repository::{ImportBatchRepository, RepositoryError};

/// 批次列表默认条数 / 上限
pub const DEFAULT_BATCH_LIMIT: usize = 50;
const MAX_BATCH_LIMIT: usize = 500;

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 导入批次ID
    pub batch_id: String,
    pub file_name: Option<String>,
    pub source_format: SourceFormat,
    /// DQ 汇总统计（成功/阻断/警告/冲突）
    pub dq_summary: DqSummary,
    /// DQ 违规明细（用于前端定位问题）
    pub dq_violations: Vec<DqViolation>,
    /// 导入耗时（毫秒）
    pub elapsed_ms: i64,
}

impl From<ImportResult> for ImportApiResponse {
    fn from(result: ImportResult) -> Self {
        Self {
            batch_id: result.batch.batch_id,
            file_name: result.batch.file_name,
            source_format: result.batch.source_format,
            dq_summary: result.summary,
            dq_violations: result.violations,
            elapsed_ms: result.elapsed_time.as_millis() as i64,
        }
    }
}

/// 导入API
pub struct ImportApi {
    importer: BudgetImporterImpl<ConfigManager>,
    batch_repo: Arc<ImportBatchRepository>,
}

impl ImportApi {
    pub fn new(
        importer: BudgetImporterImpl<ConfigManager>,
        batch_repo: Arc<ImportBatchRepository>,
    ) -> Self {
        Self {
            importer,
            batch_repo,
        }
    }

    /// 从服务器本地文件导入
    pub async fn import_file(
        &self,
        file_path: &str,
        context: ImportContext,
    ) -> ApiResult<ImportApiResponse> {
        if file_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件路径不能为空".to_string()));
        }
        let result = self.importer.import_from_file(file_path, context).await?;
        Ok(result.into())
    }

    /// 导入上传内容（按文件名扩展名选择解析器）
    pub async fn import_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        context: ImportContext,
    ) -> ApiResult<ImportApiResponse> {
        if bytes.is_empty() {
            return Err(ApiError::InvalidInput("上传文件为空".to_string()));
        }
        let result = self
            .importer
            .import_from_bytes(file_name, bytes, context)
            .await?;
        Ok(result.into())
    }

    /// 导入扁平记录
    pub async fn import_records(
        &self,
        context: ImportContext,
        records: Vec<FactRecordInput>,
    ) -> ApiResult<ImportApiResponse> {
        let result = self.importer.import_records(records, context).await?;
        Ok(result.into())
    }

    /// 最近的导入批次
    pub fn list_batches(&self, limit: Option<usize>) -> ApiResult<Vec<ImportBatch>> {
        let limit = limit.unwrap_or(DEFAULT_BATCH_LIMIT).clamp(1, MAX_BATCH_LIMIT);
        Ok(self.batch_repo.list_recent(limit)?)
    }

    pub fn get_batch(&self, batch_id: &str) -> ApiResult<ImportBatch> {
        self.batch_repo.find_by_id(batch_id)?.ok_or_else(|| {
            RepositoryError::NotFound {
                entity: "ImportBatch".to_string(),
                id: batch_id.to_string(),
            }
            .into()
        })
    }
}

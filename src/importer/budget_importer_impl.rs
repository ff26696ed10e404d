// ==========================================
// 销售预算报表系统 - 预算导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到数据库
// 流程: 解析 → 映射 → 补齐上下文 → 清洗 → 校验 → 单位归一 → 落库
// 事务: 范围删除 + 批次记录 + 事实 upsert 在同一事务内
// ==========================================

use crate::config::{ImportConfigReader, ReplaceMode};
use crate::domain::fact::{Fact, FactRecordInput, RawFactRecord};
use crate::domain::import::{ImportBatch, ImportContext, ImportResult, SourceFormat};
use crate::domain::types::{canonical_name, Division, Quantity, RecordType, Unit, ValueType};
use crate::importer::budget_importer_trait::{
    BudgetImporter, DataCleaner, DqValidator, FieldMapper,
};
use crate::importer::data_cleaner::DataCleaner as DataCleanerImpl;
use crate::importer::dq_validator::DqValidator as DqValidatorImpl;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::field_mapper::FieldMapper as FieldMapperImpl;
use crate::importer::file_parser::UniversalFileParser;
use crate::repository::{FactRepository, ImportBatchRepository};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ImportSettings - 单次导入使用的配置快照
// ==========================================
#[derive(Debug, Clone, Copy)]
struct ImportSettings {
    replace_mode: ReplaceMode,
    max_rows: usize,
    default_source_unit: Unit,
}

/// 管道输入
enum ImportInput {
    /// 文件解析出的原始行
    Rows(Vec<HashMap<String, String>>),
    /// 已结构化的扁平记录
    Records(Vec<FactRecordInput>),
}

/// 源信息（写入批次记录）
struct SourceInfo {
    file_name: Option<String>,
    source_format: SourceFormat,
}

// ==========================================
// ImportStages - 同步导入阶段（在阻塞线程中执行）
// ==========================================
#[derive(Clone)]
struct ImportStages {
    conn: Arc<Mutex<Connection>>,
    field_mapper: Arc<dyn FieldMapper>,
    data_cleaner: Arc<dyn DataCleaner>,
    dq_validator: Arc<dyn DqValidator>,
}

impl ImportStages {
    fn run(
        &self,
        input: ImportInput,
        source: SourceInfo,
        context: ImportContext,
        settings: ImportSettings,
    ) -> ImporterResult<ImportResult> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();

        // === 步骤 1: 字段映射 ===
        let mut records: Vec<RawFactRecord> = match input {
            ImportInput::Rows(rows) => rows
                .iter()
                .enumerate()
                .flat_map(|(idx, row)| self.field_mapper.map_to_raw_records(row, idx + 1))
                .collect(),
            ImportInput::Records(inputs) => inputs
                .into_iter()
                .enumerate()
                .map(|(idx, r)| r.into_raw(idx + 1))
                .collect(),
        };

        if records.len() > settings.max_rows {
            warn!(actual = records.len(), limit = settings.max_rows, "导入行数超出上限");
            return Err(ImportError::RowLimitExceeded {
                actual: records.len(),
                limit: settings.max_rows,
            });
        }
        debug!(records = records.len(), "字段映射完成");

        // === 步骤 2: 上下文补齐 + 清洗 ===
        for record in &mut records {
            self.field_mapper.apply_context(record, &context);
        }
        let records: Vec<RawFactRecord> = records
            .into_iter()
            .map(|r| self.data_cleaner.clean_record(r))
            .collect();

        // === 步骤 3: DQ 校验 ===
        let outcome = self.dq_validator.validate(records);
        if outcome.summary.blocked > 0 {
            warn!(
                batch_id = %batch_id,
                blocked = outcome.summary.blocked,
                "DQ 校验阻断部分记录"
            );
        }
        info!(
            total = outcome.summary.total_rows,
            success = outcome.summary.success,
            blocked = outcome.summary.blocked,
            warning = outcome.summary.warning,
            conflict = outcome.summary.conflict,
            "DQ 校验完成"
        );

        // === 步骤 4: 单位归一（KGS 源单位 → 千克）===
        let source_unit = context.source_unit.unwrap_or(settings.default_source_unit);
        let facts: Vec<Fact> = outcome
            .facts
            .iter()
            .map(|(_, fact)| normalize_unit(fact.clone(), source_unit))
            .collect();

        // === 步骤 5: 落库 ===
        let dq_report = self.dq_validator.generate_dq_report(&batch_id, &outcome);
        let elapsed_time = start_time.elapsed();
        let batch = ImportBatch {
            batch_id: batch_id.clone(),
            division: context.division,
            year: context.year,
            record_type: context.record_type,
            value_type: context.value_type,
            sales_rep: context.sales_rep.clone(),
            file_name: source.file_name,
            source_format: source.source_format,
            total_rows: outcome.summary.total_rows as i32,
            success_rows: outcome.summary.success as i32,
            blocked_rows: outcome.summary.blocked as i32,
            warning_rows: outcome.summary.warning as i32,
            imported_at: Utc::now(),
            imported_by: Some(
                context
                    .imported_by
                    .clone()
                    .unwrap_or_else(|| "system".to_string()),
            ),
            elapsed_ms: elapsed_time.as_millis() as i64,
            dq_report_json: Some(serde_json::to_string(&dq_report)?),
        };

        let deleted = self.persist(&batch, &facts, settings.replace_mode)?;

        info!(
            batch_id = %batch_id,
            replace_mode = %settings.replace_mode,
            deleted = deleted,
            written = facts.len(),
            elapsed_ms = elapsed_time.as_millis() as u64,
            "预算数据导入完成"
        );

        Ok(ImportResult {
            batch,
            summary: outcome.summary,
            violations: outcome.violations,
            elapsed_time,
        })
    }

    /// 单事务落库；返回 SCOPE 模式删除的行数
    fn persist(
        &self,
        batch: &ImportBatch,
        facts: &[Fact],
        replace_mode: ReplaceMode,
    ) -> ImporterResult<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::DatabaseConnectionError(format!("锁获取失败: {}", e)))?;
        let tx = conn.unchecked_transaction()?;

        let mut deleted = 0;
        if replace_mode == ReplaceMode::Scope {
            for ((division, year, value_type, record_type), reps) in replace_scopes(facts) {
                let reps: Vec<String> = reps.into_iter().collect();
                deleted += FactRepository::delete_scope_tx(
                    &tx,
                    division,
                    year,
                    value_type,
                    record_type,
                    &reps,
                )?;
            }
        }

        // 批次记录先于事实写入（事实引用批次号）
        ImportBatchRepository::insert_tx(&tx, batch)?;
        FactRepository::upsert_batch_tx(&tx, facts, Some(&batch.batch_id))?;

        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;
        Ok(deleted)
    }
}

/// KGS 事实按源单位换算为千克；其余数值类型不换算
fn normalize_unit(mut fact: Fact, source_unit: Unit) -> Fact {
    if fact.value_type == ValueType::Kgs && source_unit == Unit::Mt {
        if let Some(q) = Quantity::new(fact.value, Unit::Mt).convert_to(Unit::Kg) {
            fact.value = q.value;
        }
    }
    fact
}

/// SCOPE 模式的删除范围: (事业部, 年份, 数值类型, 记录类型) → 文件内销售员键
fn replace_scopes(
    facts: &[Fact],
) -> HashMap<(Division, i32, ValueType, RecordType), BTreeSet<String>> {
    let mut scopes: HashMap<_, BTreeSet<String>> = HashMap::new();
    for fact in facts {
        scopes
            .entry((fact.division, fact.year, fact.value_type, fact.record_type))
            .or_default()
            .insert(canonical_name(&fact.sales_rep));
    }
    scopes
}

/// 上传上下文校验
fn check_context(context: &ImportContext) -> ImporterResult<()> {
    if let Some(year) = context.year {
        if year <= 0 {
            return Err(ImportError::InvalidContext(format!("年份必须为正整数: {}", year)));
        }
    }
    if let Some(unit) = context.source_unit {
        if !matches!(unit, Unit::Kg | Unit::Mt) {
            return Err(ImportError::InvalidContext(format!(
                "源单位仅支持 KG / MT: {}",
                unit
            )));
        }
    }
    Ok(())
}

fn source_format_of(file_name: &str) -> ImporterResult<SourceFormat> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    SourceFormat::from_extension(ext)
        .filter(|f| *f != SourceFormat::Json)
        .ok_or_else(|| ImportError::UnsupportedFormat(ext.to_string()))
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
}

// ==========================================
// BudgetImporterImpl - 预算导入器实现
// ==========================================
pub struct BudgetImporterImpl<C>
where
    C: ImportConfigReader,
{
    // 数据库连接（与仓储层共享）
    conn: Arc<Mutex<Connection>>,

    // 配置读取器
    config: Arc<C>,

    // 导入组件
    field_mapper: Arc<dyn FieldMapper>,
    data_cleaner: Arc<dyn DataCleaner>,
    dq_validator: Arc<dyn DqValidator>,
}

impl<C> BudgetImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// 创建导入器
    ///
    /// # 参数
    /// - conn: 共享数据库连接
    /// - config: 配置读取器
    /// - field_mapper / data_cleaner / dq_validator: 导入组件
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        config: Arc<C>,
        field_mapper: Arc<dyn FieldMapper>,
        data_cleaner: Arc<dyn DataCleaner>,
        dq_validator: Arc<dyn DqValidator>,
    ) -> Self {
        Self {
            conn,
            config,
            field_mapper,
            data_cleaner,
            dq_validator,
        }
    }

    /// 使用默认组件创建导入器
    pub fn with_default_components(conn: Arc<Mutex<Connection>>, config: Arc<C>) -> Self {
        Self::new(
            conn,
            config,
            Arc::new(FieldMapperImpl),
            Arc::new(DataCleanerImpl),
            Arc::new(DqValidatorImpl::new()),
        )
    }

    fn stages(&self) -> ImportStages {
        ImportStages {
            conn: self.conn.clone(),
            field_mapper: self.field_mapper.clone(),
            data_cleaner: self.data_cleaner.clone(),
            dq_validator: self.dq_validator.clone(),
        }
    }

    async fn load_settings(&self) -> ImporterResult<ImportSettings> {
        Ok(ImportSettings {
            replace_mode: self.config.get_replace_mode().await?,
            max_rows: self.config.get_max_rows().await?,
            default_source_unit: self.config.get_default_source_unit().await?,
        })
    }

    /// 在阻塞线程中执行（解析 +）同步阶段
    async fn run_blocking<F>(&self, job: F) -> ImporterResult<ImportResult>
    where
        F: FnOnce(ImportStages) -> ImporterResult<ImportResult> + Send + 'static,
    {
        let stages = self.stages();
        tokio::task::spawn_blocking(move || job(stages))
            .await
            .map_err(|e| ImportError::InternalError(format!("导入任务执行失败: {}", e)))?
    }
}

#[async_trait]
impl<C> BudgetImporter for BudgetImporterImpl<C>
where
    C: ImportConfigReader + 'static,
{
    #[instrument(skip(self, file_path, context))]
    async fn import_from_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        context: ImportContext,
    ) -> ImporterResult<ImportResult> {
        let path: PathBuf = file_path.as_ref().to_path_buf();
        info!(file_path = %path.display(), "开始导入预算文件");

        check_context(&context)?;
        let source = SourceInfo {
            file_name: file_name_of(&path),
            source_format: source_format_of(&path.to_string_lossy())?,
        };
        let settings = self.load_settings().await?;

        self.run_blocking(move |stages| {
            let rows = UniversalFileParser.parse(&path).map_err(|e| {
                error!(error = %e, "文件解析失败");
                e
            })?;
            info!(rows = rows.len(), "文件解析完成");
            stages.run(ImportInput::Rows(rows), source, context, settings)
        })
        .await
    }

    #[instrument(skip(self, bytes, context), fields(size = bytes.len()))]
    async fn import_from_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        context: ImportContext,
    ) -> ImporterResult<ImportResult> {
        info!(file_name = %file_name, "开始导入上传内容");

        check_context(&context)?;
        let source = SourceInfo {
            file_name: Some(file_name.to_string()),
            source_format: source_format_of(file_name)?,
        };
        let settings = self.load_settings().await?;
        let file_name = file_name.to_string();

        self.run_blocking(move |stages| {
            let rows = UniversalFileParser.parse_bytes(&file_name, &bytes)?;
            info!(rows = rows.len(), "上传内容解析完成");
            stages.run(ImportInput::Rows(rows), source, context, settings)
        })
        .await
    }

    #[instrument(skip(self, records, context), fields(count = records.len()))]
    async fn import_records(
        &self,
        records: Vec<FactRecordInput>,
        context: ImportContext,
    ) -> ImporterResult<ImportResult> {
        check_context(&context)?;
        let source = SourceInfo {
            file_name: None,
            source_format: SourceFormat::Json,
        };
        let settings = self.load_settings().await?;

        self.run_blocking(move |stages| {
            stages.run(ImportInput::Records(records), source, context, settings)
        })
        .await
    }

    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
        context: ImportContext,
    ) -> Vec<Result<ImportResult, String>> {
        use futures::future::join_all;

        info!(count = file_paths.len(), "开始批量导入文件");

        let import_tasks = file_paths.into_iter().map(|path| {
            let path_str = path.as_ref().to_string_lossy().to_string();
            let context = context.clone();
            async move {
                match self.import_from_file(path, context).await {
                    Ok(result) => {
                        info!(file = %path_str, success = result.summary.success, "文件导入成功");
                        Ok(result)
                    }
                    Err(e) => {
                        error!(file = %path_str, error = %e, "文件导入失败");
                        Err(format!("文件 {} 导入失败: {}", path_str, e))
                    }
                }
            }
        });

        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );

        results
    }
}

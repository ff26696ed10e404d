// ==========================================
// 销售预算报表系统 - 导入批次仓储
// ==========================================
// 职责: 管理 import_batch 表（每次上传一行，含 DQ 报告）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::{ImportBatch, SourceFormat};
use crate::domain::types::{Division, RecordType, ValueType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const BATCH_COLUMNS: &str = "batch_id, division, year, record_type, value_type, sales_rep, \
                             file_name, source_format, total_rows, success_rows, blocked_rows, \
                             warning_rows, imported_at, imported_by, elapsed_ms, dq_report_json";

fn map_batch_row(row: &Row) -> SqliteResult<ImportBatch> {
    let division: Option<String> = row.get(1)?;
    let record_type: Option<String> = row.get(3)?;
    let value_type: Option<String> = row.get(4)?;
    let source_format: String = row.get(7)?;

    Ok(ImportBatch {
        batch_id: row.get(0)?,
        division: division.as_deref().and_then(Division::from_str),
        year: row.get(2)?,
        record_type: record_type.as_deref().and_then(RecordType::from_str),
        value_type: value_type.as_deref().and_then(ValueType::from_str),
        sales_rep: row.get(5)?,
        file_name: row.get(6)?,
        source_format: SourceFormat::from_db_str(&source_format),
        total_rows: row.get(8)?,
        success_rows: row.get(9)?,
        blocked_rows: row.get(10)?,
        warning_rows: row.get(11)?,
        imported_at: row.get(12)?,
        imported_by: row.get(13)?,
        elapsed_ms: row.get(14)?,
        dq_report_json: row.get(15)?,
    })
}

pub struct ImportBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportBatchRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务中写入批次记录
    pub fn insert_tx(tx: &Transaction, batch: &ImportBatch) -> RepositoryResult<()> {
        tx.execute(
            &format!(
                "INSERT INTO import_batch ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                BATCH_COLUMNS
            ),
            params![
                batch.batch_id,
                batch.division.map(|d| d.to_db_str()),
                batch.year,
                batch.record_type.map(|r| r.to_db_str()),
                batch.value_type.map(|v| v.to_db_str()),
                batch.sales_rep,
                batch.file_name,
                batch.source_format.to_db_str(),
                batch.total_rows,
                batch.success_rows,
                batch.blocked_rows,
                batch.warning_rows,
                batch.imported_at,
                batch.imported_by,
                batch.elapsed_ms,
                batch.dq_report_json,
            ],
        )?;
        Ok(())
    }

    /// 写入批次记录（独立事务）
    pub fn insert(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        Self::insert_tx(&tx, batch)?;
        tx.commit()?;
        Ok(())
    }

    /// 最近的批次（按导入时间倒序）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM import_batch ORDER BY imported_at DESC, rowid DESC LIMIT ?1",
            BATCH_COLUMNS
        ))?;
        let batches = stmt
            .query_map(params![limit as i64], map_batch_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(batches)
    }

    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.get_conn()?;
        let batch = conn
            .query_row(
                &format!("SELECT {} FROM import_batch WHERE batch_id = ?1", BATCH_COLUMNS),
                params![batch_id],
                map_batch_row,
            )
            .optional()?;
        Ok(batch)
    }
}

// ==========================================
// 销售预算报表系统 - 事实数据仓储
// ==========================================
// 职责: 管理 sales_fact 表
// 唯一性: (division, year, month, sales_rep_key, customer, country,
//          product_group, value_type, record_type)
// 红线: 重新导入只替换匹配元组，不原地修改其他行
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::fact::Fact;
use crate::domain::types::{canonical_name, Division, RecordType, ValueType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const FACT_COLUMNS: &str = "division, year, month, sales_rep, customer, country, \
                            product_group, value_type, record_type, value";

/// 原始客户名的事实条数（诊断 / 合并规则维护用）
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerFactCount {
    pub sales_rep: String,
    pub customer: String,
    pub fact_count: i64,
}

/// 事实查询范围
#[derive(Debug, Clone, Copy)]
pub struct FactScope {
    pub division: Division,
    pub year: Option<i32>,
    pub value_type: Option<ValueType>,
    pub record_type: Option<RecordType>,
}

impl FactScope {
    pub fn division(division: Division) -> Self {
        Self {
            division,
            year: None,
            value_type: None,
            record_type: None,
        }
    }
}

fn conversion_error(idx: usize, field: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("无法识别的代码: {}", raw),
        }),
    )
}

/// 行映射（列顺序与 FACT_COLUMNS 一致）
fn map_fact_row(row: &Row) -> SqliteResult<Fact> {
    let division_raw: String = row.get(0)?;
    let value_type_raw: String = row.get(7)?;
    let record_type_raw: String = row.get(8)?;

    Ok(Fact {
        division: Division::from_str(&division_raw)
            .ok_or_else(|| conversion_error(0, "division", &division_raw))?,
        year: row.get(1)?,
        month: row.get(2)?,
        sales_rep: row.get(3)?,
        customer: row.get(4)?,
        country: row.get(5)?,
        product_group: row.get(6)?,
        value_type: ValueType::from_str(&value_type_raw)
            .ok_or_else(|| conversion_error(7, "value_type", &value_type_raw))?,
        record_type: RecordType::from_str(&record_type_raw)
            .ok_or_else(|| conversion_error(8, "record_type", &record_type_raw))?,
        value: row.get(9)?,
    })
}

/// 按范围读取事实（供快照读取在同一事务内复用）
pub(crate) fn query_facts(conn: &Connection, scope: &FactScope) -> RepositoryResult<Vec<Fact>> {
    let sql = format!(
        "SELECT {} FROM sales_fact
         WHERE division = ?1
           AND (?2 IS NULL OR year = ?2)
           AND (?3 IS NULL OR value_type = ?3)
           AND (?4 IS NULL OR record_type = ?4)
         ORDER BY id",
        FACT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let facts = stmt
        .query_map(
            params![
                scope.division.to_db_str(),
                scope.year,
                scope.value_type.map(|v| v.to_db_str()),
                scope.record_type.map(|r| r.to_db_str()),
            ],
            map_fact_row,
        )?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(facts)
}

// ==========================================
// FactRepository
// ==========================================
pub struct FactRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FactRepository {
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

    // ==========================================
    // 事务内操作（供导入器组合）
    // ==========================================

    /// 在事务中批量写入（冲突元组覆盖 value / 显示名 / 批次号）
    pub fn upsert_batch_tx(
        tx: &Transaction,
        facts: &[Fact],
        batch_id: Option<&str>,
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO sales_fact (
                division, year, month, sales_rep, sales_rep_key, customer, country,
                product_group, value_type, record_type, value, import_batch_id, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(division, year, month, sales_rep_key, customer, country,
                        product_group, value_type, record_type) DO UPDATE SET
                sales_rep = excluded.sales_rep,
                value = excluded.value,
                import_batch_id = excluded.import_batch_id,
                updated_at = excluded.updated_at
            "#,
        )?;

        let now = Utc::now();
        let mut count = 0;
        for fact in facts {
            let key = fact.key();
            stmt.execute(params![
                fact.division.to_db_str(),
                fact.year,
                fact.month,
                fact.sales_rep.trim(),
                key.sales_rep_key,
                key.customer,
                key.country,
                key.product_group,
                key.value_type,
                key.record_type,
                fact.value,
                batch_id,
                now,
            ])?;
            count += 1;
        }

        Ok(count)
    }

    /// 在事务中删除整段范围（SCOPE 替换模式）
    ///
    /// # 参数
    /// - sales_reps: 文件中出现的销售员（按规范化键匹配）
    pub fn delete_scope_tx(
        tx: &Transaction,
        division: Division,
        year: i32,
        value_type: ValueType,
        record_type: RecordType,
        sales_reps: &[String],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            "DELETE FROM sales_fact
             WHERE division = ?1 AND year = ?2 AND value_type = ?3
               AND record_type = ?4 AND sales_rep_key = ?5",
        )?;

        let mut deleted = 0;
        for rep in sales_reps {
            deleted += stmt.execute(params![
                division.to_db_str(),
                year,
                value_type.to_db_str(),
                record_type.to_db_str(),
                canonical_name(rep),
            ])?;
        }
        Ok(deleted)
    }

    // ==========================================
    // 独立操作
    // ==========================================

    /// 批量写入（单事务）
    pub fn upsert_many(&self, facts: &[Fact], batch_id: Option<&str>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let count = Self::upsert_batch_tx(&tx, facts, batch_id)?;
        tx.commit()?;
        Ok(count)
    }

    /// 按范围查询
    pub fn list_by_scope(&self, scope: &FactScope) -> RepositoryResult<Vec<Fact>> {
        let conn = self.get_conn()?;
        query_facts(&conn, scope)
    }

    /// 按 (销售员, 原始客户) 统计条数
    pub fn count_by_customer(
        &self,
        division: Division,
        sales_rep: Option<&str>,
    ) -> RepositoryResult<Vec<CustomerFactCount>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT MIN(sales_rep), customer, COUNT(*)
            FROM sales_fact
            WHERE division = ?1 AND (?2 IS NULL OR sales_rep_key = ?2)
            GROUP BY sales_rep_key, customer
            ORDER BY sales_rep_key, customer
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![division.to_db_str(), sales_rep.map(canonical_name)],
                |row| {
                    Ok(CustomerFactCount {
                        sales_rep: row.get(0)?,
                        customer: row.get(1)?,
                        fact_count: row.get(2)?,
                    })
                },
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 事实总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM sales_fact", [], |row| row.get(0))?;
        Ok(n)
    }
}

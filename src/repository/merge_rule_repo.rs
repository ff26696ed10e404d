// ==========================================
// 销售预算报表系统 - 客户合并规则仓储
// ==========================================
// 职责: 管理 customer_merge_rule / customer_merge_rule_member 表
// 约束: 规则与成员同事务写入；成员按 customer_key 去重
// 说明: 重叠规则不在存储层拒绝，由引擎按 id 决定优先级
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::merge_rule::{MergeRule, ValidatedMergeRule};
use crate::domain::types::{canonical_name, Division};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Transaction};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 规则查询条件
#[derive(Debug, Clone, Default)]
pub struct MergeRuleFilter {
    pub division: Option<Division>,
    pub sales_rep: Option<String>,
    pub active_only: bool,
}

struct RuleHeader {
    id: i64,
    division: Division,
    sales_rep: String,
    merged_customer_name: String,
    is_active: bool,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// 按条件读取规则（含成员），按 id 升序
pub(crate) fn query_rules(
    conn: &Connection,
    filter: &MergeRuleFilter,
) -> RepositoryResult<Vec<MergeRule>> {
    let division = filter.division.map(|d| d.to_db_str());
    let rep_key = filter.sales_rep.as_deref().map(canonical_name);

    let mut stmt = conn.prepare(
        r#"
        SELECT id, division, sales_rep, merged_customer_name, is_active, note,
               created_at, updated_at
        FROM customer_merge_rule
        WHERE (?1 IS NULL OR division = ?1)
          AND (?2 IS NULL OR sales_rep_key = ?2)
          AND (?3 = 0 OR is_active = 1)
        ORDER BY id
        "#,
    )?;

    let headers = stmt
        .query_map(params![division, rep_key, filter.active_only], |row| {
            let division_raw: String = row.get(1)?;
            let division = Division::from_str(&division_raw).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    Type::Text,
                    Box::new(RepositoryError::FieldValueError {
                        field: "division".to_string(),
                        message: format!("无法识别的代码: {}", division_raw),
                    }),
                )
            })?;
            Ok(RuleHeader {
                id: row.get(0)?,
                division,
                sales_rep: row.get(2)?,
                merged_customer_name: row.get(3)?,
                is_active: row.get(4)?,
                note: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })?
        .collect::<SqliteResult<Vec<_>>>()?;

    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let mut members = load_members(conn, division, rep_key.as_deref())?;

    Ok(headers
        .into_iter()
        .map(|h| MergeRule {
            original_customers: members.remove(&h.id).unwrap_or_default(),
            id: h.id,
            division: h.division,
            sales_rep: h.sales_rep,
            merged_customer_name: h.merged_customer_name,
            is_active: h.is_active,
            note: h.note,
            created_at: h.created_at,
            updated_at: h.updated_at,
        })
        .collect())
}

/// 读取成员（按写入顺序）
fn load_members(
    conn: &Connection,
    division: Option<&str>,
    rep_key: Option<&str>,
) -> RepositoryResult<HashMap<i64, Vec<String>>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT m.rule_id, m.original_customer
        FROM customer_merge_rule_member m
        JOIN customer_merge_rule r ON r.id = m.rule_id
        WHERE (?1 IS NULL OR r.division = ?1)
          AND (?2 IS NULL OR r.sales_rep_key = ?2)
        ORDER BY m.rule_id, m.rowid
        "#,
    )?;

    let mut members: HashMap<i64, Vec<String>> = HashMap::new();
    let rows = stmt.query_map(params![division, rep_key], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (rule_id, customer) = row?;
        members.entry(rule_id).or_default().push(customer);
    }
    Ok(members)
}

// ==========================================
// MergeRuleRepository
// ==========================================
pub struct MergeRuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MergeRuleRepository {
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

    fn insert_members_tx(
        tx: &Transaction,
        rule_id: i64,
        customers: &[String],
    ) -> RepositoryResult<()> {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO customer_merge_rule_member (rule_id, original_customer, customer_key)
             VALUES (?1, ?2, ?3)",
        )?;
        for customer in customers {
            stmt.execute(params![rule_id, customer.trim(), canonical_name(customer)])?;
        }
        Ok(())
    }

    fn not_found(id: i64) -> RepositoryError {
        RepositoryError::NotFound {
            entity: "CustomerMergeRule".to_string(),
            id: id.to_string(),
        }
    }

    /// 新建规则
    ///
    /// # 返回
    /// - Ok(i64): 新规则 id（单调递增）
    pub fn insert(&self, rule: &ValidatedMergeRule) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();

        tx.execute(
            r#"
            INSERT INTO customer_merge_rule (
                division, sales_rep, sales_rep_key, merged_customer_name,
                is_active, note, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                rule.division.to_db_str(),
                rule.sales_rep.trim(),
                canonical_name(&rule.sales_rep),
                rule.merged_customer_name.trim(),
                rule.is_active,
                rule.note,
                now,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();
        Self::insert_members_tx(&tx, id, &rule.original_customers)?;

        tx.commit()?;
        Ok(id)
    }

    /// 整体替换规则内容（名称 / 成员 / 状态 / 备注）
    pub fn update(&self, id: i64, rule: &ValidatedMergeRule) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let affected = tx.execute(
            r#"
            UPDATE customer_merge_rule SET
                division = ?2,
                sales_rep = ?3,
                sales_rep_key = ?4,
                merged_customer_name = ?5,
                is_active = ?6,
                note = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                id,
                rule.division.to_db_str(),
                rule.sales_rep.trim(),
                canonical_name(&rule.sales_rep),
                rule.merged_customer_name.trim(),
                rule.is_active,
                rule.note,
                Utc::now(),
            ],
        )?;
        if affected == 0 {
            return Err(Self::not_found(id));
        }

        tx.execute(
            "DELETE FROM customer_merge_rule_member WHERE rule_id = ?1",
            params![id],
        )?;
        Self::insert_members_tx(&tx, id, &rule.original_customers)?;

        tx.commit()?;
        Ok(())
    }

    /// 启用 / 停用
    pub fn set_active(&self, id: i64, is_active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE customer_merge_rule SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, is_active, Utc::now()],
        )?;
        if affected == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    /// 删除规则（成员级联删除）
    pub fn delete(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM customer_merge_rule WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    /// 按 id 查询
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<MergeRule>> {
        let conn = self.get_conn()?;

        let header = conn
            .query_row(
                r#"
                SELECT division, sales_rep, merged_customer_name, is_active, note,
                       created_at, updated_at
                FROM customer_merge_rule WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, DateTime<Utc>>(5)?,
                        row.get::<_, DateTime<Utc>>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((division_raw, sales_rep, merged_customer_name, is_active, note, created_at, updated_at)) =
            header
        else {
            return Ok(None);
        };

        let division = Division::from_str(&division_raw).ok_or_else(|| {
            RepositoryError::FieldValueError {
                field: "division".to_string(),
                message: format!("无法识别的代码: {}", division_raw),
            }
        })?;

        let mut member_stmt = conn.prepare(
            "SELECT original_customer FROM customer_merge_rule_member WHERE rule_id = ?1 ORDER BY rowid",
        )?;
        let original_customers = member_stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(Some(MergeRule {
            id,
            division,
            sales_rep,
            merged_customer_name,
            original_customers,
            is_active,
            note,
            created_at,
            updated_at,
        }))
    }

    /// 条件查询
    pub fn list(&self, filter: &MergeRuleFilter) -> RepositoryResult<Vec<MergeRule>> {
        let conn = self.get_conn()?;
        query_rules(&conn, filter)
    }
}

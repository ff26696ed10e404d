// ==========================================
// 销售预算报表系统 - SQLite 连接与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 + busy_timeout）
// - 唯一一套建表脚本，合并规则表只保留一种列命名
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;
use tracing::{info, warn};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表 SQL（幂等）
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS import_batch (
    batch_id TEXT PRIMARY KEY,
    division TEXT,
    year INTEGER,
    record_type TEXT,
    value_type TEXT,
    sales_rep TEXT,
    file_name TEXT,
    source_format TEXT NOT NULL,
    total_rows INTEGER NOT NULL DEFAULT 0,
    success_rows INTEGER NOT NULL DEFAULT 0,
    blocked_rows INTEGER NOT NULL DEFAULT 0,
    warning_rows INTEGER NOT NULL DEFAULT 0,
    imported_at TEXT NOT NULL,
    imported_by TEXT,
    elapsed_ms INTEGER NOT NULL DEFAULT 0,
    dq_report_json TEXT
);

CREATE TABLE IF NOT EXISTS sales_fact (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    division TEXT NOT NULL,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    sales_rep TEXT NOT NULL,
    sales_rep_key TEXT NOT NULL,
    customer TEXT NOT NULL,
    country TEXT NOT NULL DEFAULT '',
    product_group TEXT NOT NULL DEFAULT '',
    value_type TEXT NOT NULL,
    record_type TEXT NOT NULL,
    value REAL NOT NULL,
    import_batch_id TEXT REFERENCES import_batch(batch_id) ON DELETE SET NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (division, year, month, sales_rep_key, customer, country,
            product_group, value_type, record_type)
);

CREATE INDEX IF NOT EXISTS idx_sales_fact_scope
    ON sales_fact (division, year, value_type, record_type);

CREATE TABLE IF NOT EXISTS customer_merge_rule (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    division TEXT NOT NULL,
    sales_rep TEXT NOT NULL,
    sales_rep_key TEXT NOT NULL,
    merged_customer_name TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    note TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_merge_rule_scope
    ON customer_merge_rule (division, sales_rep_key);

CREATE TABLE IF NOT EXISTS customer_merge_rule_member (
    rule_id INTEGER NOT NULL REFERENCES customer_merge_rule(id) ON DELETE CASCADE,
    original_customer TEXT NOT NULL,
    customer_key TEXT NOT NULL,
    PRIMARY KEY (rule_id, customer_key)
);

CREATE TABLE IF NOT EXISTS config_kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// 初始化数据库结构（幂等）
///
/// 新库写入 CURRENT_SCHEMA_VERSION；旧版本库只告警，不做自动迁移
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    match read_schema_version(conn)? {
        None => {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [CURRENT_SCHEMA_VERSION],
            )?;
            info!(version = CURRENT_SCHEMA_VERSION, "数据库结构初始化完成");
        }
        Some(v) if v < CURRENT_SCHEMA_VERSION => {
            warn!(
                found = v,
                expected = CURRENT_SCHEMA_VERSION,
                "数据库 schema_version 低于当前版本"
            );
        }
        Some(_) => {}
    }

    Ok(())
}

/// 读取 schema_version（若表不存在或为空则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

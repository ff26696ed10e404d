// ==========================================
// 销售预算报表系统 - 报表快照读取
// ==========================================
// 职责: 在同一读事务内读取事实与合并规则
// 约束: 避免汇总期间规则集被修改导致结果不一致
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::fact::Fact;
use crate::domain::merge_rule::MergeRule;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::fact_repo::{query_facts, FactScope};
use crate::repository::merge_rule_repo::{query_rules, MergeRuleFilter};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// 单个事业部的一致性快照
#[derive(Debug, Clone, Default)]
pub struct ReportSnapshot {
    pub facts: Vec<Fact>,
    pub rules: Vec<MergeRule>,
}

pub struct ReportSnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReportSnapshotRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 读取快照（事实按范围过滤，规则取该事业部全部有效规则）
    pub fn load(&self, scope: &FactScope) -> RepositoryResult<ReportSnapshot> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let facts = query_facts(&tx, scope)?;
        let rules = query_rules(
            &tx,
            &MergeRuleFilter {
                division: Some(scope.division),
                sales_rep: None,
                active_only: true,
            },
        )?;

        // 只读事务，提交即释放共享锁
        tx.commit()?;

        debug!(
            division = %scope.division,
            facts = facts.len(),
            rules = rules.len(),
            "报表快照读取完成"
        );

        Ok(ReportSnapshot { facts, rules })
    }
}

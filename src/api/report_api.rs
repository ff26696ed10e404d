// ==========================================
// 销售预算报表系统 - 报表 API
// ==========================================
// 职责: 参数校验 → 一致性快照 → 汇总引擎 → 展示单位换算
// 红线: 引擎只接收已校验的查询；单位换算仅在本层发生
// ==========================================

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::report::{AggregatedRow, AggregationReport, CustomerResolution};
use crate::domain::types::{Division, Quantity, RecordType, Unit, ValueType};
use crate::engine::{AggregationQuery, Aggregator, MergeLookup, ReportError};
use crate::repository::{
    FactRepository, FactScope, MergeRuleFilter, MergeRuleRepository, ReportSnapshotRepository,
    RepositoryError,
};

/// 解析事业部代码
pub(crate) fn parse_division(division: &str) -> ApiResult<Division> {
    Division::from_str(division)
        .ok_or_else(|| ApiError::ValidationError(format!("未知的事业部代码: {}", division.trim())))
}

fn parse_value_type(value_type: &str) -> ApiResult<ValueType> {
    ValueType::from_str(value_type)
        .ok_or_else(|| ApiError::ValidationError(format!("未知的数值类型: {}", value_type.trim())))
}

fn parse_record_type(record_type: &str) -> ApiResult<RecordType> {
    RecordType::from_str(record_type)
        .ok_or_else(|| ApiError::ValidationError(format!("未知的记录类型: {}", record_type.trim())))
}

/// 报表读取失败统一视为存储不可用
fn store_unavailable(err: RepositoryError) -> ApiError {
    ReportError::StoreUnavailable(err.to_string()).into()
}

// ==========================================
// ReportApi - 报表 API
// ==========================================
pub struct ReportApi {
    snapshot_repo: Arc<ReportSnapshotRepository>,
    fact_repo: Arc<FactRepository>,
    merge_rule_repo: Arc<MergeRuleRepository>,
    config_manager: Arc<ConfigManager>,
    aggregator: Aggregator,
}

impl ReportApi {
    pub fn new(
        snapshot_repo: Arc<ReportSnapshotRepository>,
        fact_repo: Arc<FactRepository>,
        merge_rule_repo: Arc<MergeRuleRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            snapshot_repo,
            fact_repo,
            merge_rule_repo,
            config_manager,
            aggregator: Aggregator::new(),
        }
    }

    /// 按客户汇总
    ///
    /// # 参数
    /// - division: 事业部代码（FP / HC / TF / SB / HCM，忽略大小写）
    /// - year: 报表年份
    /// - value_type: AMOUNT / KGS / MORM
    /// - record_type: BUDGET / ACTUAL
    /// - unit: 展示单位（可选；KGS 可取 KG 或 MT）
    ///
    /// # 返回
    /// - Err(ValidationError): 代码无法识别、年份非正、单位不兼容
    /// - Err(StoreUnavailable): 快照读取失败
    pub fn aggregate(
        &self,
        division: &str,
        year: i32,
        value_type: &str,
        record_type: &str,
        unit: Option<&str>,
    ) -> ApiResult<AggregationReport> {
        let query = AggregationQuery::new(
            division,
            year,
            parse_value_type(value_type)?,
            parse_record_type(record_type)?,
        )?;
        let display_unit = self.resolve_display_unit(query.value_type, unit)?;

        let scope = FactScope {
            division: query.division,
            year: Some(query.year),
            value_type: Some(query.value_type),
            record_type: Some(query.record_type),
        };
        let snapshot = self
            .snapshot_repo
            .load(&scope)
            .map_err(store_unavailable)?;

        let base_unit = query.value_type.base_unit();
        let rows: Vec<AggregatedRow> = self
            .aggregator
            .aggregate(&query, &snapshot.facts, &snapshot.rules)
            .into_iter()
            .map(|mut row| {
                if let Some(q) = Quantity::new(row.value, base_unit).convert_to(display_unit) {
                    row.value = q.value;
                }
                row
            })
            .collect();
        let total: f64 = rows.iter().map(|r| r.value).sum();

        info!(
            division = %query.division,
            year = query.year,
            value_type = %query.value_type,
            record_type = %query.record_type,
            unit = %display_unit,
            rows = rows.len(),
            "报表汇总完成"
        );

        Ok(AggregationReport {
            division: query.division,
            year: query.year,
            value_type: query.value_type,
            record_type: query.record_type,
            unit: display_unit,
            total,
            rows,
        })
    }

    /// 确定展示单位
    ///
    /// 优先级: 请求参数 > report.default_unit 配置 > 基础单位
    /// 请求参数不兼容时报错；配置不兼容时退回基础单位
    fn resolve_display_unit(&self, value_type: ValueType, unit: Option<&str>) -> ApiResult<Unit> {
        let base = value_type.base_unit();
        let compatible = |u: Unit| Quantity::new(0.0, base).convert_to(u).is_some();

        if let Some(raw) = unit.map(str::trim).filter(|s| !s.is_empty()) {
            let requested = Unit::from_str(raw)
                .ok_or_else(|| ApiError::ValidationError(format!("未知的单位: {}", raw)))?;
            if !compatible(requested) {
                return Err(ApiError::ValidationError(format!(
                    "单位 {} 与数值类型 {} 不兼容",
                    requested, value_type
                )));
            }
            return Ok(requested);
        }

        match self.config_manager.report_default_unit()? {
            Some(configured) if compatible(configured) => Ok(configured),
            Some(configured) => {
                warn!(unit = %configured, value_type = %value_type, "默认展示单位不适用，使用基础单位");
                Ok(base)
            }
            None => Ok(base),
        }
    }

    /// 事业部列表
    pub fn list_divisions(&self) -> Vec<Division> {
        Division::ALL.to_vec()
    }

    /// 原始客户及其当前合并去向
    ///
    /// # 参数
    /// - sales_rep: 仅列出该销售员（忽略大小写）
    ///
    /// # 返回
    /// - Err(StoreUnavailable): 事实或规则读取失败
    pub fn list_customers(
        &self,
        division: &str,
        sales_rep: Option<&str>,
    ) -> ApiResult<Vec<CustomerResolution>> {
        let division = parse_division(division)?;
        let sales_rep = sales_rep.map(str::trim).filter(|s| !s.is_empty());

        let counts = self
            .fact_repo
            .count_by_customer(division, sales_rep)
            .map_err(store_unavailable)?;
        let rules = self
            .merge_rule_repo
            .list(&MergeRuleFilter {
                division: Some(division),
                sales_rep: sales_rep.map(str::to_string),
                active_only: true,
            })
            .map_err(store_unavailable)?;
        let lookup = MergeLookup::build(division, &rules);

        Ok(counts
            .into_iter()
            .map(|c| {
                let target = lookup.resolve(&c.sales_rep, &c.customer);
                CustomerResolution {
                    merged_customer_name: target.map(|t| t.merged_customer_name.clone()),
                    rule_id: target.map(|t| t.rule_id),
                    sales_rep: c.sales_rep,
                    customer: c.customer,
                    fact_count: c.fact_count,
                }
            })
            .collect())
    }
}

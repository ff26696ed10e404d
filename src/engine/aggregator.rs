// ==========================================
// 销售预算报表系统 - 客户合并与预算汇总引擎
// ==========================================
// 职责: 事实数据 → 合并客户名 → 按月分组求和
// 输入: 单个事业部的事实快照 + 合并规则快照
// 输出: 按 (sales_rep, customer, country, product_group, month) 排序的汇总行
// 红线: 纯函数，不做单位换算，不读写存储
// ==========================================

use crate::domain::fact::Fact;
use crate::domain::merge_rule::MergeRule;
use crate::domain::report::AggregatedRow;
use crate::domain::types::{canonical_name, Division, RecordType, ValueType};
use crate::engine::customer_merge::MergeLookup;
use crate::engine::error::{ReportError, ReportResult};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

// ==========================================
// AggregationQuery - 已校验的汇总查询
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationQuery {
    pub division: Division,
    pub year: i32,
    pub value_type: ValueType,
    pub record_type: RecordType,
}

impl AggregationQuery {
    /// 构建查询
    ///
    /// # 错误
    /// - 事业部代码无法识别 → Validation
    /// - 年份非正整数 → Validation
    pub fn new(
        division: &str,
        year: i32,
        value_type: ValueType,
        record_type: RecordType,
    ) -> ReportResult<Self> {
        let division = Division::from_str(division).ok_or_else(|| {
            ReportError::Validation(format!("未知的事业部代码: {}", division.trim()))
        })?;

        if year <= 0 {
            return Err(ReportError::Validation(format!(
                "年份必须为正整数: {}",
                year
            )));
        }

        Ok(Self {
            division,
            year,
            value_type,
            record_type,
        })
    }

    /// 事实是否落在本查询范围内
    pub fn matches(&self, fact: &Fact) -> bool {
        fact.division == self.division
            && fact.year == self.year
            && fact.value_type == self.value_type
            && fact.record_type == self.record_type
    }
}

/// 分组键: 销售员键 + 显示字段 + 月份
type GroupKey = (String, String, String, String, u32);

struct GroupAcc {
    sales_rep_display: String,
    value: f64,
}

// ==========================================
// Aggregator - 汇总引擎
// ==========================================
#[derive(Debug, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// 执行汇总
    ///
    /// 处理顺序:
    /// 1) 过滤不在查询范围内的事实
    /// 2) 经有效合并规则替换客户名（TRIM + UPPER 匹配）
    /// 3) 分组求和
    /// 4) 排序输出
    #[instrument(skip(self, facts, rules), fields(
        division = %query.division,
        year = query.year,
        fact_count = facts.len(),
        rule_count = rules.len()
    ))]
    pub fn aggregate(
        &self,
        query: &AggregationQuery,
        facts: &[Fact],
        rules: &[MergeRule],
    ) -> Vec<AggregatedRow> {
        let lookup = MergeLookup::build(query.division, rules);

        let mut groups: BTreeMap<GroupKey, GroupAcc> = BTreeMap::new();
        let mut merged_count = 0usize;

        for fact in facts.iter().filter(|f| query.matches(f)) {
            let customer = match lookup.resolve(&fact.sales_rep, &fact.customer) {
                Some(target) => {
                    merged_count += 1;
                    target.merged_customer_name.clone()
                }
                None => fact.customer.trim().to_string(),
            };

            let key = (
                canonical_name(&fact.sales_rep),
                customer,
                fact.country.trim().to_string(),
                fact.product_group.trim().to_string(),
                fact.month,
            );
            let rep_display = fact.sales_rep.trim();

            let acc = groups.entry(key).or_insert_with(|| GroupAcc {
                sales_rep_display: rep_display.to_string(),
                value: 0.0,
            });
            // 同组多种拼写时取字典序最小者，与输入顺序无关
            if rep_display < acc.sales_rep_display.as_str() {
                acc.sales_rep_display = rep_display.to_string();
            }
            acc.value += fact.value;
        }

        let mut rows: Vec<AggregatedRow> = groups
            .into_iter()
            .map(|((_, customer, country, product_group, month), acc)| AggregatedRow {
                sales_rep: acc.sales_rep_display,
                customer,
                country,
                product_group,
                month,
                value: acc.value,
            })
            .collect();

        rows.sort_by(|a, b| {
            (&a.sales_rep, &a.customer, &a.country, &a.product_group, a.month).cmp(&(
                &b.sales_rep,
                &b.customer,
                &b.country,
                &b.product_group,
                b.month,
            ))
        });

        debug!(
            rows = rows.len(),
            merged_facts = merged_count,
            overlaps = lookup.overlaps().len(),
            "汇总完成"
        );

        rows
    }
}

/// 便捷函数: 使用默认引擎汇总
pub fn aggregate(
    query: &AggregationQuery,
    facts: &[Fact],
    rules: &[MergeRule],
) -> Vec<AggregatedRow> {
    Aggregator::new().aggregate(query, facts, rules)
}

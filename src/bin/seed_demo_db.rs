// ==========================================
// 开发工具: 初始化演示数据库
// ==========================================
// 用法: seed_demo_db [db_path]
// 建表后通过导入 API 写入两名销售员的演示事实，并创建一条合并规则
// ==========================================

use anyhow::Context;
use sales_budget_report::app::{get_default_db_path, AppState};
use sales_budget_report::domain::{FactRecordInput, ImportContext, MergeRuleInput};
use sales_budget_report::{logging, Division, RecordType, ValueType};

const DEMO_YEAR: i32 = 2025;

fn record(sales_rep: &str, customer: &str, country: &str, month: u32, value: f64) -> FactRecordInput {
    FactRecordInput {
        sales_rep: Some(sales_rep.to_string()),
        customer: Some(customer.to_string()),
        country: Some(country.to_string()),
        product_group: Some("Shrink Film".to_string()),
        month: Some(month),
        value: Some(value),
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    let state = AppState::new(db_path.clone()).map_err(anyhow::Error::msg)?;

    let context = ImportContext {
        division: Some(Division::Fp),
        year: Some(DEMO_YEAR),
        value_type: Some(ValueType::Amount),
        record_type: Some(RecordType::Budget),
        imported_by: Some("seed_demo_db".to_string()),
        ..Default::default()
    };

    let records = vec![
        record("Narek", "ACME LLC", "UAE", 1, 500.0),
        record("Narek", "Acme Trading", "UAE", 1, 300.0),
        record("Narek", "Beta Co", "Oman", 2, 200.0),
        record("Narek", "ACME LLC", "UAE", 3, 150.0),
        record("Sofia", "Gamma Plastics", "KSA", 1, 420.0),
        record("Sofia", "gamma plastics ", "KSA", 2, 80.0),
    ];

    let response = state
        .import_api
        .import_records(context, records)
        .await
        .context("演示事实导入失败")?;
    println!(
        "导入批次 {}: 成功 {} 条, 阻断 {} 条",
        response.batch_id, response.dq_summary.success, response.dq_summary.blocked
    );

    let existing = state
        .merge_rule_api
        .list(Some("FP"), Some("Narek"), false)
        .context("查询合并规则失败")?;
    if existing.is_empty() {
        let rule = state
            .merge_rule_api
            .create(MergeRuleInput {
                division: "FP".to_string(),
                sales_rep: "Narek".to_string(),
                merged_customer_name: "ACME".to_string(),
                original_customers: vec!["ACME LLC".to_string(), "Acme Trading".to_string()],
                is_active: Some(true),
                note: Some("演示规则".to_string()),
            })
            .context("创建合并规则失败")?;
        println!("已创建合并规则 #{} → {}", rule.id, rule.merged_customer_name);
    }

    let report = state
        .report_api
        .aggregate("FP", DEMO_YEAR, "AMOUNT", "BUDGET", None)
        .context("汇总失败")?;
    println!("FP {} AMOUNT/BUDGET 合计 {}", DEMO_YEAR, report.total);
    for row in &report.rows {
        println!("  {:<10} {:<16} {:>10.2}", row.sales_rep, row.customer, row.value);
    }

    println!("配置快照: {}", state.config_api.get_config_snapshot()?);
    println!("数据库: {}", db_path);
    Ok(())
}

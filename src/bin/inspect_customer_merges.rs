// ==========================================
// 开发工具: 客户合并诊断
// ==========================================
// 用法: inspect_customer_merges <db_path> <division> [sales_rep]
// 输出每个原始客户的事实条数与合并去向，以及有效规则的重叠
// ==========================================

use anyhow::{bail, Context};
use sales_budget_report::app::AppState;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!("用法: {} <db_path> <division> [sales_rep]", args[0]);
    }
    let db_path = args[1].clone();
    let division = args[2].as_str();
    let sales_rep = args.get(3).map(String::as_str);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    let customers = state
        .report_api
        .list_customers(division, sales_rep)
        .context("读取客户列表失败")?;

    println!(
        "{:<16} {:<32} {:>8}  {}",
        "销售员", "原始客户", "条数", "合并为"
    );
    for c in &customers {
        let target = match (&c.merged_customer_name, c.rule_id) {
            (Some(name), Some(id)) => format!("{} (规则 #{})", name, id),
            _ => "-".to_string(),
        };
        println!(
            "{:<16} {:<32} {:>8}  {}",
            c.sales_rep, c.customer, c.fact_count, target
        );
    }
    let merged = customers
        .iter()
        .filter(|c| c.merged_customer_name.is_some())
        .count();
    println!("共 {} 个原始客户，其中 {} 个被合并", customers.len(), merged);

    let overlaps = state
        .merge_rule_api
        .find_conflicts(division, sales_rep)
        .context("读取规则重叠失败")?;
    if overlaps.is_empty() {
        println!("无规则重叠");
    } else {
        println!("规则重叠 {} 处:", overlaps.len());
        for o in &overlaps {
            println!(
                "  {} / {}: 生效规则 #{}，被覆盖规则 #{}",
                o.sales_rep_key, o.customer_key, o.winning_rule_id, o.shadowed_rule_id
            );
        }
    }

    Ok(())
}

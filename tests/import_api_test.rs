// ==========================================
// ImportApi 集成测试
// ==========================================
// 测试范围:
// 1. 导入后立即可在报表中查询（含合并规则）
// 2. 覆盖模式与行数上限来自 config_kv
// 3. 批次查询 / 输入校验 / 错误映射
// ==========================================

mod helpers;
mod test_helpers;

use helpers::api_test_helper::*;
use helpers::test_data_builder::{merge_rule_input, record};
use sales_budget_report::api::ApiError;
use sales_budget_report::config::config_keys;
use sales_budget_report::domain::ImportContext;
use sales_budget_report::{Division, RecordType, ValueType};
use test_helpers::{budget_html, write_import_file};

fn context(sales_rep: &str, value_type: ValueType) -> ImportContext {
    ImportContext {
        division: Some(Division::Fp),
        year: Some(2025),
        sales_rep: Some(sales_rep.to_string()),
        value_type: Some(value_type),
        record_type: Some(RecordType::Budget),
        imported_by: Some("tester".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_import_then_aggregate_with_merge_rule() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let html = budget_html(
        r#"[{"customer":"ACME LLC","country":"UAE","productGroup":"Shrink Film","month":1,"value":500},
            {"customer":"Acme Trading","country":"UAE","productGroup":"Shrink Film","month":1,"value":300}]"#,
    );

    let response = env
        .import_api
        .import_bytes("narek.html", html.into_bytes(), context("Narek", ValueType::Amount))
        .await
        .expect("导入失败");
    assert_eq!(response.dq_summary.success, 2);
    assert!(response.dq_violations.is_empty());

    env.merge_rule_api
        .create(merge_rule_input("Narek", "ACME", &["ACME LLC", "Acme Trading"]))
        .expect("创建规则失败");

    let report = env
        .report_api
        .aggregate("FP", 2025, "AMOUNT", "BUDGET", None)
        .expect("汇总失败");
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].customer, "ACME");
    assert_eq!(report.rows[0].value, 800.0);
}

#[tokio::test]
async fn test_import_file_path() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let file = write_import_file(".csv", "Customer,Month,Value\nACME LLC,1,10\nBeta Co,2,20\n")
        .expect("写入文件失败");
    let path = file.path().to_string_lossy().to_string();

    let response = env
        .import_api
        .import_file(&path, context("Narek", ValueType::Amount))
        .await
        .expect("导入失败");
    assert_eq!(response.dq_summary.success, 2);

    let err = env
        .import_api
        .import_file("  ", context("Narek", ValueType::Amount))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn test_import_errors_map_to_api_errors() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let err = env
        .import_api
        .import_bytes("narek.html", Vec::new(), context("Narek", ValueType::Amount))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let err = env
        .import_api
        .import_bytes("narek.html", b"<html>no data</html>".to_vec(), context("Narek", ValueType::Amount))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "IMPORT_ERROR");

    let err = env
        .import_api
        .import_bytes("narek.docx", b"x".to_vec(), context("Narek", ValueType::Amount))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "IMPORT_ERROR");
}

#[tokio::test]
async fn test_scope_mode_from_config() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.config_api
        .update_config(config_keys::IMPORT_REPLACE_MODE, "scope")
        .expect("配置更新失败");

    env.import_api
        .import_records(
            context("Narek", ValueType::Amount),
            vec![record("ACME LLC", 1, 100.0), record("Beta Co", 2, 50.0)],
        )
        .await
        .expect("导入失败");
    env.import_api
        .import_records(
            context("Narek", ValueType::Amount),
            vec![record("ACME LLC", 1, 60.0)],
        )
        .await
        .expect("导入失败");

    let report = env
        .report_api
        .aggregate("FP", 2025, "AMOUNT", "BUDGET", None)
        .expect("汇总失败");
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.total, 60.0);
}

#[tokio::test]
async fn test_max_rows_from_config() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.config_api
        .update_config(config_keys::IMPORT_MAX_ROWS, "1")
        .expect("配置更新失败");

    let err = env
        .import_api
        .import_records(
            context("Narek", ValueType::Amount),
            vec![record("ACME LLC", 1, 1.0), record("Beta Co", 1, 1.0)],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ImportError(_)));
    assert_eq!(env.fact_repo.count().expect("计数失败"), 0);
}

#[tokio::test]
async fn test_batches_listed_newest_first() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let first = env
        .import_api
        .import_records(context("Narek", ValueType::Amount), vec![record("A", 1, 1.0)])
        .await
        .expect("导入失败");
    let second = env
        .import_api
        .import_records(context("Sofia", ValueType::Kgs), vec![record("B", 1, 1.0)])
        .await
        .expect("导入失败");

    let batches = env.import_api.list_batches(None).expect("查询失败");
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].batch_id, second.batch_id);
    assert_eq!(batches[1].batch_id, first.batch_id);
    assert_eq!(env.import_api.list_batches(Some(1)).expect("查询失败").len(), 1);

    let batch = env.import_api.get_batch(&first.batch_id).expect("查询失败");
    assert_eq!(batch.imported_by.as_deref(), Some("tester"));
    assert_eq!(batch.sales_rep.as_deref(), Some("Narek"));

    assert!(matches!(
        env.import_api.get_batch("missing"),
        Err(ApiError::NotFound(_))
    ));
}

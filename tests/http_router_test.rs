// ==========================================
// HTTP 路由集成测试
// ==========================================
// 测试范围:
// 1. 报表查询与错误信封 { code, message }
// 2. 错误消息按 Accept-Language 本地化
// 3. 合并规则 / 导入 / 配置端点
// ==========================================

mod helpers;
mod test_helpers;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use helpers::api_test_helper::*;
use helpers::test_data_builder::FactBuilder;
use serde_json::{json, Value};
use test_helpers::budget_html;
use tower::ServiceExt;

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("请求失败");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("读取响应失败");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).to_string())
        })
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn seed_acme(env: &ApiTestEnv) {
    env.seed_facts(&[
        FactBuilder::new("Narek", "ACME LLC").value(500.0).build(),
        FactBuilder::new("Narek", "Acme Trading").value(300.0).build(),
    ]);
}

// ==========================================
// 报表
// ==========================================

#[tokio::test]
async fn test_health() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (status, body) = send(env.router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn test_list_divisions() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (status, body) = send(env.router(), get("/api/divisions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["FP", "HC", "TF", "SB", "HCM"]));
}

#[tokio::test]
async fn test_aggregate_with_merge_rule() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    seed_acme(&env);

    let (status, _) = send(
        env.router(),
        json_request(
            Method::POST,
            "/api/merge-rules",
            json!({
                "division": "FP",
                "salesRep": "Narek",
                "mergedCustomerName": "ACME",
                "originalCustomers": ["ACME LLC", "Acme Trading"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        env.router(),
        get("/api/reports/aggregate?division=FP&year=2025&valueType=AMOUNT&type=BUDGET"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unit"], "CURRENCY");
    assert_eq!(body["rows"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["rows"][0]["customer"], "ACME");
    assert_eq!(body["rows"][0]["value"], 800.0);
}

#[tokio::test]
async fn test_aggregate_unknown_division_envelope() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let uri = "/api/reports/aggregate?division=XX&year=2025&value_type=AMOUNT&type=BUDGET";

    let (status, body) = send(env.router(), get(uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.starts_with("数据验证失败"), "{}", message);
    assert!(message.contains("XX"), "{}", message);

    let request = Request::builder()
        .uri(uri)
        .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(env.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.starts_with("Validation failed"), "{}", message);
}

#[tokio::test]
async fn test_aggregate_missing_param() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (status, body) = send(
        env.router(),
        get("/api/reports/aggregate?division=FP&value_type=AMOUNT&type=BUDGET"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_aggregate_store_unavailable_envelope() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    seed_acme(&env);
    env.drop_table("sales_fact");

    let (status, body) = send(
        env.router(),
        get("/api/reports/aggregate?division=FP&year=2025&value_type=AMOUNT&type=BUDGET"),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "STORE_UNAVAILABLE");
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.starts_with("数据源不可用"), "{}", message);
}

// ==========================================
// 合并规则
// ==========================================

#[tokio::test]
async fn test_merge_rule_lifecycle() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let (status, created) = send(
        env.router(),
        json_request(
            Method::POST,
            "/api/merge-rules",
            json!({
                "division": "FP",
                "sales_rep": "Narek",
                "merged_customer_name": "ACME",
                "original_customers": ["ACME LLC"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().expect("缺少 id");

    let (status, body) = send(
        env.router(),
        json_request(
            Method::POST,
            &format!("/api/merge-rules/{}/active", id),
            json!({ "isActive": false }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, body) = send(env.router(), get("/api/merge-rules?active_only=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(
        env.router(),
        get("/api/merge-rules/conflicts?division=FP"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/merge-rules/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(env.router(), request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(env.router(), get(&format!("/api/merge-rules/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

// ==========================================
// 导入
// ==========================================

#[tokio::test]
async fn test_import_records_endpoint() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let (status, body) = send(
        env.router(),
        json_request(
            Method::POST,
            "/api/imports/records",
            json!({
                "context": {
                    "division": "FP",
                    "year": 2025,
                    "sales_rep": "Narek",
                    "value_type": "KGS",
                    "record_type": "BUDGET",
                    "source_unit": "MT"
                },
                "records": [
                    { "customer": "ACME LLC", "country": "UAE", "productGroup": "Shrink Film", "month": 3, "value": 2.5 }
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dq_summary"]["success"], 1);
    let batch_id = body["batch_id"].as_str().expect("缺少 batch_id").to_string();

    let (status, body) = send(env.router(), get(&format!("/api/imports/{}", batch_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success_rows"], 1);

    let (status, body) = send(
        env.router(),
        get("/api/reports/aggregate?division=FP&year=2025&value_type=KGS&type=BUDGET"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unit"], "KG");
    assert_eq!(body["total"], 2500.0);

    let (status, body) = send(env.router(), get("/api/imports/unknown-batch")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_multipart_upload() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let boundary = "X-BUDGET-BOUNDARY";
    let html = budget_html(
        r#"[{"customer":"ACME LLC","country":"UAE","productGroup":"Shrink Film","month":1,"value":500}]"#,
    );

    let mut body = String::new();
    for (name, value) in [
        ("division", "FP"),
        ("year", "2025"),
        ("salesRep", "Narek"),
        ("valueType", "AMOUNT"),
        ("type", "BUDGET"),
    ] {
        body.push_str(&format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{n}\"\r\n\r\n{v}\r\n",
            b = boundary,
            n = name,
            v = value
        ));
    }
    body.push_str(&format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"narek.html\"\r\nContent-Type: text/html\r\n\r\n{h}\r\n--{b}--\r\n",
        b = boundary,
        h = html
    ));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/imports/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, response) = send(env.router(), request).await;
    assert_eq!(status, StatusCode::OK, "{}", response);
    assert_eq!(response["dq_summary"]["success"], 1);
    assert_eq!(response["file_name"], "narek.html");

    let (status, batches) = send(env.router(), get("/api/imports?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batches.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_multipart_upload_without_file() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let boundary = "X-BUDGET-BOUNDARY";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"division\"\r\n\r\nFP\r\n--{b}--\r\n",
        b = boundary
    );

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/imports/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, response) = send(env.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "INVALID_INPUT");
}

// ==========================================
// 配置
// ==========================================

#[tokio::test]
async fn test_config_endpoints() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let (status, body) = send(
        env.router(),
        json_request(
            Method::PUT,
            "/api/config/report.default_unit",
            json!({ "value": "MT" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "key": "report.default_unit", "value": "MT" }));

    let (status, body) = send(env.router(), get("/api/config/report.default_unit")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "MT");

    let (status, body) = send(
        env.router(),
        json_request(
            Method::PUT,
            "/api/config/import.max_rows",
            json!({ "value": "-1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, body) = send(env.router(), get("/api/config")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

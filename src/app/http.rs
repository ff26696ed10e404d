// ==========================================
// 销售预算报表系统 - HTTP 路由
// ==========================================
// 职责: axum 路由 → API 层；错误统一转换为 { code, message } 信封
// 约束: SQLite 读写一律经 spawn_blocking 执行，不阻塞 tokio 工作线程
// ==========================================

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, Query, State},
    http::{header::ACCEPT_LANGUAGE, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::{ApiError, ApiResult, ImportApiResponse};
use crate::app::state::AppState;
use crate::config::ConfigEntry;
use crate::domain::fact::FactRecordInput;
use crate::domain::import::{ImportBatch, ImportContext};
use crate::domain::merge_rule::{MergeRule, MergeRuleInput, MergeRuleOverlap};
use crate::domain::report::{AggregationReport, CustomerResolution};
use crate::domain::types::{Division, RecordType, Unit, ValueType};
use crate::i18n;

/// 上传请求体上限（64 MiB）
pub const UPLOAD_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// 构建全部路由
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // 报表
        // ========================================
        .route("/api/divisions", get(list_divisions))
        .route("/api/reports/aggregate", get(aggregate_report))
        .route("/api/reports/customers", get(list_customers))
        // ========================================
        // 客户合并规则
        // ========================================
        .route(
            "/api/merge-rules",
            get(list_merge_rules).post(create_merge_rule),
        )
        .route("/api/merge-rules/conflicts", get(find_merge_rule_conflicts))
        .route(
            "/api/merge-rules/:id",
            get(get_merge_rule)
                .put(update_merge_rule)
                .delete(delete_merge_rule),
        )
        .route("/api/merge-rules/:id/active", post(set_merge_rule_active))
        // ========================================
        // 预算导入
        // ========================================
        .route(
            "/api/imports/upload",
            post(upload_import).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/imports/records", post(import_records))
        .route("/api/imports", get(list_import_batches))
        .route("/api/imports/:batch_id", get(get_import_batch))
        // ========================================
        // 配置
        // ========================================
        .route("/api/config", get(list_configs))
        .route("/api/config/:key", put(update_config).get(get_config))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ==========================================
// 语言与错误信封
// ==========================================

/// 请求语言（来自 Accept-Language）
#[derive(Debug, Clone, Copy)]
pub struct Locale(pub &'static str);

#[async_trait]
impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok());
        Ok(Locale(i18n::resolve_locale(header)))
    }
}

impl Locale {
    fn error(self, error: ApiError) -> HttpError {
        HttpError {
            error,
            locale: self.0,
        }
    }
}

/// 错误信封
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// HTTP 层错误（携带请求语言）
pub struct HttpError {
    error: ApiError,
    locale: &'static str,
}

type HttpResult<T> = Result<T, HttpError>;

/// 错误类别 → HTTP 状态码
pub fn status_of(error: &ApiError) -> StatusCode {
    match error {
        ApiError::InvalidInput(_) | ApiError::ValidationError(_) | ApiError::ImportError(_) => {
            StatusCode::BAD_REQUEST
        }
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::BusinessRuleViolation(_) => StatusCode::CONFLICT,
        ApiError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ApiError::DatabaseError(_) | ApiError::InternalError(_) | ApiError::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = status_of(&self.error);
        let code = self.error.code();
        let category = i18n::t_for(self.locale, &format!("errors.{}", code.to_lowercase()));
        let message = format!("{}: {}", category, self.error.detail());

        if status.is_server_error() {
            tracing::error!(code, status = status.as_u16(), "{}", self.error);
        } else {
            tracing::warn!(code, status = status.as_u16(), "{}", self.error);
        }

        let body = ErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// 在阻塞线程池中执行同步 API 调用
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::InternalError(format!("后台任务执行失败: {}", e)))?
}

// ==========================================
// 参数解析
// ==========================================

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn required<'a>(value: Option<&'a str>, name: &str) -> ApiResult<&'a str> {
    non_empty(value).ok_or_else(|| ApiError::InvalidInput(format!("缺少参数 {}", name)))
}

fn parse_year(value: Option<&str>) -> ApiResult<i32> {
    let raw = required(value, "year")?;
    raw.parse::<i32>()
        .map_err(|_| ApiError::InvalidInput(format!("年份不是整数: {}", raw)))
}

fn parse_flag(value: Option<&str>) -> ApiResult<bool> {
    match non_empty(value).map(str::to_lowercase).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(ApiError::InvalidInput(format!("无法识别的布尔值: {}", other))),
    }
}

/// 由上传表单字段构造导入上下文
///
/// 接受 snake_case 与 camelCase 两种字段名；未识别的代码视为输入错误
pub fn context_from_fields(fields: &HashMap<String, String>) -> ApiResult<ImportContext> {
    let field = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| non_empty(fields.get(*n).map(String::as_str)))
            .map(str::to_string)
    };

    let division = match field(&["division"]) {
        Some(d) => Some(
            Division::from_str(&d)
                .ok_or_else(|| ApiError::InvalidInput(format!("未知的事业部代码: {}", d)))?,
        ),
        None => None,
    };
    let year = match field(&["year"]) {
        Some(y) => Some(parse_year(Some(&y))?),
        None => None,
    };
    let value_type = match field(&["value_type", "valueType"]) {
        Some(v) => Some(
            ValueType::from_str(&v)
                .ok_or_else(|| ApiError::InvalidInput(format!("未知的数值类型: {}", v)))?,
        ),
        None => None,
    };
    let record_type = match field(&["type", "record_type", "recordType"]) {
        Some(r) => Some(
            RecordType::from_str(&r)
                .ok_or_else(|| ApiError::InvalidInput(format!("未知的记录类型: {}", r)))?,
        ),
        None => None,
    };
    let source_unit = match field(&["source_unit", "sourceUnit", "unit"]) {
        Some(u) => Some(
            Unit::from_str(&u)
                .ok_or_else(|| ApiError::InvalidInput(format!("未知的单位: {}", u)))?,
        ),
        None => None,
    };

    Ok(ImportContext {
        division,
        year,
        sales_rep: field(&["sales_rep", "salesRep"]),
        value_type,
        record_type,
        source_unit,
        imported_by: field(&["imported_by", "importedBy"]),
    })
}

// ==========================================
// 报表 handlers
// ==========================================

#[derive(Debug, Default, Deserialize)]
pub struct AggregateParams {
    pub division: Option<String>,
    pub year: Option<String>,
    #[serde(alias = "valueType")]
    pub value_type: Option<String>,
    #[serde(rename = "type", alias = "record_type")]
    pub record_type: Option<String>,
    pub unit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerParams {
    pub division: Option<String>,
    #[serde(alias = "salesRep")]
    pub sales_rep: Option<String>,
}

async fn list_divisions(State(state): State<Arc<AppState>>) -> Json<Vec<Division>> {
    Json(state.report_api.list_divisions())
}

async fn aggregate_report(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Query(params): Query<AggregateParams>,
) -> HttpResult<Json<AggregationReport>> {
    let report = blocking(move || {
        let division = required(params.division.as_deref(), "division")?;
        let year = parse_year(params.year.as_deref())?;
        let value_type = required(params.value_type.as_deref(), "value_type")?;
        let record_type = required(params.record_type.as_deref(), "type")?;
        state.report_api.aggregate(
            division,
            year,
            value_type,
            record_type,
            non_empty(params.unit.as_deref()),
        )
    })
    .await
    .map_err(|e| locale.error(e))?;
    Ok(Json(report))
}

async fn list_customers(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Query(params): Query<CustomerParams>,
) -> HttpResult<Json<Vec<CustomerResolution>>> {
    let customers = blocking(move || {
        let division = required(params.division.as_deref(), "division")?;
        state
            .report_api
            .list_customers(division, params.sales_rep.as_deref())
    })
    .await
    .map_err(|e| locale.error(e))?;
    Ok(Json(customers))
}

// ==========================================
// 合并规则 handlers
// ==========================================

#[derive(Debug, Default, Deserialize)]
pub struct MergeRuleListParams {
    pub division: Option<String>,
    #[serde(alias = "salesRep")]
    pub sales_rep: Option<String>,
    #[serde(alias = "activeOnly")]
    pub active_only: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveBody {
    #[serde(alias = "isActive")]
    pub is_active: bool,
}

async fn list_merge_rules(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Query(params): Query<MergeRuleListParams>,
) -> HttpResult<Json<Vec<MergeRule>>> {
    let rules = blocking(move || {
        let active_only = parse_flag(params.active_only.as_deref())?;
        state.merge_rule_api.list(
            params.division.as_deref(),
            params.sales_rep.as_deref(),
            active_only,
        )
    })
    .await
    .map_err(|e| locale.error(e))?;
    Ok(Json(rules))
}

async fn create_merge_rule(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Json(input): Json<MergeRuleInput>,
) -> HttpResult<(StatusCode, Json<MergeRule>)> {
    let rule = blocking(move || state.merge_rule_api.create(input))
        .await
        .map_err(|e| locale.error(e))?;
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn get_merge_rule(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Path(id): Path<i64>,
) -> HttpResult<Json<MergeRule>> {
    let rule = blocking(move || state.merge_rule_api.get(id))
        .await
        .map_err(|e| locale.error(e))?;
    Ok(Json(rule))
}

async fn update_merge_rule(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(input): Json<MergeRuleInput>,
) -> HttpResult<Json<MergeRule>> {
    let rule = blocking(move || state.merge_rule_api.update(id, input))
        .await
        .map_err(|e| locale.error(e))?;
    Ok(Json(rule))
}

async fn delete_merge_rule(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Path(id): Path<i64>,
) -> HttpResult<StatusCode> {
    blocking(move || state.merge_rule_api.delete(id))
        .await
        .map_err(|e| locale.error(e))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_merge_rule_active(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(body): Json<SetActiveBody>,
) -> HttpResult<Json<MergeRule>> {
    let rule = blocking(move || state.merge_rule_api.set_active(id, body.is_active))
        .await
        .map_err(|e| locale.error(e))?;
    Ok(Json(rule))
}

async fn find_merge_rule_conflicts(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Query(params): Query<CustomerParams>,
) -> HttpResult<Json<Vec<MergeRuleOverlap>>> {
    let overlaps = blocking(move || {
        let division = required(params.division.as_deref(), "division")?;
        state
            .merge_rule_api
            .find_conflicts(division, params.sales_rep.as_deref())
    })
    .await
    .map_err(|e| locale.error(e))?;
    Ok(Json(overlaps))
}

// ==========================================
// 导入 handlers
// ==========================================

#[derive(Debug, Deserialize)]
pub struct ImportRecordsBody {
    #[serde(default)]
    pub context: ImportContext,
    pub records: Vec<FactRecordInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchListParams {
    pub limit: Option<usize>,
}

async fn upload_import(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    mut multipart: Multipart,
) -> HttpResult<Json<ImportApiResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut fields: HashMap<String, String> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| locale.error(ApiError::InvalidInput(format!("表单读取失败: {}", e))))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload.html").to_string();
            let bytes = field.bytes().await.map_err(|e| {
                locale.error(ApiError::InvalidInput(format!("文件读取失败: {}", e)))
            })?;
            file = Some((file_name, bytes.to_vec()));
        } else {
            let text = field.text().await.map_err(|e| {
                locale.error(ApiError::InvalidInput(format!("字段 {} 读取失败: {}", name, e)))
            })?;
            fields.insert(name, text);
        }
    }

    let (file_name, bytes) = file
        .ok_or_else(|| locale.error(ApiError::InvalidInput("缺少上传文件字段 file".to_string())))?;
    let context = context_from_fields(&fields).map_err(|e| locale.error(e))?;

    let response = state
        .import_api
        .import_bytes(&file_name, bytes, context)
        .await
        .map_err(|e| locale.error(e))?;
    Ok(Json(response))
}

async fn import_records(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Json(body): Json<ImportRecordsBody>,
) -> HttpResult<Json<ImportApiResponse>> {
    let response = state
        .import_api
        .import_records(body.context, body.records)
        .await
        .map_err(|e| locale.error(e))?;
    Ok(Json(response))
}

async fn list_import_batches(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Query(params): Query<BatchListParams>,
) -> HttpResult<Json<Vec<ImportBatch>>> {
    let batches = blocking(move || state.import_api.list_batches(params.limit))
        .await
        .map_err(|e| locale.error(e))?;
    Ok(Json(batches))
}

async fn get_import_batch(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Path(batch_id): Path<String>,
) -> HttpResult<Json<ImportBatch>> {
    let batch = blocking(move || state.import_api.get_batch(&batch_id))
        .await
        .map_err(|e| locale.error(e))?;
    Ok(Json(batch))
}

// ==========================================
// 配置 handlers
// ==========================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigValueBody {
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigValueResponse {
    pub key: String,
    pub value: String,
}

async fn list_configs(
    State(state): State<Arc<AppState>>,
    locale: Locale,
) -> HttpResult<Json<Vec<ConfigEntry>>> {
    let entries = blocking(move || state.config_api.list_configs())
        .await
        .map_err(|e| locale.error(e))?;
    Ok(Json(entries))
}

async fn get_config(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Path(key): Path<String>,
) -> HttpResult<Json<ConfigValueResponse>> {
    let response = blocking(move || {
        let value = state.config_api.get_config(&key)?;
        Ok(ConfigValueResponse { key, value })
    })
    .await
    .map_err(|e| locale.error(e))?;
    Ok(Json(response))
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    Path(key): Path<String>,
    Json(body): Json<ConfigValueBody>,
) -> HttpResult<Json<ConfigValueResponse>> {
    let response = blocking(move || {
        state.config_api.update_config(&key, &body.value)?;
        Ok(ConfigValueResponse {
            key,
            value: body.value,
        })
    })
    .await
    .map_err(|e| locale.error(e))?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_context_from_fields() {
        let ctx = context_from_fields(&fields(&[
            ("division", "fp"),
            ("year", "2025"),
            ("salesRep", " Narek "),
            ("valueType", "kgs"),
            ("type", "Budget"),
            ("unit", "MT"),
            ("imported_by", ""),
        ]))
        .unwrap();

        assert_eq!(ctx.division, Some(Division::Fp));
        assert_eq!(ctx.year, Some(2025));
        assert_eq!(ctx.sales_rep.as_deref(), Some("Narek"));
        assert_eq!(ctx.value_type, Some(ValueType::Kgs));
        assert_eq!(ctx.record_type, Some(RecordType::Budget));
        assert_eq!(ctx.source_unit, Some(Unit::Mt));
        assert_eq!(ctx.imported_by, None);
    }

    #[test]
    fn test_context_from_fields_rejects_unknown_codes() {
        assert!(matches!(
            context_from_fields(&fields(&[("division", "XX")])),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            context_from_fields(&fields(&[("year", "20x5")])),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(context_from_fields(&HashMap::new()).is_ok());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(&ApiError::ValidationError("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(&ApiError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(&ApiError::BusinessRuleViolation("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(&ApiError::StoreUnavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(&ApiError::DatabaseError("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_parse_flag() {
        assert!(!parse_flag(None).unwrap());
        assert!(parse_flag(Some("TRUE")).unwrap());
        assert!(parse_flag(Some("maybe")).is_err());
    }
}

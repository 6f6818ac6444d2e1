use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod cli;
pub mod config;
mod error;

pub use error::ApiError;

use crate::core::{
    DEFAULT_MODEL, FunnelInputs, ModelConfig, ProjectionInputs, QuickKpiInputs,
    calculate_tier_metrics, export_audit, quick_kpis, run_projection,
};
use cli::{
    build_funnel_inputs, build_projection_inputs, default_funnel_args, default_projection_args,
    require_finite,
};
use config::ServerConfig;

type SharedModel = Arc<ModelConfig>;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FunnelQuery {
    #[serde(alias = "base_cvr")]
    base_cvr: Option<f64>,
    #[serde(alias = "total_budget")]
    total_budget: Option<f64>,
    ctr: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProjectionPayload {
    marketing_budget: f64,
    base_cvr: Option<f64>,
    ctr: Option<f64>,
    months: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CalculatePayload {
    kpi: KpiPayload,
    marketing: MarketingPayload,
    financial: FinancialPayload,
}

#[derive(Debug, Deserialize)]
struct KpiPayload {
    mrr: f64,
    arpu: f64,
    churn_rate: f64,
    active_users: u64,
}

#[derive(Debug, Deserialize)]
struct MarketingPayload {
    marketing_spend: f64,
    cost_per_lead: f64,
    conversion_rate: f64,
}

#[derive(Debug, Deserialize)]
struct FinancialPayload {
    wacc: f64,
    irr: f64,
    stripe_fee: f64,
    carbon_cost: f64,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(model: ModelConfig) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/marketing/tiers", get(tiers_handler))
        .route("/api/marketing/benchmarks", get(benchmarks_handler))
        .route("/api/projection", post(projection_handler))
        .route("/api/calculate", post(calculate_handler))
        .route("/api/audit/export", get(audit_handler))
        .fallback(not_found_handler)
        .with_state(Arc::new(model))
}

pub async fn run_http_server(config: ServerConfig) -> anyhow::Result<()> {
    let app = router(DEFAULT_MODEL)
        .layer(config.cors_layer)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "projection API listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    ApiError::NotFound.into_response()
}

async fn benchmarks_handler(State(model): State<SharedModel>) -> Response {
    json_response(StatusCode::OK, model.as_ref())
}

async fn tiers_handler(
    State(model): State<SharedModel>,
    query: Result<Query<FunnelQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let inputs = funnel_inputs_from_query(query)?;

    let metrics = calculate_tier_metrics(&model, inputs.base_cvr, inputs.total_budget, inputs.ctr);
    tracing::debug!(
        base_cvr = inputs.base_cvr,
        total_budget = inputs.total_budget,
        ctr = inputs.ctr,
        total_leads = metrics.total_leads,
        "tier metrics computed"
    );
    Ok(json_response(StatusCode::OK, metrics))
}

async fn audit_handler(
    State(model): State<SharedModel>,
    query: Result<Query<FunnelQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let inputs = funnel_inputs_from_query(query)?;

    let rows = export_audit(&model, inputs.base_cvr, inputs.total_budget, inputs.ctr);
    let flagged = rows.iter().filter(|row| row.cpl_flag || row.cvr_flag).count();
    tracing::debug!(flagged_rows = flagged, "audit exported");
    Ok(json_response(StatusCode::OK, rows))
}

async fn projection_handler(
    State(model): State<SharedModel>,
    payload: Result<Json<ProjectionPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let inputs = projection_inputs_from_payload(payload).map_err(ApiError::InvalidInput)?;

    let result = run_projection(&model, &inputs);
    if !result.flags.is_empty() {
        tracing::warn!(
            base_cvr = inputs.base_cvr,
            flags = ?result.flags,
            "projection inputs outside benchmark ranges"
        );
    }
    tracing::debug!(
        marketing_budget = inputs.marketing_budget,
        months = inputs.months,
        npv = result.kpis.npv,
        "projection computed"
    );
    Ok(json_response(StatusCode::OK, result))
}

async fn calculate_handler(
    payload: Result<Json<CalculatePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let inputs = quick_kpi_inputs_from_payload(&payload).map_err(ApiError::InvalidInput)?;

    let kpis = quick_kpis(&inputs);
    tracing::debug!(
        active_users = payload.kpi.active_users,
        ltv = kpis.ltv,
        cac = kpis.cac,
        "quick kpis computed"
    );
    Ok(json_response(StatusCode::OK, kpis))
}

fn quick_kpi_inputs_from_payload(payload: &CalculatePayload) -> Result<QuickKpiInputs, String> {
    let CalculatePayload {
        kpi,
        marketing,
        financial,
    } = payload;
    require_finite([
        ("kpi.mrr", kpi.mrr),
        ("kpi.arpu", kpi.arpu),
        ("kpi.churn_rate", kpi.churn_rate),
        ("marketing.marketing_spend", marketing.marketing_spend),
        ("marketing.cost_per_lead", marketing.cost_per_lead),
        ("marketing.conversion_rate", marketing.conversion_rate),
        ("financial.wacc", financial.wacc),
        ("financial.irr", financial.irr),
        ("financial.stripe_fee", financial.stripe_fee),
        ("financial.carbon_cost", financial.carbon_cost),
    ])?;

    Ok(QuickKpiInputs {
        mrr: kpi.mrr,
        arpu: kpi.arpu,
        churn_rate: kpi.churn_rate,
        marketing_spend: marketing.marketing_spend,
        cost_per_lead: marketing.cost_per_lead,
        conversion_rate: marketing.conversion_rate,
    })
}

fn funnel_inputs_from_query(query: FunnelQuery) -> Result<FunnelInputs, ApiError> {
    let mut args = default_funnel_args();
    if let Some(v) = query.base_cvr {
        args.base_cvr = v;
    }
    if let Some(v) = query.total_budget {
        args.total_budget = v;
    }
    if let Some(v) = query.ctr {
        args.ctr = v;
    }
    build_funnel_inputs(args).map_err(ApiError::InvalidInput)
}

fn projection_inputs_from_payload(payload: ProjectionPayload) -> Result<ProjectionInputs, String> {
    let mut args = default_projection_args();
    args.marketing_budget = payload.marketing_budget;
    if let Some(v) = payload.base_cvr {
        args.base_cvr = v;
    }
    if let Some(v) = payload.ctr {
        args.ctr = v;
    }
    if let Some(v) = payload.months {
        args.months = v;
    }
    build_projection_inputs(args)
}

#[cfg(test)]
fn projection_inputs_from_json(json: &str) -> Result<ProjectionInputs, String> {
    let payload = serde_json::from_str::<ProjectionPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    projection_inputs_from_payload(payload)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DEFAULT_BASE_CVR, DEFAULT_CTR, DEFAULT_PROJECTION_MONTHS};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use std::fs;
    use std::path::Path;
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    async fn send(request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = router(DEFAULT_MODEL)
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let cache_control = response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let json = serde_json::from_slice(&bytes).expect("body should be JSON");
        (status, cache_control, json)
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        let (status, _, json) = send(request).await;
        (status, json)
    }

    async fn post_json(uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .expect("valid request");
        let (status, _, json) = send(request).await;
        (status, json)
    }

    fn as_f64_vec(value: &Value) -> Vec<f64> {
        value
            .as_array()
            .expect("array")
            .iter()
            .map(|v| v.as_f64().expect("number"))
            .collect()
    }

    fn assert_golden_snapshot(path: &str, actual: &Value) {
        let update = matches!(
            std::env::var("UPDATE_GOLDEN").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        );
        let snapshot_path = Path::new(path);

        if update {
            if let Some(parent) = snapshot_path.parent() {
                fs::create_dir_all(parent).expect("failed to create snapshot directory");
            }
            let pretty = serde_json::to_string_pretty(actual).expect("snapshot serializes");
            fs::write(snapshot_path, format!("{pretty}\n")).expect("failed to write golden snapshot");
            return;
        }

        let expected = fs::read_to_string(snapshot_path).unwrap_or_else(|_| {
            panic!("missing golden snapshot at {path}; run with UPDATE_GOLDEN=1 to generate")
        });
        let expected: Value = serde_json::from_str(&expected).expect("snapshot is valid JSON");
        // Compare what a client would parse, not the in-memory f64s.
        let rendered = serde_json::to_string(actual).expect("snapshot serializes");
        let actual: Value = serde_json::from_str(&rendered).expect("rendered JSON parses");
        assert_json_eq(&expected, &actual, "$");
    }

    fn assert_json_eq(expected: &Value, actual: &Value, path: &str) {
        match (expected, actual) {
            (Value::Number(e), Value::Number(a)) => {
                let e = e.as_f64().expect("number");
                let a = a.as_f64().expect("number");
                assert!(
                    e == a,
                    "snapshot mismatch at {path}: expected {e}, got {a}; run with UPDATE_GOLDEN=1 to refresh if expected"
                );
            }
            (Value::Array(e), Value::Array(a)) => {
                assert_eq!(e.len(), a.len(), "snapshot length mismatch at {path}");
                for (idx, (e, a)) in e.iter().zip(a).enumerate() {
                    assert_json_eq(e, a, &format!("{path}[{idx}]"));
                }
            }
            (Value::Object(e), Value::Object(a)) => {
                let mut expected_keys = e.keys().collect::<Vec<_>>();
                let mut actual_keys = a.keys().collect::<Vec<_>>();
                expected_keys.sort();
                actual_keys.sort();
                assert_eq!(expected_keys, actual_keys, "snapshot keys mismatch at {path}");
                for (key, e) in e {
                    assert_json_eq(e, &a[key], &format!("{path}.{key}"));
                }
            }
            _ => assert_eq!(expected, actual, "snapshot mismatch at {path}"),
        }
    }

    #[test]
    fn projection_inputs_from_json_applies_defaults() {
        let inputs =
            projection_inputs_from_json(r#"{"marketing_budget": 7500}"#).expect("json should parse");
        assert_approx(inputs.marketing_budget, 7_500.0);
        assert_eq!(inputs.months, DEFAULT_PROJECTION_MONTHS);
        assert_approx(inputs.base_cvr, DEFAULT_BASE_CVR);
        assert_approx(inputs.ctr, DEFAULT_CTR);
    }

    #[test]
    fn projection_inputs_from_json_parses_all_fields() {
        let inputs = projection_inputs_from_json(
            r#"{"marketing_budget": 12000, "base_cvr": 3.1, "ctr": 19, "months": 36}"#,
        )
        .expect("json should parse");
        assert_approx(inputs.marketing_budget, 12_000.0);
        assert_approx(inputs.base_cvr, 3.1);
        assert_approx(inputs.ctr, 19.0);
        assert_eq!(inputs.months, 36);
    }

    #[test]
    fn projection_inputs_from_json_requires_budget() {
        let err = projection_inputs_from_json(r#"{"months": 12}"#).expect_err("budget is required");
        assert!(err.contains("marketing_budget"));
    }

    #[test]
    fn projection_inputs_from_json_rejects_negative_months() {
        assert!(projection_inputs_from_json(r#"{"marketing_budget": 1, "months": -3}"#).is_err());
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (status, json) = get_json("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn tiers_endpoint_uses_defaults_and_sets_no_store() {
        let request = Request::builder()
            .uri("/api/marketing/tiers")
            .body(Body::empty())
            .expect("valid request");
        let (status, cache_control, json) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache_control.as_deref(), Some("no-store"));

        let expected = calculate_tier_metrics(&DEFAULT_MODEL, DEFAULT_BASE_CVR, 10_000.0, DEFAULT_CTR);
        assert_approx(json["total_leads"].as_f64().expect("number"), expected.total_leads);
        for key in [
            "cpl",
            "cvr",
            "clicks",
            "leads",
            "new_customers",
            "impressions",
            "budget",
            "ctr",
        ] {
            assert_eq!(json[key].as_array().map(Vec::len), Some(4), "{key} should have 4 tiers");
        }
        for key in ["total_leads", "total_new_customers", "total_clicks", "total_impressions"] {
            assert!(json[key].is_number(), "{key} should be a number");
        }
    }

    #[tokio::test]
    async fn tiers_endpoint_reads_camel_case_query() {
        let (status, json) =
            get_json("/api/marketing/tiers?baseCvr=4&totalBudget=20000&ctr=19").await;
        assert_eq!(status, StatusCode::OK);
        let expected = calculate_tier_metrics(&DEFAULT_MODEL, 4.0, 20_000.0, 19.0);
        let cvr = as_f64_vec(&json["cvr"]);
        for (actual, expected) in cvr.iter().zip(expected.cvr) {
            assert_approx(*actual, expected);
        }
        let new_customers = as_f64_vec(&json["new_customers"]);
        let sum: f64 = new_customers.iter().sum();
        assert!((sum - json["total_new_customers"].as_f64().expect("number")).abs() < 1e-6);
    }

    #[tokio::test]
    async fn tiers_endpoint_rejects_unparsable_query_with_json_error() {
        let (status, json) = get_json("/api/marketing/tiers?baseCvr=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn tiers_endpoint_rejects_non_finite_values() {
        let (status, json) = get_json("/api/marketing/tiers?totalBudget=NaN").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            json["error"]
                .as_str()
                .expect("error message")
                .contains("--total-budget")
        );
    }

    #[tokio::test]
    async fn projection_endpoint_returns_series_kpis_and_flags() {
        let (status, json) = post_json("/api/projection", r#"{"marketing_budget": 10000}"#).await;
        assert_eq!(status, StatusCode::OK);
        for key in [
            "impressions",
            "clicks",
            "leads",
            "new_customers",
            "active_customers",
            "total_mrr",
            "gross_profit",
            "cac",
            "free_cash_flow",
        ] {
            assert_eq!(
                json[key].as_array().map(Vec::len),
                Some(DEFAULT_PROJECTION_MONTHS as usize),
                "{key} should span the default horizon"
            );
        }
        for key in ["npv", "paybackMonths", "subscriberLtv", "blendedCvr", "blendedCpl"] {
            assert!(json["kpis"][key].is_number(), "kpis.{key} should be a number");
        }
        assert_eq!(json["flags"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn projection_endpoint_reports_flags_for_out_of_range_cvr() {
        let (status, json) = post_json(
            "/api/projection",
            r#"{"marketing_budget": 10000, "base_cvr": 8, "months": 2}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let flags = json["flags"].as_array().expect("flags array");
        assert_eq!(flags[0], "base_cvr_out_of_range");
        assert_eq!(json["active_customers"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn projection_endpoint_handles_zero_months_and_zero_budget() {
        let (status, json) =
            post_json("/api/projection", r#"{"marketing_budget": 10000, "months": 0}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["active_customers"], serde_json::json!([]));
        assert_approx(json["kpis"]["paybackMonths"].as_f64().expect("number"), 0.0);

        let (status, json) =
            post_json("/api/projection", r#"{"marketing_budget": 0, "months": 1}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_f64_vec(&json["new_customers"]), vec![0.0]);
        assert_eq!(as_f64_vec(&json["active_customers"]), vec![0.0]);
    }

    #[tokio::test]
    async fn projection_endpoint_rejects_missing_budget_with_json_error() {
        let (status, json) = post_json("/api/projection", r#"{"months": 12}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn projection_endpoint_rejects_malformed_json() {
        let (status, json) = post_json("/api/projection", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn projection_endpoint_rejects_excessive_horizon() {
        let (status, json) =
            post_json("/api/projection", r#"{"marketing_budget": 100, "months": 100000}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().expect("message").contains("--months"));
    }

    #[tokio::test]
    async fn audit_endpoint_returns_four_rows() {
        let (status, json) =
            get_json("/api/audit/export?baseCvr=4&totalBudget=10000&ctr=18").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().expect("rows array");
        assert_eq!(rows.len(), 4);
        for (idx, row) in rows.iter().enumerate() {
            assert_eq!(row["tier"], idx + 1);
            assert!(row["cpl"].is_number());
            assert!(row["cvr"].is_number());
            assert_eq!(row["cpl_range"].as_array().map(Vec::len), Some(2));
            assert_eq!(row["cvr_range"].as_array().map(Vec::len), Some(2));
            assert!(row["cpl_flag"].is_boolean());
            assert!(row["cvr_flag"].is_boolean());
        }
    }

    #[tokio::test]
    async fn benchmarks_endpoint_exposes_tier_table() {
        let (status, json) = get_json("/api/marketing/benchmarks").await;
        assert_eq!(status, StatusCode::OK);
        let tiers = json["tiers"].as_array().expect("tiers array");
        assert_eq!(tiers.len(), 4);
        assert_eq!(tiers[0]["cvrBenchmark"], serde_json::json!([2.0, 4.0]));
        assert_approx(tiers[3]["monthlyPrice"].as_f64().expect("number"), 7_500.0);
        assert_approx(tiers[1]["cplFactor"].as_f64().expect("number"), 1.6);
    }

    #[tokio::test]
    async fn unknown_route_returns_json_not_found() {
        let (status, json) = get_json("/api/projects").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json, serde_json::json!({ "error": "Not found" }));
    }

    #[tokio::test]
    async fn tiers_endpoint_accepts_snake_case_query_keys() {
        let (status, json) = get_json("/api/marketing/tiers?base_cvr=4&total_budget=20000").await;
        assert_eq!(status, StatusCode::OK);
        let expected = calculate_tier_metrics(&DEFAULT_MODEL, 4.0, 20_000.0, DEFAULT_CTR);
        assert_approx(json["budget"][0].as_f64().expect("number"), 8_000.0);
        assert_approx(json["cvr"][0].as_f64().expect("number"), 4.0);
        assert_approx(
            json["total_leads"].as_f64().expect("number"),
            expected.total_leads,
        );
    }

    fn calculate_body(churn_rate: f64, cost_per_lead: f64, conversion_rate: f64) -> String {
        serde_json::json!({
            "kpi": { "mrr": 100, "arpu": 10, "churn_rate": churn_rate, "active_users": 50 },
            "marketing": {
                "marketing_spend": 1000,
                "cost_per_lead": cost_per_lead,
                "conversion_rate": conversion_rate
            },
            "financial": { "wacc": 0.05, "irr": 0.1, "stripe_fee": 0.029, "carbon_cost": 0.0 }
        })
        .to_string()
    }

    #[tokio::test]
    async fn calculate_endpoint_returns_revenue_ltv_and_cac() {
        let (status, json) = post_json("/api/calculate", &calculate_body(0.1, 50.0, 0.1)).await;
        assert_eq!(status, StatusCode::OK);
        let keys = json
            .as_object()
            .expect("object")
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(keys.len(), 3);
        assert_approx(json["annual_revenue"].as_f64().expect("number"), 1_200.0);
        assert_approx(json["ltv"].as_f64().expect("number"), 100.0);
        assert_approx(json["cac"].as_f64().expect("number"), 500.0);
    }

    #[tokio::test]
    async fn calculate_endpoint_floors_zero_divisors() {
        let (status, json) = post_json("/api/calculate", &calculate_body(0.0, 0.0, 0.0)).await;
        assert_eq!(status, StatusCode::OK);
        let ltv = json["ltv"].as_f64().expect("number");
        let cac = json["cac"].as_f64().expect("number");
        assert!((ltv - 10.0 / 1e-6).abs() <= 1e-3);
        assert!((cac - 1_000.0 / 1e-6).abs() <= 1e-1);
    }

    #[tokio::test]
    async fn calculate_endpoint_requires_every_section() {
        let body = serde_json::json!({
            "kpi": { "mrr": 100, "arpu": 10, "churn_rate": 0.1, "active_users": 50 },
            "marketing": { "marketing_spend": 1000, "cost_per_lead": 50, "conversion_rate": 0.1 }
        })
        .to_string();
        let (status, json) = post_json("/api/calculate", &body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].as_str().expect("message").contains("financial"));
    }

    #[test]
    fn quick_kpi_inputs_reject_non_finite_fields() {
        let mut payload: CalculatePayload =
            serde_json::from_str(&calculate_body(0.1, 50.0, 0.1)).expect("payload parses");
        payload.financial.irr = f64::NAN;
        let err = quick_kpi_inputs_from_payload(&payload).expect_err("must reject NaN");
        assert!(err.contains("financial.irr"));

        payload.financial.irr = 0.1;
        payload.kpi.churn_rate = f64::INFINITY;
        let err = quick_kpi_inputs_from_payload(&payload).expect_err("must reject inf");
        assert!(err.contains("kpi.churn_rate"));
    }

    #[tokio::test]
    async fn configured_cors_layer_answers_cross_origin_requests() {
        let args = cli::ServeArgs {
            host: "127.0.0.1".to_string(),
            port: 8001,
            cors_allow_origins: "http://localhost:3000".to_string(),
            cors_allow_methods: "GET,POST".to_string(),
            cors_allow_headers: "content-type".to_string(),
        };
        let config = ServerConfig::try_from(args).expect("valid config");
        let app = router(DEFAULT_MODEL).layer(config.cors_layer);

        let request = Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .expect("valid request");
        let response = app.oneshot(request).await.expect("router is infallible");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:3000")
        );
    }

    #[test]
    fn golden_snapshot_baseline_projection_json() {
        let mut args = default_projection_args();
        args.marketing_budget = 10_000.0;
        args.months = 24;
        args.base_cvr = 2.75;
        args.ctr = 19.0;

        let inputs = build_projection_inputs(args).expect("valid inputs");
        let result = run_projection(&DEFAULT_MODEL, &inputs);
        let json = serde_json::to_value(&result).expect("result should serialize");

        assert_golden_snapshot("tests/golden/projection_baseline.json", &json);
    }

    #[test]
    fn golden_snapshot_audit_json() {
        let rows = export_audit(&DEFAULT_MODEL, 4.0, 10_000.0, 19.0);
        let json = serde_json::to_value(&rows).expect("rows should serialize");

        assert_golden_snapshot("tests/golden/audit_base_cvr_4.json", &json);
    }
}

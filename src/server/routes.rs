use crate::errors::{DashboardError, DashboardResult};
use crate::metrics::resolve;
use crate::metrics::timeseries::month_start;
use crate::regen::RegenerationReport;
use crate::state::{
    AppState, AucHistoryPoint, AucMetrics, CustomerGrowthPoint, CustomerHistory, CustomerMetrics,
    CustomerSegmentBreakdown, IncomeByService, IncomeHistoryPoint, IncomeMetrics, MonthlyCustomerSnapshot,
    NewCustomerHistory, NewMonthlySnapshot, TopCustomer, TradingVolumePoint,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use std::sync::Arc;

type ApiResult<T> = DashboardResult<Json<T>>;

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateQuery {
    #[serde(default)]
    pub dry_run: bool,
}

/// GET /api/health -- liveness plus the active storage backend
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "storage": state.store.backend_name(),
    }))
}

/// GET /api/customer-metrics -- derived from snapshots, else the flat row
pub async fn get_customer_metrics(State(state): State<Arc<AppState>>) -> ApiResult<CustomerMetrics> {
    resolve::customer_metrics(state.store.as_ref()).map(Json)
}

/// GET /api/customer-growth
pub async fn get_customer_growth(State(state): State<Arc<AppState>>) -> ApiResult<Vec<CustomerGrowthPoint>> {
    resolve::customer_growth(state.store.as_ref()).map(Json)
}

/// GET /api/customer-segments
pub async fn get_customer_segments(State(state): State<Arc<AppState>>) -> ApiResult<Vec<CustomerSegmentBreakdown>> {
    resolve::customer_segments(state.store.as_ref()).map(Json)
}

/// GET /api/auc-metrics
pub async fn get_auc_metrics(State(state): State<Arc<AppState>>) -> ApiResult<AucMetrics> {
    resolve::auc_metrics(state.store.as_ref()).map(Json)
}

/// GET /api/income
pub async fn get_income(State(state): State<Arc<AppState>>) -> ApiResult<IncomeMetrics> {
    resolve::income(state.store.as_ref()).map(Json)
}

// Raw series are passed through; an empty table is an empty list.

pub async fn get_auc_history(State(state): State<Arc<AppState>>) -> ApiResult<Vec<AucHistoryPoint>> {
    state.store.auc_history().map(Json)
}

pub async fn get_income_history(State(state): State<Arc<AppState>>) -> ApiResult<Vec<IncomeHistoryPoint>> {
    state.store.income_history().map(Json)
}

pub async fn get_income_by_service(State(state): State<Arc<AppState>>) -> ApiResult<Vec<IncomeByService>> {
    state.store.income_by_service().map(Json)
}

pub async fn get_trading_volume(State(state): State<Arc<AppState>>) -> ApiResult<Vec<TradingVolumePoint>> {
    state.store.trading_volume().map(Json)
}

pub async fn get_top_customers(State(state): State<Arc<AppState>>) -> ApiResult<Vec<TopCustomer>> {
    state.store.top_customers().map(Json)
}

pub async fn get_monthly_customer_data(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<MonthlyCustomerSnapshot>> {
    state.store.monthly_snapshots().map(Json)
}

/// POST /api/monthly-customer-data -- validate and store one month of counts
pub async fn create_monthly_customer_data(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewMonthlySnapshot>, JsonRejection>,
) -> DashboardResult<(StatusCode, Json<MonthlyCustomerSnapshot>)> {
    let Json(snapshot) = payload.map_err(|e| DashboardError::Validation(e.body_text()))?;
    let stored = state.store.insert_monthly_snapshot(snapshot)?;
    tracing::info!("monthly customer data stored for {}", stored.month.format("%Y-%m"));
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn get_customer_history(State(state): State<Arc<AppState>>) -> ApiResult<Vec<CustomerHistory>> {
    state.store.customer_history().map(Json)
}

/// POST /api/customer-history -- validate and store one lifecycle record
pub async fn create_customer_history(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewCustomerHistory>, JsonRejection>,
) -> DashboardResult<(StatusCode, Json<CustomerHistory>)> {
    let Json(record) = payload.map_err(|e| DashboardError::Validation(e.body_text()))?;
    let stored = state.store.insert_customer_history(record)?;
    tracing::info!("customer history stored for {}", stored.date.format("%Y-%m"));
    Ok((StatusCode::CREATED, Json(stored)))
}

/// POST /api/regenerate-customer-growth -- destructive rebuild, or preview with ?dryRun=true
pub async fn regenerate_customer_growth(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegenerateQuery>,
) -> ApiResult<RegenerationReport> {
    let end_month = month_start(chrono::Utc::now().date_naive());
    let report = if params.dry_run {
        state.regenerator.preview(end_month)?
    } else {
        state.regenerator.regenerate(state.store.as_ref(), end_month)?
    };
    Ok(Json(report))
}

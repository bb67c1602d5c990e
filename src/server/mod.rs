pub mod routes;

use crate::errors::{DashboardError, DashboardResult};
use crate::state::AppState;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

fn cors_layer(origin: Option<&str>) -> DashboardResult<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin {
        Some(origin) => {
            let value = HeaderValue::from_str(origin)
                .map_err(|e| DashboardError::Config(format!("invalid CORS_ORIGIN {origin:?}: {e}")))?;
            Ok(layer.allow_origin(value))
        }
        None => Ok(layer.allow_origin(Any)),
    }
}

/// Full API router with state attached.
pub fn router(state: Arc<AppState>) -> DashboardResult<Router> {
    let cors = cors_layer(state.config.cors_origin.as_deref())?;

    Ok(Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/customer-metrics", get(routes::get_customer_metrics))
        .route("/api/customer-growth", get(routes::get_customer_growth))
        .route("/api/customer-segments", get(routes::get_customer_segments))
        .route("/api/auc-metrics", get(routes::get_auc_metrics))
        .route("/api/auc-history", get(routes::get_auc_history))
        .route("/api/income", get(routes::get_income))
        .route("/api/income-history", get(routes::get_income_history))
        .route("/api/income-by-service", get(routes::get_income_by_service))
        .route("/api/trading-volume", get(routes::get_trading_volume))
        .route("/api/top-customers", get(routes::get_top_customers))
        .route(
            "/api/monthly-customer-data",
            get(routes::get_monthly_customer_data).post(routes::create_monthly_customer_data),
        )
        .route(
            "/api/customer-history",
            get(routes::get_customer_history).post(routes::create_customer_history),
        )
        .route("/api/regenerate-customer-growth", post(routes::regenerate_customer_growth))
        .layer(cors)
        .with_state(state))
}

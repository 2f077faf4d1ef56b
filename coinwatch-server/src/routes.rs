//! HTTP routes: coin listing, synchronous history queries, static assets.

use crate::{state::AppState, ws};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use smol_str::SmolStr;
use tower_http::services::ServeDir;

/// Build the full application router.
///
/// The asset directory is host-provided; its content is not part of this
/// service.
pub fn app(state: AppState, assets_dir: &str) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/coins", get(coins))
        .route("/history", get(history))
        .fallback_service(ServeDir::new(assets_dir))
        .with_state(state)
}

/// The static tracked symbol set.
async fn coins(State(state): State<AppState>) -> Json<Vec<SmolStr>> {
    Json(state.store.symbols().to_vec())
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    symbol: Option<String>,
    interval: Option<String>,
}

/// Synchronous history fetch for one symbol and interval.
///
/// Missing or empty parameters and unknown interval labels are the
/// caller's fault; upstream failures surface as a bad gateway.
async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<f64>>, (StatusCode, String)> {
    let (symbol, interval) = match (params.symbol, params.interval) {
        (Some(symbol), Some(interval)) if !symbol.is_empty() && !interval.is_empty() => {
            (symbol, interval)
        }
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                "missing symbol or interval".to_string(),
            ));
        }
    };

    state
        .source
        .fetch_history(&symbol, &interval)
        .await
        .map(Json)
        .map_err(|error| {
            let status = if error.is_request_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::BAD_GATEWAY
            };
            (status, error.to_string())
        })
}

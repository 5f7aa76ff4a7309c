use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{FieldSpec, ScanConfig};
use crate::observability::MetricsSnapshot;
use crate::service::ScanService;
use crate::sources::{MarketDataSource, SourceHealth};
use crate::types::ScannerError;
use crate::wire::{BarsQuery, BarsResponse, IvResponse, ScanRequest, ScanResponse};

/// Application state shared across handlers
pub struct AppState {
    pub service: ScanService,
    pub source: Arc<dyn MarketDataSource>,
}

impl AppState {
    pub fn new(service: ScanService) -> Self {
        let source = Arc::clone(service.processor().source());
        Self { service, source }
    }

    fn config(&self) -> &ScanConfig {
        self.service.processor().config()
    }

    /// Run a collaborator call under the per-symbol deadline
    async fn with_deadline<T>(
        &self,
        symbol: &str,
        call: impl Future<Output = Result<T, ScannerError>>,
    ) -> Result<T, (StatusCode, String)> {
        let deadline = self.service.processor().symbol_timeout();
        match tokio::time::timeout(deadline, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!("Market data error for {}: {}", symbol, e);
                Err((source_error_status(&e), e.to_string()))
            }
            Err(_) => {
                warn!("Market data call for {} timed out after {:?}", symbol, deadline);
                Err((
                    StatusCode::GATEWAY_TIMEOUT,
                    format!("market data call for {} timed out", symbol),
                ))
            }
        }
    }
}

/// HTTP routes for the scan service
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/scan", post(scan_universe))
        .route("/v1/bars/:symbol", get(get_historical_bars))
        .route("/v1/iv/:symbol", get(get_iv_percentile))
        .route("/v1/config", get(get_config))
        .route("/v1/config/schema", get(get_config_schema))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Status code for a failed collaborator call
fn source_error_status(error: &ScannerError) -> StatusCode {
    match error {
        ScannerError::SymbolNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// POST /v1/scan - Scan the requested symbols (or the configured universe)
pub async fn scan_universe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, (StatusCode, String)> {
    info!("Scan requested for {} symbols", request.symbols.len());

    match state.service.scan_universe(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            warn!("Scan could not start: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// GET /v1/bars/:symbol - Historical bars passthrough
pub async fn get_historical_bars(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<BarsQuery>,
) -> Result<Json<BarsResponse>, (StatusCode, String)> {
    let days = query.days.unwrap_or_else(|| state.config().lookback_days());

    let bars = state
        .with_deadline(&symbol, state.source.get_historical_bars(&symbol, days))
        .await?;
    Ok(Json(BarsResponse { bars }))
}

/// GET /v1/iv/:symbol - IV percentile passthrough
pub async fn get_iv_percentile(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<IvResponse>, (StatusCode, String)> {
    let percentile = state
        .with_deadline(&symbol, state.source.get_iv_percentile(&symbol))
        .await?;
    Ok(Json(IvResponse { percentile }))
}

/// GET /v1/config - Active scan configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ScanConfig> {
    Json(state.config().clone())
}

/// GET /v1/config/schema - Field descriptions for config editors
pub async fn get_config_schema() -> Json<Vec<FieldSpec>> {
    Json(ScanConfig::schema())
}

/// GET /health - Service health check
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let source = state.source.health().await;

    Json(HealthResponse {
        status: if source.is_healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        universe_size: state.config().universe.len(),
        source,
    })
}

/// GET /metrics - Metrics snapshot
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.service.metrics().snapshot().await)
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub universe_size: usize,
    pub source: SourceHealth,
}

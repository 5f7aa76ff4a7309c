//! RPC surface exercised through the axum router

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{falling_bars, rising_bars};
use scanner::handlers::{router, AppState};
use scanner::observability::metrics;
use scanner::{
    Bar, MarketDataSource, MetricsCollector, MockMarketDataSource, Processor, ScanConfig,
    ScanService, ScannerError,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

fn demo_config() -> ScanConfig {
    ScanConfig {
        universe: vec!["AAPL".to_string(), "SPY".to_string(), "AMZN".to_string()],
        ..ScanConfig::default()
    }
}

fn app_with(config: ScanConfig, source: Arc<dyn MarketDataSource>) -> (Router, ScanService) {
    let service = ScanService::new(
        Arc::new(Processor::new(config, source)),
        MetricsCollector::new(),
    );
    (router(Arc::new(AppState::new(service.clone()))), service)
}

fn app() -> (Router, ScanService) {
    let source = MockMarketDataSource::new()
        .with_bars("AAPL", rising_bars(60))
        .with_iv("AAPL", 0.3)
        .with_bars("SPY", falling_bars(60))
        .with_iv("SPY", 0.9)
        .with_failing("BROKEN");
    app_with(demo_config(), Arc::new(source))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn signal_of<'a>(body: &'a Value, symbol: &str) -> &'a Value {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["symbol"] == symbol)
        .map(|r| &r["signal"])
        .unwrap()
}

#[tokio::test]
async fn scan_without_symbols_uses_configured_universe() {
    let (app, _) = app();
    let (status, body) = send(app, post_json("/v1/scan", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["complete"], true);
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
    assert_eq!(signal_of(&body, "AAPL"), "CALL_DEBIT");
    assert_eq!(signal_of(&body, "SPY"), "PUT_CREDIT");
    // NONE entries are not filtered out
    assert_eq!(signal_of(&body, "AMZN"), "NONE");
}

#[tokio::test]
async fn scan_override_is_per_call() {
    let (app, service) = app();

    let (status, body) = send(
        app.clone(),
        post_json("/v1/scan", json!({ "symbols": ["BROKEN", "AAPL"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    let broken = results.iter().find(|r| r["symbol"] == "BROKEN").unwrap();
    assert_eq!(broken["signal"], "NONE");
    assert_eq!(broken["status"], "DATA_UNAVAILABLE");

    let (_, config) = send(app, get("/v1/config")).await;
    assert_eq!(config["universe"], json!(["AAPL", "SPY", "AMZN"]));
    assert_eq!(service.metrics().get_counter(metrics::SCANS).await, 1);
}

#[tokio::test]
async fn concurrent_overrides_do_not_interfere() {
    let (app, service) = app();

    let requests = [vec!["AAPL"], vec!["SPY", "QQQ"], vec![], vec!["BROKEN"]];
    let calls = requests.iter().map(|symbols| {
        let app = app.clone();
        let request = post_json("/v1/scan", json!({ "symbols": symbols }));
        async move { send(app, request).await }
    });
    let responses = futures::future::join_all(calls).await;

    for (symbols, (status, body)) in requests.iter().zip(responses) {
        assert_eq!(status, StatusCode::OK);
        let mut scanned: Vec<String> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["symbol"].as_str().unwrap().to_string())
            .collect();
        scanned.sort();

        let mut expected: Vec<String> = if symbols.is_empty() {
            demo_config().universe
        } else {
            symbols.iter().map(|s| s.to_string()).collect()
        };
        expected.sort();
        assert_eq!(scanned, expected);
    }

    assert_eq!(service.processor().config().universe, demo_config().universe);
    assert_eq!(service.metrics().get_counter(metrics::SCANS).await, 4);
}

#[tokio::test]
async fn scan_with_invalid_config_is_a_server_error() {
    let config = ScanConfig {
        candle_count: 0,
        ..demo_config()
    };
    let (app, _) = app_with(config, Arc::new(MockMarketDataSource::new()));

    let (status, _) = send(app, post_json("/v1/scan", json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn malformed_scan_body_is_rejected() {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/scan")
        .header("content-type", "application/json")
        .body(Body::from("{\"symbols\": "))
        .unwrap();

    let (status, _) = send(app, request).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn bars_passthrough() {
    let (app, _) = app();

    let (status, body) = send(app.clone(), get("/v1/bars/AAPL?days=5")).await;
    assert_eq!(status, StatusCode::OK);
    let bars: Vec<Bar> = serde_json::from_value(body["bars"].clone()).unwrap();
    assert_eq!(bars.len(), 5);
    assert_eq!(bars.last(), rising_bars(60).last());

    // Defaults to the scan lookback
    let (_, body) = send(app.clone(), get("/v1/bars/AAPL")).await;
    assert_eq!(body["bars"].as_array().unwrap().len(), 52);

    let (status, _) = send(app, get("/v1/bars/BROKEN")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn iv_passthrough() {
    let (app, _) = app();

    let (status, body) = send(app.clone(), get("/v1/iv/SPY")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["percentile"], 0.9);

    let (status, _) = send(app, get("/v1/iv/BROKEN")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn stalled_passthrough_times_out() {
    let source = MockMarketDataSource::new().with_stalled("SLOW");
    let service = ScanService::new(
        Arc::new(
            Processor::new(demo_config(), Arc::new(source))
                .with_timeout(Duration::from_millis(100)),
        ),
        MetricsCollector::new(),
    );
    let app = router(Arc::new(AppState::new(service)));

    let started = Instant::now();
    let (status, _) = send(app.clone(), get("/v1/bars/SLOW")).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    let (status, _) = send(app, get("/v1/iv/SLOW")).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(2));
}

struct UnknownSymbols;

#[async_trait::async_trait]
impl MarketDataSource for UnknownSymbols {
    async fn get_historical_bars(&self, symbol: &str, _days: usize) -> scanner::Result<Vec<Bar>> {
        Err(ScannerError::SymbolNotFound(symbol.to_string()))
    }

    async fn get_iv_percentile(&self, symbol: &str) -> scanner::Result<f64> {
        Err(ScannerError::SymbolNotFound(symbol.to_string()))
    }

    fn name(&self) -> &str {
        "unknown"
    }
}

#[tokio::test]
async fn unknown_symbol_is_not_found() {
    let (app, _) = app_with(demo_config(), Arc::new(UnknownSymbols));

    let (status, _) = send(app.clone(), get("/v1/bars/NOPE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app.clone(), get("/v1/iv/NOPE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A scan still answers, with every symbol degraded to NONE
    let (status, body) = send(app, post_json("/v1/scan", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["results"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["signal"] == "NONE" && r["status"] == "DATA_UNAVAILABLE"));
}

#[tokio::test]
async fn config_and_schema() {
    let (app, _) = app();

    let (status, config) = send(app.clone(), get("/v1/config")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["ma_period"], 50);
    assert_eq!(config["iv_threshold"], 0.8);

    let (status, schema) = send(app, get("/v1/config/schema")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = schema
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"ma_period"));
    assert!(names.contains(&"universe"));
}

#[tokio::test]
async fn health_and_metrics() {
    let (app, _) = app();

    let (status, health) = send(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["source"]["source"], "mock");
    assert_eq!(health["universe_size"], 3);

    send(app.clone(), post_json("/v1/scan", json!({}))).await;
    let (status, snapshot) = send(app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["counters"][metrics::SCANS], 1);
    assert_eq!(snapshot["counters"][metrics::SIGNALS_CALL_DEBIT], 1);
    assert_eq!(snapshot["counters"][metrics::SIGNALS_PUT_CREDIT], 1);
    assert_eq!(snapshot["counters"][metrics::SIGNALS_NONE], 1);
    assert_eq!(snapshot["gauges"][metrics::LAST_SCAN_SIGNAL_COUNT], 2.0);
}

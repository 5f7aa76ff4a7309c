use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use super::{MarketDataSource, SourceHealth};
use crate::types::{Bar, Result, ScannerError};
use crate::wire::{BarsResponse, IvResponse};

/// Transport-level timeout; scans normally impose a shorter one per symbol
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Internal health tracking for API-free health checks
struct HealthTracker {
    /// Timestamp of last successful request (millis since epoch)
    last_success_ms: AtomicU64,
    /// Timestamp of last failed request (millis since epoch)
    last_failure_ms: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    /// Last known latency in ms
    last_latency_ms: AtomicU64,
}

impl HealthTracker {
    fn new() -> Self {
        Self {
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            last_latency_ms: AtomicU64::new(0),
        }
    }

    fn now_ms() -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }

    fn record_success(&self, latency_ms: u64) {
        self.last_success_ms.store(Self::now_ms(), Ordering::Relaxed);
        self.last_latency_ms.store(latency_ms, Ordering::Relaxed);
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.last_failure_ms.store(Self::now_ms(), Ordering::Relaxed);
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    fn is_healthy(&self) -> bool {
        let last_success = self.last_success_ms.load(Ordering::Relaxed);
        let last_failure = self.last_failure_ms.load(Ordering::Relaxed);

        // No traffic yet counts as healthy
        if last_success == 0 && last_failure == 0 {
            return true;
        }
        last_success > 0 && (last_failure == 0 || last_success >= last_failure)
    }

    fn success_rate(&self) -> f64 {
        let successes = self.success_count.load(Ordering::Relaxed);
        let failures = self.failure_count.load(Ordering::Relaxed);
        let total = successes + failures;
        if total == 0 {
            return 1.0;
        }
        successes as f64 / total as f64
    }

    fn timestamp(ms: u64) -> Option<DateTime<Utc>> {
        if ms == 0 {
            return None;
        }
        DateTime::from_timestamp_millis(i64::try_from(ms).ok()?)
    }
}

/// Client for a remote market data service
///
/// Speaks the same contract the scanner serves itself:
/// `GET /v1/bars/{symbol}?days=N` and `GET /v1/iv/{symbol}`.
pub struct HttpMarketDataClient {
    client: Client,
    base_url: Url,
    health: HealthTracker,
}

impl HttpMarketDataClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ScannerError::InvalidConfig(format!("invalid market data URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ScannerError::InvalidConfig(format!(
                "market data URL cannot be a base: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ScannerError::ApiError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            health: HealthTracker::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        symbol: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let started = Instant::now();
        let outcome = self.send(symbol, request).await;

        match &outcome {
            Ok(_) => {
                let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                self.health.record_success(latency_ms);
            }
            Err(_) => self.health.record_failure(),
        }
        outcome
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        symbol: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ScannerError::ApiError(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ScannerError::SymbolNotFound(symbol.to_string()));
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                return Err(ScannerError::ApiError(format!(
                    "market data service returned {}: {}",
                    status, text
                )));
            }
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ScannerError::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl MarketDataSource for HttpMarketDataClient {
    async fn get_historical_bars(&self, symbol: &str, days: usize) -> Result<Vec<Bar>> {
        let url = self.endpoint(&["v1", "bars", symbol]);
        debug!(%symbol, days, %url, "Fetching historical bars");

        let request = self.client.get(url).query(&[("days", days)]);
        let response: BarsResponse = self.get_json(symbol, request).await?;
        Ok(response.bars)
    }

    async fn get_iv_percentile(&self, symbol: &str) -> Result<f64> {
        let url = self.endpoint(&["v1", "iv", symbol]);
        debug!(%symbol, %url, "Fetching IV percentile");

        let response: IvResponse = self.get_json(symbol, self.client.get(url)).await?;
        if !(0.0..=1.0).contains(&response.percentile) {
            return Err(ScannerError::InvalidResponse(format!(
                "IV percentile out of range for {}: {}",
                symbol, response.percentile
            )));
        }
        Ok(response.percentile)
    }

    fn name(&self) -> &str {
        "http"
    }

    async fn health(&self) -> SourceHealth {
        SourceHealth {
            source: format!("http:{}", self.base_url),
            is_healthy: self.health.is_healthy(),
            last_success: HealthTracker::timestamp(self.health.last_success_ms.load(Ordering::Relaxed)),
            last_error: HealthTracker::timestamp(self.health.last_failure_ms.load(Ordering::Relaxed)),
            success_rate: self.health.success_rate(),
            avg_latency_ms: self.health.last_latency_ms.load(Ordering::Relaxed),
        }
    }
}

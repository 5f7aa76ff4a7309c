//! In-memory market data source for tests and demo mode

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::MarketDataSource;
use crate::types::{Bar, Result, ScannerError};

/// IV percentile returned for symbols without a configured value
const DEFAULT_IV_PERCENTILE: f64 = 0.5;

/// Mock source with per-symbol data and failure injection
///
/// Unknown symbols get an empty bar series and the default IV percentile.
#[derive(Default)]
pub struct MockMarketDataSource {
    bars: HashMap<String, Vec<Bar>>,
    ivs: HashMap<String, f64>,
    should_fail: bool,
    failing: HashSet<String>,
    stalled: HashSet<String>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl MockMarketDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_iv(mut self, symbol: &str, iv_percentile: f64) -> Self {
        self.ivs.insert(symbol.to_string(), iv_percentile);
        self
    }

    /// Every call fails with `SourceUnavailable`
    pub fn failing_all(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Calls for `symbol` fail with `SourceUnavailable`
    pub fn with_failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    /// Calls for `symbol` never return
    pub fn with_stalled(mut self, symbol: &str) -> Self {
        self.stalled.insert(symbol.to_string());
        self
    }

    /// Sleep this long inside every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Highest number of calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Total calls started, including ones that failed or stalled
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Symbols passed to `get_historical_bars`, in call order
    pub fn requested_symbols(&self) -> Vec<String> {
        match self.requested.lock() {
            Ok(requested) => requested.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn enter(&self) -> InFlightGuard<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            counter: &self.in_flight,
        }
    }

    async fn simulate(&self, symbol: &str) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.stalled.contains(symbol) {
            return std::future::pending().await;
        }
        if self.should_fail || self.failing.contains(symbol) {
            return Err(ScannerError::SourceUnavailable(
                "market data service is unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

/// Decrements the in-flight counter even when the call future is dropped
struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl MarketDataSource for MockMarketDataSource {
    async fn get_historical_bars(&self, symbol: &str, days: usize) -> Result<Vec<Bar>> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(symbol.to_string());
        }
        let _guard = self.enter();
        self.simulate(symbol).await?;

        let bars = self.bars.get(symbol).map(Vec::as_slice).unwrap_or_default();
        let skip = bars.len().saturating_sub(days);
        Ok(bars[skip..].to_vec())
    }

    async fn get_iv_percentile(&self, symbol: &str) -> Result<f64> {
        let _guard = self.enter();
        self.simulate(symbol).await?;

        Ok(self
            .ivs
            .get(symbol)
            .copied()
            .unwrap_or(DEFAULT_IV_PERCENTILE))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

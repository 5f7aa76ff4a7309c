//! Market data collaborators
//!
//! The scanner only needs two calls per symbol: daily bars and an IV
//! percentile. Everything behind them (brokers, vendors, caches) lives on the
//! other side of [`MarketDataSource`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Bar, Result};

pub mod http;
pub mod mock;
pub mod synthetic;

pub use http::HttpMarketDataClient;
pub use mock::MockMarketDataSource;

/// Supplier of price history and implied volatility
///
/// Implementations are shared by every worker of a scan and must be safe for
/// concurrent use. Callers bound each call with a deadline and drop the
/// future on expiry, so implementations must not rely on running to
/// completion.
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Daily bars for `symbol`, oldest first, at most `days` long
    async fn get_historical_bars(&self, symbol: &str, days: usize) -> Result<Vec<Bar>>;

    /// IV percentile rank for `symbol`, in [0, 1]
    async fn get_iv_percentile(&self, symbol: &str) -> Result<f64>;

    /// Source name
    fn name(&self) -> &str;

    /// Source health status
    async fn health(&self) -> SourceHealth {
        SourceHealth {
            source: self.name().to_string(),
            is_healthy: true,
            last_success: None,
            last_error: None,
            success_rate: 1.0,
            avg_latency_ms: 0,
        }
    }
}

/// Data source health/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHealth {
    pub source: String,
    pub is_healthy: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<DateTime<Utc>>,
    pub success_rate: f64,
    pub avg_latency_ms: u64,
}

//! Observability: scan metrics and structured scan logging

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::types::{ScanReport, SignalType, SymbolStatus};

/// In-process metrics for the scan service
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<RwLock<MetricsInner>>,
}

struct MetricsInner {
    counters: HashMap<String, u64>,
    gauges: HashMap<String, f64>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner {
                counters: HashMap::new(),
                gauges: HashMap::new(),
                start_time: Instant::now(),
            })),
        }
    }

    /// Increment a counter
    pub async fn increment(&self, name: &str, value: u64) {
        let mut inner = self.inner.write().await;
        let counter = inner.counters.entry(name.to_string()).or_insert(0);
        *counter += value;
    }

    /// Fold one finished scan into the counters and gauges
    pub async fn record_scan(&self, report: &ScanReport) {
        let timeouts = report.count_status(SymbolStatus::TimedOut) as u64;
        let data_errors = report.count_status(SymbolStatus::DataUnavailable) as u64;
        let signal_count = report.signals().count();

        let mut inner = self.inner.write().await;
        let mut bump = |name: &str, value: u64| {
            *inner.counters.entry(name.to_string()).or_insert(0) += value;
        };

        bump(metrics::SCANS, 1);
        if !report.is_complete() {
            bump(metrics::SCANS_TRUNCATED, 1);
        }
        bump(metrics::SYMBOLS_SCANNED, report.results.len() as u64);
        bump(metrics::SYMBOL_TIMEOUTS, timeouts);
        bump(metrics::SYMBOL_DATA_ERRORS, data_errors);
        for result in &report.results {
            bump(metrics::signal_counter(result.signal), 1);
        }

        inner.gauges.insert(
            metrics::LAST_SCAN_DURATION_MS.to_string(),
            report.elapsed.as_secs_f64() * 1000.0,
        );
        inner
            .gauges
            .insert(metrics::LAST_SCAN_SIGNAL_COUNT.to_string(), signal_count as f64);
    }

    /// Get all metrics as JSON-serializable format
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read().await;
        MetricsSnapshot {
            counters: inner.counters.clone(),
            gauges: inner.gauges.clone(),
            uptime_secs: inner.start_time.elapsed().as_secs(),
        }
    }

    /// Get specific counter
    pub async fn get_counter(&self, name: &str) -> u64 {
        let inner = self.inner.read().await;
        inner.counters.get(name).copied().unwrap_or(0)
    }

    pub async fn get_gauge(&self, name: &str) -> Option<f64> {
        let inner = self.inner.read().await;
        inner.gauges.get(name).copied()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, f64>,
    pub uptime_secs: u64,
}

/// Structured log lines for scan events
pub struct ScanLogger;

impl ScanLogger {
    /// One line per actionable signal, then a summary line
    pub fn report(trigger: &str, report: &ScanReport) {
        for result in report.signals() {
            tracing::info!(
                symbol = %result.symbol,
                signal = %result.signal,
                "signal_detected"
            );
        }

        tracing::info!(
            trigger = %trigger,
            requested = report.requested,
            completed = report.results.len(),
            signals = report.signals().count(),
            timed_out = report.count_status(SymbolStatus::TimedOut),
            unavailable = report.count_status(SymbolStatus::DataUnavailable),
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "scan_complete"
        );
    }
}

/// Predefined metric names
pub mod metrics {
    use super::SignalType;

    // Scans
    pub const SCANS: &str = "scans_total";
    pub const SCANS_TRUNCATED: &str = "scans_truncated_total";
    pub const LAST_SCAN_DURATION_MS: &str = "last_scan_duration_ms";
    pub const LAST_SCAN_SIGNAL_COUNT: &str = "last_scan_signal_count";

    // Symbols
    pub const SYMBOLS_SCANNED: &str = "symbols_scanned_total";
    pub const SYMBOL_TIMEOUTS: &str = "symbol_timeouts_total";
    pub const SYMBOL_DATA_ERRORS: &str = "symbol_data_errors_total";

    // Signals
    pub const SIGNALS_CALL_DEBIT: &str = "signals_call_debit_total";
    pub const SIGNALS_PUT_DEBIT: &str = "signals_put_debit_total";
    pub const SIGNALS_CALL_CREDIT: &str = "signals_call_credit_total";
    pub const SIGNALS_PUT_CREDIT: &str = "signals_put_credit_total";
    pub const SIGNALS_NONE: &str = "signals_none_total";

    pub fn signal_counter(signal: SignalType) -> &'static str {
        match signal {
            SignalType::CallDebit => SIGNALS_CALL_DEBIT,
            SignalType::PutDebit => SIGNALS_PUT_DEBIT,
            SignalType::CallCredit => SIGNALS_CALL_CREDIT,
            SignalType::PutCredit => SIGNALS_PUT_CREDIT,
            SignalType::None => SIGNALS_NONE,
        }
    }
}

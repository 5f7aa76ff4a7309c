//! Concurrent scan engine
//!
//! One scan = one short-lived pool of tokio tasks:
//!
//! ```text
//! feeder --(bounded queue)--> N workers --(results)--> collector
//! ```
//!
//! Workers share the queue receiver. The result channel closes once every
//! worker has dropped its sender, which is how the collector knows the scan
//! is finished. Each symbol gets one deadline covering both collaborator
//! calls; an expired or failed symbol still yields a `NONE` result.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::pattern;
use crate::sources::MarketDataSource;
use crate::types::{Result, ScanReport, ScanResult, ScannerError, SignalType};

pub const DEFAULT_MAX_WORKERS: usize = 10;
pub const DEFAULT_SYMBOL_TIMEOUT: Duration = Duration::from_secs(5);

/// Receiving half of a scan cancellation
///
/// Cloneable; a signal whose canceller is dropped without cancelling never
/// fires.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

/// Sending half of a scan cancellation
#[derive(Debug)]
pub struct ScanCanceller {
    tx: watch::Sender<bool>,
}

impl ScanCanceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Another signal tied to this canceller
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
        }
    }
}

/// Create a linked canceller/signal pair
pub fn scan_cancellation() -> (ScanCanceller, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (ScanCanceller { tx }, CancelSignal { rx: Some(rx) })
}

/// Runs bounded-concurrency scans over a symbol universe
pub struct Processor {
    config: Arc<ScanConfig>,
    source: Arc<dyn MarketDataSource>,
    max_workers: usize,
    symbol_timeout: Duration,
}

impl Processor {
    pub fn new(config: ScanConfig, source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            config: Arc::new(config),
            source,
            max_workers: DEFAULT_MAX_WORKERS,
            symbol_timeout: DEFAULT_SYMBOL_TIMEOUT,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Deadline for one symbol's bars + IV fetch
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.symbol_timeout = timeout;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<dyn MarketDataSource> {
        &self.source
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn symbol_timeout(&self) -> Duration {
        self.symbol_timeout
    }

    /// Scan the configured universe
    pub async fn scan_configured(&self, cancel: CancelSignal) -> Result<ScanReport> {
        let universe = self.config.universe.clone();
        self.scan_all(&universe, cancel).await
    }

    /// Scan `universe`, one result per symbol in completion order
    ///
    /// Fails only when the scan cannot start. Per-symbol failures become
    /// `NONE` results. On cancellation, results collected so far are returned
    /// with `cancelled` set.
    pub async fn scan_all(&self, universe: &[String], mut cancel: CancelSignal) -> Result<ScanReport> {
        self.config.validate()?;
        if self.max_workers == 0 {
            return Err(ScannerError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }

        let started = Instant::now();
        let mut report = ScanReport {
            requested: universe.len(),
            ..ScanReport::default()
        };

        if universe.is_empty() {
            return Ok(report);
        }
        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        let workers = self.max_workers.min(universe.len());
        info!(
            symbols = universe.len(),
            workers,
            timeout_ms = self.symbol_timeout.as_millis() as u64,
            "Starting scan"
        );

        let (job_tx, job_rx) = mpsc::channel::<String>(workers);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<ScanResult>(universe.len());
        let mut tasks = JoinSet::new();

        let symbols = universe.to_vec();
        tasks.spawn(async move {
            for symbol in symbols {
                if job_tx.send(symbol).await.is_err() {
                    break;
                }
            }
        });

        for worker_id in 0..workers {
            let jobs = Arc::clone(&job_rx);
            let results = result_tx.clone();
            let source = Arc::clone(&self.source);
            let config = Arc::clone(&self.config);
            let timeout = self.symbol_timeout;

            tasks.spawn(async move {
                loop {
                    let next = jobs.lock().await.recv().await;
                    let Some(symbol) = next else {
                        break;
                    };
                    let result = scan_symbol(source.as_ref(), &config, symbol, timeout).await;
                    if results.send(result).await.is_err() {
                        break;
                    }
                }
                debug!(worker_id, "Worker exiting");
            });
        }
        drop(result_tx);

        let mut interrupted = false;
        while report.results.len() < universe.len() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    interrupted = true;
                    break;
                }
                next = result_rx.recv() => match next {
                    Some(result) => report.results.push(result),
                    None => break,
                },
            }
        }

        if interrupted {
            tasks.abort_all();
            while let Ok(result) = result_rx.try_recv() {
                report.results.push(result);
            }
            // Every symbol may already have reported before the cancel landed
            report.cancelled = report.results.len() < universe.len();
            if report.cancelled {
                warn!(
                    completed = report.results.len(),
                    requested = report.requested,
                    "Scan cancelled"
                );
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    warn!(error = %e, "Scan worker panicked");
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            completed = report.results.len(),
            signals = report.signals().count(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Scan finished"
        );
        Ok(report)
    }
}

async fn scan_symbol(
    source: &dyn MarketDataSource,
    config: &ScanConfig,
    symbol: String,
    timeout: Duration,
) -> ScanResult {
    match tokio::time::timeout(timeout, classify(source, config, &symbol)).await {
        Ok(Ok(signal)) => {
            debug!(%symbol, %signal, "Symbol evaluated");
            ScanResult::evaluated(symbol, signal)
        }
        Ok(Err(e)) => {
            warn!(%symbol, error = %e, "Market data unavailable");
            ScanResult::unavailable(symbol)
        }
        Err(_) => {
            warn!(%symbol, timeout_ms = timeout.as_millis() as u64, "Symbol timed out");
            ScanResult::timed_out(symbol)
        }
    }
}

/// Bars, then IV, then classify
async fn classify(
    source: &dyn MarketDataSource,
    config: &ScanConfig,
    symbol: &str,
) -> Result<SignalType> {
    let bars = source
        .get_historical_bars(symbol, config.lookback_days())
        .await?;
    let iv_percentile = source.get_iv_percentile(symbol).await?;
    Ok(pattern::evaluate(&bars, iv_percentile, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockMarketDataSource;
    use crate::types::SymbolStatus;

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_cancel_signal() {
        assert!(!CancelSignal::never().is_cancelled());

        let (canceller, mut signal) = scan_cancellation();
        let other = canceller.signal();
        assert!(!signal.is_cancelled());

        canceller.cancel();
        assert!(signal.is_cancelled());
        assert!(other.is_cancelled());
        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_canceller_never_fires() {
        let (canceller, mut signal) = scan_cancellation();
        drop(canceller);

        let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(waited.is_err());
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_empty_universe_is_not_an_error() {
        let processor = Processor::new(ScanConfig::default(), Arc::new(MockMarketDataSource::new()));
        let report = processor.scan_all(&[], CancelSignal::never()).await.unwrap();
        assert!(report.results.is_empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_refuses_to_start() {
        let source = Arc::new(MockMarketDataSource::new());
        let processor = Processor::new(ScanConfig::default(), source.clone()).with_max_workers(0);
        assert!(matches!(
            processor.scan_all(&symbols(&["AAPL"]), CancelSignal::never()).await,
            Err(ScannerError::InvalidConfig(_))
        ));

        let config = ScanConfig {
            ma_period: 0,
            ..ScanConfig::default()
        };
        let processor = Processor::new(config, source.clone());
        assert!(processor
            .scan_all(&symbols(&["AAPL"]), CancelSignal::never())
            .await
            .is_err());

        let config = ScanConfig {
            ma_period: usize::MAX,
            ..ScanConfig::default()
        };
        let processor = Processor::new(config, source.clone());
        assert!(matches!(
            processor.scan_all(&symbols(&["AAPL"]), CancelSignal::never()).await,
            Err(ScannerError::InvalidConfig(_))
        ));
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_degrade_to_none() {
        let source = Arc::new(MockMarketDataSource::new().with_failing("BAD"));
        let processor = Processor::new(ScanConfig::default(), source);

        let report = processor
            .scan_all(&symbols(&["BAD", "NODATA"]), CancelSignal::never())
            .await
            .unwrap();

        assert!(report.is_complete());
        let bad = report.results.iter().find(|r| r.symbol == "BAD").unwrap();
        assert_eq!(bad.signal, SignalType::None);
        assert_eq!(bad.status, SymbolStatus::DataUnavailable);

        // Empty series is evaluated, it just has no pattern
        let nodata = report.results.iter().find(|r| r.symbol == "NODATA").unwrap();
        assert_eq!(nodata.signal, SignalType::None);
        assert_eq!(nodata.status, SymbolStatus::Evaluated);
    }

    #[tokio::test]
    async fn test_requests_lookback_window() {
        let source = Arc::new(MockMarketDataSource::new());
        let config = ScanConfig {
            universe: symbols(&["AAPL", "MSFT"]),
            ..ScanConfig::default()
        };
        let processor = Processor::new(config, source.clone());

        let report = processor.scan_configured(CancelSignal::never()).await.unwrap();
        assert_eq!(report.results.len(), 2);

        let mut requested = source.requested_symbols();
        requested.sort();
        assert_eq!(requested, symbols(&["AAPL", "MSFT"]));
    }

    /// Requests cancellation from inside the last call of a scan
    struct CancelOnIv {
        canceller: ScanCanceller,
    }

    #[async_trait::async_trait]
    impl MarketDataSource for CancelOnIv {
        async fn get_historical_bars(&self, _symbol: &str, _days: usize) -> Result<Vec<crate::types::Bar>> {
            Ok(Vec::new())
        }

        async fn get_iv_percentile(&self, _symbol: &str) -> Result<f64> {
            self.canceller.cancel();
            Ok(0.5)
        }

        fn name(&self) -> &str {
            "cancel-on-iv"
        }
    }

    #[tokio::test]
    async fn test_cancel_after_last_result_is_complete() {
        let (canceller, signal) = scan_cancellation();
        let processor = Processor::new(ScanConfig::default(), Arc::new(CancelOnIv { canceller }))
            .with_max_workers(1);

        let report = processor.scan_all(&symbols(&["AAPL"]), signal.clone()).await.unwrap();
        assert!(signal.is_cancelled());
        assert_eq!(report.results.len(), 1);
        assert!(!report.cancelled);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_already_cancelled_scan_does_no_work() {
        let source = Arc::new(MockMarketDataSource::new());
        let processor = Processor::new(ScanConfig::default(), source.clone());
        let (canceller, signal) = scan_cancellation();
        canceller.cancel();

        let report = processor.scan_all(&symbols(&["AAPL"]), signal).await.unwrap();
        assert!(report.cancelled);
        assert!(!report.is_complete());
        assert_eq!(source.call_count(), 0);
    }
}

//! ScanUniverse service

use std::sync::Arc;
use tracing::info;

use crate::observability::{MetricsCollector, ScanLogger};
use crate::processor::{CancelSignal, Processor};
use crate::types::{Result, ScanReport};
use crate::wire::{ScanRequest, ScanResponse};

/// RPC-facing wrapper around a shared [`Processor`]
///
/// Safe to call concurrently: a request's symbol override is handed to the
/// processor for that call only and the configured universe is never touched.
#[derive(Clone)]
pub struct ScanService {
    processor: Arc<Processor>,
    metrics: MetricsCollector,
}

impl ScanService {
    pub fn new(processor: Arc<Processor>, metrics: MetricsCollector) -> Self {
        Self { processor, metrics }
    }

    pub fn processor(&self) -> &Arc<Processor> {
        &self.processor
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Scan the requested symbols, or the configured universe when none are given
    pub async fn scan_universe(&self, request: ScanRequest) -> Result<ScanResponse> {
        let report = self
            .scan("rpc", &request.symbols, CancelSignal::never())
            .await?;
        Ok(ScanResponse::from(report))
    }

    /// Run one scan and record it; an empty `symbols` means the configured universe
    pub async fn scan(
        &self,
        trigger: &str,
        symbols: &[String],
        cancel: CancelSignal,
    ) -> Result<ScanReport> {
        let universe = if symbols.is_empty() {
            self.processor.config().universe.as_slice()
        } else {
            info!(trigger, symbols = symbols.len(), "Scanning requested symbols");
            symbols
        };

        let report = self.processor.scan_all(universe, cancel).await?;
        self.metrics.record_scan(&report).await;
        ScanLogger::report(trigger, &report);
        Ok(report)
    }
}

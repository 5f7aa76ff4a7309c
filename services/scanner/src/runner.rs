//! Scan runner - startup scan plus periodic rescans

use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::processor::CancelSignal;
use crate::service::ScanService;

/// Drives the configured-universe scan on a fixed interval
pub struct ScanRunner {
    service: ScanService,
    scan_interval: Duration,
}

impl ScanRunner {
    pub fn new(service: ScanService, scan_interval: Duration) -> Self {
        Self {
            service,
            scan_interval,
        }
    }

    /// Scan once immediately, then every interval until `shutdown` fires
    ///
    /// `shutdown` also cancels a scan that is in progress. Returns the number
    /// of scans started.
    pub async fn run(self, mut shutdown: CancelSignal) -> u64 {
        info!(
            interval_secs = self.scan_interval.as_secs_f64(),
            "Scan runner starting"
        );

        // First tick completes immediately, giving the startup scan
        let mut ticker = interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut scans = 0u64;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    scans += 1;
                    let trigger = if scans == 1 { "startup" } else { "interval" };
                    if let Err(e) = self.service.scan(trigger, &[], shutdown.clone()).await {
                        error!("Scan error: {}", e);
                    }
                    if shutdown.is_cancelled() {
                        break;
                    }
                }
            }
        }

        info!(scans, "Scan runner stopped");
        scans
    }
}

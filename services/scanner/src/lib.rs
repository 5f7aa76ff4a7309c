pub mod config;
pub mod handlers;
pub mod indicators;
pub mod observability;
pub mod pattern;
pub mod processor;
pub mod runner;
pub mod service;
pub mod sources;
pub mod types;
pub mod wire;

pub use config::ScanConfig;
pub use observability::MetricsCollector;
pub use processor::{scan_cancellation, CancelSignal, Processor, ScanCanceller};
pub use runner::ScanRunner;
pub use service::ScanService;
pub use sources::{HttpMarketDataClient, MarketDataSource, MockMarketDataSource};
pub use types::*;

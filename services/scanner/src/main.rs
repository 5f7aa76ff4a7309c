use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

use scanner::handlers::{router, AppState};
use scanner::sources::synthetic;
use scanner::{
    scan_cancellation, CancelSignal, HttpMarketDataClient, MarketDataSource, MetricsCollector,
    Processor, ScanConfig, ScanRunner, ScanService,
};

/// Market pattern scanner
#[derive(Parser, Debug)]
#[command(name = "scanner", version, about)]
struct Cli {
    /// Scan configuration file (JSON, YAML or TOML)
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Maximum concurrent symbol workers per scan
    #[arg(long, default_value_t = 10)]
    workers: usize,

    /// Per-symbol deadline in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Seconds between periodic rescans
    #[arg(long, default_value_t = 10)]
    interval_secs: u64,

    /// Address the RPC server listens on
    #[arg(long, default_value = "0.0.0.0:50051")]
    bind: String,

    /// Market data service base URL; demo data is used when absent
    #[arg(long, env = "MARKET_DATA_URL")]
    market_data_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt().with_max_level(cli.log_level).init();

    info!("Starting Scanner Service...");

    let config = ScanConfig::load_or_default(&cli.config);
    info!(
        ma_period = config.ma_period,
        candle_count = config.candle_count,
        iv_threshold = config.iv_threshold,
        universe = config.universe.len(),
        "Scan configuration loaded"
    );

    let source: Arc<dyn MarketDataSource> = match &cli.market_data_url {
        Some(url) => {
            let client = HttpMarketDataClient::new(url)?;
            info!("✓ Market data client initialized for {}", client.base_url());
            Arc::new(client)
        }
        None => {
            warn!("No market data URL given, using synthetic demo data");
            Arc::new(synthetic::demo_source(chrono::Utc::now().date_naive()))
        }
    };

    let workers = cli.workers.max(1);
    if workers != cli.workers {
        warn!("--workers must be at least 1, using 1");
    }
    let processor = Processor::new(config, source)
        .with_max_workers(workers)
        .with_timeout(Duration::from_millis(cli.timeout_ms));
    let service = ScanService::new(Arc::new(processor), MetricsCollector::new());

    // Build router
    let app = router(Arc::new(AppState::new(service.clone())));

    // Start server
    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    info!("🚀 Scanner Service listening on {}", cli.bind);

    let (canceller, shutdown) = scan_cancellation();
    let runner = ScanRunner::new(service, Duration::from_secs(cli.interval_secs.max(1)));
    let runner_handle = tokio::spawn(runner.run(shutdown.clone()));

    let server = axum::serve(listener, app).with_graceful_shutdown(wait_for(shutdown));
    let server_handle = tokio::spawn(async move { server.await });

    shutdown_signal().await;
    info!("Shutdown signal received, draining");
    canceller.cancel();

    if let Err(e) = runner_handle.await {
        warn!("Scan runner task failed: {}", e);
    }
    server_handle.await??;

    info!("Scanner Service stopped");
    Ok(())
}

async fn wait_for(mut shutdown: CancelSignal) {
    shutdown.cancelled().await
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One trading day of OHLCV data for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Closed higher than it opened
    pub fn is_green(&self) -> bool {
        self.close > self.open
    }

    /// Closed lower than it opened
    pub fn is_red(&self) -> bool {
        self.close < self.open
    }
}

/// Trade signal produced by the pattern evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    /// No pattern, or the symbol could not be classified
    None,
    /// Bullish setup in a normal IV environment
    CallDebit,
    /// Bearish setup in a normal IV environment
    PutDebit,
    /// Bullish setup in a high IV environment
    CallCredit,
    /// Bearish setup in a high IV environment
    PutCredit,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::None => "NONE",
            SignalType::CallDebit => "CALL_DEBIT",
            SignalType::PutDebit => "PUT_DEBIT",
            SignalType::CallCredit => "CALL_CREDIT",
            SignalType::PutCredit => "PUT_CREDIT",
        }
    }

    /// Anything other than `None`
    pub fn is_actionable(&self) -> bool {
        *self != SignalType::None
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a symbol's result came about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolStatus {
    /// Data was fetched and the pattern was evaluated
    Evaluated,
    /// A market data call failed
    DataUnavailable,
    /// The per-symbol deadline expired
    TimedOut,
}

/// Outcome for one symbol in one scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    pub signal: SignalType,
    pub status: SymbolStatus,
}

impl ScanResult {
    pub fn evaluated(symbol: String, signal: SignalType) -> Self {
        Self {
            symbol,
            signal,
            status: SymbolStatus::Evaluated,
        }
    }

    pub fn unavailable(symbol: String) -> Self {
        Self {
            symbol,
            signal: SignalType::None,
            status: SymbolStatus::DataUnavailable,
        }
    }

    pub fn timed_out(symbol: String) -> Self {
        Self {
            symbol,
            signal: SignalType::None,
            status: SymbolStatus::TimedOut,
        }
    }
}

/// Aggregate output of a single scan
///
/// `results` is in completion order, not universe order.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub results: Vec<ScanResult>,
    /// Number of symbols the scan was asked to cover
    pub requested: usize,
    /// Set when cancellation cut the scan short
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl ScanReport {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every requested symbol produced a result
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.results.len() == self.requested
    }

    /// Results carrying an actionable signal
    pub fn signals(&self) -> impl Iterator<Item = &ScanResult> {
        self.results.iter().filter(|r| r.signal.is_actionable())
    }

    pub fn count_status(&self, status: SymbolStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Error types for the scanner
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for scanner operations
pub type Result<T> = std::result::Result<T, ScannerError>;

//! JSON messages exchanged with callers and with the market data collaborator
//!
//! Enums travel as their names, the way proto3 JSON encodes them.

use serde::{Deserialize, Serialize};

use crate::types::{Bar, ScanReport, ScanResult, SignalType, SymbolStatus};

/// Signal enumeration as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireSignal {
    None = 0,
    CallDebit = 1,
    PutDebit = 2,
    CallCredit = 3,
    PutCredit = 4,
}

/// Internal signal tag -> wire enumeration
static SIGNAL_TABLE: phf::Map<&'static str, WireSignal> = phf::phf_map! {
    "NONE" => WireSignal::None,
    "CALL_DEBIT" => WireSignal::CallDebit,
    "PUT_DEBIT" => WireSignal::PutDebit,
    "CALL_CREDIT" => WireSignal::CallCredit,
    "PUT_CREDIT" => WireSignal::PutCredit,
};

impl WireSignal {
    /// Look up a signal tag; unknown tags map to `None`
    pub fn from_tag(tag: &str) -> Self {
        SIGNAL_TABLE.get(tag).copied().unwrap_or(WireSignal::None)
    }

    /// Numeric enum value
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<SignalType> for WireSignal {
    fn from(signal: SignalType) -> Self {
        WireSignal::from_tag(signal.as_str())
    }
}

/// ScanUniverse request; an empty list means "use the configured universe"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub symbols: Vec<String>,
}

/// One entry per scanned symbol, `NONE` included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResultMessage {
    pub symbol: String,
    pub signal: WireSignal,
    pub status: SymbolStatus,
}

impl From<ScanResult> for ScanResultMessage {
    fn from(result: ScanResult) -> Self {
        Self {
            symbol: result.symbol,
            signal: result.signal.into(),
            status: result.status,
        }
    }
}

/// ScanUniverse response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub results: Vec<ScanResultMessage>,
    /// False when the scan was cut short and some symbols are missing
    pub complete: bool,
}

impl From<ScanReport> for ScanResponse {
    fn from(report: ScanReport) -> Self {
        let complete = report.is_complete();
        Self {
            results: report.results.into_iter().map(Into::into).collect(),
            complete,
        }
    }
}

/// GetHistoricalBars query string
#[derive(Debug, Clone, Deserialize)]
pub struct BarsQuery {
    pub days: Option<usize>,
}

/// GetHistoricalBars response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarsResponse {
    pub bars: Vec<Bar>,
}

/// GetIVPercentile response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvResponse {
    pub percentile: f64,
}

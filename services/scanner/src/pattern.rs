//! Candle pattern classifier
//!
//! Bullish: the last `candle_count` bars are green and the last close sits
//! above a rising SMA. Bearish: the last `candle_count` bars are red and the
//! last close sits below the SMA. The IV percentile decides between debit
//! (normal IV) and credit (high IV) spreads.

use crate::config::ScanConfig;
use crate::indicators::{compute_sma, is_rising};
use crate::types::{Bar, SignalType};

/// Classify a symbol from its bars and IV percentile
///
/// Pure and deterministic. Inputs are not validated: non-finite prices give
/// whatever the comparisons give.
pub fn evaluate(bars: &[Bar], iv_percentile: f64, config: &ScanConfig) -> SignalType {
    if bars.len() < config.lookback_days() {
        return SignalType::None;
    }

    let sma = match compute_sma(bars, config.ma_period) {
        Some(sma) => sma,
        None => return SignalType::None,
    };

    let last = bars.len() - 1;
    let start = match bars.len().checked_sub(config.candle_count) {
        Some(start) if start <= last => start,
        _ => return SignalType::None,
    };
    if last + 1 < config.ma_period {
        return SignalType::None;
    }

    let window = &bars[start..=last];
    let all_green = window.iter().all(Bar::is_green);
    let all_red = window.iter().all(Bar::is_red);

    let sma_rising = is_rising(&sma, last);
    let above_sma = bars[last].close > sma[last];
    let below_sma = bars[last].close < sma[last];

    let high_iv = iv_percentile > config.iv_threshold;

    if all_green && above_sma && sma_rising {
        return if high_iv {
            SignalType::CallCredit
        } else {
            SignalType::CallDebit
        };
    }

    // No falling-SMA requirement on this side
    if all_red && below_sma {
        return if high_iv {
            SignalType::PutCredit
        } else {
            SignalType::PutDebit
        };
    }

    SignalType::None
}

//! Technical indicators over daily bars

use crate::types::Bar;

/// Simple moving average of closing prices
///
/// The output has the same length as `bars`. Indices below `period - 1` do not
/// have enough history and hold `0.0`. Returns `None` when `period` is zero or
/// there are fewer bars than `period`.
pub fn compute_sma(bars: &[Bar], period: usize) -> Option<Vec<f64>> {
    if period == 0 || bars.len() < period {
        return None;
    }

    let mut sma = vec![0.0; period - 1];
    sma.extend(
        bars.windows(period)
            .map(|window| window.iter().map(|b| b.close).sum::<f64>() / period as f64),
    );

    Some(sma)
}

/// True when the series increased from `index - 1` to `index`
///
/// False at the first element or out of range.
pub fn is_rising(sma: &[f64], index: usize) -> bool {
    if index < 1 || index >= sma.len() {
        return false;
    }
    sma[index] > sma[index - 1]
}

//! Synthetic daily series for demo mode
//!
//! Seeded per symbol so the same symbol always produces the same series.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::MockMarketDataSource;
use crate::types::Bar;

/// Bars generated per demo symbol
pub const DEMO_HISTORY_DAYS: usize = 60;

/// Bars at the end of a trending series that all share a colour
const TREND_RUN: usize = 10;

/// Deterministic RNG for `symbol`
pub fn rng_for(symbol: &str) -> StdRng {
    let seed = symbol
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
            (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
    StdRng::seed_from_u64(seed)
}

/// Drifting random walk that ends in a run of green bars
pub fn bullish_series(days: usize, end: NaiveDate, rng: &mut StdRng) -> Vec<Bar> {
    trending_series(days, end, rng, 1.0)
}

/// Drifting random walk that ends in a run of red bars
pub fn bearish_series(days: usize, end: NaiveDate, rng: &mut StdRng) -> Vec<Bar> {
    trending_series(days, end, rng, -1.0)
}

/// Strictly alternating green and red bars
pub fn choppy_series(days: usize, end: NaiveDate, rng: &mut StdRng) -> Vec<Bar> {
    let mut price = 100.0;
    (0..days)
        .map(|i| {
            let size = 0.5 + rng.gen::<f64>() * 1.5;
            let change = if i % 2 == 0 { size } else { -size };
            let bar = make_bar(date_for(i, days, end), price, price + change, rng);
            price += change;
            bar
        })
        .collect()
}

/// Mock source pre-loaded with one symbol per signal type
///
/// AAPL bullish/normal IV, MSFT bullish/high IV, SPY bearish/normal IV,
/// QQQ bearish/high IV, AMZN without a pattern.
pub fn demo_source(end: NaiveDate) -> MockMarketDataSource {
    let days = DEMO_HISTORY_DAYS;
    MockMarketDataSource::new()
        .with_bars("AAPL", bullish_series(days, end, &mut rng_for("AAPL")))
        .with_iv("AAPL", 0.4)
        .with_bars("MSFT", bullish_series(days, end, &mut rng_for("MSFT")))
        .with_iv("MSFT", 0.9)
        .with_bars("SPY", bearish_series(days, end, &mut rng_for("SPY")))
        .with_iv("SPY", 0.4)
        .with_bars("QQQ", bearish_series(days, end, &mut rng_for("QQQ")))
        .with_iv("QQQ", 0.9)
        .with_bars("AMZN", choppy_series(days, end, &mut rng_for("AMZN")))
        .with_iv("AMZN", 0.5)
}

fn trending_series(days: usize, end: NaiveDate, rng: &mut StdRng, direction: f64) -> Vec<Bar> {
    let run_start = days.saturating_sub(TREND_RUN);
    let mut price = 100.0;
    let mut bars = Vec::with_capacity(days);

    for i in 0..days {
        let change = if i < run_start {
            direction * 0.1 + (0.5 - rng.gen::<f64>()) * 2.0
        } else {
            direction * (1.0 + rng.gen::<f64>())
        };
        bars.push(make_bar(date_for(i, days, end), price, price + change, rng));
        price += change;
    }

    bars
}

fn make_bar(date: NaiveDate, open: f64, close: f64, rng: &mut StdRng) -> Bar {
    Bar {
        date,
        open,
        high: open.max(close) + 0.5 * rng.gen::<f64>(),
        low: open.min(close) - 0.5 * rng.gen::<f64>(),
        close,
        volume: 1_000_000.0 + rng.gen::<f64>() * 1_000_000.0,
    }
}

fn date_for(i: usize, days: usize, end: NaiveDate) -> NaiveDate {
    end - chrono::Duration::days((days - 1 - i) as i64)
}

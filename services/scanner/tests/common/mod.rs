//! Shared fixtures for the scanner integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use scanner::Bar;

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
}

/// Steadily rising green candles: close above a rising SMA
pub fn rising_bars(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let open = 100.0 + i as f64;
            Bar {
                date: day(i),
                open,
                high: open + 1.0,
                low: open - 0.5,
                close: open + 0.5,
                volume: 10_000.0,
            }
        })
        .collect()
}

/// Steadily falling red candles: close below the SMA
pub fn falling_bars(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let open = 200.0 - i as f64;
            Bar {
                date: day(i),
                open,
                high: open + 0.5,
                low: open - 1.0,
                close: open - 0.5,
                volume: 10_000.0,
            }
        })
        .collect()
}

pub fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

//! Integration tests for the indicator library.
//!
//! Each indicator is checked against hand-computed values, its warmup
//! contract (NaN before the first valid index) and its input validation.

use chrono::{Duration, TimeZone, Utc};
use hashtrade_core::domain::Candle;
use hashtrade_core::error::EngineError;
use hashtrade_core::indicators::{
    atr, ema, rsi, swing_points, true_range, Atr, Ema, Indicator, Rsi, SwingKind,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn assert_approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "actual={actual}, expected={expected}"
    );
}

fn from_closes(closes: &[f64]) -> Vec<Candle> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle::new(base + Duration::hours(i as i64), c, c + 1.0, c - 1.0, c, 1.0))
        .collect()
}

fn from_high_low(data: &[(f64, f64)]) -> Vec<Candle> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(high, low))| {
            let mid = (high + low) / 2.0;
            Candle::new(base + Duration::hours(i as i64), mid, high, low, mid, 1.0)
        })
        .collect()
}

// ── EMA ──────────────────────────────────────────────────────────────

#[test]
fn ema_seeds_with_sma_then_recurses() {
    let out = ema(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
    assert!(out[0].is_nan());
    assert!(out[1].is_nan());
    assert_approx(out[2], 2.0);
    assert_approx(out[3], 3.0);
    assert_approx(out[4], 4.0);
}

#[test]
fn ema_indicator_reports_latest() {
    let candles = from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let indicator = Ema::new(3).unwrap();
    assert_eq!(indicator.name(), "ema_3");
    assert_eq!(indicator.lookback(), 2);
    assert_approx(indicator.latest(&candles).unwrap(), 4.0);
}

// ── RSI ──────────────────────────────────────────────────────────────

#[test]
fn rsi_edge_cases() {
    let rising: Vec<f64> = (1..=20).map(f64::from).collect();
    assert_approx(*rsi(&rising, 14).unwrap().last().unwrap(), 100.0);

    let falling: Vec<f64> = (1..=20).rev().map(f64::from).collect();
    assert_approx(*rsi(&falling, 14).unwrap().last().unwrap(), 0.0);

    let flat = vec![50.0; 20];
    assert_approx(*rsi(&flat, 14).unwrap().last().unwrap(), 50.0);
}

#[test]
fn rsi_alternating_moves_sit_at_fifty() {
    let series: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
    // Seven gains and seven losses of equal size.
    assert_approx(rsi(&series, 14).unwrap()[14], 50.0);
}

#[test]
fn rsi_needs_period_plus_one_values() {
    let series = vec![1.0; 14];
    assert_eq!(
        rsi(&series, 14),
        Err(EngineError::InsufficientData {
            required: 15,
            actual: 14
        })
    );
    assert_eq!(Rsi::new(14).unwrap().min_len(), 15);
}

// ── ATR ──────────────────────────────────────────────────────────────

#[test]
fn atr_of_constant_range_is_that_range() {
    let candles = from_closes(&[100.0; 20]);
    let out = atr(&candles, 14).unwrap();
    assert!(out[13].is_nan());
    assert_approx(out[14], 2.0);
    assert_approx(out[19], 2.0);
    assert_approx(Atr::new(14).unwrap().latest(&candles).unwrap(), 2.0);
}

#[test]
fn true_range_includes_gaps() {
    let candles = from_closes(&[100.0, 110.0]);
    let tr = true_range(&candles);
    assert_approx(tr[0], 2.0);
    // High 111 against previous close 100.
    assert_approx(tr[1], 11.0);
}

// ── Swing points ─────────────────────────────────────────────────────

#[test]
fn swing_points_in_index_order() {
    let highs = [11.0, 12.0, 13.0, 12.0, 11.0, 12.0, 15.0, 12.0, 11.0];
    let candles = from_high_low(&highs.iter().map(|&h| (h, h - 1.0)).collect::<Vec<_>>());
    let points = swing_points(&candles, 2).unwrap();

    let summary: Vec<_> = points.iter().map(|p| (p.index, p.kind, p.price)).collect();
    assert_eq!(
        summary,
        vec![
            (2, SwingKind::High, 13.0),
            (4, SwingKind::Low, 10.0),
            (6, SwingKind::High, 15.0),
        ]
    );
}

// ── Validation ───────────────────────────────────────────────────────

#[test]
fn short_inputs_report_required_length() {
    let candles = from_closes(&[100.0; 10]);
    assert_eq!(
        atr(&candles, 14),
        Err(EngineError::InsufficientData {
            required: 15,
            actual: 10
        })
    );
    assert!(matches!(
        swing_points(&candles[..4], 2),
        Err(EngineError::InsufficientData {
            required: 5,
            actual: 4
        })
    ));
}

#[test]
fn zero_period_and_nan_are_rejected() {
    assert!(matches!(ema(&[1.0, 2.0], 0), Err(EngineError::InvalidInput(_))));
    assert!(matches!(Ema::new(0), Err(EngineError::InvalidInput(_))));
    assert!(matches!(
        ema(&[1.0, f64::NAN, 3.0], 2),
        Err(EngineError::DataIntegrity(_))
    ));
}

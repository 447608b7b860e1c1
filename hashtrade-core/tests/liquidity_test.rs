//! Integration tests for the liquidity engine.
//!
//! Scenario: a 4H swing high at 112 (buy-side pool) and swing low at 100
//! (sell-side pool). A 15m candle wicks to 99.5 and closes back above 100;
//! the next candle closes above its high, confirming a long.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hashtrade_core::domain::{Bias, Candle, Direction, SignalSource};
use hashtrade_core::error::EngineError;
use hashtrade_core::liquidity::{
    find_pools, nearest_pools, opposing_liquidity, LiquidityEngine, LiquidityInput,
    NoSignalReason, PoolSide,
};

// ── Fixtures ─────────────────────────────────────────────────────────

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
}

fn higher_with_peak(peak: f64) -> Vec<Candle> {
    let highs = [105.0, 106.0, 108.0, peak, 108.0, 106.0, 104.0, 103.0, 104.0, 105.0, 106.0];
    let lows = [101.0, 102.0, 104.0, 108.0, 104.0, 102.0, 101.0, 100.0, 101.0, 102.0, 103.0];
    highs
        .iter()
        .zip(lows)
        .enumerate()
        .map(|(i, (&h, l))| {
            let mid = (h + l) / 2.0;
            Candle::new(base() + Duration::hours(4 * i as i64), mid, h, l, mid, 10.0)
        })
        .collect()
}

fn higher() -> Vec<Candle> {
    higher_with_peak(112.0)
}

fn medium_start() -> DateTime<Utc> {
    base() + Duration::hours(44)
}

fn medium_from(tail: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    let flat = std::iter::repeat((103.0, 103.5, 102.5, 103.0)).take(20 - tail.len());
    flat.chain(tail.iter().copied())
        .enumerate()
        .map(|(i, (o, h, l, c))| {
            Candle::new(medium_start() + Duration::minutes(15 * i as i64), o, h, l, c, 5.0)
        })
        .collect()
}

const SWEEP: (f64, f64, f64, f64) = (102.5, 103.0, 99.5, 100.5);
const CONFIRM: (f64, f64, f64, f64) = (100.5, 104.2, 100.4, 104.0);

fn medium() -> Vec<Candle> {
    medium_from(&[
        SWEEP,
        CONFIRM,
        (104.0, 104.5, 103.5, 104.2),
        (104.2, 104.8, 103.9, 104.5),
        (104.5, 105.0, 104.1, 104.8),
    ])
}

fn input<'a>(higher: &'a [Candle], medium: &'a [Candle]) -> LiquidityInput<'a> {
    LiquidityInput {
        higher,
        medium,
        lower: None,
    }
}

// ── Pools ────────────────────────────────────────────────────────────

#[test]
fn pools_come_from_higher_timeframe_swings() {
    let pools = find_pools(&higher(), 3, 100).unwrap();
    assert_eq!(pools.len(), 2);
    assert_eq!(pools[0].side, PoolSide::BuySide);
    assert_eq!(pools[0].price, 112.0);
    assert_eq!(pools[0].source.index, 3);
    assert_eq!(pools[1].side, PoolSide::SellSide);
    assert_eq!(pools[1].price, 100.0);
    assert!(pools.iter().all(|p| !p.swept));
}

#[test]
fn nearest_pools_report_distances() {
    let pools = find_pools(&higher(), 3, 100).unwrap();
    let nearest = nearest_pools(&pools, 104.0);
    let above = nearest.above.unwrap();
    let below = nearest.below.unwrap();
    assert_eq!(above.pool.price, 112.0);
    assert!((above.distance_pct - 8.0 / 104.0 * 100.0).abs() < 1e-9);
    assert_eq!(below.pool.price, 100.0);
    assert!((below.distance_pct - 4.0 / 104.0 * 100.0).abs() < 1e-9);

    assert!(opposing_liquidity(&pools, Direction::Long, 113.0).is_none());
}

// ── Signals ──────────────────────────────────────────────────────────

#[test]
fn confirmed_sweep_targets_opposing_pool() {
    let engine = LiquidityEngine::default();
    let (higher, medium) = (higher(), medium());
    let scan = engine.scan("BTCUSDT", input(&higher, &medium)).unwrap();

    assert_eq!(scan.bias, Bias::Neutral);
    let sweep = scan.sweep.as_ref().unwrap();
    assert_eq!(sweep.sweep_index, 15);
    assert_eq!(sweep.confirmation_index, Some(16));
    assert_eq!(sweep.pool.price, 100.0);

    let signal = scan.signal.expect("long after sell-side sweep");
    assert_eq!(signal.direction, Direction::Long);
    assert_eq!(signal.source, SignalSource::Sweep);
    assert_eq!(signal.entry_price, 104.0);
    assert!((signal.stop_loss - 99.5 * 0.998).abs() < 1e-9);
    assert_eq!(signal.take_profit, 112.0);
    assert!(signal.risk_reward() >= 1.5);
    assert_eq!(signal.score, 5);
    assert!(scan.reason.is_none());
}

#[test]
fn lower_timeframe_refines_entry() {
    let engine = LiquidityEngine::default();
    let (higher, medium) = (higher(), medium());
    // Confirmation candle closes at index 17's open time.
    let confirmed_at = medium[17].open_time;
    let lower = vec![
        Candle::new(confirmed_at - Duration::minutes(5), 103.8, 104.1, 103.7, 103.9, 1.0),
        Candle::new(confirmed_at, 104.0, 104.1, 103.0, 103.5, 1.0),
        Candle::new(confirmed_at + Duration::minutes(5), 103.5, 103.8, 103.2, 103.3, 1.0),
    ];
    let scan = engine
        .scan(
            "BTCUSDT",
            LiquidityInput {
                higher: &higher,
                medium: &medium,
                lower: Some(&lower),
            },
        )
        .unwrap();
    assert_eq!(scan.signal.unwrap().entry_price, 103.5);
}

#[test]
fn stop_traded_through_rejects_setup() {
    let engine = LiquidityEngine::default();
    let higher = higher();
    let medium = medium_from(&[
        SWEEP,
        CONFIRM,
        (104.0, 104.5, 103.5, 104.2),
        (104.2, 104.8, 99.0, 104.5),
        (104.5, 104.8, 104.1, 104.6),
    ]);
    let scan = engine.scan("BTCUSDT", input(&higher, &medium)).unwrap();
    assert!(scan.signal.is_none());
    assert_eq!(scan.reason, Some(NoSignalReason::StopBreached));
}

#[test]
fn near_target_fails_risk_reward() {
    let engine = LiquidityEngine::default();
    let (higher, medium) = (higher_with_peak(109.0), medium());
    let scan = engine.scan("BTCUSDT", input(&higher, &medium)).unwrap();
    assert!(scan.signal.is_none());
    assert_eq!(scan.reason, Some(NoSignalReason::RiskRewardTooLow));
}

#[test]
fn no_sweep_and_unconfirmed_sweep() {
    let engine = LiquidityEngine::default();
    let higher = higher();

    let flat = medium_from(&[]);
    let scan = engine.scan("BTCUSDT", input(&higher, &flat)).unwrap();
    assert_eq!(scan.reason, Some(NoSignalReason::NoSweep));
    assert!(scan.sweep.is_none());

    let pending = medium_from(&[SWEEP]);
    let scan = engine.scan("BTCUSDT", input(&higher, &pending)).unwrap();
    assert_eq!(scan.reason, Some(NoSignalReason::Unconfirmed));
    assert_eq!(scan.sweep.unwrap().sweep_index, 19);
}

#[test]
fn too_few_medium_candles() {
    let engine = LiquidityEngine::default();
    let higher = higher();
    let medium = medium();
    assert_eq!(
        engine.scan("BTCUSDT", input(&higher, &medium[..10])).unwrap_err(),
        EngineError::InsufficientData {
            required: 20,
            actual: 10
        }
    );
}

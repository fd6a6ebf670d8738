//! Bar boundary behavior under irregular tick arrival

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use meridian_core::{Bar, CanonicalSymbol, Exchange, Interval, Tick};
use meridian_gateway::BarAggregator;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn at(h: u32, m: u32, s: u32, ms: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap() + TimeDelta::milliseconds(ms)
}

fn tick(datetime: DateTime<Utc>, price: Decimal, volume: Decimal) -> Tick {
    let mut tick = Tick::new("btcusdt", Exchange::Huobi, "HUOBI", datetime);
    tick.last_price = price;
    tick.volume = volume;
    tick
}

fn aggregator(interval: Interval) -> (BarAggregator, Arc<Mutex<Vec<Bar>>>) {
    let closed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&closed);
    (BarAggregator::new(interval, move |bar| sink.lock().push(bar)), closed)
}

#[test]
fn test_window_closes_on_first_tick_of_next_window() {
    let (mut bars, closed) = aggregator(Interval::Minute);

    bars.update(&tick(at(9, 0, 0, 100), dec!(100), dec!(1000)));
    bars.update(&tick(at(9, 0, 20, 0), dec!(105), dec!(1003)));
    bars.update(&tick(at(9, 0, 40, 0), dec!(95), dec!(1004)));
    bars.update(&tick(at(9, 0, 59, 900), dec!(101), dec!(1010)));
    assert!(closed.lock().is_empty());

    bars.update(&tick(at(9, 1, 0, 50), dec!(200), dec!(1012)));

    let closed = closed.lock();
    assert_eq!(closed.len(), 1);
    let bar = &closed[0];
    assert_eq!(bar.datetime, at(9, 0, 0, 0));
    assert_eq!(bar.interval, Interval::Minute);
    assert_eq!(bar.open_price, dec!(100));
    assert_eq!(bar.high_price, dec!(105));
    assert_eq!(bar.low_price, dec!(95));
    assert_eq!(bar.close_price, dec!(101));
    assert_eq!(bar.volume, dec!(10));

    let current = bars.current(&CanonicalSymbol::new("btcusdt", Exchange::Huobi)).unwrap();
    assert_eq!(current.datetime, at(9, 1, 0, 0));
    assert_eq!(current.open_price, dec!(200));
    assert_eq!(current.volume, dec!(2));
}

#[test]
fn test_zero_price_tick_is_ignored() {
    let (mut bars, closed) = aggregator(Interval::Minute);
    let symbol = CanonicalSymbol::new("btcusdt", Exchange::Huobi);

    bars.update(&tick(at(9, 0, 1, 0), Decimal::ZERO, dec!(10)));
    assert!(bars.current(&symbol).is_none());

    bars.update(&tick(at(9, 0, 2, 0), dec!(50), dec!(10)));
    bars.update(&tick(at(9, 1, 2, 0), Decimal::ZERO, dec!(20)));
    assert!(closed.lock().is_empty());
    assert_eq!(bars.current(&symbol).unwrap().datetime, at(9, 0, 0, 0));
}

#[test]
fn test_gap_emits_only_the_bar_that_existed() {
    let (mut bars, closed) = aggregator(Interval::Minute);

    bars.update(&tick(at(9, 0, 30, 0), dec!(10), dec!(1)));
    bars.update(&tick(at(9, 5, 0, 0), dec!(11), dec!(2)));

    let closed = closed.lock();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].datetime, at(9, 0, 0, 0));
}

#[test]
fn test_symbols_are_independent() {
    let (mut bars, closed) = aggregator(Interval::Minute);

    let mut eth = tick(at(9, 0, 10, 0), dec!(3), dec!(1));
    eth.symbol = "ethusdt".into();
    bars.update(&tick(at(9, 0, 5, 0), dec!(10), dec!(1)));
    bars.update(&eth);

    let mut eth_next = tick(at(9, 1, 0, 0), dec!(4), dec!(2));
    eth_next.symbol = "ethusdt".into();
    bars.update(&eth_next);

    let closed = closed.lock();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].symbol, "ethusdt");
}

#[test]
fn test_hour_interval_alignment() {
    let (mut bars, closed) = aggregator(Interval::Hour);

    bars.update(&tick(at(9, 15, 0, 0), dec!(1), dec!(0)));
    bars.update(&tick(at(9, 59, 59, 999), dec!(2), dec!(0)));
    bars.update(&tick(at(10, 0, 0, 0), dec!(3), dec!(0)));

    let closed = closed.lock();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].datetime, at(9, 0, 0, 0));
    assert_eq!(closed[0].close_price, dec!(2));
}

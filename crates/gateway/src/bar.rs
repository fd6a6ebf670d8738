//! Tick to bar aggregation
//!
//! Window boundaries depend only on tick timestamps: a tick closes the
//! in-progress bar when its timestamp, truncated to the interval, lands in
//! a later window. Wall-clock time never closes a bar.

use chrono::DurationRound;
use meridian_core::{Bar, CanonicalSymbol, Interval, Tick, Timestamp, Volume};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct SymbolState {
    bar: Option<Bar>,
    /// Cumulative volume carried by the previous tick
    last_volume: Option<Volume>,
}

/// One in-progress bar per symbol; emits each bar exactly once when its
/// window is over
pub struct BarAggregator {
    interval: Interval,
    on_closed: Box<dyn FnMut(Bar) + Send>,
    states: HashMap<CanonicalSymbol, SymbolState>,
}

impl BarAggregator {
    pub fn new(interval: Interval, on_closed: impl FnMut(Bar) + Send + 'static) -> Self {
        Self {
            interval,
            on_closed: Box::new(on_closed),
            states: HashMap::new(),
        }
    }

    /// One-minute bars
    pub fn minute(on_closed: impl FnMut(Bar) + Send + 'static) -> Self {
        Self::new(Interval::Minute, on_closed)
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Feed one tick. Ticks without a last price are ignored; ticks from a
    /// window before the in-progress one are dropped.
    pub fn update(&mut self, tick: &Tick) {
        if tick.last_price.is_zero() {
            return;
        }
        let Some(window) = window_start(tick.datetime, self.interval) else {
            warn!(symbol = %tick.vt_symbol(), datetime = %tick.datetime, "Cannot align tick to a window");
            return;
        };

        let symbol = tick.canonical_symbol();
        let state = self.states.entry(symbol.clone()).or_default();

        if let Some(bar) = &state.bar {
            if window < bar.datetime {
                debug!(
                    symbol = %symbol,
                    tick = %tick.datetime,
                    window = %bar.datetime,
                    "Dropping tick from a closed window"
                );
                return;
            }
        }

        let traded = match state.last_volume {
            Some(previous) => (tick.volume - previous).max(Decimal::ZERO),
            None => Decimal::ZERO,
        };
        state.last_volume = Some(tick.volume);

        match state.bar.as_mut() {
            Some(bar) if bar.datetime == window => {
                bar.update_price(tick.last_price);
                bar.volume += traded;
            }
            _ => {
                let mut bar = Bar::open_at(
                    &symbol,
                    self.interval,
                    window,
                    tick.gateway_name.clone(),
                    tick.last_price,
                );
                bar.volume = traded;
                if let Some(finished) = state.bar.replace(bar) {
                    (self.on_closed)(finished);
                }
            }
        }
    }

    /// In-progress bar for `symbol`
    pub fn current(&self, symbol: &CanonicalSymbol) -> Option<&Bar> {
        self.states.get(symbol)?.bar.as_ref()
    }
}

/// Start of the window containing `at`, aligned to the Unix epoch
pub fn window_start(at: Timestamp, interval: Interval) -> Option<Timestamp> {
    at.duration_trunc(interval.duration()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use meridian_core::Exchange;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    fn tick(h: u32, m: u32, s: u32, ms: u32, price: Decimal, volume: Decimal) -> Tick {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
            + chrono::TimeDelta::milliseconds(ms as i64);
        let mut tick = Tick::new("btcusdt", Exchange::Huobi, "HUOBI", at);
        tick.last_price = price;
        tick.volume = volume;
        tick
    }

    fn collector() -> (BarAggregator, Arc<Mutex<Vec<Bar>>>) {
        let closed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&closed);
        let aggregator = BarAggregator::minute(move |bar| sink.lock().unwrap().push(bar));
        (aggregator, closed)
    }

    #[test]
    fn test_window_start_truncates() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 42).unwrap();
        assert_eq!(
            window_start(at, Interval::Minute),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap())
        );
        assert_eq!(
            window_start(at, Interval::Hour),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_volume_deltas_ignore_counter_resets() {
        let (mut aggregator, _) = collector();
        aggregator.update(&tick(9, 0, 1, 0, dec!(10), dec!(100)));
        aggregator.update(&tick(9, 0, 2, 0, dec!(11), dec!(103)));
        aggregator.update(&tick(9, 0, 3, 0, dec!(12), dec!(5)));
        aggregator.update(&tick(9, 0, 4, 0, dec!(12), dec!(7)));

        let symbol = CanonicalSymbol::new("btcusdt", Exchange::Huobi);
        let bar = aggregator.current(&symbol).unwrap();
        assert_eq!(bar.volume, dec!(5));
        assert!(bar.volume >= Decimal::ZERO);
    }

    #[test]
    fn test_late_tick_does_not_reopen_window() {
        let (mut aggregator, closed) = collector();
        aggregator.update(&tick(9, 0, 10, 0, dec!(10), dec!(1)));
        aggregator.update(&tick(9, 1, 0, 0, dec!(11), dec!(2)));
        aggregator.update(&tick(9, 0, 59, 0, dec!(99), dec!(3)));

        assert_eq!(closed.lock().unwrap().len(), 1);
        let symbol = CanonicalSymbol::new("btcusdt", Exchange::Huobi);
        assert_eq!(aggregator.current(&symbol).unwrap().high_price, dec!(11));
    }
}

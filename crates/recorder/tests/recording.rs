use chrono::{TimeZone, Utc};
use meridian_core::{Bar, CanonicalSymbol, Contract, Exchange, Interval, Price, Product, Tick};
use meridian_event::{
    EVENT_BAR, EVENT_CONTRACT, EVENT_TICK, Event, EventData, EventEngine, handler,
};
use meridian_recorder::{
    JsonLinesSink, RecordSink, RecorderEngine, RecorderError, RecorderSubscription, RecordingSettings,
    SETTINGS_FILE,
};
use rust_decimal_macros::dec;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::mpsc;

fn contract(symbol: &str) -> Contract {
    Contract {
        symbol: symbol.to_string(),
        exchange: Exchange::Huobi,
        name: symbol.to_uppercase(),
        product: Product::Spot,
        size: dec!(1),
        price_tick: dec!(0.01),
        min_volume: dec!(0.0001),
        gateway_name: "HUOBI".to_string(),
    }
}

fn tick(symbol: &str, price: Price) -> Tick {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let mut tick = Tick::new(symbol, Exchange::Huobi, "HUOBI", at);
    tick.last_price = price;
    tick
}

fn bar(symbol: &str) -> Bar {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    Bar::open_at(
        &CanonicalSymbol::new(symbol, Exchange::Huobi),
        Interval::Minute,
        at,
        "HUOBI",
        dec!(100),
    )
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn line_count(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|content| content.lines().count())
        .unwrap_or(0)
}

struct Harness {
    dir: TempDir,
    engine: Arc<EventEngine>,
}

impl Harness {
    fn new() -> Self {
        let engine = Arc::new(EventEngine::new(Duration::from_secs(60)));
        engine.start().unwrap();
        Self {
            dir: tempfile::tempdir().unwrap(),
            engine,
        }
    }

    fn settings_path(&self) -> std::path::PathBuf {
        self.dir.path().join(SETTINGS_FILE)
    }

    fn data_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("data")
    }

    fn recorder(
        &self,
        subscriptions: Option<mpsc::UnboundedSender<RecorderSubscription>>,
    ) -> RecorderEngine {
        let sink = JsonLinesSink::new(self.data_dir()).unwrap();
        RecorderEngine::start(
            Arc::clone(&self.engine),
            self.settings_path(),
            Box::new(sink),
            subscriptions,
        )
        .unwrap()
    }

    fn publish_contract(&self, contract: Contract) {
        self.engine
            .put(Event::new(EVENT_CONTRACT, EventData::Contract(contract)))
            .unwrap();
    }

    fn publish_tick(&self, tick: Tick) {
        self.engine
            .put(Event::new(EVENT_TICK, EventData::Tick(tick)))
            .unwrap();
    }

    fn publish_bar(&self, bar: Bar) {
        self.engine
            .put(Event::new(EVENT_BAR, EventData::Bar(bar)))
            .unwrap();
    }

    fn wait_idle(&self) {
        wait_until(|| self.engine.pending() == 0);
        std::thread::sleep(Duration::from_millis(20));
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.engine.stop();
    }
}

#[test]
fn test_add_recording_requires_known_contract() {
    let harness = Harness::new();
    let recorder = harness.recorder(None);

    let err = recorder.add_tick_recording("btcusdt.HUOBI").unwrap_err();
    assert!(matches!(err, RecorderError::UnknownContract(ref s) if s == "btcusdt.HUOBI"));
    assert!(recorder.settings().tick.is_empty());
    recorder.close();
}

#[test]
fn test_only_recorded_symbols_are_written() {
    let harness = Harness::new();
    let recorder = harness.recorder(None);

    harness.publish_contract(contract("btcusdt"));
    harness.publish_contract(contract("ethusdt"));
    harness.wait_idle();

    assert!(recorder.add_tick_recording("btcusdt.HUOBI").unwrap());
    assert!(!recorder.add_tick_recording("btcusdt.HUOBI").unwrap());

    harness.publish_tick(tick("btcusdt", dec!(100)));
    harness.publish_tick(tick("ethusdt", dec!(5)));
    harness.publish_tick(tick("btcusdt", dec!(101)));
    harness.publish_bar(bar("btcusdt"));
    harness.wait_idle();
    recorder.close();

    let data = harness.data_dir();
    assert_eq!(line_count(&data.join("btcusdt.HUOBI.tick.jsonl")), 2);
    assert!(!data.join("ethusdt.HUOBI.tick.jsonl").exists());
    // ticks recorded, bars not
    assert!(!data.join("btcusdt.HUOBI.bar.jsonl").exists());

    let first = std::fs::read_to_string(data.join("btcusdt.HUOBI.tick.jsonl")).unwrap();
    let first: Tick = serde_json::from_str(first.lines().next().unwrap()).unwrap();
    assert_eq!(first.last_price, dec!(100));
}

#[test]
fn test_bars_recorded_separately() {
    let harness = Harness::new();
    let recorder = harness.recorder(None);

    harness.publish_contract(contract("btcusdt"));
    harness.wait_idle();
    assert!(recorder.add_bar_recording("btcusdt.HUOBI").unwrap());

    harness.publish_tick(tick("btcusdt", dec!(100)));
    harness.publish_bar(bar("btcusdt"));
    harness.wait_idle();
    recorder.close();

    let data = harness.data_dir();
    assert_eq!(line_count(&data.join("btcusdt.HUOBI.bar.jsonl")), 1);
    assert!(!data.join("btcusdt.HUOBI.tick.jsonl").exists());
}

#[test]
fn test_settings_persist_across_restarts() {
    let harness = Harness::new();
    {
        let recorder = harness.recorder(None);
        harness.publish_contract(contract("btcusdt"));
        harness.wait_idle();
        recorder.add_tick_recording("btcusdt.HUOBI").unwrap();
        recorder.add_bar_recording("btcusdt.HUOBI").unwrap();
        recorder.close();
    }

    let saved = RecordingSettings::load(&harness.settings_path()).unwrap();
    assert!(saved.tick.contains_key("btcusdt.HUOBI"));
    assert!(saved.bar.contains_key("btcusdt.HUOBI"));

    let recorder = harness.recorder(None);
    assert!(recorder.is_recording_ticks("btcusdt.HUOBI"));
    assert!(recorder.remove_tick_recording("btcusdt.HUOBI").unwrap());
    assert!(!recorder.remove_tick_recording("btcusdt.HUOBI").unwrap());
    recorder.close();

    let saved = RecordingSettings::load(&harness.settings_path()).unwrap();
    assert!(saved.tick.is_empty());
    assert_eq!(saved.bar.len(), 1);
}

#[test]
fn test_contract_for_recorded_symbol_requests_subscription() {
    let harness = Harness::new();
    {
        let recorder = harness.recorder(None);
        harness.publish_contract(contract("btcusdt"));
        harness.wait_idle();
        recorder.add_bar_recording("btcusdt.HUOBI").unwrap();
        recorder.close();
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let recorder = harness.recorder(Some(tx));
    harness.publish_contract(contract("ethusdt"));
    harness.publish_contract(contract("btcusdt"));
    harness.wait_idle();

    let request = rx.try_recv().unwrap();
    assert_eq!(request.gateway_name, "HUOBI");
    assert_eq!(
        request.request.symbol,
        CanonicalSymbol::new("btcusdt", Exchange::Huobi)
    );
    assert!(request.request.bars);
    assert!(rx.try_recv().is_err());
    recorder.close();
}

#[test]
fn test_close_is_idempotent_and_unregisters() {
    let harness = Harness::new();
    let recorder = harness.recorder(None);
    assert_eq!(harness.engine.handler_count(EVENT_TICK), Some(1));

    recorder.close();
    recorder.close();

    assert_eq!(harness.engine.handler_count(EVENT_TICK).unwrap_or(0), 0);
    assert!(matches!(
        recorder.add_tick_recording("btcusdt.HUOBI"),
        Err(RecorderError::Closed)
    ));
}

struct FailingSink;

impl RecordSink for FailingSink {
    fn save_ticks(&mut self, _ticks: &[Tick]) -> meridian_recorder::Result<()> {
        panic!("disk on fire");
    }

    fn save_bars(&mut self, _bars: &[Bar]) -> meridian_recorder::Result<()> {
        Ok(())
    }
}

#[test]
fn test_dead_worker_does_not_disturb_dispatch() {
    let harness = Harness::new();
    let recorder = RecorderEngine::start(
        Arc::clone(&harness.engine),
        harness.settings_path(),
        Box::new(FailingSink),
        None,
    )
    .unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    harness.engine.register(
        EVENT_TICK,
        handler(move |_event: &Event| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    harness.publish_contract(contract("btcusdt"));
    harness.wait_idle();
    recorder.add_tick_recording("btcusdt.HUOBI").unwrap();

    // first tick kills the worker, later ones find the queue closed
    for price in [dec!(100), dec!(101), dec!(102)] {
        harness.publish_tick(tick("btcusdt", price));
        harness.wait_idle();
    }

    assert_eq!(seen.load(Ordering::SeqCst), 3);
    recorder.close();
    assert_eq!(harness.engine.handler_count(EVENT_TICK), Some(1));
}

//! Recorder engine: event handlers on the bus, writes on a worker thread

use crossbeam_channel::{Receiver, Sender, unbounded};
use meridian_core::{Bar, CanonicalSymbol, Contract, LogRecord, SubscribeRequest, Tick};
use meridian_event::{
    EVENT_BAR, EVENT_CONTRACT, EVENT_LOG, EVENT_TICK, Event, EventData, EventEngine, Handler,
    handler,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::error::{RecorderError, Result};
use crate::settings::{RecordingEntry, RecordingSettings};
use crate::sink::RecordSink;

const SOURCE: &str = "Recorder";

/// Ask the owner of `gateway_name` to start streaming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderSubscription {
    pub gateway_name: String,
    pub request: SubscribeRequest,
}

enum Task {
    Tick(Tick),
    Bar(Bar),
    Stop,
}

struct Shared {
    engine: Arc<EventEngine>,
    settings_path: PathBuf,
    settings: RwLock<RecordingSettings>,
    contracts: RwLock<HashMap<String, Contract>>,
    subscriptions: Option<UnboundedSender<RecorderSubscription>>,
    queue: Sender<Task>,
}

impl Shared {
    fn write_log(&self, msg: String) {
        info!("{msg}");
        let _ = self
            .engine
            .put(Event::new(EVENT_LOG, EventData::Log(LogRecord::info(SOURCE, msg))));
    }

    fn subscribe(&self, entry: &RecordingEntry, bars: bool) {
        let Some(tx) = &self.subscriptions else {
            return;
        };
        let request = SubscribeRequest {
            symbol: CanonicalSymbol::new(entry.symbol.clone(), entry.exchange),
            bars,
        };
        let subscription = RecorderSubscription {
            gateway_name: entry.gateway_name.clone(),
            request,
        };
        if tx.send(subscription).is_err() {
            debug!(symbol = %entry.symbol, "Subscription receiver gone");
        }
    }

    fn on_tick(&self, tick: &Tick) {
        if self.settings.read().tick.contains_key(&tick.vt_symbol()) {
            self.enqueue(Task::Tick(tick.clone()));
        }
    }

    fn on_bar(&self, bar: &Bar) {
        if self.settings.read().bar.contains_key(&bar.vt_symbol()) {
            self.enqueue(Task::Bar(bar.clone()));
        }
    }

    fn enqueue(&self, task: Task) {
        if let Err(e) = self.queue.send(task) {
            debug!(error = %e, "Recorder worker gone, record dropped");
        }
    }

    fn on_contract(&self, contract: &Contract) {
        let vt_symbol = contract.vt_symbol();
        let (tick, bar) = {
            let settings = self.settings.read();
            (
                settings.tick.get(&vt_symbol).cloned(),
                settings.bar.get(&vt_symbol).cloned(),
            )
        };
        self.contracts.write().insert(vt_symbol, contract.clone());

        if let Some(entry) = tick {
            self.subscribe(&entry, false);
        }
        if let Some(entry) = bar {
            self.subscribe(&entry, true);
        }
    }
}

/// Persists ticks and bars for the symbols listed in its settings file
///
/// Handlers only filter and enqueue; a dedicated thread hands records to
/// the [`RecordSink`], so slow storage never stalls event dispatch.
pub struct RecorderEngine {
    shared: Arc<Shared>,
    handlers: Vec<(&'static str, Handler)>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RecorderEngine {
    /// Load settings, start the writer thread and register on the bus
    pub fn start(
        engine: Arc<EventEngine>,
        settings_path: impl Into<PathBuf>,
        sink: Box<dyn RecordSink>,
        subscriptions: Option<UnboundedSender<RecorderSubscription>>,
    ) -> Result<Self> {
        let settings_path = settings_path.into();
        let settings = RecordingSettings::load(&settings_path)?;
        info!(
            path = %settings_path.display(),
            ticks = settings.tick.len(),
            bars = settings.bar.len(),
            "Recorder settings loaded"
        );

        let (queue, tasks) = unbounded();
        let worker = thread::Builder::new()
            .name("recorder".to_string())
            .spawn(move || run_worker(tasks, sink))
            .map_err(RecorderError::Spawn)?;

        let shared = Arc::new(Shared {
            engine: Arc::clone(&engine),
            settings_path,
            settings: RwLock::new(settings),
            contracts: RwLock::new(HashMap::new()),
            subscriptions,
            queue,
        });

        let handlers = vec![
            (EVENT_TICK, {
                let shared = Arc::clone(&shared);
                handler(move |event: &Event| {
                    if let Some(tick) = event.as_tick() {
                        shared.on_tick(tick);
                    }
                })
            }),
            (EVENT_BAR, {
                let shared = Arc::clone(&shared);
                handler(move |event: &Event| {
                    if let Some(bar) = event.as_bar() {
                        shared.on_bar(bar);
                    }
                })
            }),
            (EVENT_CONTRACT, {
                let shared = Arc::clone(&shared);
                handler(move |event: &Event| {
                    if let Some(contract) = event.as_contract() {
                        shared.on_contract(contract);
                    }
                })
            }),
        ];
        for (kind, handler) in &handlers {
            engine.register(kind, Arc::clone(handler));
        }

        Ok(Self {
            shared,
            handlers,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn settings(&self) -> RecordingSettings {
        self.shared.settings.read().clone()
    }

    pub fn is_recording_ticks(&self, vt_symbol: &str) -> bool {
        self.shared.settings.read().tick.contains_key(vt_symbol)
    }

    pub fn is_recording_bars(&self, vt_symbol: &str) -> bool {
        self.shared.settings.read().bar.contains_key(vt_symbol)
    }

    /// Start recording ticks for `vt_symbol`. `Ok(false)` when already
    /// recorded; fails when no contract for it has been seen.
    pub fn add_tick_recording(&self, vt_symbol: &str) -> Result<bool> {
        self.add_recording(vt_symbol, false)
    }

    /// Start recording one-minute bars for `vt_symbol`
    pub fn add_bar_recording(&self, vt_symbol: &str) -> Result<bool> {
        self.add_recording(vt_symbol, true)
    }

    pub fn remove_tick_recording(&self, vt_symbol: &str) -> Result<bool> {
        self.remove_recording(vt_symbol, false)
    }

    pub fn remove_bar_recording(&self, vt_symbol: &str) -> Result<bool> {
        self.remove_recording(vt_symbol, true)
    }

    fn add_recording(&self, vt_symbol: &str, bars: bool) -> Result<bool> {
        self.ensure_open()?;
        let kind = if bars { "bar" } else { "tick" };
        let entry = self
            .shared
            .contracts
            .read()
            .get(vt_symbol)
            .map(RecordingEntry::from)
            .ok_or_else(|| RecorderError::UnknownContract(vt_symbol.to_string()))?;

        {
            let mut settings = self.shared.settings.write();
            let recordings = if bars { &mut settings.bar } else { &mut settings.tick };
            if recordings.contains_key(vt_symbol) {
                debug!(vt_symbol, kind, "Already recording");
                return Ok(false);
            }
            recordings.insert(vt_symbol.to_string(), entry.clone());
            settings.save(&self.shared.settings_path)?;
        }

        self.shared.subscribe(&entry, bars);
        self.shared.write_log(format!("Recording {kind}s for {vt_symbol}"));
        Ok(true)
    }

    fn remove_recording(&self, vt_symbol: &str, bars: bool) -> Result<bool> {
        self.ensure_open()?;
        let kind = if bars { "bar" } else { "tick" };
        {
            let mut settings = self.shared.settings.write();
            let recordings = if bars { &mut settings.bar } else { &mut settings.tick };
            if recordings.remove(vt_symbol).is_none() {
                return Ok(false);
            }
            settings.save(&self.shared.settings_path)?;
        }
        self.shared.write_log(format!("Stopped recording {kind}s for {vt_symbol}"));
        Ok(true)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.worker.lock().is_none() {
            return Err(RecorderError::Closed);
        }
        Ok(())
    }

    /// Unregister from the bus, drain the queue and join the writer.
    /// Idempotent.
    pub fn close(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        for (kind, handler) in &self.handlers {
            self.shared.engine.unregister(kind, handler);
        }
        let _ = self.shared.queue.send(Task::Stop);
        if worker.join().is_err() {
            error!("Recorder worker panicked");
        }
        info!("Recorder closed");
    }
}

impl Drop for RecorderEngine {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(tasks: Receiver<Task>, mut sink: Box<dyn RecordSink>) {
    debug!("Recorder worker started");
    while let Ok(task) = tasks.recv() {
        let mut stop = false;
        for task in std::iter::once(task).chain(tasks.try_iter()) {
            let result = match task {
                Task::Tick(tick) => sink.save_ticks(std::slice::from_ref(&tick)),
                Task::Bar(bar) => sink.save_bars(std::slice::from_ref(&bar)),
                Task::Stop => {
                    stop = true;
                    break;
                }
            };
            if let Err(e) = result {
                warn!(error = %e, "Failed to record");
            }
        }
        if let Err(e) = sink.flush() {
            warn!(error = %e, "Failed to flush records");
        }
        if stop {
            break;
        }
    }
    debug!("Recorder worker exited");
}

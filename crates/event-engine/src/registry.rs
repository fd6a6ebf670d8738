//! Copy-on-write handler registry
//!
//! Writers serialize on a mutex and publish a fresh snapshot; the dispatch
//! thread only ever loads the current snapshot, so registration never
//! blocks dispatch and a handler list is never observed half-modified.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

use crate::event::{Event, Handler};

#[derive(Default, Clone)]
struct Snapshot {
    by_kind: HashMap<String, Vec<Handler>>,
    general: Vec<Handler>,
}

pub(crate) struct HandlerRegistry {
    current: ArcSwap<Snapshot>,
    write_lock: Mutex<()>,
}

fn contains(list: &[Handler], handler: &Handler) -> bool {
    list.iter().any(|h| Arc::ptr_eq(h, handler))
}

impl HandlerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
            write_lock: Mutex::new(()),
        }
    }

    fn modify(&self, f: impl FnOnce(&mut Snapshot)) {
        let _guard = self.write_lock.lock();
        let mut next = Snapshot::clone(&self.current.load());
        f(&mut next);
        self.current.store(Arc::new(next));
    }

    pub(crate) fn register(&self, kind: &str, handler: Handler) {
        self.modify(|snapshot| {
            let list = snapshot.by_kind.entry(kind.to_string()).or_default();
            if !contains(list, &handler) {
                list.push(handler);
            }
        });
    }

    pub(crate) fn unregister(&self, kind: &str, handler: &Handler) {
        self.modify(|snapshot| {
            if let Some(list) = snapshot.by_kind.get_mut(kind) {
                list.retain(|h| !Arc::ptr_eq(h, handler));
                if list.is_empty() {
                    snapshot.by_kind.remove(kind);
                }
            }
        });
    }

    pub(crate) fn register_general(&self, handler: Handler) {
        self.modify(|snapshot| {
            if !contains(&snapshot.general, &handler) {
                snapshot.general.push(handler);
            }
        });
    }

    pub(crate) fn unregister_general(&self, handler: &Handler) {
        self.modify(|snapshot| snapshot.general.retain(|h| !Arc::ptr_eq(h, handler)));
    }

    /// Handlers for `kind`; `None` once the last one was removed
    pub(crate) fn handler_count(&self, kind: &str) -> Option<usize> {
        self.current.load().by_kind.get(kind).map(Vec::len)
    }

    pub(crate) fn general_count(&self) -> usize {
        self.current.load().general.len()
    }

    /// Typed handlers first, then general handlers, each in registration order
    pub(crate) fn dispatch(&self, event: &Event) {
        let snapshot = self.current.load();
        if let Some(list) = snapshot.by_kind.get(event.kind()) {
            for handler in list {
                invoke(handler, event);
            }
        }
        for handler in &snapshot.general {
            invoke(handler, event);
        }
    }
}

/// A panicking handler is reported and skipped; the remaining handlers still run
fn invoke(handler: &Handler, event: &Event) {
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(event_type = event.kind(), "Event handler panicked: {}", reason);
    }
}

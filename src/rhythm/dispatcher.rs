//! Beat dispatch - one notification per crossed beat boundary
//!
//! Listeners are notified in registration order. Each boundary iterates over a
//! snapshot of the listener list, so registering or unregistering from inside
//! a callback only takes effect on the next boundary.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use thiserror::Error;

use crate::core::types::Beat;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ListenerFault {
    #[error("listener was already borrowed during dispatch")]
    Busy,

    #[error("listener failed: {0}")]
    Failed(String),
}

/// Something that wants to hear about every beat
pub trait BeatListener {
    fn on_beat(&mut self, beat: Beat) -> Result<(), ListenerFault>;
}

/// Handle returned by `register`, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

pub type SharedListener = Rc<RefCell<dyn BeatListener>>;

/// A listener that failed during dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchFault {
    pub listener: ListenerId,
    pub beat: Beat,
    pub fault: ListenerFault,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Beats delivered in this call, in order
    pub delivered_beats: Vec<Beat>,
    pub faults: Vec<DispatchFault>,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.delivered_beats.is_empty()
    }
}

/// Fans out beat boundaries to registered listeners
///
/// Methods take `&self` so listeners holding an `Rc<BeatDispatcher>` can
/// register or unregister while a dispatch is running.
pub struct BeatDispatcher {
    listeners: RefCell<Vec<(ListenerId, SharedListener)>>,
    next_id: Cell<u64>,
    last_dispatched: Cell<Beat>,
    dispatching: Cell<bool>,
}

/// Clears the dispatching flag even if a listener unwinds
struct DispatchingFlag<'a>(&'a Cell<bool>);

impl<'a> DispatchingFlag<'a> {
    fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for DispatchingFlag<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl BeatDispatcher {
    /// Create a dispatcher that has already delivered `start_beat`
    pub fn new(start_beat: Beat) -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            last_dispatched: Cell::new(start_beat),
            dispatching: Cell::new(false),
        }
    }

    pub fn register(&self, listener: SharedListener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    /// Returns false if the id was not registered
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn last_dispatched(&self) -> Beat {
        self.last_dispatched.get()
    }

    /// Deliver every boundary in `(last_dispatched, new_beat]`
    ///
    /// Calling again with the same `new_beat` delivers nothing.
    pub fn advance(&self, new_beat: Beat) -> DispatchReport {
        let mut report = DispatchReport::default();

        if self.dispatching.get() {
            tracing::warn!(new_beat, "Ignoring re-entrant beat dispatch");
            return report;
        }
        if new_beat <= self.last_dispatched.get() {
            return report;
        }

        let _flag = DispatchingFlag::raise(&self.dispatching);
        for beat in (self.last_dispatched.get() + 1)..=new_beat {
            let snapshot: Vec<(ListenerId, SharedListener)> = self
                .listeners
                .borrow()
                .iter()
                .map(|(id, l)| (*id, Rc::clone(l)))
                .collect();

            for (id, listener) in snapshot {
                let outcome = match listener.try_borrow_mut() {
                    Ok(mut l) => l.on_beat(beat),
                    Err(_) => Err(ListenerFault::Busy),
                };
                if let Err(fault) = outcome {
                    tracing::warn!(listener = id.0, beat, "Beat listener fault: {}", fault);
                    report.faults.push(DispatchFault {
                        listener: id,
                        beat,
                        fault,
                    });
                }
            }

            self.last_dispatched.set(beat);
            report.delivered_beats.push(beat);
        }

        report
    }
}

impl Default for BeatDispatcher {
    fn default() -> Self {
        Self::new(0)
    }
}

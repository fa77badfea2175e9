//! Trigger records and the moment queue (spec §4.4, §3).
//!
//! A "moment" is one pending invocation of one event with one payload — the
//! unit the dispatch loop drains breadth-first. [`Moment`] is the queue's
//! element type; [`PreparedTrigger`] lets a caller pre-pay the allocation for
//! one moment so that [`crate::Event::trigger_prepared`] can enqueue without
//! risking [`crate::error::DispatchError::NoMemory`].

use std::collections::VecDeque;

use crate::alloc_probe;
use crate::error::Result;
use crate::event::Event;
use crate::name_index::FoldedKey;
use crate::pool::Pool;

/// Opaque per-binding or per-trigger user data, forwarded by the dispatcher
/// without ever being read or dereferenced by it — the spec's `void*`
/// carried through as a raw pointer-sized value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OpaqueData(pub *mut ());

impl OpaqueData {
    /// The null opaque value, for callbacks that don't need user data.
    pub const NULL: OpaqueData = OpaqueData(std::ptr::null_mut());

    /// Packs an arbitrary `usize` as opaque data, for embedders that just
    /// want to pass a tag rather than a real pointer.
    pub fn from_usize(value: usize) -> Self {
        OpaqueData(value as *mut ())
    }

    /// Unpacks a value previously round-tripped through [`Self::from_usize`].
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// A callback bound to an event. Identity (for binding uniqueness, spec §9)
/// is the function pointer itself — Rust function pointers are already
/// `Eq + Hash + Copy`, so no synthetic id is needed.
pub type EventCallback<S> = fn(&mut EventData<S>, OpaqueData);

/// A trigger's completion callback, run once after the binding walk and
/// cleanup pass for that moment finish.
pub type ResultCallback<S> = fn(&mut EventData<S>, handled: bool, OpaqueData);

/// The state shared by every callback invoked for one moment (spec §4.4).
pub struct EventData<'a, S> {
    /// The dispatcher's source identity.
    pub source: S,
    /// The event's original-case name.
    pub name: std::rc::Rc<str>,
    /// A handle back to the event being dispatched.
    pub notifier: Event<S>,
    /// The per-invocation payload supplied to `trigger`/`trigger_prepared`.
    pub data: OpaqueData,
    /// This moment's scratch arena.
    pub pool: &'a Pool,
    /// Sticky: once any callback sets this, it stays set for the rest of the
    /// moment (spec §4.6).
    pub handled: bool,
}

/// One pending (event, trigger record) pair, queued breadth-first.
pub(crate) struct Moment<S> {
    pub(crate) event_key: FoldedKey,
    pub(crate) data: OpaqueData,
    pub(crate) result_cb: Option<ResultCallback<S>>,
    pub(crate) result_arg: OpaqueData,
}

/// A pre-allocated, not-yet-enqueued trigger record (spec §4.4
/// `prepare_trigger`/`unprepare_trigger`/`trigger_prepared`).
///
/// The allocation is a single [`crate::alloc_probe`] checkpoint taken at
/// [`PreparedTrigger::new`] time. [`crate::Event::trigger_prepared`] hands
/// that checkpoint off to the [`Moment`] it enqueues (the moment is released
/// exactly once, when the dispatch loop finishes processing it); if a
/// `PreparedTrigger` is instead dropped — or explicitly
/// [`unprepare`](PreparedTrigger::unprepare)d — without ever being used, the
/// checkpoint is released right there, which is the safe-Rust equivalent of
/// calling `unprepare_trigger`.
pub struct PreparedTrigger<S> {
    reserved: bool,
    _marker: std::marker::PhantomData<fn(S)>,
}

impl<S> PreparedTrigger<S> {
    pub(crate) fn new() -> Result<Self> {
        alloc_probe::try_checkpoint()?;
        Ok(Self {
            reserved: true,
            _marker: std::marker::PhantomData,
        })
    }

    /// Explicitly releases the prepared record without using it.
    pub fn unprepare(mut self) {
        self.reserved = false;
        alloc_probe::release();
    }

    /// Hands the reservation off to the moment being enqueued by
    /// `trigger_prepared`; the allocation it represents is now the moment's
    /// responsibility to release.
    pub(crate) fn consume(mut self) {
        self.reserved = false;
    }
}

impl<S> Drop for PreparedTrigger<S> {
    fn drop(&mut self) {
        if self.reserved {
            alloc_probe::release();
        }
    }
}

/// FIFO of pending moments (spec §3 `moment_queue_head`/`moment_queue_tail`).
pub(crate) struct MomentQueue<S> {
    queue: VecDeque<Moment<S>>,
}

impl<S> MomentQueue<S> {
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub(crate) fn push_back(&mut self, moment: Moment<S>) {
        self.queue.push_back(moment);
    }

    pub(crate) fn pop_front(&mut self) -> Option<Moment<S>> {
        self.queue.pop_front()
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }

    /// Queued moments awaiting dispatch, for balancing the allocation probe
    /// on destroy.
    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }
}

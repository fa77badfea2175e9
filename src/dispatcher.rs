//! The dispatcher: owns the event table and the moment queue, and
//! coordinates breadth-first dispatch and deferred destruction (spec §4.4,
//! §4.5).

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, debug_span, trace};

use crate::alloc_probe;
use crate::error::{DispatchError, Result};
use crate::event::{Event, EventRecord};
use crate::moment::{
    EventCallback, EventData, Moment, MomentQueue, OpaqueData, PreparedTrigger, ResultCallback,
};
use crate::name_index::{FoldedKey, Insert, NameIndex};
use crate::pool::Pool;

pub(crate) struct Inner<S> {
    pub(crate) source: S,
    pub(crate) events: NameIndex<S>,
    queue: MomentQueue<S>,
    pub(crate) running: bool,
    destroy_pending: bool,
    /// The event whose binding list is presently being walked, if any.
    /// Because `trigger` always enqueues rather than recursing (spec §4.4
    /// "Breadth-first property"), at most one event is ever "current" at a
    /// time, nested or not.
    pub(crate) current_event: Option<FoldedKey>,
}

/// A named-event dispatcher bound to one source (spec §3).
///
/// `Dispatcher` is a cheap `Rc` handle: cloning it yields another reference
/// to the same underlying state, which is how a callback reached through an
/// opaque argument can hold (and even [`Dispatcher::destroy`]) the
/// dispatcher it's running under. [`Event`] handles hold only a `Weak`
/// reference, so they never keep a destroyed dispatcher's state alive on
/// their own.
pub struct Dispatcher<S> {
    pub(crate) inner: Rc<RefCell<Inner<S>>>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S> Dispatcher<S> {
    /// Creates a dispatcher bound to `source`.
    pub fn new(source: S) -> Self {
        debug!("dispatcher created");
        Self {
            inner: Rc::new(RefCell::new(Inner {
                source,
                events: NameIndex::new(),
                queue: MomentQueue::new(),
                running: false,
                destroy_pending: false,
                current_event: None,
            })),
        }
    }

    /// The dispatcher's source identity.
    pub fn source(&self) -> S
    where
        S: Clone,
    {
        self.inner.borrow().source.clone()
    }

    /// Declares a new event. Fails with [`DispatchError::InvalidArg`] on an
    /// empty name, or [`DispatchError::InvalidState`] on a name that's
    /// already taken (folded ASCII-case-insensitively), or
    /// [`DispatchError::NoMemory`] if the event record can't be allocated.
    pub fn create_event(&self, name: &str) -> Result<Event<S>> {
        if name.is_empty() {
            return Err(DispatchError::InvalidArg);
        }
        let key = FoldedKey::fold(name);
        alloc_probe::try_checkpoint()?;
        let mut inner = self.inner.borrow_mut();
        match inner
            .events
            .put_if_absent(key.clone(), EventRecord::new(name))
        {
            Insert::Inserted => {
                debug!(event = name, "event declared");
                Ok(Event {
                    dispatcher: Rc::downgrade(&self.inner),
                    key,
                })
            }
            Insert::AlreadyPresent => {
                drop(inner);
                alloc_probe::release();
                Err(DispatchError::InvalidState)
            }
        }
    }

    /// Looks up a previously declared event by name (ASCII case-insensitive).
    pub fn get_event(&self, name: &str) -> Option<Event<S>> {
        let key = FoldedKey::fold(name);
        let inner = self.inner.borrow();
        inner.events.get(&key)?;
        Some(Event {
            dispatcher: Rc::downgrade(&self.inner),
            key,
        })
    }

    /// Pre-allocates a trigger record so a later
    /// [`Event::trigger_prepared`] call can't fail on allocation.
    pub fn prepare_trigger(&self) -> Result<PreparedTrigger<S>> {
        PreparedTrigger::new()
    }

    /// Requests destruction. If no dispatch is in progress, this runs
    /// immediately; otherwise it's deferred until the outermost `trigger`
    /// call returns (spec §4.5). Callers must not use this dispatcher or any
    /// of its events afterwards, even though the deferred case returns
    /// before destruction has actually happened.
    pub fn destroy(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.running {
            inner.destroy_pending = true;
            debug!("destroy requested while running: deferred");
            return;
        }
        Self::finalize_destroy(&mut inner);
    }

    fn finalize_destroy(inner: &mut Inner<S>) {
        // Dropping the event table and queue frees everything in it in one
        // shot (spec §9 "arena per dispatcher... keep destroy O(1)"); balance
        // the probe once per allocation that held a live checkpoint, rather
        // than walking each binding's individual free path.
        let released = inner.events.len() + inner.events.total_bindings() + inner.queue.len();
        inner.events.clear();
        inner.queue.clear();
        for _ in 0..released {
            alloc_probe::release();
        }
        debug!("dispatcher destroyed");
    }
}

impl<S: Clone> Dispatcher<S> {
    /// Enqueues a moment for `event` and, if no dispatch is already running,
    /// drains the queue breadth-first (spec §4.4).
    pub(crate) fn trigger(
        &self,
        event_key: &FoldedKey,
        data: OpaqueData,
        result_cb: Option<ResultCallback<S>>,
        result_arg: OpaqueData,
    ) -> Result<()> {
        alloc_probe::try_checkpoint()?;
        let moment = Moment {
            event_key: event_key.clone(),
            data,
            result_cb,
            result_arg,
        };
        let should_drain = {
            let mut inner = self.inner.borrow_mut();
            // The event handle's dispatcher can outlive the event itself
            // (destroy clears the table but not this `Rc`); treat a stale
            // handle the same way `bind`/`unbind` do, rather than queueing a
            // moment `dispatch_moment` would later have to assert over.
            if inner.events.get(event_key).is_none() {
                drop(inner);
                alloc_probe::release();
                return Err(DispatchError::InvalidState);
            }
            inner.queue.push_back(moment);
            if inner.running {
                false
            } else {
                inner.running = true;
                true
            }
        };
        if should_drain {
            self.drain_queue();
        }
        Ok(())
    }

    /// Enqueues a moment using a pre-paid [`PreparedTrigger`]; infallible
    /// with respect to allocation (spec §4.4).
    pub(crate) fn trigger_prepared(
        &self,
        event_key: &FoldedKey,
        data: OpaqueData,
        result_cb: Option<ResultCallback<S>>,
        result_arg: OpaqueData,
        prepared: PreparedTrigger<S>,
    ) {
        prepared.consume();
        let moment = Moment {
            event_key: event_key.clone(),
            data,
            result_cb,
            result_arg,
        };
        let should_drain = {
            let mut inner = self.inner.borrow_mut();
            if inner.events.get(event_key).is_none() {
                // Stale handle (destroy cleared the table but not this
                // `Rc`): drop the moment silently, same as
                // `Event::trigger_prepared` does when the dispatcher itself
                // is gone. `consume` already transferred the checkpoint to
                // this moment, so release it ourselves now that it won't be
                // enqueued.
                drop(inner);
                alloc_probe::release();
                return;
            }
            inner.queue.push_back(moment);
            if inner.running {
                false
            } else {
                inner.running = true;
                true
            }
        };
        if should_drain {
            self.drain_queue();
        }
    }

    fn drain_queue(&self) {
        loop {
            let moment = {
                let mut inner = self.inner.borrow_mut();
                inner.queue.pop_front()
            };
            let Some(moment) = moment else { break };
            self.dispatch_moment(moment);
        }
        let destroy_now = {
            let mut inner = self.inner.borrow_mut();
            inner.running = false;
            inner.destroy_pending
        };
        if destroy_now {
            let mut inner = self.inner.borrow_mut();
            Self::finalize_destroy(&mut inner);
        }
    }

    fn dispatch_moment(&self, moment: Moment<S>)
    where
        S: Clone,
    {
        let Moment {
            event_key,
            data,
            result_cb,
            result_arg,
        } = moment;

        let (name, source) = {
            let mut inner = self.inner.borrow_mut();
            inner.current_event = Some(event_key.clone());
            let record = inner
                .events
                .get(&event_key)
                .expect("moment refers to a live event");
            (record.name_rc(), inner.source.clone())
        };
        let _span = debug_span!("dispatch", event = %name).entered();

        let pool = Pool::new();
        let mut event_data = EventData {
            source,
            name,
            notifier: Event {
                dispatcher: Rc::downgrade(&self.inner),
                key: event_key.clone(),
            },
            data,
            pool: &pool,
            handled: false,
        };

        // Walk a live view of the binding list: appends made by a callback
        // become visible to this same loop (via the fresh borrow each
        // iteration) but carry `pending_add`, so they're visited-then-
        // skipped rather than invoked (spec §4.3). The borrow is dropped
        // before invoking the callback so a callback is free to reenter
        // `bind`/`unbind`/`trigger`/`destroy` on this dispatcher.
        let mut i = 0;
        loop {
            let next = {
                let inner = self.inner.borrow();
                let record = inner
                    .events
                    .get(&event_key)
                    .expect("event still exists mid-dispatch");
                // `pending_remove` must NOT short-circuit this walk: a peer
                // earlier in the list may have unbound a node we haven't
                // reached yet, and that node still gets its turn this
                // dispatch (spec §9). Only `pending_add` skips invocation —
                // those nodes were appended by a callback during this same
                // walk and become eligible starting with the next trigger.
                record.bindings().get(i).map(|b| (b.cb, b.arg, !b.pending_add))
            };
            let Some((cb, arg, should_invoke)) = next else {
                break;
            };
            if should_invoke {
                trace!(index = i, "invoking binding");
                cb(&mut event_data, arg);
            }
            i += 1;
        }

        // Cleanup pass: unlink every `pending_remove` node, clear
        // `pending_add` on the rest (spec §4.3).
        {
            let mut inner = self.inner.borrow_mut();
            inner.current_event = None;
            if let Some(record) = inner.events.get_mut(&event_key) {
                let unlinked = record.bindings_mut().cleanup();
                for _ in 0..unlinked {
                    alloc_probe::release();
                }
            }
        }

        let handled = event_data.handled;
        if let Some(result_cb) = result_cb {
            result_cb(&mut event_data, handled, result_arg);
        }
        drop(pool);
        // This moment's own allocation (charged by `trigger`/
        // `trigger_prepared`) is now fully retired.
        alloc_probe::release();
    }
}

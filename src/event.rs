//! The event object (spec §4.2): a name, a binding list, and (indirectly,
//! through the dispatcher) a source identity.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::alloc_probe;
use crate::binding::BindingList;
use crate::dispatcher::{Dispatcher, Inner};
use crate::error::{DispatchError, Result};
use crate::moment::{EventCallback, OpaqueData, PreparedTrigger, ResultCallback};
use crate::name_index::FoldedKey;

/// The data a dispatcher owns for one declared event.
pub(crate) struct EventRecord<S> {
    name: Rc<str>,
    bindings: BindingList<S>,
}

impl<S> EventRecord<S> {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: Rc::from(name),
            bindings: BindingList::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_rc(&self) -> Rc<str> {
        Rc::clone(&self.name)
    }

    pub(crate) fn bindings(&self) -> &BindingList<S> {
        &self.bindings
    }

    pub(crate) fn bindings_mut(&mut self) -> &mut BindingList<S> {
        &mut self.bindings
    }
}

/// A lightweight handle to a declared event, returned by
/// [`crate::Dispatcher::create_event`] and [`crate::Dispatcher::get_event`].
///
/// Cloning an `Event` is cheap (an `Rc` bump and a `Weak` clone); every
/// operation re-resolves the event by name against the dispatcher, the way
/// the spec's C-shaped embedding API resolves a handle against its owning
/// dispatcher on every call.
pub struct Event<S> {
    pub(crate) dispatcher: Weak<RefCell<Inner<S>>>,
    pub(crate) key: FoldedKey,
}

impl<S> Clone for Event<S> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            key: self.key.clone(),
        }
    }
}

impl<S> Event<S> {
    /// The event's original-case name, or `None` if the owning dispatcher
    /// has been destroyed.
    ///
    /// Unlike the embedding API's borrowed-for-the-event's-lifetime string,
    /// this returns an owned, reference-counted `Rc<str>`: the event's
    /// storage lives behind the dispatcher's `RefCell`, so a plain borrow
    /// can't outlive the call that produces it. See DESIGN.md (OQ-3). A live
    /// event handle always resolves once its dispatcher is confirmed alive,
    /// consistent with `bind`/`unbind`/`trigger` treating a dropped
    /// dispatcher as a recoverable condition rather than a precondition
    /// violation.
    pub fn name(&self) -> Option<Rc<str>> {
        let dispatcher = self.dispatcher.upgrade()?;
        let inner = dispatcher.borrow();
        Some(inner.events.get(&self.key)?.name_rc())
    }

    /// The owning dispatcher's source identity, or `None` if the dispatcher
    /// has been destroyed.
    pub fn source(&self) -> Option<S>
    where
        S: Clone,
    {
        let dispatcher = self.dispatcher.upgrade()?;
        let source = dispatcher.borrow().source.clone();
        Some(source)
    }

    /// Appends `cb`/`arg` to this event's binding list, or is a no-op if
    /// `cb` is already live-bound (spec §4.2).
    ///
    /// A binding created while this same event is mid-dispatch is marked
    /// `pending_add` and is invisible to the walk in progress (spec §4.2,
    /// §5 rule 1); it becomes eligible starting with the event's next
    /// trigger.
    pub fn bind(&self, cb: EventCallback<S>, arg: OpaqueData) -> Result<()> {
        let dispatcher = self
            .dispatcher
            .upgrade()
            .ok_or(DispatchError::InvalidState)?;
        let mut inner = dispatcher.borrow_mut();
        let pending_add = inner.current_event.as_ref() == Some(&self.key);

        // Charge the probe up front, per spec §4.7 ("if bind fails, the
        // binding list is unchanged"); refund immediately if it turns out
        // to be one of the no-op paths (no new node allocated).
        alloc_probe::try_checkpoint()?;
        let Some(record) = inner.events.get_mut(&self.key) else {
            // The dispatcher was destroyed (clearing its event table)
            // without dropping this handle's `Rc`; treat it the same as an
            // already-gone dispatcher rather than asserting a precondition.
            alloc_probe::release();
            return Err(DispatchError::InvalidState);
        };
        let allocated = record.bindings_mut().append_binding(cb, arg, pending_add);
        if !allocated {
            alloc_probe::release();
        }
        Ok(())
    }

    /// Unbinds `cb`, or is a silent no-op if it wasn't bound (spec §4.2,
    /// §4.7). Unbinding while this event is mid-dispatch defers the unlink
    /// to the walk's cleanup pass (spec §4.3, §9) instead of doing it here.
    pub fn unbind(&self, cb: EventCallback<S>) {
        let Some(dispatcher) = self.dispatcher.upgrade() else {
            return;
        };
        let mut inner = dispatcher.borrow_mut();
        let currently_dispatching = inner.current_event.as_ref() == Some(&self.key);
        let Some(record) = inner.events.get_mut(&self.key) else {
            return;
        };
        let had = record.bindings().len();
        record.bindings_mut().mark_unbind(cb, currently_dispatching);
        if !currently_dispatching && record.bindings().len() < had {
            alloc_probe::release();
        }
    }

    /// Triggers this event with `data`, optionally running `result_cb` with
    /// the aggregated `handled` flag once the moment finishes (spec §4.4).
    ///
    /// If a dispatch is already in progress (anywhere, including on this
    /// same event), the moment is enqueued and this returns immediately;
    /// otherwise this call drains the queue breadth-first until empty.
    pub fn trigger(
        &self,
        data: OpaqueData,
        result_cb: Option<ResultCallback<S>>,
        result_arg: OpaqueData,
    ) -> Result<()>
    where
        S: Clone,
    {
        let dispatcher = self
            .dispatcher
            .upgrade()
            .ok_or(DispatchError::InvalidState)?;
        Dispatcher { inner: dispatcher }.trigger(&self.key, data, result_cb, result_arg)
    }

    /// Like [`Event::trigger`], but reuses a [`PreparedTrigger`] so it can't
    /// fail on allocation.
    pub fn trigger_prepared(
        &self,
        data: OpaqueData,
        result_cb: Option<ResultCallback<S>>,
        result_arg: OpaqueData,
        prepared: PreparedTrigger<S>,
    ) where
        S: Clone,
    {
        let Some(dispatcher) = self.dispatcher.upgrade() else {
            prepared.unprepare();
            return;
        };
        Dispatcher { inner: dispatcher }.trigger_prepared(
            &self.key,
            data,
            result_cb,
            result_arg,
            prepared,
        );
    }
}

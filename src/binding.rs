//! Binding list discipline (spec §4.3): a single insertion-ordered sequence
//! per event, mutated through staged flags rather than copy-on-write so a
//! walk in progress sees a consistent view even while callbacks append or
//! remove entries out from under it.

use crate::moment::{EventCallback, OpaqueData};

pub(crate) struct Binding<S> {
    pub(crate) cb: EventCallback<S>,
    pub(crate) arg: OpaqueData,
    pub(crate) pending_remove: bool,
    pub(crate) pending_add: bool,
}

/// The ordered bindings of one event.
///
/// Appends always go to the back, preserving insertion order. Removal before
/// or after a dispatch of this event is an immediate `Vec::remove`, which
/// keeps the relative order of the survivors — removal *during* a dispatch of
/// this same event is staged via `pending_remove` instead and resolved by
/// [`BindingList::cleanup`].
pub(crate) struct BindingList<S> {
    entries: Vec<Binding<S>>,
}

impl<S> BindingList<S> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Binding<S>> {
        self.entries.get(index)
    }

    fn position_live(&self, cb: EventCallback<S>) -> Option<usize> {
        self.entries
            .iter()
            .position(|b| b.cb as usize == cb as usize && !b.pending_remove)
    }

    /// Appends a binding for `cb`/`arg`, or is a no-op if one already exists.
    ///
    /// - If a live (non-`pending_remove`) binding for `cb` exists, this does
    ///   nothing: rebinding moves neither position nor `arg` (spec §3, §9).
    /// - If a binding for `cb` exists but is `pending_remove`, the flag is
    ///   cleared in place rather than appending a duplicate (spec §9).
    /// - Otherwise a fresh binding is appended with the given `pending_add`.
    ///
    /// Returns whether a new node was actually allocated, so callers that
    /// pre-charge an allocation probe checkpoint can refund it for the
    /// no-op paths.
    pub(crate) fn append_binding(
        &mut self,
        cb: EventCallback<S>,
        arg: OpaqueData,
        pending_add: bool,
    ) -> bool {
        if self.position_live(cb).is_some() {
            return false; // rebind of a live callback: no-op, arg and position unchanged.
        }
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|b| b.cb as usize == cb as usize && b.pending_remove)
        {
            existing.pending_remove = false;
            return false;
        }
        self.entries.push(Binding {
            cb,
            arg,
            pending_remove: false,
            pending_add,
        });
        true
    }

    /// Marks `cb` for removal, or unlinks it immediately if `currently_dispatching`
    /// is false. Double-unbind and unbind-of-unknown are silent no-ops.
    pub(crate) fn mark_unbind(&mut self, cb: EventCallback<S>, currently_dispatching: bool) {
        let Some(i) = self.position_live(cb) else {
            return;
        };
        if currently_dispatching {
            self.entries[i].pending_remove = true;
        } else {
            self.entries.remove(i);
        }
    }

    /// After a walk completes: unlinks every `pending_remove` node and clears
    /// `pending_add` on the rest. Returns the number of bindings unlinked, so
    /// callers can balance the allocation probe.
    pub(crate) fn cleanup(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain_mut(|b| {
            b.pending_add = false;
            !b.pending_remove
        });
        before - self.entries.len()
    }
}

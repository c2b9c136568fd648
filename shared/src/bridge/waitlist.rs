use std::collections::HashMap;

use crate::{
    class::ClassId,
    instance::InstanceId,
    value::{ScriptFn, WireValue},
};

/// A buffered remote-event invocation awaiting the local appearance of its
/// target instance.
#[derive(Debug, Clone)]
pub struct DeferredRemote {
    pub event: String,
    /// Kept in wire form; decoded at replay time, when handles inside the
    /// arguments can actually resolve.
    pub args: Vec<WireValue>,
}

#[derive(Debug)]
pub(crate) struct WaitingEntry {
    pub deferred: Vec<DeferredRemote>,
    /// The one-shot class-scope `Spawn` subscription that replays this
    /// entry; kept so a discard can remove it by identity.
    pub replay_hook: ScriptFn,
}

/// Deferred-delivery buffer for remote events that arrived before the
/// construct-sync creating their target. Keyed by `(class, id)`; replayed
/// exactly once when that id spawns, discarded if the id is destroyed (or a
/// destroy-sync arrives for it) first.
#[derive(Debug, Default)]
pub struct RemoteWaitlist {
    waiting: HashMap<(ClassId, InstanceId), WaitingEntry>,
}

impl RemoteWaitlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_waiting(&self, class: ClassId, id: InstanceId) -> bool {
        self.waiting.contains_key(&(class, id))
    }

    pub fn waiting_count(&self, class: ClassId, id: InstanceId) -> usize {
        self.waiting
            .get(&(class, id))
            .map(|entry| entry.deferred.len())
            .unwrap_or(0)
    }

    pub(crate) fn begin(&mut self, class: ClassId, id: InstanceId, replay_hook: ScriptFn) {
        self.waiting.insert(
            (class, id),
            WaitingEntry {
                deferred: Vec::new(),
                replay_hook,
            },
        );
    }

    pub(crate) fn push(&mut self, class: ClassId, id: InstanceId, item: DeferredRemote) {
        if let Some(entry) = self.waiting.get_mut(&(class, id)) {
            entry.deferred.push(item);
        }
    }

    /// Removes and returns the entry; the caller either replays it or drops
    /// it on the floor (discard).
    pub(crate) fn take(&mut self, class: ClassId, id: InstanceId) -> Option<WaitingEntry> {
        self.waiting.remove(&(class, id))
    }
}

use std::collections::HashMap;

use crate::value::ScriptFn;

/// Built-in lifecycle event names. Custom events share the same namespace;
/// scripts fire them with any other string.
pub mod events {
    pub const SPAWN: &str = "Spawn";
    pub const DESTROY: &str = "Destroy";
    pub const VALUE_CHANGE: &str = "ValueChange";
    pub const CLASS_REGISTER: &str = "ClassRegister";
    pub const REPLICATED_PLAYER_CHANGE: &str = "ReplicatedPlayerChange";
}

/// Subscriber lists keyed by event name, attached to one class or one
/// instance. Dispatch itself lives on the registry, which snapshots the
/// subscriber list before iterating so that a callback unsubscribing itself
/// or others mid-dispatch cannot corrupt the in-progress iteration.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    tables: HashMap<String, Vec<ScriptFn>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the callback to the event's subscriber list.
    pub fn subscribe(&mut self, event: &str, callback: ScriptFn) {
        self.tables.entry(event.to_owned()).or_default().push(callback);
    }

    /// With a callback given, removes entries matching it by identity.
    /// Without one, clears the whole event name.
    pub fn unsubscribe(&mut self, event: &str, callback: Option<&ScriptFn>) {
        match callback {
            Some(target) => {
                if let Some(list) = self.tables.get_mut(event) {
                    list.retain(|cb| !cb.same(target));
                    if list.is_empty() {
                        self.tables.remove(event);
                    }
                }
            }
            None => {
                self.tables.remove(event);
            }
        }
    }

    /// Snapshot of the current subscriber list, in subscription order.
    pub fn snapshot(&self, event: &str) -> Vec<ScriptFn> {
        self.tables.get(event).cloned().unwrap_or_default()
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.tables.get(event).map(Vec::len).unwrap_or(0)
    }
}

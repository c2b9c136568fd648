//! Per-instance key/value storage, change notification and the bind
//! relationship.

use std::collections::BTreeMap;

use log::warn;

use crate::{
    class::{EventTarget, Registry},
    error::InstanceError,
    event::events,
    instance::{BindLink, InstanceAddr},
    outgoing::OutgoingSync,
    value::{HookOutcome, ScriptFn, Value},
};

impl Registry {
    /// Writes `value` under `key` in both the plain field map and the value
    /// store and fires `ValueChange` at class and instance scope. With
    /// `sync`, on the authoritative side, it also marks the key synced and
    /// queues the push to observers.
    ///
    /// Writing the `id` key re-indexes the instance in its class's id map.
    pub fn set_value(
        &mut self,
        addr: InstanceAddr,
        key: &str,
        value: Value,
        sync: bool,
    ) -> Result<(), InstanceError> {
        self.write_value(addr, key, value, sync, sync && self.is_server())
    }

    /// Applies a value pushed by the authoritative side: same local effects
    /// as a synced `set_value`, but never queues further network traffic.
    pub fn apply_synced_value(
        &mut self,
        addr: InstanceAddr,
        key: &str,
        value: Value,
    ) -> Result<(), InstanceError> {
        self.write_value(addr, key, value, true, false)
    }

    fn write_value(
        &mut self,
        addr: InstanceAddr,
        key: &str,
        value: Value,
        mark_synced: bool,
        emit_sync: bool,
    ) -> Result<(), InstanceError> {
        if self.instance(addr).is_none() {
            return Err(self.invalid(addr));
        }
        if key.is_empty() {
            return Err(InstanceError::EmptyKey);
        }
        if matches!(value, Value::Function(_)) {
            return Err(InstanceError::FunctionValue);
        }

        let addr = if key == "id" {
            self.reindex_id(addr, &value)?
        } else {
            addr
        };

        let instance = self.instance_mut(addr).expect("checked above");
        let old = instance
            .store
            .get(key)
            .or_else(|| instance.fields.get(key))
            .cloned()
            .unwrap_or(Value::Nil);
        instance.fields.insert(key.to_owned(), value.clone());
        instance.store.insert(key.to_owned(), value.clone());
        if mark_synced {
            instance.synced.insert(key.to_owned());
        }

        self.emit_pair(
            addr,
            events::VALUE_CHANGE,
            &[Value::Instance(addr), Value::str(key), old, value],
        );

        if emit_sync {
            self.push_outgoing(OutgoingSync::ValueSync {
                addr,
                key: key.to_owned(),
            });
        }
        Ok(())
    }

    fn reindex_id(&mut self, addr: InstanceAddr, value: &Value) -> Result<InstanceAddr, InstanceError> {
        let Some(new_id) = value.as_int() else {
            return Err(InstanceError::NonIntegerId);
        };
        if new_id == addr.id {
            return Ok(addr);
        }
        if self.class(addr.class).has_instance(new_id) {
            return Err(InstanceError::IdCollision {
                class: self.class_name(addr.class).to_owned(),
                id: new_id,
            });
        }
        let target = self.class_mut(addr.class);
        let mut instance = target
            .instances
            .remove(&addr.id)
            .expect("validity checked by caller");
        instance.id = new_id;
        target.instances.insert(new_id, instance);
        if target.singleton == Some(addr.id) {
            target.singleton = Some(new_id);
        }
        target.reserve_forced_id(new_id);
        Ok(InstanceAddr::new(addr.class, new_id))
    }

    /// Plain attribute write: the direct-assignment path of the scripting
    /// runtime. No events, no sync. Unlike `set_value` this accepts
    /// function values, since methods live in the same bag.
    pub fn set_field(
        &mut self,
        addr: InstanceAddr,
        key: &str,
        value: Value,
    ) -> Result<(), InstanceError> {
        if key.is_empty() {
            return Err(InstanceError::EmptyKey);
        }
        let Some(instance) = self.instance_mut(addr) else {
            return Err(self.invalid(addr));
        };
        instance.fields.insert(key.to_owned(), value);
        Ok(())
    }

    /// Value-store lookup, falling back to the plain field, then to the
    /// caller-supplied default. Soft: an invalid instance yields the
    /// fallback rather than an error.
    pub fn get_value(&self, addr: InstanceAddr, key: &str, fallback: Option<Value>) -> Value {
        let fallback = fallback.unwrap_or(Value::Nil);
        let Some(instance) = self.instance(addr) else {
            return fallback;
        };
        instance
            .store
            .get(key)
            .or_else(|| instance.fields.get(key))
            .cloned()
            .unwrap_or(fallback)
    }

    /// Full value-store snapshot, or just the synced subset.
    pub fn values_snapshot(&self, addr: InstanceAddr, synced_only: bool) -> BTreeMap<String, Value> {
        let Some(instance) = self.instance(addr) else {
            return BTreeMap::new();
        };
        instance
            .store
            .iter()
            .filter(|(key, _)| !synced_only || instance.synced.contains(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn is_synced_key(&self, addr: InstanceAddr, key: &str) -> bool {
        self.instance(addr)
            .map(|i| i.synced.contains(key))
            .unwrap_or(false)
    }

    // Binding

    /// Ties `addr`'s lifetime to `target`: destroying the target destroys
    /// `addr`; destroying `addr` merely clears the link. Rebinding silently
    /// replaces any prior binding.
    pub fn bind(&mut self, addr: InstanceAddr, target: InstanceAddr) -> Result<(), InstanceError> {
        if self.instance(addr).is_none() {
            return Err(self.invalid(addr));
        }
        if self.instance(target).is_none() {
            return Err(self.invalid(target));
        }
        self.unbind(addr)?;

        let cascade = ScriptFn::new(move |registry, _args| {
            if let Err(err) = registry.destroy(addr, &[]) {
                warn!("bind cascade for {:?} skipped: {}", addr, err);
            }
            HookOutcome::Pass
        });
        let cascade_for_cleanup = cascade.clone();
        let cleanup = ScriptFn::new(move |registry, _args| {
            registry.unsubscribe(
                EventTarget::Instance(target),
                events::DESTROY,
                Some(&cascade_for_cleanup),
            );
            HookOutcome::Detach
        });

        self.subscribe(EventTarget::Instance(target), events::DESTROY, cascade.clone());
        self.subscribe(EventTarget::Instance(addr), events::DESTROY, cleanup.clone());

        let instance = self.instance_mut(addr).expect("checked above");
        instance.bind = Some(BindLink {
            target,
            cascade,
            cleanup,
        });
        Ok(())
    }

    /// Removes the current binding, if any, unsubscribing both ends.
    pub fn unbind(&mut self, addr: InstanceAddr) -> Result<(), InstanceError> {
        let Some(instance) = self.instance_mut(addr) else {
            return Err(self.invalid(addr));
        };
        let Some(link) = instance.bind.take() else {
            return Ok(());
        };
        self.unsubscribe(
            EventTarget::Instance(link.target),
            events::DESTROY,
            Some(&link.cascade),
        );
        self.unsubscribe(EventTarget::Instance(addr), events::DESTROY, Some(&link.cleanup));
        Ok(())
    }

    pub fn bind_target(&self, addr: InstanceAddr) -> Option<InstanceAddr> {
        self.instance(addr).and_then(|i| i.bind.as_ref().map(|b| b.target))
    }
}

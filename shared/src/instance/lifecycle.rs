//! Instance construction, teardown and cloning.

use log::warn;

use crate::{
    class::{ClassFlags, ClassId, HookSlot, Registry},
    error::InstanceError,
    event::events,
    instance::{DestroyOutcome, Instance, InstanceAddr, InstanceId},
    outgoing::OutgoingSync,
    value::{HookOutcome, Value},
};

impl Registry {
    /// Allocates an identity, constructs the instance and fires `Spawn`.
    ///
    /// For a `Singleton` class with a live instance this returns that
    /// instance unchanged; the constructor is not re-run.
    pub fn new_instance(
        &mut self,
        class: ClassId,
        args: &[Value],
    ) -> Result<InstanceAddr, InstanceError> {
        self.construct(class, None, args)
    }

    /// Construction with an explicit id, used when a construct-sync message
    /// supplies the authoritative identity. Adopts the id exactly, without
    /// re-running allocation, and pushes the matching counter past it.
    pub fn new_instance_with_id(
        &mut self,
        class: ClassId,
        id: InstanceId,
        args: &[Value],
    ) -> Result<InstanceAddr, InstanceError> {
        self.construct(class, Some(id), args)
    }

    fn construct(
        &mut self,
        class: ClassId,
        forced_id: Option<InstanceId>,
        args: &[Value],
    ) -> Result<InstanceAddr, InstanceError> {
        let flags = self.class(class).flags();
        if flags.contains(ClassFlags::ABSTRACT) {
            return Err(InstanceError::Abstract(self.class_name(class).to_owned()));
        }
        if forced_id.is_none() {
            if flags.contains(ClassFlags::SERVER_ONLY) && !self.is_server() {
                return Err(InstanceError::ServerOnly(self.class_name(class).to_owned()));
            }
            // a valid singleton occupies the slot, even mid-teardown
            if flags.contains(ClassFlags::SINGLETON) {
                if let Some(existing) = self.class(class).singleton {
                    if self.class(class).has_instance(existing) {
                        return Ok(InstanceAddr::new(class, existing));
                    }
                }
            }
        }

        let id = match forced_id {
            Some(forced) => {
                if self.class(class).has_instance(forced) {
                    return Err(InstanceError::IdCollision {
                        class: self.class_name(class).to_owned(),
                        id: forced,
                    });
                }
                self.class_mut(class).reserve_forced_id(forced);
                forced
            }
            None => {
                let is_server = self.is_server();
                let target = self.class_mut(class);
                if flags.contains(ClassFlags::CLIENT_LOCAL) {
                    target.allocate_local_id()
                } else if is_server || flags.contains(ClassFlags::SHARED_ID) {
                    target.allocate_host_id()
                } else {
                    target.allocate_local_id()
                }
            }
        };

        let addr = InstanceAddr::new(class, id);
        self.class_mut(class).instances.insert(id, Instance::new(id));
        if flags.contains(ClassFlags::SINGLETON) {
            let slot = &mut self.class_mut(class).singleton;
            if slot.is_none() {
                *slot = Some(id);
            }
        }

        if let Some(ctor) = self.hook(class, HookSlot::Construct) {
            let mut ctor_args = Vec::with_capacity(args.len() + 1);
            ctor_args.push(Value::Instance(addr));
            ctor_args.extend_from_slice(args);
            ctor.call(self, &ctor_args);
        }

        self.emit_pair(addr, events::SPAWN, &[Value::Instance(addr)]);

        if self.is_server() && flags.contains(ClassFlags::REPLICATED) {
            self.push_outgoing(OutgoingSync::SpawnReplicated(addr));
        }
        Ok(addr)
    }

    /// Runs the teardown sequence: destructor (veto point), `Destroy`
    /// events, removal from the class indexes, network teardown, and
    /// permanent invalidation of the address.
    pub fn destroy(
        &mut self,
        addr: InstanceAddr,
        args: &[Value],
    ) -> Result<DestroyOutcome, InstanceError> {
        let Some(instance) = self.instance(addr) else {
            return Err(self.invalid(addr));
        };
        if instance.being_destroyed {
            return Err(InstanceError::AlreadyDestroying {
                class: self.class_name(addr.class).to_owned(),
                id: addr.id,
            });
        }

        if let Some(dtor) = self.hook(addr.class, HookSlot::Destruct) {
            let mut dtor_args = Vec::with_capacity(args.len() + 1);
            dtor_args.push(Value::Instance(addr));
            dtor_args.extend_from_slice(args);
            if dtor.call(self, &dtor_args) == HookOutcome::Cancel {
                return Ok(DestroyOutcome::Cancelled);
            }
        }

        // the dtor ran with the instance fully alive; it may itself have
        // completed a re-entrant destroy, so re-check before staging
        let Some(instance) = self.instance_mut(addr) else {
            return Err(self.invalid(addr));
        };
        instance.being_destroyed = true;

        self.emit_pair(addr, events::DESTROY, &[Value::Instance(addr)]);

        // deferred remote events addressed to this id must never replay
        // onto a dead or reused id
        self.discard_waiters(addr.class, addr.id);

        let target = self.class_mut(addr.class);
        if target.singleton == Some(addr.id) {
            target.singleton = None;
        }
        target.instances.remove(&addr.id);

        if self.is_server() {
            self.push_outgoing(OutgoingSync::Despawn {
                class: addr.class,
                class_name: self.class_name(addr.class).to_owned(),
                id: addr.id,
            });
        }
        Ok(DestroyOutcome::Destroyed)
    }

    /// Fresh instance of the same class, constructed with `args`, carrying a
    /// copy of every plain attribute and value-store entry except `id` and
    /// the ignored keys. Synced keys are re-marked through the sync path so
    /// replication resumes for the clone.
    pub fn clone_instance(
        &mut self,
        source: InstanceAddr,
        ignored_keys: &[&str],
        args: &[Value],
    ) -> Result<InstanceAddr, InstanceError> {
        let Some(instance) = self.instance(source) else {
            return Err(self.invalid(source));
        };

        let skip = |key: &str| key == "id" || ignored_keys.contains(&key);
        let fields: Vec<(String, Value)> = instance
            .fields
            .iter()
            .filter(|(k, _)| !skip(k) && !instance.store.contains_key(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let store: Vec<(String, Value, bool)> = instance
            .store
            .iter()
            .filter(|(k, _)| !skip(k))
            .map(|(k, v)| (k.clone(), v.clone(), instance.synced.contains(k)))
            .collect();

        let clone = self.new_instance(source.class, args)?;
        for (key, value) in fields {
            self.set_field(clone, &key, value)?;
        }
        for (key, value, synced) in store {
            self.set_value(clone, &key, value, synced)?;
        }
        Ok(clone)
    }

    pub(crate) fn invalid(&self, addr: InstanceAddr) -> InstanceError {
        InstanceError::Invalid {
            class: self.class_name(addr.class).to_owned(),
            id: addr.id,
        }
    }

    /// Client-side teardown ordered by a destroy-sync. Runs the normal
    /// destroy sequence. A destructor that vetoes a server-ordered teardown
    /// leaves the mirror desynced from the server; that is the script's
    /// decision and is only logged here.
    pub fn destroy_mirror(&mut self, addr: InstanceAddr) -> Result<DestroyOutcome, InstanceError> {
        let outcome = self.destroy(addr, &[])?;
        if outcome == DestroyOutcome::Cancelled {
            warn!(
                "mirror {}:{} vetoed a server-ordered teardown and is now desynced",
                self.class_name(addr.class),
                addr.id
            );
        }
        Ok(outcome)
    }
}

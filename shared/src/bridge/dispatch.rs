//! Remote-event subscription tables and inbound dispatch.
//!
//! Remote events live in their own dispatch tables, separate from the local
//! bus: a class-scope subscription fires for every instance of the class, an
//! instance-scope subscription for that instance only. Inbound events whose
//! target is not yet known locally are buffered and replayed exactly once
//! when the matching id spawns.

use log::warn;

use crate::{
    bridge::waitlist::DeferredRemote,
    class::{ClassId, EventTarget, Registry},
    codec,
    error::InstanceError,
    event::events,
    instance::{InstanceAddr, InstanceId},
    outgoing::{OutgoingSync, RemoteTargets},
    value::{HookOutcome, ScriptFn, Value, WireValue},
};

impl Registry {
    pub fn subscribe_remote(&mut self, target: EventTarget, event: &str, callback: ScriptFn) {
        match target {
            EventTarget::Class(class) => {
                self.class_mut(class).remote_events.subscribe(event, callback);
            }
            EventTarget::Instance(addr) => {
                if let Some(instance) = self.instance_mut(addr) {
                    instance.remote_events.subscribe(event, callback);
                }
            }
        }
    }

    pub fn unsubscribe_remote(
        &mut self,
        target: EventTarget,
        event: &str,
        callback: Option<&ScriptFn>,
    ) {
        match target {
            EventTarget::Class(class) => {
                self.class_mut(class).remote_events.unsubscribe(event, callback);
            }
            EventTarget::Instance(addr) => {
                if let Some(instance) = self.instance_mut(addr) {
                    instance.remote_events.unsubscribe(event, callback);
                }
            }
        }
    }

    /// Queues a custom event for the wire. Arguments are encoded now, so a
    /// function value is rejected here rather than at flush time.
    pub fn queue_remote_event(
        &mut self,
        addr: InstanceAddr,
        event: &str,
        args: &[Value],
        targets: RemoteTargets,
    ) -> Result<(), InstanceError> {
        if self.instance(addr).is_none() {
            return Err(self.invalid(addr));
        }
        if self.is_server() == matches!(targets, RemoteTargets::Server) {
            warn!(
                "remote event `{}` dropped: targets {:?} are illegal from this side",
                event, targets
            );
            return Ok(());
        }
        let mut encoded = Vec::with_capacity(args.len());
        for arg in args {
            encoded.push(codec::encode(self, arg).map_err(|_| InstanceError::FunctionValue)?);
        }
        self.push_outgoing(OutgoingSync::RemoteEvent {
            addr,
            event: event.to_owned(),
            args: encoded,
            targets,
        });
        Ok(())
    }

    /// Entry point for a received remote event. Dispatches immediately when
    /// the target instance is known locally; otherwise buffers the
    /// invocation keyed by `(class, id)` and installs a one-shot replay on
    /// the class's `Spawn` event.
    pub fn dispatch_remote_inbound(
        &mut self,
        class_name: &str,
        id: InstanceId,
        event: &str,
        args: Vec<WireValue>,
    ) {
        let Some(class) = self.class_by_name(class_name) else {
            warn!("remote event `{}` for unknown class `{}` dropped", event, class_name);
            return;
        };
        if let Some(addr) = self.instance_by_id(class, id) {
            self.dispatch_remote_now(addr, event, &args);
            return;
        }

        if !self.waitlist.is_waiting(class, id) {
            let replay_hook = ScriptFn::new(move |registry, hook_args| {
                let spawned = hook_args.first().and_then(Value::as_instance);
                match spawned {
                    Some(addr) if addr.id == id => {
                        registry.replay_waiters(addr);
                        HookOutcome::Detach
                    }
                    _ => HookOutcome::Pass,
                }
            });
            self.subscribe(EventTarget::Class(class), events::SPAWN, replay_hook.clone());
            self.waitlist.begin(class, id, replay_hook);
        }
        self.waitlist.push(
            class,
            id,
            DeferredRemote {
                event: event.to_owned(),
                args,
            },
        );
    }

    /// Number of remote events currently buffered for `(class, id)`.
    pub fn waitlist_count(&self, class: ClassId, id: InstanceId) -> usize {
        self.waitlist.waiting_count(class, id)
    }

    /// Drops any buffered remote events for `(class, id)` along with their
    /// replay subscription. Called from the teardown sequence, and by the
    /// client when a destroy-sync names an id that never got mirrored.
    pub fn discard_waiters(&mut self, class: ClassId, id: InstanceId) {
        if let Some(entry) = self.waitlist.take(class, id) {
            self.unsubscribe(
                EventTarget::Class(class),
                events::SPAWN,
                Some(&entry.replay_hook),
            );
        }
    }

    /// Replays every buffered invocation for the freshly spawned instance,
    /// in arrival order, then forgets them. Called once per waited-on id:
    /// the entry is removed before the first replay, so re-entrant spawns
    /// can never double-replay.
    pub(crate) fn replay_waiters(&mut self, addr: InstanceAddr) {
        let Some(entry) = self.waitlist.take(addr.class, addr.id) else {
            return;
        };
        for deferred in entry.deferred {
            self.dispatch_remote_now(addr, &deferred.event, &deferred.args);
        }
    }

    fn dispatch_remote_now(&mut self, addr: InstanceAddr, event: &str, args: &[WireValue]) {
        let mut decoded = Vec::with_capacity(args.len() + 1);
        decoded.push(Value::Instance(addr));
        for arg in args {
            decoded.push(codec::decode(self, arg));
        }

        let class_snapshot = self.class(addr.class).remote_events.snapshot(event);
        let instance_snapshot = match self.instance(addr) {
            Some(instance) => instance.remote_events.snapshot(event),
            None => Vec::new(),
        };

        let mut detached_class = Vec::new();
        for callback in &class_snapshot {
            if callback.call(self, &decoded) == HookOutcome::Detach {
                detached_class.push(callback.clone());
            }
        }
        let mut detached_instance = Vec::new();
        for callback in &instance_snapshot {
            if callback.call(self, &decoded) == HookOutcome::Detach {
                detached_instance.push(callback.clone());
            }
        }
        for callback in detached_class {
            self.unsubscribe_remote(EventTarget::Class(addr.class), event, Some(&callback));
        }
        for callback in detached_instance {
            self.unsubscribe_remote(EventTarget::Instance(addr), event, Some(&callback));
        }
    }
}

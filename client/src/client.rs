//! The client-side mirror frontend.
//!
//! Applies construct/destroy/value packets from the server to the local
//! registry and forwards client-originated remote events. The client's
//! registry is authoritative only for its own client-local instances; every
//! mirrored instance adopts the exact id the server supplied.

use log::warn;

use mimic_shared::{
    codec, ClassId, ClientTransport, DestroyOutcome, InstanceAddr, InstanceError, OutgoingSync,
    Registry, RemoteTargets, Value, WirePacket, HostRole,
};

pub struct ReplicationClient<T: ClientTransport> {
    registry: Registry,
    transport: T,
}

impl<T: ClientTransport> ReplicationClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            registry: Registry::new(HostRole::Client),
            transport,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Direct registry access. Callers mutating through this must invoke
    /// [`flush`](Self::flush) afterwards so queued remote events are sent.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // Convenience wrappers

    pub fn spawn(&mut self, class: ClassId, args: &[Value]) -> Result<InstanceAddr, InstanceError> {
        let addr = self.registry.new_instance(class, args)?;
        self.flush();
        Ok(addr)
    }

    pub fn destroy(
        &mut self,
        addr: InstanceAddr,
        args: &[Value],
    ) -> Result<DestroyOutcome, InstanceError> {
        let outcome = self.registry.destroy(addr, args)?;
        self.flush();
        Ok(outcome)
    }

    /// Sends a custom remote event to the server.
    pub fn send_event(
        &mut self,
        addr: InstanceAddr,
        event: &str,
        args: &[Value],
    ) -> Result<(), InstanceError> {
        self.registry
            .queue_remote_event(addr, event, args, RemoteTargets::Server)?;
        self.flush();
        Ok(())
    }

    // Inbound

    /// Applies one packet received from the server.
    pub fn handle_packet(&mut self, packet: WirePacket) {
        match packet {
            WirePacket::Construct { class, id, values } => {
                self.apply_construct(&class, id, values);
            }
            WirePacket::Destruct { class, id } => {
                self.apply_destruct(&class, id);
            }
            WirePacket::SetValue {
                class,
                id,
                key,
                value,
            } => {
                self.apply_set_value(&class, id, &key, value);
            }
            WirePacket::EventToClient {
                class,
                id,
                event,
                args,
            } => {
                self.registry.dispatch_remote_inbound(&class, id, &event, args);
            }
            WirePacket::EventToServer { .. } => {
                warn!("client received a client-to-server packet; dropped");
            }
        }
        self.flush();
    }

    /// Construct-sync: create the local mirror with the server's exact id,
    /// or, if the id is already mirrored, just apply the snapshot. The
    /// mirror runs the normal construction path, so `Spawn` fires and any
    /// deferred remote events replay.
    fn apply_construct(&mut self, class_name: &str, id: i64, values: Vec<(String, mimic_shared::WireValue)>) {
        let Some(class) = self.registry.class_by_name(class_name) else {
            warn!("construct-sync for unknown class `{}` dropped", class_name);
            return;
        };
        let addr = match self.registry.instance_by_id(class, id) {
            Some(existing) => existing,
            None => match self.registry.new_instance_with_id(class, id, &[]) {
                Ok(addr) => addr,
                Err(err) => {
                    warn!("construct-sync for {}:{} failed: {}", class_name, id, err);
                    return;
                }
            },
        };
        for (key, wire) in values {
            let value = codec::decode(&self.registry, &wire);
            if let Err(err) = self.registry.apply_synced_value(addr, &key, value) {
                warn!("construct-sync value `{}` on {}:{} rejected: {}", key, class_name, id, err);
            }
        }
    }

    /// Destroy-sync: tear down the local mirror. A destroy-sync for an id
    /// that never got mirrored still discards any deferred remote events
    /// buffered for it, so they cannot replay onto a reused id later.
    fn apply_destruct(&mut self, class_name: &str, id: i64) {
        let Some(class) = self.registry.class_by_name(class_name) else {
            warn!("destroy-sync for unknown class `{}` dropped", class_name);
            return;
        };
        match self.registry.instance_by_id(class, id) {
            Some(addr) => {
                if let Err(err) = self.registry.destroy_mirror(addr) {
                    warn!("destroy-sync for {}:{} failed: {}", class_name, id, err);
                }
            }
            None => {
                self.registry.discard_waiters(class, id);
            }
        }
    }

    fn apply_set_value(&mut self, class_name: &str, id: i64, key: &str, wire: mimic_shared::WireValue) {
        let Some(class) = self.registry.class_by_name(class_name) else {
            warn!("set-value sync for unknown class `{}` dropped", class_name);
            return;
        };
        let Some(addr) = self.registry.instance_by_id(class, id) else {
            warn!("set-value sync for unmirrored {}:{} dropped", class_name, id);
            return;
        };
        let value = codec::decode(&self.registry, &wire);
        if let Err(err) = self.registry.apply_synced_value(addr, key, value) {
            warn!("set-value sync `{}` on {}:{} rejected: {}", key, class_name, id, err);
        }
    }

    // Outgoing queue translation

    /// Drains the registry's queued remote events to the server. Lifecycle
    /// sync never originates on a client; the registry does not record it
    /// for this role.
    pub fn flush(&mut self) {
        for sync in self.registry.take_outgoing() {
            match sync {
                OutgoingSync::RemoteEvent {
                    addr,
                    event,
                    args,
                    targets: RemoteTargets::Server,
                } => {
                    let packet = WirePacket::EventToServer {
                        class: self.registry.class_name(addr.class).to_owned(),
                        id: addr.id,
                        event,
                        args,
                    };
                    match packet.to_bytes() {
                        Ok(bytes) => self.transport.send(packet.channel(), &bytes),
                        Err(err) => warn!("packet encode failed: {}", err),
                    }
                }
                other => {
                    warn!("client registry recorded unexpected sync {:?}; dropped", other);
                }
            }
        }
    }
}

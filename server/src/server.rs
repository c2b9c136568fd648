//! The authoritative replication frontend.
//!
//! Owns the server-side registry, the per-instance observer sets and the
//! outbound transport. Every mutating operation drains the registry's
//! outgoing queue into wire packets before returning, so cascaded effects
//! (bind-triggered destroys, hook-driven synced writes) reach observers in
//! mutation order.

use log::warn;

use mimic_shared::{
    codec, events, ClassId, DestroyOutcome, EventTarget, InstanceAddr, InstanceError,
    OutgoingSync, PlayerId, Registry, RemoteTargets, ServerTransport, Value, WirePacket,
    HostRole, WireValue,
};

use crate::{roster::PlayerRoster, scope::ScopeMap};

/// One observer designation: a specific player, or every connected player
/// (the wire's `"*"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeTarget {
    All,
    Player(PlayerId),
}

/// Desired observer set for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeUpdate {
    All,
    Clear,
    Players(Vec<PlayerId>),
}

pub struct ReplicationServer<T: ServerTransport> {
    registry: Registry,
    transport: T,
    roster: PlayerRoster,
    scope: ScopeMap,
}

impl<T: ServerTransport> ReplicationServer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            registry: Registry::new(HostRole::Server),
            transport,
            roster: PlayerRoster::new(),
            scope: ScopeMap::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Direct registry access. Callers mutating through this must invoke
    /// [`flush`](Self::flush) afterwards so queued sync reaches the wire.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // Convenience wrappers: registry operation + flush

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

    pub fn set_value(
        &mut self,
        addr: InstanceAddr,
        key: &str,
        value: Value,
        sync: bool,
    ) -> Result<(), InstanceError> {
        self.registry.set_value(addr, key, value, sync)?;
        self.flush();
        Ok(())
    }

    /// Sends a custom remote event to the given players.
    pub fn send_event(
        &mut self,
        addr: InstanceAddr,
        event: &str,
        args: &[Value],
        targets: RemoteTargets,
    ) -> Result<(), InstanceError> {
        self.registry.queue_remote_event(addr, event, args, targets)?;
        self.flush();
        Ok(())
    }

    // Replication set management

    /// Adds an observer. Returns false when the designation was already in
    /// effect. Adding `All` broadcasts one construct-sync; adding a player
    /// flips away from observed-by-all if needed, sends a targeted
    /// construct-sync and fires `ReplicatedPlayerChange`.
    pub fn add_replicated_player(
        &mut self,
        addr: InstanceAddr,
        target: ScopeTarget,
    ) -> Result<bool, InstanceError> {
        self.check_valid(addr)?;
        let changed = match target {
            ScopeTarget::All => {
                let entry = self.scope.entry(addr);
                if entry.all {
                    false
                } else {
                    entry.set_all();
                    let packet = self.construct_packet(addr).0;
                    Self::deliver_all(&mut self.transport, &packet);
                    true
                }
            }
            ScopeTarget::Player(player) => {
                let entry = self.scope.entry(addr);
                entry.all = false;
                if !entry.players.insert(player) {
                    false
                } else {
                    let (packet, values) = self.construct_packet(addr);
                    Self::deliver_to(&mut self.transport, player, &packet);
                    if let Some(entry) = self.scope.get_mut(addr) {
                        entry.note_snapshot(player, &values);
                    }
                    self.fire_scope_change(addr, player, true);
                    true
                }
            }
        };
        self.flush();
        Ok(changed)
    }

    /// Removes an observer. Removing `All` while observed-by-all broadcasts
    /// a destroy-sync; removing `All` otherwise drops every explicit
    /// observer one by one. Removing a player sends the destroy-sync to that
    /// player only.
    pub fn remove_replicated_player(
        &mut self,
        addr: InstanceAddr,
        target: ScopeTarget,
    ) -> Result<bool, InstanceError> {
        self.check_valid(addr)?;
        let changed = match target {
            ScopeTarget::All => {
                let Some(entry) = self.scope.get_mut(addr) else {
                    self.flush();
                    return Ok(false);
                };
                if entry.all {
                    entry.all = false;
                    self.scope.prune(addr);
                    let packet = WirePacket::Destruct {
                        class: self.registry.class_name(addr.class).to_owned(),
                        id: addr.id,
                    };
                    Self::deliver_all(&mut self.transport, &packet);
                    true
                } else {
                    let players = entry.players_sorted();
                    let mut any = false;
                    for player in players {
                        any |= self.remove_one_player(addr, player);
                    }
                    any
                }
            }
            ScopeTarget::Player(player) => self.remove_one_player(addr, player),
        };
        self.flush();
        Ok(changed)
    }

    /// Reconciles the desired observer set against the current one,
    /// applying the difference through the single-player paths so each
    /// actual change fires its sync message and event exactly once.
    pub fn set_replicated_players(
        &mut self,
        addr: InstanceAddr,
        update: ScopeUpdate,
    ) -> Result<bool, InstanceError> {
        match update {
            ScopeUpdate::All => self.add_replicated_player(addr, ScopeTarget::All),
            ScopeUpdate::Clear => self.remove_replicated_player(addr, ScopeTarget::All),
            ScopeUpdate::Players(desired) => {
                self.check_valid(addr)?;
                let current = match self.scope.get(addr) {
                    Some(entry) if !entry.all => entry.players_sorted(),
                    _ => Vec::new(),
                };
                let mut changed = false;
                for player in &current {
                    if !desired.contains(player) {
                        changed |= self.remove_replicated_player(addr, ScopeTarget::Player(*player))?;
                    }
                }
                for player in desired {
                    if !current.contains(&player) {
                        changed |= self.add_replicated_player(addr, ScopeTarget::Player(player))?;
                    }
                }
                Ok(changed)
            }
        }
    }

    pub fn is_observed_by(&self, addr: InstanceAddr, player: PlayerId) -> bool {
        self.scope.get(addr).map(|e| e.observes(player)).unwrap_or(false)
    }

    pub fn is_observed_by_all(&self, addr: InstanceAddr) -> bool {
        self.scope.get(addr).map(|e| e.all).unwrap_or(false)
    }

    // Player directory notifications

    pub fn player_connected(&mut self, player: PlayerId) {
        self.roster.connect(player);
    }

    /// A freshly-ready player has no prior state: re-send construct-sync for
    /// every instance it observes, explicitly or through observed-by-all.
    pub fn player_ready(&mut self, player: PlayerId) -> bool {
        if !self.roster.mark_ready(player) {
            return false;
        }
        for addr in self.scope.addrs_sorted() {
            let (observes, all) = match self.scope.get(addr) {
                Some(entry) => (entry.observes(player), entry.all),
                None => continue,
            };
            if !observes {
                continue;
            }
            let (packet, values) = self.construct_packet(addr);
            Self::deliver_to(&mut self.transport, player, &packet);
            if !all {
                if let Some(entry) = self.scope.get_mut(addr) {
                    entry.note_snapshot(player, &values);
                }
            }
        }
        true
    }

    /// Drops the player from every observer set. No destroy-sync is sent to
    /// the departed player.
    pub fn player_disconnected(&mut self, player: PlayerId) {
        if !self.roster.disconnect(player) {
            return;
        }
        let mut dropped = Vec::new();
        for addr in self.scope.addrs_sorted() {
            if let Some(entry) = self.scope.get_mut(addr) {
                if entry.forget_player(player) {
                    dropped.push(addr);
                }
                self.scope.prune(addr);
            }
        }
        for addr in dropped {
            self.fire_scope_change(addr, player, false);
        }
        self.flush();
    }

    pub fn connected_players(&self) -> Vec<PlayerId> {
        self.roster.connected()
    }

    // Inbound

    /// Handles one packet received from a client. Only remote events flow
    /// client → server; anything else is a protocol violation and dropped.
    pub fn handle_packet(&mut self, from: PlayerId, packet: WirePacket) {
        match packet {
            WirePacket::EventToServer {
                class,
                id,
                event,
                args,
            } => {
                self.registry.dispatch_remote_inbound(&class, id, &event, args);
                self.flush();
            }
            other => {
                warn!("unexpected {:?} packet from {}", other.channel(), from);
            }
        }
    }

    // Outgoing queue translation

    /// Drains the registry's recorded side effects into wire packets.
    pub fn flush(&mut self) {
        while self.registry.has_outgoing() {
            for sync in self.registry.take_outgoing() {
                self.apply_outgoing(sync);
            }
        }
    }

    fn apply_outgoing(&mut self, sync: OutgoingSync) {
        match sync {
            OutgoingSync::SpawnReplicated(addr) => {
                if !self.registry.is_valid(addr) {
                    return;
                }
                self.scope.entry(addr).set_all();
                let packet = self.construct_packet(addr).0;
                Self::deliver_all(&mut self.transport, &packet);
            }
            OutgoingSync::Despawn {
                class,
                class_name,
                id,
            } => {
                let addr = InstanceAddr::new(class, id);
                let Some(entry) = self.scope.remove(addr) else {
                    return;
                };
                let packet = WirePacket::Destruct {
                    class: class_name,
                    id,
                };
                if entry.all {
                    Self::deliver_all(&mut self.transport, &packet);
                } else {
                    for player in entry.players_sorted() {
                        Self::deliver_to(&mut self.transport, player, &packet);
                    }
                }
            }
            OutgoingSync::ValueSync { addr, key } => {
                if !self.registry.is_valid(addr) {
                    return;
                }
                let Some(entry) = self.scope.get(addr) else {
                    return;
                };
                let value = self.registry.get_value(addr, &key, None);
                let wire = match codec::encode(&self.registry, &value) {
                    Ok(wire) => wire,
                    Err(err) => {
                        warn!("synced value `{}` on {:?} not encodable: {}", key, addr, err);
                        return;
                    }
                };
                let packet = WirePacket::SetValue {
                    class: self.registry.class_name(addr.class).to_owned(),
                    id: addr.id,
                    key: key.clone(),
                    value: wire.clone(),
                };
                if entry.all {
                    Self::deliver_all(&mut self.transport, &packet);
                } else {
                    let players = entry.players_sorted();
                    for player in players {
                        let entry = self.scope.get_mut(addr).expect("entry present");
                        if entry.needs_value(player, &key, &wire) {
                            entry.note_sent(player, &key, wire.clone());
                            Self::deliver_to(&mut self.transport, player, &packet);
                        }
                    }
                }
            }
            OutgoingSync::RemoteEvent {
                addr,
                event,
                args,
                targets,
            } => {
                let packet = WirePacket::EventToClient {
                    class: self.registry.class_name(addr.class).to_owned(),
                    id: addr.id,
                    event,
                    args,
                };
                match targets {
                    RemoteTargets::All => Self::deliver_all(&mut self.transport, &packet),
                    RemoteTargets::Player(player) => {
                        Self::deliver_to(&mut self.transport, player, &packet)
                    }
                    RemoteTargets::Players(players) => {
                        for player in players {
                            Self::deliver_to(&mut self.transport, player, &packet);
                        }
                    }
                    RemoteTargets::Server => {
                        warn!("server-side remote event targeted the server; dropped");
                    }
                }
            }
        }
    }

    // Helpers

    fn check_valid(&self, addr: InstanceAddr) -> Result<(), InstanceError> {
        if self.registry.is_valid(addr) {
            Ok(())
        } else {
            Err(InstanceError::Invalid {
                class: self.registry.class_name(addr.class).to_owned(),
                id: addr.id,
            })
        }
    }

    fn remove_one_player(&mut self, addr: InstanceAddr, player: PlayerId) -> bool {
        let Some(entry) = self.scope.get_mut(addr) else {
            return false;
        };
        if !entry.forget_player(player) {
            return false;
        }
        self.scope.prune(addr);
        let packet = WirePacket::Destruct {
            class: self.registry.class_name(addr.class).to_owned(),
            id: addr.id,
        };
        Self::deliver_to(&mut self.transport, player, &packet);
        self.fire_scope_change(addr, player, false);
        true
    }

    fn fire_scope_change(&mut self, addr: InstanceAddr, player: PlayerId, added: bool) {
        let args = [
            Value::Instance(addr),
            Value::Int(player.0 as i64),
            Value::Bool(added),
        ];
        self.registry
            .emit(EventTarget::Class(addr.class), events::REPLICATED_PLAYER_CHANGE, &args);
        self.registry
            .emit(EventTarget::Instance(addr), events::REPLICATED_PLAYER_CHANGE, &args);
    }

    /// Current synced-value snapshot as a construct packet.
    fn construct_packet(&self, addr: InstanceAddr) -> (WirePacket, Vec<(String, WireValue)>) {
        let mut values = Vec::new();
        for (key, value) in self.registry.values_snapshot(addr, true) {
            match codec::encode(&self.registry, &value) {
                Ok(wire) => values.push((key, wire)),
                Err(err) => warn!("synced value `{}` on {:?} not encodable: {}", key, addr, err),
            }
        }
        let packet = WirePacket::Construct {
            class: self.registry.class_name(addr.class).to_owned(),
            id: addr.id,
            values: values.clone(),
        };
        (packet, values)
    }

    fn deliver_to(transport: &mut T, player: PlayerId, packet: &WirePacket) {
        match packet.to_bytes() {
            Ok(bytes) => transport.send_to(player, packet.channel(), &bytes),
            Err(err) => warn!("packet encode failed: {}", err),
        }
    }

    fn deliver_all(transport: &mut T, packet: &WirePacket) {
        match packet.to_bytes() {
            Ok(bytes) => transport.broadcast(packet.channel(), &bytes),
            Err(err) => warn!("packet encode failed: {}", err),
        }
    }
}

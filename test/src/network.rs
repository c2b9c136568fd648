//! In-memory loopback transport pair.
//!
//! Packets are decoded back to [`WirePacket`] at the send boundary and held
//! in per-destination mailboxes; tests drain the mailboxes themselves, which
//! also lets them reorder deliveries to reproduce cross-channel races.

use std::{cell::RefCell, collections::HashMap, collections::VecDeque, rc::Rc};

use mimic_client::ReplicationClient;
use mimic_server::ReplicationServer;
use mimic_shared::{Channel, ClientTransport, PlayerId, ServerTransport, WirePacket};

#[derive(Default)]
struct NetworkInner {
    to_server: VecDeque<(PlayerId, WirePacket)>,
    to_clients: HashMap<PlayerId, VecDeque<WirePacket>>,
    /// Broadcast reaches every registered client mailbox
    registered: Vec<PlayerId>,
}

/// One in-process "wire". Clone handles into the transports it hands out.
#[derive(Clone, Default)]
pub struct Network {
    inner: Rc<RefCell<NetworkInner>>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server_side(&self) -> ServerSide {
        ServerSide {
            inner: self.inner.clone(),
        }
    }

    /// Registers the player's mailbox and returns their transport handle.
    pub fn client_side(&self, player: PlayerId) -> ClientSide {
        let mut inner = self.inner.borrow_mut();
        inner.to_clients.entry(player).or_default();
        if !inner.registered.contains(&player) {
            inner.registered.push(player);
        }
        ClientSide {
            player,
            inner: self.inner.clone(),
        }
    }

    pub fn pop_to_server(&self) -> Option<(PlayerId, WirePacket)> {
        self.inner.borrow_mut().to_server.pop_front()
    }

    pub fn pop_to_client(&self, player: PlayerId) -> Option<WirePacket> {
        self.inner
            .borrow_mut()
            .to_clients
            .get_mut(&player)
            .and_then(VecDeque::pop_front)
    }

    /// Everything currently queued for the player, leaving the mailbox
    /// empty. Tests use this to replay deliveries in a chosen order.
    pub fn take_all_for(&self, player: PlayerId) -> Vec<WirePacket> {
        self.inner
            .borrow_mut()
            .to_clients
            .get_mut(&player)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn pending_for(&self, player: PlayerId) -> usize {
        self.inner
            .borrow()
            .to_clients
            .get(&player)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Delivers every queued server→client packet for the player.
    pub fn drain_to_client(&self, player: PlayerId, client: &mut ReplicationClient<ClientSide>) {
        while let Some(packet) = self.pop_to_client(player) {
            client.handle_packet(packet);
        }
    }

    /// Delivers every queued client→server packet.
    pub fn drain_to_server(&self, server: &mut ReplicationServer<ServerSide>) {
        while let Some((from, packet)) = self.pop_to_server() {
            server.handle_packet(from, packet);
        }
    }
}

pub struct ServerSide {
    inner: Rc<RefCell<NetworkInner>>,
}

impl ServerTransport for ServerSide {
    fn send_to(&mut self, player: PlayerId, _channel: Channel, payload: &[u8]) {
        let packet = WirePacket::from_bytes(payload).expect("loopback packet decodes");
        let mut inner = self.inner.borrow_mut();
        inner.to_clients.entry(player).or_default().push_back(packet);
    }

    fn broadcast(&mut self, _channel: Channel, payload: &[u8]) {
        let packet = WirePacket::from_bytes(payload).expect("loopback packet decodes");
        let mut inner = self.inner.borrow_mut();
        let players = inner.registered.clone();
        for player in players {
            inner
                .to_clients
                .entry(player)
                .or_default()
                .push_back(packet.clone());
        }
    }
}

pub struct ClientSide {
    player: PlayerId,
    inner: Rc<RefCell<NetworkInner>>,
}

impl ClientTransport for ClientSide {
    fn send(&mut self, _channel: Channel, payload: &[u8]) {
        let packet = WirePacket::from_bytes(payload).expect("loopback packet decodes");
        self.inner
            .borrow_mut()
            .to_server
            .push_back((self.player, packet));
    }
}

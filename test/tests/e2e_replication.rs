//! Full construct/value/destroy sync across a server and two clients.

use mimic_client::ReplicationClient;
use mimic_server::{ReplicationServer, ScopeTarget};
use mimic_shared::{PlayerId, Value};
use mimic_test::{register_protocol, ClientSide, Network, Protocol, ServerSide};

const A: PlayerId = PlayerId(1);
const B: PlayerId = PlayerId(2);

struct World {
    net: Network,
    server: ReplicationServer<ServerSide>,
    proto: Protocol,
}

impl World {
    fn new() -> Self {
        let net = Network::new();
        let mut server = ReplicationServer::new(net.server_side());
        let proto = register_protocol(server.registry_mut());
        Self { net, server, proto }
    }

    fn join(&mut self, player: PlayerId) -> ReplicationClient<ClientSide> {
        let mut client = ReplicationClient::new(self.net.client_side(player));
        register_protocol(client.registry_mut());
        self.server.player_connected(player);
        self.server.player_ready(player);
        client
    }
}

#[test]
fn replicated_spawn_reaches_every_client() {
    let mut world = World::new();
    let mut alice = world.join(A);
    let mut bob = world.join(B);

    let hero = world.server.spawn(world.proto.person, &[]).unwrap();
    world
        .server
        .set_value(hero, "hp", Value::Int(100), true)
        .unwrap();

    world.net.drain_to_client(A, &mut alice);
    world.net.drain_to_client(B, &mut bob);

    for client in [&alice, &bob] {
        let mirror = client
            .registry()
            .instance_by_id(world.proto.person, hero.id)
            .expect("mirror exists");
        assert_eq!(client.registry().get_value(mirror, "hp", None), Value::Int(100));
    }
}

#[test]
fn late_joiner_receives_the_existing_world() {
    let mut world = World::new();

    let hero = world.server.spawn(world.proto.person, &[]).unwrap();
    world
        .server
        .set_value(hero, "hp", Value::Int(80), true)
        .unwrap();

    // the player connects only after construction; no script action needed
    let mut late = world.join(B);
    world.net.drain_to_client(B, &mut late);

    let mirror = late
        .registry()
        .instance_by_id(world.proto.person, hero.id)
        .expect("late join construct-sync");
    assert_eq!(late.registry().get_value(mirror, "hp", None), Value::Int(80));
}

#[test]
fn value_changes_flow_to_current_observers_only() {
    let mut world = World::new();
    let mut alice = world.join(A);
    let mut bob = world.join(B);

    let chest = world.server.spawn(world.proto.prop, &[]).unwrap();
    world
        .server
        .add_replicated_player(chest, ScopeTarget::Player(A))
        .unwrap();
    world
        .server
        .set_value(chest, "gold", Value::Int(30), true)
        .unwrap();

    world.net.drain_to_client(A, &mut alice);
    world.net.drain_to_client(B, &mut bob);

    let mirror = alice
        .registry()
        .instance_by_id(world.proto.prop, chest.id)
        .expect("observer has the mirror");
    assert_eq!(alice.registry().get_value(mirror, "gold", None), Value::Int(30));
    assert!(bob
        .registry()
        .instance_by_id(world.proto.prop, chest.id)
        .is_none());
}

#[test]
fn destroy_propagates_to_mirrors() {
    let mut world = World::new();
    let mut alice = world.join(A);

    let hero = world.server.spawn(world.proto.person, &[]).unwrap();
    world.net.drain_to_client(A, &mut alice);
    assert!(alice
        .registry()
        .instance_by_id(world.proto.person, hero.id)
        .is_some());

    world.server.destroy(hero, &[]).unwrap();
    world.net.drain_to_client(A, &mut alice);
    assert!(alice
        .registry()
        .instance_by_id(world.proto.person, hero.id)
        .is_none());
    assert_eq!(alice.registry().count(world.proto.person), 0);
}

#[test]
fn replicated_singleton_mirrors_under_the_server_identity() {
    let mut world = World::new();
    let mut alice = world.join(A);

    let session = world.server.spawn(world.proto.session, &[]).unwrap();
    world
        .server
        .set_value(session, "round", Value::Int(1), true)
        .unwrap();
    world.net.drain_to_client(A, &mut alice);

    let mirror = alice
        .registry()
        .instance_by_id(world.proto.session, session.id)
        .expect("session mirror");
    // the mirror claimed the singleton slot: local construction yields it
    let again = alice
        .registry_mut()
        .new_instance(world.proto.session, &[])
        .unwrap();
    assert_eq!(again, mirror);
    assert_eq!(alice.registry().get_value(mirror, "round", None), Value::Int(1));
}

#[test]
fn client_local_instances_never_cross_the_wire() {
    let mut world = World::new();
    let mut alice = world.join(A);

    let panel = alice
        .registry_mut()
        .new_instance(world.proto.hud_panel, &[])
        .unwrap();
    assert!(panel.id < 0);
    alice.flush();

    world.net.drain_to_server(&mut world.server);
    assert_eq!(world.server.registry().count(world.proto.hud_panel), 0);
}

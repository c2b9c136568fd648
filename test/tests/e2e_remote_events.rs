//! Remote events end to end, including the arrival race the deferred
//! buffer exists for.

use std::{cell::RefCell, rc::Rc};

use mimic_client::ReplicationClient;
use mimic_server::ReplicationServer;
use mimic_shared::{
    EventTarget, HookOutcome, PlayerId, RemoteTargets, ScriptFn, Value, WirePacket,
};
use mimic_test::{register_protocol, ClientSide, Network, Protocol, ServerSide};

const A: PlayerId = PlayerId(1);

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

fn record_remote(
    client: &mut ReplicationClient<ClientSide>,
    class: mimic_shared::ClassId,
    event: &str,
) -> Rc<RefCell<Vec<Vec<Value>>>> {
    let log: Rc<RefCell<Vec<Vec<Value>>>> = Default::default();
    let log_in = log.clone();
    client.registry_mut().subscribe_remote(
        EventTarget::Class(class),
        event,
        ScriptFn::new(move |_, args| {
            log_in.borrow_mut().push(args.to_vec());
            HookOutcome::Pass
        }),
    );
    log
}

#[test]
fn event_delivered_before_its_construct_replays_exactly_once_in_order() {
    let mut world = World::new();
    let mut alice = world.join(A);
    let log = record_remote(&mut alice, world.proto.person, "Wave");

    let hero = world.server.spawn(world.proto.person, &[]).unwrap();
    world
        .server
        .send_event(hero, "Wave", &[Value::Int(1), Value::Int(2)], RemoteTargets::All)
        .unwrap();

    // the construct and the event are independent messages; deliver the
    // event first to reproduce the cross-channel race
    let mut pending = world.net.take_all_for(A);
    assert_eq!(pending.len(), 2);
    pending.sort_by_key(|packet| match packet {
        WirePacket::EventToClient { .. } => 0,
        _ => 1,
    });
    for packet in pending {
        alice.handle_packet(packet);
    }

    let mirror = alice
        .registry()
        .instance_by_id(world.proto.person, hero.id)
        .expect("mirror spawned");
    {
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(
            log[0],
            vec![Value::Instance(mirror), Value::Int(1), Value::Int(2)]
        );
    }

    // nothing replays a second time once the buffer has drained
    world.server.destroy(hero, &[]).unwrap();
    world.net.drain_to_client(A, &mut alice);
    world.server.spawn(world.proto.person, &[]).unwrap();
    world.net.drain_to_client(A, &mut alice);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn client_event_reaches_the_server_and_gets_a_targeted_reply() {
    let mut world = World::new();
    let mut alice = world.join(A);

    let hero = world.server.spawn(world.proto.person, &[]).unwrap();
    world.net.drain_to_client(A, &mut alice);
    let mirror = alice
        .registry()
        .instance_by_id(world.proto.person, hero.id)
        .unwrap();

    // server: greet back whoever waves
    let greeted: Rc<RefCell<Vec<i64>>> = Default::default();
    let greeted_in = greeted.clone();
    world.server.registry_mut().subscribe_remote(
        EventTarget::Class(world.proto.person),
        "Wave",
        ScriptFn::new(move |registry, args| {
            let addr = args[0].as_instance().unwrap();
            let from = args[1].as_int().unwrap();
            greeted_in.borrow_mut().push(from);
            registry
                .queue_remote_event(
                    addr,
                    "Greet",
                    &[Value::str("hello")],
                    RemoteTargets::Player(PlayerId(from as u64)),
                )
                .unwrap();
            HookOutcome::Pass
        }),
    );

    let replies = record_remote(&mut alice, world.proto.person, "Greet");
    alice
        .send_event(mirror, "Wave", &[Value::Int(A.0 as i64)])
        .unwrap();

    world.net.drain_to_server(&mut world.server);
    assert_eq!(greeted.borrow().as_slice(), [1]);

    world.net.drain_to_client(A, &mut alice);
    let replies = replies.borrow();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0], vec![Value::Instance(mirror), Value::str("hello")]);
}

#[test]
fn events_between_live_instances_round_trip_with_instance_handles() {
    let mut world = World::new();
    let mut alice = world.join(A);

    let hero = world.server.spawn(world.proto.person, &[]).unwrap();
    let sidekick = world.server.spawn(world.proto.person, &[]).unwrap();
    world.net.drain_to_client(A, &mut alice);

    let log = record_remote(&mut alice, world.proto.person, "Follow");
    world
        .server
        .send_event(
            hero,
            "Follow",
            &[Value::Instance(sidekick)],
            RemoteTargets::All,
        )
        .unwrap();
    world.net.drain_to_client(A, &mut alice);

    let hero_mirror = alice
        .registry()
        .instance_by_id(world.proto.person, hero.id)
        .unwrap();
    let sidekick_mirror = alice
        .registry()
        .instance_by_id(world.proto.person, sidekick.id)
        .unwrap();
    assert_eq!(
        log.borrow().as_slice(),
        [vec![
            Value::Instance(hero_mirror),
            Value::Instance(sidekick_mirror)
        ]]
    );
}

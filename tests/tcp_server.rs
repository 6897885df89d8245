mod harness;

use harness::{script_listener, script_port, BenchDevice, Counters, ListenerHandle};
use pollbus::prelude::*;

fn tcp_server_over(
    device: BenchDevice,
) -> (
    TcpServer<BenchDevice, harness::ListenerScript>,
    ListenerHandle,
) {
    let (listener, handle) = script_listener();
    let server = TcpServer::new(device.wrap(), listener);
    (server, handle)
}

#[test]
fn defaults() {
    let (server, _) = tcp_server_over(BenchDevice::default());
    assert_eq!(server.port(), 502);
    assert_eq!(server.timeout(), 3000);
    assert_eq!(server.max_connections(), 10);
    assert!(server.is_broadcast_enabled());
    assert!(server.unit_map().is_none());
    assert_eq!(server.protocol_type(), ProtocolType::Tcp);
    assert!(!server.is_open());
}

#[test]
fn setters_round_trip() {
    let (mut server, _) = tcp_server_over(BenchDevice::default());
    server.set_ipaddr("192.168.1.100");
    server.set_port(5025);
    server.set_timeout(20000);
    server.set_max_connections(25);
    server.set_object_name("bench");
    assert_eq!(server.ipaddr(), "192.168.1.100");
    assert_eq!(server.port(), 5025);
    assert_eq!(server.timeout(), 20000);
    assert_eq!(server.max_connections(), 25);
    assert_eq!(server.object_name(), "bench");
}

#[test]
fn zero_max_connections_is_coerced_to_one() {
    let (mut server, _) = tcp_server_over(BenchDevice::default());
    server.set_max_connections(0);
    assert_eq!(server.max_connections(), 1);
}

#[test]
fn listens_on_the_configured_endpoint() {
    let (mut server, listener) = tcp_server_over(BenchDevice::default());
    server.set_ipaddr("127.0.0.1");
    server.set_port(1502);

    assert_eq!(server.process(), StatusCode::Good);
    assert!(server.is_open());
    assert_eq!(
        listener.opened_endpoint(),
        Some((String::from("127.0.0.1"), 1502))
    );
}

#[test]
fn listen_failure_is_reported() {
    let (mut server, listener) = tcp_server_over(BenchDevice::default());
    listener.push_open(StatusCode::BadSerialOpen);

    let result = server.process();

    assert_eq!(result, StatusCode::BadSerialOpen);
    assert_eq!(server.last_error_status(), StatusCode::BadSerialOpen);
    assert!(!server.is_open());
}

#[test]
fn serves_a_connection_and_bubbles_its_signals() {
    let (mut server, listener) = tcp_server_over(BenchDevice {
        holding: vec![0x1234, 0x5678],
        ..BenchDevice::default()
    });
    let counters = Counters::connect_tcp(server.events());

    let (child_port, child) = script_port();
    listener.push_connection(Box::new(child_port), "10.0.0.5:1421");
    child.expect_request(1, function::READ_HOLDING_REGISTERS, &[0x00, 0x00, 0x00, 0x02]);

    let result = server.process();

    assert!(result.is_good());
    assert_eq!(server.connection_count(), 1);
    assert_eq!(counters.opened.get(), 1);
    assert_eq!(counters.new_connection.get(), 1);
    // the child's traffic is re-emitted on the shell, its own opened is not
    assert_eq!(counters.rx.get(), 1);
    assert_eq!(counters.tx.get(), 1);
    assert_eq!(counters.completed.get(), 1);
    assert_eq!(counters.error.get(), 0);
    assert_eq!(
        child.last_write(),
        Some((
            1,
            function::READ_HOLDING_REGISTERS,
            vec![0x04, 0x12, 0x34, 0x56, 0x78]
        ))
    );
}

#[test]
fn child_errors_bubble_and_keep_the_connection() {
    let (mut server, listener) = tcp_server_over(BenchDevice::default());
    let counters = Counters::connect_tcp(server.events());

    let (child_port, child) = script_port();
    listener.push_connection(Box::new(child_port), "10.0.0.5:1421");
    child.push_read(StatusCode::Bad);

    server.process();

    assert_eq!(counters.error.get(), 1);
    assert_eq!(counters.completed.get(), 1);
    assert_eq!(counters.close_connection.get(), 0);
    assert_eq!(server.connection_count(), 1);
}

#[test]
fn dropped_link_reaps_the_connection() {
    let (mut server, listener) = tcp_server_over(BenchDevice::default());
    let counters = Counters::connect_tcp(server.events());

    let (child_port, child) = script_port();
    listener.push_connection(Box::new(child_port), "10.0.0.5:1421");

    server.process();
    assert_eq!(server.connection_count(), 1);
    assert_eq!(counters.new_connection.get(), 1);

    child.set_open(false);
    server.process();

    assert_eq!(counters.close_connection.get(), 1);
    assert_eq!(server.connection_count(), 0);
    // the child's terminal completed bubbled before it was dropped
    assert_eq!(counters.completed.get(), 1);
    // parent closed is reserved for the shell itself
    assert_eq!(counters.closed.get(), 0);
}

#[test]
fn connections_over_the_limit_are_dropped() {
    let (mut server, listener) = tcp_server_over(BenchDevice::default());
    let counters = Counters::connect_tcp(server.events());
    server.set_max_connections(1);

    let (first, _first_handle) = script_port();
    let (second, _second_handle) = script_port();
    listener.push_connection(Box::new(first), "10.0.0.5:1421");
    listener.push_connection(Box::new(second), "10.0.0.6:1422");

    server.process();

    assert_eq!(counters.new_connection.get(), 1);
    assert_eq!(server.connection_count(), 1);
}

#[test]
fn close_drains_children_then_reports_closed() {
    let (mut server, listener) = tcp_server_over(BenchDevice::default());
    let counters = Counters::connect_tcp(server.events());

    let (child_port, _child) = script_port();
    listener.push_connection(Box::new(child_port), "10.0.0.5:1421");
    server.process();
    assert_eq!(server.connection_count(), 1);

    server.close();
    let result = server.process();

    assert_eq!(result, StatusCode::Good);
    assert_eq!(counters.close_connection.get(), 1);
    assert_eq!(counters.closed.get(), 1);
    assert_eq!(server.connection_count(), 0);
    assert!(!server.is_open());

    // closing again is inert
    assert_eq!(server.process(), StatusCode::Good);
    assert_eq!(counters.closed.get(), 1);
}

#[test]
fn children_inherit_the_server_settings() {
    let (mut server, listener) = tcp_server_over(BenchDevice {
        holding: vec![0x0001],
        ..BenchDevice::default()
    });
    let counters = Counters::connect_tcp(server.events());
    server.set_unit_map_string("5");
    assert_eq!(server.unit_map_string(), "5");

    let (child_port, child) = script_port();
    listener.push_connection(Box::new(child_port), "10.0.0.5:1421");
    // unit 9 is filtered out by the inherited map
    child.expect_request(9, function::READ_HOLDING_REGISTERS, &[0x00, 0x00, 0x00, 0x01]);

    server.process();
    assert_eq!(counters.completed.get(), 0);
    assert!(child.writes().is_empty());

    // unit 5 is served
    child.expect_request(5, function::READ_HOLDING_REGISTERS, &[0x00, 0x00, 0x00, 0x01]);
    server.process();
    assert_eq!(counters.completed.get(), 1);
    assert_eq!(
        child.last_write(),
        Some((5, function::READ_HOLDING_REGISTERS, vec![0x02, 0x00, 0x01]))
    );
}

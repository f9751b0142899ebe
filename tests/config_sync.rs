//! End-to-end tests for the inbound control server and the analyzer
//! resend sequence, against a loopback mock acquisition server.

use emgbridge::analyzer::AnalyzerDescriptor;
use emgbridge::config::AppConfig;
use emgbridge::link::CommandLink;
use emgbridge::osc::{ControlServer, TelemetrySender};
use emgbridge::session::{Session, TuningState};
use rosc::{OscMessage, OscPacket, OscType};
use serde_json::Value;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn ok_response() -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[..4].copy_from_slice(&1u32.to_le_bytes());
    bytes[4..12].copy_from_slice(&1_700_000_000_000u64.to_le_bytes());
    bytes[12..].copy_from_slice(&1u32.to_le_bytes());
    bytes
}

fn loopback_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (server, _) = listener.accept().unwrap();
    (client, server)
}

fn make_session(cmd: TcpStream, rsp: TcpStream) -> Arc<Session> {
    let settings = AppConfig::default().analyzer;
    let tuning = TuningState {
        selection: Vec::new(),
        left: AnalyzerDescriptor::foot_cycle("foot_cycle_left", &settings, 13, 5.0),
        right: AnalyzerDescriptor::foot_cycle("foot_cycle_right", &settings, 14, 5.0),
    };
    // discard port; telemetry is not under test here
    let telemetry = TelemetrySender::new("127.0.0.1:9").unwrap();
    Arc::new(Session::new(
        CommandLink::new(cmd, rsp),
        tuning,
        telemetry,
        10000.0,
        1024,
    ))
}

fn send_osc(socket: &UdpSocket, target: SocketAddr, addr: &str, args: Vec<OscType>) {
    let packet = OscPacket::Message(OscMessage {
        addr: addr.to_string(),
        args,
    });
    let bytes = rosc::encoder::encode(&packet).unwrap();
    socket.send_to(&bytes, target).unwrap();
}

fn read_command(stream: &mut TcpStream) -> u32 {
    let mut packet = [0u8; 8];
    stream.read_exact(&mut packet).unwrap();
    let mut version = [0u8; 4];
    version.copy_from_slice(&packet[..4]);
    assert_eq!(u32::from_le_bytes(version), 1);
    let mut code = [0u8; 4];
    code.copy_from_slice(&packet[4..]);
    u32::from_le_bytes(code)
}

fn read_extra_data(stream: &mut TcpStream) -> Value {
    let mut header = [0u8; 8];
    stream.read_exact(&mut header).unwrap();
    let mut length = [0u8; 4];
    length.copy_from_slice(&header[4..8]);
    let mut body = vec![0u8; u32::from_le_bytes(length) as usize];
    stream.read_exact(&mut body).unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Serve one remove/name/add/full exchange, acknowledging each step OK.
fn serve_resend_sequence(cmd: &mut TcpStream, rsp: &mut TcpStream) -> (u32, Value, u32, Value) {
    let remove = read_command(cmd);
    cmd.write_all(&ok_response()).unwrap();
    let name = read_extra_data(rsp);
    cmd.write_all(&ok_response()).unwrap();
    let add = read_command(cmd);
    cmd.write_all(&ok_response()).unwrap();
    let full = read_extra_data(rsp);
    cmd.write_all(&ok_response()).unwrap();
    (remove, name, add, full)
}

#[test]
fn pair_updates_drive_one_resend_sequence_each() {
    let (cmd_client, mut cmd_server) = loopback_pair();
    let (rsp_client, mut rsp_server) = loopback_pair();
    let session = make_session(cmd_client, rsp_client);

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut server =
        ControlServer::bind("127.0.0.1:0", Arc::clone(&session), Arc::clone(&shutdown)).unwrap();
    let control_addr = server.local_addr().unwrap();
    let control = thread::spawn(move || server.run());

    let mock = thread::spawn(move || {
        let first = serve_resend_sequence(&mut cmd_server, &mut rsp_server);
        let second = serve_resend_sequence(&mut cmd_server, &mut rsp_server);
        (first, second)
    });

    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    send_osc(
        &client,
        control_addr,
        "/analyzer_channels",
        vec![OscType::Int(3), OscType::Int(4)],
    );
    send_osc(
        &client,
        control_addr,
        "/analyzer_thresholds",
        vec![OscType::Float(7.5), OscType::Float(8.5)],
    );

    let (first, second) = mock.join().unwrap();

    // channel update: remove, name-only push, add, full push
    let (remove, name, add, full) = first;
    assert_eq!(remove, 51);
    assert_eq!(name, serde_json::json!({ "analyzer": "foot_cycle_left" }));
    assert_eq!(add, 50);
    assert_eq!(full["events"][0]["start_when"][0]["channel"], 2);
    assert_eq!(full["events"][0]["start_when"][0]["value"], 5.0);

    // threshold update: same sequence, channel retained, new threshold
    let (remove, _, add, full) = second;
    assert_eq!(remove, 51);
    assert_eq!(add, 50);
    assert_eq!(full["events"][0]["start_when"][0]["channel"], 2);
    assert_eq!(full["events"][0]["start_when"][0]["value"], 7.5);

    // both local descriptors reflect the most recent values
    {
        let tuning = session.tuning.lock();
        assert_eq!(tuning.left.events[0].start_when[0].channel, 2);
        assert_eq!(tuning.left.events[0].start_when[0].value, 7.5);
        assert_eq!(tuning.right.events[0].start_when[0].channel, 3);
        assert_eq!(tuning.right.events[0].start_when[0].value, 8.5);
    }

    shutdown.store(true, Ordering::Relaxed);
    control.join().unwrap();
}

#[test]
fn selection_update_replaces_wholesale() {
    let (cmd_client, _cmd_server) = loopback_pair();
    let (rsp_client, _rsp_server) = loopback_pair();
    let session = make_session(cmd_client, rsp_client);

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut server =
        ControlServer::bind("127.0.0.1:0", Arc::clone(&session), Arc::clone(&shutdown)).unwrap();
    let control_addr = server.local_addr().unwrap();
    let control = thread::spawn(move || server.run());

    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    send_osc(
        &client,
        control_addr,
        "/sensors",
        vec![OscType::Int(1), OscType::Int(2), OscType::Int(3)],
    );
    wait_for_selection(&session, &[1, 2, 3]);

    // a malformed argument leaves the selection unchanged
    send_osc(
        &client,
        control_addr,
        "/sensors",
        vec![OscType::Int(9), OscType::String("x".to_string())],
    );
    thread::sleep(Duration::from_millis(300));
    assert_eq!(session.tuning.lock().selection, vec![1, 2, 3]);

    // the next valid update replaces, not merges
    send_osc(&client, control_addr, "/sensors", vec![OscType::Int(5)]);
    wait_for_selection(&session, &[5]);

    shutdown.store(true, Ordering::Relaxed);
    control.join().unwrap();
}

#[test]
fn malformed_pair_update_touches_neither_state_nor_server() {
    let (cmd_client, cmd_server) = loopback_pair();
    let (rsp_client, _rsp_server) = loopback_pair();
    let session = make_session(cmd_client, rsp_client);

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut server =
        ControlServer::bind("127.0.0.1:0", Arc::clone(&session), Arc::clone(&shutdown)).unwrap();
    let control_addr = server.local_addr().unwrap();
    let control = thread::spawn(move || server.run());

    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    // one argument instead of two
    send_osc(
        &client,
        control_addr,
        "/analyzer_channels",
        vec![OscType::Int(3)],
    );

    // no command ever reaches the mock server
    cmd_server
        .set_read_timeout(Some(Duration::from_millis(500)))
        .unwrap();
    let mut probe = cmd_server;
    let mut buf = [0u8; 8];
    assert!(probe.read(&mut buf).is_err());

    // and the descriptors still carry their startup channels (13/14, zero-based)
    {
        let tuning = session.tuning.lock();
        assert_eq!(tuning.left.events[0].start_when[0].channel, 12);
        assert_eq!(tuning.right.events[0].start_when[0].channel, 13);
    }

    shutdown.store(true, Ordering::Relaxed);
    control.join().unwrap();
}

fn wait_for_selection(session: &Arc<Session>, expected: &[u32]) {
    for _ in 0..200 {
        if session.tuning.lock().selection == expected {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("selection never became {:?}", expected);
}

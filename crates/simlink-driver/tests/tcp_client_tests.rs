//! TCP 端到端测试
//!
//! 使用本地回环上的简易仿真端验证连接、遥测接收、指令发送和断开流程。

use simlink_driver::{
    ClientLifecycle, DriverError, PipelineConfig, SimClient, SimClientBuilder, TelemetryPolicy,
};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

/// 本地回环上的仿真端
struct FakeSimulator {
    listener: TcpListener,
}

impl FakeSimulator {
    fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        Self { listener }
    }

    fn port(&self) -> u16 {
        self.listener.local_addr().unwrap().port()
    }

    /// 连接客户端并接受连接（TCP 握手由内核 backlog 完成，不需要先 accept）
    fn connect(&self, policy: TelemetryPolicy) -> (SimClient, TcpStream) {
        let client = SimClientBuilder::new()
            .host("127.0.0.1")
            .port(self.port())
            .pipeline_config(fast_config(policy))
            .build()
            .unwrap();
        let (stream, _) = self.listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        (client, stream)
    }
}

fn fast_config(policy: TelemetryPolicy) -> PipelineConfig {
    PipelineConfig {
        poll_interval_ms: 1,
        receive_timeout_ms: 20,
        telemetry_policy: policy,
        ..Default::default()
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

#[test]
fn test_receive_telemetry_over_tcp() {
    let sim = FakeSimulator::bind();
    let (client, mut stream) = sim.connect(TelemetryPolicy::Lenient);

    stream.write_all(b"S:1.5,2.5,3.5\n").unwrap();

    let snapshot = client.wait_for_telemetry(Duration::from_secs(2)).unwrap();
    assert_eq!(snapshot.values(), &[1.5, 2.5, 3.5]);
    assert!(client.is_connected());
    assert!(client.is_healthy());
}

#[test]
fn test_motor_command_wire_format() {
    let sim = FakeSimulator::bind();
    let (client, stream) = sim.connect(TelemetryPolicy::Lenient);

    client.send_motor_command(1.0, -0.333);
    client.send_motor_command(0.0, 0.5);

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    assert_eq!(line, "L:1.00;R:-0.33\n");

    line.clear();
    reader.read_line(&mut line).unwrap();
    assert_eq!(line, "L:0.00;R:0.50\n");
}

#[test]
fn test_latest_frame_in_chunk_wins() {
    let sim = FakeSimulator::bind();
    let (client, mut stream) = sim.connect(TelemetryPolicy::Lenient);

    stream.write_all(b"S:1,1\nHELLO\nS:2,2,2\n").unwrap();

    assert!(wait_until(Duration::from_secs(2), || {
        client.read_latest_sensors().values() == [2.0, 2.0, 2.0]
    }));
    assert!(client.metrics().rx_frames_ignored >= 1);
}

#[test]
fn test_non_telemetry_frames_do_not_publish() {
    let sim = FakeSimulator::bind();
    let (client, mut stream) = sim.connect(TelemetryPolicy::Lenient);

    stream.write_all(b"READY\n").unwrap();
    assert!(wait_until(Duration::from_secs(2), || {
        client.metrics().rx_frames_ignored == 1
    }));
    assert!(!client.sensor_state().has_telemetry());
}

#[test]
fn test_strict_policy_drops_malformed_frames() {
    let sim = FakeSimulator::bind();
    let (client, mut stream) = sim.connect(TelemetryPolicy::Strict);

    stream.write_all(b"S:1,2\n").unwrap();
    client.wait_for_telemetry(Duration::from_secs(2)).unwrap();

    stream.write_all(b"S:3,garbage\n").unwrap();
    assert!(wait_until(Duration::from_secs(2), || {
        client.metrics().rx_frames_rejected == 1
    }));
    assert_eq!(client.read_latest_sensors().values(), &[1.0, 2.0]);
}

#[test]
fn test_disconnect_closes_socket_and_joins() {
    let sim = FakeSimulator::bind();
    let (client, mut stream) = sim.connect(TelemetryPolicy::Lenient);

    let start = Instant::now();
    client.disconnect();
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(client.lifecycle(), ClientLifecycle::Disconnected);
    assert!(!client.is_healthy());

    // 对端读到 EOF
    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).unwrap(), 0);

    // 重复断开和断开后发送都是空操作
    client.disconnect();
    client.send_motor_command(1.0, 1.0);
    assert!(matches!(
        client.try_send_motor_command(1.0, 1.0),
        Err(DriverError::NotConnected)
    ));
}

#[test]
fn test_drop_disconnects() {
    let sim = FakeSimulator::bind();
    let (client, mut stream) = sim.connect(TelemetryPolicy::Lenient);

    drop(client);

    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).unwrap(), 0);
}

#[test]
fn test_simulator_hang_up_stops_receive_thread() {
    let sim = FakeSimulator::bind();
    let (client, mut stream) = sim.connect(TelemetryPolicy::Lenient);

    stream.write_all(b"S:7,8\n").unwrap();
    client.wait_for_telemetry(Duration::from_secs(2)).unwrap();
    drop(stream);

    assert!(wait_until(Duration::from_secs(2), || !client.is_running()));
    assert_eq!(client.read_latest_sensors().values(), &[7.0, 8.0]);

    client.disconnect();
    assert_eq!(client.lifecycle(), ClientLifecycle::Disconnected);
}

#[test]
fn test_connect_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = SimClient::connect("127.0.0.1", port);
    match result {
        Err(DriverError::Connect { addr, .. }) => {
            assert_eq!(addr, format!("127.0.0.1:{}", port));
        },
        other => panic!("expected connect error, got {:?}", other),
    }
}

#[test]
fn test_independent_clients() {
    let sim = FakeSimulator::bind();
    let (first, mut first_stream) = sim.connect(TelemetryPolicy::Lenient);
    let (second, mut second_stream) = sim.connect(TelemetryPolicy::Lenient);

    first_stream.write_all(b"S:1\n").unwrap();
    second_stream.write_all(b"S:2\n").unwrap();

    assert_eq!(first.wait_for_telemetry(Duration::from_secs(2)).unwrap().values(), &[1.0]);
    assert_eq!(second.wait_for_telemetry(Duration::from_secs(2)).unwrap().values(), &[2.0]);

    first.disconnect();

    second_stream.write_all(b"S:3\n").unwrap();
    assert!(wait_until(Duration::from_secs(2), || {
        second.read_latest_sensors().values() == [3.0]
    }));
    assert!(second.is_running());
}

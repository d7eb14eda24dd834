use std::net::IpAddr;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

use super::*;
use crate::client::TimeSource;
use crate::delivery::FrameDelivery;
use crate::protocol::distribution::DistributionFrame;
use crate::protocol::ntp::{MODE_SERVER, NtpPacket, NtpTimestamp};
use crate::types::SyncStatus;

fn frame() -> DistributionFrame {
    let dt = NaiveDate::from_ymd_opt(2025, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    DistributionFrame::from_datetime(dt).unwrap()
}

#[tokio::test]
async fn test_mock_ntp_server_replies() {
    init_logging();
    let mut server = MockNtpServer::new(MockNtpServerConfig {
        offset: 10.0,
        ..MockNtpServerConfig::default()
    });
    let addr = server.start().await.unwrap();
    assert_eq!(server.address(), Some(addr));

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mut request = NtpPacket::client_request(4);
    request.transmit = NtpTimestamp::new(3_900_000_000, 42);
    client
        .send_to(&request.encode().unwrap(), addr)
        .await
        .unwrap();

    let mut buf = [0u8; 128];
    let (len, from) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(from, addr);

    let reply = NtpPacket::decode(&buf[..len]).unwrap();
    assert_eq!(reply.mode, MODE_SERVER);
    assert_eq!(reply.version, 4);
    assert_eq!(reply.originate, request.transmit);

    let skew = reply.transmit.diff_secs(&NtpTimestamp::now());
    assert!((skew - 10.0).abs() < 1.0, "skew {skew}");

    assert_eq!(server.requests().await, vec![request]);
    server.stop().await;
}

#[tokio::test]
async fn test_mock_ntp_server_silent() {
    let mut server = MockNtpServer::new(MockNtpServerConfig {
        silent: true,
        ..MockNtpServerConfig::default()
    });
    let addr = server.start().await.unwrap();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(&NtpPacket::client_request(3).encode().unwrap(), addr)
        .await
        .unwrap();

    let mut buf = [0u8; 128];
    let result =
        tokio::time::timeout(Duration::from_millis(200), client.recv_from(&mut buf)).await;
    assert!(result.is_err());
    assert_eq!(server.request_count().await, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_mock_device_records_frames() {
    let mut device = MockDevice::new(MockDeviceConfig::default());
    let addr = device.start().await.unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(frame().as_bytes()).await.unwrap();
    let mut ack = Vec::new();
    stream.read_to_end(&mut ack).await.unwrap();

    assert_eq!(ack, b"OK");
    assert!(device.wait_for_frames(1, Duration::from_secs(1)).await);
    assert_eq!(device.frames().await, vec![frame()]);
    assert_eq!(device.raw_frames().await, vec![frame().as_bytes().to_vec()]);

    device.stop().await;
}

#[tokio::test]
async fn test_mock_device_keeps_invalid_payloads() {
    let mut device = MockDevice::new(MockDeviceConfig::default());
    let addr = device.start().await.unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&[0u8; 39]).await.unwrap();
    let mut ack = Vec::new();
    stream.read_to_end(&mut ack).await.unwrap();

    assert!(device.frames().await.is_empty());
    assert_eq!(device.raw_frames().await.len(), 1);
    assert!(!device.wait_for_frames(1, Duration::from_millis(50)).await);

    device.stop().await;
}

#[tokio::test]
async fn test_scripted_time_source_plays_script() {
    let transmit = NtpTimestamp::new(3_913_056_000, 0);
    let source = ScriptedTimeSource::new(
        [ScriptedReply::Fail, ScriptedReply::Respond(exchange_at(transmit))],
        ScriptedReply::Fail,
    );

    assert!(source.query("a").await.is_err());
    assert_eq!(source.query("a").await.unwrap().transmit, transmit);
    assert!(source.query("a").await.is_err());
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn test_scripted_time_source_hangs() {
    let source = ScriptedTimeSource::always(ScriptedReply::Hang);
    let result = tokio::time::timeout(Duration::from_millis(50), source.query("a")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_recording_delivery_outcomes() {
    let down: IpAddr = "10.0.0.2".parse().unwrap();
    let up: IpAddr = "10.0.0.1".parse().unwrap();
    let delivery = RecordingDelivery::new().with_outcome(down, SyncStatus::NotConnected);

    assert_eq!(delivery.deliver(up, &frame()).await, SyncStatus::Synchronized);
    assert_eq!(
        delivery.deliver(down, &frame()).await,
        SyncStatus::NotConnected
    );

    let deliveries = delivery.deliveries().await;
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0].0, up);
    assert_eq!(deliveries[1].1.as_ref(), frame().as_bytes());
    assert_eq!(delivery.peak_in_flight(), 1);
}

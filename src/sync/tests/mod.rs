use std::net::IpAddr;
use std::time::Duration;

use tokio::sync::broadcast;

use super::SyncEvent;
use crate::protocol::ntp::NtpTimestamp;
use crate::types::{CalendarZone, DeviceRoster, SyncConfig};

mod controller;

/// 2024-01-01T00:00:00Z on the NTP timescale
const TRANSMIT: NtpTimestamp = NtpTimestamp::new(3_913_056_000, 0);
/// `TRANSMIT` in Unix seconds
const TRANSMIT_UNIX: i64 = 1_704_067_200;

const WAIT: Duration = Duration::from_secs(5);

fn ip(addr: &str) -> IpAddr {
    addr.parse().unwrap()
}

fn roster(count: u8) -> DeviceRoster {
    (1..=count).map(|i| ip(&format!("10.0.0.{i}"))).collect()
}

fn config(devices: u8, interval: Duration) -> SyncConfig {
    SyncConfig::builder()
        .server("upstream.test")
        .interval(interval)
        .calendar(CalendarZone::Utc)
        .delivery_timeout(Duration::from_secs(1))
        .roster(roster(devices))
        .build()
}

/// Receive events until one matches, panicking after `timeout`
async fn wait_for<F>(
    events: &mut broadcast::Receiver<SyncEvent>,
    timeout: Duration,
    mut pred: F,
) -> SyncEvent
where
    F: FnMut(&SyncEvent) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

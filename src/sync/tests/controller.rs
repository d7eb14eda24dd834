use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::error::SyncError;
use crate::sink::MemoryLogSink;
use crate::sync::SyncController;
use crate::testing::{RecordingDelivery, ScriptedTimeSource, init_logging};
use crate::types::{StartSyncRequest, SyncAck, SyncStatus};

fn controller(devices: u8) -> SyncController {
    init_logging();
    SyncController::new(
        config(devices, Duration::from_secs(60)),
        Arc::new(MemoryLogSink::new()),
    )
    .with_time_source(Arc::new(ScriptedTimeSource::responding_at(TRANSMIT)))
    .with_delivery(Arc::new(RecordingDelivery::new()))
}

#[tokio::test]
async fn test_start_and_stop() {
    let controller = controller(2);
    let mut events = controller.subscribe();
    assert!(!controller.is_running().await);

    let ack = controller
        .start_sync(&StartSyncRequest::new("upstream.test", 1, 0))
        .await
        .unwrap();
    assert_eq!(ack, SyncAck::started());
    assert!(controller.is_running().await);
    assert_eq!(controller.server().await.as_deref(), Some("upstream.test"));

    wait_for(&mut events, WAIT, |e| {
        matches!(e, SyncEvent::Distributed { cycle: 1, .. })
    })
    .await;

    controller.stop_sync().await.unwrap();
    assert!(!controller.is_running().await);
    assert_eq!(controller.server().await, None);

    wait_for(&mut events, WAIT, |e| matches!(e, SyncEvent::Stopped { .. })).await;
    assert_eq!(controller.get_logs().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let controller = controller(1);
    controller
        .start_sync(&StartSyncRequest::new("first.test", 1, 0))
        .await
        .unwrap();

    let result = controller
        .start_sync(&StartSyncRequest::new("second.test", 1, 0))
        .await;
    match result {
        Err(SyncError::AlreadyRunning { server }) => assert_eq!(server, "first.test"),
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }

    controller.stop_sync().await.unwrap();

    // A stopped loop frees the slot
    controller
        .start_sync(&StartSyncRequest::new("second.test", 1, 0))
        .await
        .unwrap();
    assert_eq!(controller.server().await.as_deref(), Some("second.test"));
    controller.stop_sync().await.unwrap();
}

#[tokio::test]
async fn test_idle_controller_errors() {
    let controller = controller(1);

    assert!(matches!(
        controller.stop_sync().await,
        Err(SyncError::NotRunning)
    ));
    assert!(matches!(
        controller.set_bias(5).await,
        Err(SyncError::NotRunning)
    ));
    assert!(controller.get_logs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_start_from_json_payload() {
    let controller = controller(2);
    let mut events = controller.subscribe();

    let ack = controller
        .start_sync_json(br#"{"server": "upstream.test", "sync_time": "1", "bias": "5"}"#)
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_string(&ack).unwrap(),
        r#"{"status":"Synchronization started"}"#
    );

    let mut results = 0;
    while results < 2 {
        wait_for(&mut events, WAIT, |e| {
            matches!(e, SyncEvent::DeviceResult { .. })
        })
        .await;
        results += 1;
    }
    controller.stop_sync().await.unwrap();

    let logs = controller.get_logs().await.unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|r| r.bias == 5));
    assert!(logs.iter().all(|r| r.corrected_time == TRANSMIT_UNIX + 5));
    assert!(logs.iter().all(|r| r.status == SyncStatus::Synchronized));
}

#[tokio::test]
async fn test_rejected_payloads_start_nothing() {
    let controller = controller(1);

    let result = controller.start_sync_json(b"{not json").await;
    assert!(matches!(result, Err(SyncError::InvalidRequest(_))));

    let result = controller
        .start_sync_json(br#"{"server": "upstream.test", "sync_time": 0, "bias": 0}"#)
        .await;
    assert!(matches!(result, Err(SyncError::InvalidConfig { .. })));

    let result = controller
        .start_sync(&StartSyncRequest::new("", 1, 0))
        .await;
    assert!(matches!(result, Err(SyncError::InvalidConfig { .. })));

    assert!(!controller.is_running().await);
}

#[tokio::test(start_paused = true)]
async fn test_set_bias_reaches_running_loop() {
    let controller = controller(1);
    let mut events = controller.subscribe();
    // Interval is a whole minute; paused time skips the sleeps
    let patience = Duration::from_secs(600);

    controller
        .start_sync(&StartSyncRequest::new("upstream.test", 1, 0))
        .await
        .unwrap();
    wait_for(&mut events, patience, |e| {
        matches!(e, SyncEvent::Distributed { cycle: 1, .. })
    })
    .await;

    controller.set_bias(-60).await.unwrap();

    let updated = wait_for(&mut events, patience, |e| {
        matches!(e, SyncEvent::BiasUpdated { .. })
    })
    .await;
    assert_eq!(
        updated,
        SyncEvent::BiasUpdated {
            previous: 0,
            bias: -60
        }
    );

    wait_for(&mut events, patience, |e| {
        matches!(e, SyncEvent::Distributed { corrected, .. } if corrected.as_secs() == TRANSMIT_UNIX - 60)
    })
    .await;

    controller.stop_sync().await.unwrap();

    let logs = controller.get_logs().await.unwrap();
    assert!(logs.iter().any(|r| r.bias == -60 && r.corrected_time == TRANSMIT_UNIX - 60));
}

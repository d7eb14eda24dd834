//! Run the synchronization loop until Ctrl-C
//!
//! ```text
//! cargo run --example sync_ntds -- <server> <minutes> <bias> [device ...]
//! ```
//!
//! Devices come from the command line, else from the file named by
//! `NTD_ROSTER` (one address per line), else the deployed roster. Attempts
//! are appended to `ntd-sync.jsonl` in the working directory.

use std::sync::Arc;

use ntdsync::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let server = args.next().unwrap_or_else(|| "pool.ntp.org".to_string());
    let minutes: i64 = args.next().map_or(Ok(1), |s| s.parse())?;
    let bias: i64 = args.next().map_or(Ok(0), |s| s.parse())?;
    let devices: Vec<String> = args.collect();

    let roster = if !devices.is_empty() {
        DeviceRoster::parse(devices.iter().map(String::as_str))?
    } else if let Ok(path) = std::env::var("NTD_ROSTER") {
        DeviceRoster::load(path).await?
    } else {
        DeviceRoster::deployed()
    };

    let base = SyncConfig::builder().roster(roster).build();
    let sink = Arc::new(JsonLinesLogSink::new("ntd-sync.jsonl").await?);
    let controller = SyncController::new(base, sink);

    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let SyncEvent::DeviceResult { ip, status, .. } = event {
                println!("{ip:<16} {status}");
            }
        }
    });

    let ack = controller
        .start_sync(&StartSyncRequest::new(server, minutes, bias))
        .await?;
    println!("{}", ack.status);

    tokio::signal::ctrl_c().await?;
    controller.stop_sync().await?;

    let logs = controller.get_logs().await?;
    let synchronized = logs.iter().filter(|r| r.status.is_synchronized()).count();
    println!("{synchronized}/{} attempts synchronized", logs.len());
    Ok(())
}

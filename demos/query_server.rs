//! Query an NTP server once and print the exchange
//!
//! ```text
//! cargo run --example query_server -- pool.ntp.org
//! ```

use std::time::Duration;

use ntdsync::protocol::ntp::{DEFAULT_VERSION, NTP_PORT};
use ntdsync::{CalendarZone, CorrectedTimestamp, client};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let server = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "pool.ntp.org".to_string());

    println!("Querying {server}...");
    let result = client::request(&server, DEFAULT_VERSION, NTP_PORT, Duration::from_secs(5)).await?;

    println!("  stratum:   {}", result.stratum);
    println!("  offset:    {:+.6} s", result.offset());
    println!("  delay:     {:.6} s", result.delay());
    println!("  transmit:  {:.6}", result.transmit_time());

    let corrected = CorrectedTimestamp::from_exchange(&result, 0);
    if let Some(local) = corrected.to_calendar(CalendarZone::Local) {
        println!("  displays would show: {local}");
    }
    Ok(())
}

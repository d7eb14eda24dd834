//! In-process stand-ins for the time source and the display delivery.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::client::{NtpError, TimeSource};
use crate::delivery::FrameDelivery;
use crate::protocol::distribution::DistributionFrame;
use crate::protocol::ntp::{MODE_SERVER, NtpExchangeResult, NtpPacket, NtpTimestamp};
use crate::types::SyncStatus;

/// One scripted answer from [`ScriptedTimeSource`]
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this exchange
    Respond(NtpExchangeResult),
    /// Fail with a timeout error
    Fail,
    /// Never answer
    Hang,
    /// Panic inside the query
    Panic,
}

/// Time source that plays back a script, then repeats a fallback reply
pub struct ScriptedTimeSource {
    script: Mutex<VecDeque<ScriptedReply>>,
    fallback: ScriptedReply,
    calls: AtomicUsize,
}

impl ScriptedTimeSource {
    /// Play `script` in order, then answer every further query with `fallback`
    pub fn new(script: impl IntoIterator<Item = ScriptedReply>, fallback: ScriptedReply) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answer with `reply`
    #[must_use]
    pub fn always(reply: ScriptedReply) -> Self {
        Self::new(Vec::new(), reply)
    }

    /// Always fail
    #[must_use]
    pub fn failing() -> Self {
        Self::always(ScriptedReply::Fail)
    }

    /// Always report `transmit` as the server transmit time
    #[must_use]
    pub fn responding_at(transmit: NtpTimestamp) -> Self {
        Self::always(ScriptedReply::Respond(exchange_at(transmit)))
    }

    /// Number of queries made so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimeSource for ScriptedTimeSource {
    async fn query(&self, server: &str) -> Result<NtpExchangeResult, NtpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            ScriptedReply::Respond(result) => Ok(result),
            ScriptedReply::Fail => Err(NtpError::Timeout {
                host: server.to_string(),
                timeout: Duration::ZERO,
            }),
            ScriptedReply::Hang => std::future::pending().await,
            ScriptedReply::Panic => panic!("scripted time source panic"),
        }
    }
}

/// Exchange whose server transmit and local receipt are both `transmit`
#[must_use]
pub fn exchange_at(transmit: NtpTimestamp) -> NtpExchangeResult {
    let packet = NtpPacket {
        version: 3,
        mode: MODE_SERVER,
        stratum: 1,
        receive: transmit,
        transmit,
        ..NtpPacket::default()
    };
    NtpExchangeResult::new(packet, transmit)
}

/// Delivery that records frames and answers from a per-display table
#[derive(Default)]
pub struct RecordingDelivery {
    outcomes: HashMap<IpAddr, SyncStatus>,
    delay: Duration,
    deliveries: Mutex<Vec<(IpAddr, Bytes)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingDelivery {
    /// Every display synchronizes immediately
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `status` for `device`
    #[must_use]
    pub fn with_outcome(mut self, device: IpAddr, status: SyncStatus) -> Self {
        self.outcomes.insert(device, status);
        self
    }

    /// Hold every session open for `delay`
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Deliveries started so far, with the frame bytes each one carried
    pub async fn deliveries(&self) -> Vec<(IpAddr, Bytes)> {
        self.deliveries.lock().await.clone()
    }

    /// Highest number of sessions open at the same time
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FrameDelivery for RecordingDelivery {
    async fn deliver(&self, device: IpAddr, frame: &DistributionFrame) -> SyncStatus {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(current, Ordering::SeqCst);

        self.deliveries.lock().await.push((device, frame.to_bytes()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.outcomes
            .get(&device)
            .copied()
            .unwrap_or(SyncStatus::Synchronized)
    }
}

use std::any::Any;
use std::net::IpAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Semaphore, broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::events::{SyncCommand, SyncEvent};
use crate::client::TimeSource;
use crate::delivery::FrameDelivery;
use crate::error::SyncError;
use crate::net::Runtime;
use crate::protocol::distribution::DistributionFrame;
use crate::sink::SyncLogSink;
use crate::types::{CorrectedTimestamp, SyncAttemptRecord, SyncConfig, SyncStatus};

const EVENT_CAPACITY: usize = 64;
const COMMAND_CAPACITY: usize = 16;

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    Distributed,
    QueryFailed,
    Cancelled,
}

/// Long-lived query, correct, distribute, sleep loop
///
/// Owns its configuration for the whole run. The only way to change the
/// loop while it runs is a [`SyncCommand`].
pub struct SyncOrchestrator {
    config: SyncConfig,
    source: Arc<dyn TimeSource>,
    delivery: Arc<dyn FrameDelivery>,
    sink: Arc<dyn SyncLogSink>,
    event_tx: broadcast::Sender<SyncEvent>,
    command_tx: mpsc::Sender<SyncCommand>,
    command_rx: mpsc::Receiver<SyncCommand>,
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    /// Cancelled when the next cycle fans out
    superseded: CancellationToken,
    cycle: u64,
}

impl SyncOrchestrator {
    /// Create a loop over the given collaborators
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn TimeSource>,
        delivery: Arc<dyn FrameDelivery>,
        sink: Arc<dyn SyncLogSink>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));

        Self {
            config,
            source,
            delivery,
            sink,
            event_tx,
            command_tx,
            command_rx,
            tracker: TaskTracker::new(),
            permits,
            superseded: CancellationToken::new(),
            cycle: 0,
        }
    }

    /// Publish events on an existing channel instead of a private one
    #[must_use]
    pub fn with_event_sender(mut self, event_tx: broadcast::Sender<SyncEvent>) -> Self {
        self.event_tx = event_tx;
        self
    }

    /// Subscribe to events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Handle for sending commands to the loop
    #[must_use]
    pub fn command_sender(&self) -> mpsc::Sender<SyncCommand> {
        self.command_tx.clone()
    }

    /// Configuration in effect
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Cycles started so far
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Run until `shutdown` turns `true` or its sender is dropped
    ///
    /// No single failure ends the loop. A failed query or a failed cycle is
    /// logged and the loop sleeps for the interval before trying again.
    /// Deliveries still in flight at shutdown get up to one delivery
    /// timeout to finish.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        self.tracker.reopen();

        tracing::info!(
            server = %self.config.server,
            interval = ?self.config.interval,
            bias = self.config.bias,
            devices = self.config.roster.len(),
            "Synchronization loop starting"
        );
        self.emit(SyncEvent::Started {
            server: self.config.server.clone(),
            interval: self.config.interval,
            bias: self.config.bias,
            devices: self.config.roster.len(),
        });

        while !shutdown_requested(&shutdown) {
            self.apply_commands();
            self.cycle += 1;
            let cycle = self.cycle;

            let outcome = AssertUnwindSafe(self.run_cycle(&mut shutdown))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(CycleOutcome::Cancelled)) => break,
                Ok(Ok(CycleOutcome::Distributed | CycleOutcome::QueryFailed)) => {}
                Ok(Err(e)) => {
                    tracing::error!(cycle, error = %e, "Cycle failed");
                    self.emit(SyncEvent::CycleFailed {
                        cycle,
                        message: e.to_string(),
                    });
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(cycle, panic = %message, "Cycle panicked");
                    self.emit(SyncEvent::CycleFailed { cycle, message });
                }
            }

            tokio::select! {
                () = Runtime::sleep(self.config.interval) => {}
                () = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        self.drain().await;

        tracing::info!(cycles = self.cycle, "Synchronization loop stopped");
        self.emit(SyncEvent::Stopped { cycles: self.cycle });
    }

    async fn run_cycle(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<CycleOutcome, SyncError> {
        let cycle = self.cycle;

        let query = tokio::select! {
            result = self.source.query(&self.config.server) => result,
            () = wait_for_shutdown(shutdown) => return Ok(CycleOutcome::Cancelled),
        };

        let exchange = match query {
            Ok(exchange) => exchange,
            Err(e) => {
                tracing::warn!(
                    cycle,
                    server = %self.config.server,
                    error = %e,
                    "NTP query failed, skipping distribution"
                );
                self.emit(SyncEvent::QueryFailed {
                    cycle,
                    message: e.to_string(),
                });
                return Ok(CycleOutcome::QueryFailed);
            }
        };

        let corrected = CorrectedTimestamp::from_exchange(&exchange, self.config.bias);
        let offset = exchange.offset();
        let delay = exchange.delay();
        tracing::debug!(cycle, offset, delay, %corrected, "NTP query succeeded");
        self.emit(SyncEvent::QuerySucceeded {
            cycle,
            offset,
            delay,
            corrected,
        });

        let frame = Arc::new(DistributionFrame::from_timestamp(
            corrected,
            self.config.calendar,
        )?);
        let devices = self.fan_out(cycle, &frame, corrected, shutdown);

        tracing::info!(cycle, devices, %corrected, "Distribution dispatched");
        self.emit(SyncEvent::Distributed {
            cycle,
            devices,
            corrected,
        });

        Ok(CycleOutcome::Distributed)
    }

    /// Spawn one delivery task per display and return without waiting
    ///
    /// Deliveries of the previous cycle that are still waiting for a permit
    /// are dropped first, so at most one cycle's frame is ever queued.
    fn fan_out(
        &mut self,
        cycle: u64,
        frame: &Arc<DistributionFrame>,
        corrected: CorrectedTimestamp,
        shutdown: &watch::Receiver<bool>,
    ) -> usize {
        self.superseded.cancel();
        self.superseded = CancellationToken::new();

        let context = Arc::new(DeliveryContext {
            cycle,
            bias: self.config.bias,
            corrected,
            frame: Arc::clone(frame),
            delivery: Arc::clone(&self.delivery),
            sink: Arc::clone(&self.sink),
            event_tx: self.event_tx.clone(),
            superseded: self.superseded.clone(),
        });

        for &device in &self.config.roster {
            let context = Arc::clone(&context);
            let permits = Arc::clone(&self.permits);
            let shutdown = shutdown.clone();
            self.tracker
                .spawn(async move { context.run(device, permits, shutdown).await });
        }

        self.config.roster.len()
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                SyncCommand::SetBias(bias) => {
                    let previous = self.config.bias;
                    self.config.bias = bias;
                    tracing::info!(previous, bias, "Bias updated");
                    self.emit(SyncEvent::BiasUpdated { previous, bias });
                }
            }
        }
    }

    async fn drain(&self) {
        self.tracker.close();
        if Runtime::timeout(self.config.delivery_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                pending = self.tracker.len(),
                "Deliveries still in flight at shutdown"
            );
        }
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

/// Everything a delivery task needs, shared by all tasks in a cycle
struct DeliveryContext {
    cycle: u64,
    bias: i64,
    corrected: CorrectedTimestamp,
    frame: Arc<DistributionFrame>,
    delivery: Arc<dyn FrameDelivery>,
    sink: Arc<dyn SyncLogSink>,
    event_tx: broadcast::Sender<SyncEvent>,
    superseded: CancellationToken,
}

impl DeliveryContext {
    async fn run(
        &self,
        device: IpAddr,
        permits: Arc<Semaphore>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let status = tokio::select! {
            status = self.deliver_with_permit(device, permits) => status,
            () = wait_for_shutdown(&mut shutdown) => {
                tracing::debug!(cycle = self.cycle, device = %device, "Delivery abandoned at shutdown");
                SyncStatus::NotConnected
            }
        };

        if !status.is_synchronized() {
            tracing::warn!(cycle = self.cycle, device = %device, "Display not synchronized");
        }

        let record = SyncAttemptRecord::new(device, status, self.bias, self.corrected);
        if let Err(e) = self.sink.record(record).await {
            tracing::error!(cycle = self.cycle, device = %device, error = %e, "Failed to store sync record");
        }

        let _ = self.event_tx.send(SyncEvent::DeviceResult {
            cycle: self.cycle,
            ip: device,
            status,
        });
    }

    async fn deliver_with_permit(&self, device: IpAddr, permits: Arc<Semaphore>) -> SyncStatus {
        let permit = tokio::select! {
            biased;
            () = self.superseded.cancelled() => {
                tracing::debug!(cycle = self.cycle, device = %device, "Queued delivery superseded by a newer cycle");
                return SyncStatus::NotConnected;
            }
            permit = permits.acquire_owned() => permit,
        };
        let Ok(_permit) = permit else {
            return SyncStatus::NotConnected;
        };
        self.delivery.deliver(device, &self.frame).await
    }
}

fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

/// Resolves once shutdown is signalled or the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

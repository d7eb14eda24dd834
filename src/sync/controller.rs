use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::events::{SyncCommand, SyncEvent};
use super::orchestrator::SyncOrchestrator;
use crate::client::{NtpClient, TimeSource};
use crate::delivery::{FrameDelivery, TcpDelivery};
use crate::error::{Result, SyncError};
use crate::net::spawn;
use crate::sink::SyncLogSink;
use crate::types::{StartSyncRequest, SyncAck, SyncAttemptRecord, SyncConfig};

/// A loop started by the controller
struct ActiveLoop {
    server: String,
    shutdown_tx: watch::Sender<bool>,
    command_tx: mpsc::Sender<SyncCommand>,
    handle: JoinHandle<()>,
}

impl ActiveLoop {
    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Control-plane facade over at most one running loop
///
/// Start requests only carry server, interval and bias. Everything else
/// comes from the base configuration given at construction.
pub struct SyncController {
    base: SyncConfig,
    source: Arc<dyn TimeSource>,
    delivery: Arc<dyn FrameDelivery>,
    sink: Arc<dyn SyncLogSink>,
    event_tx: broadcast::Sender<SyncEvent>,
    active: Mutex<Option<ActiveLoop>>,
}

impl SyncController {
    /// Create a controller using UDP NTP and TCP delivery built from `base`
    pub fn new(base: SyncConfig, sink: Arc<dyn SyncLogSink>) -> Self {
        let source = Arc::new(NtpClient::from_config(&base));
        let delivery = Arc::new(TcpDelivery::from_config(&base));
        let (event_tx, _) = broadcast::channel(256);

        Self {
            base,
            source,
            delivery,
            sink,
            event_tx,
            active: Mutex::new(None),
        }
    }

    /// Replace the upstream time source
    #[must_use]
    pub fn with_time_source(mut self, source: Arc<dyn TimeSource>) -> Self {
        self.source = source;
        self
    }

    /// Replace the display delivery
    #[must_use]
    pub fn with_delivery(mut self, delivery: Arc<dyn FrameDelivery>) -> Self {
        self.delivery = delivery;
        self
    }

    /// Subscribe to events from current and future loops
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Start a loop for `request`
    ///
    /// # Errors
    ///
    /// Returns `SyncError::AlreadyRunning` while another loop is live, or
    /// `SyncError::InvalidConfig` if the request does not yield a valid
    /// configuration.
    pub async fn start_sync(&self, request: &StartSyncRequest) -> Result<SyncAck> {
        let config = request.apply_to(&self.base)?;

        let mut active = self.active.lock().await;
        if let Some(current) = active.as_ref().filter(|current| current.is_live()) {
            return Err(SyncError::AlreadyRunning {
                server: current.server.clone(),
            });
        }

        let server = config.server.clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut orchestrator = SyncOrchestrator::new(
            config,
            Arc::clone(&self.source),
            Arc::clone(&self.delivery),
            Arc::clone(&self.sink),
        )
        .with_event_sender(self.event_tx.clone());
        let command_tx = orchestrator.command_sender();

        let handle = spawn(async move {
            orchestrator.run(shutdown_rx).await;
        });

        tracing::info!(server = %server, "Synchronization started");
        *active = Some(ActiveLoop {
            server,
            shutdown_tx,
            command_tx,
            handle,
        });

        Ok(SyncAck::started())
    }

    /// Parse a JSON start payload and start a loop for it
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidRequest` for a malformed payload, otherwise
    /// as [`start_sync`](Self::start_sync).
    pub async fn start_sync_json(&self, body: &[u8]) -> Result<SyncAck> {
        let request = StartSyncRequest::from_json(body)?;
        self.start_sync(&request).await
    }

    /// Stop the running loop and wait for it to wind down
    ///
    /// # Errors
    ///
    /// Returns `SyncError::NotRunning` if no loop is live.
    pub async fn stop_sync(&self) -> Result<()> {
        let current = self
            .active
            .lock()
            .await
            .take()
            .filter(ActiveLoop::is_live)
            .ok_or(SyncError::NotRunning)?;

        let _ = current.shutdown_tx.send(true);
        if let Err(e) = current.handle.await {
            tracing::error!(error = %e, "Synchronization loop ended abnormally");
        }

        tracing::info!(server = %current.server, "Synchronization stopped");
        Ok(())
    }

    /// Change the bias of the running loop from the next cycle on
    ///
    /// # Errors
    ///
    /// Returns `SyncError::NotRunning` if no loop is live.
    pub async fn set_bias(&self, bias: i64) -> Result<()> {
        let command_tx = {
            let active = self.active.lock().await;
            active
                .as_ref()
                .filter(|current| current.is_live())
                .map(|current| current.command_tx.clone())
                .ok_or(SyncError::NotRunning)?
        };

        command_tx
            .send(SyncCommand::SetBias(bias))
            .await
            .map_err(|_| SyncError::NotRunning)
    }

    /// All recorded sync attempts
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Sink` if the records cannot be read.
    pub async fn get_logs(&self) -> Result<Vec<SyncAttemptRecord>> {
        Ok(self.sink.records().await?)
    }

    /// Check if a loop is live
    pub async fn is_running(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .is_some_and(ActiveLoop::is_live)
    }

    /// Upstream server of the live loop, if any
    pub async fn server(&self) -> Option<String> {
        self.active
            .lock()
            .await
            .as_ref()
            .filter(|current| current.is_live())
            .map(|current| current.server.clone())
    }
}

//! Periodic tick-and-publish loop.
//!
//! One task per session. Each firing steps the shared field, snapshots it,
//! releases the field lock, then writes a `Frame` through the shared writer.
//! A failed write ends the task; it never brings down the process.
//!
//! The stop signal is only observed between firings. A frame that has started
//! going out is always written in full before the task exits.

use crate::field::FieldSimulator;
use crate::protocol::{FrameSnapshot, Message};
use crate::transport::SharedWriter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

pub type SharedField = Arc<Mutex<FieldSimulator>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub ticks: u64,
    pub frames_sent: u64,
    /// Set when the scheduler stopped itself because a write failed.
    pub failure: Option<String>,
}

#[derive(Debug)]
pub struct BroadcastScheduler {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<BroadcastReport>,
}

impl BroadcastScheduler {
    /// Spawn the timer. The first firing happens immediately.
    pub fn start<W>(field: SharedField, writer: SharedWriter<W>, period: Duration) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_broadcast(field, writer, period, shutdown_rx));
        info!("📡 Broadcast scheduler started ({} ms period)", period.as_millis());

        Self {
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the task and wait for it to wind down.
    pub async fn stop(mut self) -> BroadcastReport {
        if let Some(shutdown) = self.shutdown.take() {
            // The task may already have exited on a write failure.
            let _ = shutdown.send(());
        }

        match self.handle.await {
            Ok(report) => report,
            Err(e) => {
                warn!("Broadcast task ended abnormally: {}", e);
                BroadcastReport {
                    failure: Some(e.to_string()),
                    ..BroadcastReport::default()
                }
            }
        }
    }
}

async fn run_broadcast<W>(
    field: SharedField,
    writer: SharedWriter<W>,
    period: Duration,
    mut shutdown: oneshot::Receiver<()>,
) -> BroadcastReport
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut interval = time::interval(period);
    let mut report = BroadcastReport::default();

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = interval.tick() => {}
        }

        let snapshot = step_field(&field).await;
        report.ticks += 1;
        let entity_count = snapshot.entities.len();

        let sent = writer.lock().await.send(&Message::Frame(snapshot)).await;
        match sent {
            Ok(()) => {
                report.frames_sent += 1;
                debug!("Frame {} sent with {} entities", report.frames_sent, entity_count);
            }
            Err(e) => {
                warn!("Frame broadcast failed, stopping scheduler: {}", e);
                report.failure = Some(e.to_string());
                break;
            }
        }
    }

    debug!(
        "Broadcast scheduler stopped after {} ticks ({} frames sent)",
        report.ticks, report.frames_sent
    );
    report
}

/// Tick and snapshot under one lock acquisition; the guard drops before any I/O.
async fn step_field(field: &SharedField) -> FrameSnapshot {
    let mut field = field.lock().await;
    let tick = field.tick();
    debug!(
        "Tick: {} stepped, {} culled, spawned: {}, live: {}",
        tick.stepped,
        tick.culled,
        tick.spawned,
        field.len()
    );
    field.snapshot()
}

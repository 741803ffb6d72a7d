//! Service layer: the Telegram sync and cleanup workers and the cover cache.
//!
//! Services hold their own repositories and a [`BotApi`] handle, so the CLI,
//! the HTTP server and the background tasks all drive the same code.

pub mod cleanup;
pub mod covers;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::repository::DbError;
use crate::telegram::TelegramError;

pub use cleanup::{CleanupReport, CleanupWorker, GonePolicy, ProbeOutcome};
pub use covers::{CachedCover, CoverCache, CoverError};
pub use sync::{SyncReport, SyncWorker};

/// Failure of a worker pass as a whole.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Telegram request failed: {0}")]
    Telegram(#[from] TelegramError),

    #[error("database error: {0}")]
    Database(#[from] DbError),
}

/// Handles to the spawned background loops.
pub struct BackgroundWorkers {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundWorkers {
    /// Spawn the sync loop and/or the cleanup loop.
    pub fn spawn(
        sync: Option<(Arc<SyncWorker>, Duration)>,
        cleanup: Option<(Arc<CleanupWorker>, Duration)>,
    ) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let mut handles = Vec::new();

        if let Some((worker, interval)) = sync {
            info!(interval_secs = interval.as_secs_f64(), "Starting sync loop");
            handles.push(tokio::spawn(worker.run(interval, rx.clone())));
        }
        if let Some((worker, interval)) = cleanup {
            info!(interval_secs = interval.as_secs_f64(), "Starting cleanup loop");
            handles.push(tokio::spawn(worker.run(interval, rx.clone())));
        }

        Self { shutdown, handles }
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every loop to stop and wait for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }
        debug!("Background workers stopped");
    }
}

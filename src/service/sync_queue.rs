use crate::api::spotify_api::SpotifyClient;
use crate::db::{CredentialStore, SyncStatus};
use crate::error::LinkError;
use backon::{ExponentialBuilder, Retryable};
use futures::stream::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

/// A library sync request handed off by the OAuth callback.
pub struct SyncJob {
    pub user_id: i64,
    pub client: SpotifyClient,
}

impl std::fmt::Debug for SyncJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncJob")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Sending half of the sync queue.
#[derive(Clone)]
pub struct SyncQueue {
    job_tx: mpsc::Sender<SyncJob>,
}

impl SyncQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncJob>) {
        let (job_tx, job_rx) = mpsc::channel(capacity.max(1));
        (Self { job_tx }, job_rx)
    }

    /// Fire-and-forget: the caller never waits on, or learns about, the sync.
    /// A full queue drops the job.
    pub fn submit(&self, job: SyncJob) {
        let user_id = job.user_id;
        match self.job_tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(user_id, "sync queue full, dropping sync job");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(user_id, "sync queue closed, dropping sync job");
            }
        }
    }
}

fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(8))
        .with_max_times(3)
        .with_jitter()
}

/// Spawn the worker draining `job_rx` with at most `concurrency` syncs in flight.
pub fn spawn_worker(
    job_rx: mpsc::Receiver<SyncJob>,
    store: CredentialStore,
    concurrency: usize,
) -> JoinHandle<()> {
    let concurrency = concurrency.max(1);
    tokio::spawn(async move {
        info!("Sync Worker Started: Concurrency={}", concurrency);

        let mut pipeline = ReceiverStream::new(job_rx)
            .map(|job| {
                let store = store.clone();
                async move {
                    let user_id = job.user_id;
                    (user_id, run_job(&store, job).await)
                }
            })
            .buffer_unordered(concurrency);

        while let Some((user_id, outcome)) = pipeline.next().await {
            match outcome {
                Ok(Some(count)) => info!(user_id, count, "library sync completed"),
                Ok(None) => info!(user_id, "library sync skipped"),
                Err(e) => error!(user_id, error = %e, "library sync failed"),
            }
        }
        info!("Sync Worker Stopped");
    })
}

/// Run one sync. `Ok(None)` means nothing was recorded: the credential was gone,
/// already syncing, or changed before the result could be stored.
pub async fn run_job(store: &CredentialStore, job: SyncJob) -> Result<Option<i64>, LinkError> {
    let SyncJob { user_id, client } = job;
    if !store.set_sync_status(user_id, SyncStatus::InProgress).await? {
        return Ok(None);
    }

    let fetched = (|| async { client.saved_tracks_total().await })
        .retry(default_retry_policy())
        .when(|e: &LinkError| e.is_transient())
        .notify(|err, dur: Duration| {
            warn!(user_id, "library sync retrying after error {}, sleeping {:?}", err, dur);
        })
        .await;

    match fetched {
        Ok(count) => {
            // Row deleted or re-linked meanwhile: nothing was recorded.
            if !store.record_sync_result(user_id, count).await? {
                return Ok(None);
            }
            Ok(Some(count))
        }
        Err(e) => {
            if let Err(db_err) = store.set_sync_status(user_id, SyncStatus::Failed).await {
                warn!(user_id, "failed to mark sync as failed: {}", db_err);
            }
            Err(e)
        }
    }
}

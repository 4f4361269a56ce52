//! Keeps at most one translation worker in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::TranslationCache;
use crate::translation::{
    ChatBackend, StreamingTranslationWorker, TranslationRequest, TranslationSink, WorkerOutcome,
};

/// How long a cancelled worker gets to exit before its task is aborted.
pub const CANCEL_GRACE: Duration = Duration::from_millis(500);

pub type WorkerId = u64;

struct WorkerHandle {
    id: WorkerId,
    token: CancellationToken,
    task: JoinHandle<WorkerOutcome>,
}

pub struct TranslationService {
    cache: Option<Arc<TranslationCache>>,
    backend: Arc<dyn ChatBackend>,
    current: Mutex<Option<WorkerHandle>>,
    // Serializes start/shutdown so a replacement never overlaps its predecessor.
    transition: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
}

impl TranslationService {
    pub fn new(cache: Option<Arc<TranslationCache>>, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            cache,
            backend,
            current: Mutex::new(None),
            transition: tokio::sync::Mutex::new(()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn cache(&self) -> Option<&Arc<TranslationCache>> {
        self.cache.as_ref()
    }

    /// Starts a worker for `request`, first stopping the one in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(
        &self,
        request: TranslationRequest,
        sink: Arc<dyn TranslationSink>,
    ) -> WorkerId {
        let _transition = self.transition.lock().await;

        let previous = self.lock_current().take();
        if let Some(previous) = previous {
            self.stop(previous).await;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let worker = StreamingTranslationWorker::new(
            request,
            self.cache.clone(),
            Arc::clone(&self.backend),
            token.clone(),
        );
        let task = tokio::spawn(async move { worker.run(sink.as_ref()).await });

        debug!(id, "Translation worker started");
        *self.lock_current() = Some(WorkerHandle { id, token, task });
        id
    }

    /// Requests cancellation of the worker in flight without waiting for it.
    pub fn cancel_current(&self) {
        if let Some(handle) = self.lock_current().as_ref() {
            debug!(id = handle.id, "Cancelling translation worker");
            handle.token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_current()
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Waits for the worker in flight and returns how it ended.
    pub async fn join_current(&self) -> Option<WorkerOutcome> {
        let handle = self.lock_current().take()?;
        match handle.task.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(id = handle.id, "Translation worker did not finish: {e}");
                None
            }
        }
    }

    /// Stops the worker in flight and persists the cache.
    pub async fn shutdown(&self) {
        let _transition = self.transition.lock().await;

        let current = self.lock_current().take();
        if let Some(current) = current {
            self.stop(current).await;
        }

        if let Some(cache) = &self.cache {
            cache.flush();
        }
    }

    async fn stop(&self, handle: WorkerHandle) {
        let WorkerHandle {
            id,
            token,
            mut task,
        } = handle;
        token.cancel();

        if tokio::time::timeout(CANCEL_GRACE, &mut task).await.is_ok() {
            debug!(id, "Translation worker stopped");
        } else {
            warn!(id, "Translation worker ignored cancellation, aborting");
            task.abort();
        }
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<WorkerHandle>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

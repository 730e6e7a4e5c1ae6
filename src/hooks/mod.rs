//! Request lifecycles bound to the entity client.
//!
//! Every mutation is attempted exactly once. Failures are handed back to the
//! caller; nothing here retries.

pub mod enquiry;
pub mod items;

pub use enquiry::CreateEnquiry;
pub use items::{items_query_key, use_items, CreateItem, DeleteItem, ItemsCache, UpdateItem};

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationStatus {
    Idle,
    Pending,
    Success,
    Error(String),
}

/// Observable status of the most recent call of one mutation hook.
#[derive(Clone)]
pub struct MutationTracker {
    status: Arc<watch::Sender<MutationStatus>>,
    pending: Arc<AtomicUsize>,
}

impl Default for MutationTracker {
    fn default() -> Self {
        Self {
            status: Arc::new(watch::channel(MutationStatus::Idle).0),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MutationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> MutationStatus {
        self.status.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationStatus> {
        self.status.subscribe()
    }

    fn begin(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.status.send_replace(MutationStatus::Pending);
    }

    fn finish<O>(&self, result: &AppResult<O>) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.status.send_replace(match result {
            Ok(_) => MutationStatus::Success,
            Err(e) => MutationStatus::Error(e.to_string()),
        });
    }
}

/// Runs `work` on its own task: dropping the caller cancels neither the
/// backend call nor the cache invalidation that follows it.
pub(crate) async fn run_detached<O, F>(tracker: &MutationTracker, work: F) -> AppResult<O>
where
    O: Send + 'static,
    F: Future<Output = AppResult<O>> + Send + 'static,
{
    tracker.begin();
    let task_tracker = tracker.clone();
    let task = tokio::spawn(async move {
        let result = work.await;
        task_tracker.finish(&result);
        result
    });
    task.await
        .map_err(|e| AppError::Internal(format!("mutation task failed: {}", e)))?
}

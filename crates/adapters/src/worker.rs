// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker adapter: the seam through which the scheduler launches and
//! cancels the external agentic worker loop.

use async_trait::async_trait;
use fleet_core::{RunId, Task, Worker, WorkerId, WorkerStatus};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum WorkerAdapterError {
    #[error("worker spawn failed: {0}")]
    SpawnFailed(String),
}

/// The outcome of one worker run, delivered over [`SpawnedWorker::done`].
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    pub status: WorkerStatus,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl WorkerOutcome {
    pub fn completed(result: impl Into<String>) -> Self {
        Self { status: WorkerStatus::Completed, result: Some(result.into()), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { status: WorkerStatus::Failed, result: None, error: Some(error.into()) }
    }
}

/// A live handle onto a running worker: carries the id for bookkeeping and a
/// cancellation token the scheduler fires on abort.
#[derive(Clone)]
pub struct WorkerHandle {
    pub worker_id: WorkerId,
    cancel_token: CancellationToken,
}

impl WorkerHandle {
    pub fn new(worker_id: WorkerId) -> Self {
        Self { worker_id, cancel_token: CancellationToken::new() }
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

/// What `spawn` hands back to the scheduler: the freshly created worker
/// record, a handle to cancel it, and a one-shot that resolves with its
/// terminal outcome.
pub struct SpawnedWorker {
    pub worker: Worker,
    pub handle: WorkerHandle,
    pub done: oneshot::Receiver<WorkerOutcome>,
}

/// External collaborator driving the agentic tool-using loop for one task.
#[async_trait]
pub trait WorkerAdapter: Send + Sync + 'static {
    /// Launch a worker against `task` inside `target_dir`. The returned
    /// `done` receiver resolves once, when the worker terminates.
    async fn spawn(&self, run_id: RunId, task: &Task, target_dir: &str) -> Result<SpawnedWorker, WorkerAdapterError>;

    /// Request prompt cancellation of a running worker. The worker is
    /// expected to terminate as `failed` shortly after.
    async fn cancel(&self, handle: &WorkerHandle);

    /// Whether the adapter considers itself configured.
    async fn health(&self) -> bool {
        true
    }
}

//! Background task dispatch.
//!
//! The create-user transaction enqueues a send-verify-email task through
//! [`TaskDistributor`]; the queue is a bounded tokio mpsc channel drained
//! by [`processor::TaskProcessor`]. Distribution happens inside the
//! creating transaction, so a failed enqueue rolls the user insert back
//! instead of leaving a created-but-never-notified user; a full queue
//! applies backpressure to the transaction rather than dropping tasks.

pub mod processor;

pub use processor::TaskProcessor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("task queue is closed or full")]
    QueueUnavailable,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("mail delivery failed: {0}")]
    Mail(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSendVerifyEmail {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    SendVerifyEmail(PayloadSendVerifyEmail),
}

#[async_trait]
pub trait TaskDistributor: Send + Sync {
    async fn distribute_send_verify_email(
        &self,
        payload: PayloadSendVerifyEmail,
    ) -> Result<(), WorkerError>;
}

/// Channel-backed distributor handed to the API layer.
#[derive(Clone)]
pub struct ChannelTaskDistributor {
    tx: mpsc::Sender<Task>,
}

/// Create the task queue: a distributor for producers and the receiver
/// the processor drains.
pub fn task_channel(capacity: usize) -> (ChannelTaskDistributor, mpsc::Receiver<Task>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelTaskDistributor { tx }, rx)
}

#[async_trait]
impl TaskDistributor for ChannelTaskDistributor {
    async fn distribute_send_verify_email(
        &self,
        payload: PayloadSendVerifyEmail,
    ) -> Result<(), WorkerError> {
        self.tx
            .send(Task::SendVerifyEmail(payload))
            .await
            .map_err(|_| WorkerError::QueueUnavailable)
    }
}

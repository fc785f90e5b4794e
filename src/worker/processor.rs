//! Task processor: drains the task queue and performs the side effects.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::{PayloadSendVerifyEmail, Task, WorkerError};
use crate::mail::EmailSender;
use crate::store::users::{self, CreateVerifyEmailParams};
use crate::store::{Store, StoreError};
use crate::util::random::random_string;

const SECRET_CODE_LEN: usize = 32;

/// Attempts per task before it is dropped for good.
const TASK_MAX_ATTEMPTS: u32 = 5;
const TASK_RETRY_BASE_MS: u64 = 100;

/// Exponential backoff: 100ms, 200ms, 400ms, ... capped at ~6.4s.
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(TASK_RETRY_BASE_MS << attempt.min(6))
}

pub struct TaskProcessor {
    store: Store,
    mailer: Arc<dyn EmailSender>,
    rx: mpsc::Receiver<Task>,
    /// Base URL the verification link points at.
    verify_url: String,
}

impl TaskProcessor {
    pub fn new(
        store: Store,
        mailer: Arc<dyn EmailSender>,
        rx: mpsc::Receiver<Task>,
        verify_url: String,
    ) -> Self {
        Self {
            store,
            mailer,
            rx,
            verify_url,
        }
    }

    /// Drain the queue until every distributor handle is dropped.
    /// Task failures are retried with backoff, never fatal to the loop.
    pub async fn run(mut self) {
        tracing::info!("task processor started");
        while let Some(task) = self.rx.recv().await {
            self.process_with_retry(task).await;
        }
        tracing::info!("task queue closed, processor shutting down");
    }

    /// Tasks are enqueued inside the transaction that creates the rows
    /// they act on, so the first attempt can legitimately run before
    /// that transaction commits and find nothing. Every failure is
    /// treated as transient until the attempt budget runs out.
    async fn process_with_retry(&self, task: Task) {
        for attempt in 1..=TASK_MAX_ATTEMPTS {
            match self.process(&task).await {
                Ok(()) => return,
                Err(err) if attempt < TASK_MAX_ATTEMPTS => {
                    let delay = retry_delay(attempt - 1);
                    tracing::warn!(
                        error = %err,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "task failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::error!(error = %err, attempts = TASK_MAX_ATTEMPTS, "task failed, giving up");
                }
            }
        }
    }

    async fn process(&self, task: &Task) -> Result<(), WorkerError> {
        match task {
            Task::SendVerifyEmail(payload) => self.send_verify_email(payload).await,
        }
    }

    async fn send_verify_email(&self, payload: &PayloadSendVerifyEmail) -> Result<(), WorkerError> {
        let user = users::get_user(self.store.pool(), &payload.username)
            .await?
            .ok_or(StoreError::RecordNotFound)?;

        let verify_email = users::create_verify_email(
            self.store.pool(),
            &CreateVerifyEmailParams {
                username: user.username.clone(),
                email: user.email.clone(),
                secret_code: random_string(SECRET_CODE_LEN),
            },
        )
        .await?;

        let link = format!(
            "{}?email_id={}&secret_code={}",
            self.verify_url, verify_email.id, verify_email.secret_code
        );
        let content = format!(
            "Hello {},<br/>\
             Thank you for registering with us!<br/>\
             Please <a href=\"{}\">click here</a> to verify your email address.<br/>",
            user.full_name, link
        );

        self.mailer
            .send_email("Welcome to Ferrobank", &content, &[user.email.clone()])
            .await
            .map_err(|e| WorkerError::Mail(e.to_string()))?;

        tracing::info!(username = %user.username, email_id = verify_email.id, "verification email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MailConfig;
    use crate::mail::LogEmailSender;
    use crate::store::testutil;
    use crate::worker::{TaskDistributor, task_channel};

    #[test]
    fn retry_delay_grows_and_caps() {
        assert_eq!(retry_delay(0), Duration::from_millis(100));
        assert_eq!(retry_delay(1), Duration::from_millis(200));
        assert_eq!(retry_delay(3), Duration::from_millis(800));
        assert_eq!(retry_delay(6), Duration::from_millis(6_400));
        assert_eq!(retry_delay(60), Duration::from_millis(6_400));
    }

    #[tokio::test]
    #[ignore]
    async fn task_dequeued_before_user_commits_is_retried() {
        let pool = testutil::test_pool().await;
        let store = Store::new(pool.clone());
        let (distributor, rx) = task_channel(8);
        let processor = TaskProcessor::new(
            store,
            Arc::new(LogEmailSender::new(&MailConfig::default())),
            rx,
            "http://localhost:8080/api/v1/verify_email".to_string(),
        );

        // Enqueue for a user that does not exist yet, mimicking a
        // processor that races ahead of the creating transaction.
        let params = testutil::random_user_params();
        distributor
            .distribute_send_verify_email(PayloadSendVerifyEmail {
                username: params.username.clone(),
            })
            .await
            .unwrap();
        drop(distributor);

        let handle = tokio::spawn(processor.run());

        // The first attempt fails with a missing row; the user appears
        // before the retry budget is exhausted.
        tokio::time::sleep(Duration::from_millis(250)).await;
        users::create_user(&pool, &params).await.unwrap();

        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("processor did not drain the queue in time")
            .unwrap();

        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM verify_emails WHERE username = $1")
                .bind(&params.username)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(pending, 1);
    }
}

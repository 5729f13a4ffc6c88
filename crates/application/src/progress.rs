use std::future::Future;
use std::sync::{mpsc, Mutex};
use std::time::Duration;

use tracing::warn;

use crate::ApplicationError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    Started,
    Progress(f32),
    Completed,
}

/// Receives progress of a long-running operation. Fractions are in `[0, 1]`.
pub trait ProgressListener: Send + Sync {
    fn on_started(&self) {}

    fn on_progress(&self, _fraction: f32) {}

    fn on_completed(&self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressListener for NoProgress {}

/// Forwards progress events over a channel, typically to the thread that owns
/// the display.
pub struct ChannelProgress {
    tx: Mutex<mpsc::Sender<ProgressEvent>>,
}

impl ChannelProgress {
    pub fn new() -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Mutex::new(tx) }, rx)
    }

    fn send(&self, event: ProgressEvent) {
        if let Ok(tx) = self.tx.lock() {
            let _ = tx.send(event);
        }
    }
}

impl ProgressListener for ChannelProgress {
    fn on_started(&self) {
        self.send(ProgressEvent::Started);
    }

    fn on_progress(&self, fraction: f32) {
        self.send(ProgressEvent::Progress(fraction));
    }

    fn on_completed(&self) {
        self.send(ProgressEvent::Completed);
    }
}

/// Maps the progress of item `index` out of `total` onto the whole batch.
pub(crate) struct ScaledProgress<'a> {
    pub inner: &'a dyn ProgressListener,
    pub index: usize,
    pub total: usize,
}

impl ProgressListener for ScaledProgress<'_> {
    fn on_progress(&self, fraction: f32) {
        self.inner
            .on_progress((self.index as f32 + fraction) / self.total as f32);
    }

    fn on_completed(&self) {
        self.inner
            .on_progress((self.index + 1) as f32 / self.total as f32);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure<T> {
    pub item: T,
    pub reason: String,
}

/// Outcome of a sequential batch. Failed items were not applied locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BatchFailure<T>>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn record(&mut self, item: T, result: Result<(), ApplicationError>) {
        match result {
            Ok(()) => self.succeeded.push(item),
            Err(error) => self.failed.push(BatchFailure {
                item,
                reason: error.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Runs `operation` until it succeeds, fails permanently, or the attempts
    /// run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ApplicationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApplicationError>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < attempts => {
                    warn!(%label, attempt, %error, "transient failure, retrying");
                    attempt += 1;
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }
}

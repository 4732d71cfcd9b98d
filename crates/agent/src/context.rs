//! Run-scoped cancellation and deadline.

use std::future::Future;
use std::time::Duration;

use agentloop_core::error::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation signal and optional deadline for one run.
///
/// Cloning shares the token, so a caller can keep a handle and cancel a
/// run that is in flight on another task.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing token, e.g. a child of a server-wide shutdown token.
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Some(error)` if the run must not continue.
    pub fn check(&self) -> Option<Error> {
        if self.cancel.is_cancelled() {
            return Some(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drive `fut` to completion unless the run is cancelled or times out
    /// first. A losing `fut` is dropped.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Error> {
        if let Some(err) = self.check() {
            return Err(err);
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = deadline => Err(Error::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}

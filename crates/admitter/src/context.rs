//! Caller context forwarded to mutators

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation and deadline of one review
///
/// The engine stops waiting on a mutator as soon as the token is cancelled
/// or the deadline passes, and denies the request. Mutators doing long work
/// should watch [`ReviewContext::cancellation`] themselves so they can stop
/// early too.
#[derive(Debug, Clone)]
pub struct ReviewContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ReviewContext {
    /// Context with no deadline and a fresh cancellation token
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Set the deadline to `timeout` from now
    ///
    /// A timeout too large to represent leaves the review without a deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// Set an absolute deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Use the caller's cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token cancelled when the caller gives up on the review
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Deadline of the review, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the caller already cancelled the review
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for ReviewContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_has_no_deadline() {
        let ctx = ReviewContext::default();
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn cancelling_the_caller_token_cancels_the_context() {
        let token = CancellationToken::new();
        let ctx = ReviewContext::new().with_cancellation(token.clone());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn unrepresentable_timeout_means_no_deadline() {
        let ctx = ReviewContext::new().with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_counts_down_to_zero() {
        let ctx = ReviewContext::new().with_timeout(Duration::from_secs(5));
        assert_eq!(ctx.remaining(), Some(Duration::from_secs(5)));

        tokio::time::advance(Duration::from_secs(7)).await;
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }
}

//! Arm-or-reset single-shot timer.
//!
//! Chat pages mutate in rapid bursts; coalescing a burst into one action
//! after a quiet period keeps rescans cheap. The timer is explicit: arming
//! while armed pushes the deadline out, firing is observed by awaiting
//! [`Debouncer::fired`], and the caller disarms after acting.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Arm, or push an armed deadline out to a full quiet period from now.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.quiet);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves at the armed deadline; pends forever while disarmed. Meant
    /// for `select!` arms guarded by [`Debouncer::is_armed`].
    pub async fn fired(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test(start_paused = true)]
    async fn fires_after_quiet_period() {
        let mut d = Debouncer::new(Duration::from_millis(500));
        d.arm();
        assert!(d.fired().now_or_never().is_none());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(d.fired().now_or_never().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_pushes_the_deadline_out() {
        let mut d = Debouncer::new(Duration::from_millis(500));
        d.arm();
        tokio::time::advance(Duration::from_millis(300)).await;
        d.arm();

        // The original deadline has now passed; the new one has not.
        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(d.fired().now_or_never().is_none());

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(d.fired().now_or_never().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_timer_never_fires() {
        let mut d = Debouncer::new(Duration::from_millis(500));
        assert!(!d.is_armed());
        assert!(d.fired().now_or_never().is_none());

        d.arm();
        d.disarm();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(d.fired().now_or_never().is_none());
    }
}

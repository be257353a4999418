use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Minimum-interval gate for outbound requests.
///
/// Each [`Throttle::wait`] returns no sooner than `interval` after the previous
/// one returned. Callers are serialized on the internal lock, so concurrent
/// waiters are spaced out as well.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn wait(&self) {
        let mut last = self.last.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let remaining = self.interval - elapsed;
                tracing::debug!(?remaining, "throttling request");
                sleep(remaining).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_does_not_wait() {
        let throttle = Throttle::new(Duration::from_secs(1));
        let start = Instant::now();
        throttle.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_calls_are_spaced() {
        let throttle = Throttle::new(Duration::from_secs(1));
        let start = Instant::now();

        throttle.wait().await;
        throttle.wait().await;
        throttle.wait().await;

        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_remainder_is_slept() {
        let throttle = Throttle::new(Duration::from_secs(1));
        throttle.wait().await;

        tokio::time::advance(Duration::from_millis(700)).await;
        let before = Instant::now();
        throttle.wait().await;

        let slept = before.elapsed();
        assert!(slept >= Duration::from_millis(300));
        assert!(slept < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn calls_after_the_interval_pass_straight_through() {
        let throttle = Throttle::new(Duration::from_secs(1));
        throttle.wait().await;

        tokio::time::advance(Duration::from_secs(5)).await;
        let before = Instant::now();
        throttle.wait().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Time source for every bounded wait in the navigation core.
#[async_trait]
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Poll `check` every `interval` until it yields a value or `timeout` passes.
pub async fn poll_until<C, T, F, Fut>(
    clock: &C,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Option<T>
where
    C: Clock,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    let deadline = clock.now() + timeout;
    loop {
        if let Some(found) = check().await {
            return Some(found);
        }
        if clock.now() >= deadline {
            return None;
        }
        clock.sleep(interval).await;
    }
}

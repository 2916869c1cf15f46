use std::time::{Duration, Instant};

/// Monotonic session time. Every timestamp the kernel sees is a `Duration`
/// since the clock was started, so tests can drive it with plain offsets.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        SessionClock { origin: Instant::now() }
    }

    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Minimum cadence the polling loop will run at. `tokio::time::interval`
/// panics on a zero period.
pub const MIN_POLL: Duration = Duration::from_millis(10);


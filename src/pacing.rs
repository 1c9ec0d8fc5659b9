use std::thread;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

// `finish` blocks until `interval` has passed since `begin`.
#[derive(Debug)]
pub struct Pacer<C: Clock> {
    clock: C,
    interval: Duration,
    started: Option<Duration>,
}

impl<C: Clock> Pacer<C> {
    pub fn new(clock: C, interval: Duration) -> Self {
        Self {
            clock,
            interval,
            started: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn begin(&mut self) {
        self.started = Some(self.clock.now());
    }

    pub fn finish(&mut self) {
        let spent = self
            .started
            .take()
            .map(|started| self.clock.now().saturating_sub(started))
            .unwrap_or_default();
        let remaining = self.interval.saturating_sub(spent);
        if !remaining.is_zero() {
            self.clock.sleep(remaining);
        }
    }
}

use std::time::Duration;

use anyhow::{bail, Result};

pub const DEFAULT_TPS: f64 = 1.0;

/// Paging parameters derived from the command line once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    pub page_size: usize,
    pub delay: Duration,
}

impl Pacing {
    pub fn new(page_size: usize, tps: f64) -> Result<Self> {
        if page_size == 0 {
            bail!("page size must be greater than zero");
        }
        if !tps.is_finite() || tps <= 0.0 {
            bail!("transactions per second must be a positive number, got {tps}");
        }
        Ok(Self {
            page_size,
            delay: Duration::from_secs_f64(1.0 / tps),
        })
    }

    pub fn throttle(&self) -> Throttle {
        Throttle::new(self.delay)
    }
}

/// Fixed inter-request delay. Not adaptive: a 429 is an error like any other.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    waits: usize,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay, waits: 0 }
    }

    pub async fn wait(&mut self) {
        self.waits += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    pub fn waits(&self) -> usize {
        self.waits
    }
}

use crate::config::ClientConfig;
use rand::Rng;
use std::time::Duration;

/// Randomized pause applied after each answered request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Pacing {
    /// Creates a pacing window; bounds given in the wrong order are swapped
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws a delay uniformly from `[min, max]`
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    /// Sleeps for a freshly drawn delay and returns it
    pub async fn pause(&self) -> Duration {
        let delay = self.next_delay();
        tracing::trace!("Pacing for {:?}", delay);
        tokio::time::sleep(delay).await;
        delay
    }
}

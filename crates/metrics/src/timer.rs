use std::time::Duration;

/// Ring buffer of the most recent tick durations.
#[derive(Debug, Clone)]
pub struct TickTimer {
    samples: Vec<Duration>,
    next: usize,
    wrapped: bool,
}

impl TickTimer {
    /// `capacity` is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![Duration::ZERO; capacity.max(1)],
            next: 0,
            wrapped: false,
        }
    }

    pub fn record(&mut self, tick: Duration) {
        self.samples[self.next] = tick;
        self.next = (self.next + 1) % self.samples.len();
        if self.next == 0 {
            self.wrapped = true;
        }
    }

    fn filled(&self) -> &[Duration] {
        if self.wrapped {
            &self.samples
        } else {
            &self.samples[..self.next]
        }
    }

    pub fn count(&self) -> usize {
        self.filled().len()
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Most recently recorded duration.
    pub fn last(&self) -> Option<Duration> {
        if self.count() == 0 {
            return None;
        }
        let idx = (self.next + self.samples.len() - 1) % self.samples.len();
        Some(self.samples[idx])
    }

    pub fn average(&self) -> Duration {
        let filled = self.filled();
        if filled.is_empty() {
            return Duration::ZERO;
        }
        filled.iter().sum::<Duration>() / filled.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.filled().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.filled().iter().copied().min().unwrap_or(Duration::ZERO)
    }
}

/// Half-open time window `[start, start + duration)`, seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeInterval {
    pub start: f64,
    pub duration: f64,
}

impl TimeInterval {
    pub fn new(start: f64, duration: f64) -> TimeInterval {
        TimeInterval { start, duration }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn midpoint(&self) -> f64 {
        self.start + 0.5 * self.duration
    }

    /// Length of the common part with `[start, end)`
    pub fn overlap(&self, start: f64, end: f64) -> f64 {
        f64::max(0.0, f64::min(self.end(), end) - f64::max(self.start, start))
    }
}

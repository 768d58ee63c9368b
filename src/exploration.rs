/// Exponentially decaying exploration rate, from `start` towards `end`.
///
/// The trainer only exposes the current rate; choosing between exploring and
/// trusting the prediction is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationSchedule {
    start: f64,
    end: f64,
    decay: f64,
}

impl ExplorationSchedule {
    pub fn new(start: f64, end: f64, decay: f64) -> Self {
        Self { start, end, decay }
    }

    pub fn rate(&self, step: u64) -> f64 {
        self.end + (self.start - self.end) * (-(step as f64) / self.decay).exp()
    }
}

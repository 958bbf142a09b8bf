/// Debounces the changed-ratio signal: motion is confirmed only after
/// `confirm_frames` consecutive qualifying ticks.
#[derive(Debug, Clone)]
pub struct MotionConfirmer {
    confirm_frames: u32,
    counter: u32,
}

impl MotionConfirmer {
    pub fn new(confirm_frames: u32) -> Self {
        Self {
            confirm_frames,
            counter: 0,
        }
    }

    /// Advances the counter for one tick and returns whether motion is
    /// confirmed on this tick.
    pub fn observe(&mut self, changed_ratio: f64, sensitivity_ratio: f64) -> bool {
        if changed_ratio > sensitivity_ratio {
            self.counter = self.counter.saturating_add(1);
        } else {
            self.counter = 0;
        }
        self.is_confirmed()
    }

    pub fn is_confirmed(&self) -> bool {
        self.counter >= self.confirm_frames
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

/// Flags an abrupt change of global brightness between consecutive ticks.
pub struct SuddenLightDetector;

impl SuddenLightDetector {
    /// `previous_mean` is `None` on the first tick of a stream, in which case
    /// the current mean stands in and the delta is zero.
    pub fn mean_diff(current_mean: f64, previous_mean: Option<f64>) -> f64 {
        (current_mean - previous_mean.unwrap_or(current_mean)).abs()
    }

    pub fn is_sudden(mean_diff: f64, threshold: f64) -> bool {
        mean_diff > threshold
    }
}

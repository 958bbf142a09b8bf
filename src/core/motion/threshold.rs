//! Self-tuning thresholds derived from running noise and brightness statistics.

const MIN_PIXEL_THRESHOLD: f64 = 8.0;
const NOISE_MULTIPLIER: f64 = 2.5;
const MIN_SENSITIVITY_RATIO: f64 = 0.002;
const MAX_SENSITIVITY_RATIO: f64 = 0.2;
const SENSITIVITY_BASE: f64 = 0.005;
const MIN_SUDDEN_LIGHT_THRESHOLD: f64 = 12.0;
const SUDDEN_LIGHT_MULTIPLIER: f64 = 3.0;
const SUDDEN_LIGHT_OFFSET: f64 = 20.0;

/// Exponential moving average. A stored value of exactly 0 means "no data
/// yet", so the next sample seeds the value directly.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningStatistic {
    alpha: f64,
    value: f64,
}

impl RunningStatistic {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, value: 0.0 }
    }

    pub fn observe(&mut self, sample: f64) -> f64 {
        self.value = if self.value == 0.0 {
            sample
        } else {
            self.value * (1.0 - self.alpha) + sample * self.alpha
        };
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

/// Per-tick thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// A pixel is foreground when its background distance exceeds this.
    pub pixel: u8,
    /// Changed-pixel ratio above which a tick counts towards motion.
    pub sensitivity_ratio: f64,
    /// Mean-brightness jump above which a tick is a sudden light change.
    pub sudden_light: f64,
}

impl Thresholds {
    pub fn from_statistics(avg_diff: f64, mean_diff: f64, sensitivity_factor: f64) -> Self {
        let pixel = (avg_diff * NOISE_MULTIPLIER)
            .round()
            .max(MIN_PIXEL_THRESHOLD)
            .min(u8::MAX as f64) as u8;

        let sensitivity_ratio = (sensitivity_factor * (avg_diff / (avg_diff + 1.0)) * 0.01
            + SENSITIVITY_BASE)
            .clamp(MIN_SENSITIVITY_RATIO, MAX_SENSITIVITY_RATIO);

        let sudden_light = (mean_diff * SUDDEN_LIGHT_MULTIPLIER)
            .max(mean_diff + SUDDEN_LIGHT_OFFSET)
            .round()
            .max(MIN_SUDDEN_LIGHT_THRESHOLD);

        Self {
            pixel,
            sensitivity_ratio,
            sudden_light,
        }
    }
}

pub struct AdaptiveThresholdEstimator {
    avg_diff: RunningStatistic,
    mean_diff: RunningStatistic,
    sensitivity_factor: f64,
}

impl AdaptiveThresholdEstimator {
    pub fn new(ema_alpha: f64, sensitivity_factor: f64) -> Self {
        Self {
            avg_diff: RunningStatistic::new(ema_alpha),
            mean_diff: RunningStatistic::new(ema_alpha),
            sensitivity_factor,
        }
    }

    /// Folds this tick's measurements into the statistics, then derives the
    /// thresholds from the updated values.
    pub fn observe(&mut self, avg_abs_diff: f64, mean_diff: f64) -> Thresholds {
        let avg = self.avg_diff.observe(avg_abs_diff);
        let mean = self.mean_diff.observe(mean_diff);
        Thresholds::from_statistics(avg, mean, self.sensitivity_factor)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::from_statistics(
            self.avg_diff.value(),
            self.mean_diff.value(),
            self.sensitivity_factor,
        )
    }

    pub fn ema_avg_diff(&self) -> f64 {
        self.avg_diff.value()
    }

    pub fn ema_mean_diff(&self) -> f64 {
        self.mean_diff.value()
    }

    pub fn reset(&mut self) {
        self.avg_diff.reset();
        self.mean_diff.reset();
    }
}

//! Per-tick processing: the single owner of every piece of stream state.

use log::{debug, info, warn};

use super::background::BackgroundModel;
use super::config::DetectorConfig;
use super::confirm::{MotionConfirmer, SuddenLightDetector};
use super::decider::DetectionDecider;
use super::error::DetectorError;
use super::event::{DetectionEvent, DetectionEventBuilder, EvidencePlanes};
use super::evidence::{EncodedEvidenceSink, EvidenceImage, EvidenceRaster, EvidenceSink};
use super::pause::{PauseController, PauseNotice, PauseState};
use super::segmenter::{ForegroundMask, ForegroundSegmenter};
use super::threshold::{AdaptiveThresholdEstimator, Thresholds};
use crate::core::video::{to_grayscale_into, Frame, GrayPlane};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Paused,
    InputUnavailable,
    MalformedFrame,
}

/// Numbers computed for one processed tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMetrics {
    pub frame_number: u64,
    pub timestamp_ms: u64,
    pub avg_abs_diff: f64,
    pub mean_diff: f64,
    pub changed_ratio: f64,
    pub thresholds: Thresholds,
    pub motion_counter: u32,
    pub sudden_light: bool,
    pub motion: bool,
}

#[derive(Debug)]
pub struct Detection {
    pub event: DetectionEvent,
    pub metrics: FrameMetrics,
    /// Evidence images that could not be rendered; the event is still valid.
    pub evidence_errors: Vec<DetectorError>,
}

#[derive(Debug)]
pub enum TickOutcome {
    Skipped(SkipReason),
    Processed(FrameMetrics),
    Detected(Box<Detection>),
}

impl TickOutcome {
    pub fn detection(&self) -> Option<&Detection> {
        match self {
            TickOutcome::Detected(d) => Some(d),
            _ => None,
        }
    }

    pub fn metrics(&self) -> Option<&FrameMetrics> {
        match self {
            TickOutcome::Processed(m) => Some(m),
            TickOutcome::Detected(d) => Some(&d.metrics),
            TickOutcome::Skipped(_) => None,
        }
    }
}

pub struct MotionEngine {
    config: DetectorConfig,
    sink: Box<dyn EvidenceSink>,
    background: BackgroundModel,
    estimator: AdaptiveThresholdEstimator,
    confirmer: MotionConfirmer,
    pause: PauseController,
    pause_notices: Vec<PauseNotice>,
    // frame buffers reused across ticks; `previous` is valid while `previous_mean` is set
    current: GrayPlane,
    previous: GrayPlane,
    previous_mean: Option<f64>,
    mask: ForegroundMask,
    reference_background: Option<EvidenceImage>,
    next_event_id: u64,
}

impl MotionEngine {
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        let sink = EncodedEvidenceSink::new(config.evidence_format);
        Self::with_sink(config, Box::new(sink))
    }

    pub fn with_sink(
        config: DetectorConfig,
        sink: Box<dyn EvidenceSink>,
    ) -> Result<Self, DetectorError> {
        config.validate()?;
        Ok(Self::build(config, sink))
    }

    fn build(config: DetectorConfig, sink: Box<dyn EvidenceSink>) -> Self {
        info!(
            "🎥 MotionEngine: created (fps={}, confirm_frames={}, pause={}ms)",
            config.target_fps, config.confirm_frames, config.pause_duration_ms
        );
        Self {
            background: BackgroundModel::new(config.background_alpha),
            estimator: AdaptiveThresholdEstimator::new(config.ema_alpha, config.sensitivity_factor),
            confirmer: MotionConfirmer::new(config.confirm_frames),
            pause: PauseController::new(config.pause_duration_ms, config.pause_notify_interval_ms),
            pause_notices: Vec::new(),
            current: GrayPlane::default(),
            previous: GrayPlane::default(),
            previous_mean: None,
            mask: ForegroundMask::default(),
            reference_background: None,
            next_event_id: 1,
            config,
            sink,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Runs one tick. Skipped ticks leave every piece of state untouched.
    pub fn process(&mut self, frame: Option<&Frame>, now_ms: u64) -> TickOutcome {
        if let Some(notice) = self.pause.expire(now_ms) {
            self.pause_notices.push(notice);
        }
        if self.pause.is_paused(now_ms) {
            return TickOutcome::Skipped(SkipReason::Paused);
        }
        let Some(frame) = frame else {
            return TickOutcome::Skipped(SkipReason::InputUnavailable);
        };
        if let Err(e) = to_grayscale_into(frame, &mut self.current) {
            debug!("MotionEngine: frame {} skipped: {}", frame.frame_number, e);
            return TickOutcome::Skipped(match e {
                DetectorError::MalformedFrame { .. } => SkipReason::MalformedFrame,
                _ => SkipReason::InputUnavailable,
            });
        }

        if matches!(self.background.plane(), Some(bg) if !bg.same_geometry(&self.current)) {
            info!(
                "📐 MotionEngine: frame geometry changed to {}x{}, reinitializing",
                self.current.width, self.current.height
            );
            self.reinitialize();
        }
        if self.background.initialize_if_absent(&self.current) {
            self.refresh_reference_background();
        }
        let Some(background) = self.background.plane() else {
            return TickOutcome::Skipped(SkipReason::InputUnavailable);
        };

        let current_mean = self.current.mean();
        let mean_diff = SuddenLightDetector::mean_diff(current_mean, self.previous_mean);
        let avg_abs_diff = ForegroundSegmenter::average_abs_diff(&self.current, background);
        let thresholds = self.estimator.observe(avg_abs_diff, mean_diff);

        let changed_ratio =
            ForegroundSegmenter::segment(&self.current, background, thresholds.pixel, &mut self.mask);
        let sudden_light = SuddenLightDetector::is_sudden(mean_diff, thresholds.sudden_light);
        let motion = self.confirmer.observe(changed_ratio, thresholds.sensitivity_ratio);
        let decision = DetectionDecider::decide(sudden_light, motion, &self.mask);

        let metrics = FrameMetrics {
            frame_number: frame.frame_number,
            timestamp_ms: now_ms,
            avg_abs_diff,
            mean_diff,
            changed_ratio,
            thresholds,
            motion_counter: self.confirmer.counter(),
            sudden_light,
            motion,
        };
        debug!(
            "MotionEngine: frame={} ratio={:.4} mean_diff={:.2} avg_diff={:.2} px_thr={} sens={:.4} light_thr={} counter={}",
            metrics.frame_number,
            changed_ratio,
            mean_diff,
            avg_abs_diff,
            thresholds.pixel,
            thresholds.sensitivity_ratio,
            thresholds.sudden_light,
            metrics.motion_counter
        );

        let detection = if decision.should_emit {
            let id = self.next_event_id;
            self.next_event_id += 1;

            let before = if self.previous_mean.is_some() {
                &self.previous
            } else {
                &self.current
            };
            let (event, evidence_errors) = DetectionEventBuilder::new(id, now_ms)
                .frame_number(frame.frame_number)
                .decision(&decision)
                .metrics(changed_ratio, mean_diff)
                .evidence(
                    self.sink.as_ref(),
                    EvidencePlanes {
                        before,
                        after: &self.current,
                        background,
                    },
                    self.config.evidence_output_size,
                )
                .build();

            info!(
                "🚨 MotionEngine: detection #{} (motion={}, sudden_light={}, ratio={:.4}, bbox={:?})",
                id, decision.motion, decision.sudden_light, changed_ratio, decision.bbox
            );

            self.background.hold_mask(
                &self.mask,
                now_ms.saturating_add(self.config.occlusion_hold_ms),
            );
            if let Some(notice) = self.pause.engage(now_ms) {
                self.pause_notices.push(notice);
            }

            Some(Detection {
                event,
                metrics,
                evidence_errors,
            })
        } else {
            None
        };

        self.background.update(&self.current, now_ms);
        std::mem::swap(&mut self.current, &mut self.previous);
        self.previous_mean = Some(current_mean);

        match detection {
            Some(d) => TickOutcome::Detected(Box::new(d)),
            None => TickOutcome::Processed(metrics),
        }
    }

    /// Makes `frame` the background right away. Statistics survive unless the
    /// geometry changes.
    pub fn reset_background(&mut self, frame: &Frame) -> Result<(), DetectorError> {
        to_grayscale_into(frame, &mut self.current)?;
        if matches!(self.background.plane(), Some(bg) if !bg.same_geometry(&self.current)) {
            self.reinitialize();
        }
        self.background.reset(&self.current);
        self.previous_mean = None;
        self.refresh_reference_background();
        Ok(())
    }

    /// Drops background, statistics, counters and any pause, as on a fresh start.
    pub fn cold_reset(&mut self) {
        self.reinitialize();
        self.reference_background = None;
        if let Some(notice) = self.pause.cancel() {
            self.pause_notices.push(notice);
        }
        info!("🧊 MotionEngine: cold reset");
    }

    /// Cancels a running pause without touching the scene model.
    pub fn cancel_pause(&mut self) {
        if let Some(notice) = self.pause.cancel() {
            self.pause_notices.push(notice);
        }
    }

    /// Pending pause notifications followed by the result of polling the
    /// pause deadline at `now_ms`.
    pub fn take_pause_notices(&mut self, now_ms: u64) -> Vec<PauseNotice> {
        let mut notices = std::mem::take(&mut self.pause_notices);
        if let Some(notice) = self.pause.poll(now_ms) {
            notices.push(notice);
        }
        notices
    }

    /// Pause state as of the last `process` or `take_pause_notices` call.
    pub fn pause_state(&self) -> PauseState {
        self.pause.state()
    }

    pub fn is_paused(&self, now_ms: u64) -> bool {
        self.pause.is_paused(now_ms)
    }

    pub fn pause_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.pause.remaining_ms(now_ms)
    }

    pub fn background(&self) -> Option<&GrayPlane> {
        self.background.plane()
    }

    /// Rendered background as of the last (re)initialization or reset.
    pub fn reference_background(&self) -> Option<&EvidenceImage> {
        self.reference_background.as_ref()
    }

    pub fn thresholds(&self) -> Thresholds {
        self.estimator.thresholds()
    }

    pub fn motion_counter(&self) -> u32 {
        self.confirmer.counter()
    }

    fn reinitialize(&mut self) {
        self.background.clear();
        self.estimator.reset();
        self.confirmer.reset();
        self.previous_mean = None;
    }

    fn refresh_reference_background(&mut self) {
        let Some(plane) = self.background.plane() else {
            return;
        };
        match self.sink.render(EvidenceRaster::from_plane(plane)) {
            Ok(image) => self.reference_background = Some(image),
            Err(e) => {
                warn!("⚠️ MotionEngine: reference background not rendered: {}", e);
                self.reference_background = None;
            }
        }
    }
}

impl Default for MotionEngine {
    fn default() -> Self {
        let config = DetectorConfig::default();
        let sink = EncodedEvidenceSink::new(config.evidence_format);
        Self::build(config, Box::new(sink))
    }
}

impl Drop for MotionEngine {
    fn drop(&mut self) {
        info!("🗑️ MotionEngine: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::motion::decider::BoundingBox;
    use assert_approx_eq::assert_approx_eq;

    fn create_test_frame(size: u32, base: u8, frame_number: u64) -> Frame {
        Frame::gray(size, size, vec![base; (size * size) as usize], frame_number * 100, frame_number)
    }

    fn frame_with_block(
        size: u32,
        base: u8,
        block: (u32, u32, u32, u32),
        value: u8,
        frame_number: u64,
    ) -> Frame {
        let mut frame = create_test_frame(size, base, frame_number);
        let (bx, by, bw, bh) = block;
        for y in by..by + bh {
            for x in bx..bx + bw {
                frame.data[(y * size + x) as usize] = value;
            }
        }
        frame
    }

    fn engine() -> MotionEngine {
        MotionEngine::default()
    }

    fn checkerboard(size: u32, low: u8, high: u8, frame_number: u64) -> Frame {
        let data = (0..size * size)
            .map(|i| if (i % size + i / size) % 2 == 0 { low } else { high })
            .collect();
        Frame::gray(size, size, data, frame_number * 100, frame_number)
    }

    #[test]
    fn test_static_scene_never_fires() {
        let mut engine = engine();
        for i in 0..20 {
            let outcome = engine.process(Some(&create_test_frame(64, 90, i)), i * 100);
            let metrics = outcome.metrics().unwrap();
            assert_eq!(metrics.changed_ratio, 0.0);
            assert!(outcome.detection().is_none());
        }
        assert!(engine.reference_background().is_some());
    }

    #[test]
    fn test_block_scenario() {
        let mut engine = engine();
        let block = (40, 40, 20, 20);

        assert!(engine.process(Some(&create_test_frame(100, 128, 0)), 0).detection().is_none());

        let first = engine.process(Some(&frame_with_block(100, 128, block, 220, 1)), 100);
        let metrics = first.metrics().unwrap();
        assert!(!metrics.motion);
        assert_eq!(metrics.motion_counter, 1);
        assert!(first.detection().is_none());

        let second = engine.process(Some(&frame_with_block(100, 128, block, 220, 2)), 200);
        let detection = second.detection().expect("second block frame must fire");
        assert!(detection.event.motion());
        assert!(!detection.event.sudden_light());
        assert_eq!(detection.metrics.motion_counter, 2);
        assert_eq!(
            detection.event.bbox(),
            Some(BoundingBox { x: 40, y: 40, w: 20, h: 20 })
        );
        assert!(detection.evidence_errors.is_empty());
        assert!(detection.event.marked_image().is_some());

        let third = engine.process(Some(&frame_with_block(100, 128, block, 220, 3)), 300);
        assert!(matches!(third, TickOutcome::Skipped(SkipReason::Paused)));
    }

    #[test]
    fn test_single_frame_spike_is_ignored() {
        let mut engine = engine();
        let block = (10, 10, 15, 15);
        engine.process(Some(&create_test_frame(64, 128, 0)), 0);

        let spike = engine.process(Some(&frame_with_block(64, 128, block, 250, 1)), 100);
        assert_eq!(spike.metrics().unwrap().motion_counter, 1);

        let revert = engine.process(Some(&create_test_frame(64, 128, 2)), 200);
        assert_eq!(revert.metrics().unwrap().motion_counter, 0);
        assert!(revert.detection().is_none());
    }

    #[test]
    fn test_sudden_light_fires_without_confirmation() {
        let mut engine = engine();
        // slight flicker gives the brightness statistic a baseline of 1
        for i in 0..4 {
            let flicker = create_test_frame(50, 100 + (i % 2) as u8, i);
            assert!(engine.process(Some(&flicker), i * 100).detection().is_none());
        }

        let outcome = engine.process(Some(&create_test_frame(50, 180, 4)), 400);
        let detection = outcome.detection().expect("light jump must fire");
        assert!(detection.event.sudden_light());
        assert!(!detection.event.motion());
        assert_approx_eq!(detection.event.mean_diff(), 79.0);
        assert_eq!(
            detection.event.bbox(),
            Some(BoundingBox { x: 0, y: 0, w: 50, h: 50 })
        );
    }

    #[test]
    fn test_no_events_during_pause_window() {
        let config = DetectorConfig {
            confirm_frames: 1,
            ..Default::default()
        };
        let mut engine = MotionEngine::new(config).unwrap();
        engine.process(Some(&create_test_frame(40, 50, 0)), 0);

        let intruder = frame_with_block(40, 50, (10, 10, 10, 10), 200, 1);
        let fired = engine.process(Some(&intruder), 1000);
        assert!(fired.detection().is_some());

        let background = engine.background().cloned();
        let thresholds = engine.thresholds();
        let counter = engine.motion_counter();

        for t in (1000..4000).step_by(100) {
            let outcome = engine.process(Some(&create_test_frame(40, 10, 2)), t);
            assert!(matches!(outcome, TickOutcome::Skipped(SkipReason::Paused)));
        }
        assert_eq!(engine.background().cloned(), background);
        assert_eq!(engine.thresholds(), thresholds);
        assert_eq!(engine.motion_counter(), counter);

        assert!(!matches!(
            engine.process(Some(&create_test_frame(40, 10, 3)), 4000),
            TickOutcome::Skipped(_)
        ));
    }

    #[test]
    fn test_detected_object_not_absorbed() {
        let mut engine = engine();
        let block = (40, 40, 20, 20);
        engine.process(Some(&create_test_frame(100, 128, 0)), 0);
        engine.process(Some(&frame_with_block(100, 128, block, 220, 1)), 100);
        assert_eq!(engine.background().unwrap().data[45 * 100 + 45], 130);

        let fired = engine.process(Some(&frame_with_block(100, 128, block, 220, 2)), 200);
        assert!(fired.detection().is_some());
        let bg = engine.background().unwrap();
        assert_eq!(bg.data[45 * 100 + 45], 130);
        assert_eq!(bg.data[0], 128);
    }

    #[test]
    fn test_reset_background_mid_stream() {
        let mut engine = engine();
        for i in 0..3 {
            engine.process(Some(&create_test_frame(32, 128, i)), i * 100);
        }
        let before_reset = engine.reference_background().cloned();

        engine.reset_background(&create_test_frame(32, 60, 3)).unwrap();
        assert!(engine.background().unwrap().data.iter().all(|&v| v == 60));
        assert_ne!(engine.reference_background().cloned(), before_reset);

        let same = engine.process(Some(&create_test_frame(32, 60, 4)), 400);
        assert_eq!(same.metrics().unwrap().changed_ratio, 0.0);

        let other = engine.process(Some(&create_test_frame(32, 128, 5)), 500);
        let metrics = other.metrics().unwrap();
        assert_approx_eq!(metrics.avg_abs_diff, 68.0);
        assert_approx_eq!(metrics.mean_diff, 68.0);
    }

    #[test]
    fn test_missing_and_malformed_frames_skip() {
        let mut engine = engine();
        assert!(matches!(
            engine.process(None, 0),
            TickOutcome::Skipped(SkipReason::InputUnavailable)
        ));
        let empty = Frame::gray(0, 0, vec![], 0, 0);
        assert!(matches!(
            engine.process(Some(&empty), 0),
            TickOutcome::Skipped(SkipReason::InputUnavailable)
        ));
        let broken = Frame::gray(10, 10, vec![1, 2, 3], 0, 0);
        assert!(matches!(
            engine.process(Some(&broken), 0),
            TickOutcome::Skipped(SkipReason::MalformedFrame)
        ));
        assert!(engine.background().is_none());
        assert!(engine.reference_background().is_none());
    }

    #[test]
    fn test_geometry_change_reinitializes() {
        let mut engine = engine();
        engine.process(Some(&create_test_frame(100, 128, 0)), 0);
        engine.process(
            Some(&frame_with_block(100, 128, (0, 0, 30, 30), 250, 1)),
            100,
        );
        assert_eq!(engine.motion_counter(), 1);

        let resized = engine.process(Some(&create_test_frame(50, 30, 2)), 200);
        let metrics = resized.metrics().unwrap();
        assert_eq!(metrics.changed_ratio, 0.0);
        assert_eq!(metrics.mean_diff, 0.0);
        assert_eq!(engine.motion_counter(), 0);
        let bg = engine.background().unwrap();
        assert_eq!((bg.width, bg.height), (50, 50));
    }

    #[test]
    fn test_pause_notices_and_cold_reset() {
        let config = DetectorConfig {
            confirm_frames: 1,
            pause_duration_ms: 1000,
            ..Default::default()
        };
        let mut engine = MotionEngine::new(config).unwrap();
        engine.process(Some(&create_test_frame(20, 0, 0)), 0);
        let fired = engine.process(Some(&frame_with_block(20, 0, (0, 0, 5, 5), 255, 1)), 100);
        assert!(fired.detection().is_some());

        let notices = engine.take_pause_notices(100);
        assert_eq!(
            notices,
            vec![PauseNotice {
                paused: true,
                remaining_ms: Some(1000)
            }]
        );
        assert_eq!(engine.pause_remaining_ms(600), Some(500));

        engine.cold_reset();
        assert!(!engine.is_paused(200));
        assert!(engine.background().is_none());
        let notices = engine.take_pause_notices(200);
        assert_eq!(
            notices,
            vec![PauseNotice {
                paused: false,
                remaining_ms: None
            }]
        );
    }

    #[test]
    fn test_steady_sensor_noise_does_not_fire() {
        let mut engine = engine();
        engine.process(Some(&create_test_frame(50, 128, 0)), 0);

        for i in 1..10 {
            let outcome = engine.process(Some(&checkerboard(50, 118, 138, i)), i * 100);
            let metrics = outcome.metrics().unwrap();
            assert_eq!(metrics.changed_ratio, 0.0);
            assert!(outcome.detection().is_none());
        }
        // the first noisy tick seeds the noise statistic at 10
        assert_eq!(engine.thresholds().pixel, 25);
        assert_eq!(engine.motion_counter(), 0);
    }

    #[test]
    fn test_pause_expires_on_next_processed_tick() {
        let config = DetectorConfig {
            confirm_frames: 1,
            pause_duration_ms: 500,
            ..Default::default()
        };
        let mut engine = MotionEngine::new(config).unwrap();
        engine.process(Some(&create_test_frame(20, 0, 0)), 0);
        engine.process(Some(&frame_with_block(20, 0, (0, 0, 5, 5), 255, 1)), 100);
        engine.take_pause_notices(100);
        assert_eq!(engine.pause_state(), PauseState::Paused { end_ms: 600 });

        let resumed = engine.process(Some(&create_test_frame(20, 0, 2)), 600);
        assert!(!matches!(resumed, TickOutcome::Skipped(_)));
        assert_eq!(engine.pause_state(), PauseState::Active);
        assert_eq!(
            engine.take_pause_notices(600),
            vec![PauseNotice {
                paused: false,
                remaining_ms: None
            }]
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DetectorConfig {
            confirm_frames: 0,
            ..Default::default()
        };
        assert!(matches!(
            MotionEngine::new(config),
            Err(DetectorError::InvalidConfig(_))
        ));
    }
}

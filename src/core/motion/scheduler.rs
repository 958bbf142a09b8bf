use log::{debug, info, warn};

use super::config::DetectorConfig;
use super::error::DetectorError;
use super::engine::{MotionEngine, TickOutcome};
use super::pause::PauseNotice;
use crate::core::video::Frame;

/// What happened on one driver tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// `None` when the tick was gated out or the scheduler is stopped.
    pub outcome: Option<TickOutcome>,
    pub pause_notices: Vec<PauseNotice>,
    pub background_reset: bool,
}

/// Drives a [`MotionEngine`] at the configured cadence.
///
/// The host calls [`tick`](Self::tick) as often as it likes with the latest
/// frame and a monotonic timestamp; frames arriving faster than
/// `target_fps` are dropped without touching engine state.
pub struct TickScheduler {
    engine: MotionEngine,
    frame_interval_ms: u64,
    running: bool,
    /// Set by `stop`, so the next `start` rebuilds the scene from scratch.
    needs_cold_start: bool,
    last_tick_ms: u64,
    reset_requested: bool,
}

impl TickScheduler {
    pub fn new(engine: MotionEngine) -> Self {
        let frame_interval_ms = engine.config().frame_interval_ms();
        Self {
            engine,
            frame_interval_ms,
            running: false,
            needs_cold_start: false,
            last_tick_ms: 0,
            reset_requested: false,
        }
    }

    pub fn with_config(config: DetectorConfig) -> Result<Self, DetectorError> {
        Ok(Self::new(MotionEngine::new(config)?))
    }

    pub fn engine(&self) -> &MotionEngine {
        &self.engine
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self, now_ms: u64) {
        if self.running {
            return;
        }
        if self.needs_cold_start {
            self.engine.cold_reset();
            self.needs_cold_start = false;
        }
        self.running = true;
        self.last_tick_ms = now_ms;
        info!("▶️ TickScheduler: started at {} ms", now_ms);
    }

    /// Stops processing and clears any pending pause or reset request.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.reset_requested = false;
        self.needs_cold_start = true;
        self.engine.cancel_pause();
        info!("⏹️ TickScheduler: stopped");
    }

    /// Edge-triggered: the next delivered frame becomes the background.
    pub fn request_background_reset(&mut self) {
        self.reset_requested = true;
    }

    pub fn tick(&mut self, frame: Option<&Frame>, now_ms: u64) -> TickReport {
        let mut report = TickReport::default();

        if self.running && self.reset_requested {
            if let Some(frame) = frame {
                match self.engine.reset_background(frame) {
                    Ok(()) => {
                        self.reset_requested = false;
                        report.background_reset = true;
                    }
                    Err(e) => warn!("⚠️ TickScheduler: background reset deferred: {}", e),
                }
            }
        }

        if self.running && now_ms.saturating_sub(self.last_tick_ms) >= self.frame_interval_ms {
            self.last_tick_ms = now_ms;
            let outcome = self.engine.process(frame, now_ms);
            if let TickOutcome::Skipped(reason) = &outcome {
                debug!("TickScheduler: tick at {} ms skipped ({:?})", now_ms, reason);
            }
            report.outcome = Some(outcome);
        }

        report.pause_notices = self.engine.take_pause_notices(now_ms);
        report
    }
}

//! 自适应背景差分运动检测 - adaptive background-subtraction motion detector
//!
//! Per tick:
//! 1. grayscale conversion of the delivered frame
//! 2. noise / brightness statistics feed self-tuning thresholds
//! 3. foreground segmentation against the running background
//! 4. debounced motion + instantaneous sudden-light signals
//! 5. on detection: evidence-backed event, post-detection pause, occlusion mask
//! 6. background update, skipping masked pixels

pub mod background;
pub mod config;
pub mod confirm;
pub mod decider;
pub mod engine;
pub mod error;
pub mod event;
pub mod evidence;
pub mod pause;
pub mod scheduler;
pub mod segmenter;
pub mod threshold;

pub use background::BackgroundModel;
pub use config::{DetectorConfig, EvidenceFormat};
pub use confirm::{MotionConfirmer, SuddenLightDetector};
pub use decider::{bbox_from_mask, BoundingBox, Decision, DetectionDecider};
pub use engine::{Detection, FrameMetrics, MotionEngine, SkipReason, TickOutcome};
pub use error::DetectorError;
pub use event::{DetectionEvent, DetectionEventBuilder, EvidencePlanes};
pub use evidence::{EncodedEvidenceSink, EvidenceImage, EvidenceRaster, EvidenceSink};
pub use pause::{PauseController, PauseNotice, PauseState};
pub use scheduler::{TickReport, TickScheduler};
pub use segmenter::{ForegroundMask, ForegroundSegmenter};
pub use threshold::{AdaptiveThresholdEstimator, RunningStatistic, Thresholds};

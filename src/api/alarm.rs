//! 运动报警相机

use log::info;
use serde::Serialize;

use crate::core::motion::{
    DetectionEvent, DetectorConfig, DetectorError, EvidenceImage, EvidenceSink, MotionEngine,
    TickOutcome, TickScheduler,
};
use crate::core::video::Frame;

/// Collaborator receiving detections and pause countdown updates.
pub trait AlarmHandler {
    /// `evidence_errors` lists the evidence images that could not be
    /// rendered; the matching image fields of `event` are empty.
    fn on_detection(&mut self, event: &DetectionEvent, evidence_errors: &[DetectorError]);

    fn on_pause_change(&mut self, _paused: bool, _remaining_ms: Option<u64>) {}
}

/// 处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmStats {
    pub processed_frames: u64,
    pub skipped_frames: u64,
    pub detections: u64,
    pub evidence_failures: u64,
}

/// 运动报警相机 - 背景差分 + 自适应阈值
///
/// ```ignore
/// let mut camera = AlarmCamera::create();
/// camera.start(now_ms);
/// camera.push_frame(Some(frame), now_ms, &mut handler);
/// let stats = camera.stats();
/// ```
pub struct AlarmCamera {
    scheduler: TickScheduler,
    stats: AlarmStats,
}

impl AlarmCamera {
    /// 使用默认配置创建
    pub fn create() -> Self {
        Self::from_scheduler(TickScheduler::new(MotionEngine::default()))
    }

    /// 使用自定义配置创建
    pub fn with_config(config: DetectorConfig) -> Result<Self, DetectorError> {
        Ok(Self::from_scheduler(TickScheduler::with_config(config)?))
    }

    /// 使用自定义证据图输出
    pub fn with_sink(
        config: DetectorConfig,
        sink: Box<dyn EvidenceSink>,
    ) -> Result<Self, DetectorError> {
        let engine = MotionEngine::with_sink(config, sink)?;
        Ok(Self::from_scheduler(TickScheduler::new(engine)))
    }

    fn from_scheduler(scheduler: TickScheduler) -> Self {
        info!("📷 AlarmCamera: created");
        Self {
            scheduler,
            stats: AlarmStats::default(),
        }
    }

    /// 开始处理
    pub fn start(&mut self, now_ms: u64) {
        self.scheduler.start(now_ms);
    }

    /// 停止处理，清除暂停
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// 下一帧作为新背景
    pub fn request_background_reset(&mut self) {
        self.scheduler.request_background_reset();
    }

    /// 推送一帧（`None` 表示相机暂无画面）
    pub fn push_frame(
        &mut self,
        frame: Option<Frame>,
        now_ms: u64,
        handler: &mut dyn AlarmHandler,
    ) {
        let report = self.scheduler.tick(frame.as_ref(), now_ms);

        match &report.outcome {
            Some(TickOutcome::Skipped(_)) => self.stats.skipped_frames += 1,
            Some(TickOutcome::Processed(_)) => self.stats.processed_frames += 1,
            Some(TickOutcome::Detected(detection)) => {
                self.stats.processed_frames += 1;
                self.stats.detections += 1;
                self.stats.evidence_failures += detection.evidence_errors.len() as u64;
                info!(
                    "🚨 AlarmCamera: detection #{} (motion={}, sudden_light={})",
                    detection.event.id(),
                    detection.event.motion(),
                    detection.event.sudden_light()
                );
                handler.on_detection(&detection.event, &detection.evidence_errors);
            }
            None => {}
        }

        for notice in &report.pause_notices {
            handler.on_pause_change(notice.paused, notice.remaining_ms);
        }
    }

    pub fn stats(&self) -> AlarmStats {
        self.stats
    }

    /// 当前参考背景图
    pub fn reference_background(&self) -> Option<&EvidenceImage> {
        self.scheduler.engine().reference_background()
    }
}

impl Drop for AlarmCamera {
    fn drop(&mut self) {
        info!("🗑️ AlarmCamera: released");
    }
}

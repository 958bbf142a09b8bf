//! Running background estimate with an optional occlusion mask.

use log::info;

use super::segmenter::ForegroundMask;
use crate::core::video::GrayPlane;

/// Foreground mask kept alive after a detection so the detected object is
/// not blended into the background while it is still in view.
struct OcclusionMask {
    mask: ForegroundMask,
    expires_at_ms: u64,
}

pub struct BackgroundModel {
    alpha: f64,
    plane: Option<GrayPlane>,
    occlusion: Option<OcclusionMask>,
    /// Buffer of the last expired mask, kept to avoid reallocating on the next hold.
    spare_mask: Option<ForegroundMask>,
}

impl BackgroundModel {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            plane: None,
            occlusion: None,
            spare_mask: None,
        }
    }

    pub fn plane(&self) -> Option<&GrayPlane> {
        self.plane.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.plane.is_some()
    }

    /// Seeds the background from `frame` if none exists yet. Returns true when
    /// a new background was installed.
    pub fn initialize_if_absent(&mut self, frame: &GrayPlane) -> bool {
        if self.plane.is_some() {
            return false;
        }
        info!(
            "🖼️ BackgroundModel: initialized from {}x{} frame",
            frame.width, frame.height
        );
        self.plane = Some(frame.clone());
        true
    }

    /// Replaces the background with `frame` immediately and drops any
    /// occlusion mask.
    pub fn reset(&mut self, frame: &GrayPlane) {
        match self.plane.as_mut() {
            Some(plane) => plane.copy_from(frame),
            None => self.plane = Some(frame.clone()),
        }
        self.release_mask();
        info!(
            "🔄 BackgroundModel: reset to {}x{} frame",
            frame.width, frame.height
        );
    }

    /// Forgets everything, including buffers.
    pub fn clear(&mut self) {
        self.plane = None;
        self.occlusion = None;
        self.spare_mask = None;
    }

    /// Shields the pixels set in `mask` from updates until `expires_at_ms`.
    pub fn hold_mask(&mut self, mask: &ForegroundMask, expires_at_ms: u64) {
        let mut held = self
            .occlusion
            .take()
            .map(|o| o.mask)
            .or_else(|| self.spare_mask.take())
            .unwrap_or_default();
        held.copy_from(mask);
        self.occlusion = Some(OcclusionMask {
            mask: held,
            expires_at_ms,
        });
    }

    /// The occlusion mask if it is still live at `now_ms`; an expired mask is
    /// discarded here.
    pub fn active_mask(&mut self, now_ms: u64) -> Option<&ForegroundMask> {
        if matches!(&self.occlusion, Some(o) if now_ms >= o.expires_at_ms) {
            self.release_mask();
        }
        self.occlusion.as_ref().map(|o| &o.mask)
    }

    fn release_mask(&mut self) {
        if let Some(o) = self.occlusion.take() {
            self.spare_mask = Some(o.mask);
        }
    }

    /// Blends `frame` into the background, skipping pixels covered by a live
    /// occlusion mask.
    pub fn update(&mut self, frame: &GrayPlane, now_ms: u64) {
        self.active_mask(now_ms);
        let alpha = self.alpha;
        let Some(plane) = self.plane.as_mut() else {
            return;
        };
        if !plane.same_geometry(frame) {
            return;
        }

        let keep = 1.0 - alpha;
        let blend = |bg: &mut u8, cur: u8| {
            // convex combination of two values in [0, 255] stays in range
            *bg = (keep * *bg as f64 + alpha * cur as f64).round() as u8;
        };

        match self.occlusion.as_ref() {
            Some(occlusion) if occlusion.mask.len() == plane.data.len() => {
                for ((bg, &cur), &masked) in plane
                    .data
                    .iter_mut()
                    .zip(frame.data.iter())
                    .zip(occlusion.mask.bits().iter())
                {
                    if masked == 0 {
                        blend(bg, cur);
                    }
                }
            }
            _ => {
                for (bg, &cur) in plane.data.iter_mut().zip(frame.data.iter()) {
                    blend(bg, cur);
                }
            }
        }
    }
}

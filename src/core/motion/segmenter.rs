use crate::core::video::GrayPlane;

/// Per-pixel foreground marks (0 or 1) for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForegroundMask {
    pub width: u32,
    pub height: u32,
    bits: Vec<u8>,
    changed: usize,
}

impl ForegroundMask {
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changed == 0
    }

    pub fn changed_count(&self) -> usize {
        self.changed
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        let idx = y as usize * self.width as usize + x as usize;
        self.bits.get(idx).copied().unwrap_or(0) != 0
    }

    pub fn changed_ratio(&self) -> f64 {
        if self.bits.is_empty() {
            return 0.0;
        }
        self.changed as f64 / self.bits.len() as f64
    }

    pub(crate) fn copy_from(&mut self, other: &ForegroundMask) {
        self.width = other.width;
        self.height = other.height;
        self.changed = other.changed;
        self.bits.clear();
        self.bits.extend_from_slice(&other.bits);
    }
}

pub struct ForegroundSegmenter;

impl ForegroundSegmenter {
    /// Marks every pixel whose distance to the background exceeds
    /// `pixel_threshold` and returns the changed-pixel ratio.
    ///
    /// `mask` is resized to the frame geometry and overwritten in place.
    pub fn segment(
        current: &GrayPlane,
        background: &GrayPlane,
        pixel_threshold: u8,
        mask: &mut ForegroundMask,
    ) -> f64 {
        mask.width = current.width;
        mask.height = current.height;
        mask.bits.resize(current.data.len(), 0);

        let mut changed = 0usize;
        for ((bit, &cur), &bg) in mask
            .bits
            .iter_mut()
            .zip(current.data.iter())
            .zip(background.data.iter())
        {
            let hit = cur.abs_diff(bg) > pixel_threshold;
            *bit = hit as u8;
            changed += hit as usize;
        }
        mask.changed = changed;

        mask.changed_ratio()
    }

    /// Mean absolute per-pixel distance between `current` and `background`.
    pub fn average_abs_diff(current: &GrayPlane, background: &GrayPlane) -> f64 {
        if current.data.is_empty() {
            return 0.0;
        }
        let sum: u64 = current
            .data
            .iter()
            .zip(background.data.iter())
            .map(|(&c, &b)| c.abs_diff(b) as u64)
            .sum();
        sum as f64 / current.data.len() as f64
    }
}

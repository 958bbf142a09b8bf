use serde::{Deserialize, Serialize};

use super::segmenter::ForegroundMask;

/// Pixel rectangle covering a detected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub sudden_light: bool,
    pub motion: bool,
    pub should_emit: bool,
    /// Only computed when `should_emit` is true.
    pub bbox: Option<BoundingBox>,
}

pub struct DetectionDecider;

impl DetectionDecider {
    pub fn decide(sudden_light: bool, motion_confirmed: bool, mask: &ForegroundMask) -> Decision {
        let should_emit = sudden_light || motion_confirmed;
        Decision {
            sudden_light,
            motion: motion_confirmed,
            should_emit,
            bbox: if should_emit { bbox_from_mask(mask) } else { None },
        }
    }
}

/// Tight rectangle around every set pixel, `None` for an empty mask.
pub fn bbox_from_mask(mask: &ForegroundMask) -> Option<BoundingBox> {
    if mask.is_empty() || mask.width == 0 {
        return None;
    }
    let width = mask.width as usize;
    let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
    let (mut max_x, mut max_y) = (0usize, 0usize);

    for (row_idx, row) in mask.bits().chunks_exact(width).enumerate() {
        let Some(first) = row.iter().position(|&b| b != 0) else {
            continue;
        };
        // a row with a first hit always has a last hit
        let last = row.iter().rposition(|&b| b != 0).unwrap_or(first);
        min_x = min_x.min(first);
        max_x = max_x.max(last);
        min_y = min_y.min(row_idx);
        max_y = row_idx;
    }

    if min_y == usize::MAX {
        return None;
    }
    Some(BoundingBox {
        x: min_x as u32,
        y: min_y as u32,
        w: (max_x - min_x + 1) as u32,
        h: (max_y - min_y + 1) as u32,
    })
}

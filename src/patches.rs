use std::fmt;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::config::PatchGridConfig;
use crate::types::Rect;

/// A patch is identified by its frame and its frame-absolute region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatchId {
    pub frame_id: i32,
    pub roi: Rect,
}

impl PatchId {
    pub fn new(frame_id: i32, roi: Rect) -> PatchId {
        PatchId { frame_id, roi }
    }

    /// Top-left corner of the patch in its frame.
    pub fn offset(&self) -> IVec2 {
        IVec2::new(self.roi.x, self.roi.y)
    }
}

impl fmt::Display for PatchId {
    /// `N<frame>@<x>@<y>@<x2>@<y2>`, four-digit zero padded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N{:04}@{:04}@{:04}@{:04}@{:04}",
            self.frame_id,
            self.roi.x,
            self.roi.y,
            self.roi.right(),
            self.roi.bottom()
        )
    }
}

/// Cuts a `width x height` frame into overlapping patches.
///
/// Patch size is `round(width * patch_fraction_x)` by
/// `round(height * patch_fraction_y)`, the stride is that size times the
/// stride fraction. Patches are listed column by column and never cross the
/// frame border.
pub fn tile_frame(frame_id: i32, width: i32, height: i32, config: &PatchGridConfig) -> Vec<PatchId> {
    let w = (width as f64 * config.patch_fraction_x).round() as i32;
    let h = (height as f64 * config.patch_fraction_y).round() as i32;
    let dx = (w as f64 * config.stride_fraction_x).round() as i32;
    let dy = (h as f64 * config.stride_fraction_y).round() as i32;
    if w <= 0 || h <= 0 || dx <= 0 || dy <= 0 {
        return Vec::new();
    }

    let mut patches = Vec::new();
    let mut x = 0;
    while x + w <= width {
        let mut y = 0;
        while y + h <= height {
            patches.push(PatchId::new(frame_id, Rect::new(x, y, w, h)));
            y += dy;
        }
        x += dx;
    }
    patches
}

// Physical-scale projection: how many player-display pixels one map pixel needs
// so that a tile lands on the table at its real size in millimeters.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::metadata::MapMetadata;

/// Axis ratios differing by more than this (relative) count as non-square pixels.
const PITCH_TOLERANCE: f64 = 0.005;

/// Resolution and physical size of a display. Comes from configuration, so
/// nothing here is trusted until [`pixels_per_mm`] has checked it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayGeometry {
    pub width_px: u32,
    pub height_px: u32,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Pixels per millimeter along each axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelPitch {
    pub horizontal: f64,
    pub vertical: f64,
}

impl PixelPitch {
    /// The smaller axis, so neither axis is stretched.
    pub fn uniform(&self) -> f64 {
        self.horizontal.min(self.vertical)
    }

    pub fn is_uniform(&self) -> bool {
        let hi = self.horizontal.max(self.vertical);
        (hi - self.uniform()) / hi <= PITCH_TOLERANCE
    }
}

/// Per-axis pixels/mm for a display. Zero, negative or non-finite inputs are
/// a configuration problem (usually an EDID that reported no physical size).
pub fn pixels_per_mm(display: &DisplayGeometry) -> Result<PixelPitch> {
    if display.width_px == 0 || display.height_px == 0 {
        return Err(Error::config(format!(
            "display resolution unknown ({}x{} px)",
            display.width_px, display.height_px
        )));
    }
    for (axis, mm) in [("width", display.width_mm), ("height", display.height_mm)] {
        if !(mm.is_finite() && mm > 0.0) {
            return Err(Error::config(format!("display physical {axis} unknown or invalid ({mm} mm)")));
        }
    }

    let pitch = PixelPitch {
        horizontal: display.width_px as f64 / display.width_mm,
        vertical: display.height_px as f64 / display.height_mm,
    };
    if !(pitch.horizontal.is_finite() && pitch.vertical.is_finite()) {
        return Err(Error::config("display pixel pitch is not finite"));
    }
    Ok(pitch)
}

/// Scale for one map/display pairing, computed once and cached in the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayScale {
    pub pixels_per_mm: f64,
    /// Display pixels covered by one tile.
    pub pixels_per_tile: f64,
    /// Display pixels per source-image pixel.
    pub map_scale: f64,
    /// Set when the display's pixels are not square; we used the smaller axis.
    pub non_uniform: bool,
}

impl DisplayScale {
    pub fn compute(display: &DisplayGeometry, meta: &MapMetadata) -> Result<Self> {
        if !(meta.tile_size_mm.is_finite() && meta.tile_size_mm > 0.0) {
            return Err(Error::config(format!("tile size must be positive, got {} mm", meta.tile_size_mm)));
        }
        if meta.tile_pixels == 0 {
            return Err(Error::config("tile pixels must be at least 1"));
        }

        let pitch = pixels_per_mm(display)?;
        let non_uniform = !pitch.is_uniform();
        if non_uniform {
            warn!(
                horizontal = pitch.horizontal,
                vertical = pitch.vertical,
                "non-square display pixels, using the smaller pitch on both axes"
            );
        }

        let pixels_per_mm = pitch.uniform();
        let pixels_per_tile = pixels_per_mm * meta.tile_size_mm;
        Ok(Self {
            pixels_per_mm,
            pixels_per_tile,
            map_scale: pixels_per_tile / meta.tile_pixels as f64,
            non_uniform,
        })
    }
}

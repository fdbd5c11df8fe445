// Per-map metadata: tile grid, physical tile size and the initial fog/viewport.
// Created when a map is imported and only changed by explicit DM edits.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Point, Rotation, Size};

/// Default physical tile size: one inch.
pub const DEFAULT_TILE_SIZE_MM: f64 = 25.4;
/// Default source-image pixels per tile (common VTT export size).
pub const DEFAULT_TILE_PIXELS: u32 = 70;

/// What the fog looks like before the DM touches it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FogFill {
    #[default]
    Hidden,
    Revealed,
}

/// Where the player viewport starts (map-space pan + rotation).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportPlacement {
    pub pan_x: f64,
    pub pan_y: f64,
    #[serde(default)]
    pub rotation: Rotation,
}

impl ViewportPlacement {
    pub fn pan(&self) -> Point {
        Point::new(self.pan_x, self.pan_y)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapMetadata {
    pub columns: u32,
    pub rows: u32,
    /// Source image pixels covered by one tile.
    pub tile_pixels: u32,
    /// Physical size of one tile on the table.
    pub tile_size_mm: f64,
    /// Image size at import time; the fog grid uses exactly these dimensions.
    pub width_px: u32,
    pub height_px: u32,
    pub initial_fog: FogFill,
    pub initial_viewport: ViewportPlacement,
}

impl MapMetadata {
    /// Build metadata for an image of `size` once the tile scale is known.
    pub fn for_image(size: Size, tile_pixels: u32, tile_size_mm: f64) -> Result<Self> {
        if size.is_empty() {
            return Err(Error::config(format!("map image has no pixels ({size})")));
        }
        if tile_pixels == 0 {
            return Err(Error::config("tile pixels must be at least 1"));
        }
        validate_tile_mm(tile_size_mm)?;

        Ok(Self {
            columns: size.width.div_ceil(tile_pixels),
            rows: size.height.div_ceil(tile_pixels),
            tile_pixels,
            tile_size_mm,
            width_px: size.width,
            height_px: size.height,
            initial_fog: FogFill::Hidden,
            initial_viewport: ViewportPlacement::default(),
        })
    }

    /// Check a record read back from disk: a usable grid and tile scale.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size().is_empty() {
            return Err(Error::config(format!("map has no pixels ({})", self.grid_size())));
        }
        if self.tile_pixels == 0 {
            return Err(Error::config("tile pixels must be at least 1"));
        }
        validate_tile_mm(self.tile_size_mm)
    }

    /// Fog grid dimensions (one cell per map pixel).
    pub fn grid_size(&self) -> Size {
        Size::new(self.width_px, self.height_px)
    }
}

/// The ways a DM can tell us how big a tile is in the source image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TileCalibration {
    /// Pixels per tile measured directly.
    PixelsPerTile { tile_pixels: u32, tile_size_mm: f64 },
    /// The printed width of the whole image in mm.
    ImageWidthMm { width_mm: f64, tile_size_mm: f64 },
    /// How many tiles span the image horizontally.
    TilesAcross { columns: u32, tile_size_mm: f64 },
}

impl TileCalibration {
    pub fn tile_size_mm(&self) -> f64 {
        match *self {
            TileCalibration::PixelsPerTile { tile_size_mm, .. }
            | TileCalibration::ImageWidthMm { tile_size_mm, .. }
            | TileCalibration::TilesAcross { tile_size_mm, .. } => tile_size_mm,
        }
    }

    /// Resolve pixels per tile for an image `image_width` pixels wide (at least 1).
    pub fn tile_pixels(&self, image_width: u32) -> Result<u32> {
        validate_tile_mm(self.tile_size_mm())?;
        let px = match *self {
            TileCalibration::PixelsPerTile { tile_pixels, .. } => tile_pixels as f64,
            TileCalibration::ImageWidthMm { width_mm, tile_size_mm } => {
                if !(width_mm.is_finite() && width_mm > 0.0) {
                    return Err(Error::config(format!("image width must be positive, got {width_mm} mm")));
                }
                let ppmm = image_width as f64 / width_mm;
                (ppmm * tile_size_mm).round()
            }
            TileCalibration::TilesAcross { columns, .. } => {
                if columns == 0 {
                    return Err(Error::config("tiles across must be at least 1"));
                }
                (image_width as f64 / columns as f64).round()
            }
        };
        Ok((px as u32).max(1))
    }

    /// Metadata for an image of `size` using this calibration.
    pub fn metadata_for(&self, size: Size) -> Result<MapMetadata> {
        MapMetadata::for_image(size, self.tile_pixels(size.width)?, self.tile_size_mm())
    }
}

fn validate_tile_mm(tile_size_mm: f64) -> Result<()> {
    if tile_size_mm.is_finite() && tile_size_mm > 0.0 {
        Ok(())
    } else {
        Err(Error::config(format!("tile size must be positive, got {tile_size_mm} mm")))
    }
}

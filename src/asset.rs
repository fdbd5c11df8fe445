// Decodes a map image into a buffer suitable for the windows.
// Visual expectation: `pixels` is a Vec<u32> where each pixel is 0x00RRGGBB,
// the same packing the minifb frames use, so rendering is a plain copy/sample.

use std::path::Path;

use image::RgbImage;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::{rgb, Size};

/// An immutable decoded map image. Owned by its map; read-only everywhere else.
#[derive(Clone, Debug, PartialEq)]
pub struct MapAsset {
    /// Where it came from (session-relative image path).
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl MapAsset {
    /// Decode any format the `image` crate understands. Decode failures mean the map is unusable.
    pub fn load(path: &Path, source: impl Into<String>) -> Result<Self> {
        let img = image::open(path).map_err(|e| Error::AssetLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let asset = Self::from_rgb(source, &img.to_rgb8());
        info!(source = %asset.source, size = %asset.size(), "map image decoded");
        Ok(asset)
    }

    /// Pack an RGB image as 0x00RRGGBB.
    pub fn from_rgb(source: impl Into<String>, img: &RgbImage) -> Self {
        let (w, h) = img.dimensions();
        let mut pixels = Vec::with_capacity(w as usize * h as usize);
        for pixel in img.pixels() {
            pixels.push(rgb(pixel[0], pixel[1], pixel[2]));
        }
        Self { source: source.into(), width: w, height: h, pixels }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}

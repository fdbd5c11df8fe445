// Core geometry and pixel types shared by every module.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A software frame ready to push to a minifb window.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,     // how wide the frame is on screen (pixels)
    pub height: usize,    // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>, // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// A frame filled with one color.
    pub fn filled(size: Size, color: u32) -> Self {
        Self {
            width: size.width as usize,
            height: size.height as usize,
            pixels: vec![color; size.width as usize * size.height as usize],
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }
}

/// Width/height in whole pixels (map pixels, screen pixels or mask cells).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A continuous position or delta. Map space puts pixel (x, y) on [x, x+1) x [y, y+1).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle in continuous coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MapRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl MapRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanned by two corners given in any order (drag start/end).
    pub fn from_corners(a: Point, b: Point) -> Self {
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        Self::new(left, top, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive on every edge.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// Quarter-turn rotation of the player output, clockwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn cw(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    pub fn ccw(self) -> Self {
        self.cw().cw().cw()
    }

    /// True when the map's width runs along the screen's vertical axis.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(deg: u16) -> std::result::Result<Self, Self::Error> {
        match deg {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(format!("rotation must be 0, 90, 180 or 270, got {other}")),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> u16 {
        r.degrees()
    }
}

/// Pack 8-bit channels as 0x00RRGGBB.
#[inline]
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_cycles_back_after_four_turns() {
        for r in Rotation::ALL {
            assert_eq!(r.cw().cw().cw().cw(), r);
            assert_eq!(r.cw().ccw(), r);
        }
    }

    #[test]
    fn rotation_serializes_as_degrees() {
        let json = serde_json::to_string(&Rotation::Deg270).unwrap();
        assert_eq!(json, "270");
        let back: Rotation = serde_json::from_str("90").unwrap();
        assert_eq!(back, Rotation::Deg90);
        assert!(serde_json::from_str::<Rotation>("45").is_err());
    }

    #[test]
    fn rect_from_corners_normalizes_order() {
        let r = MapRect::from_corners(Point::new(10.0, 40.0), Point::new(2.0, 5.0));
        assert_eq!(r, MapRect::new(2.0, 5.0, 8.0, 35.0));
        assert!(r.contains(Point::new(10.0, 40.0)));
        assert!(!r.contains(Point::new(10.1, 40.0)));
    }
}

// Fog-of-war mask: one cell per map pixel, `true` = players can see it.
// Visual expectation: painting with Reveal clears fog under the brush on the
// player display; Hide paints it back. Same rule both ways, so strokes are
// idempotent and a Hide replays a Reveal exactly.

use image::{GrayImage, Luma};
use tracing::debug;

use crate::error::{Error, Result};
use crate::metadata::FogFill;
use crate::types::{MapRect, Point, Size};

/// Grayscale level at or above which a stored cell counts as revealed.
const REVEALED_THRESHOLD: u8 = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FogMode {
    Reveal,
    Hide,
}

impl FogMode {
    fn value(self) -> bool {
        matches!(self, FogMode::Reveal)
    }

    pub fn toggled(self) -> Self {
        match self {
            FogMode::Reveal => FogMode::Hide,
            FogMode::Hide => FogMode::Reveal,
        }
    }
}

/// A brush drag: the swept capsule around the polyline through `points`.
#[derive(Clone, Debug, PartialEq)]
pub struct BrushStroke {
    pub points: Vec<Point>,
    pub radius: f64,
}

impl BrushStroke {
    /// A single dab.
    pub fn dab(center: Point, radius: f64) -> Self {
        Self { points: vec![center], radius }
    }

    fn bounds(&self) -> Option<MapRect> {
        let first = self.points.first()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        let r = self.radius;
        Some(MapRect::new(x0 - r, y0 - r, x1 - x0 + 2.0 * r, y1 - y0 + 2.0 * r))
    }

    fn covers(&self, c: Point) -> bool {
        let r2 = self.radius * self.radius;
        match self.points.as_slice() {
            [] => false,
            [only] => c.distance_sq(*only) <= r2,
            pts => pts.windows(2).any(|seg| segment_distance_sq(c, seg[0], seg[1]) <= r2),
        }
    }
}

fn segment_distance_sq(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.x * ab.x + ab.y * ab.y;
    if len2 == 0.0 {
        return p.distance_sq(a);
    }
    let ap = p - a;
    let t = ((ap.x * ab.x + ap.y * ab.y) / len2).clamp(0.0, 1.0);
    p.distance_sq(Point::new(a.x + ab.x * t, a.y + ab.y * t))
}

/// Closed freeform outline in map space (last vertex joins the first).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Even-odd point-in-polygon test. Fewer than three vertices contain nothing.
    pub fn contains(&self, p: Point) -> bool {
        let v = &self.vertices;
        if v.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = v.len() - 1;
        for i in 0..v.len() {
            let (a, b) = (v[i], v[j]);
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    fn bounds(&self) -> Option<MapRect> {
        let first = self.vertices.first()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in &self.vertices[1..] {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Some(MapRect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// One DM fog edit, already converted to map space.
#[derive(Clone, Debug, PartialEq)]
pub enum FogEdit {
    Stroke(BrushStroke),
    Rect(MapRect),
    Polygon(Polygon),
}

impl FogEdit {
    fn bounds(&self) -> Option<MapRect> {
        match self {
            FogEdit::Stroke(s) => s.bounds(),
            FogEdit::Rect(r) => Some(*r),
            FogEdit::Polygon(p) => p.bounds(),
        }
    }

    fn covers(&self, c: Point) -> bool {
        match self {
            FogEdit::Stroke(s) => s.covers(c),
            FogEdit::Rect(r) => r.contains(c),
            FogEdit::Polygon(p) => p.contains(c),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FogMask {
    width: u32,
    height: u32,
    revealed: Vec<bool>, // length = width * height, row-major
}

impl FogMask {
    /// A fully hidden mask.
    pub fn new(size: Size) -> Self {
        Self::filled(size, FogFill::Hidden)
    }

    pub fn filled(size: Size, fill: FogFill) -> Self {
        Self {
            width: size.width,
            height: size.height,
            revealed: vec![fill == FogFill::Revealed; size.area()],
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[inline]
    pub fn is_revealed(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.revealed[y as usize * self.width as usize + x as usize]
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed.iter().filter(|&&r| r).count()
    }

    /// Rasterize `edit` and write `mode` into every covered cell. A cell is
    /// sampled at its centre (x + 0.5, y + 0.5). Returns how many cells changed.
    pub fn paint(&mut self, edit: &FogEdit, mode: FogMode) -> usize {
        let Some(b) = edit.bounds() else { return 0 };
        if self.width == 0 || self.height == 0 {
            return 0;
        }

        // Only scan cells whose centres can fall inside the edit's bounding box.
        let x0 = (b.x - 0.5).ceil().max(0.0) as u32;
        let y0 = (b.y - 0.5).ceil().max(0.0) as u32;
        let x1 = (b.right() - 0.5).floor().min(self.width as f64 - 1.0);
        let y1 = (b.bottom() - 0.5).floor().min(self.height as f64 - 1.0);
        if x1 < 0.0 || y1 < 0.0 {
            return 0;
        }
        let (x1, y1) = (x1 as u32, y1 as u32);

        let value = mode.value();
        let mut changed = 0;
        for y in y0..=y1 {
            let row = y as usize * self.width as usize;
            for x in x0..=x1 {
                if !edit.covers(Point::new(x as f64 + 0.5, y as f64 + 0.5)) {
                    continue;
                }
                let cell = &mut self.revealed[row + x as usize];
                if *cell != value {
                    *cell = value;
                    changed += 1;
                }
            }
        }
        debug!(?mode, changed, "fog edit applied");
        changed
    }

    /// Reveal all / hide all.
    pub fn fill(&mut self, mode: FogMode) {
        self.revealed.fill(mode.value());
    }

    pub fn reset(&mut self, fill: FogFill) {
        self.revealed.fill(fill == FogFill::Revealed);
    }

    /// 0 = hidden, 255 = revealed; one pixel per cell.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.is_revealed(x, y) { 255 } else { 0 }])
        })
    }

    /// Rebuild a mask from a stored image, which must match the metadata grid exactly.
    pub fn from_gray_image(map: &str, img: &GrayImage, expected: Size) -> Result<Self> {
        let found = Size::new(img.width(), img.height());
        if found != expected {
            return Err(Error::CorruptMask { map: map.to_string(), expected, found });
        }
        Ok(Self {
            width: found.width,
            height: found.height,
            revealed: img.pixels().map(|p| p.0[0] >= REVEALED_THRESHOLD).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(points: &[(f64, f64)], radius: f64) -> FogEdit {
        FogEdit::Stroke(BrushStroke {
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            radius,
        })
    }

    #[test]
    fn circular_brush_reveals_exactly_the_disc() {
        let mut mask = FogMask::new(Size::new(200, 200));
        let center = Point::new(100.0, 100.0);
        mask.paint(&FogEdit::Stroke(BrushStroke::dab(center, 20.0)), FogMode::Reveal);

        let mut expected = 0;
        for y in 0..200 {
            for x in 0..200 {
                let c = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let inside = c.distance_sq(center) <= 400.0;
                assert_eq!(mask.is_revealed(x, y), inside, "cell ({x}, {y})");
                expected += inside as usize;
            }
        }
        assert_eq!(mask.revealed_count(), expected);
        // Roughly pi * r^2.
        assert!((1200..1320).contains(&expected));
    }

    #[test]
    fn painting_is_idempotent() {
        let edit = stroke(&[(10.0, 10.0), (60.0, 35.0), (80.0, 90.0)], 7.5);
        let mut once = FogMask::new(Size::new(100, 100));
        once.paint(&edit, FogMode::Reveal);
        let mut twice = once.clone();
        assert_eq!(twice.paint(&edit, FogMode::Reveal), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn hide_undoes_reveal_on_a_hidden_mask() {
        let edits = [
            stroke(&[(5.0, 5.0), (95.0, 40.0)], 4.0),
            FogEdit::Rect(MapRect::new(20.0, 20.0, 30.5, 10.0)),
            FogEdit::Polygon(Polygon::new(vec![
                Point::new(50.0, 50.0),
                Point::new(90.0, 60.0),
                Point::new(60.0, 95.0),
            ])),
        ];
        for edit in &edits {
            let before = FogMask::new(Size::new(100, 100));
            let mut mask = before.clone();
            let revealed = mask.paint(edit, FogMode::Reveal);
            assert!(revealed > 0);
            assert_eq!(mask.paint(edit, FogMode::Hide), revealed);
            assert_eq!(mask, before);
        }
    }

    #[test]
    fn stroke_sweeps_between_points() {
        let mut mask = FogMask::new(Size::new(100, 20));
        mask.paint(&stroke(&[(10.0, 10.0), (90.0, 10.0)], 2.0), FogMode::Reveal);
        // Midway along the segment, far from either endpoint.
        assert!(mask.is_revealed(50, 9));
        assert!(mask.is_revealed(50, 10));
        assert!(!mask.is_revealed(50, 13));
    }

    #[test]
    fn rect_uses_cell_centres_and_clips_to_mask() {
        let mut mask = FogMask::new(Size::new(10, 10));
        let n = mask.paint(&FogEdit::Rect(MapRect::new(-5.0, 2.0, 8.0, 2.0)), FogMode::Reveal);
        // Centres x in {0.5, 1.5, 2.5}, y in {2.5, 3.5}.
        assert_eq!(n, 6);
        assert!(mask.is_revealed(2, 3));
        assert!(!mask.is_revealed(3, 3));
    }

    #[test]
    fn polygon_contains_even_odd() {
        let square = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        assert!(square.contains(Point::new(5.0, 5.0)));
        assert!(!square.contains(Point::new(15.0, 5.0)));

        // A "C" shape: the notch is outside.
        let c = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 3.0),
            Point::new(3.0, 3.0),
            Point::new(3.0, 7.0),
            Point::new(10.0, 7.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        assert!(c.contains(Point::new(1.5, 5.0)));
        assert!(!c.contains(Point::new(6.0, 5.0)));
        assert!(!Polygon::new(vec![Point::ZERO, Point::new(5.0, 5.0)]).contains(Point::new(1.0, 1.0)));
    }

    #[test]
    fn fill_and_reset() {
        let mut mask = FogMask::new(Size::new(8, 4));
        mask.fill(FogMode::Reveal);
        assert_eq!(mask.revealed_count(), 32);
        mask.reset(FogFill::Hidden);
        assert_eq!(mask.revealed_count(), 0);
    }

    #[test]
    fn gray_image_round_trip_and_mismatch() {
        let mut mask = FogMask::new(Size::new(30, 20));
        mask.paint(&FogEdit::Rect(MapRect::new(3.0, 4.0, 10.0, 5.0)), FogMode::Reveal);
        let img = mask.to_gray_image();
        let back = FogMask::from_gray_image("cave", &img, Size::new(30, 20)).unwrap();
        assert_eq!(back, mask);

        let err = FogMask::from_gray_image("cave", &img, Size::new(31, 20)).unwrap_err();
        assert!(matches!(
            err,
            Error::CorruptMask { expected, found, .. } if expected == Size::new(31, 20) && found == Size::new(30, 20)
        ));
    }
}

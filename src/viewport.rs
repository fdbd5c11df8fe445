// Map space <-> player-display space.
// Visual expectation: the player display shows the map sub-rectangle starting at
// `pan`, turned by a quarter-turn rotation, scaled to true size, and centred on
// any axis where the whole map is narrower than the screen.

use crate::metadata::ViewportPlacement;
use crate::types::{MapRect, Point, Rotation, Size};

/// What the player currently sees. Mirrored read-only to the player renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    /// Map-space origin (top-left, unrotated) of the visible rectangle.
    pub pan: Point,
    pub rotation: Rotation,
    /// Player-display pixels per map pixel.
    pub scale: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self { pan: Point::ZERO, rotation: Rotation::Deg0, scale: 1.0 }
    }
}

impl ViewportState {
    pub fn from_placement(placement: &ViewportPlacement, scale: f64) -> Self {
        Self { pan: placement.pan(), rotation: placement.rotation, scale }
    }

    pub fn placement(&self) -> ViewportPlacement {
        ViewportPlacement { pan_x: self.pan.x, pan_y: self.pan.y, rotation: self.rotation }
    }

    /// Map-space size the screen can show, before clamping to the map.
    pub fn visible_extent(&self, screen: Size) -> (f64, f64) {
        let w = screen.width as f64 / self.scale;
        let h = screen.height as f64 / self.scale;
        if self.rotation.swaps_axes() { (h, w) } else { (w, h) }
    }

    /// Saturate pan so the visible rectangle stays inside the map.
    pub fn clamp(&mut self, map: Size, screen: Size) {
        self.pan = clamp_pan(self.pan, map, self.visible_extent(screen));
    }

    /// Move the visible rectangle by a map-space delta (DM dragging the overlay).
    pub fn pan_by_map(&mut self, delta: Point, map: Size, screen: Size) {
        self.pan = self.pan + delta;
        self.clamp(map, screen);
    }

    /// Move by a delta expressed in the player's rotated frame (map pixel units).
    pub fn pan_by_screen(&mut self, delta: Point, map: Size, screen: Size) {
        let d = unrotate_vector(delta, self.rotation);
        self.pan_by_map(d, map, screen);
    }

    /// Change rotation while keeping the centre of the visible area fixed.
    pub fn set_rotation(&mut self, rotation: Rotation, map: Size, screen: Size) {
        let center = ViewportTransform::new(map, self, screen).visible_rect().center();
        self.rotation = rotation;
        let (ew, eh) = self.visible_extent(screen);
        let (vw, vh) = (ew.min(map.width as f64), eh.min(map.height as f64));
        self.pan = Point::new(center.x - vw / 2.0, center.y - vh / 2.0);
        self.clamp(map, screen);
    }

    pub fn rotate_cw(&mut self, map: Size, screen: Size) {
        self.set_rotation(self.rotation.cw(), map, screen);
    }

    pub fn rotate_ccw(&mut self, map: Size, screen: Size) {
        self.set_rotation(self.rotation.ccw(), map, screen);
    }
}

fn clamp_pan(pan: Point, map: Size, extent: (f64, f64)) -> Point {
    let max_x = (map.width as f64 - extent.0).max(0.0);
    let max_y = (map.height as f64 - extent.1).max(0.0);
    Point::new(pan.x.clamp(0.0, max_x), pan.y.clamp(0.0, max_y))
}

/// Rotate a point inside a `w x h` box clockwise; the result lives in the
/// rotated box (`h x w` for quarter turns).
fn rotate_in_box(p: Point, w: f64, h: f64, rotation: Rotation) -> Point {
    match rotation {
        Rotation::Deg0 => p,
        Rotation::Deg90 => Point::new(h - p.y, p.x),
        Rotation::Deg180 => Point::new(w - p.x, h - p.y),
        Rotation::Deg270 => Point::new(p.y, w - p.x),
    }
}

/// Inverse of [`rotate_in_box`] for the same unrotated `w x h` box.
fn unrotate_in_box(p: Point, w: f64, h: f64, rotation: Rotation) -> Point {
    match rotation {
        Rotation::Deg0 => p,
        Rotation::Deg90 => Point::new(p.y, h - p.x),
        Rotation::Deg180 => Point::new(w - p.x, h - p.y),
        Rotation::Deg270 => Point::new(w - p.y, p.x),
    }
}

/// Rotated-frame direction back to map space.
pub fn unrotate_vector(d: Point, rotation: Rotation) -> Point {
    match rotation {
        Rotation::Deg0 => d,
        Rotation::Deg90 => Point::new(d.y, -d.x),
        Rotation::Deg180 => Point::new(-d.x, -d.y),
        Rotation::Deg270 => Point::new(-d.y, d.x),
    }
}

/// Precomputed transform for one (map, viewport, screen) snapshot.
#[derive(Clone, Copy, Debug)]
pub struct ViewportTransform {
    visible: MapRect,
    rotation: Rotation,
    scale: f64,
    offset: Point,
}

impl ViewportTransform {
    pub fn new(map: Size, viewport: &ViewportState, screen: Size) -> Self {
        let extent = viewport.visible_extent(screen);
        let pan = clamp_pan(viewport.pan, map, extent);
        let visible = MapRect::new(
            pan.x,
            pan.y,
            extent.0.min(map.width as f64),
            extent.1.min(map.height as f64),
        );

        // Letterbox: centre the map on any axis where it doesn't fill the screen.
        let (rw, rh) = if viewport.rotation.swaps_axes() {
            (visible.height, visible.width)
        } else {
            (visible.width, visible.height)
        };
        let offset = Point::new(
            ((screen.width as f64 - rw * viewport.scale) / 2.0).max(0.0),
            ((screen.height as f64 - rh * viewport.scale) / 2.0).max(0.0),
        );

        Self { visible, rotation: viewport.rotation, scale: viewport.scale, offset }
    }

    /// The map-space rectangle the player sees (the DM's green overlay).
    pub fn visible_rect(&self) -> MapRect {
        self.visible
    }

    /// Screen-space rectangle covered by map pixels; the rest is background.
    pub fn screen_rect(&self) -> MapRect {
        let (rw, rh) = if self.rotation.swaps_axes() {
            (self.visible.height, self.visible.width)
        } else {
            (self.visible.width, self.visible.height)
        };
        MapRect::new(self.offset.x, self.offset.y, rw * self.scale, rh * self.scale)
    }

    pub fn map_to_screen(&self, p: Point) -> Point {
        let local = p - Point::new(self.visible.x, self.visible.y);
        let r = rotate_in_box(local, self.visible.width, self.visible.height, self.rotation);
        Point::new(r.x * self.scale + self.offset.x, r.y * self.scale + self.offset.y)
    }

    pub fn screen_to_map(&self, s: Point) -> Point {
        let r = Point::new((s.x - self.offset.x) / self.scale, (s.y - self.offset.y) / self.scale);
        let local = unrotate_in_box(r, self.visible.width, self.visible.height, self.rotation);
        local + Point::new(self.visible.x, self.visible.y)
    }

    /// Map pixel under the centre of screen pixel (sx, sy), if any.
    #[inline]
    pub fn sample(&self, sx: u32, sy: u32) -> Option<(u32, u32)> {
        let p = self.screen_to_map(Point::new(sx as f64 + 0.5, sy as f64 + 0.5));
        let v = &self.visible;
        if p.x < v.x || p.y < v.y || p.x >= v.right() || p.y >= v.bottom() {
            return None;
        }
        Some((p.x as u32, p.y as u32))
    }
}

/// Map-space point to player-display pixels for the given snapshot.
pub fn map_to_screen(p: Point, viewport: &ViewportState, map: Size, screen: Size) -> Point {
    ViewportTransform::new(map, viewport, screen).map_to_screen(p)
}

/// Player-display point back to map space.
pub fn screen_to_map(s: Point, viewport: &ViewportState, map: Size, screen: Size) -> Point {
    ViewportTransform::new(map, viewport, screen).screen_to_map(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const MAP: Size = Size::new(4000, 3000);
    const SCREEN: Size = Size::new(800, 600);

    fn vs(pan: Point, rotation: Rotation, scale: f64) -> ViewportState {
        ViewportState { pan, rotation, scale }
    }

    #[test]
    fn round_trip_for_every_rotation() {
        for rotation in Rotation::ALL {
            let v = vs(Point::new(1234.0, 777.0), rotation, 1.7);
            let t = ViewportTransform::new(MAP, &v, SCREEN);
            let r = t.visible_rect();
            for (fx, fy) in [(0.0, 0.0), (0.25, 0.8), (0.5, 0.5), (0.99, 0.1), (1.0, 1.0)] {
                let p = Point::new(r.x + r.width * fx, r.y + r.height * fy);
                let back = screen_to_map(map_to_screen(p, &v, MAP, SCREEN), &v, MAP, SCREEN);
                assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-9);
                assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn visible_region_fills_the_screen_when_map_is_large() {
        for rotation in Rotation::ALL {
            let t = ViewportTransform::new(MAP, &vs(Point::new(100.0, 100.0), rotation, 2.0), SCREEN);
            let s = t.screen_rect();
            assert_abs_diff_eq!(s.x, 0.0);
            assert_abs_diff_eq!(s.width, 800.0, epsilon = 1e-9);
            assert_abs_diff_eq!(s.height, 600.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn quarter_turn_puts_map_top_left_at_screen_top_right() {
        let v = vs(Point::ZERO, Rotation::Deg90, 1.0);
        let t = ViewportTransform::new(MAP, &v, SCREEN);
        let s = t.map_to_screen(Point::ZERO);
        assert_abs_diff_eq!(s.x, 800.0);
        assert_abs_diff_eq!(s.y, 0.0);
    }

    #[test]
    fn pan_is_clamped_to_map_edges() {
        let mut v = vs(Point::ZERO, Rotation::Deg0, 1.0);
        v.pan_by_map(Point::new(1e9, -50.0), MAP, SCREEN);
        assert_eq!(v.pan, Point::new(3200.0, 0.0));

        let r = ViewportTransform::new(MAP, &v, SCREEN).visible_rect();
        assert_abs_diff_eq!(r.right(), 4000.0);
        assert_abs_diff_eq!(r.y, 0.0);

        // Rotated: the extent swaps, so does the limit.
        let mut v = vs(Point::ZERO, Rotation::Deg90, 1.0);
        v.pan_by_map(Point::new(1e9, 1e9), MAP, SCREEN);
        assert_eq!(v.pan, Point::new(3400.0, 2200.0));
    }

    #[test]
    fn small_map_is_centred_and_unpannable() {
        let map = Size::new(200, 100);
        let mut v = vs(Point::new(50.0, 50.0), Rotation::Deg0, 2.0);
        v.clamp(map, SCREEN);
        assert_eq!(v.pan, Point::ZERO);

        let t = ViewportTransform::new(map, &v, SCREEN);
        assert_eq!(t.screen_rect(), MapRect::new(200.0, 200.0, 400.0, 200.0));
        assert_eq!(t.sample(0, 0), None);
        assert_eq!(t.sample(200, 200), Some((0, 0)));
        assert_eq!(t.sample(599, 399), Some((199, 99)));
        assert_eq!(t.sample(600, 399), None);
    }

    #[test]
    fn tabletop_scenario_crops_vertically_and_centres_horizontally() {
        // 1846x1846 display pixels of map on a 1920x1080 screen.
        let scale = 1920.0 / 520.0 * 50.0 / 100.0;
        let map = Size::new(1000, 1000);
        let screen = Size::new(1920, 1080);
        let mut v = vs(Point::new(0.0, 5000.0), Rotation::Deg0, scale);
        v.clamp(map, screen);

        let t = ViewportTransform::new(map, &v, screen);
        let r = t.visible_rect();
        assert_abs_diff_eq!(r.width, 1000.0);
        assert_abs_diff_eq!(r.bottom(), 1000.0, epsilon = 1e-9);
        let s = t.screen_rect();
        assert_abs_diff_eq!(s.width, 1846.15, epsilon = 0.01);
        assert_abs_diff_eq!(s.x, (1920.0 - s.width) / 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.height, 1080.0, epsilon = 1e-9);
    }

    #[test]
    fn rotate_pan_rotate_back_pans_in_map_space() {
        let mut v = vs(Point::new(1000.0, 1000.0), Rotation::Deg0, 1.0);
        v.rotate_cw(MAP, SCREEN);
        v.pan_by_screen(Point::new(10.0, 0.0), MAP, SCREEN);
        v.rotate_ccw(MAP, SCREEN);

        let expected = unrotate_vector(Point::new(10.0, 0.0), Rotation::Deg90);
        assert_eq!(expected, Point::new(0.0, -10.0));
        assert_abs_diff_eq!(v.pan.x - 1000.0, expected.x, epsilon = 1e-9);
        assert_abs_diff_eq!(v.pan.y - 1000.0, expected.y, epsilon = 1e-9);
        assert_eq!(v.rotation, Rotation::Deg0);
    }

    #[test]
    fn rotation_keeps_visible_centre() {
        let mut v = vs(Point::new(1000.0, 1000.0), Rotation::Deg0, 1.0);
        let before = ViewportTransform::new(MAP, &v, SCREEN).visible_rect().center();
        v.rotate_cw(MAP, SCREEN);
        let after = ViewportTransform::new(MAP, &v, SCREEN).visible_rect();
        assert_eq!(after.center(), before);
        assert_abs_diff_eq!(after.width, 600.0);
        assert_abs_diff_eq!(after.height, 800.0);
    }
}

// Dual renderer: one map state in, two frames out.
// Visual expectation:
//   DM view     -> whole map fitted to the control window, hidden areas dimmed
//                  (terrain still readable) and a green box showing what players see.
//   Player view -> true-scale crop of the map, hidden areas solid black, nothing else.

use crate::draw::draw_rect_outline;
use crate::gamma::GammaLut;
use crate::session::MapState;
use crate::types::{FrameBuffer, MapRect, Point, Size};
use crate::viewport::ViewportTransform;

/// Behind the map where it doesn't cover the screen.
pub const BACKGROUND: u32 = 0x001E_1E1E;
pub const FOG_COLOR: u32 = 0x0000_0000;
/// DM fog opacity (120 of 255).
pub const DM_FOG_OPACITY: f32 = 120.0 / 255.0;
/// Player viewport outline on the DM view.
pub const OVERLAY_COLOR: u32 = 0x0000_FF00;
/// Leave a small border around the fitted map in the DM window.
const DM_FIT_MARGIN: f64 = 0.95;

/// How the full map is fitted into the DM canvas (unrotated, centred).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DmLayout {
    pub scale: f64,
    pub offset: Point,
    pub map: Size,
}

impl DmLayout {
    pub fn new(map: Size, canvas: Size) -> Self {
        if map.is_empty() || canvas.is_empty() {
            return Self { scale: 1.0, offset: Point::ZERO, map };
        }
        let fit = (canvas.width as f64 / map.width as f64).min(canvas.height as f64 / map.height as f64)
            * DM_FIT_MARGIN;
        let offset = Point::new(
            (canvas.width as f64 - map.width as f64 * fit) / 2.0,
            (canvas.height as f64 - map.height as f64 * fit) / 2.0,
        );
        Self { scale: fit, offset, map }
    }

    /// DM window pixel -> map space (mouse input).
    pub fn canvas_to_map(&self, p: Point) -> Point {
        Point::new((p.x - self.offset.x) / self.scale, (p.y - self.offset.y) / self.scale)
    }

    pub fn map_to_canvas(&self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.offset.x, p.y * self.scale + self.offset.y)
    }

    pub fn rect_to_canvas(&self, r: MapRect) -> MapRect {
        let tl = self.map_to_canvas(Point::new(r.x, r.y));
        MapRect::new(tl.x, tl.y, r.width * self.scale, r.height * self.scale)
    }

    /// A canvas-pixel length in map pixels (brush radius, drag deltas).
    pub fn canvas_len_to_map(&self, len: f64) -> f64 {
        len / self.scale
    }
}

/// Both outputs of one committed state.
pub struct Frames {
    pub dm: FrameBuffer,
    pub player: FrameBuffer,
}

#[derive(Default)]
pub struct DualRenderer {
    lut: GammaLut,
}

impl DualRenderer {
    pub fn new() -> Self {
        Self { lut: GammaLut::new() }
    }

    /// Render both views from the same borrow, so they can never disagree.
    pub fn render_both(&self, map: &MapState, dm_canvas: Size, player_screen: Size) -> Frames {
        Frames {
            dm: self.render_dm(map, dm_canvas, player_screen),
            player: self.render_player(map, player_screen),
        }
    }

    /// True-scale player output. Hidden cells are fully opaque fog.
    pub fn render_player(&self, map: &MapState, screen: Size) -> FrameBuffer {
        let mut fb = FrameBuffer::filled(screen, BACKGROUND);
        let t = ViewportTransform::new(map.map_size(), &map.viewport, screen);

        // Only walk the screen rows/columns the map can cover.
        let area = t.screen_rect();
        let x0 = area.x.floor().max(0.0) as u32;
        let y0 = area.y.floor().max(0.0) as u32;
        let x1 = (area.right().ceil() as u32).min(screen.width);
        let y1 = (area.bottom().ceil() as u32).min(screen.height);

        for sy in y0..y1 {
            let row = sy as usize * fb.width;
            for sx in x0..x1 {
                let Some((mx, my)) = t.sample(sx, sy) else { continue };
                fb.pixels[row + sx as usize] = if map.fog.is_revealed(mx, my) {
                    map.asset.pixel(mx, my)
                } else {
                    FOG_COLOR
                };
            }
        }
        fb
    }

    /// DM control view: dimmed fog plus the player's viewport outline.
    pub fn render_dm(&self, map: &MapState, canvas: Size, player_screen: Size) -> FrameBuffer {
        let mut fb = FrameBuffer::filled(canvas, BACKGROUND);
        let size = map.map_size();
        if size.is_empty() {
            return fb;
        }
        let layout = DmLayout::new(size, canvas);

        for cy in 0..canvas.height {
            let row = cy as usize * fb.width;
            for cx in 0..canvas.width {
                let p = layout.canvas_to_map(Point::new(cx as f64 + 0.5, cy as f64 + 0.5));
                if p.x < 0.0 || p.y < 0.0 || p.x >= size.width as f64 || p.y >= size.height as f64 {
                    continue;
                }
                let (mx, my) = (p.x as u32, p.y as u32);
                let px = map.asset.pixel(mx, my);
                fb.pixels[row + cx as usize] = if map.fog.is_revealed(mx, my) {
                    px
                } else {
                    self.lut.blend(px, FOG_COLOR, DM_FOG_OPACITY)
                };
            }
        }

        let visible = ViewportTransform::new(size, &map.viewport, player_screen).visible_rect();
        draw_rect_outline(&mut fb, layout.rect_to_canvas(visible), OVERLAY_COLOR);
        fb
    }
}

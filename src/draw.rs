// Window + software drawing utilities.
// Visual effects provided here:
// 1) The DM control window and the borderless player window.
// 2) Thin lines, rectangles and circles drawn on top of a rendered frame
//    (player viewport box, rectangle-tool preview, brush outline).

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::error::{Error, Result};
use crate::types::{FrameBuffer, MapRect, Size};

pub struct Drawer {
    window: Window,
}

impl Drawer {
    /// A regular, resizable window (DM control view).
    pub fn new(title: &str, size: Size) -> Result<Self> {
        let opts = WindowOptions { resize: true, ..WindowOptions::default() };
        Self::with_options(title, size, opts)
    }

    /// A borderless, always-on-top window placed at (x, y) (player display).
    pub fn borderless(title: &str, size: Size, x: isize, y: isize) -> Result<Self> {
        let opts = WindowOptions { borderless: true, topmost: true, ..WindowOptions::default() };
        let mut drawer = Self::with_options(title, size, opts)?;
        drawer.window.set_position(x, y);
        Ok(drawer)
    }

    fn with_options(title: &str, size: Size, opts: WindowOptions) -> Result<Self> {
        let mut window = Window::new(title, size.width as usize, size.height as usize, opts)
            .map_err(|e| Error::Window(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window })
    }

    /// Push a frame. Visual: the window shows the new image immediately.
    pub fn present(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.window
            .update_with_buffer(&frame.pixels, frame.width, frame.height)
            .map_err(|e| Error::Window(e.to_string()))
    }

    /// Pump events without a new frame (nothing changed).
    pub fn idle(&mut self) {
        self.window.update();
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn size(&self) -> Size {
        let (w, h) = self.window.get_size();
        Size::new(w as u32, h as u32)
    }

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    /// Mouse position in window pixels, clamped to the window while dragging.
    pub fn mouse_pos(&self) -> Option<(f32, f32)> {
        self.window.get_mouse_pos(MouseMode::Clamp)
    }

    pub fn left_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }

    pub fn right_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Right)
    }

    /// Keys that went down since the last update (no auto-repeat).
    pub fn keys_pressed(&self) -> Vec<Key> {
        self.window.get_keys_pressed(KeyRepeat::No)
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.window.is_key_down(key)
    }

    pub fn ctrl_down(&self) -> bool {
        self.key_down(Key::LeftCtrl) || self.key_down(Key::RightCtrl)
    }
}

/* ---------- Software drawing on a FrameBuffer ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    fb.pixels[y * fb.width + x] = color;
}

/// Bresenham line, clipped per pixel.
pub fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Two-pixel outline of `r` (canvas coordinates), so it stays visible on busy maps.
pub fn draw_rect_outline(fb: &mut FrameBuffer, r: MapRect, color: u32) {
    let (x0, y0) = (r.x.round() as i32, r.y.round() as i32);
    let (x1, y1) = ((r.right().round() as i32 - 1).max(x0), (r.bottom().round() as i32 - 1).max(y0));
    for inset in 0..2 {
        let (a, b, c, d) = (x0 + inset, y0 + inset, x1 - inset, y1 - inset);
        if a > c || b > d {
            break;
        }
        draw_line(fb, a, b, c, b, color);
        draw_line(fb, c, b, c, d, color);
        draw_line(fb, c, d, a, d, color);
        draw_line(fb, a, d, a, b, color);
    }
}

/// Circle outline (midpoint algorithm); the brush footprint under the cursor.
pub fn draw_circle(fb: &mut FrameBuffer, cx: i32, cy: i32, radius: i32, color: u32) {
    if radius <= 0 {
        put_pixel(fb, cx, cy, color);
        return;
    }
    let (mut x, mut y) = (radius, 0);
    let mut err = 1 - radius;
    while x >= y {
        for (px, py) in [(x, y), (y, x), (-y, x), (-x, y), (-x, -y), (-y, -x), (y, -x), (x, -y)] {
            put_pixel(fb, cx + px, cy + py, color);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

/// Small "+" marking a polygon vertex or the pan grab point.
pub fn draw_crosshair(fb: &mut FrameBuffer, cx: i32, cy: i32, size: i32, color: u32) {
    draw_line(fb, cx - size, cy, cx + size, cy, color);
    draw_line(fb, cx, cy - size, cx, cy + size, color);
}

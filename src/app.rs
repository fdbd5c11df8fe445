// DM control loop: two windows, one session.
// What you SEE:
// • DM window: the whole active map, fog dimmed, green box = what the players see.
// • Player window (borderless, on the table display): true-scale, fog solid black.
// • Left drag paints with the current mode, right drag with the opposite one.
// Keys:
//   R / H      reveal / hide mode        B / T / G / P   brush, rectangle, polygon, pan
//   [ / ]      brush size -/+ 5          Q / E           rotate player view ccw / cw
//   A / Z      reveal all / hide all     Home            reset map to its imported state
//   PgUp/PgDn  previous / next map       I               store current view as initial
//   Enter      close polygon             Ctrl-S          save everything
//   Ctrl-Del   remove the active map     Esc             cancel polygon, else quit

use minifb::Key;
use tracing::{debug, error, info, warn};

use crate::config::{Config, DisplayProfile, MAX_BRUSH, MIN_BRUSH};
use crate::draw::{draw_circle, draw_crosshair, draw_line, draw_rect_outline, Drawer};
use crate::error::{Error, Result};
use crate::fog::{BrushStroke, FogEdit, FogMode, Polygon};
use crate::persistence::SessionStore;
use crate::render::{DmLayout, DualRenderer, OVERLAY_COLOR};
use crate::session::Session;
use crate::types::{FrameBuffer, MapRect, Point, Size, rgb};

const BRUSH_STEP: i32 = 5;
const CURSOR_COLOR: u32 = 0x00FF_FFFF;
const PREVIEW_COLOR: u32 = 0x00FF_D040;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Brush,
    Rect,
    Polygon,
    Pan,
}

impl Tool {
    fn label(self) -> &'static str {
        match self {
            Tool::Brush => "brush",
            Tool::Rect => "rect",
            Tool::Polygon => "polygon",
            Tool::Pan => "pan",
        }
    }
}

/// What a mouse gesture asks the session to do.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Paint(FogEdit, FogMode),
    PanBy(Point),
    /// A fog gesture finished; persist the mask.
    FogCommitted,
    /// A pan gesture finished; persist the viewport.
    ViewportCommitted,
}

#[derive(Clone, Debug, PartialEq)]
enum Gesture {
    Idle,
    Brush { last: Point, mode: FogMode, radius: f64 },
    Rect { start: Point, current: Point, mode: FogMode },
    Pan { last: Point },
}

/// Tool state and gesture tracking, in map coordinates. No window involved.
#[derive(Clone, Debug)]
pub struct Editor {
    pub tool: Tool,
    pub mode: FogMode,
    brush_size: u32,
    gesture: Gesture,
    polygon: Vec<Point>,
}

impl Editor {
    pub fn new(brush_size: u32) -> Self {
        Self {
            tool: Tool::Brush,
            mode: FogMode::Reveal,
            brush_size: brush_size.clamp(MIN_BRUSH, MAX_BRUSH),
            gesture: Gesture::Idle,
            polygon: Vec::new(),
        }
    }

    /// Brush radius in DM window pixels.
    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    pub fn adjust_brush(&mut self, delta: i32) {
        let size = (self.brush_size as i32 + delta).clamp(MIN_BRUSH as i32, MAX_BRUSH as i32);
        self.brush_size = size as u32;
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if tool != self.tool {
            self.cancel();
            self.tool = tool;
        }
    }

    /// Drop any gesture or unfinished polygon.
    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
        self.polygon.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle && self.polygon.is_empty()
    }

    /// Button went down at `p`. `invert` = secondary button.
    pub fn press(&mut self, p: Point, invert: bool, radius: f64) -> Vec<Action> {
        let mode = if invert { self.mode.toggled() } else { self.mode };
        match self.tool {
            Tool::Brush => {
                self.gesture = Gesture::Brush { last: p, mode, radius };
                vec![Action::Paint(FogEdit::Stroke(BrushStroke::dab(p, radius)), mode)]
            }
            Tool::Rect => {
                self.gesture = Gesture::Rect { start: p, current: p, mode };
                Vec::new()
            }
            Tool::Polygon if invert => self.close_polygon(),
            Tool::Polygon => {
                self.polygon.push(p);
                Vec::new()
            }
            Tool::Pan => {
                self.gesture = Gesture::Pan { last: p };
                Vec::new()
            }
        }
    }

    /// Button still held, pointer now at `p`.
    pub fn drag(&mut self, p: Point) -> Vec<Action> {
        match &mut self.gesture {
            Gesture::Brush { last, mode, radius } => {
                if *last == p {
                    return Vec::new();
                }
                let stroke = BrushStroke { points: vec![*last, p], radius: *radius };
                *last = p;
                vec![Action::Paint(FogEdit::Stroke(stroke), *mode)]
            }
            Gesture::Rect { current, .. } => {
                *current = p;
                Vec::new()
            }
            Gesture::Pan { last } => {
                let delta = p - *last;
                *last = p;
                if delta == Point::ZERO { Vec::new() } else { vec![Action::PanBy(delta)] }
            }
            Gesture::Idle => Vec::new(),
        }
    }

    /// Button released at `p`.
    pub fn release(&mut self, p: Point) -> Vec<Action> {
        let mut actions = self.drag(p);
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Brush { .. } => actions.push(Action::FogCommitted),
            Gesture::Rect { start, mode, .. } => {
                actions.push(Action::Paint(FogEdit::Rect(MapRect::from_corners(start, p)), mode));
                actions.push(Action::FogCommitted);
            }
            Gesture::Pan { .. } => actions.push(Action::ViewportCommitted),
            Gesture::Idle => {}
        }
        actions
    }

    /// Finish the freeform polygon. Fewer than three vertices just discards it.
    pub fn close_polygon(&mut self) -> Vec<Action> {
        let vertices = std::mem::take(&mut self.polygon);
        if vertices.len() < 3 {
            return Vec::new();
        }
        vec![Action::Paint(FogEdit::Polygon(Polygon::new(vertices)), self.mode), Action::FogCommitted]
    }

    /// Rectangle being dragged, if any.
    pub fn rect_preview(&self) -> Option<MapRect> {
        match self.gesture {
            Gesture::Rect { start, current, .. } => Some(MapRect::from_corners(start, current)),
            _ => None,
        }
    }

    pub fn polygon_vertices(&self) -> &[Point] {
        &self.polygon
    }
}

/// Player output size used for the DM overlay when no display is usable.
const FALLBACK_PLAYER_SCREEN: Size = Size::new(1920, 1080);

/// How the player output will run, decided before any window opens.
#[derive(Debug)]
struct PlayerSetup {
    /// Where to open the player window; `None` runs DM-only.
    profile: Option<DisplayProfile>,
    screen: Size,
    /// Problem to show the DM, if any.
    status: Option<String>,
}

/// Apply the display's true scale to every map. Display problems are
/// reported through `status` and never stop the DM view.
fn prepare_player(session: &mut Session, display: Result<DisplayProfile>) -> PlayerSetup {
    let profile = match display {
        Ok(profile) => profile,
        Err(e) => {
            warn!(error = %e, "no usable player display, running DM view only");
            return PlayerSetup { profile: None, screen: FALLBACK_PLAYER_SCREEN, status: Some(e.to_string()) };
        }
    };

    let screen = Size::new(profile.geometry.width_px, profile.geometry.height_px);
    if screen.is_empty() {
        let e = Error::config(format!("display {} has no resolution ({screen})", profile.name));
        warn!(error = %e, "no usable player display, running DM view only");
        return PlayerSetup { profile: None, screen: FALLBACK_PLAYER_SCREEN, status: Some(e.to_string()) };
    }

    let status = match session.apply_display_scale(&profile.geometry) {
        Ok(true) => Some(String::from("display pixels are not square; using the smaller pitch")),
        Ok(false) => None,
        Err(e) => {
            error!(error = %e, "true scale unavailable, maps shown at one screen pixel per map pixel");
            Some(e.to_string())
        }
    };
    PlayerSetup { profile: Some(profile), screen, status }
}

pub struct App {
    session: Session,
    store: SessionStore,
    config: Config,
    player_screen: Size,
    renderer: DualRenderer,
    editor: Editor,
    dm: Drawer,
    player: Option<Drawer>,
    dm_frame: FrameBuffer,
    was_down: bool,
    dirty: bool,
    status: String,
}

impl App {
    /// Open the DM window and, when `display` is usable, the player window on it.
    /// Only a failure to open the DM window is an error.
    pub fn new(mut session: Session, store: SessionStore, config: Config, display: Result<DisplayProfile>) -> Result<Self> {
        let setup = prepare_player(&mut session, display);
        let mut status = setup.status.unwrap_or_else(|| String::from("ready"));

        /* --- Windows ---
           Visual: DM window on the desktop, player window fills the table display. */
        let dm = Drawer::new("dmview", config.dm_window)?;
        let player = setup.profile.and_then(|profile| {
            match Drawer::borderless("dmview player", setup.screen, profile.x, profile.y) {
                Ok(window) => {
                    info!(monitor = %profile.name, screen = %setup.screen, "player window opened");
                    Some(window)
                }
                Err(e) => {
                    error!(error = %e, "player window failed, running DM view only");
                    status = e.to_string();
                    None
                }
            }
        });

        let editor = Editor::new(config.brush_size);
        Ok(Self {
            session,
            store,
            config,
            player_screen: setup.screen,
            renderer: DualRenderer::new(),
            editor,
            dm,
            player,
            dm_frame: FrameBuffer::filled(Size::new(1, 1), 0),
            was_down: false,
            dirty: true,
            status,
        })
    }

    /// Run until a window closes (or Esc). Saves session and config on the way out.
    pub fn run(mut self) -> Result<()> {
        while self.dm.is_open() && self.player.as_ref().is_none_or(Drawer::is_open) {
            /* 1) Keyboard: tools, modes, rotation, map switching. */
            if self.handle_keys() {
                break;
            }

            /* 2) Mouse: gestures become session edits right away. */
            self.handle_mouse();

            /* 3) Re-render both views only after a committed change (or a resize). */
            let canvas = self.dm.size();
            if !canvas.is_empty() && canvas != self.dm_frame.size() {
                self.dirty = true;
            }
            let player_frame = if self.dirty { self.redraw() } else { None };

            /* 4) DM frame + transient overlays (cursor, previews); player only when changed. */
            if let Err(e) = self.present(player_frame) {
                error!(error = %e, "window update failed, shutting down");
                break;
            }
        }

        self.save_session();
        self.config.set_brush_size(self.editor.brush_size());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "could not save config");
        }
        Ok(())
    }

    fn present(&mut self, player_frame: Option<FrameBuffer>) -> Result<()> {
        let mut frame = self.dm_frame.clone();
        self.draw_tool_overlay(&mut frame);
        self.dm.present(&frame)?;
        let Some(player) = self.player.as_mut() else { return Ok(()) };
        match player_frame {
            Some(fb) => player.present(&fb),
            None => {
                player.idle();
                Ok(())
            }
        }
    }

    fn redraw(&mut self) -> Option<FrameBuffer> {
        self.dirty = false;
        let mut canvas = self.dm.size();
        if canvas.is_empty() {
            canvas = self.dm_frame.size();
        }
        let player = match self.session.active() {
            Some(map) => {
                let frames = self.renderer.render_both(map, canvas, self.player_screen);
                self.dm_frame = frames.dm;
                frames.player
            }
            None => {
                self.dm_frame = FrameBuffer::filled(canvas, crate::render::BACKGROUND);
                FrameBuffer::filled(self.player_screen, 0)
            }
        };
        self.update_title();
        self.player.as_ref().map(|_| player)
    }

    /// Returns true when the DM asked to quit.
    fn handle_keys(&mut self) -> bool {
        let screen = self.player_screen;
        let ctrl = self.dm.ctrl_down();
        let keys = self.dm.keys_pressed();
        let pressed = |k: Key| keys.contains(&k);

        if pressed(Key::Escape) {
            if self.editor.polygon_vertices().is_empty() {
                return true;
            }
            self.editor.cancel();
        }

        if ctrl {
            if pressed(Key::S) {
                self.save_session();
                self.set_status("saved");
            }
            if pressed(Key::Delete) {
                self.remove_active_map();
            }
            return false;
        }

        let before = (self.editor.tool, self.editor.mode, self.editor.brush_size());
        if pressed(Key::R) {
            self.editor.mode = FogMode::Reveal;
        }
        if pressed(Key::H) {
            self.editor.mode = FogMode::Hide;
        }
        for (key, tool) in [(Key::B, Tool::Brush), (Key::T, Tool::Rect), (Key::G, Tool::Polygon), (Key::P, Tool::Pan)] {
            if pressed(key) {
                self.editor.set_tool(tool);
            }
        }
        if pressed(Key::LeftBracket) {
            self.editor.adjust_brush(-BRUSH_STEP);
        }
        if pressed(Key::RightBracket) {
            self.editor.adjust_brush(BRUSH_STEP);
        }
        if before != (self.editor.tool, self.editor.mode, self.editor.brush_size()) {
            self.update_title();
        }

        if pressed(Key::Enter) {
            let actions = self.editor.close_polygon();
            self.apply_all(actions);
        }

        let rotation = self.session.active().map(|m| m.viewport.rotation);
        if let Some(current) = rotation {
            let target = if pressed(Key::E) {
                Some(current.cw())
            } else if pressed(Key::Q) {
                Some(current.ccw())
            } else {
                None
            };
            if let Some(target) = target {
                self.commit(|s| s.rotate_active(target, screen), true);
            }
        }

        if pressed(Key::A) {
            self.commit_fog(|s| s.fill_active(FogMode::Reveal));
        }
        if pressed(Key::Z) {
            self.commit_fog(|s| s.fill_active(FogMode::Hide));
        }
        if pressed(Key::Home) {
            self.commit_fog(|s| s.reset_active(screen));
            self.save_session();
        }
        if pressed(Key::I) {
            if let Some(map) = self.session.active_mut() {
                map.store_initial_viewport();
                self.save_session();
                self.set_status("initial view stored");
            }
        }

        if pressed(Key::PageDown) {
            self.switch_map(Session::next_map);
        }
        if pressed(Key::PageUp) {
            self.switch_map(Session::previous_map);
        }
        false
    }

    fn handle_mouse(&mut self) {
        let left = self.dm.left_mouse_down();
        let right = self.dm.right_mouse_down();
        let down = left || right;
        let was_down = std::mem::replace(&mut self.was_down, down);

        let (Some(map_size), Some((mx, my))) = (self.session.active().map(|m| m.map_size()), self.dm.mouse_pos()) else {
            return;
        };
        let layout = DmLayout::new(map_size, self.dm_frame.size());
        let p = layout.canvas_to_map(Point::new(mx as f64, my as f64));
        let radius = layout.canvas_len_to_map(self.editor.brush_size() as f64);

        let actions = match (was_down, down) {
            (false, true) => self.editor.press(p, right && !left, radius),
            (true, true) => self.editor.drag(p),
            (true, false) => self.editor.release(p),
            (false, false) => Vec::new(),
        };
        self.apply_all(actions);
    }

    fn apply_all(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.apply(action);
        }
    }

    fn apply(&mut self, action: Action) {
        let screen = self.player_screen;
        match action {
            Action::Paint(edit, mode) => match self.session.paint_active(&edit, mode) {
                Ok(0) => {}
                Ok(_) => self.dirty = true,
                Err(e) => self.report(e),
            },
            Action::PanBy(delta) => self.commit(|s| s.pan_active_by_map(delta, screen), false),
            Action::FogCommitted => self.save_active_fog(),
            Action::ViewportCommitted => self.save_session(),
        }
    }

    /// Apply a session edit, mark views dirty, optionally persist the session.
    fn commit(&mut self, edit: impl FnOnce(&mut Session) -> Result<()>, persist: bool) {
        match edit(&mut self.session) {
            Ok(()) => {
                self.dirty = true;
                if persist {
                    self.save_session();
                }
            }
            Err(e) => self.report(e),
        }
    }

    fn commit_fog(&mut self, edit: impl FnOnce(&mut Session) -> Result<()>) {
        match edit(&mut self.session) {
            Ok(()) => {
                self.dirty = true;
                self.save_active_fog();
            }
            Err(e) => self.report(e),
        }
    }

    fn switch_map(&mut self, step: fn(&mut Session)) {
        self.editor.cancel();
        step(&mut self.session);
        self.dirty = true;
        if let Some(map) = self.session.active() {
            debug!(id = %map.id, "active map changed");
        }
        self.save_session();
    }

    fn remove_active_map(&mut self) {
        let Some(id) = self.session.active().map(|m| m.id.clone()) else {
            return;
        };
        self.editor.cancel();
        match self.session.remove_map(&id) {
            Ok(removed) => {
                if let Err(e) = self.store.delete_map_files(&removed) {
                    self.report(e);
                }
                self.set_status(&format!("removed {}", removed.name));
                self.dirty = true;
                self.save_session();
            }
            Err(e) => self.report(e),
        }
    }

    /* ---------- persistence (failures are reported, never fatal) ---------- */

    fn save_active_fog(&mut self) {
        let result = match self.session.active() {
            Some(map) => self.store.save_fog(map),
            None => Ok(()),
        };
        if let Err(e) = result {
            self.report(e);
        }
    }

    /// Writes session.json and the fog masks of every loaded map.
    fn save_session(&mut self) {
        if let Err(e) = self.store.save(&self.session) {
            self.report(e);
        }
    }

    /* ---------- DM feedback ---------- */

    fn report(&mut self, e: Error) {
        error!(error = %e, "operation failed");
        self.set_status(&e.to_string());
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        self.update_title();
    }

    fn update_title(&mut self) {
        let map = match (self.session.active(), self.session.active_index()) {
            (Some(m), Some(i)) => format!("{} ({}/{})", m.name, i + 1, self.session.len()),
            _ => String::from("no map"),
        };
        let mode = match self.editor.mode {
            FogMode::Reveal => "reveal",
            FogMode::Hide => "hide",
        };
        let title = format!(
            "dmview: {} | {} | {} {} r={} | {}",
            self.session.name,
            map,
            self.editor.tool.label(),
            mode,
            self.editor.brush_size(),
            self.status
        );
        self.dm.set_title(&title);
    }

    /// Brush circle, rectangle preview and polygon-in-progress on top of the DM frame.
    fn draw_tool_overlay(&self, frame: &mut FrameBuffer) {
        let Some(map) = self.session.active() else { return };
        let layout = DmLayout::new(map.map_size(), frame.size());

        if let Some(r) = self.editor.rect_preview() {
            draw_rect_outline(frame, layout.rect_to_canvas(r), PREVIEW_COLOR);
        }

        let verts: Vec<Point> = self.editor.polygon_vertices().iter().map(|&v| layout.map_to_canvas(v)).collect();
        for pair in verts.windows(2) {
            draw_line(frame, pair[0].x as i32, pair[0].y as i32, pair[1].x as i32, pair[1].y as i32, PREVIEW_COLOR);
        }
        for v in &verts {
            draw_crosshair(frame, v.x as i32, v.y as i32, 3, PREVIEW_COLOR);
        }

        if let Some((mx, my)) = self.dm.mouse_pos() {
            match self.editor.tool {
                Tool::Brush => {
                    let color = match self.editor.mode {
                        FogMode::Reveal => CURSOR_COLOR,
                        FogMode::Hide => rgb(0xFF, 0x40, 0x40),
                    };
                    draw_circle(frame, mx as i32, my as i32, self.editor.brush_size() as i32, color);
                }
                Tool::Pan => draw_crosshair(frame, mx as i32, my as i32, 6, OVERLAY_COLOR),
                Tool::Rect | Tool::Polygon => draw_crosshair(frame, mx as i32, my as i32, 4, CURSOR_COLOR),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::DisplayGeometry;
    use crate::session::tests::test_map;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn brush_drag_paints_segments_then_commits() {
        let mut ed = Editor::new(30);
        let first = ed.press(pt(1.0, 1.0), false, 4.0);
        assert_eq!(first, vec![Action::Paint(FogEdit::Stroke(BrushStroke::dab(pt(1.0, 1.0), 4.0)), FogMode::Reveal)]);

        let seg = ed.drag(pt(5.0, 1.0));
        assert_eq!(
            seg,
            vec![Action::Paint(
                FogEdit::Stroke(BrushStroke { points: vec![pt(1.0, 1.0), pt(5.0, 1.0)], radius: 4.0 }),
                FogMode::Reveal
            )]
        );
        assert!(ed.drag(pt(5.0, 1.0)).is_empty());
        assert_eq!(ed.release(pt(5.0, 1.0)), vec![Action::FogCommitted]);
        assert!(ed.is_idle());
    }

    #[test]
    fn secondary_button_uses_opposite_mode() {
        let mut ed = Editor::new(30);
        ed.set_tool(Tool::Rect);
        assert!(ed.press(pt(0.0, 0.0), true, 1.0).is_empty());
        ed.drag(pt(4.0, 2.0));
        assert_eq!(ed.rect_preview(), Some(MapRect::new(0.0, 0.0, 4.0, 2.0)));
        let actions = ed.release(pt(6.0, 3.0));
        assert_eq!(
            actions,
            vec![Action::Paint(FogEdit::Rect(MapRect::new(0.0, 0.0, 6.0, 3.0)), FogMode::Hide), Action::FogCommitted]
        );
        assert_eq!(ed.rect_preview(), None);
    }

    #[test]
    fn pan_drag_emits_deltas_and_commits_viewport() {
        let mut ed = Editor::new(30);
        ed.set_tool(Tool::Pan);
        ed.press(pt(10.0, 10.0), false, 1.0);
        assert_eq!(ed.drag(pt(15.0, 8.0)), vec![Action::PanBy(pt(5.0, -2.0))]);
        assert_eq!(ed.release(pt(15.0, 8.0)), vec![Action::ViewportCommitted]);
    }

    #[test]
    fn polygon_needs_three_vertices() {
        let mut ed = Editor::new(30);
        ed.set_tool(Tool::Polygon);
        ed.press(pt(0.0, 0.0), false, 1.0);
        ed.press(pt(10.0, 0.0), false, 1.0);
        assert!(ed.close_polygon().is_empty());
        assert!(ed.polygon_vertices().is_empty());

        for p in [pt(0.0, 0.0), pt(10.0, 0.0), pt(0.0, 10.0)] {
            ed.press(p, false, 1.0);
        }
        let actions = ed.press(pt(3.0, 3.0), true, 1.0);
        assert_eq!(actions.len(), 2);
        assert!(matches!(&actions[0], Action::Paint(FogEdit::Polygon(p), FogMode::Reveal) if p.vertices.len() == 3));
    }

    fn table_tv() -> DisplayProfile {
        DisplayProfile {
            name: "Table TV".into(),
            geometry: DisplayGeometry { width_px: 800, height_px: 600, width_mm: 160.0, height_mm: 120.0 },
            x: 1920,
            y: 0,
        }
    }

    #[test]
    fn missing_player_display_runs_dm_only_with_status() {
        let mut session = Session::new("Crypt");
        session.add_map(test_map("a", Size::new(100, 100)));
        let setup = prepare_player(&mut session, Config::default().player_display().cloned());
        assert!(setup.profile.is_none());
        assert_eq!(setup.screen, FALLBACK_PLAYER_SCREEN);
        assert!(setup.status.unwrap().contains("configuration"));
        assert_eq!(session.active().unwrap().viewport.scale, 1.0);
    }

    #[test]
    fn invalid_geometry_keeps_the_window_and_reports() {
        let mut session = Session::new("Crypt");
        session.add_map(test_map("a", Size::new(100, 100)));
        let mut profile = table_tv();
        profile.geometry.width_mm = 0.0;
        let setup = prepare_player(&mut session, Ok(profile));
        assert!(setup.profile.is_some());
        assert_eq!(setup.screen, Size::new(800, 600));
        assert!(setup.status.is_some());
        assert_eq!(session.active().unwrap().viewport.scale, 1.0);

        let mut no_pixels = table_tv();
        no_pixels.geometry.width_px = 0;
        assert!(prepare_player(&mut session, Ok(no_pixels)).profile.is_none());
    }

    #[test]
    fn usable_display_applies_true_scale() {
        let mut session = Session::new("Crypt");
        session.add_map(test_map("a", Size::new(100, 100)));
        let setup = prepare_player(&mut session, Ok(table_tv()));
        assert!(setup.status.is_none());
        assert_eq!(setup.profile.unwrap().name, "Table TV");
        // 5 px/mm * 25.4 mm / 10 px per tile.
        assert!((session.active().unwrap().viewport.scale - 12.7).abs() < 1e-9);
    }

    #[test]
    fn switching_tool_cancels_polygon_and_brush_size_is_clamped() {
        let mut ed = Editor::new(1000);
        assert_eq!(ed.brush_size(), MAX_BRUSH);
        ed.adjust_brush(-500);
        assert_eq!(ed.brush_size(), MIN_BRUSH);

        ed.set_tool(Tool::Polygon);
        ed.press(pt(1.0, 1.0), false, 1.0);
        ed.set_tool(Tool::Brush);
        assert!(ed.is_idle());
    }
}

// The session owns every map; the DM and player views only ever borrow the
// active one, so an edit committed here is what both windows draw next.

use tracing::{debug, info, warn};

use crate::asset::MapAsset;
use crate::error::{Error, Result};
use crate::fog::{FogEdit, FogMask, FogMode};
use crate::metadata::MapMetadata;
use crate::persistence::MapRecord;
use crate::scale::{DisplayGeometry, DisplayScale};
use crate::types::{Point, Rotation, Size};
use crate::viewport::ViewportState;

/// Everything needed to show one map: image, metadata, fog and viewport.
#[derive(Clone, Debug)]
pub struct MapState {
    pub id: String,
    pub name: String,
    pub asset: MapAsset,
    pub metadata: MapMetadata,
    pub fog: FogMask,
    pub viewport: ViewportState,
}

impl MapState {
    /// A freshly imported map: initial fog and initial viewport from the metadata.
    pub fn new(id: impl Into<String>, name: impl Into<String>, asset: MapAsset, metadata: MapMetadata) -> Self {
        let fog = FogMask::filled(metadata.grid_size(), metadata.initial_fog);
        let viewport = ViewportState::from_placement(&metadata.initial_viewport, 1.0);
        Self { id: id.into(), name: name.into(), asset, metadata, fog, viewport }
    }

    /// Map size in map pixels (also the fog grid size).
    pub fn map_size(&self) -> Size {
        self.metadata.grid_size()
    }

    /// Back to the state the map was imported with.
    pub fn reset(&mut self, screen: Size) {
        self.fog.reset(self.metadata.initial_fog);
        let scale = self.viewport.scale;
        self.viewport = ViewportState::from_placement(&self.metadata.initial_viewport, scale);
        self.viewport.clamp(self.map_size(), screen);
    }

    /// Make the current viewport the one this map starts with.
    pub fn store_initial_viewport(&mut self) {
        self.metadata.initial_viewport = self.viewport.placement();
    }
}

/// An ordered collection of maps with one active map.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub name: String,
    maps: Vec<MapState>,
    active: Option<usize>,
    /// Records of maps that failed to load; saved back untouched, never activated.
    pub unavailable: Vec<MapRecord>,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn maps(&self) -> &[MapState] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&MapState> {
        self.active.and_then(|i| self.maps.get(i))
    }

    pub fn active_mut(&mut self) -> Option<&mut MapState> {
        self.active.and_then(|i| self.maps.get_mut(i))
    }

    fn require_active(&mut self) -> Result<&mut MapState> {
        self.active_mut().ok_or(Error::NoActiveMap)
    }

    /// Append a map and make it active (the DM just imported it to use it).
    pub fn add_map(&mut self, map: MapState) {
        info!(id = %map.id, name = %map.name, "map added to session");
        self.maps.push(map);
        self.active = Some(self.maps.len() - 1);
    }

    /// Remove by id; the active pointer stays on a valid map when one exists.
    pub fn remove_map(&mut self, id: &str) -> Result<MapState> {
        let idx = self
            .maps
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| Error::UnknownMap(id.to_string()))?;
        let removed = self.maps.remove(idx);
        self.active = match self.active {
            _ if self.maps.is_empty() => None,
            Some(a) if a > idx => Some(a - 1),
            Some(a) => Some(a.min(self.maps.len() - 1)),
            None => None,
        };
        info!(id = %removed.id, "map removed from session");
        Ok(removed)
    }

    pub fn set_active(&mut self, id: &str) -> Result<()> {
        let idx = self
            .maps
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| Error::UnknownMap(id.to_string()))?;
        self.active = Some(idx);
        Ok(())
    }

    /// Out-of-range indices are ignored.
    pub fn set_active_index(&mut self, index: usize) -> bool {
        if index < self.maps.len() {
            self.active = Some(index);
            true
        } else {
            false
        }
    }

    pub fn next_map(&mut self) {
        if !self.maps.is_empty() {
            self.active = Some(self.active.map_or(0, |a| (a + 1) % self.maps.len()));
        }
    }

    pub fn previous_map(&mut self) {
        if !self.maps.is_empty() {
            let n = self.maps.len();
            self.active = Some(self.active.map_or(0, |a| (a + n - 1) % n));
        }
    }

    /* ---------- edits on the active map (commit, then the caller redraws both views) ---------- */

    pub fn paint_active(&mut self, edit: &FogEdit, mode: FogMode) -> Result<usize> {
        Ok(self.require_active()?.fog.paint(edit, mode))
    }

    pub fn fill_active(&mut self, mode: FogMode) -> Result<()> {
        let map = self.require_active()?;
        map.fog.fill(mode);
        debug!(id = %map.id, ?mode, "fog filled");
        Ok(())
    }

    pub fn reset_active(&mut self, screen: Size) -> Result<()> {
        self.require_active()?.reset(screen);
        Ok(())
    }

    pub fn pan_active_by_map(&mut self, delta: Point, screen: Size) -> Result<()> {
        let map = self.require_active()?;
        let size = map.map_size();
        map.viewport.pan_by_map(delta, size, screen);
        Ok(())
    }

    pub fn pan_active_by_screen(&mut self, delta: Point, screen: Size) -> Result<()> {
        let map = self.require_active()?;
        let size = map.map_size();
        map.viewport.pan_by_screen(delta, size, screen);
        Ok(())
    }

    pub fn rotate_active(&mut self, rotation: Rotation, screen: Size) -> Result<()> {
        let map = self.require_active()?;
        let size = map.map_size();
        map.viewport.set_rotation(rotation, size, screen);
        debug!(id = %map.id, degrees = rotation.degrees(), "viewport rotated");
        Ok(())
    }

    /// Give every map its true-size scale on `display` and re-clamp pans.
    /// Returns true when any map had to fall back to the smaller pixel pitch.
    /// On error no map is changed.
    pub fn apply_display_scale(&mut self, display: &DisplayGeometry) -> Result<bool> {
        let screen = Size::new(display.width_px, display.height_px);
        let scales = self
            .maps
            .iter()
            .map(|m| DisplayScale::compute(display, &m.metadata))
            .collect::<Result<Vec<_>>>()?;
        let mut non_uniform = false;
        for (map, scale) in self.maps.iter_mut().zip(scales) {
            non_uniform |= scale.non_uniform;
            map.viewport.scale = scale.map_scale;
            let size = map.map_size();
            map.viewport.clamp(size, screen);
        }
        if non_uniform {
            warn!("player display has non-square pixels; maps use the smaller pitch");
        }
        Ok(non_uniform)
    }

    /// Assemble a session from already loaded parts (used by persistence).
    pub(crate) fn from_parts(name: String, maps: Vec<MapState>, active: Option<usize>, unavailable: Vec<MapRecord>) -> Self {
        let active = match active {
            Some(i) if i < maps.len() => Some(i),
            _ if maps.is_empty() => None,
            _ => Some(0),
        };
        Self { name, maps, active, unavailable }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fog::BrushStroke;
    use crate::metadata::FogFill;

    /// A small striped map for tests elsewhere in the crate too.
    pub(crate) fn test_map(id: &str, size: Size) -> MapState {
        let pixels = (0..size.area()).map(|i| if i % 2 == 0 { 0x00C0_8040 } else { 0x0020_6080 }).collect();
        let asset = MapAsset { source: format!("maps/{id}.png"), width: size.width, height: size.height, pixels };
        let meta = MapMetadata::for_image(size, 10, 25.4).unwrap();
        MapState::new(id, id.to_uppercase(), asset, meta)
    }

    #[test]
    fn add_activates_and_remove_keeps_pointer_valid() {
        let mut s = Session::new("Crypt");
        assert!(s.active().is_none());
        s.add_map(test_map("a", Size::new(20, 20)));
        s.add_map(test_map("b", Size::new(20, 20)));
        s.add_map(test_map("c", Size::new(20, 20)));
        assert_eq!(s.active().unwrap().id, "c");

        s.remove_map("c").unwrap();
        assert_eq!(s.active().unwrap().id, "b");
        s.set_active("a").unwrap();
        s.remove_map("b").unwrap();
        assert_eq!(s.active().unwrap().id, "a");
        s.remove_map("a").unwrap();
        assert!(s.active().is_none());
        assert!(matches!(s.remove_map("a"), Err(Error::UnknownMap(_))));
    }

    #[test]
    fn removing_an_earlier_map_shifts_the_active_index() {
        let mut s = Session::new("Crypt");
        for id in ["a", "b", "c"] {
            s.add_map(test_map(id, Size::new(10, 10)));
        }
        s.remove_map("a").unwrap();
        assert_eq!(s.active().unwrap().id, "c");
    }

    #[test]
    fn next_and_previous_wrap() {
        let mut s = Session::new("Crypt");
        for id in ["a", "b"] {
            s.add_map(test_map(id, Size::new(10, 10)));
        }
        s.next_map();
        assert_eq!(s.active().unwrap().id, "a");
        s.previous_map();
        assert_eq!(s.active().unwrap().id, "b");
        assert!(!s.set_active_index(2));
    }

    #[test]
    fn edits_without_active_map_fail() {
        let mut s = Session::new("Empty");
        let edit = FogEdit::Stroke(BrushStroke::dab(Point::new(1.0, 1.0), 1.0));
        assert!(matches!(s.paint_active(&edit, FogMode::Reveal), Err(Error::NoActiveMap)));
        assert!(matches!(s.fill_active(FogMode::Hide), Err(Error::NoActiveMap)));
    }

    #[test]
    fn reset_restores_initial_fog_and_viewport() {
        let screen = Size::new(50, 50);
        let mut s = Session::new("Crypt");
        let mut map = test_map("a", Size::new(200, 200));
        map.metadata.initial_fog = FogFill::Revealed;
        map.fog.reset(FogFill::Revealed);
        s.add_map(map);

        s.fill_active(FogMode::Hide).unwrap();
        s.pan_active_by_map(Point::new(40.0, 40.0), screen).unwrap();
        s.rotate_active(Rotation::Deg180, screen).unwrap();
        s.reset_active(screen).unwrap();

        let m = s.active().unwrap();
        assert_eq!(m.fog.revealed_count(), 200 * 200);
        assert_eq!(m.viewport.pan, Point::ZERO);
        assert_eq!(m.viewport.rotation, Rotation::Deg0);
    }

    #[test]
    fn display_scale_applies_to_every_map() {
        let mut s = Session::new("Crypt");
        s.add_map(test_map("a", Size::new(100, 100)));
        let display = DisplayGeometry { width_px: 800, height_px: 600, width_mm: 160.0, height_mm: 120.0 };
        assert!(!s.apply_display_scale(&display).unwrap());
        // 5 px/mm * 25.4 mm / 10 px per tile.
        assert!((s.active().unwrap().viewport.scale - 12.7).abs() < 1e-9);

        let bad = DisplayGeometry { width_mm: 0.0, ..display };
        assert!(matches!(s.apply_display_scale(&bad), Err(Error::Configuration(_))));
    }

    #[test]
    fn display_scale_is_all_or_nothing() {
        let mut s = Session::new("Crypt");
        s.add_map(test_map("a", Size::new(100, 100)));
        let mut broken = test_map("b", Size::new(100, 100));
        broken.metadata.tile_size_mm = 0.0;
        s.add_map(broken);

        let display = DisplayGeometry { width_px: 800, height_px: 600, width_mm: 160.0, height_mm: 120.0 };
        assert!(matches!(s.apply_display_scale(&display), Err(Error::Configuration(_))));
        assert!(s.maps().iter().all(|m| m.viewport.scale == 1.0));
    }
}

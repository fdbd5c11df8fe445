// Session directory on disk:
//   <session>/session.json          name, active map, one record per map
//   <session>/maps/<image>          the imported map image (copied verbatim)
//   <session>/maps/<stem>_fog.png   current fog grid, 0 = hidden, 255 = revealed

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::asset::MapAsset;
use crate::error::{Error, Result};
use crate::fog::FogMask;
use crate::metadata::{FogFill, MapMetadata, TileCalibration, ViewportPlacement};
use crate::session::{MapState, Session};
use crate::viewport::ViewportState;

pub const SESSION_FILE: &str = "session.json";
pub const MAPS_DIR: &str = "maps";

/// The persisted form of one map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    pub id: String,
    pub name: String,
    pub image_file: String,
    pub fog_file: String,
    pub columns: u32,
    pub rows: u32,
    pub tile_pixels: u32,
    pub tile_size_mm: f64,
    pub width_px: u32,
    pub height_px: u32,
    #[serde(default)]
    pub initial_fog: FogFill,
    #[serde(default)]
    pub initial_viewport: ViewportPlacement,
    #[serde(default)]
    pub viewport: ViewportPlacement,
}

impl MapRecord {
    pub fn from_state(map: &MapState) -> Self {
        let m = &map.metadata;
        Self {
            id: map.id.clone(),
            name: map.name.clone(),
            image_file: map.asset.source.clone(),
            fog_file: fog_file_for(&map.asset.source),
            columns: m.columns,
            rows: m.rows,
            tile_pixels: m.tile_pixels,
            tile_size_mm: m.tile_size_mm,
            width_px: m.width_px,
            height_px: m.height_px,
            initial_fog: m.initial_fog,
            initial_viewport: m.initial_viewport,
            viewport: map.viewport.placement(),
        }
    }

    pub fn metadata(&self) -> MapMetadata {
        MapMetadata {
            columns: self.columns,
            rows: self.rows,
            tile_pixels: self.tile_pixels,
            tile_size_mm: self.tile_size_mm,
            width_px: self.width_px,
            height_px: self.height_px,
            initial_fog: self.initial_fog,
            initial_viewport: self.initial_viewport,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    name: String,
    #[serde(default)]
    active_map_index: usize,
    #[serde(default)]
    maps: Vec<MapRecord>,
}

/// A map that could not be brought back; the rest of the session still loads.
#[derive(Debug)]
pub struct MapLoadFailure {
    pub id: String,
    pub name: String,
    pub error: Error,
}

/// `maps/cave.png` -> `maps/cave_fog.png`
pub fn fog_file_for(image_file: &str) -> String {
    let stem = image_file.rsplit_once('.').map_or(image_file, |(stem, _)| stem);
    format!("{stem}_fog.png")
}

fn slug(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Create `<base>/<slug(name)>` with an empty session in it.
    pub fn create_new(base: &Path, name: &str) -> Result<(Self, Session)> {
        let dir = base.join(slug(name));
        fs::create_dir_all(dir.join(MAPS_DIR))?;
        let store = Self { dir };
        let session = Session::new(name);
        store.save(&session)?;
        info!(dir = %store.dir.display(), "session created");
        Ok((store, session))
    }

    pub fn open_existing(dir: &Path) -> Result<Self> {
        let file = dir.join(SESSION_FILE);
        if !file.is_file() {
            return Err(Error::Metadata { path: file, reason: "session file not found".into() });
        }
        Ok(Self { dir: dir.to_path_buf() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_file(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Write session.json and every fog mask.
    pub fn save(&self, session: &Session) -> Result<()> {
        let mut maps: Vec<MapRecord> = session.maps().iter().map(MapRecord::from_state).collect();
        maps.extend(session.unavailable.iter().cloned());
        let record = SessionRecord {
            name: session.name.clone(),
            active_map_index: session.active_index().unwrap_or(0),
            maps,
        };
        fs::write(self.session_file(), serde_json::to_string_pretty(&record)?)?;

        for map in session.maps() {
            self.save_fog(map)?;
        }
        info!(dir = %self.dir.display(), maps = session.len(), "session saved");
        Ok(())
    }

    pub fn save_fog(&self, map: &MapState) -> Result<()> {
        let path = self.dir.join(fog_file_for(&map.asset.source));
        map.fog.to_gray_image().save(&path)?;
        Ok(())
    }

    /// Rebuild every map. Maps that fail are reported and kept aside, never activated.
    pub fn load(&self) -> Result<(Session, Vec<MapLoadFailure>)> {
        let path = self.session_file();
        let text = fs::read_to_string(&path)?;
        let record: SessionRecord = serde_json::from_str(&text)
            .map_err(|e| Error::Metadata { path: path.clone(), reason: e.to_string() })?;

        let mut maps = Vec::new();
        let mut unavailable = Vec::new();
        let mut failures = Vec::new();
        let mut active = None;
        for (i, map_record) in record.maps.into_iter().enumerate() {
            match self.load_map(&map_record) {
                Ok(map) => {
                    if i == record.active_map_index {
                        active = Some(maps.len());
                    }
                    maps.push(map);
                }
                Err(error) => {
                    warn!(id = %map_record.id, %error, "map excluded from session");
                    failures.push(MapLoadFailure {
                        id: map_record.id.clone(),
                        name: map_record.name.clone(),
                        error,
                    });
                    unavailable.push(map_record);
                }
            }
        }

        info!(dir = %self.dir.display(), loaded = maps.len(), failed = failures.len(), "session loaded");
        Ok((Session::from_parts(record.name, maps, active, unavailable), failures))
    }

    fn load_map(&self, record: &MapRecord) -> Result<MapState> {
        let metadata = record.metadata();
        metadata.validate().map_err(|e| Error::Metadata {
            path: self.session_file(),
            reason: format!("map {}: {e}", record.id),
        })?;
        let asset = MapAsset::load(&self.dir.join(&record.image_file), record.image_file.clone())?;
        if asset.size() != metadata.grid_size() {
            return Err(Error::Metadata {
                path: self.session_file(),
                reason: format!(
                    "map {} declares {} but its image is {}",
                    record.id,
                    metadata.grid_size(),
                    asset.size()
                ),
            });
        }

        let fog_path = self.dir.join(&record.fog_file);
        let fog = if fog_path.is_file() {
            let img = image::open(&fog_path)?.to_luma8();
            FogMask::from_gray_image(&record.id, &img, metadata.grid_size())?
        } else {
            warn!(id = %record.id, "fog mask missing, starting from the initial fog");
            FogMask::filled(metadata.grid_size(), metadata.initial_fog)
        };

        let viewport = ViewportState::from_placement(&record.viewport, 1.0);
        Ok(MapState {
            id: record.id.clone(),
            name: record.name.clone(),
            asset,
            metadata,
            fog,
            viewport,
        })
    }

    /// Copy an image into maps/, decode it and create its initial fog mask.
    pub fn import_map(&self, source: &Path, name: &str, calibration: TileCalibration) -> Result<MapState> {
        let maps_dir = self.dir.join(MAPS_DIR);
        fs::create_dir_all(&maps_dir)?;

        let file_name = unique_file_name(&maps_dir, source)?;
        let dest = maps_dir.join(&file_name);
        fs::copy(source, &dest)?;
        let relative = format!("{MAPS_DIR}/{file_name}");

        let decoded = MapAsset::load(&dest, relative)
            .and_then(|asset| calibration.metadata_for(asset.size()).map(|meta| (asset, meta)));
        let (asset, metadata) = match decoded {
            Ok(parts) => parts,
            Err(e) => {
                let _ = fs::remove_file(&dest);
                return Err(e);
            }
        };
        let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let map = MapState::new(id, name, asset, metadata);
        self.save_fog(&map)?;

        info!(id = %map.id, name, image = %map.asset.source, tile_pixels = map.metadata.tile_pixels, "map imported");
        Ok(map)
    }

    /// Import several images into `session`. Failures are returned, the rest are added.
    pub fn import_all(
        &self,
        session: &mut Session,
        sources: &[(PathBuf, String)],
        calibration: TileCalibration,
    ) -> Vec<(PathBuf, Error)> {
        let mut failures = Vec::new();
        for (path, name) in sources {
            match self.import_map(path, name, calibration) {
                Ok(map) => session.add_map(map),
                Err(error) => {
                    warn!(path = %path.display(), %error, "import failed");
                    failures.push((path.clone(), error));
                }
            }
        }
        failures
    }

    /// Delete a removed map's image and fog files.
    pub fn delete_map_files(&self, map: &MapState) -> Result<()> {
        for rel in [map.asset.source.clone(), fog_file_for(&map.asset.source)] {
            let path = self.dir.join(rel);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    /// Write a complete, independently loadable copy of the session to `dest`.
    pub fn export_to(&self, session: &Session, dest: &Path) -> Result<SessionStore> {
        fs::create_dir_all(dest.join(MAPS_DIR))?;
        // Unavailable maps keep their last fog file; loaded ones are rewritten by save().
        let files = session
            .maps()
            .iter()
            .map(|m| m.asset.source.clone())
            .chain(session.unavailable.iter().flat_map(|r| [r.image_file.clone(), r.fog_file.clone()]));
        for rel in files {
            let from = self.dir.join(&rel);
            if from.is_file() {
                fs::copy(&from, dest.join(&rel))?;
            }
        }
        let exported = SessionStore { dir: dest.to_path_buf() };
        exported.save(session)?;
        Ok(exported)
    }
}

/// `cave.png`, then `cave_1.png`, `cave_2.png`... whichever is free.
fn unique_file_name(dir: &Path, source: &Path) -> Result<String> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::config(format!("not an image file name: {}", source.display())))?;
    let ext = source.extension().and_then(|s| s.to_str()).unwrap_or("png");

    let mut candidate = format!("{stem}.{ext}");
    let mut counter = 1;
    while dir.join(&candidate).exists() {
        candidate = format!("{stem}_{counter}.{ext}");
        counter += 1;
    }
    Ok(candidate)
}

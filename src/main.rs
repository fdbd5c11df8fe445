// What you SEE:
// • A DM window with the whole map (fog dimmed) and a borderless player window
//   on the table display showing the map at true size (fog black).
// • Sessions live in a directory; --new creates one, --session opens one,
//   otherwise the last used session is reopened.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info, warn};

use dmview::app::App;
use dmview::config::Config;
use dmview::error::{Error, Result};
use dmview::metadata::TileCalibration;
use dmview::persistence::SessionStore;
use dmview::scale::pixels_per_mm;
use dmview::session::Session;

#[derive(Parser, Debug)]
#[command(name = "dmview", about = "Fog-of-war map projector for tabletop play")]
struct Cli {
    /// Session directory to open.
    #[arg(short, long)]
    session: Option<PathBuf>,

    /// Create a new session with this name under the sessions directory.
    #[arg(long, value_name = "NAME", conflicts_with = "session")]
    new: Option<String>,

    /// Index into the configured displays used for the player window.
    #[arg(short = 'm', long)]
    player_monitor: Option<usize>,

    /// Print the configured displays and exit.
    #[arg(long)]
    list_monitors: bool,

    /// Map images to import into the session before starting.
    #[arg(long, value_name = "IMAGE")]
    import: Vec<PathBuf>,

    /// Display name for imported maps (defaults to the file name).
    #[arg(long, requires = "import")]
    name: Option<String>,

    /// Pixels per tile in the imported image.
    #[arg(long, conflicts_with_all = ["tiles_across", "image_width_mm"])]
    tile_pixels: Option<u32>,

    /// Number of tiles spanning the imported image horizontally.
    #[arg(long, conflicts_with = "image_width_mm")]
    tiles_across: Option<u32>,

    /// Printed width of the imported image in millimeters.
    #[arg(long)]
    image_width_mm: Option<f64>,

    /// Physical tile size in millimeters (default from config, 25.4).
    #[arg(long)]
    tile_mm: Option<f64>,
}

impl Cli {
    fn calibration(&self, config: &Config) -> TileCalibration {
        let tile_size_mm = self.tile_mm.unwrap_or(config.default_tile_size_mm);
        match (self.tile_pixels, self.tiles_across, self.image_width_mm) {
            (_, Some(columns), _) => TileCalibration::TilesAcross { columns, tile_size_mm },
            (_, _, Some(width_mm)) => TileCalibration::ImageWidthMm { width_mm, tile_size_mm },
            (tile_pixels, _, _) => TileCalibration::PixelsPerTile {
                tile_pixels: tile_pixels.unwrap_or(config.default_tile_pixels),
                tile_size_mm,
            },
        }
    }
}

fn main() -> std::result::Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load();
    if let Some(index) = cli.player_monitor {
        config.player_monitor = Some(index);
    }

    if cli.list_monitors {
        list_monitors(&config);
        return Ok(());
    }

    /* --- Session ---
       Visual: the DM starts where they left off unless told otherwise. */
    let (store, mut session) = open_session(&cli, &config)?;

    if !cli.import.is_empty() {
        let sources: Vec<(PathBuf, String)> = cli
            .import
            .iter()
            .map(|path| (path.clone(), cli.name.clone().unwrap_or_else(|| display_name(path))))
            .collect();
        let failures = store.import_all(&mut session, &sources, cli.calibration(&config));
        for (path, e) in &failures {
            error!(path = %path.display(), error = %e, "map not imported");
        }
        if let Err(e) = store.save(&session) {
            error!(error = %e, "could not save session after import");
        }
    }

    config.last_session_path = Some(store.dir().to_path_buf());
    if let Err(e) = config.save() {
        warn!(error = %e, "could not save config");
    }

    let player = config.player_display().cloned();
    App::new(session, store, config, player)?.run()
}

fn open_session(cli: &Cli, config: &Config) -> Result<(SessionStore, Session)> {
    if let Some(name) = &cli.new {
        return SessionStore::create_new(&config.sessions_dir(), name);
    }
    let dir = cli
        .session
        .clone()
        .or_else(|| config.last_session_path.clone())
        .ok_or_else(|| Error::config("no session to open; pass --session DIR or --new NAME"))?;

    let store = SessionStore::open_existing(&dir)?;
    let (session, failures) = store.load()?;
    for failure in &failures {
        warn!(id = %failure.id, name = %failure.name, error = %failure.error, "map skipped");
    }
    info!(session = %session.name, maps = session.len(), "session opened");
    Ok((store, session))
}

/// `maps/old_crypt.png` -> `old crypt`
fn display_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.replace('_', " "))
        .unwrap_or_else(|| String::from("map"))
}

fn list_monitors(config: &Config) {
    if config.displays.is_empty() {
        println!("no displays configured; add them to the `displays` list in config.json");
        return;
    }
    for (i, d) in config.displays.iter().enumerate() {
        let marker = if config.player_monitor == Some(i) { "*" } else { " " };
        let g = &d.geometry;
        let pitch = match pixels_per_mm(g) {
            Ok(p) => format!("{:.2} px/mm", p.uniform()),
            Err(e) => e.to_string(),
        };
        println!(
            "{marker} {i}: {} {}x{} px, {}x{} mm at ({}, {}), {pitch}",
            d.name, g.width_px, g.height_px, g.width_mm, g.height_mm, d.x, d.y
        );
    }
}

// Error type shared by the fog engine, persistence and the windows.
// Every variant states *where* things went wrong, so the DM sees a useful message.
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Size;

#[derive(Debug, Error)]
pub enum Error {
    /// Display geometry or tile settings are missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stored fog mask does not match the grid declared by the map metadata.
    #[error("corrupt fog mask for {map}: expected {expected}, found {found}")]
    CorruptMask {
        map: String,
        expected: Size,
        found: Size,
    },

    /// The map image could not be decoded; the map is unusable.
    #[error("map unusable, failed to load {path}: {reason}")]
    AssetLoad { path: PathBuf, reason: String },

    /// A session or map record is missing required fields or is malformed.
    #[error("invalid metadata in {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },

    #[error("no map with id {0}")]
    UnknownMap(String),

    #[error("no active map")]
    NoActiveMap,

    // Creating or updating a window failed
    #[error("window error: {0}")]
    Window(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Shorthand for the most common failure in the scale path.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

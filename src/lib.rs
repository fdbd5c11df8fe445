//! Fog-of-war and true-scale viewport engine for projecting battle maps onto a
//! tabletop display, with a separate DM control view.

pub mod app;
pub mod asset;
pub mod config;
pub mod draw;
pub mod error;
pub mod fog;
pub mod gamma;
pub mod metadata;
pub mod persistence;
pub mod render;
pub mod scale;
pub mod session;
pub mod types;
pub mod viewport;

pub use error::{Error, Result};

//! Tile-space region capture
//!
//! This module consolidates:
//! - Capture failure taxonomy (error.rs)
//! - Single tile retrieval (fetch.rs)
//! - Tile enumeration, clipping and compositing (stitch.rs)
//! - Captured region artifact and PNG encoding (image.rs)

pub mod error;
pub mod fetch;
pub mod image;
pub mod stitch;

pub use error::CaptureError;
pub use fetch::{FALLBACK_TILE_BASE_URL, HttpTileSource, TileSource};
pub use self::image::CapturedRegion;
pub use stitch::{CaptureLimits, stitch};

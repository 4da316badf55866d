//! Failure taxonomy of a capture

use std::time::Duration;

use crate::domain::TileIndex;

/// Every variant aborts the whole capture; nothing is retried and no partial
/// artifact is produced
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture cancelled")]
    Cancelled,

    #[error("the coordinate readout did not update within {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("invalid capture region {width}x{height}")]
    InvalidRegion { width: i64, height: i64 },

    #[error("capture region {width}x{height} exceeds the limit of {limit}")]
    RegionTooLarge {
        width: i64,
        height: i64,
        limit: String,
    },

    #[error("failed to fetch tile {tile}: {reason}")]
    Network { tile: TileIndex, reason: String },

    #[error("tile {tile} is not a valid image: {source}")]
    Decode {
        tile: TileIndex,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode capture: {0}")]
    Encode(String),

    #[error("failed to save capture: {0:#}")]
    Sink(anyhow::Error),
}

impl CaptureError {
    /// Cancellation is an intentional user action and is not reported
    pub fn is_silent(&self) -> bool {
        matches!(self, CaptureError::Cancelled)
    }
}

//! Seams between the pick/capture protocol and its collaborators

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::Rect;

/// Default bound on waiting for the readout after a gesture
pub const DEFAULT_READOUT_TIMEOUT: Duration = Duration::from_secs(6);
pub const DEFAULT_READOUT_POLL: Duration = Duration::from_millis(100);

/// Current bounding box of the live tiled surface
pub trait SurfaceBounds {
    fn surface_rect(&self) -> Rect;
}

impl SurfaceBounds for Rect {
    fn surface_rect(&self) -> Rect {
        *self
    }
}

/// Read-only access to the overlay's coordinate readout
pub trait ReadoutSource {
    /// Current text, `None` when the readout is not available
    fn read_text(&self) -> Option<String>;
}

impl<T: ReadoutSource + ?Sized> ReadoutSource for &T {
    fn read_text(&self) -> Option<String> {
        (**self).read_text()
    }
}

/// No readout configured
impl<T: ReadoutSource> ReadoutSource for Option<T> {
    fn read_text(&self) -> Option<String> {
        self.as_ref().and_then(ReadoutSource::read_text)
    }
}

/// Receiver of finished captures
pub trait ArtifactSink {
    /// Hand over an encoded PNG; returns where it ended up
    fn deliver(&self, file_name: &str, png: &[u8]) -> anyhow::Result<PathBuf>;
}

/// Timing of the readout wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PickTiming {
    pub readout_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for PickTiming {
    fn default() -> Self {
        Self {
            readout_timeout: DEFAULT_READOUT_TIMEOUT,
            poll_interval: DEFAULT_READOUT_POLL,
        }
    }
}

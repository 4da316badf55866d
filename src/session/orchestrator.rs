//! Capture orchestration: pick, normalize, stitch, encode, deliver

use std::path::PathBuf;

use tokio::sync::{mpsc, watch};

use super::pick::PickSession;
use super::ports::{ArtifactSink, PickTiming, ReadoutSource, SurfaceBounds};
use crate::capture::{CaptureError, CaptureLimits, CapturedRegion, TileSource, stitch};
use crate::domain::{CaptureRect, PickState, PickStatus, SurfaceEvent, TileGrid};

const SESSION_LABEL: &str = "Capture region";

/// Grid, size limits and pick timing of a capture
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureSettings {
    pub grid: TileGrid,
    pub limits: CaptureLimits,
    pub timing: PickTiming,
}

/// Summary of a delivered capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub rect: CaptureRect,
    pub width: u32,
    pub height: u32,
    pub file_name: String,
    pub location: PathBuf,
}

/// Drives one capture at a time from corner picks to a delivered artifact
pub struct CaptureOrchestrator<S, B, R, K> {
    source: S,
    surface: B,
    readout: R,
    sink: K,
    settings: CaptureSettings,
    status: watch::Sender<PickStatus>,
}

impl<S, B, R, K> CaptureOrchestrator<S, B, R, K>
where
    S: TileSource,
    B: SurfaceBounds,
    R: ReadoutSource,
    K: ArtifactSink,
{
    pub fn new(source: S, surface: B, readout: R, sink: K, settings: CaptureSettings) -> Self {
        let status = watch::Sender::new(PickStatus {
            state: PickState::Idle,
            label: SESSION_LABEL.to_string(),
        });
        Self {
            source,
            surface,
            readout,
            sink,
            settings,
            status,
        }
    }

    /// Pick session progress, for rendering feedback
    pub fn subscribe(&self) -> watch::Receiver<PickStatus> {
        self.status.subscribe()
    }

    /// Run a full interactive capture
    ///
    /// Holding `&mut self` for the whole capture is what keeps captures from
    /// interleaving; trigger events arriving meanwhile are rejected by the
    /// session.
    pub async fn capture(
        &mut self,
        events: &mut mpsc::Receiver<SurfaceEvent>,
    ) -> Result<CaptureOutcome, CaptureError> {
        let session = PickSession::new(
            SESSION_LABEL,
            self.settings.grid,
            &self.surface,
            &self.readout,
            events,
            self.settings.timing,
            &self.status,
        );
        let (first, second) = session.run().await?;
        let rect = CaptureRect::normalize(first, second);
        self.capture_rect(rect).await
    }

    /// Stitch, encode and deliver a rectangle given directly
    pub async fn capture_rect(&self, rect: CaptureRect) -> Result<CaptureOutcome, CaptureError> {
        let CaptureSettings { grid, limits, .. } = self.settings;
        let raster = stitch(&self.source, grid, rect, &limits).await?;
        let region = CapturedRegion::new(raster, rect);
        let (width, height) = (region.width(), region.height());
        let file_name = region.file_name(grid, &chrono::Local::now());

        let png = tokio::task::spawn_blocking(move || region.into_png())
            .await
            .map_err(|e| CaptureError::Encode(e.to_string()))?
            .map_err(|e| CaptureError::Encode(e.to_string()))?;

        let location = self
            .sink
            .deliver(&file_name, &png)
            .map_err(CaptureError::Sink)?;
        log::info!("Capture saved to {}", location.display());

        Ok(CaptureOutcome {
            rect,
            width,
            height,
            file_name,
            location,
        })
    }
}

//! Two-corner pick session
//!
//! A session waits for a primary click on the surface, then for the overlay
//! readout to change to a new parseable coordinate, twice. Cancel events,
//! closed input and readout timeouts end it in [`PickState::Cancelled`].

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use super::ports::{PickTiming, ReadoutSource, SurfaceBounds};
use crate::capture::CaptureError;
use crate::domain::{
    GlobalPixel, PickState, PickStatus, PointerButton, SurfaceEvent, TileCoord, TileGrid,
    parse_readout,
};

/// Outcome of one wake-up while waiting for the readout
enum ReadoutStep {
    Poll,
    Event(Option<SurfaceEvent>),
    TimedOut,
}

/// Single-use selection of two corners
///
/// The session borrows the event stream for its whole lifetime, so no other
/// session can listen to the same gestures while it runs.
pub struct PickSession<'a, B, R> {
    label: String,
    grid: TileGrid,
    surface: &'a B,
    readout: &'a R,
    events: &'a mut mpsc::Receiver<SurfaceEvent>,
    timing: PickTiming,
    status: &'a watch::Sender<PickStatus>,
    state: PickState,
}

impl<'a, B: SurfaceBounds, R: ReadoutSource> PickSession<'a, B, R> {
    pub fn new(
        label: impl Into<String>,
        grid: TileGrid,
        surface: &'a B,
        readout: &'a R,
        events: &'a mut mpsc::Receiver<SurfaceEvent>,
        timing: PickTiming,
        status: &'a watch::Sender<PickStatus>,
    ) -> Self {
        let label = label.into();
        status.send_replace(PickStatus {
            state: PickState::Idle,
            label: label.clone(),
        });
        Self {
            label,
            grid,
            surface,
            readout,
            events,
            timing,
            status,
            state: PickState::Idle,
        }
    }

    /// Run the protocol to completion and yield both corners in click order
    pub async fn run(mut self) -> Result<(GlobalPixel, GlobalPixel), CaptureError> {
        let result = self.pick_both().await;
        match &result {
            Ok((first, second)) => {
                log::info!("Picked corners {:?} and {:?}", first, second);
                self.transition(PickState::Done, "corners picked");
            }
            Err(err) => {
                log::info!("Pick session ended: {}", err);
                self.transition(PickState::Cancelled, "cancelled");
            }
        }
        result
    }

    async fn pick_both(&mut self) -> Result<(GlobalPixel, GlobalPixel), CaptureError> {
        self.transition(PickState::AwaitingFirstClick, "click the first corner");
        let first = self
            .pick_corner(PickState::AwaitingFirstReadout, "waiting for the first corner")
            .await?;
        self.transition(PickState::AwaitingSecondClick, "click the second corner");
        let second = self
            .pick_corner(PickState::AwaitingSecondReadout, "waiting for the second corner")
            .await?;
        Ok((first, second))
    }

    async fn pick_corner(
        &mut self,
        readout_state: PickState,
        step: &str,
    ) -> Result<GlobalPixel, CaptureError> {
        self.await_gesture().await?;
        // Baseline is whatever the overlay showed when the click arrived
        let baseline = self.readout.read_text();
        self.transition(readout_state, step);
        let coord = self.await_readout_change(baseline).await?;
        log::debug!("Readout resolved to {}", coord);
        Ok(self.grid.coord_to_global(coord))
    }

    async fn await_gesture(&mut self) -> Result<(), CaptureError> {
        loop {
            match self.events.recv().await {
                Some(SurfaceEvent::Pointer { button, x, y }) => {
                    let bounds = self.surface.surface_rect();
                    if button == PointerButton::Primary && bounds.contains_point(x, y) {
                        return Ok(());
                    }
                    log::debug!(
                        "Ignoring {} click at ({}, {}), surface is {:?}",
                        button,
                        x,
                        y,
                        bounds
                    );
                }
                Some(SurfaceEvent::Trigger) => reject_trigger(),
                Some(SurfaceEvent::Cancel) | None => return Err(CaptureError::Cancelled),
            }
        }
    }

    async fn await_readout_change(
        &mut self,
        baseline: Option<String>,
    ) -> Result<TileCoord, CaptureError> {
        let deadline = Instant::now() + self.timing.readout_timeout;
        let mut poll = tokio::time::interval(self.timing.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let step = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => ReadoutStep::TimedOut,
                event = self.events.recv() => ReadoutStep::Event(event),
                _ = poll.tick() => ReadoutStep::Poll,
            };
            match step {
                ReadoutStep::TimedOut => {
                    return Err(CaptureError::Timeout(self.timing.readout_timeout));
                }
                ReadoutStep::Event(Some(SurfaceEvent::Cancel) | None) => {
                    return Err(CaptureError::Cancelled);
                }
                ReadoutStep::Event(Some(SurfaceEvent::Trigger)) => reject_trigger(),
                ReadoutStep::Event(Some(SurfaceEvent::Pointer { .. })) => {
                    log::debug!("Ignoring click while waiting for the readout");
                }
                ReadoutStep::Poll => {
                    let current = self.readout.read_text();
                    if current == baseline {
                        continue;
                    }
                    let parsed = current
                        .as_deref()
                        .and_then(parse_readout)
                        .filter(|coord| coord.is_valid_for(self.grid));
                    if let Some(coord) = parsed {
                        return Ok(coord);
                    }
                }
            }
        }
    }

    fn transition(&mut self, state: PickState, step: &str) {
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
        self.status.send_replace(PickStatus {
            state,
            label: format!("{}: {}", self.label, step),
        });
    }
}

fn reject_trigger() {
    log::warn!("A capture is already in progress, ignoring capture request");
}

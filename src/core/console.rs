//! Console bridge for interactive picks
//!
//! Gestures come from stdin one command per line, the readout from a file
//! the overlay bridge keeps up to date.

use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};

use crate::domain::{PickStatus, SurfaceEvent};
use crate::session::ReadoutSource;
use crate::session::shortcuts::{ConsoleCommand, handle_console_line};

/// Readout text stored in a file
pub struct FileReadout {
    path: PathBuf,
}

impl FileReadout {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReadoutSource for FileReadout {
    fn read_text(&self) -> Option<String> {
        std::fs::read_to_string(&self.path).ok()
    }
}

/// Forward console commands as surface events until `quit` or end of input
///
/// Returning drops `events`, which closes the stream for the session.
pub async fn forward_console<I>(input: I, events: mpsc::Sender<SurfaceEvent>) -> anyhow::Result<()>
where
    I: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match handle_console_line(&line) {
            Some(ConsoleCommand::Event(event)) => {
                if events.send(event).await.is_err() {
                    break;
                }
            }
            Some(ConsoleCommand::Quit) => break,
            None => log::warn!("Ignoring unknown command: {}", line.trim()),
        }
    }
    log::debug!("Console input closed");
    Ok(())
}

/// Print each pick step as the session moves through it
pub async fn print_status(mut status: watch::Receiver<PickStatus>) {
    while status.changed().await.is_ok() {
        let current = status.borrow_and_update().clone();
        eprintln!("[{:?}] {}", current.state, current.label);
    }
}

//! Selection types for the two-corner pick protocol

use std::fmt;

/// State of a pick session
#[repr(u8)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickState {
    #[default]
    Idle,
    /// Waiting for a qualifying gesture on the surface for the first corner
    AwaitingFirstClick,
    /// First gesture seen, waiting for the readout to update
    AwaitingFirstReadout,
    AwaitingSecondClick,
    AwaitingSecondReadout,
    /// Both corners resolved
    Done,
    /// Aborted by the user, a timeout or closed input
    Cancelled,
}

impl PickState {
    /// Done and Cancelled accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, PickState::Done | PickState::Cancelled)
    }
}

/// Snapshot published to whoever renders pick feedback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickStatus {
    pub state: PickState,
    /// Human-readable label of the current step
    pub label: String,
}

/// Pointer button of a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

impl fmt::Display for PointerButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PointerButton::Primary => "primary",
            PointerButton::Secondary => "secondary",
            PointerButton::Middle => "middle",
        };
        f.write_str(name)
    }
}

/// Input delivered to a pick session
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Pointer interaction at screen coordinates
    Pointer { button: PointerButton, x: i32, y: i32 },
    /// Explicit abort (escape)
    Cancel,
    /// Request to start a capture
    Trigger,
}

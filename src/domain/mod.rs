//! Pure domain types with minimal dependencies
//!
//! This module contains core types used throughout the application.
//! Types here do no I/O so they can be shared by the capture engine,
//! the pick session and the template library.

pub mod geometry;
pub mod readout;
pub mod selection;

pub use geometry::*;
pub use readout::parse_readout;
pub use selection::*;

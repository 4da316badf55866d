//! Application shell
//!
//! This module contains:
//! - Command line interface and command dispatch (app.rs)
//! - Console gesture driver and file-backed readout (console.rs)
//! - Directory artifact sink (sink.rs)

pub mod app;
pub mod console;
pub mod sink;

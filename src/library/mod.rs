//! Local template library
//!
//! This module contains:
//! - Template entries and name rules (template.rs)
//! - The on-disk catalogue with export and import (store.rs)

pub mod error;
pub mod store;
pub mod template;

pub use error::LibraryError;
pub use store::TemplateLibrary;
pub use template::Template;

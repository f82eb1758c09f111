//! Output generation for a finished run.
//!
//! # Submodules
//!
//! - [`console`]: Human-readable sections printed to stdout as the pipeline advances
//! - [`json`]: Optional machine-readable [`crate::models::RunReport`] file
//!
//! The word frequency table itself is rendered by
//! [`crate::analysis::render_report`].

pub mod console;
pub mod json;

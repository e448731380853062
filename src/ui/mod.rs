//! ui
//!
//! User-facing text.
//!
//! # Modules
//!
//! - [`output`] - Verbosity-aware diagnostics reporting
//! - [`help`] - On-demand help rendering
//!
//! # Design
//!
//! The engine reports failures through [`output::Reporter`] only, so a host
//! decides where diagnostics go. Help text is rendered only when asked for.

pub mod help;
pub mod output;

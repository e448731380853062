//! core
//!
//! Declaration-side types: option values, options, commands and settings.
//!
//! # Modules
//!
//! - [`types`] - Value type tags and built-in token conversions
//! - [`option`] - Typed options and their value slots
//! - [`command`] - Command tree nodes and handlers
//! - [`config`] - Settings schema and loading
//!
//! # Design Principles
//!
//! - Strong typing: a handler reads `Opt<T>` values, never raw strings
//! - Declarations are plain data until bound; binding validates them once
//! - Conversions are strict and never guess

pub mod command;
pub mod config;
pub mod option;
pub mod types;

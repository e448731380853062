//! cmdtree - Declarative command trees with typed options
//!
//! A host declares a tree of named commands, each with strongly-typed
//! options and a handler. cmdtree binds user input (one command-line string
//! or pre-split arguments) to those options and runs the handler of the
//! resolved command, reporting the outcome as an integer status.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`core`] - Declarations: value types, options, commands, settings
//! - [`engine`] - Binding, tokenizing, matching and dispatch
//! - [`ui`] - Diagnostics reporting and on-demand help text
//!
//! # Correctness Invariants
//!
//! 1. A command tree is validated once, when it is bound
//! 2. A failed invocation never runs a handler and never changes an option
//! 3. Conversions never clamp, truncate or guess
//! 4. Invocation failures become status codes, never panics
//!
//! # Example
//!
//! ```
//! use cmdtree::{Command, Opt, Parser};
//!
//! let name = Opt::<String>::builder(["-n", "--name", "/Name"]).required(true).build();
//! let loud = Opt::<bool>::new(["-l", "--loud"]);
//!
//! let mut parser = Parser::new();
//! parser
//!     .bind(
//!         Command::root().subcommand(
//!             Command::new("greet")
//!                 .option(name.clone())
//!                 .option(loud.clone())
//!                 .action(|cmd| {
//!                     let name: String = cmd.required_value("--name");
//!                     let loud: bool = cmd.required_value("--loud");
//!                     assert_eq!((name.as_str(), loud), ("Ada Lovelace", true));
//!                     Ok(())
//!                 }),
//!         ),
//!     )
//!     .unwrap();
//!
//! assert_eq!(parser.invoke(r#"greet --name "Ada Lovelace" -l"#), 0);
//! assert_eq!(parser.invoke("greet -l"), 1); // --name is required
//! ```

pub mod core;
pub mod engine;
pub mod ui;

pub use crate::core::command::{ActionFut, Command, Handler};
pub use crate::core::config::{ConfigError, Settings};
pub use crate::core::option::{AnyOption, BoxError, Opt, OptBuilder};
pub use crate::core::types::{ConversionError, OptionValue, Value, ValueKind};
pub use crate::engine::{DeclarationError, Invocation, ParseError, Parser, TokenizeError};
pub use crate::ui::output::{Reporter, Verbosity};

pub use tokio_util::sync::CancellationToken;

//! core::command
//!
//! Command tree nodes.
//!
//! # Architecture
//!
//! A [`Command`] is declared once with a builder chain and handed to
//! [`Parser::bind`](crate::engine::Parser::bind), which validates the whole
//! tree and freezes its shape. After that the only mutable state is the
//! value slot of each option, written once per invocation right before the
//! handler runs.
//!
//! # Handlers
//!
//! A command carries at most one handler:
//!
//! - [`Command::action`] - a synchronous closure run on the caller's thread
//! - [`Command::async_action`] - a closure returning a `Send` future, given a
//!   [`CancellationToken`] to observe
//!
//! A command without a handler is a group: it is only useful for its
//! subcommands, and resolving an invocation to it is a parse failure.
//!
//! # Example
//!
//! ```
//! use cmdtree::{Command, Opt};
//!
//! let verbose = Opt::<bool>::new(["-v", "--verbose"]);
//!
//! let root = Command::root()
//!     .description("Inventory tool")
//!     .subcommand(
//!         Command::new("list")
//!             .option(verbose.clone())
//!             .action(|cmd| {
//!                 let verbose: bool = cmd.required_value("--verbose");
//!                 println!("verbose = {verbose}");
//!                 Ok(())
//!             }),
//!     );
//!
//! assert_eq!(root.subcommands()[0].name(), "list");
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::option::{AnyOption, Opt, OptionSlot};

/// Future returned by asynchronous handlers.
pub type ActionFut = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

type SyncFn = Arc<dyn Fn(&Command) -> anyhow::Result<()> + Send + Sync>;
type AsyncFn = Arc<dyn Fn(Arc<Command>, CancellationToken) -> ActionFut + Send + Sync>;

/// The handler registered on a command.
#[derive(Clone)]
pub enum Handler {
    /// Runs to completion on the invoking thread.
    Sync(SyncFn),
    /// Produces a future driven by the async dispatcher.
    Async(AsyncFn),
}

impl Handler {
    /// Check if the handler is asynchronous.
    pub fn is_async(&self) -> bool {
        matches!(self, Handler::Async(_))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

/// A node of the command tree.
pub struct Command {
    name: String,
    description: Option<String>,
    options: Vec<Box<dyn OptionSlot>>,
    subcommands: Vec<Arc<Command>>,
    handler: Option<Handler>,
    conflicting_handlers: bool,
}

impl Command {
    /// The nameless root of a tree.
    pub fn root() -> Self {
        Self::new("")
    }

    /// A command matched by `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            options: Vec::new(),
            subcommands: Vec::new(),
            handler: None,
            conflicting_handlers: false,
        }
    }

    /// Help text for the command.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach an option. Keep a clone of `option` to read its value later.
    pub fn option<T>(mut self, option: Opt<T>) -> Self
    where
        T: Clone + fmt::Debug + Send + Sync + 'static,
    {
        self.options.push(Box::new(option));
        self
    }

    /// Attach several options of one type.
    pub fn options<T, I>(self, options: I) -> Self
    where
        T: Clone + fmt::Debug + Send + Sync + 'static,
        I: IntoIterator<Item = Opt<T>>,
    {
        options.into_iter().fold(self, Command::option)
    }

    /// Attach a child command.
    pub fn subcommand(mut self, command: Command) -> Self {
        self.subcommands.push(Arc::new(command));
        self
    }

    /// Attach several child commands.
    pub fn with_subcommands<I>(self, commands: I) -> Self
    where
        I: IntoIterator<Item = Command>,
    {
        commands.into_iter().fold(self, Command::subcommand)
    }

    /// Register a synchronous handler.
    ///
    /// Registering a second handler of either kind is reported by
    /// [`Parser::bind`](crate::engine::Parser::bind).
    pub fn action<F>(self, action: F) -> Self
    where
        F: Fn(&Command) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.set_handler(Handler::Sync(Arc::new(action)))
    }

    /// Register an asynchronous handler.
    ///
    /// The future must be `'static`: it receives an owned handle to the
    /// command and the invocation's cancellation token.
    pub fn async_action<F, Fut>(self, action: F) -> Self
    where
        F: Fn(Arc<Command>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let action: AsyncFn =
            Arc::new(move |command: Arc<Command>, cancel: CancellationToken| -> ActionFut {
                Box::pin(action(command, cancel))
            });
        self.set_handler(Handler::Async(action))
    }

    fn set_handler(mut self, handler: Handler) -> Self {
        if self.handler.is_some() {
            self.conflicting_handlers = true;
        }
        self.handler = Some(handler);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn subcommands(&self) -> &[Arc<Command>] {
        &self.subcommands
    }

    /// All options in declaration order.
    pub fn option_list(&self) -> impl Iterator<Item = &dyn AnyOption> + '_ {
        self.options.iter().map(|option| option.as_option())
    }

    pub(crate) fn option_slots(&self) -> &[Box<dyn OptionSlot>] {
        &self.options
    }

    pub(crate) fn has_conflicting_handlers(&self) -> bool {
        self.conflicting_handlers
    }

    /// Find an option of this command by any of its aliases.
    ///
    /// Options of parent or child commands are not searched.
    pub fn get_option(&self, name: &str) -> Option<&dyn AnyOption> {
        self.option_list().find(|option| option.matches(name))
    }

    /// Find an option and view it as `Opt<T>`.
    ///
    /// `None` when no alias matches or the option was declared with a
    /// different value type.
    pub fn get_option_as<T: 'static>(&self, name: &str) -> Option<&Opt<T>> {
        self.get_option(name)?.as_any().downcast_ref::<Opt<T>>()
    }

    /// Like [`get_option_as`](Self::get_option_as), for options the handler
    /// knows exist.
    ///
    /// # Panics
    ///
    /// Panics if no option matches `name` or its value type is not `T`.
    pub fn required_option<T: 'static>(&self, name: &str) -> &Opt<T> {
        match self.get_option(name) {
            Some(option) => match option.as_any().downcast_ref::<Opt<T>>() {
                Some(typed) => typed,
                None => panic!(
                    "option '{}' of command '{}' is {}, not {}",
                    name,
                    self.name,
                    option.kind(),
                    std::any::type_name::<T>()
                ),
            },
            None => panic!("command '{}' has no option '{}'", self.name, name),
        }
    }

    /// The current value of option `name`, if it has one.
    ///
    /// `None` also covers a missing or mistyped option.
    pub fn value<T>(&self, name: &str) -> Option<T>
    where
        T: Clone + fmt::Debug + Send + Sync + 'static,
    {
        self.get_option_as::<T>(name)?.value()
    }

    /// The current value of option `name`.
    ///
    /// # Panics
    ///
    /// Panics if the option is missing, mistyped, or holds no value.
    pub fn required_value<T>(&self, name: &str) -> T
    where
        T: Clone + fmt::Debug + Send + Sync + 'static,
    {
        match self.required_option::<T>(name).value() {
            Some(value) => value,
            None => panic!("option '{}' of command '{}' has no value", name, self.name),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.option_list().map(|option| option.primary_name()).collect();
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("options", &names)
            .field("subcommands", &self.subcommands)
            .field("handler", &self.handler)
            .finish()
    }
}

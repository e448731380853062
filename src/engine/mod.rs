//! engine
//!
//! Turns user input into a handler call: Tokenize -> Match -> Stage -> Commit -> Run.
//!
//! # Architecture
//!
//! [`Parser`] is the entry point. It owns at most one bound command tree and
//! drives every invocation through the same pipeline:
//!
//! 1. **Tokenize**: a single command-line string is split by
//!    [`tokenizer::tokenize`]; pre-split arguments skip this step
//! 2. **Match**: [`matcher::resolve`] selects the command and assigns tokens
//!    to its options
//! 3. **Stage**: every option converts its tokens; any failure aborts
//! 4. **Commit**: staged values are written into the options
//! 5. **Run**: the handler is called, see [`dispatch`]
//!
//! # Status Codes
//!
//! | Outcome                     | `invoke`               | `invoke_async`            |
//! |-----------------------------|------------------------|---------------------------|
//! | handler returned `Ok`       | `0`                    | `Ok(0)`                   |
//! | input did not resolve       | `parse_failure_code`   | `Ok(parse_failure_code)`  |
//! | handler returned `Err`      | `handler_failure_code` | `Err(error)`              |
//!
//! # Invariants
//!
//! - A failed invocation never runs a handler and never changes an option
//! - The tree shape cannot change after [`Parser::bind`]
//! - The parser never prints directly; diagnostics go to its [`Reporter`]
//!
//! # Example
//!
//! ```
//! use cmdtree::{Command, Opt, Parser};
//!
//! let count = Opt::<u32>::builder(["-n", "--count"]).default_value(|| 1).build();
//!
//! let mut parser = Parser::new();
//! parser
//!     .bind(Command::root().subcommand(Command::new("repeat").option(count.clone()).action(|cmd| {
//!         let count: u32 = cmd.required_value("--count");
//!         assert_eq!(count, 3);
//!         Ok(())
//!     })))
//!     .unwrap();
//!
//! assert_eq!(parser.invoke("repeat --count 3"), 0);
//! assert_eq!(count.value(), Some(3));
//! assert_eq!(parser.invoke("repeat --count three"), 1);
//! assert_eq!(count.value(), Some(3));
//! ```

pub mod binder;
pub mod dispatch;
pub mod matcher;
pub mod tokenizer;

// Re-exports for convenience
pub use binder::{BoundNode, BoundRoot, DeclarationError};
pub use matcher::{Invocation, ParseError};
pub use tokenizer::{tokenize, TokenizeError};

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::command::Command;
use crate::core::config::Settings;
use crate::ui::output::Reporter;

use binder::display_path;

/// Tokens users commonly try for help. None is built in.
const HELP_TOKENS: &[&str] = &["-h", "--help", "-?", "/?", "/h", "/help"];

/// Binds a command tree and dispatches invocations against it.
#[derive(Debug, Default)]
pub struct Parser {
    root: Option<BoundRoot>,
    settings: Settings,
    reporter: Reporter,
}

impl Parser {
    /// A parser with default settings, reporting to stderr.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the settings. The reporter adopts their verbosity.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.reporter = self.reporter.with_verbosity(settings.verbosity);
        self.settings = settings;
        self
    }

    /// Replace the reporter.
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validate `root` and make it the tree every invocation resolves
    /// against.
    ///
    /// On error the previously bound tree, if any, stays in place.
    pub fn bind(&mut self, root: Command) -> Result<(), DeclarationError> {
        self.root = Some(binder::bind(root)?);
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.root.is_some()
    }

    /// The bound root command.
    pub fn root(&self) -> Option<&Arc<Command>> {
        self.root.as_ref().map(BoundRoot::command)
    }

    fn bound(&self) -> &BoundRoot {
        match &self.root {
            Some(root) => root,
            None => panic!("Parser used before a command tree was bound"),
        }
    }

    /// Resolve `line` without committing values or running a handler.
    ///
    /// # Panics
    ///
    /// Panics if no command tree is bound.
    pub fn parse(&self, line: &str) -> Result<Invocation, ParseError> {
        let tokens = tokenize(line)?;
        matcher::resolve(self.bound(), &tokens)
    }

    /// Resolve pre-split `args` without committing values or running a
    /// handler.
    ///
    /// # Panics
    ///
    /// Panics if no command tree is bound.
    pub fn parse_args<I, S>(&self, args: I) -> Result<Invocation, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
        matcher::resolve(self.bound(), &tokens)
    }

    /// Run `line` to completion and return its status.
    ///
    /// Handler errors are reported and mapped to
    /// [`Settings::handler_failure_code`], never propagated.
    ///
    /// # Panics
    ///
    /// Panics if no command tree is bound.
    pub fn invoke(&self, line: &str) -> i32 {
        match tokenize(line) {
            Ok(tokens) => self.dispatch(&tokens),
            Err(err) => self.parse_failed(&err.into()),
        }
    }

    /// Run pre-split `args` to completion and return its status.
    ///
    /// # Panics
    ///
    /// Panics if no command tree is bound.
    pub fn invoke_args<I, S>(&self, args: I) -> i32
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
        self.dispatch(&tokens)
    }

    /// Run `line`, awaiting an asynchronous handler.
    ///
    /// # Errors
    ///
    /// Returns the handler's error. Parse failures are `Ok` with the parse
    /// failure code.
    ///
    /// # Panics
    ///
    /// Panics if no command tree is bound.
    pub async fn invoke_async(&self, line: &str) -> anyhow::Result<i32> {
        self.invoke_async_with(line, CancellationToken::new()).await
    }

    /// Like [`invoke_async`](Self::invoke_async); the handler receives a
    /// child of `cancel`.
    pub async fn invoke_async_with(
        &self,
        line: &str,
        cancel: CancellationToken,
    ) -> anyhow::Result<i32> {
        match tokenize(line) {
            Ok(tokens) => self.dispatch_async(tokens, cancel).await,
            Err(err) => Ok(self.parse_failed(&err.into())),
        }
    }

    /// Run pre-split `args`, awaiting an asynchronous handler.
    ///
    /// The arguments are collected before the future is created, so they
    /// need not outlive it.
    pub fn invoke_args_async<I, S>(
        &self,
        args: I,
    ) -> impl Future<Output = anyhow::Result<i32>> + Send + '_
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
        self.dispatch_async(tokens, CancellationToken::new())
    }

    fn dispatch(&self, tokens: &[String]) -> i32 {
        let invocation = match matcher::resolve(self.bound(), tokens) {
            Ok(invocation) => invocation,
            Err(err) => return self.parse_failed(&err),
        };
        let name = display_path(invocation.path());
        self.reporter.debug(format_args!("resolved '{}'", name));

        match dispatch::run_blocking(invocation) {
            Ok(Ok(())) => 0,
            Ok(Err(err)) => self.handler_failed(&name, &err),
            Err(err) => self.parse_failed(&err),
        }
    }

    async fn dispatch_async(
        &self,
        tokens: Vec<String>,
        cancel: CancellationToken,
    ) -> anyhow::Result<i32> {
        let invocation = match matcher::resolve(self.bound(), &tokens) {
            Ok(invocation) => invocation,
            Err(err) => return Ok(self.parse_failed(&err)),
        };
        let name = display_path(invocation.path());
        self.reporter.debug(format_args!("resolved '{}'", name));

        match dispatch::run_async(invocation, cancel).await {
            Ok(()) => Ok(0),
            Err(err) => {
                tracing::error!(command = %name, error = %format!("{:#}", err), "handler failed");
                Err(err)
            }
        }
    }

    fn parse_failed(&self, err: &ParseError) -> i32 {
        tracing::warn!(error = %err, "invocation rejected");
        if self.settings.report_errors {
            self.reporter.error(err);
            if let ParseError::UnknownToken { command, token } = err {
                if HELP_TOKENS.contains(&token.as_str()) {
                    self.reporter.warn(format_args!(
                        "'{}' declares no '{}' option; help is only available where declared",
                        command, token
                    ));
                }
            }
        }
        self.settings.parse_failure_code
    }

    fn handler_failed(&self, name: &str, err: &anyhow::Error) -> i32 {
        tracing::error!(command = %name, error = %format!("{:#}", err), "handler failed");
        if self.settings.report_errors {
            self.reporter.error(format_args!("{:#}", err));
        }
        self.settings.handler_failure_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::option::Opt;
    use crate::ui::output::Verbosity;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing_test::traced_test;

    fn capture() -> (Reporter, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let reporter = Reporter::new(Verbosity::Debug, move |line| {
            sink.lock().unwrap().push(line.to_string())
        });
        (reporter, lines)
    }

    fn counting_tree(calls: &Arc<AtomicUsize>) -> Command {
        let ok = Arc::clone(calls);
        let failing = Arc::clone(calls);
        Command::root()
            .subcommand(
                Command::new("ok")
                    .option(Opt::<i32>::new(["-i"]))
                    .action(move |_| {
                        ok.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
            )
            .subcommand(Command::new("fail").action(move |_| {
                failing.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("disk full")
            }))
    }

    mod binding {
        use super::*;

        #[test]
        fn bind_replaces_root() {
            let mut parser = Parser::new();
            assert!(!parser.is_bound());

            parser.bind(Command::root().subcommand(Command::new("a").action(|_| Ok(())))).unwrap();
            assert!(parser.parse("a").is_ok());

            parser.bind(Command::root().subcommand(Command::new("b").action(|_| Ok(())))).unwrap();
            assert!(parser.parse("a").is_err());
            assert!(parser.parse("b").is_ok());
        }

        #[test]
        fn failed_bind_keeps_previous_root() {
            let mut parser = Parser::new();
            parser.bind(Command::new("").action(|_| Ok(()))).unwrap();
            assert!(parser.bind(Command::root().subcommand(Command::new("leaf"))).is_err());
            assert!(parser.is_bound());
            assert!(parser.parse("").is_ok());
        }

        #[test]
        #[should_panic(expected = "before a command tree was bound")]
        fn invoke_before_bind_panics() {
            Parser::new().invoke("anything");
        }
    }

    mod status {
        use super::*;

        #[test]
        fn codes_follow_settings() {
            let calls = Arc::new(AtomicUsize::new(0));
            let settings = Settings {
                parse_failure_code: 2,
                handler_failure_code: 3,
                ..Default::default()
            };
            let mut parser = Parser::new()
                .with_settings(settings)
                .with_reporter(Reporter::silent());
            parser.bind(counting_tree(&calls)).unwrap();

            assert_eq!(parser.invoke("ok -i 1"), 0);
            assert_eq!(parser.invoke("ok -i x"), 2);
            assert_eq!(parser.invoke("fail"), 3);
            assert_eq!(parser.invoke_args(["ok", "-i", "4"]), 0);
            assert_eq!(calls.load(Ordering::SeqCst), 3);
        }

        #[test]
        fn errors_reach_reporter() {
            let calls = Arc::new(AtomicUsize::new(0));
            let (reporter, lines) = capture();
            let mut parser = Parser::new().with_reporter(reporter);
            parser.bind(counting_tree(&calls)).unwrap();

            parser.invoke("ok --nope");
            parser.invoke("fail");

            let lines = lines.lock().unwrap();
            assert!(
                lines.contains(&"error: unrecognized token '--nope' for command 'ok'".to_string())
            );
            assert!(lines.contains(&"[debug] resolved 'fail'".to_string()));
            assert!(lines.contains(&"error: disk full".to_string()));
        }

        #[test]
        fn undeclared_help_gets_hint() {
            let calls = Arc::new(AtomicUsize::new(0));
            let (reporter, lines) = capture();
            let mut parser = Parser::new().with_reporter(reporter);
            parser.bind(counting_tree(&calls)).unwrap();

            assert_eq!(parser.invoke("ok --help"), 1);
            assert_eq!(parser.invoke("ok --nope"), 1);

            let lines = lines.lock().unwrap();
            let hints: Vec<&String> = lines
                .iter()
                .filter(|line| line.starts_with("warning:"))
                .collect();
            assert_eq!(hints.len(), 1);
            assert!(hints[0].contains("'ok' declares no '--help' option"));
        }

        #[test]
        fn quiet_drops_help_hint() {
            let calls = Arc::new(AtomicUsize::new(0));
            let (reporter, lines) = capture();
            let settings = Settings {
                verbosity: Verbosity::Quiet,
                ..Default::default()
            };
            let mut parser = Parser::new().with_reporter(reporter).with_settings(settings);
            parser.bind(counting_tree(&calls)).unwrap();

            assert_eq!(parser.invoke("ok -h"), 1);
            assert_eq!(
                *lines.lock().unwrap(),
                ["error: unrecognized token '-h' for command 'ok'"]
            );
        }

        #[test]
        fn report_errors_off_is_silent() {
            let calls = Arc::new(AtomicUsize::new(0));
            let (reporter, lines) = capture();
            let settings = Settings {
                report_errors: false,
                ..Default::default()
            };
            let mut parser = Parser::new().with_reporter(reporter).with_settings(settings);
            parser.bind(counting_tree(&calls)).unwrap();

            assert_eq!(parser.invoke("unknown"), 1);
            assert_eq!(parser.invoke("fail"), 1);
            assert!(lines.lock().unwrap().is_empty());
        }

        #[test]
        fn unterminated_quote_is_parse_failure() {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut parser = Parser::new().with_reporter(Reporter::silent());
            parser.bind(counting_tree(&calls)).unwrap();
            assert_eq!(parser.invoke("ok -i \"1"), 1);
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    mod logging {
        use super::*;

        #[traced_test]
        #[test]
        fn rejected_invocation_is_logged() {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut parser = Parser::new().with_reporter(Reporter::silent());
            parser.bind(counting_tree(&calls)).unwrap();

            parser.invoke("ok -h");
            assert!(logs_contain("invocation rejected"));
        }

        #[traced_test]
        #[test]
        fn handler_failure_is_logged() {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut parser = Parser::new().with_reporter(Reporter::silent());
            parser.bind(counting_tree(&calls)).unwrap();

            parser.invoke("fail");
            assert!(logs_contain("handler failed"));
            assert!(logs_contain("disk full"));
        }
    }
}

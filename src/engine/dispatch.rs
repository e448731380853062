//! engine::dispatch
//!
//! Commits a resolved invocation and runs its handler.
//!
//! # Blocking dispatch
//!
//! [`run_blocking`] runs a synchronous handler on the caller's thread. An
//! asynchronous handler is driven to completion on a private
//! current-thread runtime, which is only possible outside any tokio
//! runtime: blocking a worker thread on a nested runtime would panic, so
//! that case is refused before anything is committed.
//!
//! # Async dispatch
//!
//! [`run_async`] awaits asynchronous handlers in place and calls
//! synchronous ones directly. The handler receives a child of the caller's
//! cancellation token, so cancelling the caller's token reaches it while
//! the handler cannot cancel its caller.

use tokio::runtime::{Builder, Handle};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::binder::display_path;
use super::matcher::{Invocation, ParseError};
use crate::core::command::Handler;

/// Commit `invocation` and run its handler to completion.
///
/// The outer `Err` means the invocation could not be dispatched and nothing
/// was committed; the inner result is the handler's own.
pub(crate) fn run_blocking(invocation: Invocation) -> Result<anyhow::Result<()>, ParseError> {
    let name = display_path(invocation.path());

    match invocation.handler().clone() {
        Handler::Sync(action) => {
            let command = invocation.commit();
            tracing::debug!(command = %name, "running handler");
            Ok(action(command.as_ref()))
        }
        Handler::Async(action) => {
            if Handle::try_current().is_ok() {
                return Err(ParseError::AsyncInSyncContext { command: name });
            }
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    return Ok(Err(
                        anyhow::Error::new(err).context("failed to start async runtime")
                    ))
                }
            };

            let command = invocation.commit();
            tracing::debug!(command = %name, "running async handler on private runtime");
            let span = tracing::debug_span!("handler", command = %name);
            Ok(runtime.block_on(action(command, CancellationToken::new()).instrument(span)))
        }
    }
}

/// Commit `invocation` and await its handler.
pub(crate) async fn run_async(
    invocation: Invocation,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let name = display_path(invocation.path());
    let handler = invocation.handler().clone();
    let command = invocation.commit();
    tracing::debug!(command = %name, "running handler");

    match handler {
        Handler::Sync(action) => action(command.as_ref()),
        Handler::Async(action) => {
            let span = tracing::debug_span!("handler", command = %name);
            action(command, cancel.child_token()).instrument(span).await
        }
    }
}

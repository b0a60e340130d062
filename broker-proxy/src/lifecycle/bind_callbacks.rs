//! Execution of on-bind callbacks under the configured callback mode.

use crate::error::CallbackError;
use crate::lifecycle::bind_gate::BindCallbacks;
use crate::observability::events;
use crate::options::CallbackMode;
use std::sync::Arc;
use tracing::{debug, error};

const COMPONENT: &str = "bind_callbacks";

fn report_outcome(proxy: &'static str, index: usize, outcome: Result<(), CallbackError>) {
    match outcome {
        Ok(()) => debug!(
            event = events::BIND_CALLBACK_OK,
            component = COMPONENT,
            proxy,
            index,
            "bind callback done"
        ),
        Err(err) => error!(
            event = events::BIND_CALLBACK_FAILED,
            component = COMPONENT,
            proxy,
            index,
            err = %err,
            "bind callback returned an error"
        ),
    }
}

/// Runs every callback with `client`.
///
/// Sequential mode awaits each callback in order and never stops early. Parallel
/// mode spawns one task per callback and returns immediately. In both modes a
/// callback error is only logged.
pub(crate) async fn run_bind_callbacks<C>(
    proxy: &'static str,
    client: Arc<C>,
    callbacks: BindCallbacks<C>,
    mode: CallbackMode,
) where
    C: ?Sized + Send + Sync + 'static,
{
    match mode {
        CallbackMode::Sequential => {
            for (index, callback) in callbacks.into_iter().enumerate() {
                let outcome = callback.on_bind(client.clone()).await;
                report_outcome(proxy, index, outcome);
            }
        }
        CallbackMode::Parallel => {
            for (index, callback) in callbacks.into_iter().enumerate() {
                let client = client.clone();
                tokio::spawn(async move {
                    let outcome = callback.on_bind(client).await;
                    report_outcome(proxy, index, outcome);
                });
            }
        }
    }
}

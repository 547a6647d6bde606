//! Process-level failure hooks
//!
//! A panic that reaches the hook is logged as `"Uncaught Exception"` and ends
//! the process through the logger's [`Terminator`](crate::Terminator). A
//! monitored task that resolves to `Err` is logged as `"Unhandled Rejection"`
//! and the process keeps running. Both entries are written at error whatever
//! the configured threshold.

use serde_json::json;
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

use crate::entry::Callsite;
use crate::level::Level;
use crate::logger::Logger;
use crate::terminate::FATAL_EXIT_CODE;

static HOOKS_INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the panic hook once per process.
///
/// Returns `false` when hooks were already installed; the first logger wins.
pub fn install_process_hooks(logger: Arc<Logger>) -> bool {
    if HOOKS_INSTALLED.set(()).is_err() {
        return false;
    }

    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));

        logger.emit(
            Level::Error,
            info.location().map(Callsite::from_location),
            "Uncaught Exception",
            json!({
                "error": panic_message(info.payload()),
                "location": location,
            }),
            None,
        );

        previous(info);
        logger.terminator().terminate(FATAL_EXIT_CODE);
    }));

    tracing::debug!("Process hooks installed");
    true
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Spawn `fut` on the tokio runtime in a child span of the caller's trace.
///
/// An `Err` outcome is logged and resolves the handle to `None`.
pub fn spawn_monitored<F, T, E>(logger: Arc<Logger>, fut: F) -> JoinHandle<Option<T>>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    let context = logger.traces().get_trace_context().child();

    tokio::spawn(async move {
        let traces = logger.traces().clone();
        traces
            .scope_with(context, async move {
                match fut.await {
                    Ok(value) => Some(value),
                    Err(reason) => {
                        logger.emit(
                            Level::Error,
                            None,
                            "Unhandled Rejection",
                            json!({ "reason": reason.to_string() }),
                            None,
                        );
                        None
                    }
                }
            })
            .await
    })
}

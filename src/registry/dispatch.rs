use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{error, warn};

use super::listener::{ListenerError, ListenerRef, Payload};

/// Outcome of one emission's fan-out
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Settled {
    pub succeeded: usize,
    pub failed: usize,
}

/// Invokes every listener concurrently and waits until all have settled
///
/// Failures and panics are logged and counted, never propagated: one
/// misbehaving listener must not keep the rest from running.
pub(crate) async fn settle_all<A: Payload>(
    event: &str,
    listeners: &[ListenerRef<A>],
    args: &A,
) -> Settled {
    let calls = listeners.iter().map(|listener| async move {
        let outcome = AssertUnwindSafe(listener.call(args))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ListenerError::Panicked(panic_message(panic))));
        (listener.name().to_string(), outcome)
    });

    let mut settled = Settled::default();
    for (listener, outcome) in join_all(calls).await {
        match outcome {
            Ok(()) => settled.succeeded += 1,
            Err(e @ ListenerError::Panicked(_)) => {
                error!(event = %event, listener = %listener, error = %e, "Listener panicked");
                settled.failed += 1;
            }
            Err(e) => {
                warn!(event = %event, listener = %listener, error = %e, "Listener failed");
                settled.failed += 1;
            }
        }
    }
    settled
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

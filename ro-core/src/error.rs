//! The error taxonomy (spec §7): a closed set of error kinds produced by
//! the runtime itself, plus the `BoxError` alias used for the stream's
//! dynamic error channel (any producer may emit any error type).

use std::{fmt, sync::Arc, time::Duration};

/// The error type carried by `Error` notifications. Kept as a trait object
/// rather than a second generic parameter on every `Observable`/`Observer`
/// so that operator chains don't have to thread a second type parameter
/// through dozens of combinators purely to describe failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the runtime itself. Application producers are free to
/// emit any other `BoxError`; these are the ones `ro` raises on your behalf.
#[derive(Debug, thiserror::Error)]
pub enum RoError {
    /// A panic inside a producer factory, caught at the `Observable::subscribe` boundary.
    #[error("ro.Observable: {0}")]
    Observable(String),

    /// A panic inside an observer callback (`on_next`/`on_error`/`on_complete`).
    #[error("ro.Observer: {0}")]
    Observer(String),

    /// A panic raised (and re-raised) from a `Subscription` teardown.
    #[error("ro.Unsubscription: {0}")]
    Unsubscription(String),

    /// A runtime type-cast failure (e.g. dynamic operator composition).
    #[error("ro.Cast: unable to cast {from} to {to}")]
    Cast {
        /// The source type's name.
        from: &'static str,
        /// The attempted target type's name.
        to: &'static str,
    },

    /// Raised by the `timeout` operator when no `Next` arrives in time.
    #[error("ro.Timeout: timeout after {0:?}")]
    Timeout(Duration),

    /// A structural error raised at `Pipe` composition time.
    #[error("ro.Pipe: {0}")]
    Pipe(String),

    /// Raised by `throwOnContextCancel` when the context is cancelled.
    #[error("ro.ContextCanceled: {0}")]
    ContextCanceled(String),

    /// A `Unicast` subject already has an active subscriber.
    #[error("ro.UnicastAlreadyObserved: a Unicast subject supports exactly one subscriber")]
    UnicastAlreadyObserved,
}

impl RoError {
    /// Boxes this error for use as a stream `Error` notification payload.
    pub fn boxed(self) -> BoxError {
        Box::new(self)
    }
}

/// A `BoxError` held for delivery to more than one recipient: a multicast
/// `Subject`'s live observers and its future late subscribers, or a
/// derived stream's own downstream alongside an internal sink it feeds.
/// [`relay_error`] hands out a `BoxError` per recipient without rebuilding
/// the error under a different `RoError` variant, which would both lose
/// its original type and prepend a misleading prefix.
pub type SharedError = Arc<BoxError>;

struct Relayed(SharedError);

impl fmt::Debug for Relayed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Relayed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for Relayed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Wraps `err` so it can be [`relay_error`]ed to more than one recipient.
pub fn share_error(err: BoxError) -> SharedError {
    Arc::new(err)
}

/// Produces a deliverable `BoxError` for one recipient of `shared`,
/// preserving the original error's `Display`, `Debug` and `source()`
/// instead of re-wrapping it under a new error kind.
pub fn relay_error(shared: &SharedError) -> BoxError {
    Box::new(Relayed(shared.clone()))
}

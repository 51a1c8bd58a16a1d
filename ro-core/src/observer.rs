//! The [`Observer`] contract (spec §4.2, C2): the sink receiving
//! notifications.

use crate::{context::Context, error::BoxError};

/// A sink for `Next`/`Error`/`Complete` notifications.
///
/// Implementors are not responsible for enforcing terminal finality or
/// serialization themselves: [`Subscriber`](`crate::Subscriber`) wraps any
/// `Observer` to add those guarantees. Most code should subscribe through a
/// `Subscriber`, not call an `Observer` directly.
pub trait Observer<T>: Send + Sync {
    /// Delivers a value produced by the source.
    fn on_next(&self, ctx: &Context, value: T);

    /// Delivers the terminal error notification.
    fn on_error(&self, ctx: &Context, err: BoxError);

    /// Delivers the terminal completion notification.
    fn on_complete(&self, ctx: &Context);
}

/// Adapts three closures into an [`Observer`].
///
/// Generalizes the two-closure (`fn_pin`/`drop_fn_pin`) constructor pattern
/// used throughout the signals side of this codebase to the three-callback
/// shape an `Observer` needs.
pub struct FnObserver<N, E, C> {
    next: N,
    error: E,
    complete: C,
}

impl<T, N, E, C> Observer<T> for FnObserver<N, E, C>
where
    N: Fn(&Context, T) + Send + Sync,
    E: Fn(&Context, BoxError) + Send + Sync,
    C: Fn(&Context) + Send + Sync,
{
    fn on_next(&self, ctx: &Context, value: T) {
        (self.next)(ctx, value);
    }

    fn on_error(&self, ctx: &Context, err: BoxError) {
        (self.error)(ctx, err);
    }

    fn on_complete(&self, ctx: &Context) {
        (self.complete)(ctx);
    }
}

/// Builds an [`Observer`] from three closures.
pub fn observer_fn<T, N, E, C>(next: N, error: E, complete: C) -> FnObserver<N, E, C>
where
    N: Fn(&Context, T) + Send + Sync,
    E: Fn(&Context, BoxError) + Send + Sync,
    C: Fn(&Context) + Send + Sync,
{
    FnObserver {
        next,
        error,
        complete,
    }
}

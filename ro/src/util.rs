//! Small internal helpers shared by the point operators.

use std::sync::Arc;

use ro_core::{observer_fn, BoxError, Context, FnObserver, Observer, Subscriber};

/// An observer that forwards every notification verbatim to `subscriber`.
/// Most operators only need to transform `Next`; this covers the
/// `Error`/`Complete` passthrough half of that pattern.
pub(crate) fn forward_to<T: 'static + Send>(
    subscriber: Arc<Subscriber<T>>,
) -> FnObserver<
    impl Fn(&Context, T) + Send + Sync,
    impl Fn(&Context, BoxError) + Send + Sync,
    impl Fn(&Context) + Send + Sync,
> {
    let next = subscriber.clone();
    let error = subscriber.clone();
    let complete = subscriber;
    observer_fn(
        move |ctx: &Context, value: T| next.on_next(ctx, value),
        move |ctx: &Context, err: BoxError| error.on_error(ctx, err),
        move |ctx: &Context| complete.on_complete(ctx),
    )
}

//! `map` (spec §4.9).

use std::sync::Arc;

use ro_core::{observer_fn, BoxError, Context, Observer, Teardown};

use crate::Observable;

/// Transforms every `Next` value with `f`; `Error`/`Complete` pass through
/// unchanged.
pub fn map<A: 'static + Send, B: 'static + Send>(
    source: Observable<A>,
    f: impl Fn(A) -> B + Send + Sync + 'static,
) -> Observable<B> {
    let f = Arc::new(f);
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let f = f.clone();
        let next_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: A| next_subscriber.on_next(ctx, f(value)),
            move |ctx: &Context, err: BoxError| error_subscriber.on_error(ctx, err),
            move |ctx: &Context| complete_subscriber.on_complete(ctx),
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

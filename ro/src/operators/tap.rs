//! `tap` (spec §4.9): side effects without altering the stream.

use std::sync::Arc;

use ro_core::{observer_fn, BoxError, Context, Observer, Teardown};

use crate::Observable;

/// Runs `f` for its side effect on every `Next` value, then forwards the
/// value unchanged. A panic inside `f` is treated the same as any other
/// observer-callback panic: the upstream `Subscriber` wrapping this
/// operator's observer catches it and redelivers it as an `Error`, so it
/// surfaces downstream rather than crashing the subscriber thread.
pub fn tap<T: 'static + Send>(
    source: Observable<T>,
    f: impl Fn(&T) + Send + Sync + 'static,
) -> Observable<T> {
    let f = Arc::new(f);
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let f = f.clone();
        let next_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                f(&value);
                next_subscriber.on_next(ctx, value);
            },
            move |ctx: &Context, err: BoxError| error_subscriber.on_error(ctx, err),
            move |ctx: &Context| complete_subscriber.on_complete(ctx),
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn tap_runs_for_every_value_without_changing_it() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        let source = crate::operators::of(vec![1, 2, 3]);
        let tapped = tap(source, move |_| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });
        let (values, _, _) = crate::collect(&tapped);
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}

//! `window_when` (spec §4.9): like [`crate::buffer::buffer_when`], but each
//! window is handed downstream as a nested `Observable<T>` instead of being
//! collected into a `Vec`.

use std::sync::Arc;

use parking_lot::Mutex;
use ro::{observer_fn, relay_error, share_error, BoxError, Context, Observer, Subject, Teardown,
    UNICAST_SUBJECT_UNLIMITED_BUFFER_SIZE};
use ro::Observable;

fn fresh_window<T: 'static + Send + Clone>() -> Subject<T> {
    ro::unicast(UNICAST_SUBJECT_UNLIMITED_BUFFER_SIZE)
}

/// Splits `source` into consecutive windows, each a `Unicast`-backed
/// `Observable<T>`: a new window opens immediately on subscription and
/// every time `boundaries` emits a `Next`; the previous window completes
/// at that same moment. `source`'s own `Error`/`Complete` ends the current
/// window the same way before ending the outer stream.
pub fn window_when<T: 'static + Send + Clone>(
    source: Observable<T>,
    boundaries: Observable<()>,
) -> Observable<Observable<T>> {
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let current: Arc<Mutex<Subject<T>>> = Arc::new(Mutex::new(fresh_window()));
        subscriber.on_next(&ctx, current.lock().as_observable());

        let boundary_current = current.clone();
        let boundary_subscriber = subscriber.clone();
        let boundary_observer = observer_fn(
            move |ctx: &Context, _unit: ()| {
                let mut guard = boundary_current.lock();
                guard.on_complete(ctx);
                *guard = fresh_window();
                boundary_subscriber.on_next(ctx, guard.as_observable());
            },
            move |_ctx: &Context, _err: BoxError| {},
            move |_ctx: &Context| {},
        );
        let boundary_subscription =
            boundaries.subscribe_with_context(ctx.clone(), boundary_observer);

        let source_current = current.clone();
        let error_current = current.clone();
        let error_subscriber = subscriber.clone();
        let complete_current = current;
        let complete_subscriber = subscriber.clone();
        let source_observer = observer_fn(
            move |ctx: &Context, value: T| source_current.lock().on_next(ctx, value),
            move |ctx: &Context, err: BoxError| {
                let shared = share_error(err);
                error_current.lock().on_error(ctx, relay_error(&shared));
                error_subscriber.on_error(ctx, relay_error(&shared));
            },
            move |ctx: &Context| {
                complete_current.lock().on_complete(ctx);
                complete_subscriber.on_complete(ctx);
            },
        );
        let source_subscription = source.subscribe_with_context(ctx, source_observer);

        Some(Box::new(move || {
            source_subscription.unsubscribe();
            boundary_subscription.unsubscribe();
        }) as Teardown)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_when_emits_a_window_observable_per_boundary() {
        let source = ro::of(vec![1, 2, 3, 4]);
        let boundaries: Observable<()> = Observable::new(|ctx, subscriber| {
            subscriber.on_complete(&ctx);
            None
        });
        let windows = window_when(source, boundaries);
        let (values, _, err) = ro::collect(&windows);
        assert_eq!(values.len(), 1);
        let (inner_values, _, inner_err) = ro::collect(&values[0]);
        assert_eq!(inner_values, vec![1, 2, 3, 4]);
        assert!(inner_err.is_none());
        assert!(err.is_none());
    }
}

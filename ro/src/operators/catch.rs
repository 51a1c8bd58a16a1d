//! Error-recovery operators (spec §4.9): `catch`, `on_error_resume_next_with`,
//! `on_error_return`.

use std::sync::Arc;

use ro_core::{observer_fn, BoxError, Context, Observer, Teardown};

use crate::util::forward_to;
use crate::Observable;

/// On `Error`, subscribes to `handler(&err)` instead and forwards its
/// notifications from that point on. `Next`/`Complete` from `source` pass
/// through unchanged. Equivalent to RxJS's `catchError`/`onErrorResumeNext`.
pub fn catch<T: 'static + Send>(
    source: Observable<T>,
    handler: impl Fn(&BoxError) -> Observable<T> + Send + Sync + 'static,
) -> Observable<T> {
    let handler = Arc::new(handler);
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let handler = handler.clone();
        let next_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| next_subscriber.on_next(ctx, value),
            move |ctx: &Context, err: BoxError| {
                let fallback = handler(&err);
                // Intentionally not tracked for teardown: by the time an
                // error arrives the upstream subscription has already
                // finalized itself, so there is nothing left to race with.
                fallback.subscribe_with_context(ctx.clone(), forward_to(error_subscriber.clone()));
            },
            move |ctx: &Context| complete_subscriber.on_complete(ctx),
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

/// Alias for [`catch`] matching the spec's operator name.
pub fn on_error_resume_next_with<T: 'static + Send>(
    source: Observable<T>,
    handler: impl Fn(&BoxError) -> Observable<T> + Send + Sync + 'static,
) -> Observable<T> {
    catch(source, handler)
}

/// On `Error`, emits a single fallback value computed from the error, then
/// completes, instead of forwarding the error.
pub fn on_error_return<T: 'static + Send>(
    source: Observable<T>,
    f: impl Fn(&BoxError) -> T + Send + Sync + 'static,
) -> Observable<T> {
    let f = Arc::new(f);
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let f = f.clone();
        let next_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| next_subscriber.on_next(ctx, value),
            move |ctx: &Context, err: BoxError| {
                error_subscriber.on_next(ctx, f(&err));
                error_subscriber.on_complete(ctx);
            },
            move |ctx: &Context| complete_subscriber.on_complete(ctx),
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

#[cfg(test)]
mod tests {
    use ro_core::RoError;

    use super::*;

    #[test]
    fn catch_switches_to_the_fallback_observable_on_error() {
        let source: Observable<i32> = Observable::new(|ctx, subscriber| {
            subscriber.on_next(&ctx, 1);
            subscriber.on_error(&ctx, RoError::Observable("boom".into()).boxed());
            None
        });
        let recovered = catch(source, |_err| crate::operators::of(vec![99, 100]));
        let (values, _, err) = crate::collect(&recovered);
        assert_eq!(values, vec![1, 99, 100]);
        assert!(err.is_none());
    }

    #[test]
    fn on_error_return_emits_a_fallback_value_then_completes() {
        let source: Observable<i32> = Observable::new(|ctx, subscriber| {
            subscriber.on_error(&ctx, RoError::Observable("boom".into()).boxed());
            None
        });
        let recovered = on_error_return(source, |_err| -1);
        let (values, _, err) = crate::collect(&recovered);
        assert_eq!(values, vec![-1]);
        assert!(err.is_none());
    }
}

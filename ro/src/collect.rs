//! `Collect`: a terminal utility operator (spec §4.3).

use std::sync::Arc;

use parking_lot::Mutex;
use ro_core::{observer_fn, BoxError, Context};

use crate::Observable;

struct CollectState<T> {
    values: Vec<T>,
    ctx: Context,
    error: Option<BoxError>,
}

/// Subscribes to `observable`, appends every `Next` value to a `Vec`,
/// blocks until termination, then returns the values, the final context,
/// and the error (`None` on `Complete`).
pub fn collect<T: 'static + Send>(observable: &Observable<T>) -> (Vec<T>, Context, Option<BoxError>) {
    collect_with_context(observable, Context::background())
}

/// As [`collect`], but subscribing under the given context.
pub fn collect_with_context<T: 'static + Send>(
    observable: &Observable<T>,
    ctx: Context,
) -> (Vec<T>, Context, Option<BoxError>) {
    let state = Arc::new(Mutex::new(CollectState {
        values: Vec::new(),
        ctx: ctx.clone(),
        error: None,
    }));
    let on_next_state = state.clone();
    let on_error_state = state.clone();
    let on_complete_state = state.clone();
    let observer = observer_fn(
        move |ctx: &Context, value: T| {
            let mut guard = on_next_state.lock();
            guard.values.push(value);
            guard.ctx = ctx.clone();
        },
        move |ctx: &Context, err: BoxError| {
            let mut guard = on_error_state.lock();
            guard.error = Some(err);
            guard.ctx = ctx.clone();
        },
        move |ctx: &Context| {
            on_complete_state.lock().ctx = ctx.clone();
        },
    );
    let subscription = observable.subscribe_with_context(ctx, observer);
    subscription.wait();
    let mut guard = state.lock();
    (
        std::mem::take(&mut guard.values),
        guard.ctx.clone(),
        guard.error.take(),
    )
}

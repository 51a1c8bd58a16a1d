//! `buffer_count`, `buffer_when`, `buffer_time`, `buffer_time_or_count`
//! (spec §4.9 buffering operators).

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use ro::{observer_fn, BoxError, Context, Observer, Teardown};
use ro::Observable;

use crate::time::interval;

/// Groups every `count` source values into a `Vec`, emitting a full buffer
/// as soon as it is reached. A non-empty partial buffer is flushed on
/// `Complete`; on `Error` the partial buffer is discarded and the error
/// propagates directly, matching common `bufferCount` semantics.
pub fn buffer_count<T: 'static + Send>(source: Observable<T>, count: usize) -> Observable<Vec<T>> {
    assert!(count > 0, "buffer_count requires count > 0");
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let buffer: Arc<Mutex<Vec<T>>> = Arc::new(Mutex::new(Vec::with_capacity(count)));
        let next_buffer = buffer.clone();
        let next_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let complete_buffer = buffer.clone();
        let complete_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                let mut guard = next_buffer.lock();
                guard.push(value);
                if guard.len() == count {
                    let full = std::mem::replace(&mut *guard, Vec::with_capacity(count));
                    drop(guard);
                    next_subscriber.on_next(ctx, full);
                }
            },
            move |ctx: &Context, err: BoxError| error_subscriber.on_error(ctx, err),
            move |ctx: &Context| {
                let remaining = std::mem::take(&mut *complete_buffer.lock());
                if !remaining.is_empty() {
                    complete_subscriber.on_next(ctx, remaining);
                }
                complete_subscriber.on_complete(ctx);
            },
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

/// Buffers source values, flushing (and emitting, even if empty) every time
/// `boundaries` emits a `Next`. The final buffer, whatever its size, is
/// flushed on source `Complete`. `Error` discards the pending buffer and
/// propagates directly.
pub fn buffer_when<T: 'static + Send>(
    source: Observable<T>,
    boundaries: Observable<()>,
) -> Observable<Vec<T>> {
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let buffer: Arc<Mutex<Vec<T>>> = Arc::new(Mutex::new(Vec::new()));

        let boundary_buffer = buffer.clone();
        let boundary_subscriber = subscriber.clone();
        let boundary_observer = observer_fn(
            move |ctx: &Context, _unit: ()| {
                let flushed = std::mem::take(&mut *boundary_buffer.lock());
                boundary_subscriber.on_next(ctx, flushed);
            },
            move |_ctx: &Context, _err: BoxError| {},
            move |_ctx: &Context| {},
        );
        let boundary_subscription = boundaries.subscribe_with_context(ctx.clone(), boundary_observer);

        let source_buffer = buffer.clone();
        let source_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let complete_buffer = buffer;
        let complete_subscriber = subscriber.clone();
        let source_observer = observer_fn(
            move |_ctx: &Context, value: T| {
                source_buffer.lock().push(value);
            },
            move |ctx: &Context, err: BoxError| source_subscriber.on_error(ctx, err),
            move |ctx: &Context| {
                let remaining = std::mem::take(&mut *complete_buffer.lock());
                complete_subscriber.on_next(ctx, remaining);
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

/// `buffer_when(source, interval(duration).map(|_| ()))`: flushes (emitting
/// even an empty `Vec`) every `duration`.
pub fn buffer_time<T: 'static + Send>(source: Observable<T>, duration: Duration) -> Observable<Vec<T>> {
    use ro::ObservableExt;
    buffer_when(source, interval(duration).map(|_| ()))
}

struct BufferState<T> {
    buffer: Vec<T>,
    deadline: Instant,
}

/// Flushes whichever comes first: `count` values buffered, or `duration`
/// elapsed since the last flush. Both triggers reset the timer.
pub fn buffer_time_or_count<T: 'static + Send>(
    source: Observable<T>,
    duration: Duration,
    count: usize,
) -> Observable<Vec<T>> {
    assert!(count > 0, "buffer_time_or_count requires count > 0");
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let state = Arc::new(Mutex::new(BufferState {
            buffer: Vec::new(),
            deadline: Instant::now() + duration,
        }));

        let timer_state = state.clone();
        let timer_subscriber = subscriber.clone();
        let timer_ctx = ctx.clone();
        std::thread::Builder::new()
            .name("ro-buffer-timer".into())
            .spawn(move || loop {
                if timer_subscriber.is_closed() {
                    return;
                }
                let due = timer_state.lock().deadline;
                let now = Instant::now();
                if due > now {
                    std::thread::sleep(due - now);
                    continue;
                }
                if timer_subscriber.is_closed() {
                    return;
                }
                let drained = {
                    let mut guard = timer_state.lock();
                    guard.deadline = Instant::now() + duration;
                    std::mem::take(&mut guard.buffer)
                };
                timer_subscriber.on_next(&timer_ctx, drained);
            })
            .ok();

        let next_state = state.clone();
        let next_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let complete_state = state;
        let complete_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                let drained = {
                    let mut guard = next_state.lock();
                    guard.buffer.push(value);
                    if guard.buffer.len() >= count {
                        guard.deadline = Instant::now() + duration;
                        Some(std::mem::take(&mut guard.buffer))
                    } else {
                        None
                    }
                };
                if let Some(drained) = drained {
                    next_subscriber.on_next(ctx, drained);
                }
            },
            move |ctx: &Context, err: BoxError| error_subscriber.on_error(ctx, err),
            move |ctx: &Context| {
                let remaining = std::mem::take(&mut complete_state.lock().buffer);
                if !remaining.is_empty() {
                    complete_subscriber.on_next(ctx, remaining);
                }
                complete_subscriber.on_complete(ctx);
            },
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_count_groups_exact_chunks_and_flushes_the_remainder() {
        let source = ro::of(vec![1, 2, 3, 4, 5]);
        let (values, _, err) = ro::collect(&buffer_count(source, 2));
        assert_eq!(values, vec![vec![1, 2], vec![3, 4], vec![5]]);
        assert!(err.is_none());
    }

    #[test]
    fn buffer_when_flushes_on_every_boundary_and_the_remainder_on_complete() {
        let source = ro::of(vec![1, 2, 3]);
        // A boundary that never fires: every value lands in the final,
        // complete-triggered flush.
        let boundaries: Observable<()> = Observable::new(|ctx, subscriber| {
            subscriber.on_complete(&ctx);
            None
        });
        let (values, _, err) = ro::collect(&buffer_when(source, boundaries));
        assert_eq!(values, vec![vec![1, 2, 3]]);
        assert!(err.is_none());
    }
}

//! `subscribe_on`/`observe_on` (spec §4.7): scheduling hand-off via a
//! dedicated OS thread and a bounded `std::sync::mpsc::sync_channel`.
//!
//! Neither operator changes *what* is emitted, only *which thread* runs the
//! work around it:
//!
//! - [`observe_on`] keeps `source.subscribe` on the calling thread (so any
//!   synchronous producer work inside it still runs there), but delivers
//!   every notification to the downstream observer from a dedicated worker
//!   thread, decoupling a slow consumer from a fast producer.
//! - [`subscribe_on`] moves `source.subscribe` itself onto a dedicated
//!   worker thread, so the calling thread returns as soon as the worker has
//!   started; notifications are then delivered from that same worker
//!   thread, matching the common `subscribeOn` gotcha that it does not by
//!   itself move delivery anywhere else. Combine it with `observe_on` for
//!   that.
//!
//! Both take a `buffer_size` bounding the hand-off channel and panic if it
//! is less than 1: a zero-capacity channel could never carry a single
//! notification, which would silently wedge every subscription.

use std::sync::{mpsc, Arc};

use ro::{observer_fn, BoxError, Context, Observable, Observer, Subscriber, Teardown};

enum Msg<T> {
    Next(Context, T),
    Error(Context, BoxError),
    Complete(Context),
}

fn drain<T: 'static + Send>(rx: mpsc::Receiver<Msg<T>>, subscriber: Arc<Subscriber<T>>) {
    for msg in rx {
        match msg {
            Msg::Next(ctx, value) => subscriber.on_next(&ctx, value),
            Msg::Error(ctx, err) => {
                subscriber.on_error(&ctx, err);
                return;
            }
            Msg::Complete(ctx) => {
                subscriber.on_complete(&ctx);
                return;
            }
        }
    }
}

/// Delivers every notification from a dedicated worker thread, reading from
/// a channel of capacity `buffer_size`. `source.subscribe` itself still
/// runs on the calling thread.
///
/// Panics if `buffer_size == 0`.
pub fn observe_on<T: 'static + Send>(source: Observable<T>, buffer_size: usize) -> Observable<T> {
    assert!(buffer_size >= 1, "observe_on requires buffer_size >= 1");
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let (tx, rx) = mpsc::sync_channel::<Msg<T>>(buffer_size);
        let delivery_subscriber = subscriber.clone();
        std::thread::Builder::new()
            .name("ro-observe-on".into())
            .spawn(move || drain(rx, delivery_subscriber))
            .expect("spawning the observe_on delivery thread");

        let next_tx = tx.clone();
        let error_tx = tx.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                let _ = next_tx.send(Msg::Next(ctx.clone(), value));
            },
            move |ctx: &Context, err: BoxError| {
                let _ = error_tx.send(Msg::Error(ctx.clone(), err));
            },
            move |ctx: &Context| {
                let _ = tx.send(Msg::Complete(ctx.clone()));
            },
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

/// Runs `source.subscribe` itself on a dedicated worker thread, so the
/// calling thread's `subscribe` call returns as soon as that thread starts;
/// notifications are then delivered from the same worker thread. The
/// channel of capacity `buffer_size` carries notifications from the
/// worker's upstream subscription to the outer subscriber.
///
/// Panics if `buffer_size == 0`.
pub fn subscribe_on<T: 'static + Send>(source: Observable<T>, buffer_size: usize) -> Observable<T> {
    assert!(buffer_size >= 1, "subscribe_on requires buffer_size >= 1");
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let (tx, rx) = mpsc::sync_channel::<Msg<T>>(buffer_size);
        let worker_source = source.clone();
        let worker_ctx = ctx;
        std::thread::Builder::new()
            .name("ro-subscribe-on".into())
            .spawn(move || {
                let next_tx = tx.clone();
                let error_tx = tx.clone();
                let observer = observer_fn(
                    move |ctx: &Context, value: T| {
                        let _ = next_tx.send(Msg::Next(ctx.clone(), value));
                    },
                    move |ctx: &Context, err: BoxError| {
                        let _ = error_tx.send(Msg::Error(ctx.clone(), err));
                    },
                    move |ctx: &Context| {
                        let _ = tx.send(Msg::Complete(ctx.clone()));
                    },
                );
                // Held for the worker thread's lifetime; the outer
                // teardown has no separate handle to it, matching
                // subscribeOn's documented behavior of not supporting
                // early cross-thread cancellation of the move itself.
                let _upstream = worker_source.subscribe_with_context(worker_ctx, observer);
            })
            .expect("spawning the subscribe_on worker thread");

        drain(rx, subscriber);
        None
    })
}

/// Method-chaining sugar over [`subscribe_on`]/[`observe_on`], in the spirit
/// of `ro::operators::ObservableExt`: a thin extension trait rather than a
/// proc-macro-generated one, since a hand-written trait already covers two
/// methods without pulling in a macro dependency for them.
pub trait ObservableScheduleExt<T: 'static + Send>: Sized {
    /// See [`subscribe_on`].
    fn subscribe_on(self, buffer_size: usize) -> Observable<T>;
    /// See [`observe_on`].
    fn observe_on(self, buffer_size: usize) -> Observable<T>;
}

impl<T: 'static + Send> ObservableScheduleExt<T> for Observable<T> {
    fn subscribe_on(self, buffer_size: usize) -> Observable<T> {
        subscribe_on(self, buffer_size)
    }

    fn observe_on(self, buffer_size: usize) -> Observable<T> {
        observe_on(self, buffer_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn observe_on_delivers_values_in_order_via_the_worker_thread() {
        let source = ro::of(vec![1, 2, 3]);
        let observed = observe_on(source, 1);
        let delivery_threads: Arc<Mutex<Vec<std::thread::ThreadId>>> = Arc::new(Mutex::new(Vec::new()));
        let delivery_threads2 = delivery_threads.clone();
        let (values, _, err) = ro::collect(&tap_thread(observed, delivery_threads2));
        assert_eq!(values, vec![1, 2, 3]);
        assert!(err.is_none());
        let threads = delivery_threads.lock().unwrap();
        assert_eq!(threads.len(), 3);
        assert!(threads.iter().all(|id| *id != std::thread::current().id()));
    }

    fn tap_thread(
        source: Observable<i32>,
        sink: Arc<Mutex<Vec<std::thread::ThreadId>>>,
    ) -> Observable<i32> {
        ro::tap(source, move |_v| sink.lock().unwrap().push(std::thread::current().id()))
    }

    #[test]
    fn subscribe_on_runs_the_subscription_on_a_worker_thread() {
        let source: Observable<std::thread::ThreadId> = Observable::new(|ctx, subscriber| {
            subscriber.on_next(&ctx, std::thread::current().id());
            subscriber.on_complete(&ctx);
            None
        });
        let scheduled = subscribe_on(source, 1);
        let calling_thread = std::thread::current().id();
        let (values, _, err) = ro::collect(&scheduled);
        assert_eq!(values.len(), 1);
        assert_ne!(values[0], calling_thread);
        assert!(err.is_none());
    }

    #[test]
    fn schedule_ext_methods_delegate_to_the_free_functions() {
        let source = ro::of(vec![1, 2, 3]);
        let scheduled = source.subscribe_on(1).observe_on(1);
        let (values, _, err) = ro::collect(&scheduled);
        assert_eq!(values, vec![1, 2, 3]);
        assert!(err.is_none());
    }

    #[test]
    #[should_panic(expected = "buffer_size")]
    fn observe_on_panics_on_a_zero_buffer_size() {
        let source: Observable<i32> = ro::of(vec![]);
        let _ = observe_on(source, 0);
    }
}

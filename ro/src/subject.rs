//! The `Subject` family (spec §4.4): `Publish`, `Behavior`, `Replay`,
//! `Unicast`, `Async`. A `Subject<T>` is both an [`Observer<T>`] (feed it
//! values from the outside) and a multicast source: [`Subject::as_observable`]
//! returns an `Observable<T>` that fans values out to every subscriber.
//!
//! All five variants share one engine (`Core`) parameterized by a
//! [`Buffering`] policy, rather than five separate types duplicating the
//! observer-registry/termination bookkeeping (see `DESIGN.md` for the
//! rationale). Every variant requires `T: Clone`, since broadcasting one
//! value to N independently-owned observers requires duplicating it; the
//! point operators in [`crate::operators`] don't need this bound because
//! they're strictly one-in-one-out.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
    sync::Arc,
};

use parking_lot::Mutex;
use ro_core::{relay_error, share_error, BoxError, Context, Observer, RoError, SharedError,
    Subscription, Teardown};

use crate::Observable;

/// Pass to [`replay`] or [`unicast`] for an unbounded buffer.
pub const REPLAY_SUBJECT_UNLIMITED_BUFFER_SIZE: usize = usize::MAX;
/// Pass to [`unicast`] for an unbounded buffer.
pub const UNICAST_SUBJECT_UNLIMITED_BUFFER_SIZE: usize = usize::MAX;

const ACTIVE: u8 = 0;
const ERRORED: u8 = 1;
const COMPLETED: u8 = 2;

enum Buffering<T> {
    None,
    Latest(Mutex<Option<T>>),
    Replay(Mutex<VecDeque<T>>, usize),
    Last(Mutex<Option<T>>),
}

enum Terminal {
    None,
    Errored(Context, SharedError),
    Completed(Context),
}

struct Core<T> {
    status: AtomicU8,
    observers: Mutex<Vec<(u64, Arc<dyn Observer<T>>)>>,
    next_id: AtomicU64,
    terminal: Mutex<Terminal>,
    buffering: Buffering<T>,
    single_observer: bool,
    has_been_observed: AtomicBool,
}

impl<T: 'static + Send + Clone> Core<T> {
    fn snapshot_observers(&self) -> Vec<Arc<dyn Observer<T>>> {
        self.observers
            .lock()
            .iter()
            .map(|(_, o)| o.clone())
            .collect()
    }

    fn emit_next(&self, ctx: &Context, value: T) {
        if self.status.load(Ordering::SeqCst) != ACTIVE {
            ro_core::hooks::on_dropped_notification(
                ctx,
                ro_core::hooks::DroppedNotification::Next(&value),
            );
            return;
        }
        match &self.buffering {
            Buffering::None => {}
            Buffering::Latest(slot) => *slot.lock() = Some(value.clone()),
            Buffering::Replay(buffer, cap) => {
                let mut buffer = buffer.lock();
                buffer.push_back(value.clone());
                while buffer.len() > *cap {
                    if let Some(evicted) = buffer.pop_front() {
                        ro_core::hooks::on_dropped_notification(
                            ctx,
                            ro_core::hooks::DroppedNotification::Next(&evicted),
                        );
                    }
                }
            }
            Buffering::Last(slot) => *slot.lock() = Some(value.clone()),
        }
        if !matches!(self.buffering, Buffering::Last(_)) {
            for observer in self.snapshot_observers() {
                observer.on_next(ctx, value.clone());
            }
        }
    }

    fn emit_error(&self, ctx: &Context, err: BoxError) {
        if self
            .status
            .compare_exchange(ACTIVE, ERRORED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let observers = self.snapshot_observers();
        let shared = share_error(err);
        *self.terminal.lock() = Terminal::Errored(ctx.clone(), shared.clone());
        for observer in observers {
            observer.on_error(ctx, relay_error(&shared));
        }
        self.observers.lock().clear();
    }

    fn emit_complete(&self, ctx: &Context) {
        if self
            .status
            .compare_exchange(ACTIVE, COMPLETED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let observers = self.snapshot_observers();
        if let Buffering::Last(slot) = &self.buffering {
            if let Some(value) = slot.lock().clone() {
                for observer in &observers {
                    observer.on_next(ctx, value.clone());
                }
            }
        }
        *self.terminal.lock() = Terminal::Completed(ctx.clone());
        for observer in observers {
            observer.on_complete(ctx);
        }
        self.observers.lock().clear();
    }

    /// Replays this subject's buffered value(s) to a subscriber joining
    /// while the subject is still active. `Behavior` and `Replay`/`Unicast`
    /// replay here; `Async` never does (it only ever has a value to show
    /// once it has completed, handled separately in [`Core::subscribe`]).
    fn replay_into(&self, ctx: &Context, observer: &Arc<dyn Observer<T>>) {
        match &self.buffering {
            Buffering::None | Buffering::Last(_) => {}
            Buffering::Latest(slot) => {
                if let Some(value) = slot.lock().clone() {
                    observer.on_next(ctx, value);
                }
            }
            Buffering::Replay(buffer, _) => {
                for value in buffer.lock().iter() {
                    observer.on_next(ctx, value.clone());
                }
            }
        }
    }

    fn subscribe(self: &Arc<Self>, ctx: Context, observer: Arc<dyn Observer<T>>) -> Subscription {
        let subscription = Subscription::new();
        if self.single_observer
            && self
                .has_been_observed
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
        {
            observer.on_error(&ctx, RoError::UnicastAlreadyObserved.boxed());
            subscription.unsubscribe();
            return subscription;
        }

        let terminal = self.terminal.lock();
        match &*terminal {
            Terminal::None => {
                drop(terminal);
                self.replay_into(&ctx, &observer);
            }
            Terminal::Errored(term_ctx, err) => {
                // `Replay`/`Unicast` still hand out their buffered values
                // before the error; `Behavior` and `Async` do not.
                if matches!(self.buffering, Buffering::Replay(..)) {
                    self.replay_into(&ctx, &observer);
                }
                let term_ctx = term_ctx.clone();
                let err = relay_error(err);
                drop(terminal);
                observer.on_error(&term_ctx, err);
                subscription.unsubscribe();
                return subscription;
            }
            Terminal::Completed(term_ctx) => {
                if matches!(self.buffering, Buffering::Replay(..)) {
                    self.replay_into(&ctx, &observer);
                } else if let Buffering::Last(slot) = &self.buffering {
                    // `Async`: a subscriber joining after completion still
                    // gets the final value, unlike one joining after an
                    // error.
                    if let Some(value) = slot.lock().clone() {
                        observer.on_next(term_ctx, value);
                    }
                }
                let term_ctx = term_ctx.clone();
                drop(terminal);
                observer.on_complete(&term_ctx);
                subscription.unsubscribe();
                return subscription;
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers.lock().push((id, observer));
        let core = self.clone();
        subscription.add(move || {
            core.observers.lock().retain(|(oid, _)| *oid != id);
        });
        subscription
    }
}

/// A multicast `Observer<T>` + `Observable<T>` hybrid: push values in with
/// the `Observer` methods, fan them out to every current and (depending on
/// buffering policy) future subscriber via [`Subject::as_observable`].
pub struct Subject<T> {
    core: Arc<Core<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T: 'static + Send + Clone> Subject<T> {
    fn with_buffering(buffering: Buffering<T>, single_observer: bool) -> Self {
        Self {
            core: Arc::new(Core {
                status: AtomicU8::new(ACTIVE),
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                terminal: Mutex::new(Terminal::None),
                buffering,
                single_observer,
                has_been_observed: AtomicBool::new(false),
            }),
        }
    }

    pub fn has_observer(&self) -> bool {
        !self.core.observers.lock().is_empty()
    }

    pub fn count_observers(&self) -> usize {
        self.core.observers.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.core.status.load(Ordering::SeqCst) != ACTIVE
    }

    pub fn has_thrown(&self) -> bool {
        self.core.status.load(Ordering::SeqCst) == ERRORED
    }

    pub fn is_completed(&self) -> bool {
        self.core.status.load(Ordering::SeqCst) == COMPLETED
    }

    /// Pushes a value into the subject under a background context. See
    /// [`Observer::on_next`] for the context-carrying form.
    pub fn next(&self, value: T) {
        self.core.emit_next(&Context::background(), value);
    }

    pub fn error(&self, err: BoxError) {
        self.core.emit_error(&Context::background(), err);
    }

    pub fn complete(&self) {
        self.core.emit_complete(&Context::background());
    }

    /// Returns this subject's observer half as an `Observable<T>`: every
    /// `subscribe` registers a new fan-out target (or, for `Unicast`,
    /// rejects any subscriber after the first).
    pub fn as_observable(&self) -> Observable<T> {
        let core = self.core.clone();
        Observable::new(move |ctx, subscriber| -> Option<Teardown> {
            let subscription = core.subscribe(ctx, subscriber.clone() as Arc<dyn Observer<T>>);
            Some(Box::new(move || subscription.unsubscribe()) as Teardown)
        })
    }
}

impl<T: 'static + Send + Clone> Observer<T> for Subject<T> {
    fn on_next(&self, ctx: &Context, value: T) {
        self.core.emit_next(ctx, value);
    }

    fn on_error(&self, ctx: &Context, err: BoxError) {
        self.core.emit_error(ctx, err);
    }

    fn on_complete(&self, ctx: &Context) {
        self.core.emit_complete(ctx);
    }
}

/// A subject with no replay buffer: late subscribers see only values
/// emitted after they subscribe.
pub fn publish<T: 'static + Send + Clone>() -> Subject<T> {
    Subject::with_buffering(Buffering::None, false)
}

/// A subject that remembers its most recent value (starting from
/// `initial`) and replays it to every new subscriber before live values.
pub fn behavior<T: 'static + Send + Clone>(initial: T) -> Subject<T> {
    Subject::with_buffering(Buffering::Latest(Mutex::new(Some(initial))), false)
}

/// A subject that buffers up to `capacity` of its most recent values
/// (`REPLAY_SUBJECT_UNLIMITED_BUFFER_SIZE` for no limit) and replays them,
/// in order, to every new subscriber.
pub fn replay<T: 'static + Send + Clone>(capacity: usize) -> Subject<T> {
    Subject::with_buffering(Buffering::Replay(Mutex::new(VecDeque::new()), capacity), false)
}

/// Like [`replay`], but only ever allows a single subscriber; every
/// subscription after the first is immediately errored with
/// [`RoError::UnicastAlreadyObserved`].
pub fn unicast<T: 'static + Send + Clone>(capacity: usize) -> Subject<T> {
    Subject::with_buffering(Buffering::Replay(Mutex::new(VecDeque::new()), capacity), true)
}

/// A subject that only ever emits its final value, and only once the
/// source completes. Errors are still delivered immediately.
pub fn async_subject<T: 'static + Send + Clone>() -> Subject<T> {
    Subject::with_buffering(Buffering::Last(Mutex::new(None)), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ro_core::observer_fn;

    #[test]
    fn publish_subject_only_reaches_live_subscribers() {
        let subject = publish::<i32>();
        subject.next(1);
        let received = Arc::new(Mutex::new(Vec::new()));
        let received2 = received.clone();
        let _subscription = subject.as_observable().subscribe(observer_fn(
            move |_ctx, v: i32| received2.lock().push(v),
            |_ctx, _e| {},
            |_ctx| {},
        ));
        subject.next(2);
        subject.next(3);
        subject.complete();
        assert_eq!(*received.lock(), vec![2, 3]);
    }

    #[test]
    fn behavior_subject_replays_the_latest_value() {
        let subject = behavior(0);
        subject.next(1);
        subject.next(2);
        let received = Arc::new(Mutex::new(Vec::new()));
        let received2 = received.clone();
        let _subscription = subject.as_observable().subscribe(observer_fn(
            move |_ctx, v: i32| received2.lock().push(v),
            |_ctx, _e| {},
            |_ctx| {},
        ));
        assert_eq!(*received.lock(), vec![2]);
    }

    #[test]
    fn unicast_subject_rejects_a_second_subscriber() {
        let subject = unicast::<i32>(UNICAST_SUBJECT_UNLIMITED_BUFFER_SIZE);
        let observable = subject.as_observable();
        let _first = observable.subscribe(observer_fn(|_c, _v: i32| {}, |_c, _e| {}, |_c| {}));
        let errored = Arc::new(AtomicU64::new(0));
        let errored2 = errored.clone();
        let _second = observable.subscribe(observer_fn(
            |_c, _v: i32| {},
            move |_c, _e| {
                errored2.fetch_add(1, Ordering::SeqCst);
            },
            |_c| {},
        ));
        assert_eq!(errored.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn async_subject_emits_only_the_last_value_on_complete() {
        let subject = async_subject::<i32>();
        let received = Arc::new(Mutex::new(Vec::new()));
        let received2 = received.clone();
        let _subscription = subject.as_observable().subscribe(observer_fn(
            move |_ctx, v: i32| received2.lock().push(v),
            |_ctx, _e| {},
            |_ctx| {},
        ));
        subject.next(1);
        subject.next(2);
        subject.next(3);
        assert!(received.lock().is_empty());
        subject.complete();
        assert_eq!(*received.lock(), vec![3]);
    }

    #[test]
    fn async_subject_replays_its_last_value_to_a_late_subscriber_after_complete() {
        let subject = async_subject::<i32>();
        subject.next(1);
        subject.next(2);
        subject.complete();
        let received = Arc::new(Mutex::new(Vec::new()));
        let received2 = received.clone();
        let completed = Arc::new(AtomicU64::new(0));
        let completed2 = completed.clone();
        let _subscription = subject.as_observable().subscribe(observer_fn(
            move |_ctx, v: i32| received2.lock().push(v),
            |_ctx, _e| {},
            move |_ctx| {
                completed2.fetch_add(1, Ordering::SeqCst);
            },
        ));
        assert_eq!(*received.lock(), vec![2]);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn async_subject_does_not_replay_its_last_value_to_a_late_subscriber_after_error() {
        let subject = async_subject::<i32>();
        subject.next(1);
        subject.error(RoError::Observable("boom".into()).boxed());
        let received = Arc::new(Mutex::new(Vec::new()));
        let received2 = received.clone();
        let errored = Arc::new(AtomicU64::new(0));
        let errored2 = errored.clone();
        let _subscription = subject.as_observable().subscribe(observer_fn(
            move |_ctx, v: i32| received2.lock().push(v),
            move |_ctx, _e| {
                errored2.fetch_add(1, Ordering::SeqCst);
            },
            |_ctx| {},
        ));
        assert!(received.lock().is_empty());
        assert_eq!(errored.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn behavior_subject_does_not_replay_its_latest_value_to_a_late_subscriber_after_complete() {
        let subject = behavior(0);
        subject.next(1);
        subject.complete();
        let received = Arc::new(Mutex::new(Vec::new()));
        let received2 = received.clone();
        let completed = Arc::new(AtomicU64::new(0));
        let completed2 = completed.clone();
        let _subscription = subject.as_observable().subscribe(observer_fn(
            move |_ctx, v: i32| received2.lock().push(v),
            |_ctx, _e| {},
            move |_ctx| {
                completed2.fetch_add(1, Ordering::SeqCst);
            },
        ));
        assert!(received.lock().is_empty());
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn replay_subject_evicts_the_oldest_value_past_capacity_and_reports_it_dropped() {
        let dropped = Arc::new(AtomicU64::new(0));
        let dropped2 = dropped.clone();
        ro_core::hooks::set_on_dropped_notification(move |_ctx, notification| {
            if matches!(notification, ro_core::hooks::DroppedNotification::Next(_)) {
                dropped2.fetch_add(1, Ordering::SeqCst);
            }
        });
        let subject = replay::<i32>(2);
        subject.next(1);
        subject.next(2);
        subject.next(3);
        let received = Arc::new(Mutex::new(Vec::new()));
        let received2 = received.clone();
        let _subscription = subject.as_observable().subscribe(observer_fn(
            move |_ctx, v: i32| received2.lock().push(v),
            |_ctx, _e| {},
            |_ctx| {},
        ));
        assert_eq!(*received.lock(), vec![2, 3]);
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
        ro_core::hooks::set_on_dropped_notification(|_ctx, _notification| {});
    }
}

//! [`Context`]: the per-notification carrier used for cancellation,
//! deadlines and metadata (spec §4.9, C10).
//!
//! Contexts are immutable from the outside: every `with_*` method returns a
//! new, derived `Context` rather than mutating `self`. Cancellation through
//! a context does **not** by itself terminate a pipeline. See
//! `throw_on_context_cancel` in the `ro` crate, which is the operator that
//! makes cancellation observable as a stream `Error`.

use std::{
    any::Any,
    fmt::{self, Debug, Formatter},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

struct ValueNode {
    key: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<ValueNode>>,
}

/// An opaque, cheaply-cloneable carrier threaded alongside every
/// `Next`/`Error`/`Complete` notification.
#[derive(Clone)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    values: Option<Arc<ValueNode>>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// The root context: never cancelled (unless explicitly cancelled via
    /// an owner that holds no public handle to do so), no deadline, no
    /// metadata.
    pub fn background() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
            values: None,
        }
    }

    /// Whether this context (or an ancestor sharing its cancellation flag)
    /// has been cancelled, e.g. because a `with_deadline`/`with_timeout`
    /// ancestor's deadline elapsed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// The nearest enclosing deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Looks up a value previously attached with [`Context::with_value`],
    /// walking outward through ancestors.
    pub fn value(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        let mut node = self.values.as_deref();
        while let Some(n) = node {
            if n.key == key {
                return Some(n.value.clone());
            }
            node = n.parent.as_deref();
        }
        None
    }

    /// Returns a derived context carrying an additional key/value pair.
    /// Earlier values under the same key are shadowed, not removed.
    #[must_use]
    pub fn with_value(&self, key: &'static str, value: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            cancelled: self.cancelled.clone(),
            deadline: self.deadline,
            values: Some(Arc::new(ValueNode {
                key,
                value,
                parent: self.values.clone(),
            })),
        }
    }

    /// Returns a derived context that becomes cancelled once `deadline`
    /// elapses.
    ///
    /// # Logic
    ///
    /// Spawns a one-shot timer thread bound to the new context's own
    /// cancellation flag. The thread is intentionally *not* tied to any
    /// `Subscription` teardown: cancelling the subscription that reads this
    /// context does not wake the timer early. This mirrors `observeOn`
    /// composed with a per-notification child context: the timer is a
    /// bounded leak, capped by `deadline`, not an unbounded one.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let wait = deadline.saturating_duration_since(Instant::now());
        let timer_flag = cancelled.clone();
        let spawned = thread::Builder::new()
            .name("ro-context-deadline".into())
            .spawn(move || {
                thread::sleep(wait);
                timer_flag.store(true, Ordering::Release);
            });
        if spawned.is_err() {
            // Could not spawn the timer thread; fail safe by cancelling immediately
            // rather than silently never expiring.
            cancelled.store(true, Ordering::Release);
        }
        Self {
            cancelled,
            deadline: Some(deadline),
            values: self.values.clone(),
        }
    }

    /// Shorthand for `self.with_deadline(Instant::now() + timeout)`.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a fresh background context, discarding cancellation,
    /// deadline and metadata inherited from `self`.
    #[must_use]
    pub fn reset(&self) -> Self {
        Self::background()
    }

    /// Projects this context through `f`, producing a derived context.
    #[must_use]
    pub fn map(&self, f: impl FnOnce(&Context) -> Context) -> Self {
        f(self)
    }
}

//! The [`Notification`] tagged union (spec §3).

use crate::error::BoxError;

/// A single item pushed through a stream: zero or more [`Notification::Next`]
/// followed by at most one of [`Notification::Error`] or
/// [`Notification::Complete`], never both.
///
/// Immutable once constructed; carries its own kind, so code that buffers
/// notifications (replay buffers, buffered windows) doesn't need a separate
/// discriminant.
#[derive(Debug)]
pub enum Notification<T> {
    /// A value pushed by the producer.
    Next(T),
    /// The terminal error notification.
    Error(BoxError),
    /// The terminal completion notification.
    Complete,
}

impl<T> Notification<T> {
    /// True for [`Notification::Error`] or [`Notification::Complete`].
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }

    /// Maps the `Next` payload, leaving terminal notifications untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Notification<U> {
        match self {
            Notification::Next(v) => Notification::Next(f(v)),
            Notification::Error(e) => Notification::Error(e),
            Notification::Complete => Notification::Complete,
        }
    }
}

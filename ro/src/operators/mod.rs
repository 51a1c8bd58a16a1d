//! Point operators over `Observable<T>` (spec §4.9).
//!
//! Every operator here is a free function `fn(Observable<A>, ...) ->
//! Observable<B>` so it composes naturally with [`crate::pipe`]. The
//! [`ObservableExt`] trait re-exposes the same behavior as chainable
//! methods for callers who prefer `source.map(..).filter(..)` over
//! `pipe!(source, |o| map(o, ..), |o| filter(o, ..))`.

mod catch;
mod filter;
mod map;
mod of;
mod retry;
mod scan;
mod take;
mod tap;

pub use catch::{catch, on_error_resume_next_with, on_error_return};
pub use filter::filter;
pub use map::map;
pub use of::{empty, just, of, throw};
pub use retry::{retry, retry_with_config, RetryConfig};
pub use scan::{reduce, scan, sum};
pub use take::{skip, take};
pub use tap::tap;

use ro_core::BoxError;

use crate::Observable;

/// Chainable method-call sugar over the free operator functions in this
/// module.
pub trait ObservableExt<T: 'static + Send>: Sized {
    fn map<B: 'static + Send>(self, f: impl Fn(T) -> B + Send + Sync + 'static) -> Observable<B>;
    fn filter(self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T>;
    fn take(self, count: usize) -> Observable<T>;
    fn skip(self, count: usize) -> Observable<T>;
    fn scan<Acc: 'static + Send + Clone>(
        self,
        initial: Acc,
        f: impl Fn(Acc, T) -> Acc + Send + Sync + 'static,
    ) -> Observable<Acc>;
    fn reduce<Acc: 'static + Send + Clone>(
        self,
        initial: Acc,
        f: impl Fn(Acc, T) -> Acc + Send + Sync + 'static,
    ) -> Observable<Acc>;
    fn tap(self, f: impl Fn(&T) + Send + Sync + 'static) -> Observable<T>;
    fn retry(self) -> Observable<T>;
    fn retry_with_config(self, config: RetryConfig) -> Observable<T>;
    fn catch(
        self,
        handler: impl Fn(&BoxError) -> Observable<T> + Send + Sync + 'static,
    ) -> Observable<T>;
    fn on_error_return(self, f: impl Fn(&BoxError) -> T + Send + Sync + 'static) -> Observable<T>;
}

impl<T: 'static + Send> ObservableExt<T> for Observable<T> {
    fn map<B: 'static + Send>(self, f: impl Fn(T) -> B + Send + Sync + 'static) -> Observable<B> {
        map::map(self, f)
    }

    fn filter(self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T> {
        filter::filter(self, predicate)
    }

    fn take(self, count: usize) -> Observable<T> {
        take::take(self, count)
    }

    fn skip(self, count: usize) -> Observable<T> {
        take::skip(self, count)
    }

    fn scan<Acc: 'static + Send + Clone>(
        self,
        initial: Acc,
        f: impl Fn(Acc, T) -> Acc + Send + Sync + 'static,
    ) -> Observable<Acc> {
        scan::scan(self, initial, f)
    }

    fn reduce<Acc: 'static + Send + Clone>(
        self,
        initial: Acc,
        f: impl Fn(Acc, T) -> Acc + Send + Sync + 'static,
    ) -> Observable<Acc> {
        scan::reduce(self, initial, f)
    }

    fn tap(self, f: impl Fn(&T) + Send + Sync + 'static) -> Observable<T> {
        tap::tap(self, f)
    }

    fn retry(self) -> Observable<T> {
        retry::retry(self)
    }

    fn retry_with_config(self, config: RetryConfig) -> Observable<T> {
        retry::retry_with_config(self, config)
    }

    fn catch(
        self,
        handler: impl Fn(&BoxError) -> Observable<T> + Send + Sync + 'static,
    ) -> Observable<T> {
        catch::catch(self, handler)
    }

    fn on_error_return(self, f: impl Fn(&BoxError) -> T + Send + Sync + 'static) -> Observable<T> {
        catch::on_error_return(self, f)
    }
}

/// `sum()` as a chainable method, kept separate from [`ObservableExt`]
/// because it needs `Default + Add` bounds the other operators don't.
pub trait SumExt<T> {
    fn sum(self) -> Observable<T>;
}

impl<T> SumExt<T> for Observable<T>
where
    T: 'static + Send + Clone + Default + std::ops::Add<Output = T>,
{
    fn sum(self) -> Observable<T> {
        scan::sum(self)
    }
}

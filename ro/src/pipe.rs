//! `Pipe` composition (spec §4.8, C9).
//!
//! Two forms are provided, matching the spec's note that implementations
//! may offer both a statically-typed and a runtime-checked variadic form:
//!
//! - [`pipe!`] composes any number of `Fn(Observable<A>) -> Observable<B>`
//!   stages left-to-right. Because each stage's input/output types are
//!   checked by the compiler at the call site, a type mismatch is a
//!   compile error here rather than a `ro.Pipe` runtime error, and the
//!   statically-typed specializations the spec describes (`Pipe1`..`PipeN`)
//!   collapse into this single macro under Rust's generics.
//! - [`DynStage`] and [`pipe_dyn`] erase the element type with `Box<dyn
//!   Any>` and check `TypeId` compatibility between consecutive stages at
//!   composition time, raising [`RoError::Pipe`] on the first mismatch. This
//!   is the variadic, runtime-checked form for callers assembling a
//!   pipeline from stages not known until runtime (e.g. built from
//!   configuration).

use std::any::{Any, TypeId};

use ro_core::{BoxError, RoError};

use crate::Observable;

/// Composes any number of unary `Observable` transforms left-to-right:
/// `pipe!(source, f1, f2, f3)` is `f3(f2(f1(source)))`. Each `fN` is any
/// expression implementing `Fn(Observable<A>) -> Observable<B>`, typically
/// a closure wrapping one or more operator calls.
#[macro_export]
macro_rules! pipe {
    ($source:expr $(,)?) => {
        $source
    };
    ($source:expr, $first:expr $(, $rest:expr)* $(,)?) => {
        $crate::pipe!(($first)($source) $(, $rest)*)
    };
}

/// One stage of a runtime-checked [`pipe_dyn`] pipeline: a type-erased
/// `Observable<A> -> Observable<B>` transform, remembering the `TypeId`s of
/// `A` and `B` so composition can be checked without the caller naming
/// either type.
pub struct DynStage {
    input_type: TypeId,
    input_type_name: &'static str,
    output_type: TypeId,
    output_type_name: &'static str,
    apply: Box<dyn Fn(Box<dyn Any>) -> Box<dyn Any>>,
}

impl DynStage {
    /// Wraps a typed operator as a runtime-checked pipeline stage.
    pub fn new<A, B>(f: impl Fn(Observable<A>) -> Observable<B> + 'static) -> Self
    where
        A: 'static,
        B: 'static,
    {
        Self {
            input_type: TypeId::of::<Observable<A>>(),
            input_type_name: std::any::type_name::<A>(),
            output_type: TypeId::of::<Observable<B>>(),
            output_type_name: std::any::type_name::<B>(),
            apply: Box::new(move |boxed: Box<dyn Any>| {
                let input = *boxed
                    .downcast::<Observable<A>>()
                    .expect("input type already checked by pipe_dyn");
                Box::new(f(input)) as Box<dyn Any>
            }),
        }
    }
}

/// Runs `source` through `stages` left-to-right, checking at each step that
/// the next stage's declared input type matches the previous stage's
/// declared output type. Returns the final `Box<dyn Any>` (downcast it to
/// the expected `Observable<Z>`), or a [`RoError::Pipe`] at the first
/// mismatch.
pub fn pipe_dyn<T: 'static>(
    source: Observable<T>,
    stages: Vec<DynStage>,
) -> Result<Box<dyn Any>, BoxError> {
    let mut current: Box<dyn Any> = Box::new(source);
    let mut current_type = TypeId::of::<Observable<T>>();
    let mut current_type_name = std::any::type_name::<T>();
    for (position, stage) in stages.into_iter().enumerate() {
        if current_type != stage.input_type {
            return Err(RoError::Pipe(format!(
                "stage {position}: expected Observable<{}> but received Observable<{}>",
                stage.input_type_name, current_type_name
            ))
            .boxed());
        }
        current = (stage.apply)(current);
        current_type = stage.output_type;
        current_type_name = stage.output_type_name;
    }
    Ok(current)
}

use std::{fmt::Display, panic::Location};

use anyhow::{Context, Result};

/// Public prelude. Re-exports the parts of `anyhow` and `thiserror` that
/// every crate of this workspace ends up importing anyway.
pub mod prelude {
    extern crate anyhow;
    pub use anyhow::{anyhow, bail, Context, Result};

    extern crate thiserror;
    pub use thiserror::Error;

    pub use super::{LocatedError, LocatedOption};
}

#[inline]
fn tag(caller: &'static Location<'static>) -> String {
    format!("[{}:{}:{}]", caller.file(), caller.line(), caller.column())
}

/// Extends [`Result`] with context adapters that prefix the *caller's*
/// file, line and column to the error chain. The output error is always an
/// [`anyhow::Error`].
///
/// ```should_panic
/// use located_error::prelude::*;
///
/// fn quantize(scores: &[f32]) -> Result<u8> {
///     scores.iter().copied().reduce(f32::max)
///         .loc("cannot quantize an empty score table")
///         .map(|max| max.round() as u8)
/// }
///
/// fn main() -> Result<()> {
///     let bias = quantize(&[]).loc("while building the byte layer")?;
///     Ok(())
/// }
/// ```
pub trait LocatedError<T, E> {
    /// Eager variant: the context string is built even on the `Ok` path.
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static;

    /// Lazy variant: the closure only runs if the value is an error.
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> LocatedError<T, E> for Result<T, E>
where
    E: Display + Send + Sync + 'static,
    Result<T, E>: Context<T, E>,
{
    #[track_caller]
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
    {
        let loc = tag(Location::caller());
        self.context(format!("{loc} {context}"))
    }

    #[track_caller]
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        let loc = tag(Location::caller());
        self.with_context(|| format!("{loc} {}", f()))
    }
}

/// [`LocatedError`], for [`Option`]. `None` becomes an [`anyhow::Error`]
/// carrying the caller's location.
pub trait LocatedOption<T> {
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static;

    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> LocatedOption<T> for Option<T> {
    #[track_caller]
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
    {
        match self {
            Some(value) => Ok(value),
            None => Err(anyhow::anyhow!("{} {context}", tag(Location::caller()))),
        }
    }

    #[track_caller]
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        match self {
            Some(value) => Ok(value),
            None => Err(anyhow::anyhow!("{} {}", tag(Location::caller()), f())),
        }
    }
}

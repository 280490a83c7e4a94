//! Not-found fallbacks
//!
//! Lookups and deletions treat a missing resource as an answer rather
//! than a failure: a GET of something that is gone yields `None`, and a
//! DELETE of something that is gone yields `false`.

use crate::error::Result;

/// Folds `Error::NotFound` into an ordinary value
pub trait NotFoundExt<T> {
    /// `Ok(Some(v))` on success, `Ok(None)` on `NotFound`
    fn none_on_not_found(self) -> Result<Option<T>>;

    /// `Ok(true)` on success, `Ok(false)` on `NotFound`
    fn false_on_not_found(self) -> Result<bool>;
}

impl<T> NotFoundExt<T> for Result<T> {
    fn none_on_not_found(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn false_on_not_found(self) -> Result<bool> {
        self.none_on_not_found().map(|found| found.is_some())
    }
}

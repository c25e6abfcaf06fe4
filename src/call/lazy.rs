//! Once-initialized cell with a fallible initializer.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// A cell realized at most once, even under concurrent first access.
///
/// `OnceLock::get_or_try_init` is still unstable, so the fallible
/// construction path is double-checked behind a mutex instead. The mutex
/// guards construction only; readers of an already-realized cell never
/// touch it. A failed initializer leaves the cell empty so a later caller
/// may try again.
pub(crate) struct LazyCell<T> {
    cell: OnceLock<Arc<T>>,
    init: Mutex<()>,
}

impl<T> LazyCell<T> {
    pub(crate) fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// The realized value, if any. Never constructs.
    pub(crate) fn get(&self) -> Option<&Arc<T>> {
        self.cell.get()
    }

    /// The realized value, constructing it with `init` on first access.
    /// All callers observe the same instance once construction succeeds.
    pub(crate) fn get_or_try_init<E>(
        &self,
        init: impl FnOnce() -> Result<Arc<T>, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(value) = self.cell.get() {
            return Ok(Arc::clone(value));
        }
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = self.cell.get() {
            return Ok(Arc::clone(value));
        }
        let value = init()?;
        // Cannot fail: construction is serialized by the guard above.
        let _ = self.cell.set(Arc::clone(&value));
        Ok(value)
    }
}

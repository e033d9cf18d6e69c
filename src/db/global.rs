//! Process-wide default manager.
//!
//! The cell starts empty. [`init`] installs a manager only while the cell is empty,
//! [`set`] always replaces it.

use crate::db::pool::Manager;
use crate::error::{DbError, DbResult};
use std::sync::{Arc, PoisonError, RwLock};

static GLOBAL: RwLock<Option<Arc<Manager>>> = RwLock::new(None);

/// Install `manager` unless a global manager already exists. Returns true if installed.
pub fn init(manager: Arc<Manager>) -> bool {
    let mut cell = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    if cell.is_some() {
        return false;
    }
    *cell = Some(manager);
    true
}

/// Replace the global manager.
pub fn set(manager: Arc<Manager>) {
    *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = Some(manager);
}

/// Get the global manager.
pub fn get() -> DbResult<Arc<Manager>> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(DbError::NoGlobalManager)
}

/// Remove the global manager, returning it.
pub fn clear() -> Option<Arc<Manager>> {
    GLOBAL.write().unwrap_or_else(PoisonError::into_inner).take()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit tests share one process-wide cell, so every transition lives in one test.
    #[test]
    fn test_global_lifecycle() {
        clear();
        assert!(matches!(get(), Err(DbError::NoGlobalManager)));

        let first = Arc::new(Manager::new());
        let second = Arc::new(Manager::new());

        assert!(init(Arc::clone(&first)));
        assert!(!init(Arc::clone(&second)));
        assert!(Arc::ptr_eq(&get().unwrap(), &first));

        set(Arc::clone(&second));
        assert!(Arc::ptr_eq(&get().unwrap(), &second));

        let removed = clear().unwrap();
        assert!(Arc::ptr_eq(&removed, &second));
        assert!(get().is_err());
    }
}

//! One-time visibility flag
//!
//! Once the preloader has played to the end, a flag in storage suppresses it
//! on every later visit. Storage problems never block the page: an unreadable
//! flag counts as unset.

use std::rc::Rc;

use crate::consts::SEEN_VALUE;
use crate::error::StoreError;
use crate::platform::KeyValueStore;

#[derive(Clone)]
pub struct VisibilityGate {
    store: Rc<dyn KeyValueStore>,
    key: String,
}

impl VisibilityGate {
    pub fn new(store: Rc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// True only when the stored value is exactly `"true"`
    pub fn has_seen(&self) -> bool {
        match self.store.get(&self.key) {
            Ok(value) => value.as_deref() == Some(SEEN_VALUE),
            Err(e) => {
                log::warn!("Treating preloader flag as unset: {}", e);
                false
            }
        }
    }

    /// Persist the flag
    pub fn mark_seen(&self) -> Result<(), StoreError> {
        self.store.set(&self.key, SEEN_VALUE)?;
        log::info!("Preloader flag saved, it won't show again");
        Ok(())
    }

    /// Forget the flag so the preloader shows on the next load
    pub fn reset(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key)?;
        log::info!("Preloader flag cleared, reload to see it again");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::consts::SEEN_KEY;
    use crate::platform::MemoryStore;

    /// Store whose every operation fails
    pub(crate) struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("test".into()))
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Write {
                key: key.to_string(),
                reason: "quota exceeded".into(),
            })
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            Err(StoreError::Write {
                key: key.to_string(),
                reason: "quota exceeded".into(),
            })
        }
    }

    #[test]
    fn test_unset_by_default() {
        let gate = VisibilityGate::new(Rc::new(MemoryStore::new()), SEEN_KEY);
        assert!(!gate.has_seen());
    }

    #[test]
    fn test_mark_seen_writes_exact_value() {
        let store = MemoryStore::new();
        let gate = VisibilityGate::new(Rc::new(store.clone()), SEEN_KEY);
        gate.mark_seen().unwrap();
        assert!(gate.has_seen());
        assert_eq!(store.get(SEEN_KEY).unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_other_values_count_as_unset() {
        for value in ["false", "TRUE", "1", ""] {
            let gate = VisibilityGate::new(Rc::new(MemoryStore::with_entry(SEEN_KEY, value)), SEEN_KEY);
            assert!(!gate.has_seen(), "{:?} should not count as seen", value);
        }
    }

    #[test]
    fn test_reset_clears_flag() {
        let store = MemoryStore::with_entry(SEEN_KEY, "true");
        let gate = VisibilityGate::new(Rc::new(store.clone()), SEEN_KEY);
        gate.reset().unwrap();
        assert!(!gate.has_seen());
        assert!(store.is_empty());
    }

    #[test]
    fn test_broken_store_reads_as_unset() {
        let gate = VisibilityGate::new(Rc::new(BrokenStore), SEEN_KEY);
        assert!(!gate.has_seen());
        assert!(matches!(gate.mark_seen(), Err(StoreError::Write { .. })));
    }
}

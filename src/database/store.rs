use std::sync::{Arc, Mutex};

use crate::types::{GestureSet, RawSample};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// `save` replaces any previous samples stored under the same name.
pub trait GestureStore: Send {
    fn save(&mut self, name: &str, samples: &[RawSample]) -> Result<(), StoreError>;
    fn load_all(&mut self) -> Result<GestureSet, StoreError>;
    fn remove(&mut self, name: &str) -> Result<(), StoreError>;
}

/// Process-lifetime store. Clones share the same contents.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<GestureSet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut GestureSet) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl GestureStore for MemoryStore {
    fn save(&mut self, name: &str, samples: &[RawSample]) -> Result<(), StoreError> {
        self.with(|set| set.insert(name, samples.to_vec()));
        Ok(())
    }

    fn load_all(&mut self) -> Result<GestureSet, StoreError> {
        Ok(self.with(|set| set.clone()))
    }

    fn remove(&mut self, name: &str) -> Result<(), StoreError> {
        self.with(|set| set.remove(name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_contents() {
        let mut store = MemoryStore::new();
        let mut view = store.clone();
        let s = RawSample::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);

        store.save("click", &[s, s]).unwrap();
        store.save("click", &[s]).unwrap();
        assert_eq!(view.load_all().unwrap().get("click"), Some(&[s][..]));

        view.remove("click").unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }
}

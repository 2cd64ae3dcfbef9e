use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};

use super::store::{GestureStore, StoreError};
use crate::types::{GestureSet, RawSample};

#[derive(Debug, Default, Serialize, Deserialize)]
struct GestureFile {
    saved_at: Option<String>,
    gestures: BTreeMap<String, Vec<RawSample>>,
}

/// Whole gesture library in one pretty-printed JSON document, rewritten on
/// every change.
pub struct JsonGestureStore {
    path: PathBuf,
    auto_create_dir: bool,
}

impl JsonGestureStore {
    pub fn new(path: impl Into<PathBuf>, auto_create_dir: bool) -> Self {
        Self {
            path: path.into(),
            auto_create_dir,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<GestureFile, StoreError> {
        if !self.path.exists() {
            return Ok(GestureFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, mut file: GestureFile) -> Result<(), StoreError> {
        if self.auto_create_dir {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }
        file.saved_at = Some(Utc::now().to_rfc3339());
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }
}

impl GestureStore for JsonGestureStore {
    fn save(&mut self, name: &str, samples: &[RawSample]) -> Result<(), StoreError> {
        let mut file = self.read()?;
        file.gestures.insert(name.to_string(), samples.to_vec());
        self.write(file)?;
        info!("Saved {} samples for gesture '{}' to {}", samples.len(), name, self.path.display());
        Ok(())
    }

    fn load_all(&mut self) -> Result<GestureSet, StoreError> {
        Ok(self.read()?.gestures.into_iter().collect())
    }

    fn remove(&mut self, name: &str) -> Result<(), StoreError> {
        let mut file = self.read()?;
        if file.gestures.remove(name).is_some() {
            self.write(file)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("airmouse-{}-{}-{}", tag, std::process::id(), Utc::now().timestamp_nanos_opt().unwrap_or(0)))
            .join("gestures.json")
    }

    #[test]
    fn missing_file_is_empty_library() {
        let mut store = JsonGestureStore::new(scratch_path("missing"), false);
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn persists_across_instances() {
        let path = scratch_path("persist");
        let s = RawSample::new(0.1, 0.2, 0.3, 0.4, 0.5, 0.6);

        let mut store = JsonGestureStore::new(&path, true);
        store.save("click", &[s, s, s]).unwrap();
        store.save("click", &[s]).unwrap();
        store.save("tap", &[s, s]).unwrap();
        store.remove("tap").unwrap();

        let mut reopened = JsonGestureStore::new(&path, false);
        let set = reopened.load_all().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("click"), Some(&[s][..]));

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = scratch_path("corrupt");
        let dir = path.parent().unwrap().to_path_buf();
        fs::create_dir_all(&dir).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let mut store = JsonGestureStore::new(&path, false);
        assert!(matches!(store.load_all(), Err(StoreError::Json(_))));
        let _ = fs::remove_dir_all(dir);
    }
}

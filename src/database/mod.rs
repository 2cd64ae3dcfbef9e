pub mod json_store;
pub mod manager;
pub mod schema;
pub mod store;

pub use json_store::JsonGestureStore;
pub use manager::DuckDbGestureStore;
pub use store::{GestureStore, MemoryStore, StoreError};

use log::info;

use crate::config::{StorageBackend, StorageConfig};

/// Opens the store selected by `config.backend`.
pub fn open_store(config: &StorageConfig) -> Result<Box<dyn GestureStore>, StoreError> {
    let store: Box<dyn GestureStore> = match config.backend {
        StorageBackend::Duckdb => Box::new(DuckDbGestureStore::open(&config.path, config.auto_create_dir)?),
        StorageBackend::Json => Box::new(JsonGestureStore::new(&config.path, config.auto_create_dir)),
        StorageBackend::Memory => Box::new(MemoryStore::new()),
    };
    info!("Gesture store: {:?} ({})", config.backend, config.path);
    Ok(store)
}

pub mod arff;
pub mod cache;
pub mod prepare;
pub mod source;
pub mod storage;

pub use arff::*;
pub use cache::*;
pub use prepare::*;
pub use source::*;
pub use storage::*;

use std::sync::Arc;

use hp_types::{Dataset, DatasetRef, HpResult};

/// Dataset store coordinates memory cache, disk cache and remote source
#[derive(Debug)]
pub struct DatasetStore {
    pub source: Box<dyn DatasetSource>,
    pub storage: Option<StorageManager>,
    pub cache: CacheManager,
}

impl DatasetStore {
    /// OpenML source with the disk cache in the default location.
    pub fn openml() -> HpResult<Self> {
        let storage = StorageManager::new(StorageManager::default_root())?;
        Ok(Self::new(Box::new(OpenMlSource::new()?)).with_storage(storage))
    }

    pub fn new(source: Box<dyn DatasetSource>) -> Self {
        Self {
            source,
            storage: None,
            cache: CacheManager::new(),
        }
    }

    pub fn with_storage(mut self, storage: StorageManager) -> Self {
        self.storage = Some(storage);
        self
    }

    pub async fn load(&self, reference: &DatasetRef) -> HpResult<Arc<Dataset>> {
        let id = reference.id;

        // Check memory first
        if let Some(dataset) = self.cache.get(id) {
            return Ok(dataset);
        }

        // Try the disk cache
        if let Some(storage) = &self.storage {
            if storage.contains(id) {
                let parsed = storage.load_arff(id).await.and_then(|text| parse_arff(&text));
                match parsed {
                    Ok(dataset) => {
                        let dataset = Arc::new(dataset);
                        self.cache.store(id, Arc::clone(&dataset));
                        return Ok(dataset);
                    }
                    Err(e) => {
                        tracing::warn!("Discarding unreadable cached copy of dataset {}: {}", id, e);
                        storage.remove(id).await?;
                    }
                }
            }
        }

        // Fetch from the source
        let text = self.source.fetch(id).await?;
        let dataset = Arc::new(parse_arff(&text)?);
        tracing::info!(
            "Loaded dataset {} ({}) from {}: {} rows, {} columns",
            id,
            dataset.name,
            self.source.name(),
            dataset.n_rows(),
            dataset.n_columns()
        );

        if let Some(storage) = &self.storage {
            storage.save_arff(id, &text).await?;
        }
        self.cache.store(id, Arc::clone(&dataset));

        Ok(dataset)
    }

    /// Load, binarize and extract features in one step.
    pub async fn load_prepared(&self, reference: &DatasetRef) -> HpResult<PreparedData> {
        let dataset = self.load(reference).await?;
        prepare(&dataset, &reference.label)
    }
}

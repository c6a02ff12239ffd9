use std::path::{Path, PathBuf};

use hp_types::{DataError, HpResult};

/// On-disk cache of raw ARFF downloads, one file per dataset id.
#[derive(Debug, Clone)]
pub struct StorageManager {
    pub data_root: PathBuf,
}

impl StorageManager {
    pub fn new<P: AsRef<Path>>(data_root: P) -> HpResult<Self> {
        let data_root = data_root.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_root)?;

        Ok(Self { data_root })
    }

    /// Default location under the user cache directory.
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hparam-sweep")
            .join("openml")
    }

    fn get_storage_path(&self, id: u32) -> PathBuf {
        self.data_root.join(format!("{id}.arff"))
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get_storage_path(id).is_file()
    }

    /// Write through a temporary file so a crash never leaves a truncated
    /// dataset behind.
    pub async fn save_arff(&self, id: u32, text: &str) -> HpResult<()> {
        let path = self.get_storage_path(id);
        let tmp = path.with_extension("arff.partial");
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!("Cached dataset {} at {}", id, path.display());
        Ok(())
    }

    pub async fn load_arff(&self, id: u32) -> HpResult<String> {
        let path = self.get_storage_path(id);
        if !path.is_file() {
            return Err(DataError::Cache {
                message: format!("no cached copy of dataset {id} at {}", path.display()),
            }
            .into());
        }
        Ok(tokio::fs::read_to_string(&path).await?)
    }

    pub async fn remove(&self, id: u32) -> HpResult<()> {
        let path = self.get_storage_path(id);
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

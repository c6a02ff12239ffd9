//! Output files: one bincode-encoded best configuration per family, plus a
//! JSON report of the whole run.

use std::path::{Path, PathBuf};

use hp_types::{Configuration, HpResult};
use tokio::fs;
use tracing::info;

use crate::orchestrator::FamilyOutcome;

pub const REPORT_FILE: &str = "search_report.json";

/// File name holding the best configuration of `family`.
pub fn best_file_name(family: &str) -> String {
    format!("best_hparams_auc_{family}_LR.bin")
}

/// Write the best configuration of `family` into `dir`, creating the
/// directory if needed. An existing file is overwritten.
pub async fn save_best(dir: &Path, family: &str, config: &Configuration) -> HpResult<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(best_file_name(family));
    let bytes = config.to_bytes()?;
    fs::write(&path, bytes).await?;
    info!("Saved best {} configuration to {}", family, path.display());
    Ok(path)
}

pub async fn load_best(path: &Path) -> HpResult<Configuration> {
    let bytes = fs::read(path).await?;
    Ok(Configuration::from_bytes(&bytes)?)
}

pub async fn write_report(dir: &Path, outcomes: &[FamilyOutcome]) -> HpResult<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(REPORT_FILE);
    let json = serde_json::to_vec_pretty(outcomes)?;
    fs::write(&path, json).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enet() -> Configuration {
        Configuration::new()
            .with("penalty", "elasticnet")
            .with("solver", "saga")
            .with("C", 312.25)
            .with("l1_ratio", 0.125)
    }

    #[test]
    fn file_name_per_family() {
        assert_eq!(best_file_name("l1"), "best_hparams_auc_l1_LR.bin");
        assert_eq!(best_file_name("none"), "best_hparams_auc_none_LR.bin");
    }

    #[tokio::test]
    async fn saved_configuration_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("best_default_models");

        let path = save_best(&out, "elasticnet", &enet()).await.unwrap();
        assert_eq!(path, out.join("best_hparams_auc_elasticnet_LR.bin"));
        assert_eq!(load_best(&path).await.unwrap(), enet());
    }

    #[tokio::test]
    async fn save_overwrites_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let first = Configuration::new().with("penalty", "l2").with("C", 1.0);
        let second = Configuration::new().with("penalty", "l2").with("C", 2.0);

        save_best(dir.path(), "l2", &first).await.unwrap();
        let path = save_best(dir.path(), "l2", &second).await.unwrap();
        assert_eq!(load_best(&path).await.unwrap(), second);
    }

    #[tokio::test]
    async fn garbage_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(best_file_name("l1"));
        fs::write(&path, [0xff_u8; 3]).await.unwrap();
        assert!(load_best(&path).await.is_err());
    }

    #[tokio::test]
    async fn empty_report_is_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(dir.path(), &[]).await.unwrap();
        let text = fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!([]));
    }
}

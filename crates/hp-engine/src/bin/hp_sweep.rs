use anyhow::Context;
use hp_data::DatasetStore;
use hp_engine::{DatasetEvaluator, SearchConfig, SearchOrchestrator};
use hp_optimizer::logistic_regression_families;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = SearchConfig::default();
    config.validate()?;

    let mut rng = match config.sampling_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let families = logistic_regression_families(&mut rng);

    let store = DatasetStore::openml().context("failed to set up the OpenML dataset store")?;
    let evaluator = DatasetEvaluator::new(
        store,
        config.datasets.clone(),
        config.evaluation.clone(),
    );

    let output_dir = config.output_dir.clone();
    let mut orchestrator = SearchOrchestrator::new(config, families, Box::new(evaluator));
    let outcomes = orchestrator.run().await?;

    info!(
        "Finished {} families, results in {}",
        outcomes.len(),
        output_dir.display()
    );
    Ok(())
}

use anyhow::Context;
use chrono::Utc;
use harvester::{HarvestSettings, Harvester, HistoryStore, RunReport};
use reddit_client::RedditClient;
use snoofeed_core::{CoreError, ErrorReporter, HarvestConfig};
use std::path::{Path, PathBuf};
use storage::FileStateStore;
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "SNOOFEED_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";
const DEFAULT_LOG_FILTER: &str = "snoofeed=info,harvester=info,reddit_client=info,storage=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config_path();
    tracing::info!("Starting snoofeed with {}", config_path.display());

    match harvest(&config_path).await {
        Ok(report) => {
            tracing::info!(
                outcome = ?report.outcome,
                cursor = ?report.cursor,
                requests = report.requests,
                admitted = report.admitted,
                history_len = report.history_len,
                "Run finished"
            );
            Ok(())
        }
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            Err(e).with_context(|| format!("harvest run with {} failed", config_path.display()))
        }
    }
}

/// First CLI argument, then the environment, then `config.toml`.
fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

async fn harvest(config_path: &Path) -> Result<RunReport, CoreError> {
    let config = HarvestConfig::load(config_path)?;
    let settings = HarvestSettings::from_config(&config)?;
    let source = RedditClient::from_config(&config)?;
    let history = HistoryStore::new(
        FileStateStore::new(&config.storage_path),
        &config.rss_file_path,
        config.max_rss_items,
    );

    Harvester::new(source, history, settings)
        .run(Utc::now())
        .await
}

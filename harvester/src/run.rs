use crate::filter::{AdmissionFilter, Blacklist, GroupThresholds, PopularityTable};
use crate::history::HistoryStore;
use crate::walker::{CursorWalker, RunContext, WalkOutcome, WalkSettings};
use chrono::{DateTime, Utc};
use snoofeed_core::{ConfigError, CoreError, HarvestConfig, IngestError, PostSource};
use storage::StateStore;
use tracing::{error, info};

/// Page size used for the subscription listing.
pub const SUBSCRIPTION_PAGE_SIZE: u32 = 100;

const SECONDS_PER_HOUR: i64 = 3600;

/// Everything a run needs from the configuration, validated once.
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    /// Width of the maturity window in seconds.
    pub window_secs: i64,
    pub walk: WalkSettings,
    pub popularity: PopularityTable,
    pub blacklist: Blacklist,
    pub allow_list: Vec<String>,
}

impl HarvestSettings {
    pub fn from_config(config: &HarvestConfig) -> Result<Self, ConfigError> {
        let window_secs = i64::try_from(config.max_hours_ago)
            .ok()
            .and_then(|hours| hours.checked_mul(SECONDS_PER_HOUR))
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "max_hours_ago".to_string(),
                value: config.max_hours_ago.to_string(),
            })?;

        Ok(Self {
            window_secs,
            walk: WalkSettings {
                page_size: config.page_size,
                max_requests: config.max_requests,
            },
            popularity: PopularityTable::from_config(config)?,
            blacklist: Blacklist::new(&config.blacklist_strings)?,
            allow_list: config.ignore_allow_list.clone(),
        })
    }

    /// Items created after this instant are too fresh to judge.
    pub fn boundary(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().saturating_sub(self.window_secs)
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: WalkOutcome,
    pub cursor: Option<String>,
    pub requests: u32,
    pub inspected: usize,
    pub admitted: usize,
    pub recoveries: usize,
    pub history_len: usize,
}

pub struct Harvester<S, St> {
    source: S,
    history: HistoryStore<St>,
    settings: HarvestSettings,
}

impl<S: PostSource, St: StateStore> Harvester<S, St> {
    pub fn new(source: S, history: HistoryStore<St>, settings: HarvestSettings) -> Self {
        Self {
            source,
            history,
            settings,
        }
    }

    pub fn history(&self) -> &HistoryStore<St> {
        &self.history
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// One complete run: load state, walk to the boundary, merge, persist and
    /// render.
    ///
    /// Upstream failures and an exceeded request ceiling leave persisted
    /// state untouched. Exhausted empty-page recovery still merges the batch
    /// under the run's starting cursor before the failure is returned.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport, CoreError> {
        let state = self.history.load().await?;
        let subscriptions = self
            .source
            .list_subscriptions(SUBSCRIPTION_PAGE_SIZE)
            .await?;

        let thresholds = GroupThresholds::build(&self.settings.popularity, &subscriptions);
        let filter = AdmissionFilter::new(
            thresholds,
            self.settings.blacklist.clone(),
            &self.settings.allow_list,
        );

        let mut ctx = RunContext::new(state.cursor, self.settings.boundary(now));
        info!(
            cursor = ?ctx.cursor,
            boundary = ctx.boundary,
            history_len = state.posts.len(),
            groups = subscriptions.len(),
            "Starting run"
        );

        let walker = CursorWalker::new(&self.source, &filter, self.settings.walk);
        let outcome = walker.walk(&mut ctx, &state.posts).await?;

        match outcome {
            WalkOutcome::RequestCeilingExceeded => Err(IngestError::RequestCeilingExceeded {
                max_requests: self.settings.walk.max_requests,
                cursor: ctx.cursor,
                batch_size: ctx.batch.len(),
            }
            .into()),
            WalkOutcome::RecoveryExhausted => {
                let failure = IngestError::RecoveryExhausted {
                    cursor: ctx.cursor.clone(),
                    attempts: ctx.recoveries,
                    batch_size: ctx.batch.len(),
                };
                self.history
                    .commit(state.posts, ctx.batch, ctx.start_cursor, now)
                    .await?;
                error!(
                    requests = ctx.requests,
                    boundary = ctx.boundary,
                    "Batch merged under the starting cursor after failed recovery"
                );
                Err(failure.into())
            }
            WalkOutcome::BoundaryReached | WalkOutcome::UpstreamExhausted => {
                let admitted = ctx.batch.len();
                let persisted = self
                    .history
                    .commit(state.posts, ctx.batch, ctx.cursor, now)
                    .await?;
                info!(
                    cursor = ?persisted.cursor,
                    requests = ctx.requests,
                    batch_size = admitted,
                    "Successfully updated"
                );

                Ok(RunReport {
                    outcome,
                    cursor: persisted.cursor,
                    requests: ctx.requests,
                    inspected: ctx.inspected,
                    admitted,
                    recoveries: ctx.recoveries,
                    history_len: persisted.posts.len(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CONFIG: &str = r#"
max_hours_ago = 6
max_rss_items = 50
max_requests = 5
page_size = 25
blacklist_strings = ["[sponsor]"]

[reddit]
client_id = "abc"
username = "harvester"

[min_score]
"1000" = 5

[min_comments]
"1000" = 3
"#;

    #[test]
    fn test_settings_from_config() {
        let config = HarvestConfig::from_toml_str(CONFIG).unwrap();
        let settings = HarvestSettings::from_config(&config).unwrap();

        assert_eq!(settings.window_secs, 6 * 3600);
        assert_eq!(settings.walk.page_size, 25);
        assert_eq!(settings.walk.max_requests, 5);
        assert!(settings.blacklist.matches("A [SPONSOR] post"));
        assert_eq!(settings.popularity.smallest().min_score, 5);
    }

    #[test]
    fn test_boundary_is_now_minus_window() {
        let config = HarvestConfig::from_toml_str(CONFIG).unwrap();
        let settings = HarvestSettings::from_config(&config).unwrap();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(settings.boundary(now), 1_700_000_000 - 6 * 3600);
    }

    #[test]
    fn test_oversized_window_rejected() {
        let mut config = HarvestConfig::from_toml_str(CONFIG).unwrap();
        config.max_hours_ago = u64::MAX;
        assert!(matches!(
            HarvestSettings::from_config(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}

//! Incremental ingestion: walk the upstream listing to the maturity boundary,
//! admit popular posts, merge them into the bounded history and re-render the
//! feed.

pub mod filter;
pub mod history;
pub mod run;
pub mod walker;

pub use filter::{AdmissionFilter, Blacklist, Decision, GroupThresholds, PopularityTable, Thresholds};
pub use history::{merge_history, HistoryStore};
pub use run::{HarvestSettings, Harvester, RunReport, SUBSCRIPTION_PAGE_SIZE};
pub use walker::{CursorWalker, RunContext, WalkOutcome, WalkSettings};

//! Admission decisions: popularity thresholds per community plus the title
//! blacklist.

use regex::{Regex, RegexBuilder};
use snoofeed_core::{ConfigError, HarvestConfig, Item, Subscription};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Self-post bodies Reddit substitutes for moderated or deleted content.
pub const REMOVED_SENTINELS: &[&str] = &["[removed]", "[deleted]"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub min_score: i64,
    pub min_comments: u64,
}

/// Subscriber-count breakpoints, each owning a pair of thresholds.
#[derive(Debug, Clone)]
pub struct PopularityTable {
    buckets: BTreeMap<u64, Thresholds>,
}

impl PopularityTable {
    pub fn new(buckets: BTreeMap<u64, Thresholds>) -> Result<Self, ConfigError> {
        if buckets.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one popularity breakpoint is required".to_string(),
            });
        }
        Ok(Self { buckets })
    }

    pub fn from_config(config: &HarvestConfig) -> Result<Self, ConfigError> {
        let buckets = config
            .breakpoints()?
            .into_iter()
            .map(|(breakpoint, (min_score, min_comments))| {
                (
                    breakpoint,
                    Thresholds {
                        min_score,
                        min_comments,
                    },
                )
            })
            .collect();
        Self::new(buckets)
    }

    /// Thresholds of the lowest breakpoint.
    pub fn smallest(&self) -> Thresholds {
        self.buckets
            .values()
            .next()
            .copied()
            .unwrap_or(Thresholds {
                min_score: 0,
                min_comments: 0,
            })
    }

    /// The smallest breakpoint at or above `subscribers` wins; counts beyond
    /// every breakpoint fall back to the smallest bucket.
    pub fn bucket_for(&self, subscribers: u64) -> Thresholds {
        self.buckets
            .range(subscribers..)
            .next()
            .map(|(_, thresholds)| *thresholds)
            .unwrap_or_else(|| self.smallest())
    }
}

/// Community name to thresholds, computed once per run from the
/// subscription list.
#[derive(Debug, Clone)]
pub struct GroupThresholds {
    by_group: HashMap<String, Thresholds>,
    fallback: Thresholds,
}

impl GroupThresholds {
    pub fn build(table: &PopularityTable, subscriptions: &[Subscription]) -> Self {
        let by_group = subscriptions
            .iter()
            .map(|s| (s.subreddit.to_lowercase(), table.bucket_for(s.subscribers)))
            .collect();

        Self {
            by_group,
            fallback: table.smallest(),
        }
    }

    pub fn for_group(&self, group: &str) -> Thresholds {
        self.by_group
            .get(&group.to_lowercase())
            .copied()
            .unwrap_or(self.fallback)
    }

    pub fn len(&self) -> usize {
        self.by_group.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_group.is_empty()
    }
}

/// Case-insensitive substring match over titles.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    pattern: Option<Regex>,
}

impl Blacklist {
    pub fn new(strings: &[String]) -> Result<Self, ConfigError> {
        let alternatives: Vec<String> = strings
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| regex::escape(s))
            .collect();
        if alternatives.is_empty() {
            return Ok(Self::default());
        }

        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "blacklist_strings".to_string(),
                value: e.to_string(),
            })?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn matches(&self, title: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(title))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted,
    Blacklisted,
    Removed,
    BelowThreshold,
}

impl Decision {
    pub fn is_admitted(self) -> bool {
        self == Decision::Admitted
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionFilter {
    thresholds: GroupThresholds,
    blacklist: Blacklist,
    allow_list: HashSet<String>,
}

impl AdmissionFilter {
    pub fn new(thresholds: GroupThresholds, blacklist: Blacklist, allow_list: &[String]) -> Self {
        Self {
            thresholds,
            blacklist,
            allow_list: allow_list.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Pure function of the item and the filter's configuration.
    pub fn evaluate(&self, item: &Item) -> Decision {
        if self.blacklist.matches(&item.title) {
            return Decision::Blacklisted;
        }
        if is_removed(item) {
            return Decision::Removed;
        }

        let thresholds = self.thresholds.for_group(&item.subreddit);
        let popular = self.allow_list.contains(&item.subreddit.to_lowercase())
            || item.score >= thresholds.min_score
            || item.num_comments >= thresholds.min_comments;

        if item.score > 0 && popular {
            Decision::Admitted
        } else {
            Decision::BelowThreshold
        }
    }
}

fn is_removed(item: &Item) -> bool {
    item.is_self
        && item
            .selftext
            .as_deref()
            .is_some_and(|body| REMOVED_SENTINELS.contains(&body.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use snoofeed_core::test_support::item;

    fn table() -> PopularityTable {
        PopularityTable::new(BTreeMap::from([
            (
                10_000,
                Thresholds {
                    min_score: 10,
                    min_comments: 5,
                },
            ),
            (
                1_000_000,
                Thresholds {
                    min_score: 100,
                    min_comments: 50,
                },
            ),
        ]))
        .unwrap()
    }

    fn filter(blacklist: &[&str], allow: &[&str]) -> AdmissionFilter {
        let subscriptions = vec![
            Subscription {
                subreddit: "Small".to_string(),
                subscribers: 500,
            },
            Subscription {
                subreddit: "big".to_string(),
                subscribers: 900_000,
            },
        ];
        let blacklist: Vec<String> = blacklist.iter().map(|s| s.to_string()).collect();
        let allow: Vec<String> = allow.iter().map(|s| s.to_string()).collect();
        AdmissionFilter::new(
            GroupThresholds::build(&table(), &subscriptions),
            Blacklist::new(&blacklist).unwrap(),
            &allow,
        )
    }

    #[test]
    fn test_bucket_selection() {
        let table = table();
        assert_eq!(table.bucket_for(0).min_score, 10);
        assert_eq!(table.bucket_for(10_000).min_score, 10);
        assert_eq!(table.bucket_for(10_001).min_score, 100);
        assert_eq!(table.bucket_for(1_000_000).min_score, 100);
        // Beyond the largest breakpoint
        assert_eq!(table.bucket_for(5_000_000).min_score, 10);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(PopularityTable::new(BTreeMap::new()).is_err());
    }

    #[test]
    fn test_group_lookup_is_case_insensitive() {
        let thresholds = GroupThresholds::build(
            &table(),
            &[Subscription {
                subreddit: "Big".to_string(),
                subscribers: 900_000,
            }],
        );
        assert_eq!(thresholds.for_group("BIG").min_score, 100);
        // Unknown groups use the lowest breakpoint
        assert_eq!(thresholds.for_group("unknown").min_score, 10);
    }

    #[test]
    fn test_below_threshold_rejected() {
        let filter = filter(&[], &[]);
        let mut post = item("t3_a", 100, "big");
        post.score = 5;
        post.num_comments = 0;
        assert_eq!(filter.evaluate(&post), Decision::BelowThreshold);

        post.subreddit = "small".to_string();
        post.score = 5;
        assert_eq!(filter.evaluate(&post), Decision::BelowThreshold);
        post.score = 10;
        assert_eq!(filter.evaluate(&post), Decision::Admitted);
    }

    #[test]
    fn test_comments_alone_admit() {
        let filter = filter(&[], &[]);
        let mut post = item("t3_a", 100, "big");
        post.score = 1;
        post.num_comments = 50;
        assert_eq!(filter.evaluate(&post), Decision::Admitted);
    }

    #[test]
    fn test_non_positive_score_never_admitted() {
        let filter = filter(&[], &["big"]);
        let mut post = item("t3_a", 100, "big");
        post.score = 0;
        post.num_comments = 10_000;
        assert_eq!(filter.evaluate(&post), Decision::BelowThreshold);
    }

    #[test]
    fn test_allow_list_skips_thresholds() {
        let filter = filter(&[], &["Big"]);
        let mut post = item("t3_a", 100, "big");
        post.score = 1;
        post.num_comments = 0;
        assert_eq!(filter.evaluate(&post), Decision::Admitted);
    }

    #[test]
    fn test_blacklist_overrides_score() {
        let filter = filter(&["[sponsor]"], &["big"]);
        let mut post = item("t3_a", 100, "big");
        post.title = "Breaking: [Sponsor] deal".to_string();
        post.score = 500;
        post.num_comments = 500;
        assert_eq!(filter.evaluate(&post), Decision::Blacklisted);
    }

    #[test]
    fn test_blacklist_escapes_metacharacters() {
        let blacklist = Blacklist::new(&["a.b".to_string(), String::new()]).unwrap();
        assert!(blacklist.matches("xx A.B yy"));
        assert!(!blacklist.matches("axb"));
        assert!(!Blacklist::default().matches("anything"));
    }

    #[test]
    fn test_removed_self_post_rejected() {
        let filter = filter(&[], &[]);
        let mut post = item("t3_a", 100, "small");
        post.is_self = true;
        post.score = 1_000;
        post.selftext = Some("[removed]".to_string());
        assert_eq!(filter.evaluate(&post), Decision::Removed);

        post.selftext = Some("still here".to_string());
        assert_eq!(filter.evaluate(&post), Decision::Admitted);
    }

    #[test]
    fn test_evaluate_is_pure() {
        let filter = filter(&["spam"], &[]);
        let post = item("t3_a", 100, "small");
        let first = filter.evaluate(&post);
        for _ in 0..10 {
            assert_eq!(filter.evaluate(&post), first);
        }
    }
}

//! The pagination state machine.
//!
//! Pages are requested strictly one after another with `before = cursor`.
//! Each page arrives newest first and is consumed from its oldest entry, so the
//! cursor only ever moves onto items that were actually inspected. The walk
//! stops at the first item newer than the run's boundary.
//!
//! The boundary is a maturity cutoff: items created after `now - max_hours_ago`
//! are still collecting votes and are left for a later run, items at or before
//! it are harvested.
//!
//! A run without a cursor whose first item is already past the boundary seeds
//! the cursor with that item, so a fresh install starts from the newest page
//! instead of re-reading it forever. Older posts are not backfilled.

use crate::filter::AdmissionFilter;
use snoofeed_core::{CoreError, Item, PostSource};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct WalkSettings {
    pub page_size: u32,
    pub max_requests: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    BoundaryReached,
    UpstreamExhausted,
    RecoveryExhausted,
    RequestCeilingExceeded,
}

impl WalkOutcome {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            WalkOutcome::BoundaryReached | WalkOutcome::UpstreamExhausted
        )
    }
}

/// Mutable state of one run. Owned by the run and threaded through the walk.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Cursor as loaded from persisted state.
    pub start_cursor: Option<String>,
    pub cursor: Option<String>,
    /// Unix seconds; items created after this are left for a later run.
    pub boundary: i64,
    pub batch: Vec<Item>,
    pub requests: u32,
    /// Consecutive empty pages since the last non-empty one.
    pub empty_pages: usize,
    pub recoveries: usize,
    pub inspected: usize,
    pub rejected: usize,
}

impl RunContext {
    pub fn new(cursor: Option<String>, boundary: i64) -> Self {
        Self {
            start_cursor: cursor.clone(),
            cursor,
            boundary,
            batch: Vec::new(),
            requests: 0,
            empty_pages: 0,
            recoveries: 0,
            inspected: 0,
            rejected: 0,
        }
    }
}

pub struct CursorWalker<'a, S> {
    source: &'a S,
    filter: &'a AdmissionFilter,
    settings: WalkSettings,
}

impl<'a, S: PostSource> CursorWalker<'a, S> {
    pub fn new(source: &'a S, filter: &'a AdmissionFilter, settings: WalkSettings) -> Self {
        Self {
            source,
            filter,
            settings,
        }
    }

    /// Walk until a terminal state. Upstream failures propagate as errors;
    /// every other way the walk can end is reported as a [`WalkOutcome`].
    ///
    /// `history` is the persisted history, ascending by creation time, used
    /// as the pool of rewind targets for empty pages.
    pub async fn walk(
        &self,
        ctx: &mut RunContext,
        history: &[Item],
    ) -> Result<WalkOutcome, CoreError> {
        loop {
            ctx.requests += 1;
            if ctx.requests > self.settings.max_requests {
                warn!(
                    cursor = ?ctx.cursor,
                    batch_size = ctx.batch.len(),
                    requests = ctx.requests - 1,
                    boundary = ctx.boundary,
                    "Request ceiling reached"
                );
                return Ok(WalkOutcome::RequestCeilingExceeded);
            }

            let page = self
                .source
                .list_new(ctx.cursor.as_deref(), self.settings.page_size)
                .await?;

            if page.items.is_empty() {
                ctx.empty_pages += 1;
                match history.get(ctx.empty_pages) {
                    Some(target) => {
                        warn!(
                            cursor = ?ctx.cursor,
                            rewind_to = %target.id,
                            requests = ctx.requests,
                            "Empty page, rewinding cursor"
                        );
                        ctx.cursor = Some(target.id.clone());
                        ctx.recoveries += 1;
                        continue;
                    }
                    None => {
                        error!(
                            cursor = ?ctx.cursor,
                            batch_size = ctx.batch.len(),
                            requests = ctx.requests,
                            boundary = ctx.boundary,
                            history_len = history.len(),
                            "Empty page and no rewind target left"
                        );
                        return Ok(WalkOutcome::RecoveryExhausted);
                    }
                }
            }

            ctx.empty_pages = 0;
            let is_last = page.is_last;
            debug!(
                cursor = ?ctx.cursor,
                page_len = page.items.len(),
                requests = ctx.requests,
                "Processing page"
            );

            for item in page.items.into_iter().rev() {
                if item.created_utc > ctx.boundary {
                    if ctx.cursor.is_none() {
                        info!(
                            seed = %item.id,
                            boundary = ctx.boundary,
                            "No cursor yet, seeding from the oldest listed item"
                        );
                        ctx.cursor = Some(item.id);
                    }
                    info!(
                        cursor = ?ctx.cursor,
                        batch_size = ctx.batch.len(),
                        requests = ctx.requests,
                        boundary = ctx.boundary,
                        "Boundary reached"
                    );
                    return Ok(WalkOutcome::BoundaryReached);
                }

                ctx.inspected += 1;
                ctx.cursor = Some(item.id.clone());
                if self.filter.evaluate(&item).is_admitted() {
                    ctx.batch.push(item);
                } else {
                    ctx.rejected += 1;
                }
            }

            if is_last {
                info!(
                    cursor = ?ctx.cursor,
                    batch_size = ctx.batch.len(),
                    requests = ctx.requests,
                    "Upstream exhausted"
                );
                return Ok(WalkOutcome::UpstreamExhausted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Blacklist, GroupThresholds, PopularityTable, Thresholds};
    use snoofeed_core::test_support::{item, page, ScriptedSource};
    use snoofeed_core::Page;
    use std::collections::BTreeMap;

    fn open_filter() -> AdmissionFilter {
        let table = PopularityTable::new(BTreeMap::from([(
            1_000,
            Thresholds {
                min_score: 1,
                min_comments: 0,
            },
        )]))
        .unwrap();
        AdmissionFilter::new(
            GroupThresholds::build(&table, &[]),
            Blacklist::default(),
            &[],
        )
    }

    fn settings(max_requests: u32) -> WalkSettings {
        WalkSettings {
            page_size: 100,
            max_requests,
        }
    }

    #[tokio::test]
    async fn test_stops_at_first_item_past_boundary() {
        let source = ScriptedSource::new(vec![page(
            &[("t3_a", 10), ("t3_b", 20), ("t3_c", 30), ("t3_d", 40)],
            false,
        )]);
        let filter = open_filter();
        let mut ctx = RunContext::new(Some("t3_start".to_string()), 25);

        let outcome = CursorWalker::new(&source, &filter, settings(10))
            .walk(&mut ctx, &[])
            .await
            .unwrap();

        assert_eq!(outcome, WalkOutcome::BoundaryReached);
        let ids: Vec<_> = ctx.batch.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["t3_a", "t3_b"]);
        assert_eq!(ctx.cursor.as_deref(), Some("t3_b"));
        assert_eq!(ctx.inspected, 2);
        assert_eq!(source.requested(), vec![Some("t3_start".to_string())]);
    }

    #[tokio::test]
    async fn test_item_at_boundary_is_inside_window() {
        let source = ScriptedSource::new(vec![page(&[("t3_a", 25), ("t3_b", 26)], false)]);
        let filter = open_filter();
        let mut ctx = RunContext::new(None, 25);

        CursorWalker::new(&source, &filter, settings(10))
            .walk(&mut ctx, &[])
            .await
            .unwrap();

        assert_eq!(ctx.batch.len(), 1);
        assert_eq!(ctx.cursor.as_deref(), Some("t3_a"));
    }

    #[tokio::test]
    async fn test_fresh_state_seeds_cursor_and_advances() {
        let source = ScriptedSource::new(vec![
            page(&[("t3_a", 100), ("t3_b", 110), ("t3_c", 120)], false),
            page(&[("t3_b", 110), ("t3_c", 120)], false),
            page(&[("t3_c", 120)], true),
        ]);
        let filter = open_filter();
        let walker = CursorWalker::new(&source, &filter, settings(10));

        // Everything listed is still maturing
        let mut first = RunContext::new(None, 50);
        let outcome = walker.walk(&mut first, &[]).await.unwrap();
        assert_eq!(outcome, WalkOutcome::BoundaryReached);
        assert!(first.batch.is_empty());
        assert_eq!(first.inspected, 0);
        assert_eq!(first.cursor.as_deref(), Some("t3_a"));

        let mut second = RunContext::new(first.cursor.clone(), 115);
        walker.walk(&mut second, &[]).await.unwrap();
        assert_eq!(second.cursor.as_deref(), Some("t3_b"));
        assert_eq!(second.batch.len(), 1);

        let mut third = RunContext::new(second.cursor.clone(), 200);
        let outcome = walker.walk(&mut third, &[]).await.unwrap();
        assert_eq!(outcome, WalkOutcome::UpstreamExhausted);
        assert_eq!(third.cursor.as_deref(), Some("t3_c"));

        assert_eq!(
            source.requested(),
            vec![None, Some("t3_a".to_string()), Some("t3_b".to_string())]
        );
    }

    #[tokio::test]
    async fn test_existing_cursor_is_not_reseeded() {
        let source = ScriptedSource::new(vec![page(&[("t3_a", 100)], false)]);
        let filter = open_filter();
        let mut ctx = RunContext::new(Some("t3_start".to_string()), 50);

        CursorWalker::new(&source, &filter, settings(10))
            .walk(&mut ctx, &[])
            .await
            .unwrap();

        assert_eq!(ctx.cursor.as_deref(), Some("t3_start"));
    }

    #[tokio::test]
    async fn test_rejected_items_still_advance_cursor() {
        let mut first = page(&[("t3_a", 10), ("t3_b", 20)], false);
        // Newest first, so index 0 is t3_b
        first.items[0].score = 0;
        let source = ScriptedSource::new(vec![first, page(&[("t3_c", 99)], false)]);
        let filter = open_filter();
        let mut ctx = RunContext::new(None, 50);

        let outcome = CursorWalker::new(&source, &filter, settings(10))
            .walk(&mut ctx, &[])
            .await
            .unwrap();

        assert_eq!(outcome, WalkOutcome::BoundaryReached);
        assert_eq!(ctx.batch.len(), 1);
        assert_eq!(ctx.rejected, 1);
        assert_eq!(ctx.cursor.as_deref(), Some("t3_b"));
        assert_eq!(source.requested(), vec![None, Some("t3_b".to_string())]);
    }

    #[tokio::test]
    async fn test_last_page_exhausts_upstream() {
        let source = ScriptedSource::new(vec![page(&[("t3_a", 10)], true)]);
        let filter = open_filter();
        let mut ctx = RunContext::new(None, 50);

        let outcome = CursorWalker::new(&source, &filter, settings(10))
            .walk(&mut ctx, &[])
            .await
            .unwrap();

        assert_eq!(outcome, WalkOutcome::UpstreamExhausted);
        assert!(outcome.is_success());
        assert_eq!(ctx.requests, 1);
    }

    #[tokio::test]
    async fn test_empty_page_rewinds_into_history() {
        let history = vec![
            item("t3_h0", 1, "rust"),
            item("t3_h1", 2, "rust"),
            item("t3_h2", 3, "rust"),
        ];
        let source = ScriptedSource::new(vec![
            Page::default(),
            page(&[("t3_a", 10), ("t3_b", 99)], false),
        ]);
        let filter = open_filter();
        let mut ctx = RunContext::new(Some("t3_gone".to_string()), 50);

        let outcome = CursorWalker::new(&source, &filter, settings(10))
            .walk(&mut ctx, &history)
            .await
            .unwrap();

        assert_eq!(outcome, WalkOutcome::BoundaryReached);
        assert_eq!(ctx.recoveries, 1);
        assert_eq!(
            source.requested(),
            vec![Some("t3_gone".to_string()), Some("t3_h1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_recovery_bounded_by_history() {
        let history: Vec<_> = (0..4)
            .map(|n| item(&format!("t3_h{}", n), n, "rust"))
            .collect();
        let source = ScriptedSource::new(Vec::new());
        let filter = open_filter();
        let mut ctx = RunContext::new(Some("t3_x".to_string()), 50);

        let outcome = CursorWalker::new(&source, &filter, settings(100))
            .walk(&mut ctx, &history)
            .await
            .unwrap();

        assert_eq!(outcome, WalkOutcome::RecoveryExhausted);
        assert_eq!(ctx.recoveries, history.len() - 1);
        assert_eq!(ctx.cursor.as_deref(), Some("t3_h3"));
    }

    #[tokio::test]
    async fn test_empty_counter_resets_after_progress() {
        let history = vec![item("t3_h0", 1, "rust"), item("t3_h1", 2, "rust")];
        let source = ScriptedSource::new(vec![
            Page::default(),
            page(&[("t3_a", 10)], false),
            Page::default(),
            page(&[("t3_b", 99)], false),
        ]);
        let filter = open_filter();
        let mut ctx = RunContext::new(None, 50);

        let outcome = CursorWalker::new(&source, &filter, settings(10))
            .walk(&mut ctx, &history)
            .await
            .unwrap();

        assert_eq!(outcome, WalkOutcome::BoundaryReached);
        assert_eq!(ctx.recoveries, 2);
        let requested = source.requested();
        assert_eq!(requested[1], Some("t3_h1".to_string()));
        assert_eq!(requested[3], Some("t3_h1".to_string()));
    }

    #[tokio::test]
    async fn test_request_ceiling() {
        let source = ScriptedSource::new(vec![
            page(&[("t3_a", 10)], false),
            page(&[("t3_b", 11)], false),
            page(&[("t3_c", 12)], false),
        ]);
        let filter = open_filter();
        let mut ctx = RunContext::new(None, 50);

        let outcome = CursorWalker::new(&source, &filter, settings(2))
            .walk(&mut ctx, &[])
            .await
            .unwrap();

        assert_eq!(outcome, WalkOutcome::RequestCeilingExceeded);
        assert!(!outcome.is_success());
        assert_eq!(source.requested().len(), 2);
        assert_eq!(ctx.cursor.as_deref(), Some("t3_b"));
    }
}

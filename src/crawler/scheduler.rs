//! Round-robin driver for multi-city crawls
//!
//! One round fetches one page for every still-active target. All targets
//! share a single session and a single paced client, so pages and listings
//! are fetched strictly one after another.
//!
//! # Per-page protocol
//!
//! 1. Search the target's next page
//! 2. Empty page: retire the target, write nothing
//! 3. Otherwise fetch every listing on it, polling the stop signal before each
//! 4. Write `page_<n>.json` only after every listing was handled
//! 5. Advance the target to page n + 1

use crate::crawler::fetcher::{ListingFetcher, ListingOutcome};
use crate::crawler::StopSignal;
use crate::state::CrawlTarget;
use crate::storage::CorpusStore;
use crate::Result;
use std::sync::Arc;

/// How a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// Every target ran out of pages
    Completed,
    /// The stop signal was observed before that
    Stopped,
}

/// Summary of one scheduler run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,
    pub rounds: u32,
    pub pages_written: u32,
    pub listings_saved: u32,
    pub listings_already_stored: u32,
    pub listings_removed: u32,
    /// Final state of every target the run started with
    pub targets: Vec<CrawlTarget>,
}

impl CrawlReport {
    fn new() -> Self {
        Self {
            outcome: CrawlOutcome::Completed,
            rounds: 0,
            pages_written: 0,
            listings_saved: 0,
            listings_already_stored: 0,
            listings_removed: 0,
            targets: Vec::new(),
        }
    }

    fn record(&mut self, outcome: ListingOutcome) {
        match outcome {
            ListingOutcome::Saved => self.listings_saved += 1,
            ListingOutcome::AlreadyStored => self.listings_already_stored += 1,
            ListingOutcome::Removed => self.listings_removed += 1,
        }
    }
}

enum PageStep {
    Advanced,
    Retired,
    Stopped,
}

/// Drives every target page by page until all retire or a stop is seen
pub struct CrawlScheduler {
    fetcher: ListingFetcher,
    corpus: CorpusStore,
    stop: Arc<dyn StopSignal>,
    page_size: u32,
}

impl CrawlScheduler {
    pub fn new(
        fetcher: ListingFetcher,
        corpus: CorpusStore,
        stop: Arc<dyn StopSignal>,
        page_size: u32,
    ) -> Self {
        Self {
            fetcher,
            corpus,
            stop,
            page_size,
        }
    }

    /// Runs the crawl to completion or until stopped
    ///
    /// Any error is fatal to the whole run. Pages and listings written
    /// before it stay on disk as the checkpoint for the next run.
    pub async fn run(&self, targets: Vec<CrawlTarget>) -> Result<CrawlReport> {
        let mut report = CrawlReport::new();
        let mut targets = targets;

        for target in &targets {
            self.corpus.city(target.city_slug()).ensure_dirs()?;
            tracing::info!(
                "{}: starting at page {}",
                target.city_slug(),
                target.next_page()
            );
        }

        while targets.iter().any(CrawlTarget::is_active) {
            if self.stop.is_set() {
                tracing::info!("Stop requested, ending crawl before round {}", report.rounds + 1);
                abort_active(&mut targets)?;
                report.outcome = CrawlOutcome::Stopped;
                report.targets = targets;
                return Ok(report);
            }

            report.rounds += 1;

            let mut stopped = false;
            for target in targets.iter_mut().filter(|t| t.is_active()) {
                match self.crawl_page(target, &mut report).await {
                    Ok(PageStep::Advanced) | Ok(PageStep::Retired) => {}
                    Ok(PageStep::Stopped) => {
                        stopped = true;
                        break;
                    }
                    Err(e) => {
                        if e.is_session_failure() {
                            tracing::error!("Session lost, aborting every city: {}", e);
                        } else {
                            tracing::error!("{}: crawl aborted: {}", target.city_slug(), e);
                        }
                        return Err(e);
                    }
                }
            }

            if stopped {
                abort_active(&mut targets)?;
                report.outcome = CrawlOutcome::Stopped;
                report.targets = targets;
                return Ok(report);
            }
        }

        tracing::info!(
            "All cities retired after {} rounds: {} pages, {} new listings",
            report.rounds,
            report.pages_written,
            report.listings_saved
        );
        if let Err(e) = self.stop.set() {
            tracing::warn!("Failed to raise stop signal after completion: {}", e);
        }

        report.targets = targets;
        Ok(report)
    }

    async fn crawl_page(&self, target: &mut CrawlTarget, report: &mut CrawlReport) -> Result<PageStep> {
        let corpus = self.corpus.city(target.city_slug());
        let page_number = target.next_page();

        tracing::info!("{}: page {}", target.city_slug(), page_number);
        let page = self
            .fetcher
            .search_page(target.place_id(), page_number, self.page_size)
            .await?;

        if page.is_empty() {
            tracing::info!(
                "{}: page {} is empty, city retired",
                target.city_slug(),
                page_number
            );
            target.retire()?;
            return Ok(PageStep::Retired);
        }

        for id in &page.listing_ids {
            if self.stop.is_set() {
                tracing::info!(
                    "{}: stop requested during page {}, page not recorded",
                    target.city_slug(),
                    page_number
                );
                return Ok(PageStep::Stopped);
            }

            let outcome = self.fetcher.fetch_listing_detail(&corpus, id).await?;
            report.record(outcome);
        }

        corpus.write_page(page_number, &page.raw)?;
        report.pages_written += 1;
        tracing::info!(
            "{}: page {} recorded ({} listings)",
            target.city_slug(),
            page_number,
            page.listing_ids.len()
        );

        target.advance();
        Ok(PageStep::Advanced)
    }
}

fn abort_active(targets: &mut [CrawlTarget]) -> Result<()> {
    for target in targets.iter_mut().filter(|t| t.is_active()) {
        target.abort()?;
    }
    Ok(())
}

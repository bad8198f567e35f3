//! Crawler coordinator - wires a crawl together from configuration
//!
//! This module:
//! - Builds the shared session store and paced client
//! - Resolves configured cities to place ids and corpus directories
//! - Computes each city's resume point from the pages already on disk
//! - Clears the stop sentinel and hands the targets to the scheduler

use crate::api::{LocationResolver, PlaceId};
use crate::config::{CityEntry, Config};
use crate::crawler::fetcher::ListingFetcher;
use crate::crawler::scheduler::{CrawlOutcome, CrawlReport, CrawlScheduler};
use crate::crawler::{SentinelFile, StopSignal};
use crate::http::RateLimitedClient;
use crate::session::SessionStore;
use crate::state::CrawlTarget;
use crate::storage::{city_slug, CorpusStore};
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    client: Arc<RateLimitedClient>,
    corpus: CorpusStore,
    stop: Arc<dyn StopSignal>,
}

impl Coordinator {
    /// Creates a coordinator that stops on the configured sentinel file
    pub fn new(config: Config) -> Result<Self> {
        let stop = Arc::new(SentinelFile::new(config.crawl.stop_sentinel.clone()));
        Self::with_stop_signal(config, stop)
    }

    /// Creates a coordinator with an explicit stop signal
    pub fn with_stop_signal(config: Config, stop: Arc<dyn StopSignal>) -> Result<Self> {
        let session = Arc::new(SessionStore::from_config(&config.session));
        let client = Arc::new(RateLimitedClient::new(&config.client, session)?);
        let corpus = CorpusStore::new(config.output.data_dir.clone());

        Ok(Self {
            config,
            client,
            corpus,
            stop,
        })
    }

    pub fn corpus(&self) -> &CorpusStore {
        &self.corpus
    }

    /// Turns configured cities into crawl targets
    ///
    /// Cities without a place id go through autocomplete and take their
    /// directory name from the returned label. Unresolvable cities and
    /// cities whose directory is already claimed are skipped with a warning.
    pub async fn resolve_targets(&self) -> Result<Vec<CrawlTarget>> {
        let resolver = LocationResolver::new(Arc::clone(&self.client));
        let mut seen = HashSet::new();
        let mut targets = Vec::new();

        for city in &self.config.cities {
            let Some((slug, place_id)) = self.resolve_city(&resolver, city).await? else {
                continue;
            };

            if !seen.insert(slug.clone()) {
                tracing::warn!(
                    "'{}' maps to directory '{}' which another city already uses, skipped",
                    city.name,
                    slug
                );
                continue;
            }

            let corpus = self.corpus.city(&slug);
            let target = CrawlTarget::resume(&corpus, place_id)?;
            if target.next_page() > 1 {
                tracing::info!(
                    "{}: resuming after {} recorded pages",
                    slug,
                    target.next_page() - 1
                );
            }
            targets.push(target);
        }

        Ok(targets)
    }

    async fn resolve_city(
        &self,
        resolver: &LocationResolver,
        city: &CityEntry,
    ) -> Result<Option<(String, PlaceId)>> {
        if let Some(place_id) = &city.place_id {
            return Ok(Some((city_slug(&city.name), PlaceId::new(place_id.clone()))));
        }

        let resolved = match resolver
            .resolve(&city.name, LocationResolver::DEFAULT_LIMIT)
            .await?
        {
            Some(resolved) => resolved,
            None => {
                tracing::warn!("Could not resolve '{}', skipped", city.name);
                return Ok(None);
            }
        };

        let mut slug = resolved
            .canonical_name
            .as_deref()
            .map(city_slug)
            .unwrap_or_default();
        if slug.is_empty() {
            slug = city_slug(&city.name);
        }
        if slug.is_empty() {
            tracing::warn!("'{}' has no usable directory name, skipped", city.name);
            return Ok(None);
        }

        Ok(Some((slug, resolved.place_id)))
    }

    /// Runs the full crawl
    pub async fn run(&self) -> Result<CrawlReport> {
        self.stop.clear()?;

        let targets = self.resolve_targets().await?;
        if targets.is_empty() {
            tracing::warn!("No city could be resolved, nothing to crawl");
        }

        let fetcher = ListingFetcher::new(
            Arc::clone(&self.client),
            self.config.crawl.include_flatsharing,
        );
        let scheduler = CrawlScheduler::new(
            fetcher,
            self.corpus.clone(),
            Arc::clone(&self.stop),
            self.config.crawl.page_size,
        );

        let report = scheduler.run(targets).await?;
        match report.outcome {
            CrawlOutcome::Completed => tracing::info!("Crawl completed"),
            CrawlOutcome::Stopped => tracing::info!("Crawl stopped, progress kept for resumption"),
        }
        Ok(report)
    }
}

/// Runs the main crawl operation
///
/// # Example
///
/// ```no_run
/// use rent_ripple::config::load_config;
/// use rent_ripple::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = run_crawl(config).await?;
/// println!("{} pages written", report.pages_written);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport> {
    let coordinator = Coordinator::new(config)?;
    coordinator.run().await
}

//! Crawler module for multi-city listing crawls
//!
//! This module contains the core crawling logic, including:
//! - Search page and listing detail fetching with on-disk idempotence
//! - Round-robin scheduling across cities with resumable progress
//! - Cooperative cancellation through a stop signal
//! - Overall crawl coordination from configuration

mod coordinator;
mod fetcher;
mod scheduler;
mod stop;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{ListingFetcher, ListingOutcome, SearchPage};
pub use scheduler::{CrawlOutcome, CrawlReport, CrawlScheduler};
pub use stop::{SentinelFile, StopFlag, StopSignal};

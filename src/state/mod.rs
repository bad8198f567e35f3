//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TargetState`: lifecycle of one city under crawl (active, retired, aborted)
//! - `CrawlTarget`: a city's slug, place id and next page to request

mod target;
mod target_state;

pub use target::CrawlTarget;
pub use target_state::TargetState;

use crate::api::PlaceId;
use crate::state::TargetState;
use crate::storage::{CityCorpus, StorageResult};
use crate::{CrawlError, Result};

/// One city under crawl
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    city_slug: String,
    place_id: PlaceId,
    next_page: u32,
    state: TargetState,
}

impl CrawlTarget {
    /// A fresh target starting at page 1
    pub fn new(city_slug: impl Into<String>, place_id: PlaceId) -> Self {
        Self {
            city_slug: city_slug.into(),
            place_id,
            next_page: 1,
            state: TargetState::Active,
        }
    }

    /// A target continuing after the highest page already on disk
    pub fn resume(corpus: &CityCorpus, place_id: PlaceId) -> StorageResult<Self> {
        let last = corpus.last_page()?;
        let mut target = Self::new(corpus.slug(), place_id);
        target.next_page = last.saturating_add(1);
        Ok(target)
    }

    pub fn city_slug(&self) -> &str {
        &self.city_slug
    }

    pub fn place_id(&self) -> &PlaceId {
        &self.place_id
    }

    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TargetState::Active
    }

    /// Moves past a page whose listings and page file are all written
    pub fn advance(&mut self) {
        if self.is_active() {
            self.next_page += 1;
        }
    }

    pub fn retire(&mut self) -> Result<()> {
        self.transition(TargetState::Retired)
    }

    pub fn abort(&mut self) -> Result<()> {
        self.transition(TargetState::Aborted)
    }

    fn transition(&mut self, to: TargetState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(CrawlError::InvalidTransition {
                city: self.city_slug.clone(),
                from: self.state,
                to,
            });
        }
        tracing::debug!("{}: {} -> {}", self.city_slug, self.state, to);
        self.state = to;
        Ok(())
    }
}

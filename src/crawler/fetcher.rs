//! Search and detail fetching
//!
//! This module turns API calls into corpus writes:
//! - One search page per call, returned with its raw document
//! - One listing detail per call, skipped when already on disk
//! - 404 on a detail means the ad was withdrawn and is not an error

use crate::api::{detail_path, ListingId, PlaceId, SearchRequest, SearchResponse, SEARCH_PATH};
use crate::http::RateLimitedClient;
use crate::storage::CityCorpus;
use crate::{CrawlError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// One page of search results
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub page_number: u32,
    pub page_size: u32,
    /// Number of entries the API returned, usable or not
    pub entry_count: usize,
    /// Usable listing ids in the order the API returned them
    pub listing_ids: Vec<ListingId>,
    /// The full response, persisted verbatim once the page is complete
    pub raw: Value,
}

impl SearchPage {
    /// True when the API returned no entries at all, the end of results
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

/// What happened to a single listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOutcome {
    /// Fetched and written to the corpus
    Saved,
    /// A stored file already existed; no request was made
    AlreadyStored,
    /// The detail endpoint answered 404; nothing was written
    Removed,
}

/// Fetches search pages and listing details through the shared client
pub struct ListingFetcher {
    client: Arc<RateLimitedClient>,
    include_flatsharing: bool,
}

impl ListingFetcher {
    pub fn new(client: Arc<RateLimitedClient>, include_flatsharing: bool) -> Self {
        Self {
            client,
            include_flatsharing,
        }
    }

    /// Requests one page of rental listings for a place
    ///
    /// A 404 from the search endpoint is not a normal end of results and is
    /// reported as an HTTP error.
    pub async fn search_page(&self, place_id: &PlaceId, page: u32, size: u32) -> Result<SearchPage> {
        let url = self.client.endpoint(SEARCH_PATH);
        let request = SearchRequest::new(place_id, page, size, self.include_flatsharing);
        let response = self.client.post_json(&url, &request).await?;

        if response.is_not_found() {
            return Err(CrawlError::HttpStatus {
                status: response.status().as_u16(),
                url,
            });
        }

        let raw: Value = response.json()?;
        let parsed = SearchResponse::deserialize(&raw).map_err(|source| CrawlError::Decode {
            url: url.clone(),
            source,
        })?;

        Ok(SearchPage {
            page_number: page,
            page_size: size,
            entry_count: parsed.classifieds.len(),
            listing_ids: parsed.listing_ids(),
            raw,
        })
    }

    /// Fetches and stores one listing unless the corpus already holds it
    pub async fn fetch_listing_detail(&self, corpus: &CityCorpus, id: &ListingId) -> Result<ListingOutcome> {
        if corpus.has_listing(id.as_str()) {
            tracing::debug!("{}: listing {} already stored", corpus.slug(), id);
            return Ok(ListingOutcome::AlreadyStored);
        }

        let url = self.client.endpoint(&detail_path(id));
        let response = self.client.get(&url).await?;

        if response.is_not_found() {
            tracing::warn!("{}: listing {} not found (404), skipped", corpus.slug(), id);
            return Ok(ListingOutcome::Removed);
        }

        let document: Value = response.json()?;
        corpus.write_listing(id.as_str(), &document)?;
        tracing::debug!("{}: saved listing {}", corpus.slug(), id);

        Ok(ListingOutcome::Saved)
    }
}

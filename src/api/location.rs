use crate::api::{AutocompleteCandidate, AutocompleteRequest, PlaceId, AUTOCOMPLETE_PATH};
use crate::http::RateLimitedClient;
use crate::Result;
use std::sync::Arc;

/// Outcome of a successful place lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlace {
    pub place_id: PlaceId,
    /// First display label of the match, e.g. `"Lyon (69)"`
    pub canonical_name: Option<String>,
}

/// Turns a free-text place name into the identifier search requests use
pub struct LocationResolver {
    client: Arc<RateLimitedClient>,
}

impl LocationResolver {
    pub const DEFAULT_LIMIT: u32 = 5;

    pub fn new(client: Arc<RateLimitedClient>) -> Self {
        Self { client }
    }

    /// Resolves `query` to its best match
    ///
    /// An empty result set is a normal outcome and yields `Ok(None)`; only
    /// transport, session and decoding problems are errors.
    pub async fn resolve(&self, query: &str, limit: u32) -> Result<Option<ResolvedPlace>> {
        let url = self.client.endpoint(AUTOCOMPLETE_PATH);
        let response = self
            .client
            .post_json(&url, &AutocompleteRequest::new(query, limit))
            .await?;

        let candidates: Option<Vec<AutocompleteCandidate>> = response.json()?;
        let first = match candidates.and_then(|c| c.into_iter().next()) {
            Some(first) => first,
            None => {
                tracing::warn!("No place matches '{}'", query);
                return Ok(None);
            }
        };

        let place_id = match first.id {
            Some(id) => id,
            None => {
                tracing::warn!("Best match for '{}' carries no place id", query);
                return Ok(None);
            }
        };

        let canonical_name = first.labels.into_iter().next();
        tracing::info!(
            "Resolved '{}' to {} ({})",
            query,
            place_id,
            canonical_name.as_deref().unwrap_or("no label")
        );

        Ok(Some(ResolvedPlace {
            place_id,
            canonical_name,
        }))
    }
}

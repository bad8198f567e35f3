//! API module: endpoints and typed payloads of the listing platform
//!
//! Requests are built from typed structures and responses are decoded at
//! the edge; only the raw documents that end up on disk stay untyped.

mod location;
mod payloads;

pub use location::{LocationResolver, ResolvedPlace};
pub use payloads::{
    AutocompleteCandidate, AutocompleteRequest, DistributionType, EstateType, ListingId,
    LocationFilter, PlaceId, PlaceType, ProjectType, SearchCriteria, SearchPaging, SearchRequest,
    SearchResponse, SortOrder,
};

/// Paginated search over classified ads
pub const SEARCH_PATH: &str = "/serp-bff/search";

/// Place-name autocomplete
pub const AUTOCOMPLETE_PATH: &str = "/search-mfe-bff/autocomplete";

/// Path of the detail record for one listing
pub fn detail_path(id: &ListingId) -> String {
    format!("/cdp-bff/v1/classified/{}", id)
}

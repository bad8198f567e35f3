use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Place identifier returned by autocomplete, stable for a whole crawl
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(String);

impl PlaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a classified ad
///
/// The API sends numbers or strings; both are kept as text. Only ASCII
/// alphanumerics, `-` and `_` are accepted since the id names a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingId(String);

impl ListingId {
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ===== Search =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DistributionType {
    Rent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EstateType {
    House,
    Apartment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProjectType {
    Stock,
    Flatsharing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFilter {
    pub place_ids: Vec<PlaceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub distribution_types: Vec<DistributionType>,
    pub estate_types: Vec<EstateType>,
    pub project_types: Vec<ProjectType>,
    pub location: LocationFilter,
}

impl SearchCriteria {
    /// Rental houses and apartments in a single place
    pub fn rentals(place_id: &PlaceId, include_flatsharing: bool) -> Self {
        let mut project_types = vec![ProjectType::Stock];
        if include_flatsharing {
            project_types.push(ProjectType::Flatsharing);
        }

        Self {
            distribution_types: vec![DistributionType::Rent],
            estate_types: vec![EstateType::House, EstateType::Apartment],
            project_types,
            location: LocationFilter {
                place_ids: vec![place_id.clone()],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPaging {
    pub page: u32,
    pub size: u32,
    pub order: SortOrder,
}

/// Body of `POST /serp-bff/search`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub criteria: SearchCriteria,
    pub paging: SearchPaging,
}

impl SearchRequest {
    pub fn new(place_id: &PlaceId, page: u32, size: u32, include_flatsharing: bool) -> Self {
        Self {
            criteria: SearchCriteria::rentals(place_id, include_flatsharing),
            paging: SearchPaging {
                page,
                size,
                order: SortOrder::Default,
            },
        }
    }
}

/// The part of a search response the crawler acts on
///
/// A missing or null `classifieds` field reads as an empty page. Entries are
/// kept loose so one odd id cannot make the whole page undecodable.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub classifieds: Vec<Value>,
}

impl SearchResponse {
    /// Ids of the usable entries, in response order
    ///
    /// Entries whose id is missing or not filename-safe are logged and left out.
    pub fn listing_ids(&self) -> Vec<ListingId> {
        self.classifieds
            .iter()
            .filter_map(|entry| {
                let id = match entry.get("id") {
                    Some(Value::Number(n)) => ListingId::parse(&n.to_string()),
                    Some(Value::String(s)) => ListingId::parse(s),
                    _ => None,
                };
                if id.is_none() {
                    tracing::warn!(
                        "Skipping search entry with unusable id: {}",
                        entry.get("id").unwrap_or(&serde_json::Value::Null)
                    );
                }
                id
            })
            .collect()
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ===== Autocomplete =====

/// Place kinds accepted from autocomplete: neighborhoods, administrative
/// divisions and postal codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaceType {
    #[serde(rename = "NBH1")]
    Neighborhood1,
    #[serde(rename = "NBH3")]
    Neighborhood3,
    #[serde(rename = "AD09")]
    Admin09,
    #[serde(rename = "NBH2")]
    Neighborhood2,
    #[serde(rename = "AD08")]
    Admin08,
    #[serde(rename = "AD06")]
    Admin06,
    #[serde(rename = "AD04")]
    Admin04,
    #[serde(rename = "POCO")]
    PostalCode,
    #[serde(rename = "AD02")]
    Admin02,
}

impl PlaceType {
    pub const ALLOWED: [PlaceType; 9] = [
        PlaceType::Neighborhood1,
        PlaceType::Neighborhood3,
        PlaceType::Admin09,
        PlaceType::Neighborhood2,
        PlaceType::Admin08,
        PlaceType::Admin06,
        PlaceType::Admin04,
        PlaceType::PostalCode,
        PlaceType::Admin02,
    ];
}

/// Body of `POST /search-mfe-bff/autocomplete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutocompleteRequest {
    pub text: String,
    pub limit: u32,
    pub place_types: Vec<PlaceType>,
    pub parent_types: Vec<PlaceType>,
    pub locale: &'static str,
}

impl AutocompleteRequest {
    pub fn new(text: &str, limit: u32) -> Self {
        Self {
            text: text.to_string(),
            limit,
            place_types: PlaceType::ALLOWED.to_vec(),
            parent_types: PlaceType::ALLOWED.to_vec(),
            locale: "fr",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutocompleteCandidate {
    pub id: Option<PlaceId>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: Vec<String>,
}

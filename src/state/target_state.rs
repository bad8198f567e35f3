/// Target state definitions for the per-city crawl lifecycle
use std::fmt;

/// Represents where a city's crawl stands
///
/// The initial state of a target is never stored: it is recomputed from the
/// page files on disk each time a crawl starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    /// More pages are expected
    Active,

    /// A search page came back empty; nothing left to fetch
    Retired,

    /// A stop was observed before this target ran dry
    Aborted,
}

impl TargetState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Only an active target may move, and only to a terminal state
    pub fn can_transition_to(&self, next: TargetState) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Retired) | (Self::Active, Self::Aborted)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Retired => "retired",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

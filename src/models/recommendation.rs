use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::catalog::EpisodeRef;

/// Which catalog shape a candidate came from
///
/// Declared movie-first so the derived `Ord` gives the movies-before-shows
/// tie-break used by ranking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Movie,
    Tv,
}

impl Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateKind::Movie => write!(f, "movie"),
            CandidateKind::Tv => write!(f, "tv"),
        }
    }
}

/// A transient, scored recommendation proposal
///
/// Built fresh per request from catalog documents; never persisted. `identity`
/// is the deduplication key; `media_locator` is always present on candidates
/// that reach the final result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub identity: String,
    /// Id of the owning Movie or Show document
    pub source_id: String,
    #[serde(rename = "type")]
    pub kind: CandidateKind,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub media_locator: Option<String>,
    #[serde(default)]
    pub episode_ref: Option<EpisodeRef>,
    pub is_next_episode: bool,
    pub is_new_show: bool,
    #[serde(default)]
    pub watch_count: Option<u64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
}

impl Pagination {
    pub fn new(current_page: usize, total_items: usize, items_per_page: usize) -> Self {
        let total_pages = if items_per_page == 0 {
            0
        } else {
            total_items.div_ceil(items_per_page)
        };
        Self {
            current_page,
            total_pages,
            total_items,
            items_per_page,
        }
    }
}

/// Full response of one recommendation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub items: Vec<Candidate>,
    pub has_watched: bool,
    /// The user's top genres (≤3, most-preferred first)
    pub genres: Vec<String>,
    pub pagination: Pagination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecommendationResult {
    /// The degraded shape returned when every tier failed or the catalog is
    /// empty; never cached
    pub fn failure(message: impl Into<String>, page: usize, limit: usize) -> Self {
        Self {
            items: Vec::new(),
            has_watched: false,
            genres: Vec::new(),
            pagination: Pagination::new(page, 0, limit),
            error: Some(message.into()),
        }
    }
}

/// Projection returned when the caller only wants the total
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountResponse {
    pub count: usize,
}

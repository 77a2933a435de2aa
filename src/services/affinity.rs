use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::db::CatalogStore;
use crate::error::AppResult;
use crate::models::{Show, WatchHistoryRecord};

/// Number of top genres kept in a profile
pub const MAX_PROFILE_GENRES: usize = 3;

/// What the watch history says about a user's taste
///
/// Built once per request and handed through the pipeline. `genres` holds at
/// most [`MAX_PROFILE_GENRES`] entries, most-watched first; the id sets and
/// the locator set drive exclusion and the rewatch penalty.
#[derive(Debug, Clone, Default)]
pub struct TasteProfile {
    pub has_watched: bool,
    pub genres: Vec<String>,
    pub watched_locators: HashSet<String>,
    pub watched_movie_ids: HashSet<String>,
    pub watched_show_ids: HashSet<String>,
    /// Shows the user has started, in catalog order; source of next-episode
    /// candidates
    pub watched_shows: Vec<Show>,
    pub latest_watch: Option<DateTime<Utc>>,
}

impl TasteProfile {
    /// Sentinel profile for a user with no usable history
    pub fn no_history() -> Self {
        Self::default()
    }
}

/// Resolves a user's watch record into a [`TasteProfile`]
///
/// Joins watched locators back to their catalog documents, then tallies genre
/// occurrences once per matched title (a show binged end to end still counts
/// its genres once). Ties in the tally break on genre name so the profile is
/// stable across runs. An empty or missing record resolves to the
/// `no_history` sentinel rather than an error.
pub async fn build_profile(
    catalog: &dyn CatalogStore,
    record: Option<&WatchHistoryRecord>,
) -> AppResult<TasteProfile> {
    let Some(record) = record.filter(|r| !r.is_empty()) else {
        return Ok(TasteProfile::no_history());
    };

    let locators: Vec<String> = record
        .watched_entries
        .iter()
        .map(|entry| entry.media_locator.clone())
        .collect();

    let (movies, shows) = tokio::join!(
        catalog.movies_by_locators(&locators),
        catalog.shows_by_locators(&locators),
    );
    let movies = movies?;
    let shows = shows?;

    let mut tally: HashMap<&str, u32> = HashMap::new();
    for genres in movies
        .iter()
        .map(|m| &m.genres)
        .chain(shows.iter().map(|s| &s.genres))
    {
        // A duplicate tag within one title still counts once
        let unique: HashSet<&str> = genres.iter().map(String::as_str).collect();
        for genre in unique {
            *tally.entry(genre).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&str, u32)> = tally.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let genres: Vec<String> = ranked
        .into_iter()
        .take(MAX_PROFILE_GENRES)
        .map(|(genre, _)| genre.to_string())
        .collect();

    tracing::debug!(
        matched_movies = movies.len(),
        matched_shows = shows.len(),
        genres = ?genres,
        "Resolved taste profile from watch history"
    );

    Ok(TasteProfile {
        has_watched: true,
        genres,
        watched_locators: record.locator_set(),
        watched_movie_ids: movies.iter().map(|m| m.id.clone()).collect(),
        watched_show_ids: shows.iter().map(|s| s.id.clone()).collect(),
        watched_shows: shows,
        latest_watch: record.latest_watch(),
    })
}

use std::collections::HashSet;

use crate::db::CatalogStore;
use crate::models::{Candidate, CatalogItem, EpisodeRef, Show};
use crate::services::affinity::TasteProfile;
use crate::services::dedupe;

/// Hard cap on candidates fetched from one store query
pub const CANDIDATE_FETCH_CAP: usize = 500;

/// Over-provision multiplier applied before scoring and dedupe thin the pool
const OVER_PROVISION_FACTOR: usize = 5;

/// How many candidates to request per source for a given page
///
/// Deep pages need enough rows to cover every earlier page plus headroom for
/// what dedupe and exclusion will discard, capped at [`CANDIDATE_FETCH_CAP`].
pub fn fetch_limit(page: usize, limit: usize) -> usize {
    page.saturating_add(1)
        .saturating_mul(limit)
        .saturating_mul(OVER_PROVISION_FACTOR)
        .min(CANDIDATE_FETCH_CAP)
}

/// Candidate for a catalog title's natural entry point
///
/// Movies point at their own file; shows point at their first playable
/// episode and are flagged as a new-show start. Titles with nothing playable
/// yield `None` and never reach the pipeline.
pub fn from_catalog_item(item: &CatalogItem) -> Option<Candidate> {
    let playable = item.first_playable()?;
    let mut candidate = Candidate {
        identity: String::new(),
        source_id: item.id().to_string(),
        kind: item.kind(),
        title: item.title().to_string(),
        genres: item.genres().to_vec(),
        media_locator: Some(playable.locator),
        episode_ref: playable.episode,
        is_next_episode: false,
        is_new_show: matches!(item, CatalogItem::Show(_)),
        watch_count: None,
        last_updated: item.last_updated(),
        score: 0.0,
    };
    candidate.identity = dedupe::identity_of(&candidate);
    Some(candidate)
}

fn continuation_candidate(show: &Show, episode: EpisodeRef, locator: &str) -> Candidate {
    let mut candidate = Candidate {
        identity: String::new(),
        source_id: show.id.clone(),
        kind: crate::models::CandidateKind::Tv,
        title: show.title.clone(),
        genres: show.genres.clone(),
        media_locator: Some(locator.to_string()),
        episode_ref: Some(episode),
        is_next_episode: true,
        is_new_show: false,
        watch_count: None,
        last_updated: show.last_updated,
        score: 0.0,
    };
    candidate.identity = dedupe::identity_of(&candidate);
    candidate
}

/// Furthest (season, episode) of `show` the user has watched
fn highest_watched(show: &Show, watched: &HashSet<String>) -> Option<EpisodeRef> {
    show.playable_episodes()
        .filter(|(_, locator)| watched.contains(*locator))
        .map(|(episode, _)| episode)
        .max()
}

/// Continuation stream: the next unwatched episode of each in-progress show
///
/// Pure over the profile; the shows were already joined during affinity
/// extraction. A show whose every episode is watched yields nothing.
pub fn next_episode_candidates(profile: &TasteProfile) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for show in &profile.watched_shows {
        let Some(progress) = highest_watched(show, &profile.watched_locators) else {
            continue;
        };
        let Some((episode, locator)) = show.next_episode_after(progress) else {
            tracing::debug!(show_id = %show.id, "Show fully watched, no continuation");
            continue;
        };
        // Out-of-order viewing can leave the computed successor watched
        if profile.watched_locators.contains(locator) {
            continue;
        }
        candidates.push(continuation_candidate(show, episode, locator));
    }
    candidates
}

/// Discovery stream: unwatched titles sharing the profile's top genres
///
/// Movies and shows are fetched concurrently; a failure on either source is
/// logged and that source contributes nothing, so one bad collection cannot
/// empty the whole stream.
pub async fn fresh_candidates(
    catalog: &dyn CatalogStore,
    profile: &TasteProfile,
    page: usize,
    limit: usize,
) -> Vec<Candidate> {
    let fetch = fetch_limit(page, limit);
    let (movies, shows) = tokio::join!(
        catalog.movies_by_genres(&profile.genres, &profile.watched_movie_ids, fetch),
        catalog.shows_by_genres(&profile.genres, &profile.watched_show_ids, fetch),
    );
    let movies = movies.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Movie candidate fetch failed, continuing without");
        Vec::new()
    });
    let shows = shows.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Show candidate fetch failed, continuing without");
        Vec::new()
    });

    movies
        .into_iter()
        .map(CatalogItem::Movie)
        .chain(shows.into_iter().map(CatalogItem::Show))
        .filter_map(|item| from_catalog_item(&item))
        .collect()
}

/// Assembles both candidate streams for the personalized tier
///
/// Continuations come first so that when a continuation and a discovery
/// entry collide, dedupe keeps the boosted one.
pub async fn assemble(
    catalog: &dyn CatalogStore,
    profile: &TasteProfile,
    page: usize,
    limit: usize,
) -> Vec<Candidate> {
    let mut candidates = next_episode_candidates(profile);
    let fresh = fresh_candidates(catalog, profile, page, limit).await;
    tracing::debug!(
        continuations = candidates.len(),
        fresh = fresh.len(),
        "Assembled candidate streams"
    );
    candidates.extend(fresh);
    candidates
}

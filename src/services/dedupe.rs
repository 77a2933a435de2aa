use std::collections::HashSet;

use crate::models::{Candidate, CandidateKind};

/// Locator prefix used in movie identities: everything up to the final `/`
/// segment, so re-encodes of the same file under one directory collapse.
fn locator_prefix(locator: &str) -> &str {
    locator
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or(locator)
}

/// Stable deduplication key of a candidate
///
/// Movies key on lowercased title plus the locator directory; episodes key on
/// the owning show and the (season, episode) pair. Everything about the key is
/// derived from candidate fields, so recomputing is always safe.
pub fn identity_of(candidate: &Candidate) -> String {
    match candidate.kind {
        CandidateKind::Movie => format!(
            "movie:{}:{}",
            candidate.title.to_lowercase(),
            candidate
                .media_locator
                .as_deref()
                .map(locator_prefix)
                .unwrap_or_default()
        ),
        CandidateKind::Tv => match candidate.episode_ref {
            Some(episode) => format!("tv:{}:{}", candidate.source_id, episode),
            None => format!("tv:{}", candidate.source_id),
        },
    }
}

/// Removes repeated recommendations, first occurrence wins
///
/// Collapses on identity, and separately on mediaLocator: a show entry and a
/// next-episode pointer can resolve to the same physical file through
/// different metadata paths, and only one may surface. Candidates without a
/// locator are not eligible for the result and are dropped here as well.
/// Pure function, no I/O.
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen_identities: HashSet<String> = HashSet::new();
    let mut seen_locators: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(candidates.len());

    for mut candidate in candidates {
        candidate.identity = identity_of(&candidate);

        let Some(locator) = candidate.media_locator.clone() else {
            continue;
        };
        if seen_identities.contains(&candidate.identity) || seen_locators.contains(&locator) {
            continue;
        }

        seen_identities.insert(candidate.identity.clone());
        seen_locators.insert(locator);
        kept.push(candidate);
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EpisodeRef;

    fn movie_candidate(title: &str, locator: &str) -> Candidate {
        let mut candidate = Candidate {
            identity: String::new(),
            source_id: format!("id-{}", title.to_lowercase()),
            kind: CandidateKind::Movie,
            title: title.to_string(),
            genres: vec![],
            media_locator: Some(locator.to_string()),
            episode_ref: None,
            is_next_episode: false,
            is_new_show: false,
            watch_count: None,
            last_updated: None,
            score: 0.0,
        };
        candidate.identity = identity_of(&candidate);
        candidate
    }

    fn episode_candidate(show_id: &str, season: u32, episode: u32, locator: &str) -> Candidate {
        let mut candidate = Candidate {
            identity: String::new(),
            source_id: show_id.to_string(),
            kind: CandidateKind::Tv,
            title: show_id.to_string(),
            genres: vec![],
            media_locator: Some(locator.to_string()),
            episode_ref: Some(EpisodeRef::new(season, episode)),
            is_next_episode: false,
            is_new_show: false,
            watch_count: None,
            last_updated: None,
            score: 0.0,
        };
        candidate.identity = identity_of(&candidate);
        candidate
    }

    #[test]
    fn test_movie_identity_uses_title_and_locator_directory() {
        let candidate = movie_candidate("Heat", "/media/movies/heat.mp4");
        assert_eq!(candidate.identity, "movie:heat:/media/movies");
    }

    #[test]
    fn test_episode_identity_uses_show_and_episode_ref() {
        let candidate = episode_candidate("show-x", 2, 1, "/media/show-x/s2e1.mp4");
        assert_eq!(candidate.identity, "tv:show-x:s2e1");
    }

    #[test]
    fn test_same_identity_collapses_to_first() {
        let first = movie_candidate("Heat", "/media/movies/heat.mp4");
        let second = movie_candidate("Heat", "/media/movies/heat-remux.mp4");
        let kept = dedupe(vec![first.clone(), second]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].media_locator, first.media_locator);
    }

    #[test]
    fn test_same_locator_collapses_across_identities() {
        // A new-show entry and a next-episode pointer resolving to one file
        let a = episode_candidate("show-x", 1, 1, "/media/show-x/s1e1.mp4");
        let b = episode_candidate("show-x-alias", 1, 1, "/media/show-x/s1e1.mp4");
        let kept = dedupe(vec![a, b]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source_id, "show-x");
    }

    #[test]
    fn test_distinct_candidates_all_survive_in_order() {
        let kept = dedupe(vec![
            movie_candidate("Heat", "/media/movies/heat.mp4"),
            episode_candidate("show-x", 1, 2, "/media/show-x/s1e2.mp4"),
            movie_candidate("Arrival", "/media/movies/arrival.mp4"),
        ]);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].title, "Heat");
        assert_eq!(kept[1].source_id, "show-x");
        assert_eq!(kept[2].title, "Arrival");
    }

    #[test]
    fn test_locatorless_candidate_is_dropped() {
        let mut no_locator = movie_candidate("Heat", "/media/movies/heat.mp4");
        no_locator.media_locator = None;
        let kept = dedupe(vec![no_locator]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let input = vec![
            movie_candidate("Heat", "/media/movies/heat.mp4"),
            episode_candidate("show-x", 1, 2, "/media/show-x/s1e2.mp4"),
        ];
        let once = dedupe(input);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }
}

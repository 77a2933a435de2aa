use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::{Candidate, CandidateKind};
use crate::services::affinity::TasteProfile;

/// Additive boost for the next unwatched episode of an in-progress show;
/// deliberately large enough to dominate the weighted signals
pub const NEXT_EPISODE_BOOST: f64 = 0.5;

/// Watch count at which the popularity signal saturates at 1.0
const POPULARITY_SATURATION: f64 = 100.0;

/// Exponential decay rate per day of catalog age for the recency signal
const RECENCY_DECAY_RATE: f64 = 0.1;

/// Diversity signal for a title whose source document was recently watched
const REWATCH_PENALTY: f64 = 0.2;

/// Relative weights of the five scoring signals
///
/// Each weight lies in [0, 1] and the sum stays at or below 1 so that the
/// weighted portion of a score cannot leave the unit interval on its own.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub genre_similarity: f64,
    pub recency: f64,
    pub completion: f64,
    pub popularity: f64,
    pub diversity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            genre_similarity: 0.30,
            recency: 0.20,
            completion: 0.15,
            popularity: 0.15,
            diversity: 0.10,
        }
    }
}

impl ScoringWeights {
    pub fn is_valid(&self) -> bool {
        let weights = [
            self.genre_similarity,
            self.recency,
            self.completion,
            self.popularity,
            self.diversity,
        ];
        weights.iter().all(|w| (0.0..=1.0).contains(w)) && weights.iter().sum::<f64>() <= 1.0 + 1e-9
    }
}

/// Scores candidates against a taste profile
///
/// Pure and synchronous; the wall clock is passed in once per request so
/// every candidate in one response decays against the same instant.
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    /// Invalid weights fall back to the defaults rather than failing the
    /// request path.
    pub fn new(weights: ScoringWeights) -> Self {
        if weights.is_valid() {
            Self { weights }
        } else {
            tracing::warn!(?weights, "Invalid scoring weights, using defaults");
            Self {
                weights: ScoringWeights::default(),
            }
        }
    }

    /// Final score in [0, 1]
    ///
    /// Weighted sum of genre similarity (Jaccard), recency decay, completion
    /// (reserved, currently neutral), saturating popularity and a rewatch
    /// penalty, plus the next-episode boost, clamped into the unit interval.
    pub fn score(&self, candidate: &Candidate, profile: &TasteProfile, now: DateTime<Utc>) -> f64 {
        let genre_similarity = jaccard(&profile.genres, &candidate.genres);
        let recency = candidate
            .last_updated
            .map(|added| recency_decay(added, now))
            .unwrap_or(0.0);
        let completion = 0.0;
        let popularity = candidate
            .watch_count
            .map(|count| (count as f64 / POPULARITY_SATURATION).min(1.0))
            .unwrap_or(0.0);
        let recently_watched = match candidate.kind {
            CandidateKind::Movie => profile.watched_movie_ids.contains(&candidate.source_id),
            CandidateKind::Tv => profile.watched_show_ids.contains(&candidate.source_id),
        };
        let diversity = if recently_watched { REWATCH_PENALTY } else { 1.0 };

        let mut score = self.weights.genre_similarity * genre_similarity
            + self.weights.recency * recency
            + self.weights.completion * completion
            + self.weights.popularity * popularity
            + self.weights.diversity * diversity;

        if candidate.is_next_episode {
            score += NEXT_EPISODE_BOOST;
        }

        score.clamp(0.0, 1.0)
    }

    pub fn score_all(
        &self,
        candidates: &mut [Candidate],
        profile: &TasteProfile,
        now: DateTime<Utc>,
    ) {
        for candidate in candidates.iter_mut() {
            candidate.score = self.score(candidate, profile, now);
        }
    }
}

/// Jaccard similarity over genre tags; zero when either side has no tags
fn jaccard(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

/// e^(-rate * age_days); timestamps from the future clamp to 1.0
fn recency_decay(added: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - added).num_seconds() as f64 / 86_400.0;
    if age_days <= 0.0 {
        return 1.0;
    }
    (-RECENCY_DECAY_RATE * age_days).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn candidate(genres: &[&str]) -> Candidate {
        Candidate {
            identity: "movie:test:/m".to_string(),
            source_id: "m1".to_string(),
            kind: CandidateKind::Movie,
            title: "Test".to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            media_locator: Some("/m/test.mp4".to_string()),
            episode_ref: None,
            is_next_episode: false,
            is_new_show: false,
            watch_count: None,
            last_updated: None,
            score: 0.0,
        }
    }

    fn profile_with_genres(genres: &[&str]) -> TasteProfile {
        TasteProfile {
            has_watched: true,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            ..TasteProfile::no_history()
        }
    }

    #[test]
    fn test_default_weights_are_valid() {
        assert!(ScoringWeights::default().is_valid());
    }

    #[test]
    fn test_invalid_weights_fall_back_to_defaults() {
        let bogus = ScoringWeights {
            genre_similarity: 1.5,
            ..ScoringWeights::default()
        };
        let engine = ScoringEngine::new(bogus);
        let score = engine.score(
            &candidate(&["drama"]),
            &profile_with_genres(&["drama"]),
            Utc::now(),
        );
        // Exact genre match under default weights: 0.30 * 1.0 + 0.10 * 1.0
        assert!((score - 0.40).abs() < 1e-9);
    }

    #[test]
    fn test_score_stays_in_unit_interval() {
        let engine = ScoringEngine::new(ScoringWeights::default());
        let now = Utc::now();
        let mut best = candidate(&["drama", "crime", "scifi"]);
        best.is_next_episode = true;
        best.watch_count = Some(10_000);
        best.last_updated = Some(now);
        let profile = profile_with_genres(&["drama", "crime", "scifi"]);

        let score = engine.score(&best, &profile, now);
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_genre_overlap_raises_score() {
        let engine = ScoringEngine::new(ScoringWeights::default());
        let now = Utc::now();
        let profile = profile_with_genres(&["drama", "crime"]);

        let matching = engine.score(&candidate(&["drama", "crime"]), &profile, now);
        let partial = engine.score(&candidate(&["drama", "western"]), &profile, now);
        let unrelated = engine.score(&candidate(&["western"]), &profile, now);

        assert!(matching > partial);
        assert!(partial > unrelated);
    }

    #[test]
    fn test_empty_genres_score_zero_similarity() {
        let engine = ScoringEngine::new(ScoringWeights::default());
        let now = Utc::now();
        // No profile genres at all: only the diversity signal contributes
        let score = engine.score(&candidate(&["drama"]), &profile_with_genres(&[]), now);
        assert!((score - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_next_episode_boost_dominates() {
        let engine = ScoringEngine::new(ScoringWeights::default());
        let now = Utc::now();
        let profile = profile_with_genres(&["drama"]);

        let mut continuation = candidate(&[]);
        continuation.kind = CandidateKind::Tv;
        continuation.is_next_episode = true;
        let fresh_match = candidate(&["drama"]);

        let boosted = engine.score(&continuation, &profile, now);
        let matched = engine.score(&fresh_match, &profile, now);
        assert!(boosted > matched);
    }

    #[test]
    fn test_recency_decays_with_age() {
        let engine = ScoringEngine::new(ScoringWeights::default());
        let now = Utc::now();
        let profile = TasteProfile::no_history();

        let mut new_title = candidate(&[]);
        new_title.last_updated = Some(now - Duration::days(1));
        let mut old_title = candidate(&[]);
        old_title.last_updated = Some(now - Duration::days(60));
        let mut future_title = candidate(&[]);
        future_title.last_updated = Some(now + Duration::days(3));

        let new_score = engine.score(&new_title, &profile, now);
        let old_score = engine.score(&old_title, &profile, now);
        let future_score = engine.score(&future_title, &profile, now);

        assert!(new_score > old_score);
        // Clock skew in catalog timestamps must not inflate past "brand new"
        assert!((future_score - (0.20 + 0.10)).abs() < 1e-9);
    }

    #[test]
    fn test_recently_watched_source_takes_rewatch_penalty() {
        let engine = ScoringEngine::new(ScoringWeights::default());
        let now = Utc::now();
        let mut profile = profile_with_genres(&[]);
        profile.watched_movie_ids.insert("m1".to_string());

        let fresh = {
            let mut c = candidate(&[]);
            c.source_id = "m2".to_string();
            c
        };
        let rewatch = candidate(&[]);

        let fresh_score = engine.score(&fresh, &profile, now);
        let rewatch_score = engine.score(&rewatch, &profile, now);
        assert!((fresh_score - 0.10).abs() < 1e-9);
        assert!((rewatch_score - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_popularity_saturates() {
        let engine = ScoringEngine::new(ScoringWeights::default());
        let now = Utc::now();
        let profile = TasteProfile::no_history();

        let mut popular = candidate(&[]);
        popular.watch_count = Some(100);
        let mut viral = candidate(&[]);
        viral.watch_count = Some(100_000);

        assert_eq!(
            engine.score(&popular, &profile, now),
            engine.score(&viral, &profile, now)
        );
    }

    #[test]
    fn test_score_all_writes_every_candidate() {
        let engine = ScoringEngine::new(ScoringWeights::default());
        let profile = profile_with_genres(&["drama"]);
        let mut candidates = vec![candidate(&["drama"]), candidate(&["western"])];
        engine.score_all(&mut candidates, &profile, Utc::now());
        assert!(candidates[0].score > candidates[1].score);
        assert!(candidates.iter().all(|c| c.score > 0.0));
    }
}

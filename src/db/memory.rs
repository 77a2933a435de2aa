use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::db::{CatalogStore, WatchHistoryStore};
use crate::error::AppResult;
use crate::models::{Movie, Show, WatchHistoryRecord};

/// JSON shape of a catalog fixture file
#[derive(Debug, Deserialize)]
struct CatalogFixture {
    #[serde(default)]
    movies: Vec<Movie>,
    #[serde(default)]
    shows: Vec<Show>,
}

/// In-memory catalog, immutable after construction
///
/// Queries iterate the backing vectors in insertion order (except the
/// title-sorted `*_page` paths), so a fixed fixture always produces the same
/// result sequence.
pub struct MemoryCatalogStore {
    movies: Vec<Movie>,
    shows: Vec<Show>,
}

impl MemoryCatalogStore {
    pub fn new(movies: Vec<Movie>, shows: Vec<Show>) -> Self {
        Self { movies, shows }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Loads `{"movies": [...], "shows": [...]}` from a JSON fixture file
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let fixture: CatalogFixture = serde_json::from_str(&raw)?;
        Ok(Self::new(fixture.movies, fixture.shows))
    }

    fn overlaps(genres: &[String], other: &[String]) -> bool {
        other.iter().any(|g| genres.contains(g))
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn movies_by_locators(&self, locators: &[String]) -> AppResult<Vec<Movie>> {
        let wanted: HashSet<&str> = locators.iter().map(String::as_str).collect();
        Ok(self
            .movies
            .iter()
            .filter(|m| {
                m.media_locator
                    .as_deref()
                    .is_some_and(|locator| wanted.contains(locator))
            })
            .cloned()
            .collect())
    }

    async fn shows_by_locators(&self, locators: &[String]) -> AppResult<Vec<Show>> {
        let wanted: HashSet<&str> = locators.iter().map(String::as_str).collect();
        Ok(self
            .shows
            .iter()
            .filter(|s| {
                s.playable_episodes()
                    .any(|(_, locator)| wanted.contains(locator))
            })
            .cloned()
            .collect())
    }

    async fn movies_by_genres(
        &self,
        genres: &[String],
        exclude_ids: &HashSet<String>,
        limit: usize,
    ) -> AppResult<Vec<Movie>> {
        Ok(self
            .movies
            .iter()
            .filter(|m| !exclude_ids.contains(&m.id) && Self::overlaps(genres, &m.genres))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn shows_by_genres(
        &self,
        genres: &[String],
        exclude_ids: &HashSet<String>,
        limit: usize,
    ) -> AppResult<Vec<Show>> {
        Ok(self
            .shows
            .iter()
            .filter(|s| !exclude_ids.contains(&s.id) && Self::overlaps(genres, &s.genres))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn movies_excluding(
        &self,
        exclude_ids: &HashSet<String>,
        limit: usize,
    ) -> AppResult<Vec<Movie>> {
        Ok(self
            .movies
            .iter()
            .filter(|m| !exclude_ids.contains(&m.id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn shows_excluding(
        &self,
        exclude_ids: &HashSet<String>,
        limit: usize,
    ) -> AppResult<Vec<Show>> {
        Ok(self
            .shows
            .iter()
            .filter(|s| !exclude_ids.contains(&s.id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn movies_page(&self, skip: usize, limit: usize) -> AppResult<Vec<Movie>> {
        let mut sorted: Vec<Movie> = self.movies.clone();
        sorted.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(sorted.into_iter().skip(skip).take(limit).collect())
    }

    async fn shows_page(&self, skip: usize, limit: usize) -> AppResult<Vec<Show>> {
        let mut sorted: Vec<Show> = self.shows.clone();
        sorted.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(sorted.into_iter().skip(skip).take(limit).collect())
    }
}

/// In-memory watch-history records keyed by user id
pub struct MemoryWatchHistoryStore {
    records: HashMap<String, WatchHistoryRecord>,
}

impl MemoryWatchHistoryStore {
    pub fn new(records: Vec<WatchHistoryRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.user_id.clone(), r))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Loads a JSON array of watch-history records from a fixture file
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<WatchHistoryRecord> = serde_json::from_str(&raw)?;
        Ok(Self::new(records))
    }
}

#[async_trait::async_trait]
impl WatchHistoryStore for MemoryWatchHistoryStore {
    async fn record_for_user(&self, user_id: &str) -> AppResult<Option<WatchHistoryRecord>> {
        Ok(self.records.get(user_id).cloned())
    }

    async fn global_watch_counts(&self) -> AppResult<HashMap<String, u64>> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for record in self.records.values() {
            for entry in &record.watched_entries {
                *counts.entry(entry.media_locator.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Episode, Season, WatchedEntry};
    use chrono::{TimeZone, Utc};

    fn movie(id: &str, title: &str, genres: &[&str], locator: &str) -> Movie {
        Movie {
            id: id.to_string(),
            title: title.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            media_locator: Some(locator.to_string()),
            last_updated: None,
        }
    }

    fn show(id: &str, title: &str, genres: &[&str], locators: &[&str]) -> Show {
        Show {
            id: id.to_string(),
            title: title.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            seasons: vec![Season {
                season_number: 1,
                episodes: locators
                    .iter()
                    .enumerate()
                    .map(|(i, locator)| Episode {
                        episode_number: i as u32 + 1,
                        media_locator: Some(locator.to_string()),
                    })
                    .collect(),
            }],
            last_updated: None,
        }
    }

    fn test_catalog() -> MemoryCatalogStore {
        MemoryCatalogStore::new(
            vec![
                movie("m1", "Zodiac", &["crime", "thriller"], "/m/zodiac.mp4"),
                movie("m2", "Arrival", &["scifi"], "/m/arrival.mp4"),
                movie("m3", "Heat", &["crime"], "/m/heat.mp4"),
            ],
            vec![
                show("s1", "The Wire", &["crime", "drama"], &["/s/wire-1.mp4"]),
                show("s2", "Severance", &["scifi", "drama"], &["/s/sev-1.mp4"]),
            ],
        )
    }

    #[tokio::test]
    async fn test_movies_by_locators_joins_on_media_locator() {
        let store = test_catalog();
        let found = store
            .movies_by_locators(&["/m/heat.mp4".to_string(), "/nope.mp4".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "m3");
    }

    #[tokio::test]
    async fn test_shows_by_locators_matches_episode_locators() {
        let store = test_catalog();
        let found = store
            .shows_by_locators(&["/s/sev-1.mp4".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "s2");
    }

    #[tokio::test]
    async fn test_movies_by_genres_filters_and_excludes() {
        let store = test_catalog();
        let exclude: HashSet<String> = ["m1".to_string()].into_iter().collect();
        let found = store
            .movies_by_genres(&["crime".to_string()], &exclude, 10)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "m3");
    }

    #[tokio::test]
    async fn test_movies_by_genres_respects_limit() {
        let store = test_catalog();
        let found = store
            .movies_by_genres(&["crime".to_string()], &HashSet::new(), 1)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "m1");
    }

    #[tokio::test]
    async fn test_movies_page_is_title_sorted() {
        let store = test_catalog();
        let page = store.movies_page(0, 10).await.unwrap();
        let titles: Vec<&str> = page.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Arrival", "Heat", "Zodiac"]);

        let second = store.movies_page(2, 10).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].title, "Zodiac");
    }

    #[tokio::test]
    async fn test_global_watch_counts_aggregates_across_users() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let entry = |locator: &str| WatchedEntry {
            media_locator: locator.to_string(),
            last_updated: ts,
            playback_position_seconds: None,
            validity: None,
        };
        let store = MemoryWatchHistoryStore::new(vec![
            WatchHistoryRecord::new("u1", vec![entry("/m/heat.mp4"), entry("/m/zodiac.mp4")]),
            WatchHistoryRecord::new("u2", vec![entry("/m/heat.mp4")]),
        ]);

        let counts = store.global_watch_counts().await.unwrap();
        assert_eq!(counts.get("/m/heat.mp4"), Some(&2));
        assert_eq!(counts.get("/m/zodiac.mp4"), Some(&1));
        assert_eq!(
            store.record_for_user("u1").await.unwrap().unwrap().user_id,
            "u1"
        );
        assert!(store.record_for_user("ghost").await.unwrap().is_none());
    }
}

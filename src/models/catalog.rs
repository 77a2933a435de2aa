use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::models::recommendation::CandidateKind;

/// Reference to a single episode within a show
///
/// Derived `Ord` gives the lexicographic (season, episode) comparison used
/// when working out how far into a show a user has watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    pub season_number: u32,
    pub episode_number: u32,
}

impl EpisodeRef {
    pub fn new(season_number: u32, episode_number: u32) -> Self {
        Self {
            season_number,
            episode_number,
        }
    }
}

impl Display for EpisodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}e{}", self.season_number, self.episode_number)
    }
}

/// A single playable unit resolved from a catalog item
#[derive(Debug, Clone, PartialEq)]
pub struct Playable {
    pub locator: String,
    pub episode: Option<EpisodeRef>,
}

/// Standalone catalog title with one playable unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Locator of the playable file; titles without one are never recommended
    #[serde(default)]
    pub media_locator: Option<String>,
    /// Catalog add/update time, feeds the recency signal
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Hierarchical catalog title: show → seasons → episodes
///
/// Genre tags live at the show level; each episode carries its own locator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub seasons: Vec<Season>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub season_number: u32,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub episode_number: u32,
    #[serde(default)]
    pub media_locator: Option<String>,
}

impl Show {
    /// Lowest playable episode of a single season
    fn first_playable_in(season: &Season) -> Option<(EpisodeRef, &str)> {
        let episode = season
            .episodes
            .iter()
            .filter(|e| e.media_locator.is_some())
            .min_by_key(|e| e.episode_number)?;
        let locator = episode.media_locator.as_deref()?;
        Some((
            EpisodeRef::new(season.season_number, episode.episode_number),
            locator,
        ))
    }

    /// First playable episode of the show: lowest season, then lowest episode
    /// number among episodes with a resolvable locator
    pub fn first_playable_episode(&self) -> Option<(EpisodeRef, &str)> {
        let mut seasons: Vec<&Season> = self.seasons.iter().collect();
        seasons.sort_by_key(|s| s.season_number);
        seasons.into_iter().find_map(Self::first_playable_in)
    }

    /// Resolves the episode to continue with after `after`
    ///
    /// Prefers the following episode number in the same season when it exists
    /// and is playable; otherwise falls over to the first playable episode of
    /// the nearest following season. `None` means the show is exhausted.
    pub fn next_episode_after(&self, after: EpisodeRef) -> Option<(EpisodeRef, &str)> {
        if let Some(season) = self
            .seasons
            .iter()
            .find(|s| s.season_number == after.season_number)
        {
            if let Some(episode) = season
                .episodes
                .iter()
                .find(|e| e.episode_number == after.episode_number + 1)
            {
                if let Some(locator) = episode.media_locator.as_deref() {
                    return Some((
                        EpisodeRef::new(season.season_number, episode.episode_number),
                        locator,
                    ));
                }
            }
        }

        self.seasons
            .iter()
            .filter(|s| s.season_number > after.season_number)
            .min_by_key(|s| s.season_number)
            .and_then(Self::first_playable_in)
    }

    /// Iterates every (episode ref, locator) pair the show can play
    pub fn playable_episodes(&self) -> impl Iterator<Item = (EpisodeRef, &str)> {
        self.seasons.iter().flat_map(|season| {
            season.episodes.iter().filter_map(move |episode| {
                episode.media_locator.as_deref().map(|locator| {
                    (
                        EpisodeRef::new(season.season_number, episode.episode_number),
                        locator,
                    )
                })
            })
        })
    }
}

/// A catalog title of either shape
///
/// The two stores return concrete `Movie`/`Show` documents; pipeline stages
/// that treat both uniformly (popularity ranking, catalog-order fallback)
/// work through this enum and its shared accessors.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogItem {
    Movie(Movie),
    Show(Show),
}

impl CatalogItem {
    pub fn id(&self) -> &str {
        match self {
            CatalogItem::Movie(m) => &m.id,
            CatalogItem::Show(s) => &s.id,
        }
    }

    pub fn kind(&self) -> CandidateKind {
        match self {
            CatalogItem::Movie(_) => CandidateKind::Movie,
            CatalogItem::Show(_) => CandidateKind::Tv,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CatalogItem::Movie(m) => &m.title,
            CatalogItem::Show(s) => &s.title,
        }
    }

    pub fn genres(&self) -> &[String] {
        match self {
            CatalogItem::Movie(m) => &m.genres,
            CatalogItem::Show(s) => &s.genres,
        }
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        match self {
            CatalogItem::Movie(m) => m.last_updated,
            CatalogItem::Show(s) => s.last_updated,
        }
    }

    /// The unit playback would start with: a movie's own file, or the first
    /// playable episode of a show. `None` when nothing is playable.
    pub fn first_playable(&self) -> Option<Playable> {
        match self {
            CatalogItem::Movie(m) => m.media_locator.clone().map(|locator| Playable {
                locator,
                episode: None,
            }),
            CatalogItem::Show(s) => {
                s.first_playable_episode()
                    .map(|(episode, locator)| Playable {
                        locator: locator.to_string(),
                        episode: Some(episode),
                    })
            }
        }
    }

    /// The unit following `after`; movies have no follow-up unit
    pub fn next_playable(&self, after: EpisodeRef) -> Option<Playable> {
        match self {
            CatalogItem::Movie(_) => None,
            CatalogItem::Show(s) => s.next_episode_after(after).map(|(episode, locator)| {
                Playable {
                    locator: locator.to_string(),
                    episode: Some(episode),
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show_with_two_seasons() -> Show {
        Show {
            id: "show-x".to_string(),
            title: "Show X".to_string(),
            genres: vec!["drama".to_string()],
            seasons: vec![
                Season {
                    season_number: 1,
                    episodes: vec![
                        Episode {
                            episode_number: 1,
                            media_locator: Some("/media/show-x/s1e1.mp4".to_string()),
                        },
                        Episode {
                            episode_number: 2,
                            media_locator: Some("/media/show-x/s1e2.mp4".to_string()),
                        },
                        Episode {
                            episode_number: 3,
                            media_locator: Some("/media/show-x/s1e3.mp4".to_string()),
                        },
                    ],
                },
                Season {
                    season_number: 2,
                    episodes: vec![
                        Episode {
                            episode_number: 1,
                            media_locator: Some("/media/show-x/s2e1.mp4".to_string()),
                        },
                        Episode {
                            episode_number: 2,
                            media_locator: Some("/media/show-x/s2e2.mp4".to_string()),
                        },
                    ],
                },
            ],
            last_updated: None,
        }
    }

    #[test]
    fn test_episode_ref_ordering_is_lexicographic() {
        assert!(EpisodeRef::new(1, 9) < EpisodeRef::new(2, 1));
        assert!(EpisodeRef::new(2, 1) < EpisodeRef::new(2, 2));
        assert_eq!(
            [
                EpisodeRef::new(2, 1),
                EpisodeRef::new(1, 3),
                EpisodeRef::new(1, 1)
            ]
            .iter()
            .max(),
            Some(&EpisodeRef::new(2, 1))
        );
    }

    #[test]
    fn test_next_episode_within_season() {
        let show = show_with_two_seasons();
        let (episode, locator) = show.next_episode_after(EpisodeRef::new(1, 1)).unwrap();
        assert_eq!(episode, EpisodeRef::new(1, 2));
        assert_eq!(locator, "/media/show-x/s1e2.mp4");
    }

    #[test]
    fn test_next_episode_rolls_into_next_season() {
        let show = show_with_two_seasons();
        let (episode, locator) = show.next_episode_after(EpisodeRef::new(1, 3)).unwrap();
        assert_eq!(episode, EpisodeRef::new(2, 1));
        assert_eq!(locator, "/media/show-x/s2e1.mp4");
    }

    #[test]
    fn test_next_episode_after_final_episode_is_none() {
        let show = show_with_two_seasons();
        assert_eq!(show.next_episode_after(EpisodeRef::new(2, 2)), None);
    }

    #[test]
    fn test_next_episode_skips_unplayable_successor() {
        let mut show = show_with_two_seasons();
        // S1E2 loses its locator: continuation falls over to season 2
        show.seasons[0].episodes[1].media_locator = None;
        let (episode, _) = show.next_episode_after(EpisodeRef::new(1, 1)).unwrap();
        assert_eq!(episode, EpisodeRef::new(2, 1));
    }

    #[test]
    fn test_first_playable_episode_skips_missing_locators() {
        let mut show = show_with_two_seasons();
        show.seasons[0].episodes[0].media_locator = None;
        let (episode, locator) = show.first_playable_episode().unwrap();
        assert_eq!(episode, EpisodeRef::new(1, 2));
        assert_eq!(locator, "/media/show-x/s1e2.mp4");
    }

    #[test]
    fn test_catalog_item_shared_accessors() {
        let movie = Movie {
            id: "movie-1".to_string(),
            title: "Heat".to_string(),
            genres: vec!["crime".to_string()],
            media_locator: Some("/media/movies/heat.mp4".to_string()),
            last_updated: None,
        };
        let item = CatalogItem::Movie(movie);
        assert_eq!(item.id(), "movie-1");
        assert_eq!(item.title(), "Heat");
        assert_eq!(item.genres(), ["crime".to_string()]);

        let playable = item.first_playable().unwrap();
        assert_eq!(playable.locator, "/media/movies/heat.mp4");
        assert_eq!(playable.episode, None);
        assert_eq!(item.next_playable(EpisodeRef::new(1, 1)), None);
    }

    #[test]
    fn test_catalog_item_show_first_playable() {
        let item = CatalogItem::Show(show_with_two_seasons());
        let playable = item.first_playable().unwrap();
        assert_eq!(playable.episode, Some(EpisodeRef::new(1, 1)));
        assert_eq!(playable.locator, "/media/show-x/s1e1.mp4");
    }

    #[test]
    fn test_movie_fixture_json_field_names() {
        let json = r#"{
            "id": "movie-1",
            "title": "Heat",
            "genres": ["crime", "thriller"],
            "mediaLocator": "/media/movies/heat.mp4",
            "lastUpdated": "2024-06-01T00:00:00Z"
        }"#;
        let movie: Movie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.media_locator.as_deref(), Some("/media/movies/heat.mp4"));
        assert!(movie.last_updated.is_some());
    }
}

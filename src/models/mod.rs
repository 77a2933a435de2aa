pub mod catalog;
pub mod history;
pub mod recommendation;

pub use catalog::{CatalogItem, Episode, EpisodeRef, Movie, Playable, Season, Show};
pub use history::{WatchHistoryRecord, WatchedEntry};
pub use recommendation::{Candidate, CandidateKind, CountResponse, Pagination, RecommendationResult};

pub mod affinity;
pub mod candidates;
pub mod dedupe;
pub mod diversity;
pub mod pagination;
pub mod recommendations;
pub mod scoring;

pub use affinity::TasteProfile;
pub use recommendations::{EngineConfig, RecommendationEngine};
pub use scoring::{ScoringEngine, ScoringWeights};

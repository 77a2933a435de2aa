use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::{CacheKey, CatalogStore, ResultCache, WatchHistoryStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    Candidate, CatalogItem, CountResponse, Pagination, RecommendationResult, WatchHistoryRecord,
};
use crate::services::affinity::{self, TasteProfile};
use crate::services::candidates::{self, CANDIDATE_FETCH_CAP};
use crate::services::dedupe;
use crate::services::diversity;
use crate::services::pagination;
use crate::services::scoring::{ScoringEngine, ScoringWeights};

/// Page size when the caller does not specify one
pub const DEFAULT_PAGE_LIMIT: usize = 30;

/// Largest page size the API accepts
pub const MAX_PAGE_LIMIT: usize = 100;

/// Engine tunables, lifted from [`crate::config::Config`] at startup
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Share of each personalized page reserved for low-scored discovery picks
    pub diversity_ratio: f64,
    pub cache_ttl_seconds: u64,
    /// Serve inert sample entries instead of an error when the catalog
    /// yields nothing at all
    pub pad_empty_results: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            diversity_ratio: 0.2,
            cache_ttl_seconds: 300,
            pad_empty_results: false,
        }
    }
}

/// Per-request state handed to each fallback tier
///
/// `remaining` is what is still missing from the accumulation goal of
/// `(page + 1) * limit` when the tier runs. `chosen_ids` carries the source
/// ids accumulated by earlier tiers so later tiers never offer the same
/// title again.
struct TierContext<'a> {
    profile: &'a TasteProfile,
    page: usize,
    limit: usize,
    remaining: usize,
    chosen_ids: HashSet<String>,
    now: DateTime<Utc>,
}

impl TierContext<'_> {
    /// Ids a tier must not offer: already accumulated plus recently watched
    fn excluded_ids(&self) -> HashSet<String> {
        let mut excluded = self.chosen_ids.clone();
        excluded.extend(self.profile.watched_movie_ids.iter().cloned());
        excluded.extend(self.profile.watched_show_ids.iter().cloned());
        excluded
    }

    fn is_watched_locator(&self, candidate: &Candidate) -> bool {
        candidate
            .media_locator
            .as_deref()
            .is_some_and(|locator| self.profile.watched_locators.contains(locator))
    }
}

/// What one tier produced
struct TierYield {
    candidates: Vec<Candidate>,
    /// Size of the protected personalized head, reported only by the
    /// personalized tier; drives the interleave boundary at page assembly
    personalized_count: Option<usize>,
}

impl TierYield {
    fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            personalized_count: None,
        }
    }
}

/// One strategy in the fallback cascade
///
/// Tiers run in order until the page quota is met. A tier signals "nothing
/// for this user" with an empty yield; an `Err` means its data source failed
/// and the driver logs it and moves on.
#[async_trait::async_trait]
trait RecommendationTier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, ctx: &TierContext<'_>) -> AppResult<TierYield>;
}

/// Tier 1: taste-driven picks from both candidate streams
struct PersonalizedTier {
    catalog: Arc<dyn CatalogStore>,
    scoring: ScoringEngine,
    diversity_ratio: f64,
}

#[async_trait::async_trait]
impl RecommendationTier for PersonalizedTier {
    fn name(&self) -> &'static str {
        "personalized"
    }

    async fn attempt(&self, ctx: &TierContext<'_>) -> AppResult<TierYield> {
        // No history, or history that resolved to zero genres, means there
        // is nothing to personalize against
        if !ctx.profile.has_watched || ctx.profile.genres.is_empty() {
            tracing::debug!("No usable taste profile, personalized tier idle");
            return Ok(TierYield::empty());
        }

        let assembled =
            candidates::assemble(self.catalog.as_ref(), ctx.profile, ctx.page, ctx.limit).await;
        let mut pool = dedupe::dedupe(assembled);
        pool.retain(|candidate| !ctx.is_watched_locator(candidate));

        self.scoring.score_all(&mut pool, ctx.profile, ctx.now);
        let (high, low) = diversity::partition(pool);
        let outcome = diversity::select(high, low, self.diversity_ratio, ctx.remaining);

        Ok(TierYield {
            candidates: outcome.items,
            personalized_count: Some(outcome.personalized_count),
        })
    }
}

/// Tier 2: most-watched titles across all users
struct PopularityTier {
    catalog: Arc<dyn CatalogStore>,
    history: Arc<dyn WatchHistoryStore>,
    scoring: ScoringEngine,
}

/// A movie counts its own locator; a show counts the sum over its episodes
fn item_watch_count(item: &CatalogItem, counts: &HashMap<String, u64>) -> u64 {
    match item {
        CatalogItem::Movie(movie) => movie
            .media_locator
            .as_deref()
            .and_then(|locator| counts.get(locator))
            .copied()
            .unwrap_or(0),
        CatalogItem::Show(show) => show
            .playable_episodes()
            .filter_map(|(_, locator)| counts.get(locator))
            .sum(),
    }
}

#[async_trait::async_trait]
impl RecommendationTier for PopularityTier {
    fn name(&self) -> &'static str {
        "popularity"
    }

    async fn attempt(&self, ctx: &TierContext<'_>) -> AppResult<TierYield> {
        let counts = self.history.global_watch_counts().await?;
        let excluded = ctx.excluded_ids();

        let (movies, shows) = tokio::join!(
            self.catalog.movies_excluding(&excluded, CANDIDATE_FETCH_CAP),
            self.catalog.shows_excluding(&excluded, CANDIDATE_FETCH_CAP),
        );

        let mut ranked: Vec<(u64, CatalogItem)> = movies?
            .into_iter()
            .map(CatalogItem::Movie)
            .chain(shows?.into_iter().map(CatalogItem::Show))
            .map(|item| (item_watch_count(&item, &counts), item))
            .collect();
        ranked.sort_by(|(count_a, a), (count_b, b)| {
            count_b
                .cmp(count_a)
                .then_with(|| a.kind().cmp(&b.kind()))
                .then_with(|| a.title().cmp(b.title()))
        });

        let mut chosen = Vec::new();
        for (count, item) in ranked {
            if chosen.len() >= ctx.remaining {
                break;
            }
            let Some(mut candidate) = candidates::from_catalog_item(&item) else {
                continue;
            };
            if ctx.is_watched_locator(&candidate) {
                continue;
            }
            candidate.watch_count = Some(count);
            chosen.push(candidate);
        }

        self.scoring.score_all(&mut chosen, ctx.profile, ctx.now);
        Ok(TierYield {
            candidates: chosen,
            personalized_count: None,
        })
    }
}

/// Tier 3: deterministic spread over the catalog's title order
///
/// The last resort when nothing personalized or popular is left. Deeper
/// pages skip further into the title order so consecutive pages do not
/// repeat themselves.
struct CatalogTier {
    catalog: Arc<dyn CatalogStore>,
    scoring: ScoringEngine,
}

#[async_trait::async_trait]
impl RecommendationTier for CatalogTier {
    fn name(&self) -> &'static str {
        "catalog-order"
    }

    async fn attempt(&self, ctx: &TierContext<'_>) -> AppResult<TierYield> {
        let skip = ctx.page.saturating_mul(ctx.limit.div_ceil(2));
        let fetch = ctx
            .remaining
            .saturating_add(ctx.limit)
            .min(CANDIDATE_FETCH_CAP);

        let (movies, shows) = tokio::join!(
            self.catalog.movies_page(skip, fetch),
            self.catalog.shows_page(skip, fetch),
        );

        let mut items: Vec<CatalogItem> = movies?
            .into_iter()
            .map(CatalogItem::Movie)
            .chain(shows?.into_iter().map(CatalogItem::Show))
            .collect();
        items.sort_by(|a, b| {
            a.title()
                .cmp(b.title())
                .then_with(|| a.kind().cmp(&b.kind()))
        });

        let excluded = ctx.excluded_ids();
        let mut chosen = Vec::new();
        for item in items {
            if chosen.len() >= ctx.remaining {
                break;
            }
            if excluded.contains(item.id()) {
                continue;
            }
            let Some(candidate) = candidates::from_catalog_item(&item) else {
                continue;
            };
            if ctx.is_watched_locator(&candidate) {
                continue;
            }
            chosen.push(candidate);
        }

        self.scoring.score_all(&mut chosen, ctx.profile, ctx.now);
        Ok(TierYield {
            candidates: chosen,
            personalized_count: None,
        })
    }
}

/// The recommendation pipeline behind the public API
///
/// Wires profile extraction, the fallback cascade and result caching over
/// injected stores. One instance is shared across all requests.
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogStore>,
    history: Arc<dyn WatchHistoryStore>,
    cache: Arc<dyn ResultCache>,
    config: EngineConfig,
    tiers: Vec<Box<dyn RecommendationTier>>,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        history: Arc<dyn WatchHistoryStore>,
        cache: Arc<dyn ResultCache>,
        config: EngineConfig,
    ) -> Self {
        let scoring = ScoringEngine::new(ScoringWeights::default());
        let tiers: Vec<Box<dyn RecommendationTier>> = vec![
            Box::new(PersonalizedTier {
                catalog: Arc::clone(&catalog),
                scoring,
                diversity_ratio: config.diversity_ratio,
            }),
            Box::new(PopularityTier {
                catalog: Arc::clone(&catalog),
                history: Arc::clone(&history),
                scoring,
            }),
            Box::new(CatalogTier {
                catalog: Arc::clone(&catalog),
                scoring,
            }),
        ];
        Self {
            catalog,
            history,
            cache,
            config,
            tiers,
        }
    }

    /// One page of recommendations for a user
    ///
    /// Never fails: any error inside the pipeline is logged and folded into
    /// a result whose `error` field carries the message and whose item list
    /// is empty. `limit` is clamped into `[1, MAX_PAGE_LIMIT]`.
    pub async fn get_recommendations(
        &self,
        user_id: &str,
        page: usize,
        limit: usize,
    ) -> RecommendationResult {
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        match self.cached_recommendations(user_id, page, limit).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    page,
                    error = %e,
                    "Recommendation pipeline failed"
                );
                RecommendationResult::failure(e.to_string(), page, limit)
            }
        }
    }

    /// Count-only projection of the same computation
    ///
    /// Shares the cache with [`Self::get_recommendations`], so a count probe
    /// warms the page and vice versa.
    pub async fn count_recommendations(
        &self,
        user_id: &str,
        page: usize,
        limit: usize,
    ) -> CountResponse {
        let result = self.get_recommendations(user_id, page, limit).await;
        CountResponse {
            count: result.pagination.total_items,
        }
    }

    async fn cached_recommendations(
        &self,
        user_id: &str,
        page: usize,
        limit: usize,
    ) -> AppResult<RecommendationResult> {
        // A failed history read downgrades the request to the fallback
        // tiers instead of failing it
        let record = match self.history.record_for_user(user_id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Watch history read failed, serving fallback"
                );
                None
            }
        };

        let latest_watch = record.as_ref().and_then(|r| r.latest_watch());
        let key = CacheKey::new(user_id, latest_watch, page, limit);
        crate::cached!(
            self.cache,
            key,
            self.config.cache_ttl_seconds,
            self.run_cascade(user_id, record.as_ref(), page, limit)
        )
    }

    async fn run_cascade(
        &self,
        user_id: &str,
        record: Option<&WatchHistoryRecord>,
        page: usize,
        limit: usize,
    ) -> AppResult<RecommendationResult> {
        // Snapshot the clock once so every candidate decays against the
        // same instant
        let now = Utc::now();

        // 1. Resolve the taste profile; a failed catalog join degrades to
        //    the no-history profile
        let profile = match affinity::build_profile(self.catalog.as_ref(), record).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Profile extraction failed, continuing without history"
                );
                TasteProfile::no_history()
            }
        };

        // 2. Walk the tiers until the page quota is covered or every tier
        //    has been heard
        let needed = page.saturating_add(1).saturating_mul(limit);
        let mut accumulated: Vec<Candidate> = Vec::new();
        let mut personalized_count = 0usize;
        let mut last_error: Option<AppError> = None;

        for tier in &self.tiers {
            if accumulated.len() >= needed {
                break;
            }
            let ctx = TierContext {
                profile: &profile,
                page,
                limit,
                remaining: needed - accumulated.len(),
                chosen_ids: accumulated.iter().map(|c| c.source_id.clone()).collect(),
                now,
            };
            match tier.attempt(&ctx).await {
                Ok(tier_yield) => {
                    if let Some(count) = tier_yield.personalized_count {
                        personalized_count = count;
                    }
                    let before = accumulated.len();
                    accumulated.extend(tier_yield.candidates);
                    accumulated = dedupe::dedupe(accumulated);
                    tracing::info!(
                        tier = tier.name(),
                        added = accumulated.len() - before,
                        total = accumulated.len(),
                        needed,
                        "Tier completed"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        tier = tier.name(),
                        error = %e,
                        "Tier failed, continuing cascade"
                    );
                    last_error = Some(e);
                }
            }
        }

        // 3. Nothing anywhere: padded samples when configured, otherwise
        //    surface the most recent tier error
        if accumulated.is_empty() {
            if self.config.pad_empty_results {
                tracing::info!(
                    user_id = %user_id,
                    "Catalog yielded nothing, serving placeholder page"
                );
                return Ok(RecommendationResult {
                    items: pagination::placeholder_page(limit),
                    has_watched: profile.has_watched,
                    genres: profile.genres,
                    pagination: Pagination::new(page, needed, limit),
                    error: None,
                });
            }
            return Err(last_error.unwrap_or_else(|| {
                AppError::Internal("no eligible titles in catalog".to_string())
            }));
        }

        // 4. Order, interleave and slice the requested page
        let total_items = accumulated.len();
        let items = pagination::paginate(accumulated, personalized_count, page, limit);
        tracing::info!(
            user_id = %user_id,
            page,
            limit,
            total_items,
            returned = items.len(),
            has_watched = profile.has_watched,
            "Recommendations assembled"
        );

        Ok(RecommendationResult {
            items,
            has_watched: profile.has_watched,
            genres: profile.genres,
            pagination: Pagination::new(page, total_items, limit),
            error: None,
        })
    }
}

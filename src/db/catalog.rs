use std::collections::HashSet;

use crate::error::AppResult;
use crate::models::{Movie, Show};

/// Read-only access to the two catalog collections
///
/// The production document store lives outside this service and plugs in
/// through this trait; the in-memory implementation in `db::memory` backs the
/// binary and the test suite. Implementations must return deterministic
/// ordering for a fixed catalog: `*_page` is title-ascending, the other
/// queries preserve catalog order.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Movies whose locator appears in `locators`
    async fn movies_by_locators(&self, locators: &[String]) -> AppResult<Vec<Movie>>;

    /// Shows with at least one episode locator in `locators`
    async fn shows_by_locators(&self, locators: &[String]) -> AppResult<Vec<Show>>;

    /// Movies sharing at least one genre, excluding `exclude_ids`, up to `limit`
    async fn movies_by_genres(
        &self,
        genres: &[String],
        exclude_ids: &HashSet<String>,
        limit: usize,
    ) -> AppResult<Vec<Movie>>;

    /// Shows sharing at least one genre, excluding `exclude_ids`, up to `limit`
    async fn shows_by_genres(
        &self,
        genres: &[String],
        exclude_ids: &HashSet<String>,
        limit: usize,
    ) -> AppResult<Vec<Show>>;

    /// All movies except `exclude_ids`, up to `limit`
    async fn movies_excluding(
        &self,
        exclude_ids: &HashSet<String>,
        limit: usize,
    ) -> AppResult<Vec<Movie>>;

    /// All shows except `exclude_ids`, up to `limit`
    async fn shows_excluding(
        &self,
        exclude_ids: &HashSet<String>,
        limit: usize,
    ) -> AppResult<Vec<Show>>;

    /// Title-ascending movie page: skip `skip`, take `limit`
    async fn movies_page(&self, skip: usize, limit: usize) -> AppResult<Vec<Movie>>;

    /// Title-ascending show page: skip `skip`, take `limit`
    async fn shows_page(&self, skip: usize, limit: usize) -> AppResult<Vec<Show>>;
}

//! Persistence abstraction over rate records.

use crate::core::rate::{NewRate, Rate, RateId};
use crate::error::Result;
use async_trait::async_trait;

/// Storage for rate records.
///
/// Every write is validated before it is applied. Backends are safe to share
/// between the request path and the background synchronizer; each call is atomic
/// on its own, but no isolation is provided across calls.
///
/// Pair uniqueness is not enforced here. Callers that need it look the pair up
/// before creating, which leaves a window where two concurrent creations of the
/// same pair both succeed. `find_by_currencies` then answers with the oldest one.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Validates and persists a new rate, returning it with its assigned id.
    async fn create(&self, rate: NewRate) -> Result<Rate>;

    async fn find(&self, id: RateId) -> Result<Rate>;

    /// Exact ordered lookup; `(b, a)` is never answered with the `(a, b)` record.
    async fn find_by_currencies(&self, first: &str, second: &str) -> Result<Rate>;

    /// Snapshot of every stored rate, ordered by id.
    async fn find_all(&self) -> Result<Vec<Rate>>;

    /// Replaces the value, timestamp and currencies of an existing rate.
    async fn update(&self, rate: &Rate) -> Result<()>;
}

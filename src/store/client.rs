use super::{NearbyPoint, RadiusQuery, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait ForecastStore: Send + Sync {
    /// Reads every field of the hash at `key`. A missing key yields an empty map.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Members of the geo set within the query radius, nearest first.
    async fn geo_radius(&self, query: &RadiusQuery) -> Result<Vec<NearbyPoint>, StoreError>;
}

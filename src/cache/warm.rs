use std::time::Duration;

use super::backend::CacheBackend;

/// Optional startup preload source (supplemental — SPEC_FULL §4). Not part
/// of the distilled Query Cache contract; grounded in
/// `contracts/.../cache.rs::CacheWarmer`, adapted to a synchronous trait
/// since this crate carries no async runtime.
pub trait CacheWarmer<V: Clone + Send + Sync> {
    fn name(&self) -> &str;
    fn entries(&self) -> anyhow::Result<Vec<(String, V, Option<Duration>)>>;
}

/// Runs every warmer against `backend`, logging and continuing past
/// individual warmer failures rather than aborting the batch.
pub fn warm_cache<V: Clone + Send + Sync>(
    backend: &dyn CacheBackend<V>,
    warmers: &[Box<dyn CacheWarmer<V>>],
) {
    for warmer in warmers {
        match warmer.entries() {
            Ok(entries) => {
                for (key, value, ttl) in entries {
                    backend.set(&key, value, ttl);
                }
                tracing::info!(warmer = warmer.name(), "cache warmed");
            }
            Err(err) => {
                tracing::warn!(warmer = warmer.name(), error = %err, "cache warmer failed");
            }
        }
    }
}

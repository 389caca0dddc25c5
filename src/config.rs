use std::time::Duration;

use crate::eviction::EvictionStrategyKind;

/// Memory monitor tuning (spec §6, §4.7).
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryConfig {
    pub limit_mb: f64,
    pub warning_ratio: f64,
    pub critical_ratio: f64,
    pub batch_size: usize,
    pub strategy: EvictionStrategyKind,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            limit_mb: 1000.0,
            warning_ratio: 0.8,
            critical_ratio: 0.95,
            batch_size: 100,
            strategy: EvictionStrategyKind::Lru,
        }
    }
}

/// Query cache level configuration: a memory (LRU) level followed by a TTL
/// level, matching the default stack in spec §4.4.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCacheConfig {
    pub lru_capacity: usize,
    pub ttl_capacity: usize,
    pub ttl_default: Duration,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            lru_capacity: 1000,
            ttl_capacity: 10_000,
            ttl_default: Duration::from_secs(1800),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    pub history: usize,
    pub sampler_period: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            history: 1000,
            sampler_period: Duration::from_secs(30),
        }
    }
}

/// Top-level engine configuration. All fields have the defaults listed in
/// spec §6; every field is optional to override.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub memory: MemoryConfig,
    pub query_cache: QueryCacheConfig,
    pub adjacency_cache_cap: usize,
    pub access_tracker_cap: usize,
    pub metrics: MetricsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::default(),
            query_cache: QueryCacheConfig::default(),
            adjacency_cache_cap: 1000,
            access_tracker_cap: 10_000,
            metrics: MetricsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Overlay a handful of tunables from the environment, following the
    /// teacher's `PoolConfig::from_env` pattern. Unset or unparsable
    /// variables leave the default untouched.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(raw) = std::env::var("FABRIC_GRAPH_MEMORY_LIMIT_MB") {
            if let Ok(v) = raw.parse::<f64>() {
                cfg.memory.limit_mb = v;
            }
        }

        if let Ok(raw) = std::env::var("FABRIC_GRAPH_SAMPLER_PERIOD_S") {
            if let Ok(v) = raw.parse::<u64>() {
                cfg.metrics.sampler_period = Duration::from_secs(v);
            }
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.memory.limit_mb, 1000.0);
        assert_eq!(cfg.memory.warning_ratio, 0.8);
        assert_eq!(cfg.memory.critical_ratio, 0.95);
        assert_eq!(cfg.memory.batch_size, 100);
        assert_eq!(cfg.query_cache.lru_capacity, 1000);
        assert_eq!(cfg.query_cache.ttl_capacity, 10_000);
        assert_eq!(cfg.query_cache.ttl_default, Duration::from_secs(1800));
        assert_eq!(cfg.adjacency_cache_cap, 1000);
        assert_eq!(cfg.access_tracker_cap, 10_000);
        assert_eq!(cfg.metrics.history, 1000);
        assert_eq!(cfg.metrics.sampler_period, Duration::from_secs(30));
    }

    #[test]
    fn from_env_overrides_only_set_vars() {
        std::env::set_var("FABRIC_GRAPH_MEMORY_LIMIT_MB", "2048");
        std::env::remove_var("FABRIC_GRAPH_SAMPLER_PERIOD_S");

        let cfg = EngineConfig::from_env();
        assert_eq!(cfg.memory.limit_mb, 2048.0);
        assert_eq!(cfg.metrics.sampler_period, Duration::from_secs(30));

        std::env::remove_var("FABRIC_GRAPH_MEMORY_LIMIT_MB");
    }
}

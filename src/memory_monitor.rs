use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::access_tracker::AccessTracker;
use crate::config::MemoryConfig;
use crate::eviction::{strategy_for, EvictableGraph, EvictionStrategy, EvictionStrategyKind};

/// Snapshot of process/system memory usage. Falls back to all-zero fields
/// when the sampling facility is unavailable, mirroring
/// `MemoryUsageStats.capture_current`'s `psutil`-unavailable degradation in
/// `memory_management.py`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsageStats {
    pub total_memory_mb: f64,
    pub used_memory_mb: f64,
    pub available_memory_mb: f64,
    pub memory_percent: f64,
    pub process_memory_mb: f64,
}

impl Default for MemoryUsageStats {
    fn default() -> Self {
        Self {
            total_memory_mb: 0.0,
            used_memory_mb: 0.0,
            available_memory_mb: 0.0,
            memory_percent: 0.0,
            process_memory_mb: 0.0,
        }
    }
}

impl MemoryUsageStats {
    /// Captures current usage by reading `/proc/self/status` and
    /// `/proc/meminfo` on Linux. Any failure (missing files, non-Linux
    /// platform, parse errors) yields the zeroed default rather than an
    /// error, matching the source's best-effort contract.
    pub fn capture_current() -> Self {
        read_proc_stats().unwrap_or_else(|| {
            tracing::warn!("memory sampling facility unavailable, returning zeroed stats");
            Self::default()
        })
    }

    pub fn is_over_limit(&self, limit_mb: f64) -> bool {
        self.process_memory_mb > limit_mb
    }
}

#[cfg(target_os = "linux")]
fn read_proc_stats() -> Option<MemoryUsageStats> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let process_kb = status.lines().find_map(|l| {
        l.strip_prefix("VmRSS:")
            .and_then(|rest| rest.trim().split_whitespace().next())
            .and_then(|v| v.parse::<f64>().ok())
    })?;

    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    let mut total_kb = 0.0;
    let mut available_kb = 0.0;
    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total_kb = rest.trim().split_whitespace().next()?.parse().ok()?;
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available_kb = rest.trim().split_whitespace().next()?.parse().ok()?;
        }
    }

    let used_kb = (total_kb - available_kb).max(0.0);
    let memory_percent = if total_kb > 0.0 {
        (used_kb / total_kb) * 100.0
    } else {
        0.0
    };

    Some(MemoryUsageStats {
        total_memory_mb: total_kb / 1024.0,
        used_memory_mb: used_kb / 1024.0,
        available_memory_mb: available_kb / 1024.0,
        memory_percent,
        process_memory_mb: process_kb / 1024.0,
    })
}

#[cfg(not(target_os = "linux"))]
fn read_proc_stats() -> Option<MemoryUsageStats> {
    None
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EvictionStats {
    pub eviction_count: u64,
    pub total_nodes_evicted: u64,
    pub last_eviction_time: f64,
    pub current_strategy: EvictionStrategyKind,
    pub memory_limit_mb: f64,
    pub warning_ratio: f64,
    pub critical_ratio: f64,
    pub batch_size: usize,
}

/// Samples memory usage and triggers eviction when limits are exceeded
/// (C7). Delegates id selection to the configured `EvictionStrategy` (C6)
/// and bookkeeping to the shared `AccessTracker` (C5).
pub struct MemoryMonitor {
    config: MemoryConfig,
    strategy: Mutex<(EvictionStrategyKind, Box<dyn EvictionStrategy + Send + Sync>)>,
    eviction_count: AtomicU64,
    total_nodes_evicted: AtomicU64,
    last_eviction_time: Mutex<f64>,
}

impl MemoryMonitor {
    pub fn new(config: MemoryConfig) -> Self {
        let kind = config.strategy;
        Self {
            config,
            strategy: Mutex::new((kind, strategy_for(kind))),
            eviction_count: AtomicU64::new(0),
            total_nodes_evicted: AtomicU64::new(0),
            last_eviction_time: Mutex::new(0.0),
        }
    }

    pub fn set_strategy(&self, kind: EvictionStrategyKind) {
        let mut guard = self.strategy.lock().expect("monitor strategy mutex poisoned");
        *guard = (kind, strategy_for(kind));
    }

    pub fn current_strategy(&self) -> EvictionStrategyKind {
        self.strategy.lock().expect("monitor strategy mutex poisoned").0
    }

    pub fn sample(&self) -> MemoryUsageStats {
        MemoryUsageStats::capture_current()
    }

    pub fn should_evict(&self, stats: Option<MemoryUsageStats>) -> bool {
        let stats = stats.unwrap_or_else(|| self.sample());
        stats.is_over_limit(self.config.limit_mb * self.config.warning_ratio)
    }

    /// Runs one eviction pass. Returns the number of nodes actually
    /// removed. Per-id failures are logged and skipped (spec §7
    /// EvictionFailure); the loop always runs to completion.
    pub fn evict(
        &self,
        graph: &dyn EvictableGraph,
        tracker: &AccessTracker,
        force: bool,
    ) -> usize {
        let stats = self.sample();

        if !force && !self.should_evict(Some(stats)) {
            return 0;
        }

        let target_count = if stats.is_over_limit(self.config.limit_mb * self.config.critical_ratio)
        {
            self.config.batch_size * 2
        } else {
            self.config.batch_size
        };

        let candidates = {
            let guard = self.strategy.lock().expect("monitor strategy mutex poisoned");
            guard.1.select(graph, tracker, target_count)
        };

        let mut evicted = 0usize;
        for id in candidates {
            match graph.remove_node_from_memory(id) {
                Ok(true) => {
                    tracker.forget(id);
                    evicted += 1;
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(node_id = %id, error = %err, "failed to evict node");
                }
            }
        }

        if evicted > 0 {
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
            self.total_nodes_evicted
                .fetch_add(evicted as u64, Ordering::Relaxed);
            *self
                .last_eviction_time
                .lock()
                .expect("monitor last_eviction_time mutex poisoned") = now_secs();
            tracing::info!(
                evicted,
                strategy = ?self.current_strategy(),
                "evicted nodes from memory"
            );
        }

        evicted
    }

    pub fn eviction_stats(&self) -> EvictionStats {
        EvictionStats {
            eviction_count: self.eviction_count.load(Ordering::Relaxed),
            total_nodes_evicted: self.total_nodes_evicted.load(Ordering::Relaxed),
            last_eviction_time: *self
                .last_eviction_time
                .lock()
                .expect("monitor last_eviction_time mutex poisoned"),
            current_strategy: self.current_strategy(),
            memory_limit_mb: self.config.limit_mb,
            warning_ratio: self.config.warning_ratio,
            critical_ratio: self.config.critical_ratio,
            batch_size: self.config.batch_size,
        }
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

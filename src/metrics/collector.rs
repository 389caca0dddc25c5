use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::sampler::SamplerHandle;
use crate::config::MetricsConfig;

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// A single recorded measurement, mirroring `MetricValue` in
/// `performance_metrics.py`. Used for counters, gauges, and histograms
/// alike — all three share one storage shape in the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricValue {
    pub value: f64,
    pub timestamp: f64,
    pub metadata: serde_json::Value,
}

/// Per-operation timing statistics (C1's "operation timer"). `min_duration`
/// is `None` until the first `update`, matching the source's
/// `min_duration = float('inf')` sentinel — `Timing::to_summary` converts
/// that back to `0.0` the way `PerformanceMetrics.to_dict` does.
#[derive(Debug, Clone, Default)]
pub struct Timing {
    pub operation_count: u64,
    pub total_duration: Duration,
    pub min_duration: Option<Duration>,
    pub max_duration: Duration,
    pub success_count: u64,
    pub error_count: u64,
    pub last_execution: Option<f64>,
}

impl Timing {
    fn update(&mut self, duration: Duration, success: bool) {
        self.operation_count += 1;
        self.total_duration += duration;
        self.min_duration = Some(self.min_duration.map_or(duration, |m| m.min(duration)));
        self.max_duration = self.max_duration.max(duration);
        self.last_execution = Some(now_secs());

        if success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
    }

    pub fn avg_duration(&self) -> Duration {
        if self.operation_count == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.operation_count as u32
        }
    }

    pub fn to_summary(&self) -> OperationMetrics {
        OperationMetrics {
            operation_count: self.operation_count,
            total_duration_s: self.total_duration.as_secs_f64(),
            min_duration_s: self.min_duration.map(|d| d.as_secs_f64()).unwrap_or(0.0),
            max_duration_s: self.max_duration.as_secs_f64(),
            avg_duration_s: self.avg_duration().as_secs_f64(),
            success_count: self.success_count,
            error_count: self.error_count,
            success_rate: if self.operation_count > 0 {
                self.success_count as f64 / self.operation_count as f64
            } else {
                0.0
            },
            last_execution: self.last_execution,
        }
    }
}

/// Plain-data view of [`Timing`] returned to callers, matching
/// `PerformanceMetrics.to_dict`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OperationMetrics {
    pub operation_count: u64,
    pub total_duration_s: f64,
    pub min_duration_s: f64,
    pub max_duration_s: f64,
    pub avg_duration_s: f64,
    pub success_count: u64,
    pub error_count: u64,
    pub success_rate: f64,
    pub last_execution: Option<f64>,
}

/// System resource snapshot: CPU, memory, disk, and network counters.
/// Populated from `/proc` on Linux; on any other platform, or if a
/// particular `/proc` file can't be read, the corresponding field(s) fall
/// back to zero rather than failing the sample, matching `psutil`'s
/// graceful-degradation contract in `performance_metrics.py`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SystemResourceMetrics {
    pub cpu_percent: f64,
    pub memory_usage_mb: f64,
    pub memory_percent: f64,
    pub disk_io_read_mb: f64,
    pub disk_io_write_mb: f64,
    pub network_bytes_sent_mb: f64,
    pub network_bytes_recv_mb: f64,
    pub timestamp: f64,
}

impl SystemResourceMetrics {
    pub fn capture_current() -> Self {
        let stats = crate::memory_monitor::MemoryUsageStats::capture_current();
        let (disk_io_read_mb, disk_io_write_mb) = super::system_probe::disk_io_mb();
        let (network_bytes_recv_mb, network_bytes_sent_mb) = super::system_probe::network_mb();
        Self {
            cpu_percent: super::system_probe::cpu_percent(),
            memory_usage_mb: stats.used_memory_mb,
            memory_percent: stats.memory_percent,
            disk_io_read_mb,
            disk_io_write_mb,
            network_bytes_sent_mb,
            network_bytes_recv_mb,
            timestamp: now_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub uptime_seconds: f64,
    pub total_operations: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    pub operations_per_second: f64,
    pub unique_operations: usize,
    pub system_metrics: Option<SystemResourceMetrics>,
    pub metrics_collection_enabled: bool,
}

pub(super) struct SharedState {
    pub(super) operations: Mutex<HashMap<String, Timing>>,
    pub(super) custom_metrics: Mutex<HashMap<String, VecDeque<MetricValue>>>,
    pub(super) system_metrics: Mutex<VecDeque<SystemResourceMetrics>>,
    pub(super) enabled: AtomicBool,
    pub(super) start_time: Instant,
    pub(super) history_cap: usize,
    pub(super) sampler_period: Duration,
}

/// Centralized metrics collection (C1): operation timers, counters, gauges,
/// histograms, and a background system-resource sampler. Unlike the
/// source's `_global_metrics_collector` singleton (spec §9 Design Notes),
/// this is an explicit value constructed by the caller — the graph engine
/// holds one `Arc<MetricsCollector>` and threads it through.
pub struct MetricsCollector {
    shared: Arc<SharedState>,
    sampler: Mutex<Option<SamplerHandle>>,
}

impl MetricsCollector {
    pub fn new(config: MetricsConfig) -> Self {
        let shared = Arc::new(SharedState {
            operations: Mutex::new(HashMap::new()),
            custom_metrics: Mutex::new(HashMap::new()),
            system_metrics: Mutex::new(VecDeque::with_capacity(config.history)),
            enabled: AtomicBool::new(true),
            start_time: Instant::now(),
            history_cap: config.history,
            sampler_period: config.sampler_period,
        });

        let sampler = SamplerHandle::spawn(Arc::clone(&shared), config.sampler_period);

        Self {
            shared,
            sampler: Mutex::new(Some(sampler)),
        }
    }

    /// Enabling/disabling is atomic from a caller's point of view (spec
    /// §4.8). Disabling actually stops the sampler thread rather than
    /// leaving it polling (spec §5: "MUST terminate when metrics collection
    /// is disabled"); re-enabling spawns a fresh one at the configured
    /// period.
    pub fn set_enabled(&self, enabled: bool) {
        let was_enabled = self.shared.enabled.swap(enabled, Ordering::SeqCst);
        if was_enabled == enabled {
            return;
        }

        let mut sampler = self.sampler.lock().expect("sampler mutex poisoned");
        if enabled {
            if sampler.is_none() {
                *sampler = Some(SamplerHandle::spawn(
                    Arc::clone(&self.shared),
                    self.shared.sampler_period,
                ));
            }
        } else if let Some(handle) = sampler.take() {
            handle.stop();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    pub fn record_operation(
        &self,
        operation_name: &str,
        duration: Duration,
        success: bool,
        metadata: serde_json::Value,
    ) {
        if !self.is_enabled() {
            return;
        }

        let mut operations = self.shared.operations.lock().expect("metrics mutex poisoned");
        operations
            .entry(operation_name.to_string())
            .or_default()
            .update(duration, success);
        drop(operations);

        self.push_custom(
            &format!("{operation_name}_duration"),
            duration.as_secs_f64(),
            metadata,
        );
    }

    /// Times `f`, recording success/failure from `Ok`/`Err` (Rust's
    /// equivalent of the source's "exception raised vs. returned"
    /// distinction) and the error's `Debug` representation on failure.
    pub fn timed<T, E: std::fmt::Debug>(
        &self,
        operation_name: &str,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let start = Instant::now();
        let result = f();
        let duration = start.elapsed();

        match &result {
            Ok(_) => self.record_operation(operation_name, duration, true, serde_json::json!({})),
            Err(err) => self.record_operation(
                operation_name,
                duration,
                false,
                serde_json::json!({ "error_type": format!("{err:?}") }),
            ),
        }

        result
    }

    pub fn increment_counter(&self, counter_name: &str, value: f64, metadata: serde_json::Value) {
        if !self.is_enabled() {
            return;
        }
        let mut custom = self.shared.custom_metrics.lock().expect("metrics mutex poisoned");
        let series = custom.entry(counter_name.to_string()).or_default();
        let current = series.back().map(|v| v.value).unwrap_or(0.0);
        push_bounded(
            series,
            MetricValue {
                value: current + value,
                timestamp: now_secs(),
                metadata,
            },
            self.shared.history_cap,
        );
    }

    pub fn set_gauge(&self, gauge_name: &str, value: f64, metadata: serde_json::Value) {
        self.push_custom(gauge_name, value, metadata);
    }

    pub fn record_histogram(&self, histogram_name: &str, value: f64, metadata: serde_json::Value) {
        self.push_custom(histogram_name, value, metadata);
    }

    fn push_custom(&self, name: &str, value: f64, metadata: serde_json::Value) {
        if !self.is_enabled() {
            return;
        }
        let mut custom = self.shared.custom_metrics.lock().expect("metrics mutex poisoned");
        let series = custom.entry(name.to_string()).or_default();
        push_bounded(
            series,
            MetricValue {
                value,
                timestamp: now_secs(),
                metadata,
            },
            self.shared.history_cap,
        );
    }

    pub fn operation_metrics(&self, operation_name: &str) -> Option<OperationMetrics> {
        let operations = self.shared.operations.lock().expect("metrics mutex poisoned");
        operations.get(operation_name).map(Timing::to_summary)
    }

    pub fn all_operation_metrics(&self) -> HashMap<String, OperationMetrics> {
        let operations = self.shared.operations.lock().expect("metrics mutex poisoned");
        operations
            .iter()
            .map(|(name, timing)| (name.clone(), timing.to_summary()))
            .collect()
    }

    pub fn custom_metric(&self, name: &str, limit: Option<usize>) -> Vec<MetricValue> {
        let custom = self.shared.custom_metrics.lock().expect("metrics mutex poisoned");
        let values = custom.get(name).cloned().unwrap_or_default();
        let values: Vec<MetricValue> = values.into_iter().collect();
        match limit {
            Some(n) if values.len() > n => values[values.len() - n..].to_vec(),
            _ => values,
        }
    }

    pub fn system_metrics(&self, limit: Option<usize>) -> Vec<SystemResourceMetrics> {
        let system = self.shared.system_metrics.lock().expect("metrics mutex poisoned");
        let values: Vec<SystemResourceMetrics> = system.iter().copied().collect();
        match limit {
            Some(n) if values.len() > n => values[values.len() - n..].to_vec(),
            _ => values,
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let operations = self.shared.operations.lock().expect("metrics mutex poisoned");
        let uptime = self.shared.start_time.elapsed().as_secs_f64();
        let total_operations: u64 = operations.values().map(|t| t.operation_count).sum();
        let total_errors: u64 = operations.values().map(|t| t.error_count).sum();
        let unique_operations = operations.len();
        drop(operations);

        let system = self.shared.system_metrics.lock().expect("metrics mutex poisoned");
        let recent_system = system.back().copied();

        MetricsSummary {
            uptime_seconds: uptime,
            total_operations,
            total_errors,
            error_rate: if total_operations > 0 {
                total_errors as f64 / total_operations as f64
            } else {
                0.0
            },
            operations_per_second: if uptime > 0.0 {
                total_operations as f64 / uptime
            } else {
                0.0
            },
            unique_operations,
            system_metrics: recent_system,
            metrics_collection_enabled: self.is_enabled(),
        }
    }

    pub fn reset(&self) {
        self.shared
            .operations
            .lock()
            .expect("metrics mutex poisoned")
            .clear();
        self.shared
            .custom_metrics
            .lock()
            .expect("metrics mutex poisoned")
            .clear();
        self.shared
            .system_metrics
            .lock()
            .expect("metrics mutex poisoned")
            .clear();
    }
}

impl Drop for MetricsCollector {
    fn drop(&mut self) {
        if let Some(handle) = self.sampler.lock().expect("sampler mutex poisoned").take() {
            handle.stop();
        }
    }
}

fn push_bounded<T>(deque: &mut VecDeque<T>, value: T, cap: usize) {
    deque.push_back(value);
    while deque.len() > cap {
        deque.pop_front();
    }
}

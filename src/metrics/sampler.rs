use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::collector::{SharedState, SystemResourceMetrics};

/// Background system-resource sampler bound to the collector's lifetime
/// (spec §9 Design Notes: "bind it to a cancellation handle owned by the
/// collector"). Adapts the source's daemon thread (`_start_system_monitoring`
/// in `performance_metrics.py`) to a cancellable `std::thread` since this
/// crate carries no async runtime. `MetricsCollector::set_enabled` stops
/// this thread outright on disable and spawns a new one on re-enable,
/// rather than leaving it alive and idling (spec §5).
pub(super) struct SamplerHandle {
    stop_tx: mpsc::Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    pub(super) fn spawn(shared: Arc<SharedState>, period: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let join = std::thread::Builder::new()
            .name("fabric-graph-metrics-sampler".into())
            .spawn(move || run(shared, period, stop_rx))
            .expect("failed to spawn metrics sampler thread");

        Self {
            stop_tx,
            join: Some(join),
        }
    }

    pub(super) fn stop(mut self) {
        let _ = self.stop_tx.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run(shared: Arc<SharedState>, period: Duration, stop_rx: mpsc::Receiver<()>) {
    let mut wait = period;
    loop {
        match stop_rx.recv_timeout(wait) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => return,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        let sample = std::panic::catch_unwind(SystemResourceMetrics::capture_current);
        match sample {
            Ok(metrics) => {
                let mut series = shared.system_metrics.lock().expect("metrics mutex poisoned");
                series.push_back(metrics);
                while series.len() > shared.history_cap {
                    series.pop_front();
                }
                wait = period;
            }
            Err(_) => {
                tracing::error!("system metrics sampler failed, backing off");
                wait = period * 2;
            }
        }
    }
}

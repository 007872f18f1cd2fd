//! Lifecycle observers.
//!
//! Components that own sensors report their lifecycle transitions (append,
//! start, stop, close) to a [`LifecycleObserver`] injected at construction.
//! [`TracingObserver`] forwards them to `tracing` at `info` level;
//! [`NoopObserver`] discards them.

use tracing::info;

/// A lifecycle transition reported by a sensor-owning component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A sensor was mounted at `index`.
    Appended { sensor: String, index: usize },
    /// Every owned sensor was started.
    Started { sensors: usize },
    /// Every owned sensor was stopped.
    Stopped { sensors: usize },
    /// The owned sensors were stopped and released.
    Closed { sensors: usize },
}

/// Receives [`LifecycleEvent`]s from `component` (e.g. `"sensor_array"`).
pub trait LifecycleObserver: Send + Sync {
    fn notify(&self, component: &str, event: &LifecycleEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {
    fn notify(&self, _component: &str, _event: &LifecycleEvent) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LifecycleObserver for TracingObserver {
    fn notify(&self, component: &str, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Appended { sensor, index } => {
                info!(component, sensor = %sensor, index, "sensor appended");
            }
            LifecycleEvent::Started { sensors } => {
                info!(component, sensors, "started");
            }
            LifecycleEvent::Stopped { sensors } => {
                info!(component, sensors, "stopped");
            }
            LifecycleEvent::Closed { sensors } => {
                info!(component, sensors, "closed");
            }
        }
    }
}

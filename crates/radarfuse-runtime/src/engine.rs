//! [`PositioningEngine`] – fused position estimation.
//!
//! Owns a [`CompositeSensorArray`] and a [`Clusterer`].  Each call to
//! [`PositioningEngine::positioning`] runs one cycle:
//!
//! 1. **Gather** – poll every mounted sensor and collect the world-frame
//!    cloud from the array.
//! 2. **Cluster** – hand the cloud, the clustering radius and the
//!    [`ClusterOptions`] to the clusterer.
//! 3. **Report** – return the clusterer's centers untouched.
//!
//! The engine never schedules itself.  The caller drives it, typically once
//! per [`PositioningEngine::interval`].
//!
//! # State machine
//!
//! ```text
//!   Stopped ──start()──▶ Running
//!      ▲                    │
//!      └──────stop()────────┘
//! ```
//!
//! Both transitions are idempotent.  `positioning()` is allowed in either
//! state; while stopped the sensors usually report nothing.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use radarfuse_hal::{CompositeSensorArray, NoopObserver, SimSensor};
//! use radarfuse_perception::{ClusterOptions, RigidTransform};
//! use radarfuse_runtime::engine::{PositioningConfig, PositioningEngine};
//! use radarfuse_types::Point3;
//!
//! let mut array = CompositeSensorArray::new(Arc::new(NoopObserver));
//! array.append(
//!     Box::new(SimSensor::new("radar-front").with_frames(vec![vec![Point3::new(1.0, 0.0, 0.0)]])),
//!     RigidTransform::identity(),
//! );
//!
//! let mut engine =
//!     PositioningEngine::new(array, PositioningConfig::default(), Arc::new(NoopObserver)).unwrap();
//! engine.start().unwrap();
//! let positions = engine.positioning(None, &ClusterOptions::default()).unwrap();
//! assert_eq!(positions, vec![Point3::new(1.0, 0.0, 0.0)]);
//! engine.shutdown().unwrap();
//! ```

use std::sync::Arc;
use std::time::Duration;

use radarfuse_hal::{CompositeSensorArray, LifecycleEvent, LifecycleObserver};
use radarfuse_perception::cluster::{check_radius, AgglomerativeClusterer, ClusterOptions, Clusterer};
use radarfuse_types::{FusionError, Point3};
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Clustering radius used when none is configured.
pub const DEFAULT_CLUSTER_RADIUS: f64 = 0.75;

/// Polling interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

const COMPONENT: &str = "positioning_engine";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Construction parameters for [`PositioningEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositioningConfig {
    /// Maximum centroid distance for two detections to fuse.
    pub cluster_radius: f64,
    /// How often the caller is expected to run a positioning cycle.
    pub interval: Duration,
}

impl Default for PositioningConfig {
    fn default() -> Self {
        Self {
            cluster_radius: DEFAULT_CLUSTER_RADIUS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl PositioningConfig {
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidParameter`] for a non-positive or
    /// non-finite radius, or an interval shorter than one millisecond.
    pub fn validate(&self) -> Result<(), FusionError> {
        check_radius(self.cluster_radius)?;
        if self.interval < Duration::from_millis(1) {
            return Err(FusionError::InvalidParameter(format!(
                "polling interval must be at least 1 ms, got {:?}",
                self.interval
            )));
        }
        Ok(())
    }
}

/// Lifecycle state of a [`PositioningEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
}

// ─────────────────────────────────────────────────────────────────────────────
// PositioningEngine
// ─────────────────────────────────────────────────────────────────────────────

/// Periodic fusion driver.
///
/// Exclusively owns its sensor array.  Call [`PositioningEngine::shutdown`]
/// to stop and release every sensor deterministically.
pub struct PositioningEngine<C: Clusterer = AgglomerativeClusterer> {
    array: CompositeSensorArray,
    clusterer: C,
    cluster_radius: f64,
    interval: Duration,
    state: EngineState,
    observer: Arc<dyn LifecycleObserver>,
}

impl PositioningEngine {
    /// Create an engine with the stock [`AgglomerativeClusterer`].
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidParameter`] when `config` is invalid.
    pub fn new(
        array: CompositeSensorArray,
        config: PositioningConfig,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Result<Self, FusionError> {
        Self::with_clusterer(array, config, AgglomerativeClusterer, observer)
    }
}

impl<C: Clusterer> PositioningEngine<C> {
    /// Create an engine that delegates cluster extraction to `clusterer`.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidParameter`] when `config` is invalid.
    pub fn with_clusterer(
        array: CompositeSensorArray,
        config: PositioningConfig,
        clusterer: C,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Result<Self, FusionError> {
        config.validate()?;
        Ok(Self {
            array,
            clusterer,
            cluster_radius: config.cluster_radius,
            interval: config.interval,
            state: EngineState::Stopped,
            observer,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    /// Radius used by the next [`positioning`][Self::positioning] call that
    /// does not supply its own.
    pub fn cluster_radius(&self) -> f64 {
        self.cluster_radius
    }

    /// Replace the stored clustering radius.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidParameter`] for a non-positive or
    /// non-finite radius; the stored radius is left unchanged.
    pub fn set_cluster_radius(&mut self, radius: f64) -> Result<(), FusionError> {
        self.cluster_radius = check_radius(radius)?;
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn array(&self) -> &CompositeSensorArray {
        &self.array
    }

    /// Start every owned sensor and enter [`EngineState::Running`].
    ///
    /// # Errors
    ///
    /// Propagates the first sensor fault; the state is left unchanged.
    pub fn start(&mut self) -> Result<(), FusionError> {
        self.array.start()?;
        self.state = EngineState::Running;
        self.observer.notify(
            COMPONENT,
            &LifecycleEvent::Started {
                sensors: self.array.len(),
            },
        );
        Ok(())
    }

    /// Stop every owned sensor and enter [`EngineState::Stopped`].
    ///
    /// # Errors
    ///
    /// Propagates the first sensor fault; the state is left unchanged.
    pub fn stop(&mut self) -> Result<(), FusionError> {
        self.array.stop()?;
        self.state = EngineState::Stopped;
        self.observer.notify(
            COMPONENT,
            &LifecycleEvent::Stopped {
                sensors: self.array.len(),
            },
        );
        Ok(())
    }

    /// The fused world-frame cloud, without clustering.
    ///
    /// # Errors
    ///
    /// Propagates sensor faults.
    pub fn detected_points(&mut self) -> Result<Vec<Point3>, FusionError> {
        self.array.detected_points()
    }

    /// Run one positioning cycle and return the fused positions.
    ///
    /// A supplied `radius` replaces the stored one for this and every later
    /// call.  The cloud, even when empty, is always handed to the clusterer
    /// and its answer returned as-is.
    ///
    /// # Errors
    ///
    /// - [`FusionError::InvalidParameter`] for an invalid `radius` (the
    ///   stored radius is not changed).
    /// - Sensor and clustering faults, unchanged.
    pub fn positioning(
        &mut self,
        radius: Option<f64>,
        options: &ClusterOptions,
    ) -> Result<Vec<Point3>, FusionError> {
        if let Some(r) = radius {
            self.set_cluster_radius(r)?;
        }

        let cloud = self.array.detected_points()?;
        let centers = self
            .clusterer
            .clustering_centers(&cloud, self.cluster_radius, options)?;
        debug!(
            points = cloud.len(),
            positions = centers.len(),
            radius = self.cluster_radius,
            state = ?self.state,
            "positioning cycle"
        );
        Ok(centers)
    }

    /// Stop every sensor exactly once and release the array.
    ///
    /// Every sensor is tried even if one fails to stop; the first error is
    /// returned.
    pub fn shutdown(mut self) -> Result<(), FusionError> {
        let sensors = self.array.len();
        let closed = self.array.close();
        self.state = EngineState::Stopped;
        self.observer
            .notify(COMPONENT, &LifecycleEvent::Stopped { sensors });
        closed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use radarfuse_hal::{NoopObserver, Sensor, SimSensor};
    use radarfuse_perception::transform::{RigidTransform, RotationMatrix, Translation};
    use std::sync::Mutex;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn sim(id: &str, points: Vec<Point3>) -> Box<dyn Sensor> {
        Box::new(SimSensor::new(id).with_frames(vec![points]))
    }

    fn offset(x: f64, y: f64, z: f64) -> RigidTransform {
        RigidTransform::new(RotationMatrix::identity(), Translation::new(x, y, z))
    }

    fn engine_with(sensors: Vec<(Box<dyn Sensor>, RigidTransform)>) -> PositioningEngine {
        let mut array = CompositeSensorArray::default();
        for (s, t) in sensors {
            array.append(s, t);
        }
        PositioningEngine::new(array, PositioningConfig::default(), Arc::new(NoopObserver))
            .unwrap()
    }

    /// Records what the engine hands over and returns a canned answer.
    #[derive(Default)]
    struct SpyClusterer {
        seen: Mutex<Vec<(usize, f64, ClusterOptions)>>,
        fail: bool,
    }

    impl Clusterer for SpyClusterer {
        fn clustering_centers(
            &self,
            points: &[Point3],
            radius: f64,
            options: &ClusterOptions,
        ) -> Result<Vec<Point3>, FusionError> {
            self.seen
                .lock()
                .unwrap()
                .push((points.len(), radius, *options));
            if self.fail {
                return Err(FusionError::ClusteringFault("tree build failed".to_string()));
            }
            Ok(vec![p(42.0, 0.0, 0.0)])
        }
    }

    fn spy_engine(fail: bool) -> PositioningEngine<SpyClusterer> {
        let mut array = CompositeSensorArray::default();
        array.append(sim("a", vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)]), offset(0.0, 0.0, 0.0));
        spy_engine_over(array, fail)
    }

    fn spy_engine_over(array: CompositeSensorArray, fail: bool) -> PositioningEngine<SpyClusterer> {
        PositioningEngine::with_clusterer(
            array,
            PositioningConfig::default(),
            SpyClusterer {
                fail,
                ..SpyClusterer::default()
            },
            Arc::new(NoopObserver),
        )
        .unwrap()
    }

    // ── Configuration ───────────────────────────────────────────────────────

    #[test]
    fn defaults_match_documented_values() {
        let engine = engine_with(vec![]);
        assert_eq!(engine.cluster_radius(), 0.75);
        assert_eq!(engine.interval(), Duration::from_millis(1000));
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn invalid_config_is_rejected() {
        for config in [
            PositioningConfig {
                cluster_radius: 0.0,
                ..PositioningConfig::default()
            },
            PositioningConfig {
                cluster_radius: -0.5,
                ..PositioningConfig::default()
            },
            PositioningConfig {
                interval: Duration::ZERO,
                ..PositioningConfig::default()
            },
        ] {
            let result = PositioningEngine::new(
                CompositeSensorArray::default(),
                config,
                Arc::new(NoopObserver),
            );
            assert!(matches!(result, Err(FusionError::InvalidParameter(_))));
        }
    }

    // ── State machine ───────────────────────────────────────────────────────

    #[test]
    fn start_stop_transitions_are_idempotent() {
        let mut engine = engine_with(vec![(sim("a", vec![]), offset(0.0, 0.0, 0.0))]);
        engine.start().unwrap();
        engine.start().unwrap();
        assert!(engine.is_running());
        engine.stop().unwrap();
        engine.stop().unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn positioning_while_stopped_returns_sensor_output() {
        let mut engine = engine_with(vec![(sim("a", vec![p(1.0, 0.0, 0.0)]), offset(0.0, 0.0, 0.0))]);
        // Simulated sensors report nothing until started.
        assert!(engine
            .positioning(None, &ClusterOptions::default())
            .unwrap()
            .is_empty());
    }

    // ── Positioning ─────────────────────────────────────────────────────────

    #[test]
    fn empty_array_yields_no_positions() {
        let mut engine = engine_with(vec![]);
        engine.start().unwrap();
        assert!(engine
            .positioning(None, &ClusterOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn two_sensors_close_points_fuse_into_one_position() {
        // Each sensor sees the object from its own mounting; both returns land
        // within 0.75 of each other in the world frame.
        let mut engine = engine_with(vec![
            (sim("left", vec![p(1.0, 0.0, 0.0)]), offset(0.0, 0.0, 0.0)),
            (
                sim("right", vec![p(0.8, 0.0, 0.0)]),
                RigidTransform::new(
                    RotationMatrix::from_degrees(0.0, 0.0, 180.0),
                    Translation::new(2.0, 0.2, 0.0),
                ),
            ),
        ]);
        engine.start().unwrap();

        let positions = engine.positioning(None, &ClusterOptions::default()).unwrap();
        assert_eq!(positions.len(), 1);
        assert!((positions[0].x - 1.1).abs() < 1e-9);
        assert!((positions[0].y - 0.1).abs() < 1e-9);
    }

    #[test]
    fn two_sensors_far_points_stay_separate() {
        let mut engine = engine_with(vec![
            (sim("left", vec![p(0.0, 0.0, 0.0)]), offset(0.0, 0.0, 0.0)),
            (sim("right", vec![p(0.0, 0.0, 0.0)]), offset(2.0, 0.0, 0.0)),
        ]);
        engine.start().unwrap();

        let positions = engine.positioning(None, &ClusterOptions::default()).unwrap();
        assert_eq!(positions, vec![p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0)]);
    }

    #[test]
    fn supplied_radius_persists_for_later_calls() {
        let mut engine = spy_engine(false);
        engine.start().unwrap();

        engine.positioning(Some(2.5), &ClusterOptions::default()).unwrap();
        engine.positioning(None, &ClusterOptions::default()).unwrap();
        assert_eq!(engine.cluster_radius(), 2.5);

        let seen = engine.clusterer.seen.lock().unwrap();
        assert_eq!(seen[0].1, 2.5);
        assert_eq!(seen[1].1, 2.5);
    }

    #[test]
    fn invalid_radius_is_rejected_and_not_stored() {
        let mut engine = spy_engine(false);
        engine.start().unwrap();

        let err = engine
            .positioning(Some(0.0), &ClusterOptions::default())
            .unwrap_err();
        assert!(matches!(err, FusionError::InvalidParameter(_)));
        assert_eq!(engine.cluster_radius(), DEFAULT_CLUSTER_RADIUS);
        assert!(engine.clusterer.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn options_and_cloud_are_forwarded_and_result_returned_unmodified() {
        let mut engine = spy_engine(false);
        engine.start().unwrap();

        let options = ClusterOptions {
            use_virtual: true,
            associate_virtual: true,
            with_weight: true,
            virtual_weight: Some(0.3),
            source_weight: Some(2.0),
        };
        let positions = engine.positioning(None, &options).unwrap();
        assert_eq!(positions, vec![p(42.0, 0.0, 0.0)]);

        let seen = engine.clusterer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (2, DEFAULT_CLUSTER_RADIUS, options));
    }

    #[test]
    fn clustering_fault_propagates() {
        let mut engine = spy_engine(true);
        engine.start().unwrap();
        let err = engine
            .positioning(None, &ClusterOptions::default())
            .unwrap_err();
        assert_eq!(err, FusionError::ClusteringFault("tree build failed".to_string()));
    }

    #[test]
    fn detected_points_exposes_fused_cloud() {
        let mut engine = engine_with(vec![
            (sim("a", vec![p(1.0, 0.0, 0.0)]), offset(0.0, 0.0, 1.0)),
            (sim("b", vec![p(0.0, 1.0, 0.0)]), offset(0.0, 0.0, 2.0)),
        ]);
        engine.start().unwrap();
        assert_eq!(
            engine.detected_points().unwrap(),
            vec![p(1.0, 0.0, 1.0), p(0.0, 1.0, 2.0)]
        );
    }

    /// Records every lifecycle call into a shared log.
    struct CountingSensor {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Sensor for CountingSensor {
        fn id(&self) -> &str {
            "counting"
        }

        fn start(&mut self) -> Result<(), FusionError> {
            self.log.lock().unwrap().push("start");
            Ok(())
        }

        fn stop(&mut self) -> Result<(), FusionError> {
            self.log.lock().unwrap().push("stop");
            Ok(())
        }

        fn detected_points(&mut self, _raw: bool) -> Result<Vec<Point3>, FusionError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct EventLog(Mutex<Vec<(String, LifecycleEvent)>>);

    impl LifecycleObserver for EventLog {
        fn notify(&self, component: &str, event: &LifecycleEvent) {
            self.0
                .lock()
                .unwrap()
                .push((component.to_string(), event.clone()));
        }
    }

    #[test]
    fn shutdown_stops_each_sensor_exactly_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(EventLog::default());
        let mut array = CompositeSensorArray::new(events.clone());
        array.append(Box::new(CountingSensor { log: log.clone() }), offset(0.0, 0.0, 0.0));
        let mut engine =
            PositioningEngine::new(array, PositioningConfig::default(), events.clone()).unwrap();

        engine.start().unwrap();
        engine.shutdown().unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["start", "stop"]);
        let events = events.0.lock().unwrap();
        assert!(events.contains(&(
            "sensor_array".to_string(),
            LifecycleEvent::Closed { sensors: 1 }
        )));
        assert_eq!(
            events.last(),
            Some(&(COMPONENT.to_string(), LifecycleEvent::Stopped { sensors: 1 }))
        );
    }

    #[test]
    fn empty_cloud_is_still_handed_to_the_clusterer() {
        let mut engine = spy_engine_over(CompositeSensorArray::default(), false);
        engine.start().unwrap();

        let positions = engine.positioning(None, &ClusterOptions::default()).unwrap();
        assert_eq!(positions, vec![p(42.0, 0.0, 0.0)]);

        let seen = engine.clusterer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, 0);
    }

    #[test]
    fn invalid_weights_are_rejected_on_empty_frames() {
        let mut engine = engine_with(vec![]);
        engine.start().unwrap();
        let options = ClusterOptions {
            with_weight: true,
            virtual_weight: Some(-1.0),
            ..ClusterOptions::default()
        };
        assert!(matches!(
            engine.positioning(None, &options),
            Err(FusionError::InvalidParameter(_))
        ));
    }
}

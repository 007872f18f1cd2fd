//! [`CompositeSensorArray`] – ordered set of mounted sensors.
//!
//! Each entry pairs a [`Sensor`] with the [`RigidTransform`] that maps its
//! local detections into the shared world frame.  The array drives the
//! lifecycle of every sensor it owns and concatenates their transformed
//! detections into one cloud.
//!
//! # Ordering
//!
//! Sensors are started, stopped and polled strictly in insertion order.
//! [`CompositeSensorArray::detected_points`] returns sensor 0's points, then
//! sensor 1's, and so on, each block in the order the sensor reported it.
//!
//! # Failure policy
//!
//! A failing sensor aborts `start`, `stop` or `detected_points` and its
//! [`FusionError::SensorFault`] is returned as-is.  Sensors already started
//! or stopped in the same call are left that way.  [`close`] is the
//! exception: it always tries every sensor.
//!
//! # Closing
//!
//! [`close`] is terminal for the sensors it releases: once closed, further
//! `close` calls do nothing.  Appending to a closed array reopens it (with a
//! warning) so the new sensor is again released by the next `close` or by
//! `Drop`.
//!
//! [`close`]: CompositeSensorArray::close

use std::fmt;
use std::sync::Arc;

use radarfuse_perception::transform::RigidTransform;
use radarfuse_types::{FusionError, Point3};
use tracing::{trace, warn};

use crate::observer::{LifecycleEvent, LifecycleObserver, NoopObserver};
use crate::sensor::Sensor;

const COMPONENT: &str = "sensor_array";

struct MountedSensor {
    sensor: Box<dyn Sensor>,
    transform: RigidTransform,
}

/// Owns a list of (sensor, transform) pairs and fuses their detections.
///
/// Construct with [`CompositeSensorArray::new`] (empty) or
/// [`CompositeSensorArray::from_parts`] (pre-populated), mount sensors with
/// [`CompositeSensorArray::append`], then poll
/// [`CompositeSensorArray::detected_points`].  Call
/// [`CompositeSensorArray::close`] when done; dropping an open array closes
/// it as a fallback.
pub struct CompositeSensorArray {
    mounts: Vec<MountedSensor>,
    observer: Arc<dyn LifecycleObserver>,
    closed: bool,
}

impl CompositeSensorArray {
    /// Create an empty array reporting lifecycle events to `observer`.
    pub fn new(observer: Arc<dyn LifecycleObserver>) -> Self {
        Self {
            mounts: Vec::new(),
            observer,
            closed: false,
        }
    }

    /// Create a pre-populated array from two parallel lists.  `sensors[i]` is
    /// paired with `transforms[i]`.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidConfiguration`] when the two lists have
    /// different lengths.
    pub fn from_parts(
        sensors: Vec<Box<dyn Sensor>>,
        transforms: Vec<RigidTransform>,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Result<Self, FusionError> {
        if sensors.len() != transforms.len() {
            return Err(FusionError::InvalidConfiguration(format!(
                "{} sensor(s) but {} transform(s)",
                sensors.len(),
                transforms.len()
            )));
        }

        let mut array = Self::new(observer);
        for (sensor, transform) in sensors.into_iter().zip(transforms) {
            array.append(sensor, transform);
        }
        Ok(array)
    }

    /// Mount `sensor` at the end of the array with its world `transform`.
    pub fn append(&mut self, sensor: Box<dyn Sensor>, transform: RigidTransform) {
        if self.closed {
            warn!(sensor = sensor.id(), "appending to a closed sensor array; reopening");
            self.closed = false;
        }
        let event = LifecycleEvent::Appended {
            sensor: sensor.id().to_string(),
            index: self.mounts.len(),
        };
        self.mounts.push(MountedSensor { sensor, transform });
        self.observer.notify(COMPONENT, &event);
    }

    /// Number of mounted sensors.
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// True after [`close`][Self::close] until the next `append`.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn sensor_count(&self) -> usize {
        self.mounts.len()
    }

    pub fn transform_count(&self) -> usize {
        self.transforms().count()
    }

    /// Sensor identifiers in array order.
    pub fn sensor_ids(&self) -> Vec<&str> {
        self.mounts.iter().map(|m| m.sensor.id()).collect()
    }

    /// Transforms in array order.
    pub fn transforms(&self) -> impl Iterator<Item = &RigidTransform> {
        self.mounts.iter().map(|m| &m.transform)
    }

    /// Start every sensor in array order.
    ///
    /// # Errors
    ///
    /// Returns the first sensor's error; sensors before it stay started.
    pub fn start(&mut self) -> Result<(), FusionError> {
        for m in &mut self.mounts {
            m.sensor.start()?;
        }
        self.observer.notify(
            COMPONENT,
            &LifecycleEvent::Started {
                sensors: self.mounts.len(),
            },
        );
        Ok(())
    }

    /// Stop every sensor in array order, whether or not it was started.
    ///
    /// # Errors
    ///
    /// Returns the first sensor's error; sensors before it stay stopped.
    pub fn stop(&mut self) -> Result<(), FusionError> {
        for m in &mut self.mounts {
            m.sensor.stop()?;
        }
        self.observer.notify(
            COMPONENT,
            &LifecycleEvent::Stopped {
                sensors: self.mounts.len(),
            },
        );
        Ok(())
    }

    /// Poll every sensor (non-raw) and return all detections in the world
    /// frame, concatenated in array order.
    ///
    /// # Errors
    ///
    /// Returns the first sensor fault encountered.
    pub fn detected_points(&mut self) -> Result<Vec<Point3>, FusionError> {
        let mut fused = Vec::new();
        for m in &mut self.mounts {
            let local = m.sensor.detected_points(false)?;
            trace!(sensor = m.sensor.id(), points = local.len(), "polled sensor");
            fused.extend(m.transform.transform_many(&local));
        }
        Ok(fused)
    }

    /// Stop every sensor exactly once and release them all.
    ///
    /// Every sensor is stopped even if an earlier one fails; the first error
    /// is returned.  Closing an already closed array is a no-op.
    pub fn close(&mut self) -> Result<(), FusionError> {
        if self.closed {
            return Ok(());
        }

        let mut first_err = None;
        for m in &mut self.mounts {
            if let Err(e) = m.sensor.stop() {
                warn!(sensor = m.sensor.id(), error = %e, "sensor failed to stop during close");
                first_err.get_or_insert(e);
            }
        }

        let released = self.mounts.len();
        self.mounts.clear();
        self.closed = true;
        self.observer
            .notify(COMPONENT, &LifecycleEvent::Closed { sensors: released });

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for CompositeSensorArray {
    fn default() -> Self {
        Self::new(Arc::new(NoopObserver))
    }
}

impl fmt::Debug for CompositeSensorArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeSensorArray")
            .field("sensors", &self.sensor_ids())
            .field("transforms", &self.transforms().collect::<Vec<_>>())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for CompositeSensorArray {
    fn drop(&mut self) {
        if self.closed || self.mounts.is_empty() {
            return;
        }
        warn!(
            sensors = self.mounts.len(),
            "sensor array dropped while open; closing"
        );
        if let Err(e) = self.close() {
            warn!(error = %e, "close during drop failed");
        }
    }
}

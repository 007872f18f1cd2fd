//! Generic `Sensor` trait for range sensors that report 3-D detections.

use radarfuse_types::{FusionError, Point3};

/// A range sensor (mmWave radar, lidar, depth camera …) that reports point
/// detections in its own local frame.
///
/// Drivers implement this trait and are mounted into a
/// [`CompositeSensorArray`][crate::composite::CompositeSensorArray] together
/// with the transform that places them in the world.
pub trait Sensor: Send {
    /// Stable identifier for this sensor, e.g. `"radar-front"`.
    fn id(&self) -> &str;

    /// Begin acquiring detections.  Calling it on a running sensor must be
    /// harmless.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::SensorFault`] if the device cannot be started.
    fn start(&mut self) -> Result<(), FusionError>;

    /// Stop acquiring detections.  Calling it on a sensor that is already
    /// stopped, or was never started, must be harmless.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::SensorFault`] if the device cannot be stopped.
    fn stop(&mut self) -> Result<(), FusionError>;

    /// Return the latest detections in the sensor's local frame, in the order
    /// the sensor reports them.
    ///
    /// With `raw` set the sensor returns every return it has; otherwise it may
    /// drop points outside its configured detection volume.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::SensorFault`] if the frame cannot be read.
    fn detected_points(&mut self, raw: bool) -> Result<Vec<Point3>, FusionError>;
}

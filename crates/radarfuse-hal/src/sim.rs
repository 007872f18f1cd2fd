//! Simulated sensor for headless runs and tests without physical radars.
//!
//! [`SimSensor`] replays a scripted sequence of frames, one frame per call to
//! [`Sensor::detected_points`], wrapping around at the end.  Non-raw reads
//! drop points outside the configured [`AreaLimit`], the same way a radar
//! profile clips detections to its field of view.  A bounded axis drops NaN
//! on that axis; the default unbounded limit passes every point through.
//!
//! # Example
//!
//! ```rust
//! use radarfuse_hal::sensor::Sensor;
//! use radarfuse_hal::sim::SimSensor;
//! use radarfuse_types::Point3;
//!
//! let mut radar = SimSensor::new("radar-front")
//!     .with_frames(vec![vec![Point3::new(1.0, 0.0, 0.0)]]);
//!
//! radar.start().expect("sim start must succeed");
//! assert_eq!(radar.detected_points(false).unwrap().len(), 1);
//! ```

use radarfuse_types::{AreaLimit, FusionError, Point3};

use crate::sensor::Sensor;

/// A scripted stand-in for a range sensor.  Always succeeds.
///
/// While stopped it reports no detections.
#[derive(Debug, Clone)]
pub struct SimSensor {
    id: String,
    frames: Vec<Vec<Point3>>,
    cursor: usize,
    detection_limit: AreaLimit,
    running: bool,
}

impl SimSensor {
    /// Create a simulated sensor with no frames and an unbounded detection
    /// volume.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            frames: Vec::new(),
            cursor: 0,
            detection_limit: AreaLimit::unbounded(),
            running: false,
        }
    }

    /// Replace the scripted frames.
    pub fn with_frames(mut self, frames: Vec<Vec<Point3>>) -> Self {
        self.frames = frames;
        self.cursor = 0;
        self
    }

    /// Clip non-raw reads to `limit`.
    pub fn with_detection_limit(mut self, limit: AreaLimit) -> Self {
        self.detection_limit = limit;
        self
    }

    /// Append one frame to the end of the script.
    pub fn push_frame(&mut self, frame: Vec<Point3>) {
        self.frames.push(frame);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn detection_limit(&self) -> &AreaLimit {
        &self.detection_limit
    }
}

impl Sensor for SimSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn start(&mut self) -> Result<(), FusionError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), FusionError> {
        self.running = false;
        Ok(())
    }

    fn detected_points(&mut self, raw: bool) -> Result<Vec<Point3>, FusionError> {
        if !self.running || self.frames.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.cursor % self.frames.len();
        self.cursor = self.cursor.wrapping_add(1);
        let frame = &self.frames[index];

        if raw {
            Ok(frame.clone())
        } else {
            Ok(frame
                .iter()
                .copied()
                .filter(|p| self.detection_limit.contains(p))
                .collect())
        }
    }
}

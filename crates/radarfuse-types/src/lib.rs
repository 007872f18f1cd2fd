//! `radarfuse-types` – shared numeric and error types.
//!
//! Every other crate in the workspace speaks in [`Point3`] and reports
//! failures as [`FusionError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Point3
// ────────────────────────────────────────────────────────────────────────────

/// A point (or free vector) in 3-D space.  Units are whatever the sensors
/// report, metres for the radars this stack was built around.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    /// Create a new point.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The origin.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f64 {
        let d = self.sub(other);
        (d.x * d.x + d.y * d.y + d.z * d.z).sqrt()
    }

    /// Midpoint of the segment `self`–`other`.
    pub fn midpoint(self, other: Self) -> Self {
        self.add(other).scale(0.5)
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<(f64, f64, f64)> for Point3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Point3> for [f64; 3] {
    fn from(p: Point3) -> Self {
        [p.x, p.y, p.z]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Detection limits
// ────────────────────────────────────────────────────────────────────────────

/// A closed interval `[min, max]` along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    /// Create a range.  The bounds are normalised so that `min ≤ max`.
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// A range that admits every value, including ±∞ and NaN.
    pub fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min == f64::NEG_INFINITY && self.max == f64::INFINITY
    }

    /// True when `v` lies in `[min, max]`.  NaN is only admitted by an
    /// unbounded range.
    pub fn contains(&self, v: f64) -> bool {
        self.is_unbounded() || (v >= self.min && v <= self.max)
    }
}

impl From<[f64; 2]> for Range {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

/// Axis-aligned detection volume of a sensor, expressed in the sensor's own
/// local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaLimit {
    pub x: Range,
    pub y: Range,
    pub z: Range,
}

impl AreaLimit {
    pub fn new(x: Range, y: Range, z: Range) -> Self {
        Self { x, y, z }
    }

    /// A limit that lets every point through, non-finite ones included.
    pub fn unbounded() -> Self {
        Self::new(Range::unbounded(), Range::unbounded(), Range::unbounded())
    }

    /// True when `p` lies inside or on the boundary of the volume.
    pub fn contains(&self, p: &Point3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }
}

impl Default for AreaLimit {
    fn default() -> Self {
        Self::unbounded()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type shared by the transform, aggregation and positioning layers.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FusionError {
    /// The sensor/transform pairing (or a configuration built from it) is
    /// inconsistent.
    #[error("Invalid Configuration: {0}")]
    InvalidConfiguration(String),

    /// A numeric parameter is out of its valid domain.
    #[error("Invalid Parameter: {0}")]
    InvalidParameter(String),

    /// A sensor failed to start, stop or report detections.
    #[error("Sensor Fault on {sensor}: {details}")]
    SensorFault { sensor: String, details: String },

    /// The clustering collaborator failed.
    #[error("Clustering Fault: {0}")]
    ClusteringFault(String),
}

impl FusionError {
    /// Shorthand for a [`FusionError::SensorFault`].
    pub fn sensor_fault(sensor: impl Into<String>, details: impl Into<String>) -> Self {
        Self::SensorFault {
            sensor: sensor.into(),
            details: details.into(),
        }
    }
}

//! Rigid-body coordinate transforms.
//!
//! Each sensor is mounted somewhere in the world with some orientation.  A
//! [`RigidTransform`] captures that mounting: a [`RotationMatrix`] built from
//! roll/pitch/yaw Euler angles (degrees) followed by a [`Translation`].
//! Applying it to a point reported in the sensor's local frame yields the
//! same point in the shared world frame.
//!
//! # Example
//!
//! ```rust
//! use radarfuse_perception::transform::{RigidTransform, RotationMatrix, Translation};
//! use radarfuse_types::Point3;
//!
//! // Sensor facing backwards (yaw 180°), mounted at the world origin.
//! let tf = RigidTransform::new(
//!     RotationMatrix::from_degrees(0.0, 0.0, 180.0),
//!     Translation::new(0.0, 0.0, 0.0),
//! );
//!
//! let p = tf.transform_one(Point3::new(1.0, 0.0, 0.0));
//! assert!((p.x + 1.0).abs() < 1e-9);
//! assert!(p.y.abs() < 1e-9);
//! ```

use radarfuse_types::Point3;

// ────────────────────────────────────────────────────────────────────────────
// RotationMatrix
// ────────────────────────────────────────────────────────────────────────────

/// A 3×3 rotation matrix `R = Rz(yaw) · Ry(pitch) · Rx(roll)`.
///
/// Roll, pitch and yaw rotate about the local X, Y and Z axes respectively.
/// The angles are converted to radians once, at construction; the matrix is
/// immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix {
    /// (roll, pitch, yaw) in radians.
    angles_rad: [f64; 3],
    m: [[f64; 3]; 3],
}

impl RotationMatrix {
    /// Build the matrix from roll (`x`), pitch (`y`) and yaw (`z`) given in
    /// degrees.  Any finite angle is accepted; values outside `[0, 360)` wrap
    /// through the periodicity of sine and cosine.
    pub fn from_degrees(x: f64, y: f64, z: f64) -> Self {
        let (x, y, z) = (x.to_radians(), y.to_radians(), z.to_radians());
        let (sx, cx) = x.sin_cos();
        let (sy, cy) = y.sin_cos();
        let (sz, cz) = z.sin_cos();

        let m = [
            [cy * cz, -cx * sz + sx * sy * cz, sx * sz + cx * sy * cz],
            [cy * sz, cx * cz + sx * sy * sz, -sx * cz + cx * sy * sz],
            [-sy, sx * cy, cx * cy],
        ];

        Self {
            angles_rad: [x, y, z],
            m,
        }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::from_degrees(0.0, 0.0, 0.0)
    }

    /// (roll, pitch, yaw) in radians.
    pub fn angles_rad(&self) -> [f64; 3] {
        self.angles_rad
    }

    /// Row-major matrix entries.
    pub fn rows(&self) -> &[[f64; 3]; 3] {
        &self.m
    }

    /// `R · v`.
    pub fn apply(&self, v: Point3) -> Point3 {
        let m = &self.m;
        Point3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// Matrix transpose (the inverse rotation).
    pub fn transpose(&self) -> [[f64; 3]; 3] {
        let m = &self.m;
        [
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ]
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }
}

impl Default for RotationMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Translation
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D offset, stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Translation {
    v: Point3,
}

impl Translation {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            v: Point3::new(x, y, z),
        }
    }

    /// No offset.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn vector(&self) -> Point3 {
        self.v
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RigidTransform
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body transform: rotate, then translate.
///
/// Maps a point `p` expressed in a sensor's local frame to `R·p + t` in the
/// world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RigidTransform {
    rotation: RotationMatrix,
    translation: Translation,
}

impl RigidTransform {
    pub fn new(rotation: RotationMatrix, translation: Translation) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// The identity transform (no rotation, no offset).
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn rotation(&self) -> &RotationMatrix {
        &self.rotation
    }

    pub fn translation(&self) -> &Translation {
        &self.translation
    }

    /// Map one point into the world frame: `R·p + t`.
    ///
    /// Non-finite components propagate through the arithmetic unchanged.
    pub fn transform_one(&self, point: Point3) -> Point3 {
        self.rotation.apply(point).add(self.translation.vector())
    }

    /// Map a batch of points, preserving order and length.
    pub fn transform_many(&self, points: &[Point3]) -> Vec<Point3> {
        points.iter().map(|p| self.transform_one(*p)).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

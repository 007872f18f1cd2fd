//! `radarfuse-perception` – geometry and clustering.
//!
//! Turns per-sensor detections into world-frame points and reduces the fused
//! cloud to object positions.
//!
//! # Modules
//!
//! - [`transform`] – [`RigidTransform`][transform::RigidTransform]: Euler-angle
//!   [`RotationMatrix`][transform::RotationMatrix] followed by a
//!   [`Translation`][transform::Translation], mapping a sensor's local frame
//!   into the shared world frame.
//! - [`cluster`] – the [`Clusterer`][cluster::Clusterer] contract and the
//!   stock [`AgglomerativeClusterer`][cluster::AgglomerativeClusterer], which
//!   merges nearby detections into fused position estimates.

pub mod cluster;
pub mod transform;

pub use cluster::{AgglomerativeClusterer, ClusterOptions, Clusterer};
pub use transform::{RigidTransform, RotationMatrix, Translation};

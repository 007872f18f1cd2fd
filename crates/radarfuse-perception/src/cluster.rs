//! Radius-based clustering of the fused point cloud.
//!
//! The positioning layer treats clustering as a collaborator behind the
//! [`Clusterer`] trait: it hands over the world-frame cloud, a clustering
//! radius and a [`ClusterOptions`] bundle, and gets back one center per
//! estimated object.
//!
//! [`AgglomerativeClusterer`] is the stock implementation: hierarchical
//! agglomerative clustering with centroid linkage.  Every point starts as its
//! own cluster; the two clusters with the closest centroids are merged
//! repeatedly while that distance is `≤ radius`.
//!
//! # Virtual points
//!
//! Sparse returns from a single object can sit slightly further apart than
//! the radius.  With [`ClusterOptions::use_virtual`] set, a synthetic point is
//! placed at the midpoint of every pair of real points whose distance lies in
//! `(radius, 2·radius]`, giving the linkage something to bridge across.
//!
//! # Example
//!
//! ```rust
//! use radarfuse_perception::cluster::{AgglomerativeClusterer, ClusterOptions, Clusterer};
//! use radarfuse_types::Point3;
//!
//! let points = [Point3::new(0.0, 0.0, 0.0), Point3::new(0.5, 0.0, 0.0)];
//! let centers = AgglomerativeClusterer
//!     .clustering_centers(&points, 0.75, &ClusterOptions::default())
//!     .unwrap();
//! assert_eq!(centers, vec![Point3::new(0.25, 0.0, 0.0)]);
//! ```

use radarfuse_types::{FusionError, Point3};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Weight of a real detection when [`ClusterOptions::source_weight`] is unset.
pub const DEFAULT_SOURCE_WEIGHT: f64 = 1.0;
/// Weight of a virtual point when [`ClusterOptions::virtual_weight`] is unset.
pub const DEFAULT_VIRTUAL_WEIGHT: f64 = 0.5;

// ────────────────────────────────────────────────────────────────────────────
// Options
// ────────────────────────────────────────────────────────────────────────────

/// Tuning knobs passed to a [`Clusterer`] on every call.
///
/// All fields default to off / unset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// Inject virtual midpoints between near-miss pairs of real points.
    pub use_virtual: bool,
    /// Cluster virtual points together with real ones instead of reporting
    /// them as standalone clusters.
    pub associate_virtual: bool,
    /// Use weighted centroids.
    pub with_weight: bool,
    /// Weight of each virtual point (default [`DEFAULT_VIRTUAL_WEIGHT`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_weight: Option<f64>,
    /// Weight of each real detection (default [`DEFAULT_SOURCE_WEIGHT`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_weight: Option<f64>,
}

/// Validate a clustering radius: it must be finite and strictly positive.
pub fn check_radius(radius: f64) -> Result<f64, FusionError> {
    if radius.is_finite() && radius > 0.0 {
        Ok(radius)
    } else {
        Err(FusionError::InvalidParameter(format!(
            "cluster radius must be finite and > 0, got {radius}"
        )))
    }
}

fn check_weight(name: &str, weight: Option<f64>, default: f64) -> Result<f64, FusionError> {
    match weight {
        None => Ok(default),
        Some(w) if w.is_finite() && w > 0.0 => Ok(w),
        Some(w) => Err(FusionError::InvalidParameter(format!(
            "{name} must be finite and > 0, got {w}"
        ))),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Clusterer trait
// ────────────────────────────────────────────────────────────────────────────

/// Reduces a point cloud to a set of cluster centers.
pub trait Clusterer: Send + Sync {
    /// Return one center per cluster found in `points`.
    ///
    /// # Errors
    ///
    /// Implementations return [`FusionError::InvalidParameter`] for an
    /// invalid radius or weight and [`FusionError::ClusteringFault`] for
    /// internal failures.
    fn clustering_centers(
        &self,
        points: &[Point3],
        radius: f64,
        options: &ClusterOptions,
    ) -> Result<Vec<Point3>, FusionError>;
}

// ────────────────────────────────────────────────────────────────────────────
// AgglomerativeClusterer
// ────────────────────────────────────────────────────────────────────────────

/// Centroid-linkage hierarchical agglomerative clustering.
///
/// Runs in `O(n³)` over real plus virtual points, which is fine for the few
/// hundred returns a handful of radars produce per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgglomerativeClusterer;

#[derive(Debug, Clone, Copy)]
struct Member {
    point: Point3,
    weight: f64,
    real: bool,
}

#[derive(Debug, Clone, Copy)]
struct Cluster {
    weighted_sum: Point3,
    weight: f64,
    has_real: bool,
}

impl Cluster {
    fn centroid(&self) -> Point3 {
        self.weighted_sum.scale(1.0 / self.weight)
    }
}

impl AgglomerativeClusterer {
    /// Midpoints of every real pair whose distance lies in `(radius, 2·radius]`.
    fn virtual_points(points: &[Point3], radius: f64) -> Vec<Point3> {
        let mut out = Vec::new();
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                let d = a.distance(*b);
                if d > radius && d <= 2.0 * radius {
                    out.push(a.midpoint(*b));
                }
            }
        }
        out
    }

    /// Merge clusters until no two centroids are within `radius`.
    ///
    /// The returned clusters are ordered by their earliest member.
    fn agglomerate(members: &[Member], radius: f64) -> Vec<Cluster> {
        let mut clusters: Vec<Cluster> = members
            .iter()
            .map(|m| Cluster {
                weighted_sum: m.point.scale(m.weight),
                weight: m.weight,
                has_real: m.real,
            })
            .collect();

        loop {
            let mut best: Option<(usize, usize)> = None;
            let mut best_d = f64::INFINITY;
            for i in 0..clusters.len() {
                let ci = clusters[i].centroid();
                for j in i + 1..clusters.len() {
                    let d = ci.distance(clusters[j].centroid());
                    if d < best_d {
                        best_d = d;
                        best = Some((i, j));
                    }
                }
            }

            match best {
                Some((i, j)) if best_d <= radius => {
                    // j > i, so removing j keeps the earliest-member ordering.
                    let absorbed = clusters.remove(j);
                    let target = &mut clusters[i];
                    target.weighted_sum = target.weighted_sum.add(absorbed.weighted_sum);
                    target.weight += absorbed.weight;
                    target.has_real |= absorbed.has_real;
                }
                _ => break,
            }
        }

        clusters
    }
}

impl Clusterer for AgglomerativeClusterer {
    fn clustering_centers(
        &self,
        points: &[Point3],
        radius: f64,
        options: &ClusterOptions,
    ) -> Result<Vec<Point3>, FusionError> {
        let radius = check_radius(radius)?;
        let source_weight =
            check_weight("source weight", options.source_weight, DEFAULT_SOURCE_WEIGHT)?;
        let virtual_weight =
            check_weight("virtual weight", options.virtual_weight, DEFAULT_VIRTUAL_WEIGHT)?;

        if points.is_empty() {
            return Ok(Vec::new());
        }

        let (source_weight, virtual_weight) = if options.with_weight {
            (source_weight, virtual_weight)
        } else {
            (1.0, 1.0)
        };

        let real: Vec<Member> = points
            .iter()
            .map(|p| Member {
                point: *p,
                weight: source_weight,
                real: true,
            })
            .collect();

        let virtuals: Vec<Member> = if options.use_virtual {
            Self::virtual_points(points, radius)
                .into_iter()
                .map(|p| Member {
                    point: p,
                    weight: virtual_weight,
                    real: false,
                })
                .collect()
        } else {
            Vec::new()
        };

        let centers = if virtuals.is_empty() {
            Self::agglomerate(&real, radius)
                .iter()
                .map(Cluster::centroid)
                .collect()
        } else if options.associate_virtual {
            let mut all = real;
            all.extend(virtuals);
            Self::agglomerate(&all, radius)
                .iter()
                .filter(|c| c.has_real)
                .map(Cluster::centroid)
                .collect()
        } else {
            let mut centers: Vec<Point3> = Self::agglomerate(&real, radius)
                .iter()
                .map(Cluster::centroid)
                .collect();
            centers.extend(Self::agglomerate(&virtuals, radius).iter().map(Cluster::centroid));
            centers
        };

        trace!(
            real = points.len(),
            clusters = centers.len(),
            radius,
            "agglomerative clustering done"
        );
        Ok(centers)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

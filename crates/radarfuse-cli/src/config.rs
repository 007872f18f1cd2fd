//! Deployment configuration – reads/writes `~/.radarfuse/config.toml`.
//!
//! Describes where each sensor is mounted (rotation + translation), the
//! clustering parameters and how often to poll.  Sensors are backed by
//! [`SimSensor`] replaying the scripted `frames` of each entry.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use radarfuse_hal::{CompositeSensorArray, LifecycleObserver, Sensor, SimSensor};
use radarfuse_perception::{ClusterOptions, RigidTransform, RotationMatrix, Translation};
use radarfuse_runtime::{
    PositioningConfig, PositioningEngine, DEFAULT_CLUSTER_RADIUS, DEFAULT_INTERVAL,
};
use radarfuse_types::{AreaLimit, FusionError, Point3, Range};
use serde::{Deserialize, Serialize};

/// Axis bounds of a sensor's detection volume, `[min, max]` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitConfig {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub z: [f64; 2],
}

impl From<LimitConfig> for AreaLimit {
    fn from(l: LimitConfig) -> Self {
        AreaLimit::new(Range::from(l.x), Range::from(l.y), Range::from(l.z))
    }
}

/// One mounted sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub id: String,
    /// Roll, pitch, yaw in degrees.
    #[serde(default)]
    pub rotation: [f64; 3],
    /// Mounting position in the world frame.
    #[serde(default)]
    pub translation: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_limit: Option<LimitConfig>,
    /// Scripted detections in the sensor's local frame, one list per frame.
    #[serde(default)]
    pub frames: Vec<Vec<[f64; 3]>>,
}

impl SensorConfig {
    pub fn transform(&self) -> RigidTransform {
        let [roll, pitch, yaw] = self.rotation;
        let [x, y, z] = self.translation;
        RigidTransform::new(
            RotationMatrix::from_degrees(roll, pitch, yaw),
            Translation::new(x, y, z),
        )
    }

    pub fn build_sensor(&self) -> SimSensor {
        let frames = self
            .frames
            .iter()
            .map(|f| f.iter().copied().map(Point3::from).collect())
            .collect();
        let limit = self
            .detection_limit
            .map(AreaLimit::from)
            .unwrap_or_default();
        SimSensor::new(self.id.clone())
            .with_frames(frames)
            .with_detection_limit(limit)
    }
}

/// Persisted configuration stored in `~/.radarfuse/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Clustering radius (same unit as the sensor detections).
    #[serde(default = "default_cluster_radius")]
    pub cluster_radius: f64,

    /// Polling interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Stop after this many cycles; `0` runs until Ctrl-C.
    #[serde(default)]
    pub max_cycles: u64,

    #[serde(default)]
    pub cluster: ClusterOptions,

    #[serde(default = "default_sensors")]
    pub sensors: Vec<SensorConfig>,
}

fn default_cluster_radius() -> f64 {
    DEFAULT_CLUSTER_RADIUS
}
fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL.as_millis() as u64
}

/// Two radars watching the same area: one facing backwards at the origin,
/// one turned 90° and mounted at (2, -2, 0).  Both see a target near
/// (-1, -0.2, 0); the front radar also sees a second one further out.
fn default_sensors() -> Vec<SensorConfig> {
    let limit = LimitConfig {
        x: [-5.0, 5.0],
        y: [-5.0, 5.0],
        z: [-5.0, 5.0],
    };
    vec![
        SensorConfig {
            id: "radar-front".to_string(),
            rotation: [0.0, 0.0, 180.0],
            translation: [0.0, 0.0, 0.0],
            detection_limit: Some(limit),
            frames: vec![
                vec![[1.0, 0.2, 0.0], [4.0, -1.0, 0.0]],
                vec![[1.05, 0.25, 0.0], [4.1, -1.0, 0.0]],
                vec![[1.1, 0.3, 0.0]],
            ],
        },
        SensorConfig {
            id: "radar-side".to_string(),
            rotation: [0.0, 0.0, 90.0],
            translation: [2.0, -2.0, 0.0],
            detection_limit: Some(limit),
            frames: vec![
                vec![[1.8, 3.0, 0.0]],
                vec![[1.75, 3.05, 0.0]],
                vec![[1.7, 3.1, 0.0], [9.0, 0.0, 0.0]],
            ],
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster_radius: default_cluster_radius(),
            interval_ms: default_interval_ms(),
            max_cycles: 0,
            cluster: ClusterOptions {
                use_virtual: true,
                associate_virtual: true,
                ..ClusterOptions::default()
            },
            sensors: default_sensors(),
        }
    }
}

impl Config {
    pub fn positioning_config(&self) -> PositioningConfig {
        PositioningConfig {
            cluster_radius: self.cluster_radius,
            interval: std::time::Duration::from_millis(self.interval_ms),
        }
    }

    /// Sensor ids must be non-empty and unique; the positioning parameters
    /// must pass [`PositioningConfig::validate`].
    pub fn validate(&self) -> Result<(), FusionError> {
        let mut seen = HashSet::new();
        for s in &self.sensors {
            if s.id.trim().is_empty() {
                return Err(FusionError::InvalidConfiguration(
                    "sensor id must not be empty".to_string(),
                ));
            }
            if !seen.insert(s.id.as_str()) {
                return Err(FusionError::InvalidConfiguration(format!(
                    "duplicate sensor id '{}'",
                    s.id
                )));
            }
        }
        self.positioning_config().validate()
    }

    /// Mount every configured sensor and wrap the array in an engine.
    pub fn build_engine(
        &self,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Result<PositioningEngine, FusionError> {
        self.validate()?;
        let sensors: Vec<Box<dyn Sensor>> = self
            .sensors
            .iter()
            .map(|s| Box::new(s.build_sensor()) as Box<dyn Sensor>)
            .collect();
        let transforms = self.sensors.iter().map(SensorConfig::transform).collect();
        let array = CompositeSensorArray::from_parts(sensors, transforms, observer.clone())?;
        PositioningEngine::new(array, self.positioning_config(), observer)
    }
}

/// Return the config path: `$RADARFUSE_CONFIG` if set, otherwise
/// `~/.radarfuse/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("RADARFUSE_CONFIG") {
        return PathBuf::from(p);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".radarfuse").join("config.toml")
}

/// Load the config from disk and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, FusionError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

/// Load the config from a specific path, without environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, FusionError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        FusionError::InvalidConfiguration(format!(
            "failed to read config at {}: {e}",
            path.display()
        ))
    })?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| FusionError::InvalidConfiguration(format!("failed to parse config: {e}")))?;
    Ok(Some(cfg))
}

/// Apply `RADARFUSE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `RADARFUSE_CLUSTER_RADIUS` | `cluster_radius` |
/// | `RADARFUSE_INTERVAL_MS` | `interval_ms` |
/// | `RADARFUSE_MAX_CYCLES` | `max_cycles` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("RADARFUSE_CLUSTER_RADIUS")
        && let Ok(r) = v.trim().parse::<f64>()
    {
        cfg.cluster_radius = r;
    }
    if let Some(v) = lookup("RADARFUSE_INTERVAL_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.interval_ms = ms;
    }
    if let Some(v) = lookup("RADARFUSE_MAX_CYCLES")
        && let Ok(n) = v.trim().parse::<u64>()
    {
        cfg.max_cycles = n;
    }
}

/// Save the config to a specific path, creating parent directories.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), FusionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            FusionError::InvalidConfiguration(format!("failed to create config directory: {e}"))
        })?;
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| {
        FusionError::InvalidConfiguration(format!("failed to serialize config: {e}"))
    })?;
    fs::write(path, raw).map_err(|e| {
        FusionError::InvalidConfiguration(format!(
            "failed to write config at {}: {e}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use radarfuse_hal::NoopObserver;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_engine_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.cluster_radius, 0.75);
        assert_eq!(cfg.interval_ms, 1000);
        assert_eq!(cfg.max_cycles, 0);
        assert_eq!(cfg.sensors.len(), 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn minimal_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
interval_ms = 250

[cluster]
use_virtual = true

[[sensors]]
id = "radar-a"
rotation = [0.0, 0.0, 180.0]
frames = [[[1.0, 0.0, 0.0]]]
"#,
        )
        .unwrap();

        let cfg = load_from(&path).unwrap().unwrap();
        assert_eq!(cfg.cluster_radius, 0.75);
        assert_eq!(cfg.interval_ms, 250);
        assert!(cfg.cluster.use_virtual);
        assert!(!cfg.cluster.associate_virtual);
        assert_eq!(cfg.sensors.len(), 1);
        assert_eq!(cfg.sensors[0].translation, [0.0, 0.0, 0.0]);
        assert!(cfg.sensors[0].detection_limit.is_none());
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "cluster_radius = \"wide\"").unwrap();
        assert!(matches!(
            load_from(&path),
            Err(FusionError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn config_path_points_to_radarfuse_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".radarfuse"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn overrides_replace_fields() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            lookup_from(&[
                ("RADARFUSE_CLUSTER_RADIUS", "1.25"),
                ("RADARFUSE_INTERVAL_MS", "200"),
                ("RADARFUSE_MAX_CYCLES", "7"),
            ]),
        );
        assert_eq!(cfg.cluster_radius, 1.25);
        assert_eq!(cfg.interval_ms, 200);
        assert_eq!(cfg.max_cycles, 7);
    }

    #[test]
    fn overrides_ignore_invalid_values() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            lookup_from(&[
                ("RADARFUSE_CLUSTER_RADIUS", "wide"),
                ("RADARFUSE_INTERVAL_MS", "-5"),
            ]),
        );
        assert_eq!(cfg.cluster_radius, 0.75);
        assert_eq!(cfg.interval_ms, 1000);
    }

    #[test]
    fn duplicate_sensor_ids_are_rejected() {
        let mut cfg = Config::default();
        cfg.sensors[1].id = cfg.sensors[0].id.clone();
        assert!(matches!(
            cfg.validate(),
            Err(FusionError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        let cfg = Config {
            cluster_radius: 0.0,
            ..Config::default()
        };
        assert!(matches!(
            cfg.build_engine(Arc::new(NoopObserver)),
            Err(FusionError::InvalidParameter(_))
        ));
    }

    #[test]
    fn default_layout_places_both_radars_on_the_same_target() {
        let cfg = Config::default();
        let front = cfg.sensors[0].transform().transform_one(Point3::from(cfg.sensors[0].frames[0][0]));
        let side = cfg.sensors[1].transform().transform_one(Point3::from(cfg.sensors[1].frames[0][0]));
        assert!(front.distance(side) < 1e-9);
        assert!((front.x + 1.0).abs() < 1e-9);
        assert!((front.y + 0.2).abs() < 1e-9);
    }

    #[test]
    fn build_engine_mounts_every_sensor() {
        let cfg = Config::default();
        let engine = cfg.build_engine(Arc::new(NoopObserver)).unwrap();
        assert_eq!(engine.array().sensor_ids(), vec!["radar-front", "radar-side"]);
        assert_eq!(engine.interval(), std::time::Duration::from_millis(1000));
        engine.shutdown().unwrap();
    }

    #[test]
    fn build_sensor_applies_detection_limit() {
        let cfg = Config::default();
        let mut side = cfg.sensors[1].build_sensor();
        side.start().unwrap();
        side.detected_points(false).unwrap();
        side.detected_points(false).unwrap();
        // Third frame: (9, 0, 0) lies outside the ±5 limit.
        assert_eq!(side.detected_points(false).unwrap().len(), 1);
    }
}

//! `radarfuse-runtime` – positioning engine and process plumbing.
//!
//! # Modules
//!
//! - [`engine`] – [`PositioningEngine`][engine::PositioningEngine]: owns the
//!   [`CompositeSensorArray`][radarfuse_hal::CompositeSensorArray], gathers
//!   the fused cloud on demand and asks a
//!   [`Clusterer`][radarfuse_perception::Clusterer] for position estimates.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber, with optional OTLP span export.

pub mod engine;
pub mod telemetry;

pub use engine::{
    EngineState, PositioningConfig, PositioningEngine, DEFAULT_CLUSTER_RADIUS, DEFAULT_INTERVAL,
};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig, TracerProviderGuard};

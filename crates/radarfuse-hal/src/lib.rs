//! `radarfuse-hal` – sensor abstraction and aggregation.
//!
//! # Modules
//!
//! - [`sensor`] – the [`Sensor`][sensor::Sensor] capability trait every range
//!   sensor driver implements.
//! - [`composite`] – [`CompositeSensorArray`][composite::CompositeSensorArray]:
//!   owns the mounted (sensor, transform) pairs, drives their lifecycle and
//!   concatenates their world-frame detections.
//! - [`observer`] – [`LifecycleObserver`][observer::LifecycleObserver]:
//!   injected hook notified on append, start, stop and close.
//! - [`sim`] – [`SimSensor`][sim::SimSensor]: scripted sensor for headless
//!   runs and tests.

pub mod composite;
pub mod observer;
pub mod sensor;
pub mod sim;

pub use composite::CompositeSensorArray;
pub use observer::{LifecycleEvent, LifecycleObserver, NoopObserver, TracingObserver};
pub use sensor::Sensor;
pub use sim::SimSensor;

//! Prometheus exporter for hardware-sensor telemetry.
//!
//! This crate polls a hardware-monitoring daemon, normalizes its
//! heterogeneous sensor readings into stable canonical metric names, and
//! exposes them via an HTTP `/metrics` endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Sensor Daemon  │────>│     Poller      │────>│   HTTP Server   │
//! │  (tree / flat)  │     │ (normalization) │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! Run the exporter binary with a configuration file:
//!
//! ```bash
//! lhm-exporter-prometheus --config config.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod classify;
pub mod config;
pub mod filter;
pub mod http;
pub mod normalize;
pub mod poller;
pub mod registry;
pub mod sensor;
pub mod source;
pub mod value;

pub use config::ExporterConfig;
pub use filter::SensorMode;
pub use http::HttpServer;
pub use poller::SensorPoller;
pub use registry::{MetricRegistry, SharedRegistry};
pub use sensor::{HardwareComponent, SensorKind, SensorRecord};

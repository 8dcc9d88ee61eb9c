//! Flat WMI backend (Windows only).
//!
//! The management interface returns an already-flat list of sensor objects.
//! Parent paths are reconciled into the same ancestry-path shape the tree
//! backend produces so the classifier behaves identically regardless of
//! source.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::sensor::{SensorKind, SensorRecord};
use crate::source::SensorSource;
use crate::value;

const NAMESPACE: &str = "root\\LibreHardwareMonitor";

/// One sensor instance as exposed by the management interface.
#[derive(Debug, Deserialize)]
#[serde(rename = "Sensor", rename_all = "PascalCase")]
struct WmiSensor {
    name: String,
    sensor_type: String,
    value: f32,
    parent: String,
    min: f32,
    max: f32,
}

/// Sensor source backed by the platform management interface.
///
/// Connections are not kept across cycles: the COM apartment objects are not
/// `Send`, so each query opens and drops its own connection synchronously.
pub struct WmiSource;

impl WmiSource {
    pub fn new() -> Self {
        Self
    }

    fn query_sensors(&self) -> Result<Vec<WmiSensor>> {
        let com = wmi::COMLibrary::new().context("COM initialization failed")?;
        let connection = wmi::WMIConnection::with_namespace_path(NAMESPACE, com)
            .context("failed to open management namespace")?;
        connection
            .query()
            .context("sensor query failed")
    }
}

impl Default for WmiSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorSource for WmiSource {
    fn name(&self) -> &'static str {
        "flat"
    }

    async fn probe(&mut self) -> bool {
        match self.query_sensors() {
            Ok(sensors) => !sensors.is_empty(),
            Err(e) => {
                debug!(error = %e, "Flat backend probe failed");
                false
            }
        }
    }

    async fn fetch(&mut self) -> Vec<SensorRecord> {
        let sensors = match self.query_sensors() {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Fetch failed, no sensors this cycle");
                return Vec::new();
            }
        };

        let records: Vec<SensorRecord> = sensors
            .into_iter()
            .filter_map(record_from_sensor)
            .collect();
        debug!(count = records.len(), "Collected flat sensor list");
        records
    }
}

/// Reconcile one flat sensor into the common record shape.
///
/// Parent identifiers look like "/amdcpu/0"; a synthetic `computer` root is
/// prefixed so the path framing matches what the classifier expects.
fn record_from_sensor(sensor: WmiSensor) -> Option<SensorRecord> {
    let kind = SensorKind::parse(&sensor.sensor_type)?;

    let mut ancestry_path = vec!["computer".to_string()];
    ancestry_path.extend(
        sensor
            .parent
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    );

    Some(SensorRecord {
        kind,
        raw_label: sensor.name,
        value: value::validate(kind, f64::from(sensor.value)),
        ancestry_path,
        min_value: value::validate(kind, f64::from(sensor.min)),
        max_value: value::validate(kind, f64::from(sensor.max)),
    })
}

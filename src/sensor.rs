//! Core sensor data model shared by both backends.

use serde::{Deserialize, Serialize};

/// Measurement kind, mirroring the upstream sensor taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Temperature,
    Load,
    Clock,
    Power,
    Fan,
    Voltage,
    Current,
    Control,
    Level,
    Data,
    SmallData,
    Throughput,
    Factor,
}

impl SensorKind {
    /// Parse an upstream sensor-type string.
    ///
    /// Returns `None` for unknown types, which makes the node a non-sensor.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Temperature" => Some(SensorKind::Temperature),
            "Load" => Some(SensorKind::Load),
            "Clock" => Some(SensorKind::Clock),
            "Power" => Some(SensorKind::Power),
            "Fan" => Some(SensorKind::Fan),
            "Voltage" => Some(SensorKind::Voltage),
            "Current" => Some(SensorKind::Current),
            "Control" => Some(SensorKind::Control),
            "Level" => Some(SensorKind::Level),
            "Data" => Some(SensorKind::Data),
            "SmallData" => Some(SensorKind::SmallData),
            "Throughput" => Some(SensorKind::Throughput),
            "Factor" => Some(SensorKind::Factor),
            _ => None,
        }
    }

    /// Quantity word and unit used as the canonical metric-name suffix.
    ///
    /// An empty quantity means the kind contributes only a unit (sizes are
    /// already qualified by their label, e.g. "Memory Used").
    pub fn quantity_unit(&self) -> (&'static str, &'static str) {
        match self {
            SensorKind::Temperature => ("temperature", "celsius"),
            SensorKind::Load => ("load", "percent"),
            SensorKind::Clock => ("clock", "mhz"),
            SensorKind::Power => ("power", "watts"),
            SensorKind::Fan => ("speed", "rpm"),
            SensorKind::Voltage => ("voltage", "volts"),
            SensorKind::Current => ("current", "amps"),
            SensorKind::Control => ("control", "percent"),
            SensorKind::Level => ("level", "percent"),
            SensorKind::Data => ("", "gigabytes"),
            SensorKind::SmallData => ("", "megabytes"),
            SensorKind::Throughput => ("throughput", "bytes_per_second"),
            SensorKind::Factor => ("", "ratio"),
        }
    }

    /// Human-readable description used as gauge HELP text.
    pub fn help(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "Temperature in degrees Celsius",
            SensorKind::Load => "Utilization in percent",
            SensorKind::Clock => "Clock frequency in MHz",
            SensorKind::Power => "Power draw in watts",
            SensorKind::Fan => "Fan speed in RPM",
            SensorKind::Voltage => "Voltage in volts",
            SensorKind::Current => "Current in amperes",
            SensorKind::Control => "Control output in percent",
            SensorKind::Level => "Fill level in percent",
            SensorKind::Data => "Data size in gigabytes",
            SensorKind::SmallData => "Data size in megabytes",
            SensorKind::Throughput => "Throughput in bytes per second",
            SensorKind::Factor => "Dimensionless factor",
        }
    }

    /// Whether a negative reading is physically impossible for this kind.
    pub fn cannot_be_negative(&self) -> bool {
        matches!(
            self,
            SensorKind::Temperature
                | SensorKind::Load
                | SensorKind::Clock
                | SensorKind::Power
                | SensorKind::Fan
        )
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Load => "load",
            SensorKind::Clock => "clock",
            SensorKind::Power => "power",
            SensorKind::Fan => "fan",
            SensorKind::Voltage => "voltage",
            SensorKind::Current => "current",
            SensorKind::Control => "control",
            SensorKind::Level => "level",
            SensorKind::Data => "data",
            SensorKind::SmallData => "smalldata",
            SensorKind::Throughput => "throughput",
            SensorKind::Factor => "factor",
        };
        write!(f, "{}", s)
    }
}

/// Hardware component category derived from a sensor's ancestry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareComponent {
    Cpu,
    Gpu,
    Motherboard,
    Memory,
    Storage,
    Network,
    Other,
}

impl HardwareComponent {
    /// Lowercase name used as a metric-name prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            HardwareComponent::Cpu => "cpu",
            HardwareComponent::Gpu => "gpu",
            HardwareComponent::Motherboard => "motherboard",
            HardwareComponent::Memory => "memory",
            HardwareComponent::Storage => "storage",
            HardwareComponent::Network => "network",
            HardwareComponent::Other => "other",
        }
    }
}

impl std::fmt::Display for HardwareComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One physical measurement at one poll cycle.
///
/// Records are created fresh from the backend response each cycle and
/// discarded once folded into the registry; they are never diffed against a
/// previous cycle.
#[derive(Debug, Clone)]
pub struct SensorRecord {
    /// Measurement kind from the upstream taxonomy.
    pub kind: SensorKind,
    /// Upstream display name. Not unique and not stable across backends.
    pub raw_label: String,
    /// Validated value, or `None` when the reading was unparseable or
    /// physically invalid. Never a partial or garbage value.
    pub value: Option<f64>,
    /// Ordered node names from the synthetic root to this sensor.
    pub ancestry_path: Vec<String>,
    /// Observed lower bound, informational only.
    pub min_value: Option<f64>,
    /// Observed upper bound, informational only.
    pub max_value: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(SensorKind::parse("Temperature"), Some(SensorKind::Temperature));
        assert_eq!(SensorKind::parse("SmallData"), Some(SensorKind::SmallData));
        assert_eq!(SensorKind::parse(" Fan "), Some(SensorKind::Fan));
        assert_eq!(SensorKind::parse("Energy"), None);
        assert_eq!(SensorKind::parse(""), None);
    }

    #[test]
    fn test_kind_negativity() {
        assert!(SensorKind::Temperature.cannot_be_negative());
        assert!(SensorKind::Fan.cannot_be_negative());
        assert!(!SensorKind::Voltage.cannot_be_negative());
        assert!(!SensorKind::Factor.cannot_be_negative());
    }

    #[test]
    fn test_component_as_str() {
        assert_eq!(HardwareComponent::Cpu.as_str(), "cpu");
        assert_eq!(HardwareComponent::Motherboard.as_str(), "motherboard");
        assert_eq!(HardwareComponent::Other.to_string(), "other");
    }
}

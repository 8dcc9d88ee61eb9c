//! Three-tier sensor inclusion policy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sensor::{HardwareComponent, SensorKind};

/// Export volume tier, selected once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    /// Highest-value measurement kinds only.
    #[default]
    Essential,
    /// Essential plus secondary kinds.
    Extended,
    /// Everything, no filtering.
    Diagnostic,
}

impl std::fmt::Display for SensorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SensorMode::Essential => "essential",
            SensorMode::Extended => "extended",
            SensorMode::Diagnostic => "diagnostic",
        };
        write!(f, "{}", s)
    }
}

/// Per-component allow-lists deciding which sensors are exported.
///
/// The allow-lists are closed sets: a (component, kind) pair missing from the
/// table is excluded in essential and extended modes. The tables are
/// immutable instance data; evaluation is stateless and per-sensor.
pub struct FilterPolicy {
    essential: HashMap<HardwareComponent, Vec<SensorKind>>,
    extended: HashMap<HardwareComponent, Vec<SensorKind>>,
}

impl FilterPolicy {
    /// Build the policy with the default allow-lists.
    pub fn new() -> Self {
        use HardwareComponent::*;
        use SensorKind::*;

        let essential: HashMap<_, Vec<SensorKind>> = [
            (Cpu, vec![Temperature, Load, Clock]),
            (Gpu, vec![Temperature, Load, Clock]),
            (Motherboard, vec![Temperature, Fan]),
            (Memory, vec![Load, Data]),
            (Storage, vec![Temperature]),
            (Network, vec![Throughput]),
            (Other, vec![Fan]),
        ]
        .into_iter()
        .collect();

        // Secondary kinds added on top of essential in extended mode.
        let extended: HashMap<_, Vec<SensorKind>> = [
            (Cpu, vec![Power, Voltage]),
            (Gpu, vec![Power, Fan, SmallData]),
            (Motherboard, vec![Voltage]),
            (Memory, vec![Clock]),
            (Storage, vec![Load, Data]),
            (Network, vec![Load, Data]),
            (Other, vec![Temperature]),
        ]
        .into_iter()
        .collect();

        Self {
            essential,
            extended,
        }
    }

    /// Decide whether a sensor is exported under the given mode.
    pub fn include(
        &self,
        kind: SensorKind,
        component: HardwareComponent,
        mode: SensorMode,
    ) -> bool {
        match mode {
            SensorMode::Diagnostic => true,
            SensorMode::Essential => allowed(&self.essential, component, kind),
            SensorMode::Extended => {
                allowed(&self.essential, component, kind)
                    || allowed(&self.extended, component, kind)
            }
        }
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::new()
    }
}

fn allowed(
    table: &HashMap<HardwareComponent, Vec<SensorKind>>,
    component: HardwareComponent,
    kind: SensorKind,
) -> bool {
    table
        .get(&component)
        .is_some_and(|kinds| kinds.contains(&kind))
}

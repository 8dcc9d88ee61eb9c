//! Context-aware derivation of canonical metric names.
//!
//! The same raw label can mean different things depending on which component
//! reported it and what is being measured: a bare "Core" under
//! GPU/Temperature is the GPU die, while "Core" under CPU/Power is per-core
//! power draw. Normalization resolves these deterministically so a sensor
//! always maps to the same exported time series.

use std::collections::HashMap;

use crate::sensor::{HardwareComponent, SensorKind};

/// Indexed-label patterns, longest prefix first.
///
/// A label like "CPU Core #3" or "Fan 2" is rewritten to a stem embedding the
/// index, independent of component.
const INDEXED_PREFIXES: &[(&str, &str)] = &[
    ("cpu core", "cpu_core"),
    ("gpu core", "gpu_core"),
    ("gpu fan", "gpu_fan"),
    ("temperature", "temperature"),
    ("voltage", "voltage"),
    ("core", "core"),
    ("fan", "fan"),
];

/// Maps (component, measurement kind, raw label) to a canonical metric key.
///
/// Pure and total: every input produces exactly one output with no hidden
/// state, so re-running normalization on the same sensor always yields the
/// same metric identity. All lookup tables are immutable instance data built
/// at construction.
pub struct NameNormalizer {
    context_rules: HashMap<(HardwareComponent, SensorKind), Vec<(&'static str, &'static str)>>,
    static_table: HashMap<&'static str, &'static str>,
}

impl NameNormalizer {
    /// Build a normalizer with the default rule tables.
    pub fn new() -> Self {
        use HardwareComponent::*;
        use SensorKind::*;

        let mut context_rules: HashMap<_, Vec<(&str, &str)>> = HashMap::new();

        context_rules.insert(
            (Gpu, Temperature),
            vec![
                ("gpu core", "core"),
                ("core", "core"),
                ("gpu hot spot", "hot_spot"),
                ("hot spot", "hot_spot"),
                ("gpu memory junction", "memory_junction"),
            ],
        );
        context_rules.insert(
            (Gpu, Load),
            vec![
                ("gpu core", "core"),
                ("core", "core"),
                ("gpu memory controller", "memory_controller"),
                ("gpu memory", "memory"),
                ("memory", "memory"),
                ("gpu video engine", "video_engine"),
            ],
        );
        context_rules.insert(
            (Gpu, Clock),
            vec![
                ("gpu core", "core"),
                ("core", "core"),
                ("gpu memory", "memory"),
                ("memory", "memory"),
                ("gpu shader", "shader"),
            ],
        );
        context_rules.insert(
            (Gpu, Power),
            vec![
                ("gpu package", "package"),
                ("gpu power", "package"),
                ("package", "package"),
                ("gpu core", "core"),
                ("core", "core"),
            ],
        );
        context_rules.insert((Gpu, Fan), vec![("gpu fan", "fan"), ("fan", "fan")]);
        context_rules.insert(
            (Gpu, SmallData),
            vec![
                ("gpu memory used", "memory_used"),
                ("memory used", "memory_used"),
                ("gpu memory total", "memory_total"),
                ("memory total", "memory_total"),
                ("gpu memory free", "memory_free"),
                ("memory free", "memory_free"),
            ],
        );
        context_rules.insert(
            (Cpu, Temperature),
            vec![
                ("cpu package", "package"),
                ("package", "package"),
                ("core (tctl/tdie)", "tctl_tdie"),
                ("core average", "core_average"),
                ("core max", "core_max"),
                ("cpu", "package"),
            ],
        );
        context_rules.insert(
            (Cpu, Power),
            vec![
                ("cpu package", "package"),
                ("package", "package"),
                ("cpu cores", "cores"),
                ("cores", "cores"),
                ("core", "core"),
                ("cpu total", "total"),
            ],
        );
        context_rules.insert(
            (Cpu, Load),
            vec![
                ("cpu total", "total"),
                ("total", "total"),
                ("cpu core max", "core_max"),
            ],
        );
        context_rules.insert((Cpu, Clock), vec![("bus speed", "bus")]);
        context_rules.insert(
            (Cpu, Voltage),
            vec![("cpu core", "core"), ("core (svi2 tfn)", "core")],
        );
        context_rules.insert(
            (Memory, Load),
            vec![("memory", "load"), ("virtual memory", "virtual_load")],
        );
        context_rules.insert(
            (Memory, Data),
            vec![
                ("memory used", "used"),
                ("used memory", "used"),
                ("memory available", "available"),
                ("available memory", "available"),
                ("virtual memory used", "virtual_used"),
                ("virtual memory available", "virtual_available"),
            ],
        );
        context_rules.insert((Storage, Load), vec![("used space", "used_space")]);
        context_rules.insert(
            (Network, Throughput),
            vec![("upload speed", "upload"), ("download speed", "download")],
        );
        context_rules.insert(
            (Network, Load),
            vec![("network utilization", "utilization")],
        );
        context_rules.insert(
            (Network, Data),
            vec![
                ("data uploaded", "uploaded"),
                ("data downloaded", "downloaded"),
            ],
        );

        // Labels that mean the same thing regardless of component. Values are
        // complete keys, not stems.
        let static_table: HashMap<&str, &str> = [
            ("vcore", "cpu_vcore_volts"),
            ("cpu vcore", "cpu_vcore_volts"),
            ("+12v", "rail_12v_volts"),
            ("12v", "rail_12v_volts"),
            ("+5v", "rail_5v_volts"),
            ("5v", "rail_5v_volts"),
            ("+3.3v", "rail_3_3v_volts"),
            ("3.3v", "rail_3_3v_volts"),
            ("3vcc", "rail_3_3v_volts"),
            ("avcc", "avcc_volts"),
            ("vbat", "vbat_volts"),
            ("cmos battery", "vbat_volts"),
            ("vtt", "vtt_volts"),
        ]
        .into_iter()
        .collect();

        Self {
            context_rules,
            static_table,
        }
    }

    /// Derive the canonical metric key for one sensor.
    ///
    /// Precedence: numbered-instance patterns, then (component, kind) context
    /// rules, then the unqualified static table, then fallback derivation
    /// from the label itself.
    pub fn normalize(
        &self,
        component: HardwareComponent,
        kind: SensorKind,
        raw_label: &str,
    ) -> String {
        let label = raw_label.trim().to_lowercase();

        if let Some(stem) = match_indexed(&label) {
            return self.finish(component, kind, &stem);
        }

        if let Some(rules) = self.context_rules.get(&(component, kind)) {
            for (pattern, stem) in rules {
                if label == *pattern {
                    return self.finish(component, kind, stem);
                }
            }
        }

        if let Some(key) = self.static_table.get(label.as_str()) {
            return (*key).to_string();
        }

        self.finish(component, kind, &sanitize_metric_name(&label))
    }

    /// Assemble `{component}_{stem}_{quantity}_{unit}`, eliding the component
    /// prefix when the stem already carries it and the quantity word when the
    /// stem already contains it.
    fn finish(&self, component: HardwareComponent, kind: SensorKind, stem: &str) -> String {
        let comp = component.as_str();
        let (quantity, unit) = kind.quantity_unit();

        let mut parts: Vec<&str> = Vec::with_capacity(4);
        if stem != comp && !stem.starts_with(&format!("{}_", comp)) {
            parts.push(comp);
        }
        if !stem.is_empty() {
            parts.push(stem);
        }
        if !quantity.is_empty() && !stem.contains(quantity) {
            parts.push(quantity);
        }
        parts.push(unit);

        sanitize_metric_name(&parts.join("_"))
    }
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Match an indexed label ("cpu core #3", "fan 2") against the known
/// numbered-instance patterns and return the stem with the index embedded.
fn match_indexed(label: &str) -> Option<String> {
    for (prefix, stem) in INDEXED_PREFIXES {
        if let Some(rest) = label.strip_prefix(prefix) {
            let rest = rest.trim_start().trim_start_matches('#');
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                return Some(format!("{}_{}", stem, rest));
            }
        }
    }
    None
}

/// Sanitize a metric name to be Prometheus-compatible.
///
/// Names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`: invalid characters become
/// underscores, runs of underscores collapse, a leading digit is prefixed
/// with an underscore.
pub fn sanitize_metric_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 1);
    let mut last_was_underscore = false;

    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        result.push('_');
        last_was_underscore = true;
    }

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            last_was_underscore = false;
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        result.push_str("unnamed");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::HardwareComponent::*;
    use crate::sensor::SensorKind::*;

    #[test]
    fn test_numbered_core_patterns() {
        let n = NameNormalizer::new();
        assert_eq!(n.normalize(Cpu, Load, "CPU Core #1"), "cpu_core_1_load_percent");
        assert_eq!(n.normalize(Cpu, Clock, "Core #2"), "cpu_core_2_clock_mhz");
        // Both spellings of the same physical core agree.
        assert_eq!(
            n.normalize(Cpu, Clock, "CPU Core #2"),
            n.normalize(Cpu, Clock, "Core #2")
        );
    }

    #[test]
    fn test_numbered_fan_and_probe_patterns() {
        let n = NameNormalizer::new();
        assert_eq!(
            n.normalize(Motherboard, Fan, "Fan #3"),
            "motherboard_fan_3_speed_rpm"
        );
        assert_eq!(
            n.normalize(Motherboard, Temperature, "Temperature #1"),
            "motherboard_temperature_1_celsius"
        );
        assert_eq!(
            n.normalize(Motherboard, Voltage, "Voltage #2"),
            "motherboard_voltage_2_volts"
        );
        // The hash mark is optional.
        assert_eq!(
            n.normalize(Motherboard, Fan, "Fan 3"),
            "motherboard_fan_3_speed_rpm"
        );
    }

    #[test]
    fn test_context_disambiguates_bare_core() {
        let n = NameNormalizer::new();
        // The same raw label means different things per (component, kind).
        assert_eq!(
            n.normalize(Gpu, Temperature, "Core"),
            "gpu_core_temperature_celsius"
        );
        assert_eq!(n.normalize(Cpu, Power, "Core"), "cpu_core_power_watts");
        assert_eq!(n.normalize(Gpu, Load, "Core"), "gpu_core_load_percent");
    }

    #[test]
    fn test_context_memory_rules() {
        let n = NameNormalizer::new();
        assert_eq!(n.normalize(Memory, Load, "Memory"), "memory_load_percent");
        assert_eq!(n.normalize(Memory, Data, "Memory Used"), "memory_used_gigabytes");
        assert_eq!(
            n.normalize(Memory, Data, "Memory Available"),
            "memory_available_gigabytes"
        );
        assert_eq!(
            n.normalize(Gpu, SmallData, "GPU Memory Used"),
            "gpu_memory_used_megabytes"
        );
    }

    #[test]
    fn test_static_rail_table_ignores_component() {
        let n = NameNormalizer::new();
        assert_eq!(n.normalize(Motherboard, Voltage, "Vcore"), "cpu_vcore_volts");
        assert_eq!(n.normalize(Other, Voltage, "Vcore"), "cpu_vcore_volts");
        assert_eq!(n.normalize(Motherboard, Voltage, "+12V"), "rail_12v_volts");
        assert_eq!(n.normalize(Motherboard, Voltage, "+3.3V"), "rail_3_3v_volts");
        assert_eq!(n.normalize(Motherboard, Voltage, "AVCC"), "avcc_volts");
    }

    #[test]
    fn test_fallback_derivation() {
        let n = NameNormalizer::new();
        assert_eq!(
            n.normalize(Gpu, Temperature, "Hot Spot 2"),
            "gpu_hot_spot_2_temperature_celsius"
        );
        assert_eq!(
            n.normalize(Motherboard, Fan, "CPU Fan"),
            "motherboard_cpu_fan_speed_rpm"
        );
        // Component prefix is not doubled when already present.
        assert_eq!(
            n.normalize(Gpu, Fan, "GPU Fan"),
            "gpu_fan_speed_rpm"
        );
        assert_eq!(
            n.normalize(Storage, Temperature, "Temperature 3 (Airflow)"),
            "storage_temperature_3_airflow_celsius"
        );
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let n = NameNormalizer::new();
        let inputs = [
            (Gpu, Temperature, "Core"),
            (Cpu, Load, "CPU Core #7"),
            (Motherboard, Voltage, "+12V"),
            (Other, Factor, "Weird ~ Label!!"),
        ];
        for (component, kind, label) in inputs {
            let a = n.normalize(component, kind, label);
            let b = n.normalize(component, kind, label);
            assert_eq!(a, b, "normalization must be pure for {:?}", label);
        }
    }

    #[test]
    fn test_sanitize_metric_name() {
        assert_eq!(sanitize_metric_name("gpu core"), "gpu_core");
        assert_eq!(sanitize_metric_name("core (tctl/tdie)"), "core_tctl_tdie");
        assert_eq!(sanitize_metric_name("a//b  c"), "a_b_c");
        assert_eq!(sanitize_metric_name("3vsb"), "_3vsb");
        assert_eq!(sanitize_metric_name("!!!"), "unnamed");
    }
}

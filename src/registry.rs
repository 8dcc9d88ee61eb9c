//! Memoized, thread-safe gauge registry.
//!
//! The poll loop writes gauges while the HTTP scrape path reads them; the
//! memo map is the only piece of state they share. Gauge values themselves
//! are atomic inside the prometheus crate, so a concurrent scrape never
//! observes a torn value.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use tracing::{debug, warn};

use crate::sensor::SensorKind;

/// Gauge registry keyed by canonical metric name.
///
/// Gauges are created lazily on first observation and never removed: a
/// sensor that disappears for a cycle simply stops being updated, preserving
/// its last published value at the transport layer.
pub struct MetricRegistry {
    registry: Registry,
    gauges: RwLock<HashMap<String, Gauge>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            gauges: RwLock::new(HashMap::new()),
        }
    }

    /// Get the gauge for a canonical key, creating and registering it on
    /// first observation. The HELP text is derived from the measurement kind.
    ///
    /// Returns `None` only when the key is not a valid metric name, which
    /// normalized keys never are.
    pub fn get_or_create(&self, key: &str, kind: SensorKind) -> Option<Gauge> {
        if let Some(gauge) = self.gauges.read().get(key) {
            return Some(gauge.clone());
        }

        let mut gauges = self.gauges.write();
        // Another writer may have raced us between the read and write locks.
        if let Some(gauge) = gauges.get(key) {
            return Some(gauge.clone());
        }

        let gauge = match Gauge::with_opts(Opts::new(key, kind.help())) {
            Ok(g) => g,
            Err(e) => {
                warn!(key, error = %e, "Invalid metric name, dropping gauge");
                return None;
            }
        };

        if let Err(e) = self.registry.register(Box::new(gauge.clone())) {
            // Duplicate registration cannot normally happen because of the
            // memo map; log and keep the unregistered handle.
            warn!(key, error = %e, "Failed to register gauge");
        } else {
            debug!(key, kind = %kind, "Registered new gauge");
        }

        gauges.insert(key.to_string(), gauge.clone());
        Some(gauge)
    }

    /// Update the gauge for a key, creating it if needed.
    pub fn set(&self, key: &str, kind: SensorKind, value: f64) {
        if let Some(gauge) = self.get_or_create(key, kind) {
            gauge.set(value);
        }
    }

    /// Number of distinct gauges created so far.
    pub fn gauge_count(&self) -> usize {
        self.gauges.read().len()
    }

    /// Canonical keys currently registered, sorted. Mostly useful in tests.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.gauges.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Current value of a gauge, if it exists.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.gauges.read().get(key).map(|g| g.get())
    }

    /// Render all gauges in the Prometheus text exposition format as an
    /// atomic snapshot.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::with_capacity(families.len() * 100);
        if let Err(e) = encoder.encode(&families, &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shareable registry handle passed to both the poll loop and the HTTP
/// serving path.
pub type SharedRegistry = Arc<MetricRegistry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_memoizes() {
        let registry = MetricRegistry::new();
        let a = registry
            .get_or_create("cpu_core_1_load_percent", SensorKind::Load)
            .unwrap();
        let b = registry
            .get_or_create("cpu_core_1_load_percent", SensorKind::Load)
            .unwrap();

        a.set(42.0);
        // Same underlying gauge: the second handle sees the first's write.
        assert_eq!(b.get(), 42.0);
        assert_eq!(registry.gauge_count(), 1);
    }

    #[test]
    fn test_distinct_keys_distinct_gauges() {
        let registry = MetricRegistry::new();
        let a = registry
            .get_or_create("gpu_core_temperature_celsius", SensorKind::Temperature)
            .unwrap();
        let b = registry
            .get_or_create("cpu_package_temperature_celsius", SensorKind::Temperature)
            .unwrap();

        a.set(61.0);
        b.set(45.0);
        assert_eq!(a.get(), 61.0);
        assert_eq!(b.get(), 45.0);
        assert_eq!(registry.gauge_count(), 2);
    }

    #[test]
    fn test_set_and_value() {
        let registry = MetricRegistry::new();
        registry.set("motherboard_fan_1_speed_rpm", SensorKind::Fan, 1350.0);
        assert_eq!(registry.value("motherboard_fan_1_speed_rpm"), Some(1350.0));
        assert_eq!(registry.value("missing_key"), None);
    }

    #[test]
    fn test_render_exposition_format() {
        let registry = MetricRegistry::new();
        registry.set("gpu_core_temperature_celsius", SensorKind::Temperature, 61.0);

        let output = registry.render();
        assert!(output.contains("# HELP gpu_core_temperature_celsius Temperature in degrees Celsius"));
        assert!(output.contains("# TYPE gpu_core_temperature_celsius gauge"));
        assert!(output.contains("gpu_core_temperature_celsius 61"));
    }

    #[test]
    fn test_render_empty_registry() {
        let registry = MetricRegistry::new();
        assert_eq!(registry.render(), "");
    }

    #[test]
    fn test_concurrent_writers_do_not_corrupt_map() {
        let registry = Arc::new(MetricRegistry::new());

        std::thread::scope(|scope| {
            for t in 0..8 {
                let registry = registry.clone();
                scope.spawn(move || {
                    for i in 0..50 {
                        let key = format!("cpu_core_{}_load_percent", i % 10);
                        registry.set(&key, SensorKind::Load, (t * i) as f64);
                    }
                });
            }
        });

        // 10 distinct keys regardless of write interleaving.
        assert_eq!(registry.gauge_count(), 10);
        for key in registry.keys() {
            assert!(registry.value(&key).is_some());
        }
    }
}

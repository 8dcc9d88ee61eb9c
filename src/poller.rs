//! The serial poll loop driving the ingestion pipeline.
//!
//! Each cycle: fetch → classify → filter → value check → normalize → set.
//! Cycles never overlap; an overlong cycle is followed immediately rather
//! than concurrently. The loop shares only the metric registry with the
//! HTTP serving path.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::classify::PathClassifier;
use crate::filter::{FilterPolicy, SensorMode};
use crate::normalize::NameNormalizer;
use crate::registry::SharedRegistry;
use crate::source::SensorSource;

/// Running totals across poll cycles, logged at shutdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollStats {
    /// Completed poll cycles, connected or not.
    pub cycles: u64,
    /// Records returned by the backend.
    pub records_seen: u64,
    /// Records folded into the registry.
    pub exported: u64,
    /// Records excluded by the mode's allow-lists.
    pub filtered: u64,
    /// Records dropped for an unparseable or physically invalid value.
    pub dropped_invalid: u64,
}

/// Owns the pipeline and drives it at a fixed interval.
pub struct SensorPoller {
    source: Option<Box<dyn SensorSource>>,
    classifier: PathClassifier,
    normalizer: NameNormalizer,
    filter: FilterPolicy,
    registry: SharedRegistry,
    mode: SensorMode,
    poll_interval: Duration,
    /// Cleared after a total fetch failure; a successful re-probe of the
    /// active backend restores it. The backend choice is never renegotiated.
    healthy: bool,
    stats: PollStats,
}

impl SensorPoller {
    pub fn new(
        source: Option<Box<dyn SensorSource>>,
        registry: SharedRegistry,
        mode: SensorMode,
        poll_interval: Duration,
    ) -> Self {
        let healthy = source.is_some();
        Self {
            source,
            classifier: PathClassifier::new(),
            normalizer: NameNormalizer::new(),
            filter: FilterPolicy::new(),
            registry,
            mode,
            poll_interval,
            healthy,
            stats: PollStats::default(),
        }
    }

    /// Run the poll loop until the shutdown signal flips.
    ///
    /// Returns the accumulated statistics for the final log line.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> PollStats {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.poll_interval.as_secs(),
            mode = %self.mode,
            "Starting sensor poller"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Sensor poller stopped");
        self.stats
    }

    /// One poll cycle. Per-sensor failures never abort the cycle.
    async fn poll_once(&mut self) {
        self.stats.cycles += 1;

        let Some(source) = self.source.as_mut() else {
            warn!("Not connected to any sensor backend; metrics stay empty until restart");
            return;
        };

        if !self.healthy {
            if source.probe().await {
                info!(backend = source.name(), "Backend reachable again");
                self.healthy = true;
            } else {
                warn!(backend = source.name(), "Backend still unreachable");
                return;
            }
        }

        let records = source.fetch().await;
        self.stats.records_seen += records.len() as u64;

        if records.is_empty() {
            // Registry left untouched: gauges keep their last values.
            warn!(
                backend = source.name(),
                "Fetch produced no sensors; re-probing next cycle"
            );
            self.healthy = false;
            return;
        }

        let mut exported = 0u64;
        let mut filtered = 0u64;
        let mut dropped = 0u64;

        for record in &records {
            let component = self.classifier.classify(&record.ancestry_path);

            if !self.filter.include(record.kind, component, self.mode) {
                filtered += 1;
                continue;
            }

            let Some(value) = record.value else {
                dropped += 1;
                debug!(
                    label = %record.raw_label,
                    kind = %record.kind,
                    "Dropping sensor with invalid value"
                );
                continue;
            };

            let key = self
                .normalizer
                .normalize(component, record.kind, &record.raw_label);
            self.registry.set(&key, record.kind, value);
            exported += 1;
        }

        self.stats.exported += exported;
        self.stats.filtered += filtered;
        self.stats.dropped_invalid += dropped;

        debug!(
            records = records.len(),
            exported, filtered, dropped,
            gauges = self.registry.gauge_count(),
            "Poll cycle complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::registry::MetricRegistry;
    use crate::sensor::SensorRecord;
    use crate::source::tree;

    /// Backend returning a canned record set, or nothing to simulate a
    /// total fetch failure.
    struct FakeSource {
        records: Vec<SensorRecord>,
        probe_ok: bool,
    }

    #[async_trait]
    impl SensorSource for FakeSource {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn probe(&mut self) -> bool {
            self.probe_ok
        }

        async fn fetch(&mut self) -> Vec<SensorRecord> {
            self.records.clone()
        }
    }

    const SYNTHETIC_DOC: &str = r#"{
        "Text": "Sensor",
        "Children": [{
            "Text": "DESKTOP-TEST",
            "Children": [
                {
                    "Text": "NVIDIA GeForce RTX 3080",
                    "Children": [{
                        "Text": "Temperatures",
                        "Children": [{
                            "Text": "Core",
                            "Type": "Temperature",
                            "Value": "61,0 °C"
                        }]
                    }]
                },
                {
                    "Text": "NVIDIA GeForce RTX 3080",
                    "Children": [{
                        "Text": "Powers",
                        "Children": [{
                            "Text": "GPU Package",
                            "Type": "Power",
                            "Value": "220,5 W"
                        }]
                    }]
                }
            ]
        }]
    }"#;

    fn poller_with(
        records: Vec<SensorRecord>,
        registry: SharedRegistry,
        mode: SensorMode,
    ) -> SensorPoller {
        SensorPoller::new(
            Some(Box::new(FakeSource {
                records,
                probe_ok: true,
            })),
            registry,
            mode,
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_gpu_core_temperature() {
        let records = tree::parse_records(SYNTHETIC_DOC).unwrap();
        let registry = Arc::new(MetricRegistry::new());
        let mut poller = poller_with(records, registry.clone(), SensorMode::Essential);

        poller.poll_once().await;

        // Essential mode: the GPU power sensor is filtered, leaving exactly
        // the core temperature gauge.
        assert_eq!(registry.gauge_count(), 1);
        assert_eq!(registry.value("gpu_core_temperature_celsius"), Some(61.0));
    }

    #[tokio::test]
    async fn test_diagnostic_is_superset_of_essential() {
        let records = tree::parse_records(SYNTHETIC_DOC).unwrap();

        let essential_registry = Arc::new(MetricRegistry::new());
        let mut poller = poller_with(
            records.clone(),
            essential_registry.clone(),
            SensorMode::Essential,
        );
        poller.poll_once().await;

        let diagnostic_registry = Arc::new(MetricRegistry::new());
        let mut poller = poller_with(
            records,
            diagnostic_registry.clone(),
            SensorMode::Diagnostic,
        );
        poller.poll_once().await;

        let essential_keys = essential_registry.keys();
        let diagnostic_keys = diagnostic_registry.keys();
        for key in &essential_keys {
            assert!(
                diagnostic_keys.contains(key),
                "{} present in essential but missing in diagnostic",
                key
            );
        }
        assert!(diagnostic_keys.len() > essential_keys.len());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_registry_unchanged() {
        let records = tree::parse_records(SYNTHETIC_DOC).unwrap();
        let registry = Arc::new(MetricRegistry::new());
        let mut poller = poller_with(records, registry.clone(), SensorMode::Diagnostic);
        poller.poll_once().await;

        let keys_before = registry.keys();
        let values_before: Vec<Option<f64>> =
            keys_before.iter().map(|k| registry.value(k)).collect();

        // Swap in a failing backend: empty fetch, failing probe.
        poller.source = Some(Box::new(FakeSource {
            records: Vec::new(),
            probe_ok: false,
        }));
        poller.poll_once().await;
        poller.poll_once().await;

        assert_eq!(registry.keys(), keys_before);
        let values_after: Vec<Option<f64>> =
            keys_before.iter().map(|k| registry.value(k)).collect();
        assert_eq!(values_after, values_before);
    }

    #[tokio::test]
    async fn test_disconnected_poller_exports_nothing() {
        let registry = Arc::new(MetricRegistry::new());
        let mut poller = SensorPoller::new(
            None,
            registry.clone(),
            SensorMode::Diagnostic,
            Duration::from_secs(1),
        );

        poller.poll_once().await;
        assert_eq!(registry.gauge_count(), 0);
        assert_eq!(poller.stats.cycles, 1);
    }

    #[tokio::test]
    async fn test_invalid_value_drops_sensor_not_cycle() {
        let doc = r#"{
            "Text": "Sensor",
            "Children": [{
                "Text": "HOST",
                "Children": [{
                    "Text": "AMD Ryzen 9 5900X",
                    "Children": [
                        { "Text": "CPU Total", "Type": "Load", "Value": "-" },
                        { "Text": "CPU Core #1", "Type": "Load", "Value": "37,5 %" }
                    ]
                }]
            }]
        }"#;
        let records = tree::parse_records(doc).unwrap();
        let registry = Arc::new(MetricRegistry::new());
        let mut poller = poller_with(records, registry.clone(), SensorMode::Essential);

        poller.poll_once().await;

        // The sibling with a valid value is still processed.
        assert_eq!(registry.gauge_count(), 1);
        assert_eq!(registry.value("cpu_core_1_load_percent"), Some(37.5));
        assert_eq!(poller.stats.dropped_invalid, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let registry = Arc::new(MetricRegistry::new());
        let poller = poller_with(Vec::new(), registry, SensorMode::Essential);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(poller.run(rx));

        tx.send(true).unwrap();
        let stats = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
        assert!(stats.cycles <= 2);
    }
}

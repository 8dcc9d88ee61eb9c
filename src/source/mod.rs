//! Sensor source backends.
//!
//! Two structurally different backends yield the same `SensorRecord` stream:
//! the tree backend flattens the daemon's hierarchical JSON document, the
//! flat backend (Windows only) queries the management interface directly.
//! Downstream code never type-sniffs the record shape.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::SourceConfig;
use crate::sensor::SensorRecord;

pub mod tree;
#[cfg(windows)]
pub mod wmi;

pub use tree::TreeSource;

/// A backend producing sensor records.
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Side-effecting connectivity test. Performed once at startup and
    /// re-attempted only after a total fetch failure.
    async fn probe(&mut self) -> bool;

    /// Fetch all sensor records for one cycle.
    ///
    /// Never fails: transport, parse, and semantic errors are logged and
    /// yield an empty sequence.
    async fn fetch(&mut self) -> Vec<SensorRecord>;
}

/// Probe backends in preference order and return the first that answers.
///
/// The tree backend is attempted first, the flat backend second. The choice
/// persists for the process lifetime; `None` means the exporter runs
/// disconnected and serves an empty metrics set until restarted.
pub async fn select_backend(config: &SourceConfig) -> Option<Box<dyn SensorSource>> {
    let mut tree = TreeSource::new(config);
    if tree.probe().await {
        info!(backend = tree.name(), "Connected to sensor backend");
        return Some(Box::new(tree));
    }
    warn!(
        host = %config.host,
        port = config.port,
        "Tree backend unreachable, trying flat backend"
    );

    #[cfg(windows)]
    {
        let mut flat = wmi::WmiSource::new();
        if flat.probe().await {
            info!(backend = flat.name(), "Connected to sensor backend");
            return Some(Box::new(flat));
        }
    }

    warn!("No sensor backend available; metrics will stay empty until restart");
    None
}

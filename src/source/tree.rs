//! HTTP tree backend.
//!
//! Fetches the monitoring daemon's hierarchical JSON document and flattens
//! it into sensor records. The document is recursive: any node may carry
//! sensor fields (type + value) in addition to children, so every node is
//! checked for "is this a sensor" independent of whether it has children.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::SourceConfig;
use crate::sensor::{SensorKind, SensorRecord};
use crate::source::SensorSource;
use crate::value;

/// Root label used when the document omits one. The classifier skips this
/// marker together with the machine-name segment that follows it.
const ROOT_LABEL: &str = "Sensor";

/// One node of the daemon's JSON document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TreeNode {
    #[serde(default)]
    text: String,
    #[serde(default)]
    children: Vec<TreeNode>,
    #[serde(rename = "Type", default)]
    sensor_type: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    min: Option<String>,
    #[serde(default)]
    max: Option<String>,
}

/// Top-level document. A missing `Children` field marks the backend as
/// invalid, which is distinct from an empty child list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TreeDocument {
    #[serde(default)]
    text: String,
    children: Option<Vec<TreeNode>>,
}

/// Sensor source backed by the daemon's HTTP JSON endpoint.
pub struct TreeSource {
    client: reqwest::Client,
    url: String,
}

impl TreeSource {
    pub fn new(config: &SourceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: format!("http://{}:{}/data.json", config.host, config.port),
        }
    }

    async fn fetch_document(&self) -> Result<TreeDocument> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url))?;

        if !response.status().is_success() {
            bail!("unexpected status {} from {}", response.status(), self.url);
        }

        let document: TreeDocument = response
            .json()
            .await
            .context("failed to decode sensor document")?;

        if document.children.is_none() {
            bail!("sensor document has no top-level children");
        }

        Ok(document)
    }
}

#[async_trait]
impl SensorSource for TreeSource {
    fn name(&self) -> &'static str {
        "tree"
    }

    async fn probe(&mut self) -> bool {
        match self.fetch_document().await {
            Ok(_) => true,
            Err(e) => {
                debug!(url = %self.url, error = %e, "Tree backend probe failed");
                false
            }
        }
    }

    async fn fetch(&mut self) -> Vec<SensorRecord> {
        let document = match self.fetch_document().await {
            Ok(d) => d,
            Err(e) => {
                warn!(url = %self.url, error = %e, "Fetch failed, no sensors this cycle");
                return Vec::new();
            }
        };

        let records = flatten_document(&document);
        debug!(count = records.len(), "Flattened sensor document");
        records
    }
}

/// Flatten a document into sensor records, threading the path-so-far value
/// through the traversal instead of mutating shared accumulator state.
fn flatten_document(document: &TreeDocument) -> Vec<SensorRecord> {
    let root_label = if document.text.trim().is_empty() {
        ROOT_LABEL.to_string()
    } else {
        document.text.clone()
    };

    let mut records = Vec::new();
    let path = vec![root_label];
    for child in document.children.as_deref().unwrap_or(&[]) {
        flatten_node(child, &path, &mut records);
    }
    records
}

fn flatten_node(node: &TreeNode, path: &[String], out: &mut Vec<SensorRecord>) {
    if let Some(kind) = node.sensor_type.as_deref().and_then(SensorKind::parse) {
        if let Some(raw) = &node.value {
            out.push(SensorRecord {
                kind,
                raw_label: node.text.clone(),
                value: value::parse(raw, kind),
                ancestry_path: path.to_vec(),
                min_value: node.min.as_deref().and_then(|s| value::parse(s, kind)),
                max_value: node.max.as_deref().and_then(|s| value::parse(s, kind)),
            });
        }
    }

    if node.children.is_empty() {
        return;
    }

    let mut child_path = Vec::with_capacity(path.len() + 1);
    child_path.extend_from_slice(path);
    child_path.push(node.text.clone());
    for child in &node.children {
        flatten_node(child, &child_path, out);
    }
}

/// Parse a raw document body into sensor records.
///
/// Exposed for pipeline tests with synthetic documents.
pub(crate) fn parse_records(body: &str) -> Result<Vec<SensorRecord>> {
    let document: TreeDocument =
        serde_json::from_str(body).context("failed to decode sensor document")?;
    if document.children.is_none() {
        bail!("sensor document has no top-level children");
    }
    Ok(flatten_document(&document))
}

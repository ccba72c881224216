use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw topology snapshot as delivered by the ingestion layer.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub tenant: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default = "default_connection_count")]
    pub connection_count: u64,
    #[serde(default)]
    pub status_counts: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

fn default_connection_count() -> u64 {
    1
}

/// Parses a snapshot document, skipping individual node or edge entries that
/// do not match the expected shape.
///
/// Accepts either `{ "nodes": [...], "edges": [...] }` or the same object
/// wrapped in a top-level `"data"` field.
pub fn parse_snapshot(raw: &str) -> Result<Snapshot> {
    let parsed: Value = serde_json::from_str(raw).context("invalid snapshot JSON")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("snapshot JSON must be an object"))?;

    let object = match object.get("data").and_then(Value::as_object) {
        Some(inner) if !object.contains_key("nodes") => inner,
        _ => object,
    };

    let raw_nodes = object
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("snapshot JSON has no \"nodes\" array"))?;
    let raw_edges = match object.get("edges") {
        Some(value) => value
            .as_array()
            .ok_or_else(|| anyhow!("snapshot \"edges\" is not an array"))?
            .as_slice(),
        None => &[],
    };

    let mut nodes = Vec::with_capacity(raw_nodes.len());
    let mut skipped_nodes = 0usize;
    for value in raw_nodes {
        match NodeRecord::deserialize(value) {
            Ok(node) if !node.id.is_empty() => nodes.push(normalize_node(node)),
            _ => skipped_nodes += 1,
        }
    }

    let mut edges = Vec::with_capacity(raw_edges.len());
    let mut skipped_edges = 0usize;
    for (index, value) in raw_edges.iter().enumerate() {
        match EdgeRecord::deserialize(value) {
            Ok(mut edge) => {
                if edge.id.is_empty() {
                    edge.id = format!("{}->{}#{index}", edge.source, edge.target);
                }
                edges.push(edge);
            }
            Err(_) => skipped_edges += 1,
        }
    }

    if skipped_nodes > 0 || skipped_edges > 0 {
        tracing::warn!(skipped_nodes, skipped_edges, "skipped malformed snapshot entries");
    }

    Ok(Snapshot { nodes, edges })
}

fn normalize_node(mut node: NodeRecord) -> NodeRecord {
    if node.tenant.trim().is_empty() {
        node.tenant = "default".to_owned();
    }
    if node.service.trim().is_empty() {
        node.service = "default".to_owned();
    }
    if node.label.is_empty() {
        node.label = node.id.clone();
    }
    node
}

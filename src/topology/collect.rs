use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::parse::{Snapshot, parse_snapshot};

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot file {}", path.display()))?;

    let snapshot = parse_snapshot(&raw)
        .with_context(|| format!("failed to parse snapshot file {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "loaded topology snapshot"
    );
    Ok(snapshot)
}

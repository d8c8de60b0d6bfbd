//! Point file loading.
//!
//! A point file is JSON: either an array of point objects or an object with
//! a `points` array. Each object is read the same way a table row is, so
//! column aliases such as `type`, `position` or `hh` are accepted.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use stgen_model::PointRecord;
use tracing::debug;

#[derive(Deserialize)]
#[serde(untagged)]
enum PointFile {
    List(Vec<PointRecord>),
    Wrapped { points: Vec<PointRecord> },
}

/// Parses point records from JSON text.
pub fn parse_points(text: &str) -> Result<Vec<PointRecord>> {
    let file: PointFile =
        serde_json::from_str(text).context("expected a JSON array of points or {\"points\": [...]}")?;
    Ok(match file {
        PointFile::List(points) | PointFile::Wrapped { points } => points,
    })
}

/// Reads and parses a point file.
pub fn load_points(path: &Path) -> Result<Vec<PointRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read point file {}", path.display()))?;
    let points = parse_points(&text).with_context(|| format!("parse {}", path.display()))?;
    debug!(path = %path.display(), count = points.len(), "point file loaded");
    Ok(points)
}

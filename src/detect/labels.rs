use anyhow::{Context, Result};
use std::path::Path;

/// Used when no label file is configured or the file holds no names.
pub const DEFAULT_LABELS: &[&str] = &["speaker"];

/// Read one class name per line. Blank lines and surrounding whitespace are
/// ignored.
pub fn read_labels(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read label file {}", path.display()))?;
    Ok(parse_labels(&raw))
}

pub fn parse_labels(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Labels from `path`, falling back to [`DEFAULT_LABELS`].
pub fn load_labels(path: Option<&Path>) -> Result<Vec<String>> {
    let labels = match path {
        Some(path) => read_labels(path)?,
        None => Vec::new(),
    };
    if labels.is_empty() {
        log::warn!("no detector labels found; using built-in names");
        return Ok(DEFAULT_LABELS.iter().map(|s| s.to_string()).collect());
    }
    Ok(labels)
}

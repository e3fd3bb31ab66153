//! Manifest and mirror files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use ledgerform_core::{Manifest, Mirror};

/// Reads and parses a manifest.
pub fn load_manifest(path: &Path) -> anyhow::Result<Manifest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    Manifest::from_json(&raw).with_context(|| format!("Invalid manifest {}", path.display()))
}

/// Reads the mirror, or an empty one when the file does not exist yet.
pub fn load_mirror(path: &Path) -> anyhow::Result<Mirror> {
    if !path.exists() {
        return Ok(Mirror::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Corrupt state file {}", path.display()))
}

/// Writes the mirror next to `path` and renames it into place.
pub fn save_mirror(path: &Path, mirror: &Mirror) -> anyhow::Result<()> {
    let tmp = temp_path(path);
    let json = serde_json::to_string_pretty(mirror).context("Failed to encode state")?;
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use super::LayerFile;

const LAYERS_RELATIVE_PATH: &str = "data/layers.json";

pub fn layers_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(LAYERS_RELATIVE_PATH)
}

pub fn load_layer_file() -> Result<LayerFile> {
    load_layer_file_from_path(layers_path())
}

pub fn load_layer_file_from_path(path: impl AsRef<Path>) -> Result<LayerFile> {
    read_json(path.as_ref(), "layer definitions")
}

pub fn parse_layer_file(json: &str) -> Result<LayerFile> {
    serde_json::from_str(json).context("failed parsing layer definitions as JSON")
}

fn read_json<T>(path: &Path, label: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {label} file: {}", path.display()))?;

    serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing {label} file as JSON: {}", path.display()))
}

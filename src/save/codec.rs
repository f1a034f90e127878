use anyhow::{Context, Result, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::SaveData;

pub fn save_to_json_string(save: &SaveData) -> Result<String> {
    serde_json::to_string(save).context("failed to serialize save data to JSON")
}

pub fn load_from_json_string(json: &str) -> Result<SaveData> {
    serde_json::from_str(json).context("failed to parse save JSON")
}

/// Shareable save string: base64 over the JSON form.
pub fn export_to_base64(save: &SaveData) -> Result<String> {
    let json = save_to_json_string(save)?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Accepts a pasted save string, base64 or raw JSON.
pub fn import_from_base64(pasted: &str) -> Result<SaveData> {
    let trimmed = pasted.trim();
    if trimmed.is_empty() {
        bail!("save payload is empty");
    }
    if trimmed.starts_with('{') {
        return load_from_json_string(trimmed);
    }
    let raw = STANDARD
        .decode(trimmed)
        .context("failed to decode base64 save payload")?;
    let json = String::from_utf8(raw).context("decoded base64 payload is not UTF-8")?;
    load_from_json_string(&json)
}

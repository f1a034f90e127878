use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SaveResource {
    pub key: String,
    pub value: Decimal,
    pub best: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SaveBuyable {
    pub key: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SaveUpgrade {
    pub key: String,
    pub purchased: bool,
}

/// Snapshot of every persistent value, keyed by qualified keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveData {
    pub version: u32,
    pub paused: bool,
    pub tick_index: u64,
    pub elapsed_seconds: f64,
    pub resources: Vec<SaveResource>,
    pub buyables: Vec<SaveBuyable>,
    pub upgrades: Vec<SaveUpgrade>,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            paused: false,
            tick_index: 0,
            elapsed_seconds: 0.0,
            resources: Vec::new(),
            buyables: Vec::new(),
            upgrades: Vec::new(),
        }
    }
}

//! Errors raised while assembling layers.

use thiserror::Error;

use crate::decimal::Decimal;

/// Configuration mistakes detected when a layer is constructed.
///
/// None of these can surface from conversions, purchases, resets or ticks;
/// those operations either succeed or are no-ops.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("layer `{0}` is already defined")]
    DuplicateLayer(String),

    #[error("layer `{layer}` already defines `{key}`")]
    DuplicateKey { layer: String, key: String },

    #[error("unknown resource handle #{0}")]
    UnknownResource(usize),

    #[error("unknown layer handle #{0}")]
    UnknownLayer(usize),

    #[error("unknown multi-buyable handle #{0}")]
    UnknownBuyable(usize),

    #[error("unknown upgrade handle #{0}")]
    UnknownUpgrade(usize),

    #[error("unknown reset handle #{0}")]
    UnknownReset(usize),

    #[error("nothing is registered under `{0}`")]
    UnknownKey(String),

    #[error("resource `{key}` is owned by another layer and cannot be written by `{layer}`")]
    ForeignResource { layer: String, key: String },

    #[error("invalid scaling: {0}")]
    InvalidScaling(&'static str),

    #[error("costs must be positive, got {0}")]
    NonPositiveCost(Decimal),

    #[error("multi-buyable `{0}` has no cost sets")]
    EmptyCostSets(String),

    #[error("layer `{0}` cannot nest itself")]
    SelfNesting(String),

    #[error("resource `{0}` already has a best tracker")]
    DuplicateBestTracker(String),

    #[error("effect `{0}` describes a purchase that already has an effect")]
    DuplicateEffect(String),

    #[error("effect `{0}` describes a purchase of another layer")]
    ForeignSubject(String),
}

use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;

/// Top-level layout of `layers.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerFile {
    #[serde(rename = "_source", default)]
    pub source: String,
    #[serde(default)]
    pub layers: Vec<LayerDefinition>,
    #[serde(default)]
    pub tree: TreeDefinition,
}

/// Resource references are either local (`"sound"`) or qualified with the
/// owning layer (`"air.air"`). Qualified references may only point at layers
/// defined earlier in the file, except in accrual rates, which are resolved
/// once every layer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDefinition {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub resources: Vec<ResourceDefinition>,
    #[serde(default)]
    pub best: Vec<String>,
    pub conversion: Option<ConversionDefinition>,
    #[serde(default)]
    pub multi_buyables: Vec<MultiBuyableDefinition>,
    #[serde(default)]
    pub upgrades: Vec<UpgradeDefinition>,
    /// Evaluated in order; an effect may read the ones listed before it.
    #[serde(default)]
    pub effects: Vec<EffectDefinition>,
    #[serde(default)]
    pub accruals: Vec<AccrualDefinition>,
    #[serde(default)]
    pub nested: Vec<String>,
    pub tree_node: Option<TreeNodeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub initial: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionDefinition {
    pub base: String,
    pub gain: String,
    pub scaling: ScalingDefinition,
    #[serde(default)]
    pub independent: bool,
    #[serde(default)]
    pub buy_max: bool,
    #[serde(default)]
    pub round_up_cost: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalingDefinition {
    Exponential {
        coefficient: Decimal,
        base: Decimal,
        exponent: Decimal,
    },
    Polynomial {
        coefficient: Decimal,
        exponent: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiBuyableDefinition {
    pub key: String,
    #[serde(default)]
    pub title: String,
    pub cost_sets: Vec<CostSetDefinition>,
    #[serde(default)]
    pub visibility: VisibilityDefinition,
    pub purchase_limit: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSetDefinition {
    pub cost: Decimal,
    pub resource: String,
    /// Geometric growth per owned unit; flat when absent.
    pub ratio: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeDefinition {
    pub key: String,
    #[serde(default)]
    pub title: String,
    pub cost: Decimal,
    pub resource: String,
}

/// A named bonus. `upgrade` or `buyable` ties it to a purchase of the same
/// layer for display; rates still gate on the purchase themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub key: String,
    #[serde(default)]
    pub title: String,
    pub upgrade: Option<String>,
    pub buyable: Option<String>,
    pub value: ExpressionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualDefinition {
    pub target: String,
    pub rate: ExpressionDefinition,
}

/// Arithmetic over resources, buyable amounts, effects and upgrades.
/// References follow the same local/qualified rules as resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpressionDefinition {
    Constant {
        value: Decimal,
    },
    Resource {
        resource: String,
    },
    /// `resource * factor`.
    Proportional {
        resource: String,
        #[serde(default = "default_factor")]
        factor: Decimal,
    },
    /// Units owned of a multi-buyable.
    Amount {
        buyable: String,
    },
    Effect {
        effect: String,
    },
    Sum {
        terms: Vec<ExpressionDefinition>,
    },
    Product {
        factors: Vec<ExpressionDefinition>,
    },
    Pow {
        of: Box<ExpressionDefinition>,
        exponent: Decimal,
    },
    Log10 {
        of: Box<ExpressionDefinition>,
    },
    Sqrt {
        of: Box<ExpressionDefinition>,
    },
    Cbrt {
        of: Box<ExpressionDefinition>,
    },
    /// `then` once `upgrade` is bought, the constant `otherwise` before.
    IfPurchased {
        upgrade: String,
        then: Box<ExpressionDefinition>,
        #[serde(default = "default_factor")]
        otherwise: Decimal,
    },
}

fn default_factor() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisibilityDefinition {
    #[default]
    Always,
    Never,
    Milestone { index: usize },
    /// Shown once the tracked best of `resource` reaches `amount`.
    BestAtLeast { resource: String, amount: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNodeDefinition {
    pub color: String,
    #[serde(default)]
    pub visibility: VisibilityDefinition,
    /// Glow colour used while an unowned buyable is affordable.
    pub glow: Option<String>,
    /// Whether the node resets its own layer when a higher row resets.
    #[serde(default = "default_true")]
    pub resettable: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeDefinition {
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub propagation: PropagationDefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationDefinition {
    None,
    #[default]
    LowerRows,
}

mod buyable;
mod conversion;
mod effect;
mod layer;
mod reset;
mod scaling;
mod tree;
mod upgrade;

pub use buyable::{BuyableId, CostScaling, CostSet, MultiBuyable, MultiBuyableOptions};
pub use conversion::{Conversion, ConversionId, ConversionKind, ConversionOptions};
pub use effect::{Effect, EffectId, EffectOptions, EffectSubject};
pub use layer::{Layer, LayerBuilder, LayerId};
pub use reset::{Reset, ResetId, ResetTarget};
pub use scaling::{Formula, Param, Scaling};
pub use tree::{
    GlowRule, Milestones, ResetOutcome, ResetPropagation, Tree, TreeNode, TreeNodeOptions,
    Visibility, VisibilityRule,
};
pub use upgrade::{Upgrade, UpgradeId, UpgradeOptions};

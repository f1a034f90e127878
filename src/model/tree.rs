//! Navigation tree over layers and the reset button that drives it.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::core::Simulation;
use crate::decimal::Decimal;
use crate::reactive::Memo;

use super::buyable::BuyableId;
use super::conversion::ConversionId;
use super::layer::LayerId;
use super::reset::ResetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    pub fn show_if(condition: bool) -> Self {
        if condition { Self::Visible } else { Self::Hidden }
    }

    pub fn is_visible(self) -> bool {
        self == Self::Visible
    }
}

/// Read-only view of earned milestones.
pub trait Milestones {
    fn earned(&self, index: usize) -> bool;
}

impl Milestones for [bool] {
    fn earned(&self, index: usize) -> bool {
        self.get(index).copied().unwrap_or(false)
    }
}

impl Milestones for Vec<bool> {
    fn earned(&self, index: usize) -> bool {
        self.as_slice().earned(index)
    }
}

impl Milestones for BTreeSet<usize> {
    fn earned(&self, index: usize) -> bool {
        self.contains(&index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum VisibilityRule {
    #[default]
    Always,
    Never,
    Milestone(usize),
    Computed(Memo<Visibility>),
}

impl VisibilityRule {
    pub fn evaluate<M: Milestones + ?Sized>(&self, sim: &Simulation, milestones: &M) -> Visibility {
        match *self {
            Self::Always => Visibility::Visible,
            Self::Never => Visibility::Hidden,
            Self::Milestone(index) => Visibility::show_if(milestones.earned(index)),
            Self::Computed(memo) => sim.read(memo),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GlowRule {
    #[default]
    None,
    /// Glows while some buyable of the layer is affordable and not yet owned.
    AffordableUnowned { color: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNodeOptions {
    pub color: String,
    pub visibility: VisibilityRule,
    pub glow: GlowRule,
    pub reset: Option<ResetId>,
}

impl TreeNodeOptions {
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            visibility: VisibilityRule::Always,
            glow: GlowRule::None,
            reset: None,
        }
    }

    pub fn visibility(mut self, visibility: VisibilityRule) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn glow(mut self, glow: GlowRule) -> Self {
        self.glow = glow;
        self
    }

    pub fn reset(mut self, reset: ResetId) -> Self {
        self.reset = Some(reset);
        self
    }
}

/// A layer's entry point in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub color: String,
    pub visibility: VisibilityRule,
    pub glow: GlowRule,
    pub reset: Option<ResetId>,
}

impl From<TreeNodeOptions> for TreeNode {
    fn from(options: TreeNodeOptions) -> Self {
        Self {
            color: options.color,
            visibility: options.visibility,
            glow: options.glow,
            reset: options.reset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPropagation {
    /// Only the conversion happens; no layer is reset.
    None,
    /// Every layer in an earlier row is reset, nearest row first.
    #[default]
    LowerRows,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tree {
    rows: Vec<Vec<LayerId>>,
    propagation: ResetPropagation,
}

impl Tree {
    pub fn new(rows: Vec<Vec<LayerId>>) -> Self {
        Self {
            rows,
            propagation: ResetPropagation::default(),
        }
    }

    pub fn with_propagation(mut self, propagation: ResetPropagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn rows(&self) -> &[Vec<LayerId>] {
        &self.rows
    }

    pub fn propagation(&self) -> ResetPropagation {
        self.propagation
    }

    pub fn row_of(&self, layer: LayerId) -> Option<usize> {
        self.rows.iter().position(|row| row.contains(&layer))
    }

    /// Propagates a reset triggered by `node` and returns the layers whose
    /// tree-node reset ran.
    pub fn reset(&self, sim: &mut Simulation, node: LayerId) -> Vec<LayerId> {
        let mut touched = Vec::new();
        if self.propagation == ResetPropagation::None {
            return touched;
        }
        let Some(row) = self.row_of(node) else {
            return touched;
        };
        for lower in self.rows[..row].iter().rev() {
            for &layer in lower {
                let reset = sim
                    .layer(layer)
                    .and_then(|entry| entry.tree_node())
                    .and_then(|tree_node| tree_node.reset);
                if let Some(reset) = reset {
                    sim.trigger_reset(reset);
                    touched.push(layer);
                }
            }
        }
        debug!(node = node.index(), resets = touched.len(), "tree reset propagated");
        touched
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResetOutcome {
    /// The layer's tree node is hidden or missing.
    Hidden,
    NothingToGain,
    Converted { gained: Decimal, resets: Vec<LayerId> },
}

impl Simulation {
    pub fn tree_node_visibility<M: Milestones + ?Sized>(&self, layer: LayerId, milestones: &M) -> Visibility {
        self.layer(layer)
            .and_then(|entry| entry.tree_node())
            .map_or(Visibility::Hidden, |node| node.visibility.evaluate(self, milestones))
    }

    pub fn buyable_visibility<M: Milestones + ?Sized>(&self, id: BuyableId, milestones: &M) -> Visibility {
        self.buyable(id).visibility().evaluate(self, milestones)
    }

    /// Glow colour of the layer's tree node, if it currently glows.
    pub fn glow_color(&self, layer: LayerId) -> Option<&str> {
        let entry = self.layer(layer)?;
        let GlowRule::AffordableUnowned { color } = &entry.tree_node()?.glow else {
            return None;
        };
        entry
            .buyables()
            .iter()
            .any(|&buyable| self.can_purchase(buyable) && self.buyable_amount(buyable) < Decimal::ONE)
            .then_some(color.as_str())
    }

    /// Reset button: converts, then propagates the reset through `tree`.
    pub fn convert_and_reset<M: Milestones + ?Sized>(
        &mut self,
        conversion: ConversionId,
        tree: &Tree,
        milestones: &M,
    ) -> ResetOutcome {
        let layer = self.conversion(conversion).owner();
        if !self.tree_node_visibility(layer, milestones).is_visible() {
            return ResetOutcome::Hidden;
        }
        if !self.can_convert(conversion) {
            return ResetOutcome::NothingToGain;
        }
        let gained = self.convert(conversion);
        let resets = tree.reset(self, layer);
        info!(layer = %self.layer_key(layer), %gained, resets = resets.len(), "reset button pressed");
        ResetOutcome::Converted { gained, resets }
    }
}

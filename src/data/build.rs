use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::core::{ConfigError, Resource, Simulation};
use crate::model::{
    ConversionOptions, CostSet, EffectOptions, GlowRule, LayerBuilder, LayerId,
    MultiBuyableOptions, ResetPropagation, ResetTarget, Scaling, Tree, TreeNodeOptions,
    UpgradeOptions, Visibility, VisibilityRule,
};

use super::expression::Expression;
use super::{
    EffectDefinition, LayerDefinition, LayerFile, PropagationDefinition, ScalingDefinition,
    VisibilityDefinition,
};

/// Instantiates every layer of `file` in order and returns the tree they
/// hang from. Accruals are registered last so their rates may read effects
/// of any layer.
pub fn build_layers(sim: &mut Simulation, file: &LayerFile) -> Result<Tree> {
    let mut built = Vec::with_capacity(file.layers.len());
    for definition in &file.layers {
        let id = build_layer(sim, definition)
            .with_context(|| format!("failed building layer `{}`", definition.key))?;
        built.push((id, definition));
    }
    for (id, definition) in built {
        sim.extend_layer(id, |layer| {
            for accrual in &definition.accruals {
                let target = resolve(layer, &accrual.target)?;
                let rate = Expression::compile(layer, &accrual.rate)?.into_memo(layer);
                layer.accrue(target, rate)?;
            }
            Ok(())
        })
        .with_context(|| format!("failed registering accruals of `{}`", definition.key))?;
    }

    let rows = file
        .tree
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|key| {
                    sim.layer_by_key(key)
                        .ok_or_else(|| anyhow!("tree references unknown layer `{key}`"))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let propagation = match file.tree.propagation {
        PropagationDefinition::None => ResetPropagation::None,
        PropagationDefinition::LowerRows => ResetPropagation::LowerRows,
    };
    info!(layers = file.layers.len(), rows = rows.len(), "layer file instantiated");
    Ok(Tree::new(rows).with_propagation(propagation))
}

fn build_layer(sim: &mut Simulation, definition: &LayerDefinition) -> Result<LayerId, ConfigError> {
    let (id, ()) = sim.create_layer(&definition.key, &definition.name, |layer| {
        for resource in &definition.resources {
            layer.resource_with_initial(&resource.key, &resource.name, resource.initial)?;
        }
        for key in &definition.best {
            let resource = resolve(layer, key)?;
            layer.track_best(resource)?;
        }

        if let Some(conversion) = &definition.conversion {
            let mut options = ConversionOptions::new(
                scaling(conversion.scaling),
                resolve(layer, &conversion.base)?,
                resolve(layer, &conversion.gain)?,
            );
            if conversion.independent {
                options = options.independent(conversion.buy_max);
            }
            if conversion.round_up_cost {
                options = options.round_up_cost();
            }
            layer.conversion(options)?;
        }

        for buyable in &definition.multi_buyables {
            let cost_sets = buyable
                .cost_sets
                .iter()
                .map(|set| {
                    let resource = resolve(layer, &set.resource)?;
                    Ok(match set.ratio {
                        Some(ratio) => CostSet::geometric(set.cost, ratio, resource),
                        None => CostSet::flat(set.cost, resource),
                    })
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;
            let mut options = MultiBuyableOptions::new(&buyable.key, cost_sets)
                .visibility(visibility(layer, &buyable.visibility)?);
            if let Some(limit) = buyable.purchase_limit {
                options = options.purchase_limit(limit);
            }
            layer.multi_buyable(options)?;
        }

        for upgrade in &definition.upgrades {
            let resource = resolve(layer, &upgrade.resource)?;
            layer.upgrade(UpgradeOptions::new(&upgrade.key, upgrade.cost, resource))?;
        }

        for effect in &definition.effects {
            build_effect(layer, effect)?;
        }

        for key in &definition.nested {
            let child = layer
                .simulation()
                .layer_by_key(key)
                .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;
            layer.nest(child)?;
        }

        if let Some(node) = &definition.tree_node {
            let mut options = TreeNodeOptions::new(node.color.as_str())
                .visibility(visibility(layer, &node.visibility)?);
            if let Some(color) = &node.glow {
                options = options.glow(GlowRule::AffordableUnowned {
                    color: color.clone(),
                });
            }
            if node.resettable {
                let own = ResetTarget::Layer(layer.id());
                options = options.reset(layer.reset_targets(vec![own])?);
            }
            layer.tree_node(options)?;
        }
        Ok(())
    })?;
    Ok(id)
}

fn build_effect(layer: &mut LayerBuilder<'_>, definition: &EffectDefinition) -> Result<(), ConfigError> {
    let value = Expression::compile(layer, &definition.value)?.into_memo(layer);
    let mut options = EffectOptions::new(&definition.key, value).title(&definition.title);
    if let Some(upgrade) = &definition.upgrade {
        let key = qualify(layer, upgrade);
        let id = layer
            .simulation()
            .upgrade_by_key(&key)
            .ok_or(ConfigError::UnknownKey(key))?;
        options = options.upgrade(id);
    }
    if let Some(buyable) = &definition.buyable {
        let key = qualify(layer, buyable);
        let id = layer
            .simulation()
            .buyable_by_key(&key)
            .ok_or(ConfigError::UnknownKey(key))?;
        options = options.buyable(id);
    }
    layer.effect(options)?;
    Ok(())
}

/// Local references gain the builder's layer as prefix.
pub(super) fn qualify(layer: &LayerBuilder<'_>, reference: &str) -> String {
    if reference.contains('.') {
        reference.to_string()
    } else {
        format!("{}.{reference}", layer.key())
    }
}

pub(super) fn resolve(layer: &LayerBuilder<'_>, reference: &str) -> Result<Resource, ConfigError> {
    let qualified = qualify(layer, reference);
    layer
        .simulation()
        .resource(&qualified)
        .ok_or(ConfigError::UnknownKey(qualified))
}

fn scaling(definition: ScalingDefinition) -> Scaling {
    match definition {
        ScalingDefinition::Exponential {
            coefficient,
            base,
            exponent,
        } => Scaling::exponential(coefficient, base, exponent),
        ScalingDefinition::Polynomial {
            coefficient,
            exponent,
        } => Scaling::polynomial(coefficient, exponent),
    }
}

fn visibility(
    layer: &mut LayerBuilder<'_>,
    definition: &VisibilityDefinition,
) -> Result<VisibilityRule, ConfigError> {
    Ok(match *definition {
        VisibilityDefinition::Always => VisibilityRule::Always,
        VisibilityDefinition::Never => VisibilityRule::Never,
        VisibilityDefinition::Milestone { index } => VisibilityRule::Milestone(index),
        VisibilityDefinition::BestAtLeast {
            ref resource,
            amount,
        } => {
            let tracked = resolve(layer, resource)?;
            let tracker = layer
                .simulation()
                .best_tracker(tracked)
                .ok_or_else(|| ConfigError::UnknownKey(format!("{resource} (best)")))?;
            let shown = layer.memo(move |scope| Visibility::show_if(scope.best(tracker) >= amount));
            VisibilityRule::Computed(shown)
        }
    })
}

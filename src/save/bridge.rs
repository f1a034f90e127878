use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::core::Simulation;

use super::{SAVE_VERSION, SaveBuyable, SaveData, SaveResource, SaveUpgrade};

pub fn save_data_from_simulation(sim: &Simulation) -> SaveData {
    let resources = sim
        .resources
        .iter()
        .filter(|(_, info)| sim.is_live(info.owner))
        .map(|(resource, info)| SaveResource {
            key: info.key.clone(),
            value: sim.value(resource),
            best: sim.best_tracker(resource).map(|tracker| sim.best(tracker)),
        })
        .collect();

    let buyables = sim
        .buyables
        .iter()
        .filter(|buyable| sim.is_live(buyable.owner()))
        .map(|buyable| SaveBuyable {
            key: buyable.key().to_string(),
            amount: sim.graph.get(buyable.amount_signal()),
        })
        .collect();

    let upgrades = sim
        .upgrades
        .iter()
        .filter(|upgrade| sim.is_live(upgrade.owner()))
        .map(|upgrade| SaveUpgrade {
            key: upgrade.key().to_string(),
            purchased: sim.graph.get(upgrade.purchased_signal()),
        })
        .collect();

    SaveData {
        version: SAVE_VERSION,
        paused: sim.paused,
        tick_index: sim.tick_index,
        elapsed_seconds: sim.elapsed_seconds,
        resources,
        buyables,
        upgrades,
    }
}

/// Writes a snapshot back. Entries whose key no longer exists are skipped.
pub fn apply_save_data(sim: &mut Simulation, save: &SaveData) -> Result<()> {
    if save.version != SAVE_VERSION {
        bail!(
            "unsupported save version {} (expected {SAVE_VERSION})",
            save.version
        );
    }

    let mut skipped = 0usize;
    for entry in &save.resources {
        let Some(resource) = sim.resource(&entry.key) else {
            warn!(key = %entry.key, "save references an unknown resource");
            skipped += 1;
            continue;
        };
        sim.set_value(resource, entry.value);
        if let (Some(tracker), Some(best)) = (sim.best_tracker(resource), entry.best) {
            sim.resources.restore_best(&mut sim.graph, tracker, best);
        }
    }

    for entry in &save.buyables {
        let Some(buyable) = sim.buyable_by_key(&entry.key) else {
            warn!(key = %entry.key, "save references an unknown multi-buyable");
            skipped += 1;
            continue;
        };
        sim.restore_buyable(buyable, entry.amount);
    }

    for entry in &save.upgrades {
        let Some(upgrade) = sim.upgrade_by_key(&entry.key) else {
            warn!(key = %entry.key, "save references an unknown upgrade");
            skipped += 1;
            continue;
        };
        sim.set_upgrade_purchased(upgrade, entry.purchased);
    }

    sim.paused = save.paused;
    sim.tick_index = save.tick_index;
    sim.elapsed_seconds = save.elapsed_seconds.max(0.0);
    info!(
        resources = save.resources.len(),
        buyables = save.buyables.len(),
        upgrades = save.upgrades.len(),
        skipped,
        "save applied"
    );
    Ok(())
}

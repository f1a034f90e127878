use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bevy::prelude::*;
use prestige_engine::data::layers_path;
use prestige_engine::{
    LayerId, ResetOutcome, Simulation, Tree, apply_save_data, build_layers,
    load_from_json_string, load_layer_file_from_path, save_data_from_simulation,
    save_to_json_string,
};

#[derive(Resource, Debug, Clone)]
pub struct RuntimeConfig {
    pub layers_path: PathBuf,
    pub save_path: PathBuf,
    pub auto_save_interval_seconds: f32,
    /// Longest single tick; longer frames are split into several.
    pub max_tick_seconds: f64,
    pub earned_milestones: BTreeSet<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            layers_path: layers_path(),
            save_path: PathBuf::from("prestige_save.json"),
            auto_save_interval_seconds: 30.0,
            max_tick_seconds: 1.0,
            earned_milestones: BTreeSet::from([5, 6, 15, 32]),
        }
    }
}

/// Live game state. Held as a non-send resource: the reactive graph is
/// single-threaded.
pub struct Session {
    pub simulation: Simulation,
    pub tree: Tree,
    pub milestones: BTreeSet<usize>,
    pub selected: usize,
    pub autosave_timer: Timer,
    pub last_save_error: Option<String>,
    pub last_action: Option<String>,
}

impl Session {
    pub fn load(config: &RuntimeConfig) -> Result<Self> {
        let file = load_layer_file_from_path(&config.layers_path)?;
        let mut simulation = Simulation::new();
        let tree = build_layers(&mut simulation, &file)?;

        let mut session = Self {
            simulation,
            tree,
            milestones: config.earned_milestones.clone(),
            selected: 0,
            autosave_timer: Timer::from_seconds(
                config.auto_save_interval_seconds.max(1.0),
                TimerMode::Repeating,
            ),
            last_save_error: None,
            last_action: None,
        };
        if config.save_path.exists()
            && let Err(err) = session.load_save(&config.save_path)
        {
            warn!("ignoring unreadable save: {err:#}");
            session.last_save_error = Some(format!("{err:#}"));
        }
        Ok(session)
    }

    pub fn write_save(&self, path: &Path) -> Result<()> {
        let json = save_to_json_string(&save_data_from_simulation(&self.simulation))?;
        fs::write(path, json).with_context(|| format!("failed writing save: {}", path.display()))
    }

    pub fn load_save(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed reading save: {}", path.display()))?;
        let save = load_from_json_string(&text)?;
        apply_save_data(&mut self.simulation, &save)
    }

    /// Layers in tree order, top row first.
    pub fn layer_order(&self) -> Vec<LayerId> {
        self.tree.rows().iter().flatten().copied().collect()
    }

    pub fn selected_layer(&self) -> Option<LayerId> {
        self.layer_order().get(self.selected).copied()
    }

    pub fn select(&mut self, index: usize) {
        let count = self.layer_order().len();
        self.selected = index.min(count.saturating_sub(1));
    }

    pub fn step_selection(&mut self, delta: isize) {
        let count = self.layer_order().len() as isize;
        if count == 0 {
            return;
        }
        self.selected = (self.selected as isize + delta).rem_euclid(count) as usize;
    }

    pub fn press_reset(&mut self) {
        let Some(layer) = self.selected_layer() else {
            return;
        };
        let Some(&conversion) = self
            .simulation
            .layer(layer)
            .and_then(|entry| entry.conversions().first())
        else {
            self.last_action = Some("this layer has nothing to convert".to_string());
            return;
        };
        let outcome = self
            .simulation
            .convert_and_reset(conversion, &self.tree, &self.milestones);
        self.last_action = Some(match outcome {
            ResetOutcome::Hidden => "layer is locked".to_string(),
            ResetOutcome::NothingToGain => "not enough to convert".to_string(),
            ResetOutcome::Converted { gained, resets } => {
                format!("gained {gained}, reset {} layer(s)", resets.len())
            }
        });
    }

    /// Buys one of every visible, affordable multi-buyable in the selected layer.
    pub fn buy_buyables(&mut self) {
        let Some(layer) = self.selected_layer() else {
            return;
        };
        let Some(buyables) = self.simulation.layer(layer).map(|entry| entry.buyables().to_vec())
        else {
            return;
        };
        let mut bought = 0;
        for buyable in buyables {
            let visible = self
                .simulation
                .buyable_visibility(buyable, &self.milestones)
                .is_visible();
            if visible && self.simulation.purchase(buyable) {
                bought += 1;
            }
        }
        self.last_action = Some(format!("bought {bought} buyable(s)"));
    }

    pub fn buy_upgrades(&mut self) {
        let Some(layer) = self.selected_layer() else {
            return;
        };
        let Some(upgrades) = self.simulation.layer(layer).map(|entry| entry.upgrades().to_vec())
        else {
            return;
        };
        let bought = upgrades
            .into_iter()
            .filter(|&upgrade| self.simulation.purchase_upgrade(upgrade))
            .count();
        self.last_action = Some(format!("bought {bought} upgrade(s)"));
    }
}

#[derive(Component)]
pub struct HudText;

pub mod core;
pub mod data;
pub mod decimal;
pub mod model;
pub mod reactive;
pub mod save;

pub use core::{BestTracker, ConfigError, Resource, ResourceStore, Simulation};
pub use data::{LayerFile, build_layers, load_layer_file, load_layer_file_from_path};
pub use decimal::Decimal;
pub use model::{
    BuyableId, ConversionId, ConversionOptions, CostSet, EffectId, EffectOptions, LayerId,
    MultiBuyableOptions, ResetOutcome, ResetTarget, Scaling, Tree, TreeNodeOptions, UpgradeId,
    UpgradeOptions, Visibility, VisibilityRule,
};
pub use save::{
    SaveData, apply_save_data, export_to_base64, import_from_base64, load_from_json_string,
    save_data_from_simulation, save_to_json_string,
};

mod build;
mod expression;
mod layer_data;
mod loader;

pub use build::build_layers;
pub use layer_data::{
    AccrualDefinition, ConversionDefinition, CostSetDefinition, EffectDefinition,
    ExpressionDefinition, LayerDefinition, LayerFile, MultiBuyableDefinition,
    PropagationDefinition, ResourceDefinition, ScalingDefinition, TreeDefinition,
    TreeNodeDefinition, UpgradeDefinition, VisibilityDefinition,
};
pub use loader::{layers_path, load_layer_file, load_layer_file_from_path, parse_layer_file};

#[cfg(test)]
mod tests {
    use super::{build_layers, load_layer_file, parse_layer_file};
    use crate::core::Simulation;

    #[test]
    fn bundled_layer_file_builds() {
        let file = load_layer_file().expect("layers.json should load");
        assert!(
            !file.layers.is_empty(),
            "layers.json should define at least one layer"
        );

        let mut sim = Simulation::new();
        let tree = build_layers(&mut sim, &file).expect("bundled layers should build");
        assert_eq!(sim.layers().count(), file.layers.len());
        assert!(!tree.rows().is_empty());
        for (_, layer) in sim.layers() {
            assert!(layer.tree_node().is_some(), "{} has no tree node", layer.key());
        }
    }

    #[test]
    fn unknown_references_report_the_layer() {
        let json = r#"{
            "layers": [{
                "key": "sound",
                "name": "Sound",
                "resources": [{ "key": "sound", "name": "Sound Particles" }],
                "conversion": {
                    "base": "air.air",
                    "gain": "sound",
                    "scaling": { "kind": "polynomial", "coefficient": 1e7, "exponent": 0.5 }
                }
            }]
        }"#;
        let file = parse_layer_file(json).expect("valid JSON");
        let mut sim = Simulation::new();
        let error = build_layers(&mut sim, &file).expect_err("air is not defined");
        let message = format!("{error:#}");
        assert!(message.contains("sound"), "{message}");
        assert!(message.contains("air.air"), "{message}");
        assert!(sim.layer_by_key("sound").is_none());
    }

    #[test]
    fn decimals_accept_numbers_and_strings() {
        let json = r#"{
            "layers": [{
                "key": "main",
                "name": "Main",
                "resources": [
                    { "key": "a", "name": "A", "initial": 12.5 },
                    { "key": "b", "name": "B", "initial": "1e400" }
                ]
            }]
        }"#;
        let file = parse_layer_file(json).expect("valid JSON");
        let mut sim = Simulation::new();
        build_layers(&mut sim, &file).expect("builds");
        let a = sim.resource("main.a").expect("a");
        let b = sim.resource("main.b").expect("b");
        assert_eq!(sim.value(a).to_f64(), 12.5);
        assert_eq!(sim.value(b).exponent(), 400);
    }
}

use std::collections::BTreeSet;

use prestige_engine::{
    ConversionId, Decimal, LayerId, ResetOutcome, Simulation, Tree, apply_save_data,
    build_layers, export_to_base64, import_from_base64, load_layer_file,
    save_data_from_simulation,
};

const EPSILON: f64 = 1e-9;

fn assert_close(actual: Decimal, expected: f64) {
    let actual = actual.to_f64();
    assert!(
        (actual - expected).abs() <= EPSILON * expected.abs().max(1.0),
        "expected {expected}, got {actual}"
    );
}

fn bundled() -> (Simulation, Tree) {
    let file = load_layer_file().expect("bundled layers should load");
    let mut sim = Simulation::new();
    let tree = build_layers(&mut sim, &file).expect("bundled layers should build");
    (sim, tree)
}

fn layer(sim: &Simulation, key: &str) -> LayerId {
    sim.layer_by_key(key).expect("layer exists")
}

fn conversion_of(sim: &Simulation, key: &str) -> ConversionId {
    let id = layer(sim, key);
    *sim.layer(id)
        .and_then(|entry| entry.conversions().first())
        .expect("layer has a conversion")
}

#[test]
fn repeated_ticks_are_deterministic() {
    let (mut a, _) = bundled();
    let (mut b, _) = bundled();
    let air = a.resource("air.air").expect("air");
    a.set_value(air, 3.0);
    b.set_value(air, 3.0);

    for _ in 0..64 {
        a.tick(0.25);
        b.tick(0.25);
        assert_eq!(save_data_from_simulation(&a), save_data_from_simulation(&b));
    }

    let particles = a.resource("main.particles").expect("particles");
    let wind = a.resource("air.wind").expect("wind");
    assert_close(a.value(particles), 10.0 + 64.0 * 0.25 * 10.0);
    assert_close(a.value(wind), 64.0 * 0.25 * 0.3);
    assert_eq!(a.tick_index, 64);
}

#[test]
fn paused_simulation_does_not_accrue() {
    let (mut sim, _) = bundled();
    let particles = sim.resource("main.particles").expect("particles");
    sim.paused = true;
    sim.tick(5.0);

    assert_close(sim.value(particles), 10.0);
    assert_eq!(sim.tick_index, 0);
}

#[test]
fn reset_button_resets_lower_rows_only() {
    let (mut sim, tree) = bundled();
    let milestones = BTreeSet::<usize>::new();
    let particles = sim.resource("main.particles").expect("particles");
    let flame = sim.resource("flame.flame").expect("flame");
    let aqua = sim.resource("aqua.aqua").expect("aqua");
    sim.set_value(aqua, 7.0);
    sim.set_value(particles, 15_000.0);

    let outcome = sim.convert_and_reset(conversion_of(&sim, "flame"), &tree, &milestones);

    let ResetOutcome::Converted { gained, resets } = outcome else {
        panic!("expected a conversion, got {outcome:?}");
    };
    assert_close(gained, 12.0);
    assert_eq!(resets, vec![layer(&sim, "main")]);
    assert_close(sim.value(flame), 12.0);
    assert_close(sim.value(particles), 10.0);
    assert_close(sim.value(aqua), 7.0);
    let best = sim.best_tracker(particles).expect("particles best");
    assert_close(sim.best(best), 15_000.0);
}

#[test]
fn locked_layers_need_their_milestone() {
    let (mut sim, tree) = bundled();
    let earth = conversion_of(&sim, "earth");

    let outcome = sim.convert_and_reset(earth, &tree, &BTreeSet::<usize>::new());
    assert_eq!(outcome, ResetOutcome::Hidden);

    let outcome = sim.convert_and_reset(earth, &tree, &BTreeSet::from([5_usize]));
    assert_eq!(outcome, ResetOutcome::NothingToGain);
}

#[test]
fn combinator_reset_unlocks_molecules_and_glows() {
    let (mut sim, tree) = bundled();
    let milestones = BTreeSet::from([15_usize]);
    let comb = layer(&sim, "comb");
    let particles = sim.resource("main.particles").expect("particles");
    let flame = sim.resource("flame.flame").expect("flame");
    let lightning = sim.resource("lightning.lightning").expect("lightning");
    let combinators = sim.resource("comb.combinators").expect("combinators");
    let spark = sim.buyable_by_key("comb.spark").expect("spark");

    assert!(!sim.buyable_visibility(spark, &milestones).is_visible());
    sim.set_value(flame, 5.0);
    sim.set_value(particles, 1e11);

    let outcome = sim.convert_and_reset(conversion_of(&sim, "comb"), &tree, &milestones);
    let ResetOutcome::Converted { gained, resets } = outcome else {
        panic!("expected a conversion, got {outcome:?}");
    };
    assert_close(gained, 1.0);
    assert_eq!(resets.len(), 6);
    assert!(!resets.contains(&comb));
    assert_close(sim.value(combinators), 1.0);
    assert_close(sim.value(flame), 0.0);
    assert_close(sim.value(particles), 10.0);
    assert!(sim.buyable_visibility(spark, &milestones).is_visible());

    assert_eq!(sim.glow_color(comb), None);
    sim.set_value(flame, 1e6);
    sim.set_value(lightning, 1e4);
    assert_eq!(sim.glow_color(comb), Some("red"));

    assert!(sim.purchase(spark));
    assert_eq!(sim.glow_color(comb), None);
    assert_close(sim.value(flame), 0.0);
    assert_close(sim.value(lightning), 0.0);
}

#[test]
fn base64_save_restores_a_fresh_simulation() {
    let (mut sim, tree) = bundled();
    let particles = sim.resource("main.particles").expect("particles");
    sim.set_value(particles, 45_000.0);
    sim.convert_and_reset(conversion_of(&sim, "aqua"), &tree, &BTreeSet::<usize>::new());
    sim.tick(1.5);

    let save = save_data_from_simulation(&sim);
    let encoded = export_to_base64(&save).expect("export");
    let decoded = import_from_base64(&encoded).expect("import");

    let (mut restored, _) = bundled();
    apply_save_data(&mut restored, &decoded).expect("apply");

    assert_eq!(save_data_from_simulation(&restored), save);
    let aqua = restored.resource("aqua.aqua").expect("aqua");
    assert_close(restored.value(aqua), 21.0);
    let restored_particles = restored.resource("main.particles").expect("particles");
    let best = restored.best_tracker(restored_particles).expect("best");
    assert_close(restored.best(best), 45_000.0);
}

#[test]
fn bundled_effects_feed_the_rates_they_boost() {
    let (mut sim, _) = bundled();
    let particles = sim.resource("main.particles").expect("particles");
    let combinators = sim.resource("comb.combinators").expect("combinators");
    let flame = sim.resource("flame.flame").expect("flame");
    let lightning = sim.resource("lightning.lightning").expect("lightning");
    let spark = sim.buyable_by_key("comb.spark").expect("spark");
    let spark_effect = sim.buyable_effect(spark).expect("spark effect");
    assert_eq!(sim.effect(spark_effect).key(), "comb.spark");

    // sqrt(9) + 1 multiplies the base gain of 10.
    sim.set_value(combinators, 9.0);
    sim.tick(1.0);
    assert_close(sim.value(particles), 10.0 + 40.0);

    sim.set_value(flame, 1e6 + 999_999.0);
    sim.set_value(lightning, 1e4);
    assert!(sim.purchase(spark));
    let spark_bonus = (6.0f64 + 1.0).log10();
    assert_close(sim.effect_value(spark_effect), spark_bonus);
    sim.tick(1.0);
    assert_close(sim.value(particles), 50.0 + (10.0 + spark_bonus) * 4.0);
}

#[test]
fn duration_speeds_up_wind_only_once_bought() {
    let (mut sim, _) = bundled();
    let air = sim.resource("air.air").expect("air");
    let wind = sim.resource("air.wind").expect("wind");
    let ultrasound = sim.resource("sound.ultrasound").expect("ultrasound");
    let duration = sim.upgrade_by_key("sound.duration").expect("duration");
    sim.set_value(air, 5.0);

    sim.set_value(ultrasound, 999.0);
    sim.tick(1.0);
    assert_close(sim.value(wind), 0.5);

    sim.set_value(ultrasound, 1000.0);
    assert!(sim.purchase_upgrade(duration));
    sim.set_value(ultrasound, 999.0);
    // sqrt(log10(999 + 1) + 1) doubles the wind rate.
    sim.tick(1.0);
    assert_close(sim.value(wind), 0.5 + 1.0);
}

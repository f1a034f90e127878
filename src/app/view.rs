use std::fmt::Write as _;

use bevy::prelude::*;
use prestige_engine::model::{ConversionKind, EffectId, EffectSubject};
use prestige_engine::{Decimal, LayerId, Simulation};

use super::resources::{HudText, Session};
use super::state::SimRunState;

/// Extra units quoted next to conversions that can pay out in bulk.
const BULK_PREVIEW: u32 = 10;

pub fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        Name::new("HudText"),
        HudText,
        Text::new("Initializing..."),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(Color::srgb(0.94, 0.97, 0.99)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            top: Val::Px(10.0),
            ..default()
        },
    ));
}

pub fn refresh_hud(
    session: NonSend<Session>,
    run_state: Res<State<SimRunState>>,
    mut hud_query: Query<&mut Text, With<HudText>>,
) {
    let Ok(mut hud) = hud_query.get_single_mut() else {
        return;
    };

    let run_label = match run_state.get() {
        SimRunState::Running => "RUNNING",
        SimRunState::Paused => "PAUSED",
    };

    let mut out = format!(
        "Tick: {}  Time: {:.1}s  Mode: {run_label}\n\n",
        session.simulation.tick_index, session.simulation.elapsed_seconds,
    );
    write_tree(&mut out, &session);
    if let Some(layer) = session.selected_layer() {
        write_layer(&mut out, &session, layer);
    }

    let status = session.last_action.as_deref().unwrap_or("-");
    let save_line = session
        .last_save_error
        .as_deref()
        .map(|msg| format!("Save: {msg}"))
        .unwrap_or_else(|| "Save: OK (F5 save, F9 load, autosave on)".to_string());
    let _ = write!(
        out,
        "\nLast: {status}\n1-9/Q/E select, C convert+reset, B buy, U upgrades, Space/P pause\n{save_line}"
    );

    *hud = Text::new(out);
}

fn write_tree(out: &mut String, session: &Session) {
    let sim = &session.simulation;
    let selected = session.selected_layer();
    for row in session.tree.rows() {
        let labels: Vec<String> = row
            .iter()
            .map(|&layer| {
                let name = sim.layer(layer).map_or("?", |entry| entry.name());
                let visible = sim
                    .tree_node_visibility(layer, &session.milestones)
                    .is_visible();
                let label = if visible { name } else { "???" };
                let glow = if sim.glow_color(layer).is_some() { "*" } else { "" };
                if Some(layer) == selected {
                    format!("[{label}{glow}]")
                } else {
                    format!(" {label}{glow} ")
                }
            })
            .collect();
        let _ = writeln!(out, "{}", labels.join("  "));
    }
    out.push('\n');
}

fn write_layer(out: &mut String, session: &Session, layer: LayerId) {
    let sim = &session.simulation;
    let Some(entry) = sim.layer(layer) else {
        return;
    };
    let _ = writeln!(out, "== {} ==", entry.name());

    for (resource, info) in sim.resources().iter().filter(|(_, info)| info.owner == layer) {
        let _ = write!(out, "{}: {}", info.display_name, format_amount(sim.value(resource)));
        if let Some(tracker) = sim.best_tracker(resource) {
            let _ = write!(out, " (best {})", format_amount(sim.best(tracker)));
        }
        out.push('\n');
    }

    for &conversion in entry.conversions() {
        let _ = write!(
            out,
            "Reset for +{} (next at {}",
            format_amount(sim.actual_gain(conversion)),
            format_amount(sim.next_cost(conversion)),
        );
        // Single-step conversions never pay out more than one unit.
        if !matches!(
            sim.conversion(conversion).options().kind,
            ConversionKind::Independent { buy_max: false }
        ) {
            let bulk = sim.bulk_conversion_cost(conversion, Decimal::from(BULK_PREVIEW));
            let _ = write!(out, ", +{BULK_PREVIEW} at {}", format_amount(bulk));
        }
        out.push_str(")\n");
    }

    for &buyable in entry.buyables() {
        if !sim.buyable_visibility(buyable, &session.milestones).is_visible() {
            continue;
        }
        let marker = if sim.can_purchase(buyable) { "+" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {} x{}",
            sim.buyable(buyable).key(),
            format_amount(sim.buyable_amount(buyable)),
        );
    }

    for &upgrade in entry.upgrades() {
        let state = if sim.upgrade_purchased(upgrade) {
            "owned".to_string()
        } else {
            format!("costs {}", format_amount(sim.upgrade(upgrade).cost()))
        };
        let _ = writeln!(out, "  {} ({state})", sim.upgrade(upgrade).key());
    }

    for &effect in entry.effects() {
        let _ = writeln!(out, "{}", effect_line(sim, effect));
    }
}

/// Upgrade effects are marked inactive until the upgrade is bought.
fn effect_line(sim: &Simulation, effect: EffectId) -> String {
    let entry = sim.effect(effect);
    let inactive = match entry.subject() {
        EffectSubject::Upgrade(upgrade) if !sim.upgrade_purchased(upgrade) => " (not bought)",
        _ => "",
    };
    format!(
        "  {}: x{}{inactive}",
        entry.title(),
        format_amount(sim.effect_value(effect))
    )
}

/// Plain notation below a million, `m.mme±x` above.
fn format_amount(value: Decimal) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.exponent() < 6 {
        return format!("{:.2}", value.to_f64());
    }
    format!("{:.2}e{}", value.mantissa(), value.exponent())
}

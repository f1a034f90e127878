use bevy::prelude::*;

use super::resources::Session;
use super::state::SimRunState;

const LAYER_KEYS: [KeyCode; 9] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

pub fn handle_keyboard_controls(
    keys: Res<ButtonInput<KeyCode>>,
    mut session: NonSendMut<Session>,
    run_state: Res<State<SimRunState>>,
    mut next_run_state: ResMut<NextState<SimRunState>>,
) {
    for (index, key) in LAYER_KEYS.iter().enumerate() {
        if keys.just_pressed(*key) {
            session.select(index);
        }
    }

    if keys.just_pressed(KeyCode::KeyQ) {
        session.step_selection(-1);
    }
    if keys.just_pressed(KeyCode::KeyE) {
        session.step_selection(1);
    }

    if keys.just_pressed(KeyCode::KeyC) {
        session.press_reset();
    }
    if keys.just_pressed(KeyCode::KeyB) {
        session.buy_buyables();
    }
    if keys.just_pressed(KeyCode::KeyU) {
        session.buy_upgrades();
    }

    if keys.just_pressed(KeyCode::Space) || keys.just_pressed(KeyCode::KeyP) {
        let next = match run_state.get() {
            SimRunState::Running => SimRunState::Paused,
            SimRunState::Paused => SimRunState::Running,
        };
        next_run_state.set(next);
    }
}

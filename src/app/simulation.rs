use bevy::prelude::*;

use super::resources::{RuntimeConfig, Session};
use super::state::SimRunState;

/// Upper bound on simulation steps per frame. Past it the steps grow longer
/// instead of dropping time.
const MAX_SUB_TICKS: usize = 1_000;

pub fn tick_simulation(
    time: Res<Time>,
    config: Res<RuntimeConfig>,
    mut session: NonSendMut<Session>,
) {
    for step in tick_steps(time.delta_secs_f64(), config.max_tick_seconds) {
        session.simulation.tick(step);
    }
}

/// Splits a frame delta into equal steps no longer than `max_step`.
fn tick_steps(delta: f64, max_step: f64) -> impl Iterator<Item = f64> {
    let count = if !(delta > 0.0 && delta.is_finite()) {
        0
    } else if max_step > 0.0 {
        ((delta / max_step).ceil() as usize).clamp(1, MAX_SUB_TICKS)
    } else {
        1
    };
    let step = if count == 0 { 0.0 } else { delta / count as f64 };
    std::iter::repeat_n(step, count)
}

pub fn handle_save_hotkeys(
    keys: Res<ButtonInput<KeyCode>>,
    config: Res<RuntimeConfig>,
    mut session: NonSendMut<Session>,
    mut next_run_state: ResMut<NextState<SimRunState>>,
) {
    if keys.just_pressed(KeyCode::F5) {
        let result = session.write_save(&config.save_path);
        record_save_result(&mut session, result, "saved");
    }
    if keys.just_pressed(KeyCode::F9) {
        let result = session.load_save(&config.save_path);
        record_save_result(&mut session, result, "loaded");
        next_run_state.set(if session.simulation.paused {
            SimRunState::Paused
        } else {
            SimRunState::Running
        });
    }
}

pub fn autosave_session(
    time: Res<Time>,
    config: Res<RuntimeConfig>,
    mut session: NonSendMut<Session>,
) {
    if !session.autosave_timer.tick(time.delta()).just_finished() {
        return;
    }
    let result = session.write_save(&config.save_path);
    if let Err(err) = result {
        warn!("autosave failed: {err:#}");
        session.last_save_error = Some(format!("{err:#}"));
    }
}

pub fn mark_sim_running(session: Option<NonSendMut<Session>>) {
    if let Some(mut session) = session {
        session.simulation.paused = false;
    }
}

pub fn mark_sim_paused(session: Option<NonSendMut<Session>>) {
    if let Some(mut session) = session {
        session.simulation.paused = true;
    }
}

fn record_save_result(session: &mut Session, result: anyhow::Result<()>, verb: &str) {
    match result {
        Ok(()) => {
            session.last_save_error = None;
            session.last_action = Some(format!("game {verb}"));
        }
        Err(err) => {
            warn!("save {verb} failed: {err:#}");
            session.last_save_error = Some(format!("{err:#}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_SUB_TICKS, tick_steps};

    fn assert_covers(steps: &[f64], delta: f64) {
        let total: f64 = steps.iter().sum();
        assert!((total - delta).abs() <= 1e-9 * delta.max(1.0), "{total} != {delta}");
    }

    #[test]
    fn frame_hitch_is_split_not_dropped() {
        let steps: Vec<f64> = tick_steps(2.5, 1.0).collect();
        assert_eq!(steps.len(), 3);
        assert!(steps.iter().all(|&step| step <= 1.0));
        assert_covers(&steps, 2.5);

        let steps: Vec<f64> = tick_steps(0.016, 1.0).collect();
        assert_eq!(steps, vec![0.016]);
    }

    #[test]
    fn very_long_frames_keep_their_full_duration() {
        let steps: Vec<f64> = tick_steps(86_400.0, 1.0).collect();
        assert_eq!(steps.len(), MAX_SUB_TICKS);
        assert_covers(&steps, 86_400.0);
    }

    #[test]
    fn empty_or_invalid_frames_do_not_tick() {
        assert_eq!(tick_steps(0.0, 1.0).count(), 0);
        assert_eq!(tick_steps(-0.5, 1.0).count(), 0);
        assert_eq!(tick_steps(f64::NAN, 1.0).count(), 0);
        assert_eq!(tick_steps(0.5, 0.0).collect::<Vec<_>>(), vec![0.5]);
    }
}

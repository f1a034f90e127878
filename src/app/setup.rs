use bevy::prelude::*;

use super::resources::{RuntimeConfig, Session};
use super::state::{AppPhase, SimRunState};

pub fn spawn_camera(mut commands: Commands) {
    commands.spawn((Name::new("PrimaryCamera"), Camera2d));
}

pub fn bootstrap_session(world: &mut World) {
    let config = world.resource::<RuntimeConfig>().clone();
    let session = match Session::load(&config) {
        Ok(session) => session,
        Err(err) => {
            error!("failed starting session: {err:#}");
            world.send_event(AppExit::error());
            return;
        }
    };

    let run_state = if session.simulation.paused {
        SimRunState::Paused
    } else {
        SimRunState::Running
    };
    world.insert_non_send_resource(session);
    world.resource_mut::<NextState<SimRunState>>().set(run_state);
    world.resource_mut::<NextState<AppPhase>>().set(AppPhase::InGame);
}

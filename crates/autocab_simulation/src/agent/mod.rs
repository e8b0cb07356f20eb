//! Навигационный агент такси
//!
//! Tick pipeline (FixedUpdate, chain):
//! 1. advance_tick — счётчик tick'ов (throttle объяснений)
//! 2. mission_control — старт миссии, poll планировщика, abort
//! 3. navigation_decision — скан → FSM → выбор скорости → drive
//! 4. waypoint_progress — arrival check, dequeue, завершение миссии
//!
//! Актуация (damping, интеграция) — после, в SimulationSet::Actuation.

use bevy::prelude::*;

use crate::components::{AgentConfig, AgentState, AgentTelemetry, Mission, VehicleBody, VehicleConfig};
use crate::perception::{LidarConfig, SceneGeometry};
use crate::planner::{PathRequest, RoutePlanner};
use crate::{SetupError, SimulationSet};

pub mod events;
pub mod navigation;

pub use events::*;
pub use navigation::*;

/// Счётчик fixed tick'ов (общий для всех агентов)
#[derive(Resource, Default)]
pub struct TickCount(pub u64);

/// Незавершённый запрос маршрута (висит на агенте, пока тот в Planning)
#[derive(Component)]
pub struct PendingPath(pub PathRequest);

/// AI Plugin навигационного агента
pub struct AgentPlugin;

impl Plugin for AgentPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TickCount>()
            .init_resource::<SceneGeometry>()
            .init_resource::<RoutePlanner>()
            .add_event::<MissionRequest>()
            .add_event::<MissionAbort>()
            .add_event::<Explanation>()
            .add_event::<StateChanged>()
            .configure_sets(
                FixedUpdate,
                (SimulationSet::Decision, SimulationSet::Actuation).chain(),
            )
            .add_systems(
                FixedUpdate,
                (
                    advance_tick,
                    mission_control,
                    navigation_decision,
                    waypoint_progress,
                )
                    .chain()
                    .in_set(SimulationSet::Decision),
            );
    }
}

/// Spawn helper: такси со всеми компонентами.
/// Конфиги валидируются здесь — вырожденная настройка не доезжает до tick'а.
pub fn spawn_taxi(
    world: &mut World,
    position: Vec3,
    lidar: LidarConfig,
    vehicle: VehicleConfig,
    agent: AgentConfig,
) -> Result<Entity, SetupError> {
    lidar.validate()?;
    vehicle.validate()?;
    agent.validate()?;

    let entity = world
        .spawn((
            Transform::from_translation(position),
            VehicleBody::default(),
            vehicle,
            lidar,
            agent,
            AgentState::default(),
            Mission::default(),
            AgentTelemetry::default(),
        ))
        .id();

    Ok(entity)
}

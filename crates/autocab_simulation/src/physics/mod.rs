//! Физика такси (actuation)
//!
//! Агент решает «куда и как быстро», эти системы превращают решение в
//! скорость/поворот корпуса. Порядок в FixedUpdate: после Decision.

use bevy::prelude::*;

use crate::SimulationSet;

pub mod car;

pub use car::*;

/// Plugin актуации: демпфирование + интеграция скорости в позицию
pub struct VehiclePlugin;

impl Plugin for VehiclePlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            FixedUpdate,
            (SimulationSet::Decision, SimulationSet::Actuation).chain(),
        )
        .add_systems(
            FixedUpdate,
            (apply_damping, integrate_velocity)
                .chain()
                .in_set(SimulationSet::Actuation),
        );
    }
}

//! AUTOCAB Simulation Core
//!
//! Headless ECS-симуляция автономного такси на Bevy 0.16.
//! Control loop: perception (lidar) → decision (FSM) → actuation (physics),
//! один проход за fixed tick (60Hz).
//!
//! Архитектура:
//! - ECS = симуляция целиком (никакого рендера в core)
//! - Внешние коллабораторы (route graph, obstacle geometry) инжектятся
//!   как boxed trait objects через ресурсы

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

// Публичные модули
pub mod agent;
pub mod components;
pub mod logger;
pub mod perception;
pub mod physics;
pub mod planner;

// Re-export базовых типов для удобства
pub use agent::{
    spawn_taxi, AgentPlugin, Explanation, MissionAbort, MissionRequest, PendingPath, StateChanged,
    TickCount,
};
pub use components::*;
pub use logger::{init_logger, log, log_error, log_info, log_warning, LogLevel, LogPrinter};
pub use perception::{
    LidarConfig, Obstacle, ObstacleField, ObstacleGeometry, PerceptionSummary, RayHit,
    SceneGeometry,
};
pub use physics::{drive, emergency_brake, stop, VehiclePlugin};
pub use planner::{GraphNode, GraphSource, PathRequest, PathSource, PlanError, RoutePlanner};

/// Ошибки конфигурации. Отклоняются на setup (spawn), не в tick time.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("lidar needs at least 2 rays, got {0}")]
    TooFewRays(u32),
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },
    #[error("near threshold ({near}) must be below mid threshold ({mid})")]
    ThresholdOrder { near: f32, mid: f32 },
}

/// Порядок подсистем внутри FixedUpdate: решение tick'а строго до актуации.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    Decision,
    Actuation,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для control loop (легче считать интервалы)
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            // Детерминистичный RNG (seed по умолчанию)
            .insert_resource(DeterministicRng::new(42))
            // Подсистемы: агент решает, физика исполняет
            .add_plugins((AgentPlugin, VehiclePlugin));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)); // 60Hz FixedUpdate

    app
}

/// Продвигает симуляцию ровно на один fixed tick.
///
/// Внешний tick driver: время двигаем руками, а не через `app.update()`,
/// чтобы прогон не зависел от wall clock (иначе детерминизм тестов ломается).
///
/// Запускается только FixedUpdate, поэтому штатная очистка событий
/// (event_update_system в First) не работает: `Events<Explanation>` и
/// `Events<StateChanged>` копятся, пока потребитель их не заберёт.
/// Долгоживущий прогон обязан периодически вызывать `drain()` на этих
/// ресурсах; конечные прогоны (bin, тесты) могут не чистить вовсе.
pub fn step(app: &mut App) {
    let timestep = app.world().resource::<Time<Fixed>>().timestep();
    app.world_mut()
        .resource_mut::<Time<Fixed>>()
        .advance_by(timestep);
    app.world_mut().run_schedule(FixedUpdate);
}

/// Snapshot мира для сравнения детерминизма
/// (компоненты сериализуем через Debug — простейший способ)
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}

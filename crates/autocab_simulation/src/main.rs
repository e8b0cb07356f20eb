//! Headless прогон симуляции такси: граф дорог, конусы на маршруте,
//! одна миссия depot → plaza с периодическим выводом состояния.

use bevy::prelude::*;
use rand::Rng;

use autocab_simulation::{
    create_headless_app, log_error, log_info, spawn_taxi, step, AgentConfig, AgentState,
    AgentTelemetry, DeterministicRng, GraphNode, GraphSource, LidarConfig, Mission,
    MissionRequest, Obstacle, ObstacleField, RoutePlanner, SceneGeometry, SegmentType,
    SimulationPlugin, VehicleConfig,
};

fn road_graph() -> GraphSource {
    let mut graph = GraphSource::new();
    graph.add_node(
        "depot",
        GraphNode {
            position: Vec3::ZERO,
            segment: SegmentType::Generic,
            speed_limit: 0.0,
            description: "taxi depot".into(),
        },
    );
    graph.add_node(
        "main_street",
        GraphNode {
            position: Vec3::new(0.0, 0.0, -40.0),
            segment: SegmentType::Straight,
            speed_limit: 15.0,
            description: "main street".into(),
        },
    );
    graph.add_node(
        "junction",
        GraphNode {
            position: Vec3::new(0.0, 0.0, -80.0),
            segment: SegmentType::Intersection,
            speed_limit: 8.0,
            description: "junction at main street".into(),
        },
    );
    graph.add_node(
        "plaza",
        GraphNode {
            position: Vec3::new(30.0, 0.0, -80.0),
            segment: SegmentType::Generic,
            speed_limit: 10.0,
            description: "central plaza".into(),
        },
    );
    graph.connect("depot", "main_street");
    graph.connect("main_street", "junction");
    graph.connect("junction", "plaza");
    graph
}

fn main() {
    let mut app = create_headless_app(42);
    app.add_plugins(SimulationPlugin);

    app.insert_resource(RoutePlanner(Box::new(road_graph())));

    // Конусы вдоль main street, разбросанные детерминистичным RNG
    let mut field = ObstacleField::default();
    {
        let mut rng = app.world_mut().resource_mut::<DeterministicRng>();
        for i in 0..4 {
            let x = rng.rng.gen_range(-2.0..2.0);
            let z = -18.0 - i as f32 * 14.0 + rng.rng.gen_range(-3.0..3.0);
            field.push(Obstacle {
                center: Vec3::new(x, 0.5, z),
                radius: 0.5,
                tag: "cone".into(),
            });
        }
    }
    app.insert_resource(SceneGeometry(Box::new(field)));

    let taxi = match spawn_taxi(
        app.world_mut(),
        Vec3::ZERO,
        LidarConfig::default(),
        VehicleConfig::default(),
        AgentConfig::default(),
    ) {
        Ok(entity) => entity,
        Err(error) => {
            log_error(&format!("setup failed: {}", error));
            return;
        }
    };

    app.world_mut().send_event(MissionRequest {
        entity: taxi,
        start: "depot".into(),
        end: "plaza".into(),
    });

    for tick in 1..=2400u32 {
        step(&mut app);

        if tick % 120 == 0 {
            let world = app.world_mut();
            let mut query =
                world.query::<(&AgentState, &Transform, &AgentTelemetry, &Mission)>();
            for (state, transform, telemetry, mission) in query.iter(world) {
                log_info(&format!(
                    "tick {:4} | {:?} at ({:6.1}, {:6.1}) | cap {:4.1} | visited {} | {}",
                    tick,
                    state,
                    transform.translation.x,
                    transform.translation.z,
                    telemetry.target_speed,
                    mission.visited,
                    telemetry.last_thought,
                ));
            }
        }
    }

    let world = app.world_mut();
    let mut query = world.query::<(&AgentState, &Mission)>();
    for (state, mission) in query.iter(world) {
        log_info(&format!(
            "run finished: {:?}, {} of route {} -> {} visited",
            state, mission.visited, mission.start, mission.end
        ));
    }
}

//! Детерминизм: два прогона одного сценария дают побайтно одинаковый мир.
//!
//! Tick driver двигает Time<Fixed> руками, поэтому результат не зависит
//! от wall clock и нагрузки машины.

use bevy::prelude::*;

use autocab_simulation::{
    create_headless_app, spawn_taxi, step, world_snapshot, AgentConfig, AgentState, GraphNode,
    GraphSource, LidarConfig, MissionRequest, Obstacle, ObstacleField, RoutePlanner,
    SceneGeometry, SegmentType, SimulationPlugin, VehicleBody, VehicleConfig,
};

fn scenario(seed: u64, ticks: u32) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin);

    let mut graph = GraphSource::new();
    for (name, position) in [
        ("a", Vec3::ZERO),
        ("b", Vec3::new(0.0, 0.0, -25.0)),
        ("c", Vec3::new(10.0, 0.0, -50.0)),
    ] {
        graph.add_node(
            name,
            GraphNode {
                position,
                segment: SegmentType::Generic,
                speed_limit: 12.0,
                description: format!("node {}", name),
            },
        );
    }
    graph.connect("a", "b");
    graph.connect("b", "c");
    app.insert_resource(RoutePlanner(Box::new(graph)));

    app.insert_resource(SceneGeometry(Box::new(ObstacleField::new(vec![
        Obstacle {
            center: Vec3::new(1.5, 0.5, -12.0),
            radius: 0.6,
            tag: "cone".into(),
        },
    ]))));

    let taxi = spawn_taxi(
        app.world_mut(),
        Vec3::ZERO,
        LidarConfig::default(),
        VehicleConfig::default(),
        AgentConfig::default(),
    )
    .expect("default configs are valid");

    app.world_mut().send_event(MissionRequest {
        entity: taxi,
        start: "a".into(),
        end: "c".into(),
    });

    for _ in 0..ticks {
        step(&mut app);
    }

    let world = app.world_mut();
    (
        world_snapshot::<Transform>(world),
        world_snapshot::<VehicleBody>(world),
        world_snapshot::<AgentState>(world),
    )
}

#[test]
fn same_seed_same_world() {
    let first = scenario(42, 400);
    let second = scenario(42, 400);

    assert_eq!(first.0, second.0, "Transform snapshots differ");
    assert_eq!(first.1, second.1, "VehicleBody snapshots differ");
    assert_eq!(first.2, second.2, "AgentState snapshots differ");
}

#[test]
fn snapshot_is_not_trivially_empty() {
    let (transforms, bodies, states) = scenario(42, 60);
    assert!(!transforms.is_empty());
    assert!(!bodies.is_empty());
    assert!(!states.is_empty());
}

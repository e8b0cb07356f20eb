//! FSM навигации: mission control, decision-логика tick'а, прогресс маршрута
//!
//! Весь FSM живёт в трёх системах, порядок фиксирован chain'ом в plugin'е.
//! Решение каждого tick'а — чистая функция от (скан, состояние, пороги);
//! исполнение уходит в physics::car.

use bevy::prelude::*;

use crate::components::{
    AgentConfig, AgentState, AgentTelemetry, Mission, SegmentType, VehicleBody, VehicleConfig,
};
use crate::logger::{log_info, log_warning};
use crate::perception::{self, LidarConfig, SceneGeometry};
use crate::physics::{drive, emergency_brake, stop};
use crate::planner::RoutePlanner;

use super::{Explanation, MissionAbort, MissionRequest, PendingPath, StateChanged, TickCount};

/// Запись «мысли» агента: лог + телеметрия + событие для подписчиков
fn think(
    entity: Entity,
    state: AgentState,
    text: String,
    telemetry: &mut AgentTelemetry,
    explanations: &mut EventWriter<Explanation>,
) {
    log_info(&format!("[taxi {:?}] [{:?}] {}", entity, state, text));
    telemetry.last_thought = text.clone();
    explanations.write(Explanation {
        entity,
        state,
        text,
    });
}

/// Перевод FSM. Событие испускается только на реальном ребре;
/// возвращает true, если состояние сменилось.
fn transition(
    entity: Entity,
    state: &mut AgentState,
    to: AgentState,
    transitions: &mut EventWriter<StateChanged>,
) -> bool {
    if *state == to {
        return false;
    }
    transitions.write(StateChanged {
        entity,
        from: *state,
        to,
    });
    *state = to;
    true
}

/// Дистанция в плоскости XZ (вертикаль к arrival check отношения не имеет)
fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}

/// Система: счётчик tick'ов (нужен throttle'у объяснений)
pub fn advance_tick(mut tick: ResMut<TickCount>) {
    tick.0 += 1;
}

/// Система: команды миссии + poll планировщика.
///
/// Aborts обрабатываются раньше requests: отменённая миссия освобождает
/// агента для нового запроса в том же tick'е следующего кадра событий.
pub fn mission_control(
    mut commands: Commands,
    planner: Res<RoutePlanner>,
    mut requests: EventReader<MissionRequest>,
    mut aborts: EventReader<MissionAbort>,
    mut explanations: EventWriter<Explanation>,
    mut transitions: EventWriter<StateChanged>,
    mut query: Query<(
        Entity,
        &mut AgentState,
        &mut Mission,
        &mut VehicleBody,
        &mut AgentTelemetry,
        Option<&PendingPath>,
    )>,
) {
    for abort in aborts.read() {
        let Ok((entity, mut state, mut mission, mut body, mut telemetry, pending)) =
            query.get_mut(abort.entity)
        else {
            continue;
        };

        emergency_brake(&mut body);
        mission.queue.clear();
        mission.current = None;
        if pending.is_some() {
            commands.entity(entity).remove::<PendingPath>();
        }
        transition(entity, &mut state, AgentState::Idle, &mut transitions);
        telemetry.current_target = None;
        telemetry.target_speed = 0.0;
        think(
            entity,
            *state,
            "Mission aborted. Holding position.".to_string(),
            &mut telemetry,
            &mut explanations,
        );
    }

    for request in requests.read() {
        let Ok((entity, mut state, mut mission, _body, mut telemetry, _pending)) =
            query.get_mut(request.entity)
        else {
            continue;
        };

        // Новая миссия принимается только из Idle
        if *state != AgentState::Idle {
            log_warning(&format!(
                "[taxi {:?}] mission request ignored: busy in {:?}",
                entity, *state
            ));
            continue;
        }

        mission.start = request.start.clone();
        mission.end = request.end.clone();
        mission.visited = 0;
        commands
            .entity(entity)
            .insert(PendingPath(planner.0.request(&request.start, &request.end)));
        transition(entity, &mut state, AgentState::Planning, &mut transitions);
        think(
            entity,
            *state,
            format!(
                "Requesting route from {} to {}.",
                request.start, request.end
            ),
            &mut telemetry,
            &mut explanations,
        );
    }

    // Poll незавершённых запросов (неблокирующе, раз в tick)
    for (entity, mut state, mut mission, _body, mut telemetry, pending) in query.iter_mut() {
        if *state != AgentState::Planning {
            continue;
        }
        let Some(pending) = pending else {
            // PendingPath вставляется deferred-командой и виден со следующего
            // tick'а: на tick'е запроса здесь ещё None, просто ждём
            continue;
        };
        let Some(result) = pending.0.poll() else {
            continue; // backend ещё думает
        };
        commands.entity(entity).remove::<PendingPath>();

        match result {
            Err(error) => {
                transition(entity, &mut state, AgentState::Idle, &mut transitions);
                think(
                    entity,
                    *state,
                    format!("Route planning failed: {}.", error),
                    &mut telemetry,
                    &mut explanations,
                );
            }
            Ok(path) if path.is_empty() => {
                transition(entity, &mut state, AgentState::Idle, &mut transitions);
                think(
                    entity,
                    *state,
                    format!("No route found from {} to {}.", mission.start, mission.end),
                    &mut telemetry,
                    &mut explanations,
                );
            }
            Ok(path) => {
                let total = path.len();
                mission.queue = path.into();
                mission.current = mission.queue.pop_front();
                transition(entity, &mut state, AgentState::Traversing, &mut transitions);
                // Первый участок всегда есть: пустой маршрут обработан выше
                let first_segment = mission
                    .current
                    .as_ref()
                    .map(|first| {
                        if first.speed_limit > 0.0 {
                            format!("{}, limit {:.0}", first.description, first.speed_limit)
                        } else {
                            format!("{}, no speed limit", first.description)
                        }
                    })
                    .unwrap_or_default();
                think(
                    entity,
                    *state,
                    format!(
                        "Route ready: {} waypoints from {} to {}. First segment: {}. Departing.",
                        total, mission.start, mission.end, first_segment
                    ),
                    &mut telemetry,
                    &mut explanations,
                );
            }
        }
    }
}

/// Система: главное решение tick'а.
///
/// Скан → классификация опасности → выбор состояния и потолка скорости →
/// drive/stop. Critical danger бьёт любые другие соображения.
pub fn navigation_decision(
    time: Res<Time<Fixed>>,
    tick: Res<TickCount>,
    geometry: Res<SceneGeometry>,
    mut explanations: EventWriter<Explanation>,
    mut transitions: EventWriter<StateChanged>,
    mut query: Query<(
        Entity,
        &mut AgentState,
        &mut Transform,
        &mut VehicleBody,
        &VehicleConfig,
        &LidarConfig,
        &AgentConfig,
        &Mission,
        &mut AgentTelemetry,
    )>,
) {
    let dt = time.delta_secs();

    for (
        entity,
        mut state,
        mut transform,
        mut body,
        vehicle,
        lidar,
        agent,
        mission,
        mut telemetry,
    ) in query.iter_mut()
    {
        // Без активной цели ехать некуда: выкатываемся и ждём
        if matches!(*state, AgentState::Idle | AgentState::Planning) {
            stop(&mut body, dt);
            telemetry.target_speed = 0.0;
            continue;
        }
        let Some(waypoint) = mission.current.as_ref() else {
            stop(&mut body, dt);
            telemetry.target_speed = 0.0;
            continue;
        };
        let target = waypoint.position;

        let scan = perception::scan(&transform, lidar, geometry.0.as_ref());

        // Разрешённая скорость участка (0 у waypoint'а = лимита нет)
        let segment_limit = if waypoint.speed_limit > 0.0 {
            waypoint.speed_limit.min(vehicle.max_speed)
        } else {
            vehicle.max_speed
        };

        let tag = scan.detected_tag.clone().unwrap_or_else(|| "obstacle".to_string());

        if scan.critical_danger {
            // Ребро в EmergencyStop: полное обнуление скорости ровно один раз
            if transition(entity, &mut state, AgentState::EmergencyStop, &mut transitions) {
                emergency_brake(&mut body);
                think(
                    entity,
                    *state,
                    format!(
                        "EMERGENCY STOP: {} at {:.1}m dead ahead.",
                        tag, scan.nearest_distance
                    ),
                    &mut telemetry,
                    &mut explanations,
                );
            } else {
                stop(&mut body, dt);
            }
            telemetry.target_speed = 0.0;
        } else if scan.obstacle_detected && scan.nearest_distance < agent.mid_threshold {
            let was_emergency = *state == AgentState::EmergencyStop;
            let entered = transition(
                entity,
                &mut state,
                AgentState::ObstacleAvoidance,
                &mut transitions,
            );

            let target_speed = if scan.nearest_distance < agent.near_threshold {
                // Вплотную: ползём; затяжной манёвр объясняем не чаще
                // think_throttle_ticks
                if entered || tick.0 % agent.think_throttle_ticks == 0 {
                    let text = if was_emergency {
                        "Danger cleared. Maneuvering with caution.".to_string()
                    } else {
                        format!(
                            "{} at {:.1}m. Crawling around it.",
                            tag, scan.nearest_distance
                        )
                    };
                    think(entity, *state, text, &mut telemetry, &mut explanations);
                }
                agent.crawl_speed.min(segment_limit)
            } else {
                if entered {
                    let text = if was_emergency {
                        "Danger cleared. Maneuvering with caution.".to_string()
                    } else {
                        format!(
                            "{} ahead at {:.1}m. Slowing down.",
                            tag, scan.nearest_distance
                        )
                    };
                    think(entity, *state, text, &mut telemetry, &mut explanations);
                }
                segment_limit * 0.5
            };

            drive(
                &mut body,
                &mut transform,
                vehicle,
                target,
                scan.avoidance_vector,
                target_speed,
                dt,
            );
            telemetry.target_speed = target_speed;
        } else {
            if scan.obstacle_detected {
                // Помеха далеко: скорость не трогаем, режим не меняем —
                // кроме выхода из EmergencyStop (опасность уже не critical)
                if *state == AgentState::EmergencyStop {
                    transition(
                        entity,
                        &mut state,
                        AgentState::ObstacleAvoidance,
                        &mut transitions,
                    );
                    think(
                        entity,
                        *state,
                        "Danger cleared. Maneuvering with caution.".to_string(),
                        &mut telemetry,
                        &mut explanations,
                    );
                }
            } else if transition(entity, &mut state, AgentState::Traversing, &mut transitions) {
                think(
                    entity,
                    *state,
                    "Road clear. Resuming cruise speed.".to_string(),
                    &mut telemetry,
                    &mut explanations,
                );
            }
            drive(
                &mut body,
                &mut transform,
                vehicle,
                target,
                scan.avoidance_vector,
                segment_limit,
                dt,
            );
            telemetry.target_speed = segment_limit;
        }

        telemetry.current_target = Some(target);
        telemetry.last_scan = Some(scan);
    }
}

/// Система: arrival check и продвижение очереди waypoint'ов.
///
/// Проверка планарная; waypoint засчитывается ровно один раз (снятие
/// current происходит в том же tick'е, что и попадание в радиус).
pub fn waypoint_progress(
    time: Res<Time<Fixed>>,
    mut explanations: EventWriter<Explanation>,
    mut transitions: EventWriter<StateChanged>,
    mut query: Query<(
        Entity,
        &mut AgentState,
        &Transform,
        &mut VehicleBody,
        &AgentConfig,
        &mut Mission,
        &mut AgentTelemetry,
    )>,
) {
    let dt = time.delta_secs();

    for (entity, mut state, transform, mut body, agent, mut mission, mut telemetry) in
        query.iter_mut()
    {
        if matches!(*state, AgentState::Idle | AgentState::Planning) {
            continue;
        }

        if mission.is_complete() {
            stop(&mut body, dt);
            if transition(entity, &mut state, AgentState::Idle, &mut transitions) {
                telemetry.current_target = None;
                telemetry.target_speed = 0.0;
                think(
                    entity,
                    *state,
                    format!(
                        "Destination reached: {} ({} waypoints).",
                        mission.end, mission.visited
                    ),
                    &mut telemetry,
                    &mut explanations,
                );
            }
            continue;
        }

        let arrived = mission.current.as_ref().is_some_and(|waypoint| {
            planar_distance(transform.translation, waypoint.position) < agent.arrival_distance
        });
        if !arrived {
            continue;
        }

        mission.visited += 1;
        mission.current = mission.queue.pop_front();

        if let Some(next) = mission.current.as_ref() {
            if next.segment == SegmentType::Intersection {
                think(
                    entity,
                    *state,
                    format!("Intersection ahead: {}. Extra caution.", next.description),
                    &mut telemetry,
                    &mut explanations,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::SystemState;

    #[test]
    fn planar_distance_ignores_height() {
        let a = Vec3::new(0.0, 10.0, 0.0);
        let b = Vec3::new(3.0, -5.0, 4.0);
        assert!((planar_distance(a, b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn transition_emits_only_on_edge() {
        let mut world = World::new();
        world.init_resource::<Events<StateChanged>>();
        let mut system_state: SystemState<EventWriter<StateChanged>> =
            SystemState::new(&mut world);

        let mut state = AgentState::Idle;
        {
            let mut writer = system_state.get_mut(&mut world);
            assert!(transition(
                Entity::PLACEHOLDER,
                &mut state,
                AgentState::Planning,
                &mut writer
            ));
            // Повторный перевод в то же состояние — не ребро
            assert!(!transition(
                Entity::PLACEHOLDER,
                &mut state,
                AgentState::Planning,
                &mut writer
            ));
        }
        system_state.apply(&mut world);

        let events: Vec<StateChanged> = world
            .resource_mut::<Events<StateChanged>>()
            .drain()
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from, AgentState::Idle);
        assert_eq!(events[0].to, AgentState::Planning);
    }

    #[test]
    fn think_updates_telemetry() {
        let mut world = World::new();
        world.init_resource::<Events<Explanation>>();
        let mut system_state: SystemState<EventWriter<Explanation>> =
            SystemState::new(&mut world);

        let mut telemetry = AgentTelemetry::default();
        {
            let mut writer = system_state.get_mut(&mut world);
            think(
                Entity::PLACEHOLDER,
                AgentState::Traversing,
                "Road clear.".to_string(),
                &mut telemetry,
                &mut writer,
            );
        }
        system_state.apply(&mut world);

        assert_eq!(telemetry.last_thought, "Road clear.");
        let events: Vec<Explanation> = world
            .resource_mut::<Events<Explanation>>()
            .drain()
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text, "Road clear.");
    }
}

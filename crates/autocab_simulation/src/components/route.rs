//! Data model маршрута: waypoints с семантикой + состояние миссии

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Семантический тип участка дороги (влияет на explainability,
/// Intersection дополнительно даёт caution-заметку при dequeue)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SegmentType {
    #[default]
    Generic,
    Straight,
    Intersection,
    Stop,
}

/// Waypoint маршрута. Приходит извне (path source), core его не мутирует.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteWaypoint {
    /// Точка на плоскости XZ; вертикаль рулением игнорируется
    pub position: Vec3,
    pub segment: SegmentType,
    /// 0 => этот waypoint лимита не накладывает
    pub speed_limit: f32,
    /// Человекочитаемое описание участка (для объяснений)
    pub description: String,
}

/// Состояние миссии: оставшаяся очередь + текущая цель.
///
/// `current` — sum type, а не nullable-ссылка: пустая очередь и снятая
/// текущая точка вместе образуют проверяемое терминальное условие.
/// Дважды один waypoint не dequeue'ится: снятие происходит только после
/// успешного arrival check в том же tick'е.
#[derive(Component, Debug, Clone, Default)]
pub struct Mission {
    pub start: String,
    pub end: String,
    pub queue: VecDeque<RouteWaypoint>,
    pub current: Option<RouteWaypoint>,
    /// Сколько waypoint'ов реально достигнуто за миссию
    pub visited: u32,
}

impl Mission {
    /// Терминальное условие: больше некуда ехать
    pub fn is_complete(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waypoint(z: f32) -> RouteWaypoint {
        RouteWaypoint {
            position: Vec3::new(0.0, 0.0, z),
            segment: SegmentType::Generic,
            speed_limit: 0.0,
            description: "test".into(),
        }
    }

    #[test]
    fn fresh_mission_is_complete() {
        // Пустая миссия терминальна сразу — агент в Idle её не трогает
        assert!(Mission::default().is_complete());
    }

    #[test]
    fn mission_with_current_is_not_complete() {
        let mission = Mission {
            current: Some(waypoint(-10.0)),
            ..Default::default()
        };
        assert!(!mission.is_complete());
    }

    #[test]
    fn mission_with_queued_waypoints_is_not_complete() {
        let mut mission = Mission::default();
        mission.queue.push_back(waypoint(-20.0));
        assert!(!mission.is_complete());
    }
}

//! Компоненты агента: FSM state, пороги decision-логики, телеметрия

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::perception::PerceptionSummary;
use crate::SetupError;

/// FSM состояния навигационного агента
///
/// Idle → Planning → Traversing ⇄ ObstacleAvoidance, любое → EmergencyStop.
/// Терминал миссии — снова Idle.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
#[reflect(Component)]
pub enum AgentState {
    /// Ждём миссию
    #[default]
    Idle,
    /// Запросили маршрут, poll'им ответ на границах tick'ов
    Planning,
    /// Обычная езда по маршруту
    Traversing,
    /// Локальный манёвр вокруг препятствия
    ObstacleAvoidance,
    /// Критическая опасность — стоим намертво
    EmergencyStop,
}

/// Пороги decision-логики агента
#[derive(Component, Debug, Clone, Copy, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct AgentConfig {
    /// Ближе этого — ползём crawl_speed
    pub near_threshold: f32,
    /// Ближе этого — половина разрешённой скорости
    pub mid_threshold: f32,
    /// «Шаг пешехода» при манёвре вплотную
    pub crawl_speed: f32,
    /// Радиус засчитывания waypoint'а
    pub arrival_distance: f32,
    /// Объяснение при затяжном манёвре — не чаще одного раза в столько tick'ов
    pub think_throttle_ticks: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            near_threshold: 6.0,
            mid_threshold: 12.0,
            crawl_speed: 5.0,
            arrival_distance: 2.0,
            think_throttle_ticks: 60,
        }
    }
}

impl AgentConfig {
    /// Fail-fast валидация на setup
    pub fn validate(&self) -> Result<(), SetupError> {
        for (name, value) in [
            ("near_threshold", self.near_threshold),
            ("mid_threshold", self.mid_threshold),
            ("crawl_speed", self.crawl_speed),
            ("arrival_distance", self.arrival_distance),
        ] {
            if value <= 0.0 {
                return Err(SetupError::NonPositive { name, value });
            }
        }
        if self.near_threshold >= self.mid_threshold {
            return Err(SetupError::ThresholdOrder {
                near: self.near_threshold,
                mid: self.mid_threshold,
            });
        }
        if self.think_throttle_ticks == 0 {
            return Err(SetupError::NonPositive {
                name: "think_throttle_ticks",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Read-only наблюдение за агентом.
///
/// Опциональный рендер/UI читает отсюда последний скан и текущую цель;
/// на управление не влияет, без подписчиков ничего не стоит.
#[derive(Component, Debug, Clone, Default)]
pub struct AgentTelemetry {
    pub last_scan: Option<PerceptionSummary>,
    /// Целевая скорость, выбранная в последнем tick'е (0 при emergency)
    pub target_speed: f32,
    pub current_target: Option<Vec3>,
    /// Последняя «мысль» агента (XAI)
    pub last_thought: String,
}

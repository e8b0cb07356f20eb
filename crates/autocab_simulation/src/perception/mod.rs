//! Lidar-перцепция: веер лучей → компактная сводка опасности
//!
//! `scan` — чистая функция от текущей позы и геометрии сцены на момент
//! вызова; между tick'ами ничего не запоминает. Геометрия — чёрный ящик
//! за трейтом `ObstacleGeometry` (инжектится ресурсом `SceneGeometry`),
//! конкурентные сканы разных машин безопасны: только чтение.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::SetupError;

/// Результат пересечения луча с препятствием
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    /// Классификация ("pedestrian", "wall", "cone", ...)
    pub tag: String,
}

/// Оракул геометрии: ближайшее пересечение луча или "мимо".
/// Детерминирован в пределах одного вызова.
pub trait ObstacleGeometry: Send + Sync {
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit>;
}

/// Геометрия сцены как ресурс (dependency injection, без глобалов)
#[derive(Resource)]
pub struct SceneGeometry(pub Box<dyn ObstacleGeometry>);

impl Default for SceneGeometry {
    fn default() -> Self {
        Self(Box::new(ObstacleField::default()))
    }
}

/// Помеченная сфера-препятствие
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub center: Vec3,
    pub radius: f32,
    pub tag: String,
}

/// Простейшая реализация оракула: набор сфер, аналитическое пересечение
#[derive(Debug, Clone, Default)]
pub struct ObstacleField {
    obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    pub fn push(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }
}

impl ObstacleGeometry for ObstacleField {
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let mut nearest: Option<RayHit> = None;

        for obstacle in &self.obstacles {
            let oc = origin - obstacle.center;
            let b = oc.dot(direction);
            let c = oc.length_squared() - obstacle.radius * obstacle.radius;
            let discriminant = b * b - c;
            if discriminant < 0.0 {
                continue;
            }

            // Ближайший положительный корень (если origin внутри сферы — выход из неё)
            let sqrt_d = discriminant.sqrt();
            let mut t = -b - sqrt_d;
            if t < 0.0 {
                t = -b + sqrt_d;
            }
            if t < 0.0 || t > max_distance {
                continue;
            }

            if nearest.as_ref().is_none_or(|hit| t < hit.distance) {
                nearest = Some(RayHit {
                    distance: t,
                    tag: obstacle.tag.clone(),
                });
            }
        }

        nearest
    }
}

/// Настройки лидара
#[derive(Component, Debug, Clone, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct LidarConfig {
    /// Число лучей (минимум 2 — иначе деление на ноль в шаге угла)
    pub rays: u32,
    /// Раствор веера, градусы
    pub fov_deg: f32,
    /// Дальность сенсора
    pub range: f32,
    /// Масштаб репульсии
    pub avoidance_strength: f32,
    /// Ближе этого в узком конусе — criticalDanger
    pub critical_distance: f32,
    /// Полуугол критического конуса, градусы
    pub critical_half_angle_deg: f32,
    /// Сенсор стоит выше земли ("высота фар")
    pub sensor_height: f32,
}

impl Default for LidarConfig {
    fn default() -> Self {
        Self {
            rays: 10,
            fov_deg: 90.0,
            range: 15.0,
            avoidance_strength: 5.0,
            critical_distance: 3.0,
            critical_half_angle_deg: 15.0,
            sensor_height: 0.5,
        }
    }
}

impl LidarConfig {
    /// Fail-fast валидация на setup: вырожденная конфигурация не доживает
    /// до tick time.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.rays < 2 {
            return Err(SetupError::TooFewRays(self.rays));
        }
        for (name, value) in [
            ("fov_deg", self.fov_deg),
            ("range", self.range),
            ("critical_distance", self.critical_distance),
            ("critical_half_angle_deg", self.critical_half_angle_deg),
        ] {
            if value <= 0.0 {
                return Err(SetupError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

/// Сводка одного скана. Immutable value, живёт один tick.
///
/// Инварианты: `nearest_distance ∈ (0, range]`;
/// `avoidance_vector == 0` ⇔ `obstacle_detected == false`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerceptionSummary {
    pub obstacle_detected: bool,
    /// Препятствие в узком фронтальном конусе и ближе critical_distance
    pub critical_danger: bool,
    /// Минимальная дистанция по всем лучам, либо range если чисто
    pub nearest_distance: f32,
    /// Сумма репульсий, НЕ нормализована — длина кодирует суммарную опасность
    pub avoidance_vector: Vec3,
    /// Тег ближайшего попадания; только для объяснений, не для управления
    pub detected_tag: Option<String>,
}

impl PerceptionSummary {
    /// «Чистая дорога»
    pub fn clear(range: f32) -> Self {
        Self {
            obstacle_detected: false,
            critical_danger: false,
            nearest_distance: range,
            avoidance_vector: Vec3::ZERO,
            detected_tag: None,
        }
    }
}

/// Один скан: веер из `rays` лучей, равномерно по `fov_deg` вокруг
/// текущего forward. Вызывается агентом в начале каждого tick'а.
pub fn scan(
    transform: &Transform,
    config: &LidarConfig,
    geometry: &dyn ObstacleGeometry,
) -> PerceptionSummary {
    let mut summary = PerceptionSummary::clear(config.range);

    let origin = transform.translation + Vec3::Y * config.sensor_height;
    let forward = *transform.forward();

    // Страховка от вырожденной конфигурации (validate ловит это раньше)
    let rays = config.rays.max(2);
    let angle_step = config.fov_deg / (rays - 1) as f32;
    let start_angle = -config.fov_deg / 2.0;

    for i in 0..rays {
        let angle_deg = start_angle + angle_step * i as f32;
        let direction = Quat::from_rotation_y(angle_deg.to_radians()) * forward;

        let Some(hit) = geometry.cast_ray(origin, direction, config.range) else {
            continue;
        };

        summary.obstacle_detected = true;

        if hit.distance < summary.nearest_distance {
            summary.nearest_distance = hit.distance;
            summary.detected_tag = Some(hit.tag);
        }

        // Репульсия от попадания: квадрат веса даёт быстрее-чем-линейный
        // рост у самого носа
        let weight = 1.0 - hit.distance / config.range;
        summary.avoidance_vector += -direction * weight * weight * config.avoidance_strength;

        if angle_deg.abs() <= config.critical_half_angle_deg
            && hit.distance < config.critical_distance
        {
            summary.critical_danger = true;
        }
    }

    summary
}

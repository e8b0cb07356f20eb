//! Компоненты кузова: rigid-body state + настройки привода

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::SetupError;

/// Состояние корпуса такси (упрощённый rigid body, headless).
///
/// Мутируется ТОЛЬКО physics-системами в рамках tick'а владельца;
/// остальные читают для телеметрии/отображения.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct VehicleBody {
    pub velocity: Vec3,
    pub mass: f32,
    /// Сопротивление воздуха (доля скорости, гасимая за секунду)
    pub linear_damping: f32,
}

impl Default for VehicleBody {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            mass: 1500.0,
            linear_damping: 0.2,
        }
    }
}

/// Настройки движка и руля.
///
/// Единицы не привязаны к СИ, важна только согласованность между полями.
#[derive(Component, Debug, Clone, Copy, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct VehicleConfig {
    /// Абсолютный потолок скорости
    pub max_speed: f32,
    /// Ускорение (тяга мотора)
    pub acceleration: f32,
    /// Тормозное усилие
    pub brake_power: f32,
    /// Реактивность физического руля (rad-доля за секунду)
    pub turn_speed: f32,
    /// Фильтр резких поворотов (ниже = плавнее, но медленнее реагирует)
    pub steering_smoothness: f32,
    /// Нижний предел скорости в крутом повороте
    pub min_cornering_speed: f32,
    /// Гистерезис тормоза — без него педаль дребезжит вокруг target speed
    pub brake_margin: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            max_speed: 15.0,
            acceleration: 30.0,
            brake_power: 60.0,
            turn_speed: 10.0,
            steering_smoothness: 5.0,
            min_cornering_speed: 3.0,
            brake_margin: 1.0,
        }
    }
}

impl VehicleConfig {
    /// Fail-fast валидация на setup
    pub fn validate(&self) -> Result<(), SetupError> {
        for (name, value) in [
            ("max_speed", self.max_speed),
            ("acceleration", self.acceleration),
            ("brake_power", self.brake_power),
            ("turn_speed", self.turn_speed),
            ("steering_smoothness", self.steering_smoothness),
        ] {
            if value <= 0.0 {
                return Err(SetupError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(VehicleConfig::default().validate().is_ok());
    }

    #[test]
    fn non_positive_speed_rejected() {
        let config = VehicleConfig {
            max_speed: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SetupError::NonPositive { name: "max_speed", .. })
        ));
    }
}

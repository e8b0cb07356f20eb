//! Привод корпуса: руление со сглаживанием, cornering-ограничение скорости,
//! гашение бокового скольжения
//!
//! `drive` детерминирован от входов и dt, ничего не аллоцирует и мутирует
//! только VehicleBody/Transform. Вызывается раз в tick с одним и тем же
//! target, пока маршрут не продвинулся.

use bevy::prelude::*;

use crate::components::{VehicleBody, VehicleConfig};

/// Основной метод езды: целевая точка + репульсия лидара + потолок скорости.
///
/// Потолков два: просьба агента (speed_cap) и физика поворота
/// (safe_physical_speed); действует меньший.
pub fn drive(
    body: &mut VehicleBody,
    transform: &mut Transform,
    config: &VehicleConfig,
    target: Vec3,
    avoidance: Vec3,
    speed_cap: f32,
    dt: f32,
) {
    // 1. Куда хотим: направление на target в плоскости XZ
    let mut to_target = target - transform.translation;
    to_target.y = 0.0;
    let direction_to_target = to_target.normalize_or_zero();

    // 2. Фьюжн: желание ехать к цели + необходимость уворачиваться
    let mut fused = direction_to_target + avoidance;
    fused.y = 0.0;
    let final_direction = fused.normalize_or_zero();

    // Цель и репульсия погасили друг друга: руль/газ в этот tick пропускаем,
    // но шины скользить не начинают
    if final_direction == Vec3::ZERO {
        kill_lateral_velocity(body, transform);
        return;
    }

    let forward = *transform.forward();

    // 3. Интерполяция руля: конечная полоса пропускания актуатора,
    // никаких разворотов за один tick
    let smooth_direction = slerp_direction(
        forward,
        final_direction,
        config.steering_smoothness * dt,
    );

    // 4. Насколько круто поворачиваем: 1 = прямо, меньше = круче
    let corner_factor = forward.dot(smooth_direction).clamp(0.0, 1.0);

    // 5. Физический потолок скорости в повороте
    let safe_physical_speed = config.min_cornering_speed
        + (config.max_speed - config.min_cornering_speed) * corner_factor;

    // 6. Побеждает более строгий лимит
    let target_speed = speed_cap.min(safe_physical_speed).min(config.max_speed);

    apply_steering(transform, smooth_direction, config.turn_speed, dt);
    apply_throttle_or_brake(body, transform, config, target_speed, dt);
    kill_lateral_velocity(body, transform);
}

/// Мягкая остановка: экспоненциальное затухание скорости
pub fn stop(body: &mut VehicleBody, dt: f32) {
    body.velocity = body.velocity.lerp(Vec3::ZERO, (2.0 * dt).clamp(0.0, 1.0));
}

/// Мгновенное обнуление скорости — только для critical danger
pub fn emergency_brake(body: &mut VehicleBody) {
    body.velocity = Vec3::ZERO;
}

/// Сферическая интерполяция направлений (аналог slerp по дуге)
fn slerp_direction(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    let t = t.clamp(0.0, 1.0);
    let (Some(from), Some(to)) = (from.try_normalize(), to.try_normalize()) else {
        return to.normalize_or_zero();
    };
    let arc = Quat::from_rotation_arc(from, to);
    (Quat::IDENTITY.slerp(arc, t) * from).normalize_or_zero()
}

/// Поворот корпуса к желаемому направлению с ограниченной угловой скоростью
fn apply_steering(transform: &mut Transform, desired: Vec3, turn_speed: f32, dt: f32) {
    let target_rotation = transform.looking_to(desired, Vec3::Y).rotation;
    transform.rotation = transform
        .rotation
        .slerp(target_rotation, (turn_speed * dt).clamp(0.0, 1.0));
}

/// Газ/тормоз с гистерезисом: между target и target+margin — накат
fn apply_throttle_or_brake(
    body: &mut VehicleBody,
    transform: &Transform,
    config: &VehicleConfig,
    target_speed: f32,
    dt: f32,
) {
    let forward = *transform.forward();
    let current_forward_speed = body.velocity.dot(forward);

    if current_forward_speed < target_speed {
        body.velocity += forward * config.acceleration * dt;
    } else if current_forward_speed > target_speed + config.brake_margin {
        body.velocity -= forward * config.brake_power * dt;
    }

    // Жёсткий потолок: скорость вперёд никогда не превышает max_speed
    let after = body.velocity.dot(forward);
    if after > config.max_speed {
        body.velocity -= forward * (after - config.max_speed);
    }
}

/// Гашение боковой составляющей скорости — шины не скользят.
/// После каждого drive боковая скорость строго ноль.
fn kill_lateral_velocity(body: &mut VehicleBody, transform: &Transform) {
    let forward = *transform.forward();
    let forward_speed = body.velocity.dot(forward);
    let vertical = body.velocity.y - forward.y * forward_speed;
    body.velocity = forward * forward_speed + Vec3::Y * vertical;
}

/// Система: сопротивление воздуха
pub fn apply_damping(mut query: Query<&mut VehicleBody>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();

    for mut body in query.iter_mut() {
        let factor = (1.0 - body.linear_damping * delta).max(0.0);
        body.velocity *= factor;
    }
}

/// Система: интеграция velocity → Transform (headless, без внешнего движка)
pub fn integrate_velocity(
    mut query: Query<(&VehicleBody, &mut Transform)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (body, mut transform) in query.iter_mut() {
        transform.translation += body.velocity * delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn straight_target() -> Vec3 {
        // Далеко прямо по курсу (forward идентичного Transform = -Z)
        Vec3::new(0.0, 0.0, -100.0)
    }

    #[test]
    fn lateral_velocity_is_zero_after_drive() {
        let config = VehicleConfig::default();
        let inputs = [
            (Vec3::new(3.0, 0.0, -5.0), Vec3::ZERO),
            (Vec3::new(-8.0, 0.0, -1.0), Vec3::new(0.4, 0.0, 0.9)),
            (Vec3::new(0.0, 0.0, -100.0), Vec3::new(-2.0, 0.0, 0.3)),
        ];

        for (target, avoidance) in inputs {
            let mut body = VehicleBody {
                velocity: Vec3::new(4.0, 0.0, -3.0), // с боковым заносом
                ..Default::default()
            };
            let mut transform = Transform::IDENTITY;
            drive(&mut body, &mut transform, &config, target, avoidance, 10.0, DT);

            let right = *transform.right();
            assert!(
                body.velocity.dot(right).abs() < 1e-4,
                "lateral residue for target {:?}: {}",
                target,
                body.velocity.dot(right)
            );
        }
    }

    #[test]
    fn forward_speed_converges_to_cap() {
        let config = VehicleConfig::default();
        let mut body = VehicleBody::default();
        let mut transform = Transform::IDENTITY;
        let cap = 8.0;

        let mut peak: f32 = 0.0;
        for _ in 0..600 {
            drive(
                &mut body,
                &mut transform,
                &config,
                straight_target(),
                Vec3::ZERO,
                cap,
                DT,
            );
            peak = peak.max(body.velocity.dot(*transform.forward()));
        }

        let final_speed = body.velocity.dot(*transform.forward());
        // Сходимся в коридор [cap, cap + margin] (газ ниже cap, накат выше)
        assert!(final_speed >= cap - 0.1, "final speed {}", final_speed);
        assert!(
            final_speed <= cap + config.brake_margin + config.acceleration * DT,
            "final speed {}",
            final_speed
        );
        assert!(peak <= config.max_speed + 1e-3, "peak {}", peak);
    }

    #[test]
    fn forward_speed_never_exceeds_max() {
        let config = VehicleConfig::default();
        let mut body = VehicleBody {
            velocity: Vec3::new(0.0, 0.0, -100.0), // абсурдно быстрый занос
            ..Default::default()
        };
        let mut transform = Transform::IDENTITY;

        drive(
            &mut body,
            &mut transform,
            &config,
            straight_target(),
            Vec3::ZERO,
            50.0,
            DT,
        );

        let forward_speed = body.velocity.dot(*transform.forward());
        assert!(forward_speed <= config.max_speed + 1e-3, "{}", forward_speed);
    }

    #[test]
    fn sharp_turn_caps_speed_below_straight_cruise() {
        let config = VehicleConfig::default();
        // Крупный dt: за tick руль успевает довернуть сильно, cornering-лимит
        // реально кусается (на 60Hz угол за tick мал и фактор близок к 1)
        let coarse_dt = 0.2;

        // Прямая езда: разгоняемся до max
        let mut straight_body = VehicleBody::default();
        let mut straight_tf = Transform::IDENTITY;
        // Цель всегда строго сбоку: непрерывный крутой поворот
        let mut turning_body = VehicleBody::default();
        let mut turning_tf = Transform::IDENTITY;

        for _ in 0..100 {
            let straight_target = straight_tf.translation + *straight_tf.forward() * 100.0;
            drive(
                &mut straight_body,
                &mut straight_tf,
                &config,
                straight_target,
                Vec3::ZERO,
                config.max_speed,
                coarse_dt,
            );
            let turning_target = turning_tf.translation + *turning_tf.right() * 100.0;
            drive(
                &mut turning_body,
                &mut turning_tf,
                &config,
                turning_target,
                Vec3::ZERO,
                config.max_speed,
                coarse_dt,
            );
        }

        let straight_speed = straight_body.velocity.dot(*straight_tf.forward());
        let turning_speed = turning_body.velocity.dot(*turning_tf.forward());
        assert!(
            turning_speed < straight_speed - 5.0,
            "turning {} straight {}",
            turning_speed,
            straight_speed
        );
    }

    #[test]
    fn cancelled_direction_is_noop_for_steering_and_throttle() {
        let config = VehicleConfig::default();
        let mut body = VehicleBody {
            velocity: Vec3::new(0.0, 0.0, -2.0),
            ..Default::default()
        };
        let mut transform = Transform::IDENTITY;
        let rotation_before = transform.rotation;
        let forward_speed_before = body.velocity.dot(*transform.forward());

        // Репульсия ровно противоположна направлению на цель
        let target = Vec3::new(0.0, 0.0, -10.0); // direction = -Z
        let avoidance = Vec3::new(0.0, 0.0, 1.0); // +Z
        drive(&mut body, &mut transform, &config, target, avoidance, 10.0, DT);

        assert_eq!(transform.rotation, rotation_before);
        let forward_speed_after = body.velocity.dot(*transform.forward());
        assert!((forward_speed_after - forward_speed_before).abs() < 1e-5);
    }

    #[test]
    fn steering_is_smoothed_not_snapped() {
        let config = VehicleConfig::default();
        let mut body = VehicleBody::default();
        let mut transform = Transform::IDENTITY;

        // Цель под 90° справа — за один tick корпус не разворачивается
        drive(
            &mut body,
            &mut transform,
            &config,
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::ZERO,
            config.max_speed,
            DT,
        );

        let forward = *transform.forward();
        let initial = Vec3::NEG_Z;
        let turned_deg = forward.angle_between(initial).to_degrees();
        assert!(turned_deg > 0.0, "должен начать доворачивать");
        assert!(turned_deg < 20.0, "снап-поворот за один tick: {}°", turned_deg);
    }

    #[test]
    fn emergency_brake_zeroes_velocity_exactly() {
        let mut body = VehicleBody {
            velocity: Vec3::new(3.0, 0.0, -12.0),
            ..Default::default()
        };
        emergency_brake(&mut body);
        assert_eq!(body.velocity, Vec3::ZERO);
    }

    #[test]
    fn stop_decays_velocity_monotonically() {
        let mut body = VehicleBody {
            velocity: Vec3::new(0.0, 0.0, -10.0),
            ..Default::default()
        };
        let mut previous = body.velocity.length();
        for _ in 0..120 {
            stop(&mut body, DT);
            let speed = body.velocity.length();
            assert!(speed <= previous);
            previous = speed;
        }
        assert!(previous < 0.2, "после 2с почти стоим: {}", previous);
    }
}

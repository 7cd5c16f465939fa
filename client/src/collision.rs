//! Vehicle-vs-boss contact resolution on the horizontal plane.
//!
//! Both actors are treated as vertical cylinders whose radius is a fraction of
//! their larger horizontal box extent. The box overlap is only the broad
//! phase; the cylinders decide whether anything moves. Contacts shallower than
//! the dead zone are left alone so a vehicle resting against the boss does not
//! jitter.

use crate::boss::Boss;
use crate::vehicle::{DamageOutcome, DestructionObserver, Vehicle};
use log::debug;
use shared::{
    Aabb, Vec3, ARMOR_MASS_FACTOR, BOSS_CONTACT_COOLDOWN_MS, BOSS_MASS, COLLISION_RADIUS_FACTOR,
    CONTACT_FRICTION, CONTACT_IMPULSE_SCALE, CONTACT_RESTITUTION, PENETRATION_DEAD_ZONE,
    POSITION_CORRECTION,
};
use std::time::Duration;

/// Cylinder radius used for contact: a fraction of the larger horizontal extent.
pub fn contact_radius(bounds: &Aabb) -> f32 {
    COLLISION_RADIUS_FACTOR * bounds.max_horizontal_extent()
}

pub fn vehicle_mass(armor: f32) -> f32 {
    1.0 + armor * ARMOR_MASS_FACTOR
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactOutcome {
    pub penetration: f32,
    /// Unit horizontal normal pointing from the boss to the vehicle.
    pub normal: Vec3,
    /// Whether the vehicle was closing on the boss and took an impulse.
    pub impulse_applied: bool,
    /// Contact damage, if the cooldown allowed it this tick.
    pub damage: Option<(f32, DamageOutcome)>,
}

/// Penetration depth and normal between the boss and a vehicle, or `None`
/// when their boxes do not even overlap.
pub fn measure_contact(boss: &Boss, vehicle: &Vehicle) -> Option<(f32, Vec3)> {
    let boss_bounds = boss.bounds();
    let vehicle_bounds = vehicle.bounds();
    if !boss_bounds.intersects(&vehicle_bounds) {
        return None;
    }

    let offset = (vehicle.position - boss.position).horizontal();
    let distance = offset.length();
    let penetration = contact_radius(&boss_bounds) + contact_radius(&vehicle_bounds) - distance;
    let normal = if distance > f32::EPSILON {
        offset * (1.0 / distance)
    } else {
        Vec3::X
    };
    Some((penetration, normal))
}

/// Pushes the vehicle out of the boss, damps its approach, and applies
/// contact damage behind a per-vehicle cooldown. Returns `None` when nothing
/// was changed.
pub fn resolve_boss_contact(
    boss: &Boss,
    vehicle: &mut Vehicle,
    now: Duration,
    observer: &mut dyn DestructionObserver,
) -> Option<ContactOutcome> {
    let (penetration, normal) = measure_contact(boss, vehicle)?;
    if penetration <= PENETRATION_DEAD_ZONE {
        return None;
    }

    let mass = vehicle_mass(vehicle.armor);
    let vehicle_ratio = mass / (BOSS_MASS + mass);

    // Horizontal push only; height is kept as is.
    let push = penetration * POSITION_CORRECTION * vehicle_ratio;
    vehicle.position.x += normal.x * push;
    vehicle.position.z += normal.z * push;

    let closing_speed = vehicle.velocity.horizontal().dot(&normal);
    let impulse_applied = closing_speed < 0.0;
    if impulse_applied {
        let impulse =
            -(1.0 + CONTACT_RESTITUTION) * closing_speed / (1.0 / BOSS_MASS + 1.0 / mass);
        let delta = normal * (impulse / mass * CONTACT_IMPULSE_SCALE);
        vehicle.velocity.x += delta.x;
        vehicle.velocity.z += delta.z;
        vehicle.velocity.y = 0.0;
        vehicle.velocity.x *= CONTACT_FRICTION;
        vehicle.velocity.z *= CONTACT_FRICTION;
    }

    let damage = apply_contact_damage(boss, vehicle, now, observer);
    debug!(
        "Boss contact with {}: penetration {:.2}, closing {:.2}",
        vehicle.id, penetration, closing_speed
    );

    Some(ContactOutcome {
        penetration,
        normal,
        impulse_applied,
        damage,
    })
}

fn apply_contact_damage(
    boss: &Boss,
    vehicle: &mut Vehicle,
    now: Duration,
    observer: &mut dyn DestructionObserver,
) -> Option<(f32, DamageOutcome)> {
    if vehicle.is_respawning || !vehicle.is_alive() {
        return None;
    }
    let cooldown = Duration::from_millis(BOSS_CONTACT_COOLDOWN_MS);
    if let Some(last) = vehicle.last_boss_collision_damage {
        if now.saturating_sub(last) < cooldown {
            return None;
        }
    }

    let amount = boss.contact_damage();
    vehicle.last_boss_collision_damage = Some(now);
    let outcome = vehicle.apply_damage(amount, now, observer);
    Some((amount, outcome))
}

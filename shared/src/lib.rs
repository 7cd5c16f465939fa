//! Types and tuning shared by the arena client and the relay server: the wire
//! protocol, the small vector math the simulation runs on, and the gameplay
//! constants both sides must agree on.

pub mod math;
pub mod protocol;

pub use math::{lerp_angle, wrap_angle, Aabb, Vec3};
pub use protocol::{
    decode_event, decode_intent, encode_event, encode_intent, BossSnapshot, ClientIntent,
    PickupSnapshot, PlayerSnapshot, ProtocolError, ServerEvent,
};

// Respawn escalation
pub const RESPAWN_BASE_DELAY_MS: u64 = 5000;
pub const RESPAWN_PER_DEATH_MS: u64 = 5000;

// Boss contact resolution
pub const BOSS_MASS: f32 = 4.0;
pub const ARMOR_MASS_FACTOR: f32 = 0.2;
pub const COLLISION_RADIUS_FACTOR: f32 = 0.3;
pub const PENETRATION_DEAD_ZONE: f32 = 0.2;
pub const POSITION_CORRECTION: f32 = 0.3;
pub const CONTACT_RESTITUTION: f32 = 0.05;
pub const CONTACT_IMPULSE_SCALE: f32 = 0.5;
pub const CONTACT_FRICTION: f32 = 0.6;
pub const BOSS_CONTACT_MULTIPLIER: f32 = 2.0;
pub const BOSS_ENRAGED_CONTACT_MULTIPLIER: f32 = 3.0;
pub const BOSS_CONTACT_COOLDOWN_MS: u64 = 1000;

// Boss tuning
pub const BOSS_BASE_HEALTH: f32 = 1000.0;
pub const BOSS_BASE_DAMAGE: f32 = 10.0;
pub const BOSS_HALF_EXTENTS: Vec3 = Vec3::new(6.0, 5.0, 6.0);
pub const BOSS_ENRAGE_FRACTION: f32 = 0.3;
pub const BOSS_POSITION_SMOOTHING: f32 = 0.1;
pub const BOSS_GRACE_PERIOD_MS: u64 = 10_000;
pub const BOSS_WARNING_PERIOD_MS: u64 = 5_000;
pub const BOSS_DEATH_EFFECT_MS: u64 = 2_000;
pub const BOSS_FREEZE_MS: u64 = 3_000;

// Reward pickups launched from a defeated boss
pub const REWARD_RADIAL_SPEED: f32 = 8.0;
pub const REWARD_UPWARD_SPEED: f32 = 12.0;
pub const PICKUP_GRAVITY: f32 = 30.0;
pub const PICKUP_LAND_HEIGHT: f32 = 1.2;
pub const PICKUP_RADIUS: f32 = 2.5;
pub const HEALTH_PICKUP_AMOUNT: f32 = 50.0;
pub const AMMO_PICKUP_AMOUNT: u32 = 20;

// Portals
pub const PORTAL_RADIUS: f32 = 5.0;
pub const PORTAL_COOLDOWN_MS: u64 = 5_000;
pub const PORTAL_NAVIGATION_DELAY_MS: u64 = 500;

// Easter egg
pub const EASTER_EGG_RADIUS: f32 = 3.0;

// Vehicle driving
pub const VEHICLE_GRAVITY: f32 = 30.0;
pub const VEHICLE_ACCELERATION: f32 = 40.0;
pub const VEHICLE_TURN_RATE: f32 = 2.5;
pub const VEHICLE_DRAG: f32 = 1.5;
pub const ARENA_HALF_SIZE: f32 = 150.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_zone_smaller_than_contact_radii() {
        let boss_radius = BOSS_HALF_EXTENTS.x * 2.0 * COLLISION_RADIUS_FACTOR;
        assert!(boss_radius > PENETRATION_DEAD_ZONE);
    }
}

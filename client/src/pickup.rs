//! Collectible pickups, including the locally spawned boss rewards that fly
//! out of a defeated boss before landing.

use crate::collaborators::VisualHandle;
use crate::vehicle::{Vehicle, WeaponKind};
use log::debug;
use shared::{
    PickupSnapshot, Vec3, AMMO_PICKUP_AMOUNT, HEALTH_PICKUP_AMOUNT, PICKUP_GRAVITY,
    PICKUP_LAND_HEIGHT, PICKUP_RADIUS, REWARD_RADIAL_SPEED, REWARD_UPWARD_SPEED,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    Weapon(WeaponKind),
    Ammo,
    Health,
    Special,
}

impl PickupKind {
    /// Parses `ammo`, `health`, `special` or `weapon:<name>`. Anything else
    /// becomes an ammo pickup.
    pub fn from_id(id: &str) -> Self {
        match id {
            "ammo" => PickupKind::Ammo,
            "health" => PickupKind::Health,
            "special" => PickupKind::Special,
            other => match other.strip_prefix("weapon:").and_then(WeaponKind::from_id) {
                Some(weapon) => PickupKind::Weapon(weapon),
                None => {
                    debug!("Unknown pickup type '{}', using ammo", other);
                    PickupKind::Ammo
                }
            },
        }
    }

    pub fn id(&self) -> String {
        match self {
            PickupKind::Weapon(weapon) => format!("weapon:{}", weapon.id()),
            PickupKind::Ammo => "ammo".to_string(),
            PickupKind::Health => "health".to_string(),
            PickupKind::Special => "special".to_string(),
        }
    }

    /// Applies this pickup's effect to a vehicle.
    pub fn apply_to(&self, vehicle: &mut Vehicle) {
        match self {
            PickupKind::Health => vehicle.heal(HEALTH_PICKUP_AMOUNT),
            PickupKind::Ammo => {
                let current = vehicle.arsenal.current;
                vehicle.arsenal.add_ammo(current, AMMO_PICKUP_AMOUNT);
            }
            PickupKind::Weapon(weapon) => {
                let amount = match weapon {
                    WeaponKind::Cannon => AMMO_PICKUP_AMOUNT,
                    WeaponKind::Missile => 5,
                    WeaponKind::Freeze => 3,
                };
                vehicle.arsenal.add_ammo(*weapon, amount);
                vehicle.arsenal.current = *weapon;
            }
            PickupKind::Special => {
                vehicle.heal(vehicle.max_health * 0.25);
                vehicle.arsenal.add_ammo(WeaponKind::Missile, 3);
                vehicle.arsenal.add_ammo(WeaponKind::Freeze, 2);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pickup {
    pub id: String,
    pub kind: PickupKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub is_flying: bool,
    /// Spawned locally from a boss defeat; the server never removes these.
    pub is_boss_pickup: bool,
    pub active: bool,
    pub visual: Option<VisualHandle>,
}

impl Pickup {
    pub fn new(id: &str, kind: PickupKind, position: Vec3) -> Self {
        Self {
            id: id.to_string(),
            kind,
            position,
            velocity: Vec3::ZERO,
            is_flying: false,
            is_boss_pickup: false,
            active: true,
            visual: None,
        }
    }

    pub fn from_snapshot(snapshot: &PickupSnapshot) -> Self {
        Pickup::new(
            &snapshot.id,
            PickupKind::from_id(&snapshot.kind),
            snapshot.position,
        )
    }

    /// Launches a boss reward with the given initial velocity.
    pub fn launched(id: &str, kind: PickupKind, origin: Vec3, velocity: Vec3) -> Self {
        let mut pickup = Pickup::new(id, kind, origin);
        pickup.velocity = velocity;
        pickup.is_flying = true;
        pickup.is_boss_pickup = true;
        pickup
    }

    /// Active → inactive. Returns whether this call made the transition.
    pub fn collect(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        true
    }

    pub fn can_be_collected_at(&self, position: &Vec3) -> bool {
        self.active && !self.is_flying && self.position.distance(position) < PICKUP_RADIUS
    }

    /// Applies gravity to a flying pickup until it drops below landing height.
    pub fn update(&mut self, dt: f32) {
        if !self.is_flying {
            return;
        }
        self.velocity.y -= PICKUP_GRAVITY * dt;
        self.position += self.velocity * dt;
        if self.position.y < PICKUP_LAND_HEIGHT && self.velocity.y < 0.0 {
            self.position.y = PICKUP_LAND_HEIGHT;
            self.velocity = Vec3::ZERO;
            self.is_flying = false;
        }
    }
}

/// Number of (health, special) rewards for a boss defeat with `player_count`
/// players present.
pub fn reward_counts(player_count: usize) -> (usize, usize) {
    let health = (player_count / 2).max(1);
    let special = ((player_count + 1) / 2).max(1);
    (health, special)
}

/// Builds the reward fan: pickup `i` of `n` leaves at angle `i·2π/n` with a
/// radial and an upward velocity.
pub fn spawn_boss_rewards(origin: Vec3, player_count: usize, batch: u64) -> Vec<Pickup> {
    let (health, special) = reward_counts(player_count);
    let total = health + special;

    (0..total)
        .map(|i| {
            let angle = i as f32 * std::f32::consts::TAU / total as f32;
            let velocity = Vec3::new(
                angle.cos() * REWARD_RADIAL_SPEED,
                REWARD_UPWARD_SPEED,
                angle.sin() * REWARD_RADIAL_SPEED,
            );
            let kind = if i < health {
                PickupKind::Health
            } else {
                PickupKind::Special
            };
            let id = format!("boss-reward-{}-{}", batch, i);
            Pickup::launched(&id, kind, origin, velocity)
        })
        .collect()
}

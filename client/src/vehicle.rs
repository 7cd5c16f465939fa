//! Vehicles: kinds, weapons, damage, and the arcade driving model used for the
//! local player.

use crate::collaborators::{GameMap, VisualHandle};
use crate::controls::ControlFlags;
use crate::projectile::ProjectileKind;
use log::debug;
use shared::{
    wrap_angle, Aabb, PlayerSnapshot, Vec3, VEHICLE_ACCELERATION, VEHICLE_DRAG, VEHICLE_GRAVITY,
    VEHICLE_TURN_RATE,
};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleKind {
    Sedan,
    Truck,
    Buggy,
    Monster,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleStats {
    pub max_health: f32,
    pub armor: f32,
    pub half_extents: Vec3,
    pub top_speed: f32,
}

impl VehicleKind {
    /// Parses a wire identifier. Unknown identifiers fall back to the sedan.
    pub fn from_id(id: &str) -> Self {
        match id {
            "sedan" => VehicleKind::Sedan,
            "truck" => VehicleKind::Truck,
            "buggy" => VehicleKind::Buggy,
            "monster" => VehicleKind::Monster,
            other => {
                debug!("Unknown vehicle type '{}', using sedan", other);
                VehicleKind::Sedan
            }
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            VehicleKind::Sedan => "sedan",
            VehicleKind::Truck => "truck",
            VehicleKind::Buggy => "buggy",
            VehicleKind::Monster => "monster",
        }
    }

    pub fn stats(&self) -> VehicleStats {
        match self {
            VehicleKind::Sedan => VehicleStats {
                max_health: 100.0,
                armor: 1.0,
                half_extents: Vec3::new(1.0, 0.75, 2.0),
                top_speed: 30.0,
            },
            VehicleKind::Truck => VehicleStats {
                max_health: 150.0,
                armor: 3.0,
                half_extents: Vec3::new(1.25, 1.0, 2.5),
                top_speed: 24.0,
            },
            VehicleKind::Buggy => VehicleStats {
                max_health: 80.0,
                armor: 0.0,
                half_extents: Vec3::new(0.9, 0.6, 1.6),
                top_speed: 36.0,
            },
            VehicleKind::Monster => VehicleStats {
                max_health: 200.0,
                armor: 4.0,
                half_extents: Vec3::new(1.75, 1.5, 2.75),
                top_speed: 28.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponKind {
    Cannon,
    Missile,
    Freeze,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 3] = [WeaponKind::Cannon, WeaponKind::Missile, WeaponKind::Freeze];

    pub fn projectile(&self) -> ProjectileKind {
        match self {
            WeaponKind::Cannon => ProjectileKind::Damage,
            WeaponKind::Missile => ProjectileKind::Homing,
            WeaponKind::Freeze => ProjectileKind::Freeze,
        }
    }

    pub fn cooldown(&self) -> Duration {
        match self {
            WeaponKind::Cannon => Duration::from_millis(200),
            WeaponKind::Missile => Duration::from_millis(800),
            WeaponKind::Freeze => Duration::from_millis(1500),
        }
    }

    pub fn starting_ammo(&self) -> u32 {
        match self {
            WeaponKind::Cannon => 50,
            WeaponKind::Missile => 5,
            WeaponKind::Freeze => 0,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            WeaponKind::Cannon => "cannon",
            WeaponKind::Missile => "missile",
            WeaponKind::Freeze => "freeze",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "cannon" => Some(WeaponKind::Cannon),
            "missile" => Some(WeaponKind::Missile),
            "freeze" => Some(WeaponKind::Freeze),
            _ => None,
        }
    }
}

/// Weapon set with per-weapon ammo and fire cooldowns.
#[derive(Debug, Clone)]
pub struct Arsenal {
    ammo: HashMap<WeaponKind, u32>,
    last_fired: HashMap<WeaponKind, Duration>,
    pub current: WeaponKind,
}

impl Arsenal {
    pub fn new() -> Self {
        let ammo = WeaponKind::ALL
            .iter()
            .map(|weapon| (*weapon, weapon.starting_ammo()))
            .collect();
        Self {
            ammo,
            last_fired: HashMap::new(),
            current: WeaponKind::Cannon,
        }
    }

    pub fn ammo(&self, weapon: WeaponKind) -> u32 {
        self.ammo.get(&weapon).copied().unwrap_or(0)
    }

    pub fn add_ammo(&mut self, weapon: WeaponKind, amount: u32) {
        let entry = self.ammo.entry(weapon).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Cycles to the next weapon that has ammo; stays put if none does.
    pub fn cycle(&mut self) -> WeaponKind {
        let start = WeaponKind::ALL
            .iter()
            .position(|w| *w == self.current)
            .unwrap_or(0);
        for step in 1..=WeaponKind::ALL.len() {
            let candidate = WeaponKind::ALL[(start + step) % WeaponKind::ALL.len()];
            if self.ammo(candidate) > 0 {
                self.current = candidate;
                break;
            }
        }
        self.current
    }

    /// Spends one round of the current weapon if it has ammo and is off cooldown.
    pub fn try_fire(&mut self, now: Duration) -> Option<WeaponKind> {
        let weapon = self.current;
        if self.ammo(weapon) == 0 {
            return None;
        }
        if let Some(last) = self.last_fired.get(&weapon) {
            if now.saturating_sub(*last) < weapon.cooldown() {
                return None;
            }
        }
        if let Some(rounds) = self.ammo.get_mut(&weapon) {
            *rounds -= 1;
        }
        self.last_fired.insert(weapon, now);
        Some(weapon)
    }
}

impl Default for Arsenal {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives a vehicle's alive → destroyed transition.
pub trait DestructionObserver {
    fn on_destroyed(&mut self, vehicle: &mut Vehicle, now: Duration);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Ignored,
    Damaged,
    Destroyed,
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: String,
    pub name: String,
    pub color: String,
    pub kind: VehicleKind,
    pub health: f32,
    pub max_health: f32,
    pub armor: f32,
    pub damage_level: u8,
    pub position: Vec3,
    /// Euler angles in radians; `y` is the heading.
    pub rotation: Vec3,
    pub velocity: Vec3,
    pub yaw_velocity: f32,
    pub arsenal: Arsenal,
    pub controls: ControlFlags,
    pub is_respawning: bool,
    pub last_boss_collision_damage: Option<Duration>,
    pub half_extents: Vec3,
    pub top_speed: f32,
    pub visual: Option<VisualHandle>,
}

impl Vehicle {
    pub fn new(id: &str, name: &str, kind: VehicleKind, position: Vec3) -> Self {
        let stats = kind.stats();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: "#ff3333".to_string(),
            kind,
            health: stats.max_health,
            max_health: stats.max_health,
            armor: stats.armor,
            damage_level: 0,
            position,
            rotation: Vec3::ZERO,
            velocity: Vec3::ZERO,
            yaw_velocity: 0.0,
            arsenal: Arsenal::new(),
            controls: ControlFlags::default(),
            is_respawning: false,
            last_boss_collision_damage: None,
            half_extents: stats.half_extents,
            top_speed: stats.top_speed,
            visual: None,
        }
    }

    /// Builds a server-driven vehicle from a snapshot.
    pub fn from_snapshot(snapshot: &PlayerSnapshot) -> Self {
        let kind = VehicleKind::from_id(&snapshot.vehicle);
        let mut vehicle = Vehicle::new(&snapshot.id, &snapshot.username, kind, snapshot.position);
        vehicle.color = snapshot.color.clone();
        vehicle.apply_snapshot(snapshot);
        vehicle
    }

    /// Overwrites transform and health from the server. No local prediction.
    pub fn apply_snapshot(&mut self, snapshot: &PlayerSnapshot) {
        self.position = snapshot.position;
        self.rotation = snapshot.rotation;
        self.velocity = snapshot.velocity;
        let kind = VehicleKind::from_id(&snapshot.vehicle);
        if kind != self.kind {
            self.transform_into(kind);
        }
        // After any kind change, so the new kind's max applies.
        self.health = snapshot.health.clamp(0.0, self.max_health);
        self.update_damage_level();
    }

    pub fn yaw(&self) -> f32 {
        self.rotation.y
    }

    /// Unit vector the vehicle is facing on the ground plane.
    pub fn heading(&self) -> Vec3 {
        Vec3::new(self.yaw().sin(), 0.0, self.yaw().cos())
    }

    pub fn speed(&self) -> f32 {
        self.velocity.horizontal_length()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extents)
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Applies damage and reports the destroyed transition to `observer`
    /// exactly once per life.
    pub fn apply_damage(
        &mut self,
        amount: f32,
        now: Duration,
        observer: &mut dyn DestructionObserver,
    ) -> DamageOutcome {
        if self.is_respawning || !self.is_alive() || amount <= 0.0 {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount).max(0.0);
        self.update_damage_level();
        if self.is_alive() {
            return DamageOutcome::Damaged;
        }
        debug!("Vehicle {} destroyed", self.id);
        observer.on_destroyed(self, now);
        DamageOutcome::Destroyed
    }

    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount).min(self.max_health);
        self.update_damage_level();
    }

    fn update_damage_level(&mut self) {
        let fraction = if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        };
        self.damage_level = if fraction > 0.75 {
            0
        } else if fraction > 0.5 {
            1
        } else if fraction > 0.25 {
            2
        } else {
            3
        };
    }

    pub fn clear_damage(&mut self) {
        self.health = self.max_health;
        self.damage_level = 0;
    }

    /// Switches to another kind, taking its stats and a full health bar.
    pub fn transform_into(&mut self, kind: VehicleKind) {
        let stats = kind.stats();
        self.kind = kind;
        self.max_health = stats.max_health;
        self.health = stats.max_health;
        self.armor = stats.armor;
        self.half_extents = stats.half_extents;
        self.top_speed = stats.top_speed;
        self.damage_level = 0;
    }

    /// Integrates one step of the driving model. Controls are ignored while
    /// respawning.
    pub fn drive(&mut self, dt: f32, map: &dyn GameMap) {
        let (throttle, steering) = if self.is_respawning {
            (0.0, 0.0)
        } else {
            (self.controls.throttle(), self.controls.steering())
        };

        self.yaw_velocity = steering * VEHICLE_TURN_RATE;
        self.rotation.y = wrap_angle(self.rotation.y + self.yaw_velocity * dt);

        let heading = self.heading();
        self.velocity += heading * (throttle * VEHICLE_ACCELERATION * dt);

        let drag = (1.0 - VEHICLE_DRAG * dt).max(0.0);
        self.velocity.x *= drag;
        self.velocity.z *= drag;

        let speed = self.speed();
        if speed > self.top_speed {
            let scale = self.top_speed / speed;
            self.velocity.x *= scale;
            self.velocity.z *= scale;
        }

        self.velocity.y -= VEHICLE_GRAVITY * dt;
        self.position += self.velocity * dt;

        let ground = self.half_extents.y;
        if self.position.y <= ground {
            self.position.y = ground;
            if self.velocity.y < 0.0 {
                self.velocity.y = 0.0;
            }
        }

        if !map.in_bounds(&self.position) {
            let clamped = map.clamp(self.position);
            if clamped.x != self.position.x {
                self.velocity.x = 0.0;
            }
            if clamped.z != self.position.z {
                self.velocity.z = 0.0;
            }
            self.position = clamped;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::ArenaMap;
    use assert_approx_eq::assert_approx_eq;

    #[derive(Default)]
    struct CountingObserver {
        calls: u32,
    }

    impl DestructionObserver for CountingObserver {
        fn on_destroyed(&mut self, _vehicle: &mut Vehicle, _now: Duration) {
            self.calls += 1;
        }
    }

    fn sedan() -> Vehicle {
        Vehicle::new("p1", "tester", VehicleKind::Sedan, Vec3::new(0.0, 0.75, 0.0))
    }

    #[test]
    fn test_unknown_vehicle_falls_back_to_sedan() {
        assert_eq!(VehicleKind::from_id("hovercraft"), VehicleKind::Sedan);
        assert_eq!(VehicleKind::from_id("truck"), VehicleKind::Truck);
    }

    #[test]
    fn test_destroyed_reported_once() {
        let mut vehicle = sedan();
        let mut observer = CountingObserver::default();
        let now = Duration::from_secs(1);

        assert_eq!(
            vehicle.apply_damage(60.0, now, &mut observer),
            DamageOutcome::Damaged
        );
        assert_eq!(
            vehicle.apply_damage(60.0, now, &mut observer),
            DamageOutcome::Destroyed
        );
        assert_eq!(
            vehicle.apply_damage(60.0, now, &mut observer),
            DamageOutcome::Ignored
        );
        assert_eq!(observer.calls, 1);
        assert_eq!(vehicle.health, 0.0);
        assert_eq!(vehicle.damage_level, 3);
    }

    #[test]
    fn test_respawning_vehicle_ignores_damage() {
        let mut vehicle = sedan();
        vehicle.is_respawning = true;
        let mut observer = CountingObserver::default();
        assert_eq!(
            vehicle.apply_damage(500.0, Duration::ZERO, &mut observer),
            DamageOutcome::Ignored
        );
        assert_eq!(vehicle.health, vehicle.max_health);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut vehicle = sedan();
        vehicle.health = 10.0;
        vehicle.heal(500.0);
        assert_eq!(vehicle.health, vehicle.max_health);
    }

    #[test]
    fn test_drive_forward_moves_along_heading() {
        let map = ArenaMap::default();
        let mut vehicle = sedan();
        vehicle.controls.forward = true;
        for _ in 0..30 {
            vehicle.drive(1.0 / 60.0, &map);
        }
        assert!(vehicle.position.z > 0.0);
        assert_approx_eq!(vehicle.position.x, 0.0, 1e-4);
        assert_approx_eq!(vehicle.position.y, vehicle.half_extents.y, 1e-4);
    }

    #[test]
    fn test_drive_ignores_controls_while_respawning() {
        let map = ArenaMap::default();
        let mut vehicle = sedan();
        vehicle.controls.forward = true;
        vehicle.controls.left = true;
        vehicle.is_respawning = true;
        vehicle.drive(1.0 / 60.0, &map);
        assert_eq!(vehicle.speed(), 0.0);
        assert_eq!(vehicle.yaw_velocity, 0.0);
    }

    #[test]
    fn test_drive_caps_top_speed() {
        let map = ArenaMap::default();
        let mut vehicle = sedan();
        vehicle.velocity = Vec3::new(0.0, 0.0, 500.0);
        vehicle.drive(1.0 / 60.0, &map);
        assert!(vehicle.speed() <= vehicle.top_speed + 1e-3);
    }

    #[test]
    fn test_drive_stops_at_arena_wall() {
        let map = ArenaMap::new(10.0);
        let mut vehicle = sedan();
        vehicle.position.x = 9.9;
        vehicle.velocity.x = 20.0;
        vehicle.drive(0.1, &map);
        assert_eq!(vehicle.position.x, 10.0);
        assert_eq!(vehicle.velocity.x, 0.0);
    }

    #[test]
    fn test_arsenal_respects_cooldown_and_ammo() {
        let mut arsenal = Arsenal::new();
        let t0 = Duration::from_secs(10);
        assert_eq!(arsenal.try_fire(t0), Some(WeaponKind::Cannon));
        assert_eq!(arsenal.try_fire(t0 + Duration::from_millis(50)), None);
        assert_eq!(
            arsenal.try_fire(t0 + Duration::from_millis(250)),
            Some(WeaponKind::Cannon)
        );
        assert_eq!(arsenal.ammo(WeaponKind::Cannon), 48);
    }

    #[test]
    fn test_arsenal_cycle_skips_empty_weapons() {
        let mut arsenal = Arsenal::new();
        assert_eq!(arsenal.cycle(), WeaponKind::Missile);
        // Freeze starts empty, so the cycle wraps back to the cannon.
        assert_eq!(arsenal.cycle(), WeaponKind::Cannon);
        arsenal.add_ammo(WeaponKind::Freeze, 2);
        arsenal.current = WeaponKind::Missile;
        assert_eq!(arsenal.cycle(), WeaponKind::Freeze);
    }

    #[test]
    fn test_transform_takes_new_stats() {
        let mut vehicle = sedan();
        vehicle.health = 5.0;
        vehicle.transform_into(VehicleKind::Monster);
        assert_eq!(vehicle.kind, VehicleKind::Monster);
        assert_eq!(vehicle.health, 200.0);
        assert_eq!(vehicle.armor, 4.0);
    }
}

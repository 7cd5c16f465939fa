//! Ports to the I/O collaborators the simulation drives but never inspects:
//! the visual factory, the HUD, and the map.

use crate::pickup::PickupKind;
use crate::portal::PortalKind;
use crate::projectile::ProjectileKind;
use crate::vehicle::{VehicleKind, WeaponKind};
use log::debug;
use shared::{Vec3, ARENA_HALF_SIZE};
use std::time::Duration;

/// Opaque renderable handle returned by a [`VisualFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisualKind {
    Vehicle(VehicleKind),
    Boss { level: u32 },
    Projectile(ProjectileKind),
    Pickup(PickupKind),
    Portal(PortalKind),
    EasterEgg,
}

/// Time-boxed cosmetic effects. They never feed back into gameplay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    BossDeath { position: Vec3 },
    BossFreeze { position: Vec3 },
    Transform { position: Vec3 },
}

pub trait VisualFactory {
    fn spawn(&mut self, kind: VisualKind) -> VisualHandle;
    fn despawn(&mut self, handle: VisualHandle);
    fn play_effect(&mut self, effect: Effect, duration: Duration);
}

/// Visual factory for headless runs; hands out handles and logs.
#[derive(Debug, Default)]
pub struct NullVisuals {
    next: u64,
    live: usize,
}

impl NullVisuals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live
    }
}

impl VisualFactory for NullVisuals {
    fn spawn(&mut self, kind: VisualKind) -> VisualHandle {
        self.next += 1;
        self.live += 1;
        debug!("spawn visual {} for {:?}", self.next, kind);
        VisualHandle(self.next)
    }

    fn despawn(&mut self, handle: VisualHandle) {
        self.live = self.live.saturating_sub(1);
        debug!("despawn visual {}", handle.0);
    }

    fn play_effect(&mut self, effect: Effect, duration: Duration) {
        debug!("effect {:?} for {:?}", effect, duration);
    }
}

/// Fire-and-forget notifications for the HUD.
#[derive(Debug, Clone, PartialEq)]
pub enum UiNotice {
    Health { current: f32, max: f32 },
    Weapon { weapon: WeaponKind, ammo: u32 },
    Destroyed { death_count: u32, delay_ms: u64 },
    RespawnCountdown { seconds_left: u64 },
    Respawned,
    BossHealth { health: f32, max: f32, level: u32 },
    BossEnraged,
    BossFrozen { duration_ms: u64 },
    BossDefeated { level: u32 },
    BossGracePeriod { duration_ms: u64 },
    BossWarning { duration_ms: u64 },
    BossRespawned { level: u32 },
    PickupCollected { kind: PickupKind },
    Transformed { vehicle: VehicleKind },
    PortalEntered { label: String },
}

pub trait UiSink {
    fn notify(&mut self, notice: &UiNotice);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub position: Vec3,
    pub yaw: f32,
}

pub trait GameMap {
    fn spawn_point(&self, index: usize) -> SpawnPoint;
    fn in_bounds(&self, position: &Vec3) -> bool;
    fn clamp(&self, position: Vec3) -> Vec3;
}

/// Flat square arena with spawn points on a ring facing the centre.
#[derive(Debug, Clone)]
pub struct ArenaMap {
    half_size: f32,
    spawn_ring: f32,
    spawn_slots: usize,
}

impl ArenaMap {
    pub fn new(half_size: f32) -> Self {
        Self {
            half_size,
            spawn_ring: half_size * 0.6,
            spawn_slots: 8,
        }
    }
}

impl Default for ArenaMap {
    fn default() -> Self {
        Self::new(ARENA_HALF_SIZE)
    }
}

impl GameMap for ArenaMap {
    fn spawn_point(&self, index: usize) -> SpawnPoint {
        let slot = index % self.spawn_slots;
        let angle = slot as f32 * std::f32::consts::TAU / self.spawn_slots as f32;
        let position = Vec3::new(
            angle.cos() * self.spawn_ring,
            1.0,
            angle.sin() * self.spawn_ring,
        );
        // Face the arena centre.
        let yaw = (-position.x).atan2(-position.z);
        SpawnPoint { position, yaw }
    }

    fn in_bounds(&self, position: &Vec3) -> bool {
        position.x.abs() <= self.half_size && position.z.abs() <= self.half_size
    }

    fn clamp(&self, position: Vec3) -> Vec3 {
        Vec3::new(
            position.x.clamp(-self.half_size, self.half_size),
            position.y,
            position.z.clamp(-self.half_size, self.half_size),
        )
    }
}

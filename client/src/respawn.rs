//! Local player death and respawn with a delay that grows with every death in
//! the session.

use crate::collaborators::GameMap;
use crate::controls::ControlFlags;
use crate::vehicle::{DestructionObserver, Vehicle};
use log::{debug, info};
use shared::{Vec3, RESPAWN_BASE_DELAY_MS, RESPAWN_PER_DEATH_MS};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    Follow,
    DeathView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnTick {
    /// No respawn in progress.
    Idle,
    Waiting,
    /// Whole seconds left changed since the previous tick.
    Countdown(u64),
    /// The vehicle was restored this tick.
    Completed,
}

#[derive(Debug)]
pub struct RespawnMachine {
    active: bool,
    completed: bool,
    started_at: Duration,
    total_delay: Duration,
    saved_controls: ControlFlags,
    death_count: u32,
    base_delay: Duration,
    per_death_delay: Duration,
    last_countdown: Option<u64>,
    pub camera: CameraMode,
}

impl RespawnMachine {
    pub fn new(base_delay: Duration, per_death_delay: Duration) -> Self {
        Self {
            active: false,
            completed: false,
            started_at: Duration::ZERO,
            total_delay: Duration::ZERO,
            saved_controls: ControlFlags::default(),
            death_count: 0,
            base_delay,
            per_death_delay,
            last_countdown: None,
            camera: CameraMode::Follow,
        }
    }

    /// `base + per_death × (n − 1)` for the n-th death of the session.
    pub fn delay_for(&self, death_count: u32) -> Duration {
        self.base_delay + self.per_death_delay * death_count.saturating_sub(1)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn death_count(&self) -> u32 {
        self.death_count
    }

    pub fn total_delay(&self) -> Duration {
        self.total_delay
    }

    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        if !self.active {
            return None;
        }
        let elapsed = now.saturating_sub(self.started_at);
        Some(self.total_delay.saturating_sub(elapsed))
    }

    /// Starts a new session; only an explicit new session clears the count.
    pub fn reset_session(&mut self) {
        self.death_count = 0;
    }

    /// Advances the countdown and restores the vehicle once the delay is over.
    pub fn tick(&mut self, now: Duration, vehicle: &mut Vehicle, map: &dyn GameMap) -> RespawnTick {
        let remaining = match self.remaining(now) {
            Some(remaining) => remaining,
            None => return RespawnTick::Idle,
        };

        if !remaining.is_zero() {
            let seconds = remaining.as_millis().div_ceil(1000) as u64;
            if self.last_countdown != Some(seconds) {
                self.last_countdown = Some(seconds);
                return RespawnTick::Countdown(seconds);
            }
            return RespawnTick::Waiting;
        }

        self.complete(vehicle, map);
        RespawnTick::Completed
    }

    fn complete(&mut self, vehicle: &mut Vehicle, map: &dyn GameMap) {
        let spawn = map.spawn_point(self.death_count as usize);

        vehicle.clear_damage();
        vehicle.position = spawn.position;
        vehicle.rotation = Vec3::new(0.0, spawn.yaw, 0.0);
        vehicle.velocity = Vec3::ZERO;
        vehicle.yaw_velocity = 0.0;
        vehicle.controls = self.saved_controls;
        vehicle.is_respawning = false;
        vehicle.last_boss_collision_damage = None;

        self.active = false;
        self.completed = true;
        self.last_countdown = None;
        self.camera = CameraMode::Follow;
        info!(
            "Vehicle {} respawned at ({:.1}, {:.1}, {:.1})",
            vehicle.id, spawn.position.x, spawn.position.y, spawn.position.z
        );
    }
}

impl Default for RespawnMachine {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(RESPAWN_BASE_DELAY_MS),
            Duration::from_millis(RESPAWN_PER_DEATH_MS),
        )
    }
}

impl DestructionObserver for RespawnMachine {
    fn on_destroyed(&mut self, vehicle: &mut Vehicle, now: Duration) {
        if self.active {
            debug!("Ignoring destruction of {} during respawn", vehicle.id);
            return;
        }

        self.death_count += 1;
        self.total_delay = self.delay_for(self.death_count);
        self.started_at = now;
        self.active = true;
        self.completed = false;
        self.last_countdown = None;
        self.camera = CameraMode::DeathView;

        self.saved_controls = vehicle.controls;
        vehicle.controls = ControlFlags::default();
        vehicle.is_respawning = true;

        info!(
            "Vehicle {} destroyed (death {}), respawning in {:?}",
            vehicle.id, self.death_count, self.total_delay
        );
    }
}

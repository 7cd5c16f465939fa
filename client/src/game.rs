//! The simulation context: one tick advances every component in a fixed order
//! and all I/O leaves through queues the driver drains afterwards.

use crate::boss::{self, AuthorityMode, Boss, BossLifecycle, HitResult, BOSS_SPAWN_POSITION};
use crate::collaborators::{Effect, GameMap, UiNotice, UiSink, VisualFactory, VisualKind};
use crate::collision::{self, ContactOutcome};
use crate::config::SimConfig;
use crate::controls::{ControlEdges, ControlFlags};
use crate::portal::{HandoffParams, Portal, PortalKind};
use crate::projectile::{step_projectiles, Projectile, ProjectileEnd, ProjectileKind, ProjectileOwner};
use crate::registry::{respawn_visual, EntityRegistry};
use crate::respawn::{CameraMode, RespawnMachine, RespawnTick};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::vehicle::{DamageOutcome, Vehicle, VehicleKind, WeaponKind};
use log::{debug, info, warn};
use shared::{ClientIntent, ServerEvent, Vec3, ARENA_HALF_SIZE, BOSS_FREEZE_MS};
use std::collections::VecDeque;
use std::time::Duration;
use url::Url;

/// Deferred work stored in the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledEvent {
    BossGraceEnded,
    BossWarningEnded,
    PortalNavigate(Url),
}

const OFFLINE_EASTER_EGG_POSITION: Vec3 = Vec3::new(40.0, 1.0, 40.0);
const MUZZLE_OFFSET: f32 = 0.5;
const ARRIVAL_PORTAL_DISTANCE: f32 = 8.0;

pub struct Simulation {
    pub(crate) config: SimConfig,
    pub(crate) registry: EntityRegistry,
    pub(crate) scheduler: Scheduler<ScheduledEvent>,
    pub(crate) respawn: RespawnMachine,
    pub(crate) boss_lifecycle: BossLifecycle,
    pub(crate) map: Box<dyn GameMap>,
    pub(crate) visuals: Box<dyn VisualFactory>,
    inbound: VecDeque<ServerEvent>,
    outbox: Vec<ClientIntent>,
    notices: Vec<UiNotice>,
    navigation: Option<Url>,
    portal_navigation: Option<TimerHandle>,
    portal_sourced: bool,
    edges: ControlEdges,
    now: Duration,
    last_position_sent: Option<Duration>,
    force_position_send: bool,
    connected: bool,
}

impl Simulation {
    pub fn new(
        config: SimConfig,
        local_id: &str,
        map: Box<dyn GameMap>,
        mut visuals: Box<dyn VisualFactory>,
    ) -> Self {
        let spawn = map.spawn_point(0);
        let mut local = Vehicle::new(local_id, &config.username, config.vehicle, spawn.position);
        local.color = config.color.clone();
        local.rotation.y = spawn.yaw;
        local.visual = Some(visuals.spawn(VisualKind::Vehicle(local.kind)));

        let mut sim = Self {
            registry: EntityRegistry::new(local),
            scheduler: Scheduler::new(),
            respawn: RespawnMachine::new(config.respawn_base_delay, config.respawn_per_death_delay),
            boss_lifecycle: BossLifecycle::new(config.boss_grace_period, config.boss_warning_period),
            map,
            visuals,
            inbound: VecDeque::new(),
            outbox: Vec::new(),
            notices: Vec::new(),
            navigation: None,
            portal_navigation: None,
            portal_sourced: false,
            edges: ControlEdges::new(),
            now: Duration::ZERO,
            last_position_sent: None,
            force_position_send: false,
            connected: true,
            config,
        };

        if let Some(target) = sim.config.exit_portal_url.clone() {
            let position = Vec3::new(0.0, 1.0, -ARENA_HALF_SIZE * 0.8);
            let portal = Portal::exit(position, &target, "Portal");
            sim.registry.add_portal(portal, sim.visuals.as_mut());
        }

        if sim.config.authority == AuthorityMode::Offline {
            sim.install_boss(Boss::for_level(1, BOSS_SPAWN_POSITION));
            sim.registry
                .show_easter_egg(true, OFFLINE_EASTER_EGG_POSITION, sim.visuals.as_mut());
        }

        let join = ClientIntent::Join {
            username: sim.config.username.clone(),
            vehicle: sim.config.vehicle.id().to_string(),
            color: sim.config.color.clone(),
        };
        sim.emit(join);
        sim
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn local_vehicle(&self) -> &Vehicle {
        &self.registry.local
    }

    pub fn boss(&self) -> Option<&Boss> {
        self.registry.boss.as_ref()
    }

    pub fn boss_lifecycle(&self) -> &BossLifecycle {
        &self.boss_lifecycle
    }

    pub fn respawn_state(&self) -> &RespawnMachine {
        &self.respawn
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.respawn.camera
    }

    pub fn is_portal_sourced(&self) -> bool {
        self.portal_sourced
    }

    /// An entry portal was taken and its delayed navigation has not fired yet.
    pub fn navigation_pending(&self) -> bool {
        self.portal_navigation
            .map_or(false, |handle| self.scheduler.is_pending(handle))
    }

    pub fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            info!("Simulation {}", if connected { "connected" } else { "disconnected" });
        }
        self.connected = connected;
    }

    /// Adopts the id the server assigned to the local player.
    pub fn set_local_id(&mut self, player_id: &str) {
        self.registry.local.id = player_id.to_string();
    }

    /// Latest input sample. Ignored while respawning; the controls held at
    /// death come back on completion and the next sample overrides them.
    pub fn set_controls(&mut self, controls: ControlFlags) {
        if self.registry.local.is_respawning {
            return;
        }
        self.registry.local.controls = controls;
    }

    /// Queues a server event for the start of the next tick.
    pub fn push_event(&mut self, event: ServerEvent) {
        self.inbound.push_back(event);
    }

    pub fn drain_intents(&mut self) -> Vec<ClientIntent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn drain_notices(&mut self) -> Vec<UiNotice> {
        std::mem::take(&mut self.notices)
    }

    pub fn flush_ui(&mut self, sink: &mut dyn UiSink) {
        for notice in self.notices.drain(..) {
            sink.notify(&notice);
        }
    }

    pub fn take_navigation(&mut self) -> Option<Url> {
        self.navigation.take()
    }

    /// Applies the state a player carried through a portal into this game.
    pub fn apply_arrival(&mut self, params: &HandoffParams) -> bool {
        if !params.portal {
            return false;
        }
        let local = &mut self.registry.local;
        if !params.username.is_empty() {
            local.name = params.username.clone();
        }
        if !params.color.is_empty() {
            local.color = params.color.clone();
        }
        if !params.vehicle.is_empty() {
            let kind = VehicleKind::from_id(&params.vehicle);
            if kind != local.kind {
                local.transform_into(kind);
                respawn_visual(local, self.visuals.as_mut());
            }
        }
        let spawn = self.map.spawn_point(0);
        local.position = spawn.position;
        local.velocity = params.velocity;
        local.rotation = params.rotation;

        if let Some(ref_url) = &params.ref_url {
            let behind = local.position - local.heading() * ARRIVAL_PORTAL_DISTANCE;
            let portal = Portal::entry(Vec3::new(behind.x, 1.0, behind.z), ref_url);
            info!("Arrived by portal from {}", ref_url);
            self.registry.add_portal(portal, self.visuals.as_mut());
        }
        self.force_position_send = true;
        true
    }

    /// Advances the simulation by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        self.now += dt;
        let dt_secs = dt.as_secs_f32();

        self.drain_inbound();
        self.run_scheduled();
        self.update_local_vehicle(dt_secs);
        self.resolve_collisions();
        self.update_weapons(dt_secs);
        self.update_respawn();
        self.update_pickups(dt_secs);
        self.update_easter_egg();
        self.update_portals(dt);
        self.send_position_update();
    }

    pub(crate) fn emit(&mut self, intent: ClientIntent) {
        if !self.connected {
            debug!("Dropping {} intent while disconnected", intent.name());
            return;
        }
        self.outbox.push(intent);
    }

    pub(crate) fn notify(&mut self, notice: UiNotice) {
        self.notices.push(notice);
    }

    fn drain_inbound(&mut self) {
        while let Some(event) = self.inbound.pop_front() {
            self.apply_server_event(event);
        }
    }

    fn run_scheduled(&mut self) {
        for event in self.scheduler.poll_due(self.now) {
            match event {
                ScheduledEvent::BossGraceEnded => {
                    if self.boss_lifecycle.on_grace_ended(self.now, &mut self.scheduler) {
                        info!("Boss grace period over, warning players");
                        let duration_ms = self.boss_lifecycle.warning_period.as_millis() as u64;
                        self.notify(UiNotice::BossWarning { duration_ms });
                    }
                }
                ScheduledEvent::BossWarningEnded => {
                    if !self.boss_lifecycle.on_warning_ended() {
                        continue;
                    }
                    if self.config.authority == AuthorityMode::Offline {
                        let level = self.boss_lifecycle.last_level + 1;
                        if self.install_boss(Boss::for_level(level, BOSS_SPAWN_POSITION)) {
                            self.emit(ClientIntent::BossRespawned { level });
                        }
                    } else {
                        info!("Boss warning over, awaiting server respawn");
                    }
                }
                ScheduledEvent::PortalNavigate(url) => {
                    self.portal_navigation = None;
                    info!("Navigating to {}", url);
                    self.navigation = Some(url);
                }
            }
        }
    }

    fn update_local_vehicle(&mut self, dt: f32) {
        let local = &mut self.registry.local;
        let switched = if self.edges.switch_pressed(&local.controls) && !local.is_respawning {
            let weapon = local.arsenal.cycle();
            Some((weapon, local.arsenal.ammo(weapon)))
        } else {
            None
        };
        local.drive(dt, self.map.as_ref());

        if let Some((weapon, ammo)) = switched {
            self.notify(UiNotice::Weapon { weapon, ammo });
        }
    }

    fn resolve_collisions(&mut self) {
        let boss = match self.registry.boss.as_ref() {
            Some(boss) => boss,
            None => return,
        };
        let outcome = collision::resolve_boss_contact(
            boss,
            &mut self.registry.local,
            self.now,
            &mut self.respawn,
        );
        if let Some(ContactOutcome {
            damage: Some((_, result)),
            ..
        }) = outcome
        {
            self.after_local_damage(result);
        }
    }

    fn after_local_damage(&mut self, result: DamageOutcome) {
        let local = &self.registry.local;
        let health = UiNotice::Health {
            current: local.health,
            max: local.max_health,
        };
        self.notify(health);
        if result == DamageOutcome::Destroyed {
            let death_count = self.respawn.death_count();
            let delay_ms = self.respawn.total_delay().as_millis() as u64;
            self.notify(UiNotice::Destroyed {
                death_count,
                delay_ms,
            });
        }
    }

    fn update_weapons(&mut self, dt: f32) {
        self.fire_local_weapon();

        let boss_bounds = self.registry.boss.as_ref().map(Boss::bounds);
        let retired = step_projectiles(&mut self.registry.projectiles, dt, boss_bounds);
        for retired in retired {
            if let Some(handle) = retired.projectile.visual {
                self.visuals.despawn(handle);
            }
            if retired.end == ProjectileEnd::Collided && retired.projectile.is_local() {
                self.resolve_local_hit(&retired.projectile);
            }
        }
    }

    fn fire_local_weapon(&mut self) {
        let local = &mut self.registry.local;
        if !local.controls.fire || local.is_respawning || !local.is_alive() {
            return;
        }
        let weapon = match local.arsenal.try_fire(self.now) {
            Some(weapon) => weapon,
            None => return,
        };
        let direction = local.heading();
        let origin = local.position + direction * (local.half_extents.z + MUZZLE_OFFSET);
        let ammo = local.arsenal.ammo(weapon);
        let kind = weapon.projectile();

        self.registry.spawn_projectile(
            kind,
            origin,
            direction,
            ProjectileOwner::Local,
            self.visuals.as_mut(),
        );
        self.emit(ClientIntent::FireProjectile {
            projectile: kind.id().to_string(),
            origin,
            direction,
        });
        self.notify(UiNotice::Weapon { weapon, ammo });
    }

    fn resolve_local_hit(&mut self, projectile: &Projectile) {
        if projectile.kind == ProjectileKind::Freeze {
            if let Some(boss) = self.registry.boss.as_ref() {
                self.visuals.play_effect(
                    Effect::BossFreeze {
                        position: boss.position,
                    },
                    Duration::from_millis(BOSS_FREEZE_MS),
                );
            }
            self.emit(ClientIntent::BossFreeze {
                duration_ms: BOSS_FREEZE_MS,
            });
            self.notify(UiNotice::BossFrozen {
                duration_ms: BOSS_FREEZE_MS,
            });
            return;
        }

        let mode = self.config.authority;
        let hit = self.registry.boss.as_mut().map(|boss| {
            let was_enraged = boss.is_enraged();
            let result = boss::apply_hit(boss, projectile.damage, mode);
            (result, !was_enraged && boss.is_enraged(), boss.max_health, boss.level)
        });

        self.emit(ClientIntent::BossHit {
            damage: projectile.damage,
            projectile: projectile.kind.id().to_string(),
        });

        let (result, enraged, max, level) = match hit {
            Some(hit) => hit,
            None => return,
        };
        match result {
            HitResult::Damaged { health } => {
                self.notify(UiNotice::BossHealth { health, max, level });
            }
            HitResult::Lethal => {
                self.notify(UiNotice::BossHealth {
                    health: 0.0,
                    max,
                    level,
                });
                if mode == AuthorityMode::Offline {
                    self.defeat_boss(true);
                } else {
                    info!("Boss health reached zero, awaiting server confirmation");
                }
            }
            HitResult::Ignored => {}
        }
        if enraged {
            self.notify(UiNotice::BossEnraged);
        }
    }

    /// Runs the defeat sequence once; `local` marks a defeat this client
    /// decided on its own, which the server must hear about.
    pub(crate) fn defeat_boss(&mut self, local: bool) -> bool {
        let report = boss::defeat_boss(
            &mut self.registry,
            &mut self.boss_lifecycle,
            &mut self.scheduler,
            self.visuals.as_mut(),
            self.now,
        );
        let report = match report {
            Some(report) => report,
            None => return false,
        };
        if local {
            self.emit(ClientIntent::BossDefeated);
        }
        let duration_ms = self.boss_lifecycle.grace_period.as_millis() as u64;
        self.notify(UiNotice::BossDefeated {
            level: report.level,
        });
        self.notify(UiNotice::BossGracePeriod { duration_ms });
        true
    }

    /// Installs a boss, or refreshes the existing one. Returns true on the
    /// transition back to alive.
    pub(crate) fn install_boss(&mut self, boss: Boss) -> bool {
        let respawned = boss::respawn_boss(
            &mut self.registry,
            &mut self.boss_lifecycle,
            &mut self.scheduler,
            self.visuals.as_mut(),
            boss,
        );
        if let Some(boss) = self.registry.boss.as_ref() {
            let notice = UiNotice::BossHealth {
                health: boss.health,
                max: boss.max_health,
                level: boss.level,
            };
            let level = boss.level;
            if respawned {
                self.notify(UiNotice::BossRespawned { level });
            }
            self.notify(notice);
        }
        respawned
    }

    fn update_respawn(&mut self) {
        let tick = self
            .respawn
            .tick(self.now, &mut self.registry.local, self.map.as_ref());
        match tick {
            RespawnTick::Countdown(seconds_left) => {
                self.notify(UiNotice::RespawnCountdown { seconds_left });
            }
            RespawnTick::Completed => {
                let local = &self.registry.local;
                let health = UiNotice::Health {
                    current: local.health,
                    max: local.max_health,
                };
                self.edges.reset();
                self.notify(UiNotice::Respawned);
                self.notify(health);
                self.force_position_send = true;
            }
            RespawnTick::Idle | RespawnTick::Waiting => {}
        }
    }

    fn update_pickups(&mut self, dt: f32) {
        for pickup in self.registry.pickups.iter_mut() {
            pickup.update(dt);
        }
        if self.registry.local.is_respawning {
            return;
        }

        let position = self.registry.local.position;
        let reachable: Vec<String> = self
            .registry
            .pickups
            .iter()
            .filter(|p| p.can_be_collected_at(&position))
            .map(|p| p.id.clone())
            .collect();

        for id in reachable {
            let pickup = match self.registry.pickups.iter_mut().find(|p| p.id == id) {
                Some(pickup) => pickup,
                None => continue,
            };
            if !pickup.collect() {
                continue;
            }
            let kind = pickup.kind;
            let local_only = pickup.is_boss_pickup;
            if let Some(handle) = pickup.visual.take() {
                self.visuals.despawn(handle);
            }

            kind.apply_to(&mut self.registry.local);
            debug!("Collected pickup {} ({})", id, kind.id());
            self.notify(UiNotice::PickupCollected { kind });
            let weapon = self.registry.local.arsenal.current;
            self.notify(UiNotice::Weapon {
                weapon,
                ammo: self.registry.local.arsenal.ammo(weapon),
            });

            if local_only {
                self.registry.remove_pickup(&id, self.visuals.as_mut());
            } else {
                self.emit(ClientIntent::CollectPickup { pickup_id: id });
            }
        }
    }

    fn update_easter_egg(&mut self) {
        let local = &self.registry.local;
        if local.is_respawning {
            return;
        }
        let position = local.position;
        if !self.registry.easter_egg.request_collect(&position) {
            return;
        }
        info!("Reached the easter egg");
        self.emit(ClientIntent::CollectEasterEgg);
        if self.config.authority == AuthorityMode::Offline {
            let player_id = self.registry.local.id.clone();
            self.push_event(ServerEvent::EasterEggCollected { player_id });
        }
    }

    fn update_portals(&mut self, dt: Duration) {
        for portal in self.registry.portals.iter_mut() {
            portal.update(dt);
        }
        if self.registry.local.is_respawning {
            return;
        }

        let position = self.registry.local.position;
        let entered = self
            .registry
            .portals
            .iter()
            .position(|portal| portal.check_collision(&position));
        let index = match entered {
            Some(index) => index,
            None => return,
        };

        let portal = &self.registry.portals[index];
        let (kind, target, label) = (portal.kind, portal.target_url.clone(), portal.label.clone());
        if kind == PortalKind::Entry && self.portal_sourced {
            debug!("Portal re-entry suppressed, navigation already pending");
            return;
        }
        self.registry.portals[index].activate();

        let params = HandoffParams::from_vehicle(
            &self.registry.local,
            Some(self.config.game_url.as_str()),
            self.config.avatar_url.as_deref(),
            self.config.team.as_deref(),
        );
        let url = match params.to_url(&target) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping portal navigation: {}", e);
                return;
            }
        };

        info!("Entered portal '{}'", label);
        self.notify(UiNotice::PortalEntered { label });
        match kind {
            PortalKind::Exit => self.navigation = Some(url),
            PortalKind::Entry => {
                self.portal_sourced = true;
                let due = self.now + self.config.portal_navigation_delay;
                self.portal_navigation =
                    Some(self.scheduler.schedule(due, ScheduledEvent::PortalNavigate(url)));
            }
        }
    }

    fn send_position_update(&mut self) {
        let due = self.force_position_send
            || self
                .last_position_sent
                .map_or(true, |sent| self.now.saturating_sub(sent) >= self.config.position_send_interval);
        if !due {
            return;
        }
        let local = &self.registry.local;
        let intent = ClientIntent::UpdatePosition {
            position: local.position,
            rotation: local.rotation,
            velocity: local.velocity,
            health: local.health,
        };
        self.emit(intent);
        self.last_position_sent = Some(self.now);
        self.force_position_send = false;
    }

    /// Current weapon and its ammo, for HUD refreshes.
    pub fn current_weapon(&self) -> (WeaponKind, u32) {
        let arsenal = &self.registry.local.arsenal;
        (arsenal.current, arsenal.ammo(arsenal.current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ArenaMap, NullVisuals};
    use crate::pickup::{Pickup, PickupKind};

    const FRAME: Duration = Duration::from_millis(16);

    fn simulation(config: SimConfig) -> Simulation {
        Simulation::new(
            config,
            "me",
            Box::new(ArenaMap::default()),
            Box::new(NullVisuals::new()),
        )
    }

    fn run_for(sim: &mut Simulation, total: Duration) {
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            sim.tick(FRAME);
            elapsed += FRAME;
        }
    }

    fn count<F: Fn(&ClientIntent) -> bool>(intents: &[ClientIntent], pred: F) -> usize {
        intents.iter().filter(|i| pred(i)).count()
    }

    #[test]
    fn test_new_session_queues_join() {
        let mut sim = simulation(SimConfig::default());
        let intents = sim.drain_intents();
        assert!(matches!(intents.first(), Some(ClientIntent::Join { .. })));
        assert!(sim.boss().is_none());
    }

    #[test]
    fn test_offline_session_starts_with_boss() {
        let sim = simulation(SimConfig::offline());
        assert_eq!(sim.boss().map(|b| b.level), Some(1));
        assert!(sim.registry().easter_egg.active);
    }

    #[test]
    fn test_position_updates_are_throttled() {
        let mut sim = simulation(SimConfig::default());
        sim.drain_intents();
        run_for(&mut sim, Duration::from_millis(500));
        let sent = count(&sim.drain_intents(), |i| {
            matches!(i, ClientIntent::UpdatePosition { .. })
        });
        // 50 ms interval over ~500 ms of 16 ms frames.
        assert!((8..=11).contains(&sent), "sent {}", sent);
    }

    #[test]
    fn test_disconnected_drops_intents() {
        let mut sim = simulation(SimConfig::default());
        sim.drain_intents();
        sim.set_connected(false);
        run_for(&mut sim, Duration::from_millis(200));
        assert!(sim.drain_intents().is_empty());
    }

    #[test]
    fn test_offline_defeat_runs_timer_chain_and_respawns_next_level() {
        let config = SimConfig {
            boss_grace_period: Duration::from_secs(1),
            boss_warning_period: Duration::from_millis(500),
            ..SimConfig::offline()
        };
        let mut sim = simulation(config);
        sim.drain_intents();
        assert!(sim.defeat_boss(true));
        assert!(!sim.defeat_boss(true));
        assert!(sim.boss().is_none());

        run_for(&mut sim, Duration::from_millis(1600));
        let boss = sim.boss().expect("boss respawned");
        assert_eq!(boss.level, 2);

        let intents = sim.drain_intents();
        assert_eq!(count(&intents, |i| *i == ClientIntent::BossDefeated), 1);
        assert_eq!(
            count(&intents, |i| *i == ClientIntent::BossRespawned { level: 2 }),
            1
        );
        let notices = sim.drain_notices();
        assert!(notices.contains(&UiNotice::BossWarning { duration_ms: 500 }));
        assert!(notices.contains(&UiNotice::BossRespawned { level: 2 }));
    }

    #[test]
    fn test_server_mode_waits_for_confirmation() {
        let config = SimConfig {
            boss_grace_period: Duration::from_millis(100),
            boss_warning_period: Duration::from_millis(100),
            ..SimConfig::default()
        };
        let mut sim = simulation(config);
        sim.install_boss(Boss::for_level(1, BOSS_SPAWN_POSITION));
        sim.defeat_boss(false);
        run_for(&mut sim, Duration::from_secs(2));
        assert!(sim.boss().is_none());
        assert!(sim.boss_lifecycle().awaiting_confirmation);
        assert_eq!(
            count(&sim.drain_intents(), |i| *i == ClientIntent::BossDefeated),
            0
        );
    }

    #[test]
    fn test_local_fire_spawns_projectile_and_intent() {
        let mut sim = simulation(SimConfig::default());
        sim.drain_intents();
        sim.set_controls(ControlFlags {
            fire: true,
            ..ControlFlags::default()
        });
        sim.tick(FRAME);
        assert_eq!(sim.registry().projectiles.len(), 1);
        let intents = sim.drain_intents();
        assert_eq!(
            count(&intents, |i| matches!(i, ClientIntent::FireProjectile { .. })),
            1
        );
    }

    #[test]
    fn test_boss_reward_collected_locally_without_intent() {
        let mut sim = simulation(SimConfig::default());
        let position = sim.local_vehicle().position;
        let mut reward =
            Pickup::launched("boss-reward-9-0", PickupKind::Health, position, Vec3::ZERO);
        reward.is_flying = false;
        sim.registry.insert_pickup(reward, sim.visuals.as_mut());
        sim.registry.local.health = 10.0;
        sim.drain_intents();

        sim.tick(FRAME);
        assert!(sim.registry().pickups.is_empty());
        assert_eq!(sim.local_vehicle().health, 60.0);
        let intents = sim.drain_intents();
        assert_eq!(
            count(&intents, |i| matches!(i, ClientIntent::CollectPickup { .. })),
            0
        );
    }

    #[test]
    fn test_server_pickup_collected_once_and_reported() {
        let mut sim = simulation(SimConfig::default());
        let position = sim.local_vehicle().position;
        sim.registry.insert_pickup(
            Pickup::new("server-1", PickupKind::Ammo, position),
            sim.visuals.as_mut(),
        );
        sim.drain_intents();
        run_for(&mut sim, Duration::from_millis(100));

        let intents = sim.drain_intents();
        assert_eq!(
            count(&intents, |i| *i
                == ClientIntent::CollectPickup {
                    pickup_id: "server-1".to_string()
                }),
            1
        );
        assert_eq!(sim.local_vehicle().arsenal.ammo(WeaponKind::Cannon), 70);
    }

    #[test]
    fn test_arrival_spawns_entry_portal_and_keeps_motion() {
        let mut sim = simulation(SimConfig::default());
        let params = HandoffParams {
            portal: true,
            username: "visitor".to_string(),
            vehicle: "buggy".to_string(),
            velocity: Vec3::new(0.0, 0.0, 12.0),
            rotation: Vec3::new(0.0, 0.5, 0.0),
            ref_url: Some("https://elsewhere.example.net/".to_string()),
            ..HandoffParams::default()
        };
        assert!(sim.apply_arrival(&params));
        assert_eq!(sim.local_vehicle().kind, VehicleKind::Buggy);
        assert_eq!(sim.local_vehicle().velocity.z, 12.0);
        assert_eq!(sim.registry().portals.len(), 1);
        assert_eq!(sim.registry().portals[0].kind, PortalKind::Entry);
        assert_eq!(sim.registry().portals[0].label, "Return to elsewhere.example.net");
    }

    #[test]
    fn test_arrival_without_portal_flag_is_ignored() {
        let mut sim = simulation(SimConfig::default());
        assert!(!sim.apply_arrival(&HandoffParams::default()));
        assert!(sim.registry().portals.is_empty());
    }

    #[test]
    fn test_entry_portal_navigates_after_delay_once() {
        let mut sim = simulation(SimConfig::default());
        let position = sim.local_vehicle().position;
        let mut portal = Portal::entry(position, "https://back.example.com/");
        portal.cooldown = Duration::ZERO;
        sim.registry.add_portal(portal, sim.visuals.as_mut());

        sim.tick(FRAME);
        assert!(sim.is_portal_sourced());
        assert!(sim.navigation_pending());
        assert!(sim.take_navigation().is_none());

        run_for(&mut sim, Duration::from_millis(600));
        let url = sim.take_navigation().expect("navigation after delay");
        assert_eq!(url.host_str(), Some("back.example.com"));
        assert!(sim.take_navigation().is_none());
    }

    #[test]
    fn test_malformed_entry_portal_skips_navigation() {
        let mut sim = simulation(SimConfig::default());
        let position = sim.local_vehicle().position;
        let mut portal = Portal::entry(position, "not a url");
        portal.cooldown = Duration::ZERO;
        sim.registry.add_portal(portal, sim.visuals.as_mut());
        run_for(&mut sim, Duration::from_secs(1));
        assert!(sim.take_navigation().is_none());
        assert!(!sim.is_portal_sourced());
    }
}

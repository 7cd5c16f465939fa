//! Applies inbound server events to the simulation.
//!
//! The local vehicle's movement is never corrected. Remote vehicles take
//! server values directly. Boss health, state and level are overwritten by
//! every authoritative value while its transform is smoothed. Echoes of
//! actions this client already applied must not apply them twice.

use crate::boss::{Boss, BossState};
use crate::collaborators::{Effect, UiNotice};
use crate::game::Simulation;
use crate::pickup::Pickup;
use crate::projectile::{ProjectileKind, ProjectileOwner};
use crate::registry::respawn_visual;
use crate::vehicle::VehicleKind;
use log::{debug, info};
use shared::{BossSnapshot, ClientIntent, PickupSnapshot, PlayerSnapshot, ServerEvent, Vec3};
use std::time::Duration;

const TRANSFORM_EFFECT_MS: u64 = 1500;

impl Simulation {
    pub(crate) fn apply_server_event(&mut self, event: ServerEvent) {
        debug!("Applying {}", event.name());
        match event {
            ServerEvent::Welcome { player_id } => {
                info!("Joined as {}", player_id);
                self.set_local_id(&player_id);
            }

            ServerEvent::GameStateSnapshot {
                players,
                boss,
                pickups,
            } => self.apply_snapshot(&players, boss, &pickups),

            ServerEvent::PlayerJoined { player } => {
                if !self.registry.is_local(&player.id) {
                    info!("Player {} joined", player.username);
                    self.registry.upsert_remote(&player, self.visuals.as_mut());
                }
            }

            ServerEvent::PlayerLeft { player_id } => {
                if self.registry.remove_remote(&player_id, self.visuals.as_mut()) {
                    info!("Player {} left", player_id);
                }
            }

            ServerEvent::PlayerMoved {
                player_id,
                position,
                rotation,
                velocity,
            } => self.move_remote(player_id, position, rotation, velocity),

            ServerEvent::InitializePickups { pickups } => {
                self.registry
                    .replace_server_pickups(&pickups, self.visuals.as_mut());
            }

            ServerEvent::PickupSpawned { pickup } => {
                self.registry
                    .insert_pickup(Pickup::from_snapshot(&pickup), self.visuals.as_mut());
            }

            ServerEvent::PickupCollected {
                pickup_id,
                player_id,
            } => {
                let exempt = match self.registry.pickup(&pickup_id) {
                    Some(pickup) => pickup.is_boss_pickup,
                    None => {
                        debug!("Pickup {} already gone", pickup_id);
                        return;
                    }
                };
                if exempt {
                    debug!("Ignoring server removal of boss reward {}", pickup_id);
                    return;
                }
                debug!("Pickup {} collected by {}", pickup_id, player_id);
                self.registry.remove_pickup(&pickup_id, self.visuals.as_mut());
            }

            ServerEvent::BossSpawned { boss } | ServerEvent::BossRespawned { boss } => {
                self.confirm_boss(&boss);
            }

            ServerEvent::BossStateChanged {
                state,
                health,
                max_health,
                level,
            } => {
                let state = BossState::from_id(&state);
                if state == BossState::Defeated {
                    self.defeat_boss(false);
                    return;
                }
                self.overwrite_boss(health, max_health, Some(state), Some(level));
            }

            ServerEvent::BossPositionUpdated { position, rotation } => {
                if let Some(boss) = self.registry.boss.as_mut() {
                    boss.smooth_toward(position, rotation);
                }
            }

            ServerEvent::BossHit {
                health,
                max_health,
                attacker_id,
            } => {
                debug!("Boss hit by {}, health {:.0}", attacker_id, health);
                self.overwrite_boss(health, max_health, None, None);
            }

            ServerEvent::BossDefeated { level } => {
                if self.defeat_boss(false) {
                    info!("Server confirmed boss level {} defeated", level);
                }
            }

            ServerEvent::EasterEggState { active, position } => {
                self.registry
                    .show_easter_egg(active, position, self.visuals.as_mut());
            }

            ServerEvent::EasterEggRespawned { position } => {
                self.registry
                    .show_easter_egg(true, position, self.visuals.as_mut());
            }

            ServerEvent::EasterEggCollected { player_id } => {
                self.registry.hide_easter_egg(self.visuals.as_mut());
                if self.registry.is_local(&player_id) {
                    self.transform_local(VehicleKind::Monster);
                }
            }

            ServerEvent::PlayerTransformed { player_id, vehicle } => {
                let kind = VehicleKind::from_id(&vehicle);
                if self.registry.is_local(&player_id) {
                    if self.registry.local.kind != kind {
                        self.transform_local(kind);
                    }
                    return;
                }
                if let Some(remote) = self.registry.remotes.get_mut(&player_id) {
                    if remote.kind != kind {
                        remote.transform_into(kind);
                        respawn_visual(remote, self.visuals.as_mut());
                        self.visuals.play_effect(
                            Effect::Transform {
                                position: remote.position,
                            },
                            Duration::from_millis(TRANSFORM_EFFECT_MS),
                        );
                    }
                }
            }

            ServerEvent::ProjectileFired {
                owner_id,
                projectile,
                origin,
                direction,
            } => {
                if self.registry.is_local(&owner_id) {
                    return;
                }
                self.registry.spawn_projectile(
                    ProjectileKind::from_id(&projectile),
                    origin,
                    direction,
                    ProjectileOwner::Remote(owner_id),
                    self.visuals.as_mut(),
                );
            }
        }
    }

    fn apply_snapshot(
        &mut self,
        players: &[PlayerSnapshot],
        boss: Option<BossSnapshot>,
        pickups: &[PickupSnapshot],
    ) {
        let mut present = Vec::with_capacity(players.len());
        for player in players {
            if self.registry.is_local(&player.id) {
                continue;
            }
            self.registry.upsert_remote(player, self.visuals.as_mut());
            present.push(player.id.as_str());
        }
        self.registry.retain_remotes(&present, self.visuals.as_mut());

        match boss {
            Some(snapshot) if BossState::from_id(&snapshot.state) == BossState::Defeated => {
                self.defeat_boss(false);
            }
            Some(snapshot) => {
                if self.registry.boss.is_some() {
                    self.overwrite_boss(
                        snapshot.health,
                        snapshot.max_health,
                        Some(BossState::from_id(&snapshot.state)),
                        Some(snapshot.level),
                    );
                    if let Some(boss) = self.registry.boss.as_mut() {
                        boss.smooth_toward(snapshot.position, snapshot.rotation);
                    }
                } else {
                    self.confirm_boss(&snapshot);
                }
            }
            None => self.drop_boss_quietly(),
        }

        self.registry
            .replace_server_pickups(pickups, self.visuals.as_mut());
    }

    /// The server has no boss. Removes ours without the defeat sequence,
    /// so no rewards, timers or defeat count.
    fn drop_boss_quietly(&mut self) {
        if let Some(boss) = self.registry.boss.take() {
            if let Some(handle) = boss.visual {
                self.visuals.despawn(handle);
            }
            debug!("Snapshot carries no boss, dropped level {} boss", boss.level);
        }
    }

    fn move_remote(&mut self, player_id: String, position: Vec3, rotation: Vec3, velocity: Vec3) {
        if self.registry.is_local(&player_id) {
            return;
        }
        if let Some(remote) = self.registry.remotes.get_mut(&player_id) {
            remote.position = position;
            remote.rotation = rotation;
            remote.velocity = velocity;
            return;
        }
        let snapshot = PlayerSnapshot {
            username: player_id.clone(),
            id: player_id,
            vehicle: VehicleKind::Sedan.id().to_string(),
            color: String::new(),
            position,
            rotation,
            velocity,
            health: VehicleKind::Sedan.stats().max_health,
        };
        self.registry.upsert_remote(&snapshot, self.visuals.as_mut());
    }

    /// A spawn or respawn confirmation. Early confirmations are accepted and
    /// cancel the pending grace and warning timers.
    fn confirm_boss(&mut self, snapshot: &BossSnapshot) {
        let boss = Boss::from_snapshot(snapshot);
        if self.registry.boss.is_none() && boss.state == BossState::Defeated {
            debug!("Ignoring spawn of an already defeated boss");
            return;
        }
        self.install_boss(boss);
    }

    fn overwrite_boss(
        &mut self,
        health: f32,
        max_health: f32,
        state: Option<BossState>,
        level: Option<u32>,
    ) {
        let boss = match self.registry.boss.as_mut() {
            Some(boss) => boss,
            None => {
                debug!("Boss update without a boss");
                return;
            }
        };
        let was_enraged = boss.is_enraged();
        let state = state.unwrap_or(boss.state);
        let level = level.unwrap_or(boss.level);
        boss.apply_authoritative(health, max_health, state, level);

        let notice = UiNotice::BossHealth {
            health: boss.health,
            max: boss.max_health,
            level: boss.level,
        };
        let enraged = !was_enraged && boss.is_enraged();
        self.notify(notice);
        if enraged {
            self.notify(UiNotice::BossEnraged);
        }
    }

    /// Turns the local vehicle into `kind` and tells the server.
    fn transform_local(&mut self, kind: VehicleKind) {
        let local = &mut self.registry.local;
        if local.kind == kind {
            return;
        }
        local.transform_into(kind);
        respawn_visual(local, self.visuals.as_mut());
        let position = local.position;
        let health = UiNotice::Health {
            current: local.health,
            max: local.max_health,
        };
        self.visuals.play_effect(
            Effect::Transform { position },
            Duration::from_millis(TRANSFORM_EFFECT_MS),
        );
        info!("Transformed into {}", kind.id());
        self.emit(ClientIntent::PlayerTransformed {
            vehicle: kind.id().to_string(),
        });
        self.notify(UiNotice::Transformed { vehicle: kind });
        self.notify(health);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boss::BOSS_SPAWN_POSITION;
    use crate::collaborators::{ArenaMap, NullVisuals};
    use crate::config::SimConfig;
    use crate::pickup::PickupKind;

    fn simulation() -> Simulation {
        Simulation::new(
            SimConfig::default(),
            "me",
            Box::new(ArenaMap::default()),
            Box::new(NullVisuals::new()),
        )
    }

    fn boss_snapshot(level: u32, health: f32, state: &str) -> BossSnapshot {
        let max_health = 1000.0 * (1.0 + 0.5 * (level - 1) as f32);
        BossSnapshot {
            health,
            max_health,
            damage: 10.0,
            state: state.to_string(),
            level,
            position: BOSS_SPAWN_POSITION,
            rotation: Vec3::ZERO,
        }
    }

    fn player(id: &str) -> PlayerSnapshot {
        PlayerSnapshot {
            id: id.to_string(),
            username: id.to_string(),
            vehicle: "sedan".to_string(),
            color: "#fff".to_string(),
            position: Vec3::new(10.0, 1.0, 10.0),
            rotation: Vec3::ZERO,
            velocity: Vec3::ZERO,
            health: 100.0,
        }
    }

    #[test]
    fn test_local_moves_are_never_corrected() {
        let mut sim = simulation();
        let before = sim.local_vehicle().position;
        sim.apply_server_event(ServerEvent::PlayerMoved {
            player_id: "me".to_string(),
            position: Vec3::new(-50.0, 1.0, -50.0),
            rotation: Vec3::ZERO,
            velocity: Vec3::ZERO,
        });
        assert_eq!(sim.local_vehicle().position, before);
        assert!(sim.registry().remotes.is_empty());
    }

    #[test]
    fn test_unknown_mover_is_created() {
        let mut sim = simulation();
        sim.apply_server_event(ServerEvent::PlayerMoved {
            player_id: "ghost".to_string(),
            position: Vec3::new(3.0, 1.0, 4.0),
            rotation: Vec3::ZERO,
            velocity: Vec3::ZERO,
        });
        assert_eq!(
            sim.registry().remotes["ghost"].position,
            Vec3::new(3.0, 1.0, 4.0)
        );
    }

    #[test]
    fn test_boss_hit_ack_overwrites_health() {
        let mut sim = simulation();
        sim.apply_server_event(ServerEvent::BossSpawned {
            boss: boss_snapshot(1, 1000.0, "normal"),
        });
        sim.apply_server_event(ServerEvent::BossHit {
            health: 700.0,
            max_health: 1000.0,
            attacker_id: "me".to_string(),
        });
        sim.apply_server_event(ServerEvent::BossHit {
            health: 700.0,
            max_health: 1000.0,
            attacker_id: "me".to_string(),
        });
        assert_eq!(sim.boss().map(|b| b.health), Some(700.0));
    }

    #[test]
    fn test_duplicate_defeat_is_noop() {
        let mut sim = simulation();
        sim.apply_server_event(ServerEvent::BossSpawned {
            boss: boss_snapshot(1, 1000.0, "normal"),
        });
        sim.apply_server_event(ServerEvent::BossDefeated { level: 1 });
        let pickups = sim.registry().pickups.len();
        let timers = sim.scheduler.len();

        sim.apply_server_event(ServerEvent::BossDefeated { level: 1 });
        sim.apply_server_event(ServerEvent::BossStateChanged {
            state: "defeated".to_string(),
            health: 0.0,
            max_health: 1000.0,
            level: 1,
        });
        assert_eq!(sim.registry().pickups.len(), pickups);
        assert_eq!(sim.scheduler.len(), timers);
        assert_eq!(sim.boss_lifecycle().defeat_count, 1);
    }

    #[test]
    fn test_early_respawn_cancels_timers() {
        let mut sim = simulation();
        sim.apply_server_event(ServerEvent::BossSpawned {
            boss: boss_snapshot(1, 1000.0, "normal"),
        });
        sim.apply_server_event(ServerEvent::BossDefeated { level: 1 });
        assert!(sim.boss_lifecycle().grace_pending());

        sim.apply_server_event(ServerEvent::BossRespawned {
            boss: boss_snapshot(2, 1500.0, "normal"),
        });
        assert!(!sim.boss_lifecycle().grace_pending());
        assert!(!sim.boss_lifecycle().respawning);
        assert_eq!(sim.boss().map(|b| b.level), Some(2));

        let respawns = sim
            .drain_notices()
            .iter()
            .filter(|n| matches!(n, UiNotice::BossRespawned { .. }))
            .count();
        sim.apply_server_event(ServerEvent::BossRespawned {
            boss: boss_snapshot(2, 1500.0, "normal"),
        });
        let again = sim
            .drain_notices()
            .iter()
            .filter(|n| matches!(n, UiNotice::BossRespawned { .. }))
            .count();
        assert_eq!(respawns, 2);
        assert_eq!(again, 0);
    }

    #[test]
    fn test_boss_position_is_smoothed() {
        let mut sim = simulation();
        sim.apply_server_event(ServerEvent::BossSpawned {
            boss: boss_snapshot(1, 1000.0, "normal"),
        });
        sim.apply_server_event(ServerEvent::BossPositionUpdated {
            position: BOSS_SPAWN_POSITION + Vec3::new(20.0, 0.0, 0.0),
            rotation: Vec3::ZERO,
        });
        let x = sim.boss().map(|b| b.position.x).unwrap_or_default();
        assert!((x - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_server_removal_skips_boss_rewards() {
        let mut sim = simulation();
        sim.registry.insert_pickup(
            Pickup::launched("boss-reward-1-0", PickupKind::Health, Vec3::ZERO, Vec3::ZERO),
            sim.visuals.as_mut(),
        );
        sim.apply_server_event(ServerEvent::PickupCollected {
            pickup_id: "boss-reward-1-0".to_string(),
            player_id: "p2".to_string(),
        });
        sim.apply_server_event(ServerEvent::InitializePickups {
            pickups: vec![PickupSnapshot {
                id: "s1".to_string(),
                kind: "health".to_string(),
                position: Vec3::ZERO,
            }],
        });
        assert_eq!(sim.registry().pickups.len(), 2);
        assert!(sim.registry().pickup("boss-reward-1-0").is_some());
    }

    #[test]
    fn test_snapshot_syncs_remotes_and_ignores_local() {
        let mut sim = simulation();
        sim.apply_server_event(ServerEvent::GameStateSnapshot {
            players: vec![player("me"), player("p2"), player("p3")],
            boss: Some(boss_snapshot(1, 800.0, "normal")),
            pickups: Vec::new(),
        });
        assert_eq!(sim.registry().remotes.len(), 2);
        assert_eq!(sim.boss().map(|b| b.health), Some(800.0));

        sim.apply_server_event(ServerEvent::GameStateSnapshot {
            players: vec![player("me"), player("p3")],
            boss: Some(boss_snapshot(1, 600.0, "enraged")),
            pickups: Vec::new(),
        });
        assert_eq!(sim.registry().remotes.len(), 1);
        assert!(sim.boss().map(|b| b.is_enraged()).unwrap_or(false));
        assert!(sim.drain_notices().contains(&UiNotice::BossEnraged));
    }

    #[test]
    fn test_snapshot_without_boss_drops_it_quietly() {
        let mut sim = simulation();
        sim.apply_server_event(ServerEvent::BossSpawned {
            boss: boss_snapshot(1, 1000.0, "normal"),
        });
        sim.drain_notices();
        let timers = sim.scheduler.len();

        sim.apply_server_event(ServerEvent::GameStateSnapshot {
            players: vec![player("me")],
            boss: None,
            pickups: Vec::new(),
        });
        assert!(sim.boss().is_none());
        assert!(sim.registry().pickups.is_empty());
        assert_eq!(sim.scheduler.len(), timers);
        assert_eq!(sim.boss_lifecycle().defeat_count, 0);
        assert!(!sim.boss_lifecycle().grace_pending());
        assert!(!sim
            .drain_notices()
            .iter()
            .any(|n| matches!(n, UiNotice::BossDefeated { .. })));
    }

    #[test]
    fn test_local_easter_egg_transforms_once() {
        let mut sim = simulation();
        sim.apply_server_event(ServerEvent::EasterEggState {
            active: true,
            position: Vec3::ZERO,
        });
        sim.drain_intents();
        sim.apply_server_event(ServerEvent::EasterEggCollected {
            player_id: "me".to_string(),
        });
        sim.apply_server_event(ServerEvent::PlayerTransformed {
            player_id: "me".to_string(),
            vehicle: "monster".to_string(),
        });
        assert_eq!(sim.local_vehicle().kind, VehicleKind::Monster);
        assert!(!sim.registry().easter_egg.active);
        let transforms = sim
            .drain_intents()
            .into_iter()
            .filter(|i| matches!(i, ClientIntent::PlayerTransformed { .. }))
            .count();
        assert_eq!(transforms, 1);
    }

    #[test]
    fn test_remote_projectiles_only_from_others() {
        let mut sim = simulation();
        sim.apply_server_event(ServerEvent::ProjectileFired {
            owner_id: "me".to_string(),
            projectile: "damage".to_string(),
            origin: Vec3::ZERO,
            direction: Vec3::X,
        });
        sim.apply_server_event(ServerEvent::ProjectileFired {
            owner_id: "p2".to_string(),
            projectile: "homing".to_string(),
            origin: Vec3::ZERO,
            direction: Vec3::X,
        });
        assert_eq!(sim.registry().projectiles.len(), 1);
        assert!(!sim.registry().projectiles[0].is_local());
    }

    #[test]
    fn test_welcome_sets_local_id() {
        let mut sim = simulation();
        sim.apply_server_event(ServerEvent::Welcome {
            player_id: "abc".to_string(),
        });
        assert_eq!(sim.registry().local_id(), "abc");
    }
}

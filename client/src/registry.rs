//! Owner of every live entity. The simulation and the reconciliation layer
//! mutate entities only through this registry, so visual handles are spawned
//! and released in exactly one place.

use crate::boss::Boss;
use crate::collaborators::{VisualFactory, VisualKind};
use crate::easter_egg::EasterEgg;
use crate::pickup::Pickup;
use crate::portal::Portal;
use crate::projectile::{Projectile, ProjectileKind, ProjectileOwner};
use crate::vehicle::Vehicle;
use log::debug;
use shared::{PickupSnapshot, PlayerSnapshot, Vec3};
use std::collections::HashMap;

pub struct EntityRegistry {
    pub local: Vehicle,
    pub remotes: HashMap<String, Vehicle>,
    pub boss: Option<Boss>,
    pub projectiles: Vec<Projectile>,
    pub pickups: Vec<Pickup>,
    pub portals: Vec<Portal>,
    pub easter_egg: EasterEgg,
    next_projectile_id: u64,
}

impl EntityRegistry {
    pub fn new(local: Vehicle) -> Self {
        Self {
            local,
            remotes: HashMap::new(),
            boss: None,
            projectiles: Vec::new(),
            pickups: Vec::new(),
            portals: Vec::new(),
            easter_egg: EasterEgg::default(),
            next_projectile_id: 1,
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local.id
    }

    pub fn is_local(&self, player_id: &str) -> bool {
        self.local.id == player_id
    }

    /// Local player plus every known remote player.
    pub fn player_count(&self) -> usize {
        1 + self.remotes.len()
    }

    /// Creates or updates a remote vehicle. Returns true when it was new.
    pub fn upsert_remote(&mut self, snapshot: &PlayerSnapshot, visuals: &mut dyn VisualFactory) -> bool {
        if let Some(vehicle) = self.remotes.get_mut(&snapshot.id) {
            let old_kind = vehicle.kind;
            vehicle.apply_snapshot(snapshot);
            if vehicle.kind != old_kind {
                respawn_visual(vehicle, visuals);
            }
            return false;
        }
        let mut vehicle = Vehicle::from_snapshot(snapshot);
        vehicle.visual = Some(visuals.spawn(VisualKind::Vehicle(vehicle.kind)));
        debug!("Remote player {} ({}) added", vehicle.id, vehicle.name);
        self.remotes.insert(snapshot.id.clone(), vehicle);
        true
    }

    pub fn remove_remote(&mut self, player_id: &str, visuals: &mut dyn VisualFactory) -> bool {
        match self.remotes.remove(player_id) {
            Some(vehicle) => {
                if let Some(handle) = vehicle.visual {
                    visuals.despawn(handle);
                }
                true
            }
            None => false,
        }
    }

    /// Drops remote players missing from `keep`.
    pub fn retain_remotes(&mut self, keep: &[&str], visuals: &mut dyn VisualFactory) {
        let stale: Vec<String> = self
            .remotes
            .keys()
            .filter(|id| !keep.contains(&id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.remove_remote(&id, visuals);
        }
    }

    pub fn spawn_projectile(
        &mut self,
        kind: ProjectileKind,
        origin: Vec3,
        direction: Vec3,
        owner: ProjectileOwner,
        visuals: &mut dyn VisualFactory,
    ) -> u64 {
        let id = self.next_projectile_id;
        self.next_projectile_id += 1;
        let mut projectile = Projectile::new(id, kind, origin, direction, owner);
        projectile.visual = Some(visuals.spawn(VisualKind::Projectile(kind)));
        self.projectiles.push(projectile);
        id
    }

    pub fn pickup(&self, pickup_id: &str) -> Option<&Pickup> {
        self.pickups.iter().find(|p| p.id == pickup_id)
    }

    pub fn insert_pickup(&mut self, mut pickup: Pickup, visuals: &mut dyn VisualFactory) {
        if self.pickups.iter().any(|p| p.id == pickup.id) {
            debug!("Pickup {} already present", pickup.id);
            return;
        }
        pickup.visual = Some(visuals.spawn(VisualKind::Pickup(pickup.kind)));
        self.pickups.push(pickup);
    }

    pub fn remove_pickup(&mut self, pickup_id: &str, visuals: &mut dyn VisualFactory) -> Option<Pickup> {
        let index = self.pickups.iter().position(|p| p.id == pickup_id)?;
        let pickup = self.pickups.remove(index);
        if let Some(handle) = pickup.visual {
            visuals.despawn(handle);
        }
        Some(pickup)
    }

    /// Replaces every server pickup with `snapshots`. Boss rewards stay.
    pub fn replace_server_pickups(&mut self, snapshots: &[PickupSnapshot], visuals: &mut dyn VisualFactory) {
        let server_ids: Vec<String> = self
            .pickups
            .iter()
            .filter(|p| !p.is_boss_pickup)
            .map(|p| p.id.clone())
            .collect();
        for id in server_ids {
            self.remove_pickup(&id, visuals);
        }
        for snapshot in snapshots {
            self.insert_pickup(Pickup::from_snapshot(snapshot), visuals);
        }
    }

    pub fn add_portal(&mut self, mut portal: Portal, visuals: &mut dyn VisualFactory) {
        portal.visual = Some(visuals.spawn(VisualKind::Portal(portal.kind)));
        self.portals.push(portal);
    }

    pub fn show_easter_egg(&mut self, active: bool, position: Vec3, visuals: &mut dyn VisualFactory) {
        self.easter_egg.set_state(active, position);
        match (active, self.easter_egg.visual) {
            (true, None) => self.easter_egg.visual = Some(visuals.spawn(VisualKind::EasterEgg)),
            (false, Some(handle)) => {
                visuals.despawn(handle);
                self.easter_egg.visual = None;
            }
            _ => {}
        }
    }

    pub fn hide_easter_egg(&mut self, visuals: &mut dyn VisualFactory) -> bool {
        let was_active = self.easter_egg.mark_collected();
        if let Some(handle) = self.easter_egg.visual.take() {
            visuals.despawn(handle);
        }
        was_active
    }
}

/// Swaps the visual after a vehicle changed kind.
pub fn respawn_visual(vehicle: &mut Vehicle, visuals: &mut dyn VisualFactory) {
    if let Some(handle) = vehicle.visual.take() {
        visuals.despawn(handle);
    }
    vehicle.visual = Some(visuals.spawn(VisualKind::Vehicle(vehicle.kind)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::NullVisuals;
    use crate::pickup::PickupKind;
    use crate::vehicle::VehicleKind;

    fn registry() -> EntityRegistry {
        EntityRegistry::new(Vehicle::new("me", "local", VehicleKind::Sedan, Vec3::ZERO))
    }

    fn snapshot(id: &str, vehicle: &str) -> PlayerSnapshot {
        PlayerSnapshot {
            id: id.to_string(),
            username: format!("user-{}", id),
            vehicle: vehicle.to_string(),
            color: "#0000ff".to_string(),
            position: Vec3::new(1.0, 1.0, 1.0),
            rotation: Vec3::ZERO,
            velocity: Vec3::ZERO,
            health: 100.0,
        }
    }

    fn pickup_snapshot(id: &str) -> PickupSnapshot {
        PickupSnapshot {
            id: id.to_string(),
            kind: "ammo".to_string(),
            position: Vec3::new(5.0, 1.2, 5.0),
        }
    }

    #[test]
    fn test_upsert_remote_adds_then_updates() {
        let mut registry = registry();
        let mut visuals = NullVisuals::new();
        assert!(registry.upsert_remote(&snapshot("p2", "truck"), &mut visuals));
        assert!(!registry.upsert_remote(&snapshot("p2", "truck"), &mut visuals));
        assert_eq!(registry.player_count(), 2);
        assert_eq!(visuals.live_count(), 1);
    }

    #[test]
    fn test_remote_kind_change_swaps_visual() {
        let mut registry = registry();
        let mut visuals = NullVisuals::new();
        registry.upsert_remote(&snapshot("p2", "sedan"), &mut visuals);
        let before = registry.remotes["p2"].visual;
        registry.upsert_remote(&snapshot("p2", "monster"), &mut visuals);
        assert_ne!(registry.remotes["p2"].visual, before);
        assert_eq!(registry.remotes["p2"].kind, VehicleKind::Monster);
        assert_eq!(visuals.live_count(), 1);
    }

    #[test]
    fn test_remote_kind_change_keeps_server_health() {
        let mut registry = registry();
        let mut visuals = NullVisuals::new();
        registry.upsert_remote(&snapshot("p2", "sedan"), &mut visuals);

        let mut update = snapshot("p2", "monster");
        update.health = 180.0;
        registry.upsert_remote(&update, &mut visuals);

        let remote = &registry.remotes["p2"];
        assert_eq!(remote.kind, VehicleKind::Monster);
        assert_eq!(remote.max_health, 200.0);
        assert_eq!(remote.health, 180.0);
    }

    #[test]
    fn test_retain_remotes_drops_missing_players() {
        let mut registry = registry();
        let mut visuals = NullVisuals::new();
        registry.upsert_remote(&snapshot("p2", "sedan"), &mut visuals);
        registry.upsert_remote(&snapshot("p3", "sedan"), &mut visuals);
        registry.retain_remotes(&["p3"], &mut visuals);
        assert!(registry.remotes.contains_key("p3"));
        assert!(!registry.remotes.contains_key("p2"));
        assert_eq!(visuals.live_count(), 1);
    }

    #[test]
    fn test_replacing_server_pickups_keeps_boss_rewards() {
        let mut registry = registry();
        let mut visuals = NullVisuals::new();
        registry.insert_pickup(
            Pickup::launched("boss-reward-1-0", PickupKind::Health, Vec3::ZERO, Vec3::ZERO),
            &mut visuals,
        );
        registry.replace_server_pickups(&[pickup_snapshot("a"), pickup_snapshot("b")], &mut visuals);
        registry.replace_server_pickups(&[pickup_snapshot("c")], &mut visuals);

        let ids: Vec<&str> = registry.pickups.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["boss-reward-1-0", "c"]);
        assert_eq!(visuals.live_count(), 2);
    }

    #[test]
    fn test_duplicate_pickup_insert_is_ignored() {
        let mut registry = registry();
        let mut visuals = NullVisuals::new();
        registry.insert_pickup(Pickup::from_snapshot(&pickup_snapshot("a")), &mut visuals);
        registry.insert_pickup(Pickup::from_snapshot(&pickup_snapshot("a")), &mut visuals);
        assert_eq!(registry.pickups.len(), 1);
    }

    #[test]
    fn test_projectile_ids_are_unique() {
        let mut registry = registry();
        let mut visuals = NullVisuals::new();
        let a = registry.spawn_projectile(
            ProjectileKind::Damage,
            Vec3::ZERO,
            Vec3::X,
            ProjectileOwner::Local,
            &mut visuals,
        );
        let b = registry.spawn_projectile(
            ProjectileKind::Freeze,
            Vec3::ZERO,
            Vec3::X,
            ProjectileOwner::Local,
            &mut visuals,
        );
        assert_ne!(a, b);
        assert_eq!(registry.projectiles.len(), 2);
    }
}

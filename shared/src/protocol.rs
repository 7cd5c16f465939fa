//! Wire protocol between the game client and the relay server.
//!
//! Every message is one bincode-encoded datagram. Type identifiers (vehicle,
//! pickup, projectile, boss state) travel as plain strings so that a client
//! meeting an identifier it does not know can fall back to a default instead
//! of failing to decode the whole message.

use crate::math::Vec3;
use serde::{Deserialize, Serialize};

/// Intents sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientIntent {
    Join {
        username: String,
        vehicle: String,
        color: String,
    },
    UpdatePosition {
        position: Vec3,
        rotation: Vec3,
        velocity: Vec3,
        health: f32,
    },
    CollectPickup {
        pickup_id: String,
    },
    BossHit {
        damage: f32,
        projectile: String,
    },
    BossFreeze {
        duration_ms: u64,
    },
    BossDefeated,
    BossRespawned {
        level: u32,
    },
    CollectEasterEgg,
    PlayerTransformed {
        vehicle: String,
    },
    FireProjectile {
        projectile: String,
        origin: Vec3,
        direction: Vec3,
    },
}

impl ClientIntent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientIntent::Join { .. } => "join",
            ClientIntent::UpdatePosition { .. } => "update-position",
            ClientIntent::CollectPickup { .. } => "collect-pickup",
            ClientIntent::BossHit { .. } => "boss-hit",
            ClientIntent::BossFreeze { .. } => "boss-freeze",
            ClientIntent::BossDefeated => "boss-defeated",
            ClientIntent::BossRespawned { .. } => "boss-respawned",
            ClientIntent::CollectEasterEgg => "collect-easter-egg",
            ClientIntent::PlayerTransformed { .. } => "player-transformed",
            ClientIntent::FireProjectile { .. } => "fire-projectile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub username: String,
    pub vehicle: String,
    pub color: String,
    pub position: Vec3,
    pub rotation: Vec3,
    pub velocity: Vec3,
    pub health: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossSnapshot {
    pub health: f32,
    pub max_health: f32,
    pub damage: f32,
    pub state: String,
    pub level: u32,
    pub position: Vec3,
    pub rotation: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupSnapshot {
    pub id: String,
    pub kind: String,
    pub position: Vec3,
}

/// Events pushed from the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerEvent {
    Welcome {
        player_id: String,
    },
    GameStateSnapshot {
        players: Vec<PlayerSnapshot>,
        boss: Option<BossSnapshot>,
        pickups: Vec<PickupSnapshot>,
    },
    PlayerJoined {
        player: PlayerSnapshot,
    },
    PlayerLeft {
        player_id: String,
    },
    PlayerMoved {
        player_id: String,
        position: Vec3,
        rotation: Vec3,
        velocity: Vec3,
    },
    InitializePickups {
        pickups: Vec<PickupSnapshot>,
    },
    PickupSpawned {
        pickup: PickupSnapshot,
    },
    PickupCollected {
        pickup_id: String,
        player_id: String,
    },
    BossSpawned {
        boss: BossSnapshot,
    },
    BossStateChanged {
        state: String,
        health: f32,
        max_health: f32,
        level: u32,
    },
    BossPositionUpdated {
        position: Vec3,
        rotation: Vec3,
    },
    BossHit {
        health: f32,
        max_health: f32,
        attacker_id: String,
    },
    BossDefeated {
        level: u32,
    },
    BossRespawned {
        boss: BossSnapshot,
    },
    EasterEggState {
        active: bool,
        position: Vec3,
    },
    EasterEggCollected {
        player_id: String,
    },
    EasterEggRespawned {
        position: Vec3,
    },
    PlayerTransformed {
        player_id: String,
        vehicle: String,
    },
    ProjectileFired {
        owner_id: String,
        projectile: String,
        origin: Vec3,
        direction: Vec3,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("encode error: {0}")]
    Encode(bincode::Error),
    #[error("decode error: {0}")]
    Decode(bincode::Error),
    #[error("invalid {event} message: bad field `{field}`")]
    Invalid {
        event: &'static str,
        field: &'static str,
    },
}

fn check(ok: bool, event: &'static str, field: &'static str) -> Result<(), ProtocolError> {
    if ok {
        Ok(())
    } else {
        Err(ProtocolError::Invalid { event, field })
    }
}

impl PlayerSnapshot {
    fn validate(&self, event: &'static str) -> Result<(), ProtocolError> {
        check(!self.id.is_empty(), event, "id")?;
        check(self.position.is_finite(), event, "position")?;
        check(self.rotation.is_finite(), event, "rotation")?;
        check(self.velocity.is_finite(), event, "velocity")?;
        check(self.health.is_finite(), event, "health")
    }
}

impl BossSnapshot {
    fn validate(&self, event: &'static str) -> Result<(), ProtocolError> {
        check(self.max_health.is_finite() && self.max_health > 0.0, event, "max_health")?;
        check(self.health.is_finite() && self.health >= 0.0, event, "health")?;
        check(self.damage.is_finite() && self.damage >= 0.0, event, "damage")?;
        check(self.position.is_finite(), event, "position")?;
        check(self.rotation.is_finite(), event, "rotation")
    }
}

impl PickupSnapshot {
    fn validate(&self, event: &'static str) -> Result<(), ProtocolError> {
        check(!self.id.is_empty(), event, "id")?;
        check(self.position.is_finite(), event, "position")
    }
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Welcome { .. } => "welcome",
            ServerEvent::GameStateSnapshot { .. } => "game-state-snapshot",
            ServerEvent::PlayerJoined { .. } => "player-joined",
            ServerEvent::PlayerLeft { .. } => "player-left",
            ServerEvent::PlayerMoved { .. } => "player-moved",
            ServerEvent::InitializePickups { .. } => "initialize-pickups",
            ServerEvent::PickupSpawned { .. } => "pickup-spawned",
            ServerEvent::PickupCollected { .. } => "pickup-collected",
            ServerEvent::BossSpawned { .. } => "boss-spawned",
            ServerEvent::BossStateChanged { .. } => "boss-state-changed",
            ServerEvent::BossPositionUpdated { .. } => "boss-position-updated",
            ServerEvent::BossHit { .. } => "boss-hit",
            ServerEvent::BossDefeated { .. } => "boss-defeated",
            ServerEvent::BossRespawned { .. } => "boss-respawned",
            ServerEvent::EasterEggState { .. } => "easter-egg-state",
            ServerEvent::EasterEggCollected { .. } => "easter-egg-collected",
            ServerEvent::EasterEggRespawned { .. } => "easter-egg-respawned",
            ServerEvent::PlayerTransformed { .. } => "player-transformed",
            ServerEvent::ProjectileFired { .. } => "projectile-fired",
        }
    }

    /// Checks required fields before the event is allowed into the simulation.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let event = self.name();
        match self {
            ServerEvent::Welcome { player_id } => check(!player_id.is_empty(), event, "player_id"),
            ServerEvent::GameStateSnapshot {
                players,
                boss,
                pickups,
            } => {
                for player in players {
                    player.validate(event)?;
                }
                if let Some(boss) = boss {
                    boss.validate(event)?;
                }
                for pickup in pickups {
                    pickup.validate(event)?;
                }
                Ok(())
            }
            ServerEvent::PlayerJoined { player } => player.validate(event),
            ServerEvent::PlayerLeft { player_id } => {
                check(!player_id.is_empty(), event, "player_id")
            }
            ServerEvent::PlayerMoved {
                player_id,
                position,
                rotation,
                velocity,
            } => {
                check(!player_id.is_empty(), event, "player_id")?;
                check(position.is_finite(), event, "position")?;
                check(rotation.is_finite(), event, "rotation")?;
                check(velocity.is_finite(), event, "velocity")
            }
            ServerEvent::InitializePickups { pickups } => {
                for pickup in pickups {
                    pickup.validate(event)?;
                }
                Ok(())
            }
            ServerEvent::PickupSpawned { pickup } => pickup.validate(event),
            ServerEvent::PickupCollected {
                pickup_id,
                player_id,
            } => {
                check(!pickup_id.is_empty(), event, "pickup_id")?;
                check(!player_id.is_empty(), event, "player_id")
            }
            ServerEvent::BossSpawned { boss } | ServerEvent::BossRespawned { boss } => {
                boss.validate(event)
            }
            ServerEvent::BossStateChanged {
                health, max_health, ..
            }
            | ServerEvent::BossHit {
                health, max_health, ..
            } => {
                check(max_health.is_finite() && *max_health > 0.0, event, "max_health")?;
                check(health.is_finite() && *health >= 0.0, event, "health")
            }
            ServerEvent::BossPositionUpdated { position, rotation } => {
                check(position.is_finite(), event, "position")?;
                check(rotation.is_finite(), event, "rotation")
            }
            ServerEvent::BossDefeated { .. } => Ok(()),
            ServerEvent::EasterEggState { position, .. }
            | ServerEvent::EasterEggRespawned { position } => {
                check(position.is_finite(), event, "position")
            }
            ServerEvent::EasterEggCollected { player_id } => {
                check(!player_id.is_empty(), event, "player_id")
            }
            ServerEvent::PlayerTransformed { player_id, .. } => {
                check(!player_id.is_empty(), event, "player_id")
            }
            ServerEvent::ProjectileFired {
                owner_id,
                origin,
                direction,
                ..
            } => {
                check(!owner_id.is_empty(), event, "owner_id")?;
                check(origin.is_finite(), event, "origin")?;
                check(
                    direction.is_finite() && direction.length_sq() > 0.0,
                    event,
                    "direction",
                )
            }
        }
    }
}

pub fn encode_intent(intent: &ClientIntent) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(intent).map_err(ProtocolError::Encode)
}

pub fn decode_intent(bytes: &[u8]) -> Result<ClientIntent, ProtocolError> {
    bincode::deserialize(bytes).map_err(ProtocolError::Decode)
}

pub fn encode_event(event: &ServerEvent) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(event).map_err(ProtocolError::Encode)
}

/// Decodes and validates one inbound datagram.
pub fn decode_event(bytes: &[u8]) -> Result<ServerEvent, ProtocolError> {
    let event: ServerEvent = bincode::deserialize(bytes).map_err(ProtocolError::Decode)?;
    event.validate()?;
    Ok(event)
}

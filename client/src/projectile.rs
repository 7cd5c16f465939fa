//! Projectile lifecycle: spawn, advance, and a single terminal removal by
//! either collision or expiry.

use crate::collaborators::VisualHandle;
use log::debug;
use shared::{Aabb, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectileKind {
    Damage,
    Homing,
    Freeze,
}

impl ProjectileKind {
    /// Unknown identifiers fall back to a plain damage round.
    pub fn from_id(id: &str) -> Self {
        match id {
            "damage" => ProjectileKind::Damage,
            "homing" => ProjectileKind::Homing,
            "freeze" => ProjectileKind::Freeze,
            other => {
                debug!("Unknown projectile type '{}', using damage", other);
                ProjectileKind::Damage
            }
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            ProjectileKind::Damage => "damage",
            ProjectileKind::Homing => "homing",
            ProjectileKind::Freeze => "freeze",
        }
    }

    pub fn speed(&self) -> f32 {
        match self {
            ProjectileKind::Damage => 80.0,
            ProjectileKind::Homing => 50.0,
            ProjectileKind::Freeze => 60.0,
        }
    }

    pub fn damage(&self) -> f32 {
        match self {
            ProjectileKind::Damage => 10.0,
            ProjectileKind::Homing => 35.0,
            ProjectileKind::Freeze => 0.0,
        }
    }

    /// Seconds before the projectile expires.
    pub fn lifetime(&self) -> f32 {
        match self {
            ProjectileKind::Damage => 2.0,
            ProjectileKind::Homing => 4.0,
            ProjectileKind::Freeze => 2.5,
        }
    }

    pub fn max_range(&self) -> f32 {
        match self {
            ProjectileKind::Homing => 200.0,
            _ => 150.0,
        }
    }
}

const PROJECTILE_HALF_SIZE: f32 = 0.3;
const HOMING_TURN_RATE: f32 = 3.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectileOwner {
    Local,
    Remote(String),
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u64,
    pub kind: ProjectileKind,
    pub position: Vec3,
    pub direction: Vec3,
    pub damage: f32,
    pub owner: ProjectileOwner,
    pub age: f32,
    pub travelled: f32,
    pub visual: Option<VisualHandle>,
}

impl Projectile {
    pub fn new(
        id: u64,
        kind: ProjectileKind,
        origin: Vec3,
        direction: Vec3,
        owner: ProjectileOwner,
    ) -> Self {
        let direction = match direction.normalize() {
            d if d == Vec3::ZERO => Vec3::new(0.0, 0.0, 1.0),
            d => d,
        };
        Self {
            id,
            kind,
            position: origin,
            direction,
            damage: kind.damage(),
            owner,
            age: 0.0,
            travelled: 0.0,
            visual: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.owner == ProjectileOwner::Local
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(
            self.position,
            Vec3::new(PROJECTILE_HALF_SIZE, PROJECTILE_HALF_SIZE, PROJECTILE_HALF_SIZE),
        )
    }

    /// Moves the projectile and returns whether it is still within its
    /// lifetime and range. Homing rounds steer toward `target` when given.
    pub fn advance(&mut self, dt: f32, target: Option<Vec3>) -> bool {
        if self.kind == ProjectileKind::Homing {
            if let Some(target) = target {
                let desired = (target - self.position).normalize();
                if desired != Vec3::ZERO {
                    let blend = (HOMING_TURN_RATE * dt).min(1.0);
                    let steered = self.direction + (desired - self.direction) * blend;
                    if steered != Vec3::ZERO {
                        self.direction = steered.normalize();
                    }
                }
            }
        }

        let step = self.kind.speed() * dt;
        self.position += self.direction * step;
        self.travelled += step;
        self.age += dt;

        self.age < self.kind.lifetime() && self.travelled < self.kind.max_range()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileEnd {
    Collided,
    Expired,
}

/// A projectile that reached its terminal event this tick.
#[derive(Debug, Clone)]
pub struct Retired {
    pub projectile: Projectile,
    pub end: ProjectileEnd,
}

/// Advances every projectile and removes, in the same pass, each one whose
/// collision or expiry condition became true. Collision takes precedence when
/// both hold, so every removed projectile has exactly one terminal event.
pub fn step_projectiles(
    projectiles: &mut Vec<Projectile>,
    dt: f32,
    boss_bounds: Option<Aabb>,
) -> Vec<Retired> {
    let target = boss_bounds.map(|b| b.center());
    let mut retired = Vec::new();
    let mut kept = Vec::with_capacity(projectiles.len());

    for mut projectile in projectiles.drain(..) {
        let alive = projectile.advance(dt, target);
        let hit = boss_bounds
            .map(|bounds| bounds.intersects(&projectile.bounds()))
            .unwrap_or(false);

        if hit {
            retired.push(Retired {
                projectile,
                end: ProjectileEnd::Collided,
            });
        } else if !alive {
            retired.push(Retired {
                projectile,
                end: ProjectileEnd::Expired,
            });
        } else {
            kept.push(projectile);
        }
    }

    *projectiles = kept;
    retired
}

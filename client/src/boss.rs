//! The boss and its lifecycle: optimistic hit application, the once-only
//! defeat sequence with its reward fan-out, and the grace → warning → respawn
//! timer chain.

use crate::collaborators::{Effect, VisualFactory, VisualKind};
use crate::game::ScheduledEvent;
use crate::pickup::spawn_boss_rewards;
use crate::registry::EntityRegistry;
use crate::scheduler::{Scheduler, TimerHandle};
use log::{debug, info};
use shared::{
    lerp_angle, Aabb, BossSnapshot, Vec3, BOSS_BASE_DAMAGE, BOSS_BASE_HEALTH,
    BOSS_CONTACT_MULTIPLIER, BOSS_DEATH_EFFECT_MS, BOSS_ENRAGED_CONTACT_MULTIPLIER,
    BOSS_ENRAGE_FRACTION, BOSS_GRACE_PERIOD_MS, BOSS_HALF_EXTENTS, BOSS_POSITION_SMOOTHING,
    BOSS_WARNING_PERIOD_MS,
};
use std::time::Duration;

/// Arena centre, resting on the ground.
pub const BOSS_SPAWN_POSITION: Vec3 = Vec3::new(0.0, BOSS_HALF_EXTENTS.y, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossState {
    Normal,
    Enraged,
    Defeated,
}

impl BossState {
    pub fn from_id(id: &str) -> Self {
        match id {
            "enraged" => BossState::Enraged,
            "defeated" => BossState::Defeated,
            "normal" => BossState::Normal,
            other => {
                debug!("Unknown boss state '{}', using normal", other);
                BossState::Normal
            }
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            BossState::Normal => "normal",
            BossState::Enraged => "enraged",
            BossState::Defeated => "defeated",
        }
    }
}

/// Who decides boss defeat and respawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityMode {
    /// The server confirms every defeat and respawn.
    Server,
    /// No server: the client is its own authority.
    Offline,
}

#[derive(Debug, Clone)]
pub struct Boss {
    pub health: f32,
    pub max_health: f32,
    pub damage: f32,
    pub state: BossState,
    pub level: u32,
    pub position: Vec3,
    pub rotation: Vec3,
    pub half_extents: Vec3,
    /// Local health reached zero; waiting for the server to confirm.
    pub pending_defeat: bool,
    pub visual: Option<crate::collaborators::VisualHandle>,
}

impl Boss {
    pub fn for_level(level: u32, position: Vec3) -> Self {
        let level = level.max(1);
        let tier = (level - 1) as f32;
        let max_health = BOSS_BASE_HEALTH * (1.0 + 0.5 * tier);
        Self {
            health: max_health,
            max_health,
            damage: BOSS_BASE_DAMAGE * (1.0 + 0.25 * tier),
            state: BossState::Normal,
            level,
            position,
            rotation: Vec3::ZERO,
            half_extents: BOSS_HALF_EXTENTS,
            pending_defeat: false,
            visual: None,
        }
    }

    pub fn from_snapshot(snapshot: &BossSnapshot) -> Self {
        let mut boss = Boss::for_level(snapshot.level, snapshot.position);
        boss.rotation = snapshot.rotation;
        boss.damage = snapshot.damage;
        boss.apply_authoritative(
            snapshot.health,
            snapshot.max_health,
            BossState::from_id(&snapshot.state),
            snapshot.level,
        );
        boss
    }

    /// Server values replace whatever the client computed.
    pub fn apply_authoritative(&mut self, health: f32, max_health: f32, state: BossState, level: u32) {
        self.max_health = max_health;
        self.health = health.clamp(0.0, max_health);
        self.state = state;
        self.level = level.max(1);
        if self.health > 0.0 {
            self.pending_defeat = false;
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extents)
    }

    pub fn is_enraged(&self) -> bool {
        self.state == BossState::Enraged
    }

    pub fn contact_damage(&self) -> f32 {
        let multiplier = if self.is_enraged() {
            BOSS_ENRAGED_CONTACT_MULTIPLIER
        } else {
            BOSS_CONTACT_MULTIPLIER
        };
        self.damage * multiplier
    }

    /// Exponential approach toward a server transform.
    pub fn smooth_toward(&mut self, position: Vec3, rotation: Vec3) {
        self.position = self.position.lerp(&position, BOSS_POSITION_SMOOTHING);
        self.rotation.x = lerp_angle(self.rotation.x, rotation.x, BOSS_POSITION_SMOOTHING);
        self.rotation.y = lerp_angle(self.rotation.y, rotation.y, BOSS_POSITION_SMOOTHING);
        self.rotation.z = lerp_angle(self.rotation.z, rotation.z, BOSS_POSITION_SMOOTHING);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitResult {
    Damaged { health: f32 },
    /// Health reached zero with this hit.
    Lethal,
    /// Boss already at zero or defeated.
    Ignored,
}

/// Optimistic, non-authoritative damage for immediate feedback. Never runs
/// the defeat sequence itself.
pub fn apply_hit(boss: &mut Boss, damage: f32, mode: AuthorityMode) -> HitResult {
    if boss.state == BossState::Defeated || boss.health <= 0.0 {
        return HitResult::Ignored;
    }
    boss.health = (boss.health - damage.max(0.0)).max(0.0);

    if mode == AuthorityMode::Offline
        && boss.state == BossState::Normal
        && boss.health > 0.0
        && boss.health < boss.max_health * BOSS_ENRAGE_FRACTION
    {
        info!("Boss enraged at {:.0}/{:.0}", boss.health, boss.max_health);
        boss.state = BossState::Enraged;
    }

    if boss.health <= 0.0 {
        boss.pending_defeat = true;
        HitResult::Lethal
    } else {
        HitResult::Damaged {
            health: boss.health,
        }
    }
}

/// Respawn bookkeeping for the boss: the two cancelable timers and whether a
/// respawn is in progress.
#[derive(Debug)]
pub struct BossLifecycle {
    pub respawning: bool,
    pub awaiting_confirmation: bool,
    pub grace_period: Duration,
    pub warning_period: Duration,
    pub defeat_count: u32,
    pub last_level: u32,
    grace_timer: Option<TimerHandle>,
    warning_timer: Option<TimerHandle>,
}

impl BossLifecycle {
    pub fn new(grace_period: Duration, warning_period: Duration) -> Self {
        Self {
            respawning: false,
            awaiting_confirmation: false,
            grace_period,
            warning_period,
            defeat_count: 0,
            last_level: 1,
            grace_timer: None,
            warning_timer: None,
        }
    }

    pub fn grace_pending(&self) -> bool {
        self.grace_timer.is_some()
    }

    pub fn warning_pending(&self) -> bool {
        self.warning_timer.is_some()
    }

    pub fn cancel_timers(&mut self, scheduler: &mut Scheduler<ScheduledEvent>) {
        if let Some(handle) = self.grace_timer.take() {
            scheduler.cancel(handle);
        }
        if let Some(handle) = self.warning_timer.take() {
            scheduler.cancel(handle);
        }
    }

    /// Clears any running timers, then schedules the grace period.
    pub fn begin_respawn(&mut self, now: Duration, scheduler: &mut Scheduler<ScheduledEvent>) {
        self.cancel_timers(scheduler);
        self.respawning = true;
        self.awaiting_confirmation = false;
        self.grace_timer = Some(scheduler.schedule(
            now + self.grace_period,
            ScheduledEvent::BossGraceEnded,
        ));
    }

    /// Grace over: schedule the warning. Returns false for a stale event.
    pub fn on_grace_ended(&mut self, now: Duration, scheduler: &mut Scheduler<ScheduledEvent>) -> bool {
        self.grace_timer = None;
        if !self.respawning {
            return false;
        }
        if let Some(handle) = self.warning_timer.take() {
            scheduler.cancel(handle);
        }
        self.warning_timer = Some(scheduler.schedule(
            now + self.warning_period,
            ScheduledEvent::BossWarningEnded,
        ));
        true
    }

    /// Warning over: the boss may now come back. Returns false for a stale event.
    pub fn on_warning_ended(&mut self) -> bool {
        self.warning_timer = None;
        if !self.respawning {
            return false;
        }
        self.awaiting_confirmation = true;
        true
    }

    pub fn finish_respawn(&mut self, scheduler: &mut Scheduler<ScheduledEvent>) {
        self.cancel_timers(scheduler);
        self.respawning = false;
        self.awaiting_confirmation = false;
    }
}

impl Default for BossLifecycle {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(BOSS_GRACE_PERIOD_MS),
            Duration::from_millis(BOSS_WARNING_PERIOD_MS),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefeatReport {
    pub level: u32,
    pub rewards: usize,
}

/// Runs the defeat sequence once. A second call while the boss is already
/// gone returns `None` and changes nothing.
pub fn defeat_boss(
    registry: &mut EntityRegistry,
    lifecycle: &mut BossLifecycle,
    scheduler: &mut Scheduler<ScheduledEvent>,
    visuals: &mut dyn VisualFactory,
    now: Duration,
) -> Option<DefeatReport> {
    let boss = match registry.boss.take() {
        Some(boss) => boss,
        None => {
            debug!("Boss defeat ignored: no boss present");
            return None;
        }
    };

    visuals.play_effect(
        Effect::BossDeath {
            position: boss.position,
        },
        Duration::from_millis(BOSS_DEATH_EFFECT_MS),
    );
    if let Some(handle) = boss.visual {
        visuals.despawn(handle);
    }

    lifecycle.defeat_count += 1;
    lifecycle.last_level = boss.level;

    let rewards = spawn_boss_rewards(
        boss.position,
        registry.player_count(),
        u64::from(lifecycle.defeat_count),
    );
    let reward_count = rewards.len();
    for pickup in rewards {
        registry.insert_pickup(pickup, visuals);
    }

    lifecycle.begin_respawn(now, scheduler);
    info!(
        "Boss level {} defeated, {} rewards spawned",
        boss.level, reward_count
    );

    Some(DefeatReport {
        level: boss.level,
        rewards: reward_count,
    })
}

/// Installs a confirmed boss. Returns true only when this is the transition
/// back to alive; a confirmation for a boss that already exists just
/// refreshes its authoritative fields.
pub fn respawn_boss(
    registry: &mut EntityRegistry,
    lifecycle: &mut BossLifecycle,
    scheduler: &mut Scheduler<ScheduledEvent>,
    visuals: &mut dyn VisualFactory,
    mut boss: Boss,
) -> bool {
    lifecycle.finish_respawn(scheduler);

    if let Some(existing) = registry.boss.as_mut() {
        existing.apply_authoritative(boss.health, boss.max_health, boss.state, boss.level);
        existing.damage = boss.damage;
        return false;
    }

    boss.visual = Some(visuals.spawn(VisualKind::Boss { level: boss.level }));
    info!("Boss level {} spawned", boss.level);
    lifecycle.last_level = boss.level;
    registry.boss = Some(boss);
    true
}

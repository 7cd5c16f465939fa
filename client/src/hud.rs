//! Headless HUD: writes notices to the log.

use crate::collaborators::{UiNotice, UiSink};
use log::{debug, info, warn};

#[derive(Debug, Default)]
pub struct LogHud {
    shown: usize,
}

impl LogHud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> usize {
        self.shown
    }
}

impl UiSink for LogHud {
    fn notify(&mut self, notice: &UiNotice) {
        self.shown += 1;
        match notice {
            UiNotice::Health { current, max } => debug!("Health {:.0}/{:.0}", current, max),
            UiNotice::Weapon { weapon, ammo } => debug!("Weapon {} ({} rounds)", weapon.id(), ammo),
            UiNotice::Destroyed {
                death_count,
                delay_ms,
            } => warn!(
                "Destroyed! Death #{}, respawning in {:.1}s",
                death_count,
                *delay_ms as f32 / 1000.0
            ),
            UiNotice::RespawnCountdown { seconds_left } => info!("Respawn in {}...", seconds_left),
            UiNotice::Respawned => info!("Back in the arena"),
            UiNotice::BossHealth { health, max, level } => {
                debug!("Boss L{} {:.0}/{:.0}", level, health, max)
            }
            UiNotice::BossEnraged => warn!("The boss is enraged!"),
            UiNotice::BossFrozen { duration_ms } => info!("Boss frozen for {}ms", duration_ms),
            UiNotice::BossDefeated { level } => info!("Boss level {} defeated!", level),
            UiNotice::BossGracePeriod { duration_ms } => {
                info!("Next boss in {}s", duration_ms / 1000)
            }
            UiNotice::BossWarning { duration_ms } => {
                warn!("Boss incoming in {}s!", duration_ms / 1000)
            }
            UiNotice::BossRespawned { level } => warn!("Boss level {} has appeared", level),
            UiNotice::PickupCollected { kind } => info!("Picked up {}", kind.id()),
            UiNotice::Transformed { vehicle } => info!("Transformed into a {}", vehicle.id()),
            UiNotice::PortalEntered { label } => info!("Entering {}", label),
        }
    }
}

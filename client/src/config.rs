//! Runtime configuration for a simulation session.

use crate::boss::AuthorityMode;
use crate::vehicle::VehicleKind;
use shared::{
    BOSS_GRACE_PERIOD_MS, BOSS_WARNING_PERIOD_MS, PORTAL_NAVIGATION_DELAY_MS,
    RESPAWN_BASE_DELAY_MS, RESPAWN_PER_DEATH_MS,
};
use std::time::Duration;
use url::Url;

pub const DEFAULT_GAME_URL: &str = "http://localhost:8080/";
pub const DEFAULT_POSITION_SEND_INTERVAL_MS: u64 = 50;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },
    #[error("game url '{0}' is not an absolute url")]
    InvalidGameUrl(String),
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub authority: AuthorityMode,
    pub username: String,
    pub color: String,
    pub vehicle: VehicleKind,
    /// This game's own address, sent as `ref` through exit portals.
    pub game_url: String,
    pub avatar_url: Option<String>,
    pub team: Option<String>,
    /// Target of the arena's exit portal, if it has one.
    pub exit_portal_url: Option<String>,
    pub boss_grace_period: Duration,
    pub boss_warning_period: Duration,
    pub respawn_base_delay: Duration,
    pub respawn_per_death_delay: Duration,
    pub position_send_interval: Duration,
    pub portal_navigation_delay: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            authority: AuthorityMode::Server,
            username: "player".to_string(),
            color: "#ff3333".to_string(),
            vehicle: VehicleKind::Sedan,
            game_url: DEFAULT_GAME_URL.to_string(),
            avatar_url: None,
            team: None,
            exit_portal_url: None,
            boss_grace_period: Duration::from_millis(BOSS_GRACE_PERIOD_MS),
            boss_warning_period: Duration::from_millis(BOSS_WARNING_PERIOD_MS),
            respawn_base_delay: Duration::from_millis(RESPAWN_BASE_DELAY_MS),
            respawn_per_death_delay: Duration::from_millis(RESPAWN_PER_DEATH_MS),
            position_send_interval: Duration::from_millis(DEFAULT_POSITION_SEND_INTERVAL_MS),
            portal_navigation_delay: Duration::from_millis(PORTAL_NAVIGATION_DELAY_MS),
        }
    }
}

impl SimConfig {
    pub fn offline() -> Self {
        Self {
            authority: AuthorityMode::Offline,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.trim().is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        let durations = [
            ("boss grace period", self.boss_grace_period),
            ("boss warning period", self.boss_warning_period),
            ("respawn base delay", self.respawn_base_delay),
            ("position send interval", self.position_send_interval),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration { name });
            }
        }
        if Url::parse(&self.game_url).is_err() {
            return Err(ConfigError::InvalidGameUrl(self.game_url.clone()));
        }
        Ok(())
    }
}

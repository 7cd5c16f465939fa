//! Teleport portals and the URL hand-off that carries player state between
//! games.

use crate::collaborators::VisualHandle;
use crate::vehicle::Vehicle;
use log::warn;
use shared::{Vec3, PORTAL_COOLDOWN_MS, PORTAL_RADIUS};
use std::time::Duration;
use url::Url;

pub const FALLBACK_PORTAL_LABEL: &str = "Return Portal";

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("invalid portal url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalKind {
    /// Where portal arrivals appear; leads back to the referring game.
    Entry,
    /// Leads out to another game.
    Exit,
}

#[derive(Debug, Clone)]
pub struct Portal {
    pub kind: PortalKind,
    pub position: Vec3,
    pub target_url: String,
    pub label: String,
    pub cooldown: Duration,
    pub active: bool,
    pub visual: Option<VisualHandle>,
}

impl Portal {
    pub fn exit(position: Vec3, target_url: &str, label: &str) -> Self {
        Self {
            kind: PortalKind::Exit,
            position,
            target_url: target_url.to_string(),
            label: label.to_string(),
            cooldown: Duration::ZERO,
            active: true,
            visual: None,
        }
    }

    /// Entry portal leading back to `ref_url`. It starts cooling down so a
    /// player arriving on top of it is not sent straight back.
    pub fn entry(position: Vec3, ref_url: &str) -> Self {
        Self {
            kind: PortalKind::Entry,
            position,
            target_url: ref_url.to_string(),
            label: return_label(ref_url),
            cooldown: Duration::from_millis(PORTAL_COOLDOWN_MS),
            active: true,
            visual: None,
        }
    }

    /// Spherical overlap test, suppressed while cooling down.
    pub fn check_collision(&self, position: &Vec3) -> bool {
        if !self.active || !self.cooldown.is_zero() {
            return false;
        }
        self.position.distance(position) < PORTAL_RADIUS
    }

    pub fn activate(&mut self) {
        self.cooldown = Duration::from_millis(PORTAL_COOLDOWN_MS);
    }

    pub fn update(&mut self, dt: Duration) {
        self.cooldown = self.cooldown.saturating_sub(dt);
    }
}

/// "Return to <host>", or a generic label when the URL does not parse.
pub fn return_label(ref_url: &str) -> String {
    match Url::parse(ref_url) {
        Ok(url) => match url.host_str() {
            Some(host) => format!("Return to {}", host),
            None => FALLBACK_PORTAL_LABEL.to_string(),
        },
        Err(e) => {
            warn!("Malformed portal return url '{}': {}", ref_url, e);
            FALLBACK_PORTAL_LABEL.to_string()
        }
    }
}

/// Player state carried across a portal in the URL query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandoffParams {
    pub portal: bool,
    pub username: String,
    pub vehicle: String,
    pub color: String,
    pub speed: f32,
    pub velocity: Vec3,
    pub rotation: Vec3,
    pub ref_url: Option<String>,
    pub avatar_url: Option<String>,
    pub team: Option<String>,
}

impl HandoffParams {
    pub fn from_vehicle(
        vehicle: &Vehicle,
        ref_url: Option<&str>,
        avatar_url: Option<&str>,
        team: Option<&str>,
    ) -> Self {
        Self {
            portal: true,
            username: vehicle.name.clone(),
            vehicle: vehicle.kind.id().to_string(),
            color: vehicle.color.clone(),
            speed: vehicle.speed(),
            velocity: vehicle.velocity,
            rotation: vehicle.rotation,
            ref_url: ref_url.map(str::to_string),
            avatar_url: avatar_url.map(str::to_string),
            team: team.map(str::to_string),
        }
    }

    /// Appends the hand-off query to `base`, keeping any query it already has.
    pub fn to_url(&self, base: &str) -> Result<Url, PortalError> {
        let mut url = Url::parse(base).map_err(|source| PortalError::InvalidUrl {
            url: base.to_string(),
            source,
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("portal", if self.portal { "true" } else { "false" });
            query.append_pair("username", &self.username);
            query.append_pair("vehicle-type", &self.vehicle);
            query.append_pair("color", &self.color);
            query.append_pair("speed", &format_float(self.speed));
            query.append_pair("speed_x", &format_float(self.velocity.x));
            query.append_pair("speed_y", &format_float(self.velocity.y));
            query.append_pair("speed_z", &format_float(self.velocity.z));
            query.append_pair("rotation_x", &format_float(self.rotation.x));
            query.append_pair("rotation_y", &format_float(self.rotation.y));
            query.append_pair("rotation_z", &format_float(self.rotation.z));
            if let Some(ref_url) = &self.ref_url {
                query.append_pair("ref", ref_url);
            }
            if let Some(avatar_url) = &self.avatar_url {
                query.append_pair("avatar_url", avatar_url);
            }
            if let Some(team) = &self.team {
                query.append_pair("team", team);
            }
        }
        Ok(url)
    }

    /// Reads hand-off parameters from an arrival URL. Missing or non-numeric
    /// values default to zero; unknown keys are ignored.
    pub fn from_url(arrival: &str) -> Result<Self, PortalError> {
        let url = Url::parse(arrival).map_err(|source| PortalError::InvalidUrl {
            url: arrival.to_string(),
            source,
        })?;
        let mut params = HandoffParams::default();
        for (key, value) in url.query_pairs() {
            let number = || value.parse::<f32>().ok().filter(|v| v.is_finite()).unwrap_or(0.0);
            match key.as_ref() {
                "portal" => params.portal = value == "true" || value == "1",
                "username" => params.username = value.to_string(),
                "vehicle-type" | "vehicle" | "vehicle_type" => {
                    params.vehicle = value.to_string()
                }
                "color" => params.color = value.to_string(),
                "speed" => params.speed = number(),
                "speed_x" => params.velocity.x = number(),
                "speed_y" => params.velocity.y = number(),
                "speed_z" => params.velocity.z = number(),
                "rotation_x" => params.rotation.x = number(),
                "rotation_y" => params.rotation.y = number(),
                "rotation_z" => params.rotation.z = number(),
                "ref" if !value.is_empty() => params.ref_url = Some(value.to_string()),
                "avatar_url" if !value.is_empty() => params.avatar_url = Some(value.to_string()),
                "team" if !value.is_empty() => params.team = Some(value.to_string()),
                _ => {}
            }
        }
        Ok(params)
    }
}

fn format_float(value: f32) -> String {
    format!("{:.3}", value)
}

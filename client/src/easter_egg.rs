//! The server-owned easter egg. Collecting it turns the collector's vehicle
//! into a monster truck.

use crate::collaborators::VisualHandle;
use shared::{Vec3, EASTER_EGG_RADIUS};

#[derive(Debug, Clone, Default)]
pub struct EasterEgg {
    pub position: Vec3,
    pub active: bool,
    /// A collect intent went out for the current egg.
    requested: bool,
    pub visual: Option<VisualHandle>,
}

impl EasterEgg {
    pub fn new(position: Vec3, active: bool) -> Self {
        Self {
            position,
            active,
            requested: false,
            visual: None,
        }
    }

    pub fn in_reach(&self, position: &Vec3) -> bool {
        self.active && self.position.distance(position) < EASTER_EGG_RADIUS
    }

    /// Latches the collect request. Returns true the first time the local
    /// vehicle reaches this egg.
    pub fn request_collect(&mut self, position: &Vec3) -> bool {
        if self.requested || !self.in_reach(position) {
            return false;
        }
        self.requested = true;
        true
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Server state replaces ours and clears the request latch.
    pub fn set_state(&mut self, active: bool, position: Vec3) {
        self.active = active;
        self.position = position;
        self.requested = false;
    }

    /// Returns false when the egg was already gone.
    pub fn mark_collected(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        self.requested = false;
        was_active
    }
}

//! Control flags applied to the local vehicle, with edge detection for the
//! one-shot actions.

/// Held-key state for one vehicle. Produced by the input collaborator each
/// frame; the simulation never reads devices directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFlags {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
    pub switch_weapon: bool,
}

impl ControlFlags {
    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right || self.fire || self.switch_weapon
    }

    /// Forward minus backward, in `[-1, 1]`.
    pub fn throttle(&self) -> f32 {
        match (self.forward, self.backward) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }

    /// Left minus right, in `[-1, 1]`. Positive turns counter-clockwise.
    pub fn steering(&self) -> f32 {
        match (self.left, self.right) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }
}

/// Turns held flags into press events.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlEdges {
    prev_switch_weapon: bool,
}

impl ControlEdges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true on the first frame `switch_weapon` goes down.
    pub fn switch_pressed(&mut self, controls: &ControlFlags) -> bool {
        let pressed = controls.switch_weapon && !self.prev_switch_weapon;
        self.prev_switch_weapon = controls.switch_weapon;
        pressed
    }

    pub fn reset(&mut self) {
        self.prev_switch_weapon = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_controls_are_idle() {
        let controls = ControlFlags::default();
        assert!(!controls.any());
        assert_eq!(controls.throttle(), 0.0);
        assert_eq!(controls.steering(), 0.0);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let controls = ControlFlags {
            forward: true,
            backward: true,
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(controls.throttle(), 0.0);
        assert_eq!(controls.steering(), 0.0);
    }

    #[test]
    fn test_switch_fires_once_per_press() {
        let mut edges = ControlEdges::new();
        let held = ControlFlags {
            switch_weapon: true,
            ..Default::default()
        };
        let released = ControlFlags::default();

        assert!(edges.switch_pressed(&held));
        assert!(!edges.switch_pressed(&held));
        assert!(!edges.switch_pressed(&released));
        assert!(edges.switch_pressed(&held));
    }
}

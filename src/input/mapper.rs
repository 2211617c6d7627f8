//! Threshold mapping from controller frames to virtual key state.

use serde::{Deserialize, Serialize};

use crate::input::frame::ControllerFrame;

/// Joystick axis thresholds. Readings below `low` or above `high` trigger a
/// direction; comparisons are strict, so a reading exactly on a threshold
/// does not trigger.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AxisThresholds {
    pub low: i32,
    pub high: i32,
}

impl Default for AxisThresholds {
    fn default() -> Self {
        Self {
            low: 1000,
            high: 3000,
        }
    }
}

/// Boolean state of every virtual key, derived from a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub enter: bool,
    pub space: bool,
}

impl KeyState {
    /// Pure frame → key mapping. Joystick directions and the dedicated
    /// buttons are OR-ed together; "up" doubles as the jump key, so space
    /// always mirrors it.
    pub fn from_frame(frame: &ControllerFrame, thresholds: &AxisThresholds) -> Self {
        let up = frame.y < thresholds.low || frame.btn_up;
        Self {
            right: frame.x < thresholds.low || frame.btn_right,
            left: frame.x > thresholds.high || frame.btn_left,
            down: frame.y > thresholds.high || frame.btn_down,
            up,
            enter: frame.switch_pressed,
            space: up,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(x: i32, y: i32) -> ControllerFrame {
        ControllerFrame {
            x,
            y,
            ..ControllerFrame::default()
        }
    }

    #[test]
    fn space_always_mirrors_up() {
        let thresholds = AxisThresholds::default();
        let samples = [
            frame(0, 0),
            frame(2000, 2000),
            frame(4095, 4095),
            ControllerFrame {
                btn_up: true,
                ..frame(2000, 2000)
            },
        ];
        for sample in samples {
            let state = KeyState::from_frame(&sample, &thresholds);
            assert_eq!(state.space, state.up, "frame {sample:?}");
        }
    }

    #[test]
    fn threshold_boundary_is_strict() {
        let thresholds = AxisThresholds::default();
        assert!(!KeyState::from_frame(&frame(1000, 2000), &thresholds).right);
        assert!(KeyState::from_frame(&frame(999, 2000), &thresholds).right);
        assert!(!KeyState::from_frame(&frame(3000, 2000), &thresholds).left);
        assert!(KeyState::from_frame(&frame(3001, 2000), &thresholds).left);
        assert!(!KeyState::from_frame(&frame(2000, 3000), &thresholds).down);
        assert!(KeyState::from_frame(&frame(2000, 3001), &thresholds).down);
        assert!(!KeyState::from_frame(&frame(2000, 1000), &thresholds).up);
        assert!(KeyState::from_frame(&frame(2000, 999), &thresholds).up);
    }

    #[test]
    fn buttons_override_a_centered_stick() {
        let thresholds = AxisThresholds::default();
        let centered = ControllerFrame {
            btn_left: true,
            btn_right: true,
            btn_up: true,
            btn_down: true,
            switch_pressed: true,
            ..frame(2000, 2000)
        };
        let state = KeyState::from_frame(&centered, &thresholds);
        assert!(state.left && state.right && state.up && state.down);
        assert!(state.enter);
        assert!(state.space);
    }
}

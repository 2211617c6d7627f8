//! uinput virtual keyboard that the games see as real hardware.

use evdev::uinput::VirtualDevice;
use evdev::{AttributeSet, EventType, InputEvent, KeyCode};
use thiserror::Error;
use tracing::info;

use crate::input::mapper::KeyState;

const DEVICE_NAME: &str = "NotPortable Controller";

#[derive(Debug, Error)]
pub enum EmitterError {
    /// Creating the uinput device usually fails for lack of privileges on
    /// /dev/uinput.
    #[error("failed to create uinput device: {0}")]
    Create(std::io::Error),

    #[error("failed to emit key events: {0}")]
    Emit(std::io::Error),
}

/// Handle to the virtual keyboard. Owned exclusively by the receiver loop.
pub struct VirtualKeyboard {
    device: VirtualDevice,
}

impl VirtualKeyboard {
    pub fn open() -> Result<Self, EmitterError> {
        let mut keys = AttributeSet::<KeyCode>::new();
        for key in [
            KeyCode::KEY_UP,
            KeyCode::KEY_DOWN,
            KeyCode::KEY_LEFT,
            KeyCode::KEY_RIGHT,
            KeyCode::KEY_ENTER,
            KeyCode::KEY_SPACE,
        ] {
            keys.insert(key);
        }

        let device = VirtualDevice::builder()
            .map_err(EmitterError::Create)?
            .name(DEVICE_NAME)
            .with_keys(&keys)
            .map_err(EmitterError::Create)?
            .build()
            .map_err(EmitterError::Create)?;

        info!("Virtual keyboard '{}' created", DEVICE_NAME);
        Ok(Self { device })
    }

    /// Writes the full key state, level-triggered: every key's current value
    /// goes out on every frame, held keys included, and the batch is
    /// committed as one report (`emit` appends the SYN_REPORT).
    pub fn apply(&mut self, state: &KeyState) -> Result<(), EmitterError> {
        let events = [
            key_event(KeyCode::KEY_RIGHT, state.right),
            key_event(KeyCode::KEY_LEFT, state.left),
            key_event(KeyCode::KEY_DOWN, state.down),
            key_event(KeyCode::KEY_ENTER, state.enter),
            key_event(KeyCode::KEY_UP, state.up),
            key_event(KeyCode::KEY_SPACE, state.space),
        ];
        self.device.emit(&events).map_err(EmitterError::Emit)
    }
}

fn key_event(key: KeyCode, pressed: bool) -> InputEvent {
    InputEvent::new(EventType::KEY.0, key.code(), pressed as i32)
}

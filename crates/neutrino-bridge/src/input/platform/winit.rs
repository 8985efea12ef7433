use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::input::{InputMask, KeyBit};

/// Folds a winit `WindowEvent` into the held-key mask.
///
/// Returns `true` when the mask changed. Key repeats are ignored; losing
/// focus releases everything, since the matching key-up events never arrive.
pub fn apply_window_event(mask: &mut InputMask, event: &WindowEvent) -> bool {
    let before = *mask;

    match event {
        WindowEvent::KeyboardInput { event, .. } => {
            if let PhysicalKey::Code(code) = event.physical_key {
                apply_key(mask, code, event.state == ElementState::Pressed, event.repeat);
            }
        }
        WindowEvent::Focused(false) => mask.clear(),
        _ => {}
    }

    *mask != before
}

/// Applies one physical key transition.
pub fn apply_key(mask: &mut InputMask, code: KeyCode, pressed: bool, repeat: bool) {
    if repeat {
        return;
    }
    if let Some(bit) = map_key(code) {
        mask.set(bit, pressed);
    }
}

/// Physical key codes, so the layout is position-based (WASD on AZERTY too).
pub fn map_key(code: KeyCode) -> Option<KeyBit> {
    let bit = match code {
        KeyCode::KeyW => KeyBit::W,
        KeyCode::KeyA => KeyBit::A,
        KeyCode::KeyS => KeyBit::S,
        KeyCode::KeyD => KeyBit::D,
        KeyCode::KeyQ => KeyBit::Q,
        KeyCode::KeyE => KeyBit::E,
        KeyCode::Space => KeyBit::Space,
        _ => return None,
    };
    Some(bit)
}

use bevy::ecs::system::SystemParam;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

/// Pixel scroll deltas per wheel notch
const PIXELS_PER_LINE: f32 = 100.0;

/// Keys the game reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKey {
    W,
    A,
    S,
    D,
    Up,
    Down,
    Left,
    Right,
    F1,
    F3,
    F5,
    F9,
    O,
}

impl InputKey {
    pub fn key_code(self) -> KeyCode {
        match self {
            InputKey::W => KeyCode::KeyW,
            InputKey::A => KeyCode::KeyA,
            InputKey::S => KeyCode::KeyS,
            InputKey::D => KeyCode::KeyD,
            InputKey::Up => KeyCode::ArrowUp,
            InputKey::Down => KeyCode::ArrowDown,
            InputKey::Left => KeyCode::ArrowLeft,
            InputKey::Right => KeyCode::ArrowRight,
            InputKey::F1 => KeyCode::F1,
            InputKey::F3 => KeyCode::F3,
            InputKey::F5 => KeyCode::F5,
            InputKey::F9 => KeyCode::F9,
            InputKey::O => KeyCode::KeyO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputMouseButton {
    Left,
    Right,
    Middle,
}

impl From<InputMouseButton> for MouseButton {
    fn from(button: InputMouseButton) -> Self {
        match button {
            InputMouseButton::Left => MouseButton::Left,
            InputMouseButton::Right => MouseButton::Right,
            InputMouseButton::Middle => MouseButton::Middle,
        }
    }
}

/// Source of raw per-frame input. "Pressed" means pressed this frame.
pub trait InputProvider {
    fn is_key_pressed(&self, key: InputKey) -> bool;
    fn is_mouse_button_pressed(&self, button: InputMouseButton) -> bool;
    /// Wheel movement since the last call, in notches
    fn mouse_wheel_move(&mut self) -> f32;
    /// Cursor in window coordinates, None when outside the window
    fn mouse_position(&self) -> Option<Vec2>;
}

/// Reads Bevy's keyboard, mouse and window state
#[derive(SystemParam)]
pub struct BevyInputProvider<'w, 's> {
    keys: Res<'w, ButtonInput<KeyCode>>,
    mouse: Res<'w, ButtonInput<MouseButton>>,
    wheel: MessageReader<'w, 's, MouseWheel>,
    windows: Query<'w, 's, &'static Window, With<PrimaryWindow>>,
}

impl InputProvider for BevyInputProvider<'_, '_> {
    fn is_key_pressed(&self, key: InputKey) -> bool {
        self.keys.just_pressed(key.key_code())
    }

    fn is_mouse_button_pressed(&self, button: InputMouseButton) -> bool {
        self.mouse.just_pressed(button.into())
    }

    fn mouse_wheel_move(&mut self) -> f32 {
        self.wheel
            .read()
            .map(|event| match event.unit {
                MouseScrollUnit::Line => event.y,
                MouseScrollUnit::Pixel => event.y / PIXELS_PER_LINE,
            })
            .sum()
    }

    fn mouse_position(&self) -> Option<Vec2> {
        self.windows.single().ok()?.cursor_position()
    }
}

use std::collections::HashSet;

use crate::coords::Vec2;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState, MouseButton, MouseButtonState};

/// Held keys and buttons plus the pointer position of one window.
#[derive(Debug, Default)]
pub struct InputState {
    pub focused: bool,
    /// Logical pixels; `None` while the pointer is outside the window.
    pub pointer_pos: Option<Vec2>,
    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies `ev` and records the transition in `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Releases are lost while unfocused.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => {
                let pos = Vec2::new(*x, *y);
                // The first sample after entering has nothing to diff against.
                if let Some(prev) = self.pointer_pos {
                    frame.pointer_delta += pos - prev;
                }
                self.pointer_pos = Some(pos);
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(*key) {
                        frame.keys_pressed.insert(*key);
                    }
                }
                KeyState::Released => {
                    if self.keys_down.remove(key) {
                        frame.keys_released.insert(*key);
                    }
                }
            },

            InputEvent::PointerButton { button, state } => match state {
                MouseButtonState::Pressed => {
                    if self.buttons_down.insert(*button) {
                        frame.buttons_pressed.insert(*button);
                    }
                }
                MouseButtonState::Released => {
                    if self.buttons_down.remove(button) {
                        frame.buttons_released.insert(*button);
                    }
                }
            },
        }

        frame.events.push(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerMoved { x, y }
    }

    fn button(state: MouseButtonState) -> InputEvent {
        InputEvent::PointerButton {
            button: MouseButton::Left,
            state,
        }
    }

    // ── pointer ──────────────────────────────────────────────────────────

    #[test]
    fn first_move_has_no_delta() {
        let (mut s, mut f) = (InputState::default(), InputFrame::default());
        s.apply_event(&mut f, moved(10.0, 20.0));
        assert_eq!(f.pointer_delta, Vec2::zero());
        assert_eq!(s.pointer_pos, Some(Vec2::new(10.0, 20.0)));
    }

    #[test]
    fn deltas_accumulate_within_a_frame() {
        let (mut s, mut f) = (InputState::default(), InputFrame::default());
        s.apply_event(&mut f, moved(0.0, 0.0));
        s.apply_event(&mut f, moved(5.0, 1.0));
        s.apply_event(&mut f, moved(7.0, -2.0));
        assert_eq!(f.pointer_delta, Vec2::new(7.0, -2.0));

        f.clear();
        assert_eq!(f.pointer_delta, Vec2::zero());
    }

    #[test]
    fn leaving_resets_the_delta_baseline() {
        let (mut s, mut f) = (InputState::default(), InputFrame::default());
        s.apply_event(&mut f, moved(0.0, 0.0));
        s.apply_event(&mut f, InputEvent::PointerLeft);
        s.apply_event(&mut f, moved(100.0, 100.0));
        assert_eq!(f.pointer_delta, Vec2::zero());
    }

    // ── buttons and keys ─────────────────────────────────────────────────

    #[test]
    fn button_transitions_recorded_once() {
        let (mut s, mut f) = (InputState::default(), InputFrame::default());
        s.apply_event(&mut f, button(MouseButtonState::Pressed));
        s.apply_event(&mut f, button(MouseButtonState::Pressed));
        assert!(s.button_down(MouseButton::Left));
        assert_eq!(f.buttons_pressed.len(), 1);

        s.apply_event(&mut f, button(MouseButtonState::Released));
        assert!(!s.button_down(MouseButton::Left));
        assert!(f.buttons_released.contains(&MouseButton::Left));
        assert_eq!(f.events.len(), 3);
    }

    #[test]
    fn escape_press_is_visible_in_frame() {
        let (mut s, mut f) = (InputState::default(), InputFrame::default());
        s.apply_event(
            &mut f,
            InputEvent::Key {
                key: Key::Escape,
                state: KeyState::Pressed,
                repeat: false,
            },
        );
        assert!(f.key_pressed(Key::Escape));
        assert!(s.key_down(Key::Escape));
    }

    #[test]
    fn focus_loss_clears_held_state() {
        let (mut s, mut f) = (InputState::default(), InputFrame::default());
        s.apply_event(&mut f, button(MouseButtonState::Pressed));
        s.apply_event(&mut f, InputEvent::Focused(false));
        assert!(s.buttons_down.is_empty());
        assert!(!s.focused);
    }
}

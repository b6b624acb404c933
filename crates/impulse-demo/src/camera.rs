use impulse_engine::coords::Vec2;
use impulse_engine::input::{InputFrame, InputState, MouseButton};
use impulse_engine::render::ribbon::Camera;

/// Camera panned by dragging with the left mouse button.
///
/// The offset is the world position of the top-left screen corner, kept
/// inside `[0, world - view]` on both axes.
#[derive(Debug, Clone)]
pub struct DragCamera {
    offset: Vec2,
    max_offset: Vec2,
    /// Device pixels per logical pixel of pointer motion.
    pointer_scale: f32,
}

impl DragCamera {
    pub fn new(world_size: Vec2, view_size: Vec2, pointer_scale: f32) -> Self {
        let max_offset = Vec2::new(
            (world_size.x - view_size.x).max(0.0),
            (world_size.y - view_size.y).max(0.0),
        );
        Self {
            offset: Vec2::zero(),
            max_offset,
            pointer_scale,
        }
    }

    /// Pans by the negative pointer motion while the left button is held.
    pub fn update(&mut self, input: &InputState, frame: &InputFrame) {
        if !input.button_down(MouseButton::Left) {
            return;
        }
        self.pan(-frame.pointer_delta * self.pointer_scale);
    }

    pub fn pan(&mut self, by: Vec2) {
        self.offset = (self.offset + by).clamp(Vec2::zero(), self.max_offset);
    }
}

impl Camera for DragCamera {
    fn offset(&self) -> Vec2 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use impulse_engine::input::{InputEvent, MouseButtonState};

    use super::*;

    fn camera() -> DragCamera {
        DragCamera::new(Vec2::new(3000.0, 720.0), Vec2::new(1000.0, 500.0), 2.0)
    }

    fn drag(cam: &mut DragCamera, pressed: bool, from: Vec2, to: Vec2) {
        let (mut state, mut frame) = (InputState::default(), InputFrame::default());
        if pressed {
            state.apply_event(
                &mut frame,
                InputEvent::PointerButton {
                    button: MouseButton::Left,
                    state: MouseButtonState::Pressed,
                },
            );
        }
        state.apply_event(&mut frame, InputEvent::PointerMoved { x: from.x, y: from.y });
        state.apply_event(&mut frame, InputEvent::PointerMoved { x: to.x, y: to.y });
        cam.update(&state, &frame);
    }

    #[test]
    fn dragging_left_moves_camera_right() {
        let mut cam = camera();
        drag(&mut cam, true, Vec2::new(500.0, 100.0), Vec2::new(400.0, 90.0));
        assert_eq!(cam.offset(), Vec2::new(200.0, 20.0));
    }

    #[test]
    fn motion_without_button_is_ignored() {
        let mut cam = camera();
        drag(&mut cam, false, Vec2::new(500.0, 100.0), Vec2::new(400.0, 90.0));
        assert_eq!(cam.offset(), Vec2::zero());
    }

    #[test]
    fn offset_is_clamped_to_world() {
        let mut cam = camera();
        cam.pan(Vec2::new(-50.0, -50.0));
        assert_eq!(cam.offset(), Vec2::zero());
        cam.pan(Vec2::new(10_000.0, 10_000.0));
        assert_eq!(cam.offset(), Vec2::new(2000.0, 220.0));
    }

    #[test]
    fn view_larger_than_world_pins_camera() {
        let mut cam = DragCamera::new(Vec2::new(100.0, 100.0), Vec2::new(200.0, 200.0), 1.0);
        cam.pan(Vec2::new(30.0, 30.0));
        assert_eq!(cam.offset(), Vec2::zero());
    }
}

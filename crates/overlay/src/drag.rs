use eframe::egui::{Pos2, Vec2};

/// Moving the borderless window with the pointer.
///
/// Positions are in screen coordinates. The offset between the pointer and
/// the window origin is captured on press and kept until release.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { offset: Vec2 },
}

impl DragState {
    pub fn press(&mut self, pointer: Pos2, window: Pos2) {
        *self = Self::Dragging { offset: pointer - window };
    }

    /// New window origin for the pointer position, if a drag is in progress.
    pub fn move_to(&self, pointer: Pos2) -> Option<Pos2> {
        match *self {
            Self::Dragging { offset } => Some(pointer - offset),
            Self::Idle => None,
        }
    }

    pub fn release(&mut self) {
        *self = Self::Idle;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, vec2};

    #[test]
    fn window_follows_pointer_by_press_offset() {
        let mut drag = DragState::default();
        assert_eq!(drag.move_to(pos2(10.0, 10.0)), None);

        drag.press(pos2(1500.0, 700.0), pos2(1450.0, 500.0));
        assert_eq!(drag, DragState::Dragging { offset: vec2(50.0, 200.0) });
        assert_eq!(drag.move_to(pos2(1000.0, 600.0)), Some(pos2(950.0, 400.0)));

        drag.release();
        assert!(!drag.is_dragging());
        assert_eq!(drag.move_to(pos2(0.0, 0.0)), None);
    }
}

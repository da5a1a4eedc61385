use serde::{Deserialize, Serialize};

/// Named animation an actor can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AnimationType {
    #[default]
    Idle,
    Walk,
    Run,
    Jump,
    Fall,
    /// Keep whatever animation is playing.
    Current,
    /// No animation change.
    None,
}

impl AnimationType {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "IDLE" => Some(AnimationType::Idle),
            "WALK" => Some(AnimationType::Walk),
            "RUN" => Some(AnimationType::Run),
            "JUMP" => Some(AnimationType::Jump),
            "FALL" => Some(AnimationType::Fall),
            "CURRENT" => Some(AnimationType::Current),
            "NONE" => Some(AnimationType::None),
            _ => None,
        }
    }
}

/// Facing direction used to pick an animation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
    /// Keep the current facing.
    Current,
}

impl Direction {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "UP" => Some(Direction::Up),
            "DOWN" => Some(Direction::Down),
            "LEFT" => Some(Direction::Left),
            "RIGHT" => Some(Direction::Right),
            "CURRENT" => Some(Direction::Current),
            _ => None,
        }
    }
}

/// Animation currently shown by an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnimationState {
    pub kind: AnimationType,
    pub direction: Direction,
    /// Frame index within the current animation.
    pub frame: u32,
}

impl AnimationState {
    /// Apply a requested change. `Current` keeps the existing part and `None`
    /// leaves the animation untouched. A new kind starts at frame 0.
    pub fn apply(&mut self, kind: AnimationType, direction: Direction) {
        match kind {
            AnimationType::Current | AnimationType::None => {}
            other if other != self.kind => {
                self.kind = other;
                self.frame = 0;
            }
            _ => {}
        }
        if direction != Direction::Current {
            self.direction = direction;
        }
    }

    /// Apply `kind` and `direction`, then pin the frame index.
    pub fn set_frame(&mut self, kind: AnimationType, direction: Direction, frame: u32) {
        self.apply(kind, direction);
        self.frame = frame;
    }
}

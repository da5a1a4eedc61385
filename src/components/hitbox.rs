//! Named axis-aligned hitboxes attached to actors.
use bevy_ecs::prelude::Component;
use glam::Vec2;
use smallvec::SmallVec;

/// A named rectangle relative to the actor position.
#[derive(Debug, Clone, PartialEq)]
pub struct Hitbox {
    pub name: String,
    pub size: Vec2,
    pub offset: Vec2,
}

impl Hitbox {
    /// Create a Hitbox with given name and size
    pub fn new(name: impl Into<String>, width: f32, height: f32) -> Self {
        Self {
            name: name.into(),
            size: Vec2::new(width, height),
            offset: Vec2::ZERO,
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Returns (min, max) of the hitbox for a given actor position.
    /// Handles negative size by normalizing to proper min/max.
    pub fn aabb(&self, position: Vec2) -> (Vec2, Vec2) {
        let p0 = position + self.offset;
        let p1 = p0 + self.size;
        (p0.min(p1), p0.max(p1))
    }

    /// AABB overlap test against another hitbox at a different actor position.
    pub fn overlaps(&self, position: Vec2, other: &Self, other_position: Vec2) -> bool {
        let (min_a, max_a) = self.aabb(position);
        let (min_b, max_b) = other.aabb(other_position);
        aabb_overlap(min_a, max_a, min_b, max_b)
    }
}

/// Strict AABB overlap: touching edges do not count.
pub fn aabb_overlap(min_a: Vec2, max_a: Vec2, min_b: Vec2, max_b: Vec2) -> bool {
    min_a.x < max_b.x && max_a.x > min_b.x && min_a.y < max_b.y && max_a.y > min_b.y
}

/// All hitboxes of one actor.
#[derive(Debug, Clone, Default, PartialEq, Component)]
pub struct Hitboxes(pub SmallVec<[Hitbox; 2]>);

impl Hitboxes {
    pub fn get(&self, name: &str) -> Option<&Hitbox> {
        self.0.iter().find(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// Bounding box of every hitbox, or a zero-size box at the position.
    pub fn bounds(&self, position: Vec2) -> (Vec2, Vec2) {
        self.0
            .iter()
            .map(|h| h.aabb(position))
            .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)))
            .unwrap_or((position, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_normalizes_negative_size() {
        let h = Hitbox::new("BODY", -10.0, -4.0);
        let (min, max) = h.aabb(Vec2::new(10.0, 10.0));
        assert_eq!(min, Vec2::new(0.0, 6.0));
        assert_eq!(max, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_overlap_respects_offset() {
        let a = Hitbox::new("SWORD", 8.0, 8.0).with_offset(Vec2::new(16.0, 0.0));
        let b = Hitbox::new("BODY", 8.0, 8.0);
        assert!(a.overlaps(Vec2::ZERO, &b, Vec2::new(20.0, 2.0)));
        assert!(!a.overlaps(Vec2::ZERO, &b, Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = Hitbox::new("A", 10.0, 10.0);
        let b = Hitbox::new("B", 10.0, 10.0);
        assert!(!a.overlaps(Vec2::ZERO, &b, Vec2::new(10.0, 0.0)));
    }

    #[test]
    fn test_bounds_unions_hitboxes() {
        let boxes = Hitboxes(SmallVec::from_vec(vec![
            Hitbox::new("BODY", 10.0, 20.0),
            Hitbox::new("FEET", 4.0, 4.0).with_offset(Vec2::new(3.0, 20.0)),
        ]));
        let (min, max) = boxes.bounds(Vec2::new(5.0, 5.0));
        assert_eq!(min, Vec2::new(5.0, 5.0));
        assert_eq!(max, Vec2::new(15.0, 29.0));
        assert!(boxes.get("feet").is_some());
    }
}

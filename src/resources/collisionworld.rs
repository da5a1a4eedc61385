//! Per-tick collision snapshot.
//!
//! The collision system copies every actor's position and hitboxes into
//! [`CollisionWorld`] before behavior runs. Nodes then query overlaps and the
//! ground distance against this snapshot, so the answers do not depend on the
//! order actors are evaluated in. Coordinates are y-down.

use bevy_ecs::prelude::Resource;
use glam::Vec2;
use rustc_hash::FxHashSet;

use crate::behavior::services::CollisionService;
use crate::behavior::table::RawRect;
use crate::components::actor::{ActorId, ActorInstance};
use crate::components::hitbox::Hitboxes;

/// Static level geometry actors can stand on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solid {
    pub min: Vec2,
    pub max: Vec2,
}

impl Solid {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        let p0 = Vec2::new(x, y);
        let p1 = p0 + Vec2::new(width, height);
        Self {
            min: p0.min(p1),
            max: p0.max(p1),
        }
    }
}

impl From<&RawRect> for Solid {
    fn from(rect: &RawRect) -> Self {
        Solid::new(rect.x, rect.y, rect.width, rect.height)
    }
}

/// One actor as seen by the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorBody {
    pub id: ActorId,
    pub template: String,
    pub position: Vec2,
    pub hitboxes: Hitboxes,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct CollisionWorld {
    bodies: Vec<ActorBody>,
    solids: Vec<Solid>,
    /// Actors overlapping at least one other actor.
    contacts: FxHashSet<ActorId>,
}

impl CollisionWorld {
    pub fn with_solids(solids: Vec<Solid>) -> Self {
        Self {
            solids,
            ..Default::default()
        }
    }

    pub fn solids(&self) -> &[Solid] {
        &self.solids
    }

    /// Replace the actor snapshot and recompute contacts.
    pub fn set_bodies(&mut self, bodies: Vec<ActorBody>) {
        self.contacts.clear();
        for (i, a) in bodies.iter().enumerate() {
            for b in &bodies[i + 1..] {
                if bodies_touch(a, b) {
                    self.contacts.insert(a.id);
                    self.contacts.insert(b.id);
                }
            }
        }
        self.bodies = bodies;
    }

    /// Whether `actor` overlapped any other actor when the snapshot was taken.
    pub fn touching(&self, actor: ActorId) -> bool {
        self.contacts.contains(&actor)
    }

    fn body(&self, actor: ActorId) -> Option<&ActorBody> {
        self.bodies.iter().find(|b| b.id == actor)
    }
}

fn bodies_touch(a: &ActorBody, b: &ActorBody) -> bool {
    a.hitboxes.0.iter().any(|ha| {
        b.hitboxes
            .0
            .iter()
            .any(|hb| ha.overlaps(a.position, hb, b.position))
    })
}

impl CollisionService for CollisionWorld {
    fn overlaps(&self, actor: ActorId, mine: &str, theirs: &str, other: Option<&str>) -> bool {
        let Some(me) = self.body(actor) else {
            return false;
        };
        let Some(my_box) = me.hitboxes.get(mine) else {
            return false;
        };
        self.bodies
            .iter()
            .filter(|b| b.id != actor)
            .filter(|b| other.is_none_or(|name| b.template.eq_ignore_ascii_case(name)))
            .filter_map(|b| b.hitboxes.get(theirs).map(|h| (b.position, h)))
            .any(|(pos, h)| my_box.overlaps(me.position, h, pos))
    }

    fn support_distance(&self, actor: &ActorInstance) -> f32 {
        let hitboxes = self.body(actor.id).map(|b| &b.hitboxes);
        let (min, max) = match hitboxes {
            Some(h) => h.bounds(actor.position),
            None => (actor.position, actor.position),
        };
        self.solids
            .iter()
            .filter(|s| s.min.x < max.x && s.max.x > min.x)
            .filter(|s| s.min.y >= min.y)
            .map(|s| s.min.y - max.y)
            .fold(f32::INFINITY, f32::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hitbox::Hitbox;
    use smallvec::smallvec;

    fn body(id: u64, template: &str, x: f32, y: f32) -> ActorBody {
        ActorBody {
            id: ActorId(id),
            template: template.into(),
            position: Vec2::new(x, y),
            hitboxes: Hitboxes(smallvec![Hitbox::new("BODY", 10.0, 20.0)]),
        }
    }

    #[test]
    fn test_overlap_by_hitbox_name_and_template() {
        let mut world = CollisionWorld::default();
        world.set_bodies(vec![
            body(1, "Hero", 0.0, 0.0),
            body(2, "Coin", 5.0, 5.0),
            body(3, "Slime", 100.0, 0.0),
        ]);
        assert!(world.overlaps(ActorId(1), "body", "BODY", None));
        assert!(world.overlaps(ActorId(1), "BODY", "BODY", Some("coin")));
        assert!(!world.overlaps(ActorId(1), "BODY", "BODY", Some("Slime")));
        assert!(!world.overlaps(ActorId(1), "FEET", "BODY", None));
        assert!(world.touching(ActorId(1)));
        assert!(world.touching(ActorId(2)));
        assert!(!world.touching(ActorId(3)));
    }

    #[test]
    fn test_support_distance() {
        let mut world = CollisionWorld::with_solids(vec![Solid::new(-50.0, 100.0, 200.0, 10.0)]);
        world.set_bodies(vec![body(1, "Hero", 0.0, 50.0)]);
        let mut actor = ActorInstance::new(ActorId(1), "Hero", Vec2::new(0.0, 50.0));
        // Feet at y = 70.
        assert!((world.support_distance(&actor) - 30.0).abs() < 1e-4);

        actor.position.y = 82.0;
        assert!(world.support_distance(&actor) <= 0.0);

        actor.position.x = 500.0;
        assert_eq!(world.support_distance(&actor), f32::INFINITY);
    }
}

//! Velocity and position integration primitives.
//!
//! All functions are pure and operate on one axis at a time so the
//! interpreter can skip axes claimed by a higher-priority action.

use glam::Vec2;

/// `v + factor*dt`, clamped toward `max` when the bound shares the factor's
/// sign. A zero bound counts as sharing either sign. A bound of the opposite
/// sign is ignored.
pub fn accelerate(velocity: f32, factor: f32, max: Option<f32>, dt: f32) -> f32 {
    let next = velocity + factor * dt;
    match max {
        Some(bound) if factor > 0.0 && bound >= 0.0 => next.min(bound),
        Some(bound) if factor < 0.0 && bound <= 0.0 => next.max(bound),
        _ => next,
    }
}

/// Move `velocity` toward zero by `rate*dt` without crossing zero.
pub fn decelerate(velocity: f32, rate: f32, dt: f32) -> f32 {
    let step = (rate * dt).abs();
    if velocity > 0.0 {
        (velocity - step).max(0.0)
    } else if velocity < 0.0 {
        (velocity + step).min(0.0)
    } else {
        0.0
    }
}

/// `pos + v*dt`.
pub fn integrate(position: Vec2, velocity: Vec2, dt: f32) -> Vec2 {
    position + velocity * dt
}

/// Kinematics of a jump reaching `height` at its apex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpProfile {
    /// Time to apex, `duration * (1 - slow_factor)`.
    pub apex_time: f32,
    /// Upward speed at takeoff, `2H / Ta`.
    pub initial_speed: f32,
}

impl JumpProfile {
    /// `None` when the apex time is not positive.
    pub fn new(height: f32, duration: f32, slow_factor: f32) -> Option<Self> {
        let apex_time = duration * (1.0 - slow_factor);
        if !(apex_time > 0.0) {
            return None;
        }
        Some(Self {
            apex_time,
            initial_speed: 2.0 * height / apex_time,
        })
    }
}

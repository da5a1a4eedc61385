use bevy_ecs::prelude::Resource;

/// Simulation clock advanced once per tick by the host loop.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct WorldTime {
    /// Scaled seconds since the first tick.
    pub elapsed: f32,
    /// Scaled length of the current tick.
    pub delta: f32,
    pub time_scale: f32,
    /// 1-based number of the current tick, 0 before the first one.
    pub tick: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        Self {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            tick: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Start the next tick of `dt` unscaled seconds.
    pub fn advance(&mut self, dt: f32) {
        self.tick += 1;
        self.delta = dt * self.time_scale;
        self.elapsed += self.delta;
    }
}

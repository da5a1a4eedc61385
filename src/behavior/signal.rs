//! Per-evaluation signal state: the STOP flag and physics axis locks.

/// Physics axis touched by accelerate/decelerate nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn bit(self) -> u8 {
        match self {
            Axis::X => 1,
            Axis::Y => 2,
        }
    }
}

/// Axes claimed during one tick of sustained actions. An action may keep
/// using axes it claimed itself; only axes held by earlier (higher-ranked)
/// actions are off limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisLocks {
    held: u8,
}

impl AxisLocks {
    pub fn is_held(&self, axis: Axis) -> bool {
        self.held & axis.bit() != 0
    }

    pub fn hold(&mut self, axis: Axis) {
        self.held |= axis.bit();
    }
}

/// STOP flag scoped to one `evaluate` call, plus the axis bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct SignalBus {
    stop: bool,
    inherited: AxisLocks,
    claimed: AxisLocks,
}

impl SignalBus {
    pub fn new(inherited: AxisLocks) -> Self {
        Self {
            stop: false,
            inherited,
            claimed: AxisLocks::default(),
        }
    }

    pub fn raise_stop(&mut self) {
        self.stop = true;
    }

    pub fn stopped(&self) -> bool {
        self.stop
    }

    /// Whether this evaluation may write `axis`.
    pub fn may_use(&self, axis: Axis) -> bool {
        !self.inherited.is_held(axis)
    }

    pub fn claim(&mut self, axis: Axis) {
        self.claimed.hold(axis);
    }

    /// Inherited locks plus everything this evaluation claimed.
    pub fn locks(&self) -> AxisLocks {
        AxisLocks {
            held: self.inherited.held | self.claimed.held,
        }
    }
}

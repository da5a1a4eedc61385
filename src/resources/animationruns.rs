//! Tick-counting animation controller.
//!
//! Tracks every timed animation run requested by an `animate` node. A run is
//! keyed by actor and requesting node and advances one game tick per request.
//! Lengths in animation frames and cycles are converted to ticks with the
//! configured frame timing.

use bevy_ecs::prelude::Resource;
use log::trace;
use rustc_hash::FxHashMap;

use crate::behavior::node::NodeId;
use crate::behavior::services::{
    AnimationController, AnimationProgress, AnimationRequest, FrameLength,
};
use crate::components::actor::ActorId;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Run {
    request: AnimationRequest,
    ticks: u32,
    /// Requested since the last sweep.
    touched: bool,
}

#[derive(Resource, Debug, Clone)]
pub struct AnimationRuns {
    /// Frames in one animation cycle.
    pub frames_per_cycle: u32,
    /// Game ticks per animation frame.
    pub ticks_per_frame: u32,
    runs: FxHashMap<(ActorId, NodeId), Run>,
}

impl Default for AnimationRuns {
    fn default() -> Self {
        Self::new(4, 6)
    }
}

impl AnimationRuns {
    pub fn new(frames_per_cycle: u32, ticks_per_frame: u32) -> Self {
        Self {
            frames_per_cycle,
            ticks_per_frame,
            runs: FxHashMap::default(),
        }
    }

    /// Ticks a timed request lasts, or `None` for untimed ones.
    pub fn duration(&self, frames: FrameLength) -> Option<u32> {
        let ticks = match frames {
            FrameLength::Once | FrameLength::Continuous => return None,
            FrameLength::GameFrames(n) => n,
            FrameLength::AnimationFrames(n) => n.saturating_mul(self.ticks_per_frame),
            FrameLength::Cycles(n) => n
                .saturating_mul(self.frames_per_cycle)
                .saturating_mul(self.ticks_per_frame),
        };
        Some(ticks.max(1))
    }

    pub fn is_running(&self, actor: ActorId, node: NodeId) -> bool {
        self.runs.contains_key(&(actor, node))
    }

    /// Drop every run of a removed actor.
    pub fn forget_actor(&mut self, actor: ActorId) {
        self.runs.retain(|(owner, _), _| *owner != actor);
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Drop runs that were not requested since the previous sweep. A timed
    /// animation only progresses while its node keeps asking for it.
    pub fn sweep(&mut self) {
        let before = self.runs.len();
        self.runs.retain(|_, run| std::mem::take(&mut run.touched));
        let dropped = before - self.runs.len();
        if dropped > 0 {
            trace!("Dropped {} abandoned animation run(s)", dropped);
        }
    }
}

impl AnimationController for AnimationRuns {
    fn request(
        &mut self,
        actor: ActorId,
        node: NodeId,
        request: AnimationRequest,
    ) -> AnimationProgress {
        let Some(duration) = self.duration(request.frames) else {
            return match request.frames {
                FrameLength::Continuous => AnimationProgress::Running,
                _ => AnimationProgress::Completed,
            };
        };

        let fresh = Run {
            request,
            ticks: 0,
            touched: true,
        };
        let run = self.runs.entry((actor, node)).or_insert(fresh);
        if run.request != request {
            *run = fresh;
        }
        run.touched = true;
        run.ticks += 1;
        trace!(
            "Animation {:?} for {:?}: tick {}/{}",
            request.kind, actor, run.ticks, duration
        );
        if run.ticks >= duration {
            self.runs.remove(&(actor, node));
            AnimationProgress::Completed
        } else {
            AnimationProgress::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::animation::{AnimationType, Direction};

    fn req(frames: FrameLength) -> AnimationRequest {
        AnimationRequest {
            kind: AnimationType::Walk,
            direction: Direction::Left,
            frames,
        }
    }

    fn ticks_until_done(runs: &mut AnimationRuns, frames: FrameLength) -> u32 {
        let mut ticks = 0;
        loop {
            ticks += 1;
            if runs.request(ActorId(1), NodeId(0), req(frames)) == AnimationProgress::Completed {
                return ticks;
            }
            assert!(ticks < 10_000);
        }
    }

    #[test]
    fn test_durations() {
        let mut runs = AnimationRuns::new(4, 6);
        assert_eq!(ticks_until_done(&mut runs, FrameLength::Once), 1);
        assert_eq!(ticks_until_done(&mut runs, FrameLength::GameFrames(10)), 10);
        assert_eq!(ticks_until_done(&mut runs, FrameLength::AnimationFrames(2)), 12);
        assert_eq!(ticks_until_done(&mut runs, FrameLength::Cycles(2)), 48);
        assert_eq!(ticks_until_done(&mut runs, FrameLength::GameFrames(0)), 1);
    }

    #[test]
    fn test_continuous_never_completes() {
        let mut runs = AnimationRuns::default();
        for _ in 0..100 {
            assert_eq!(
                runs.request(ActorId(1), NodeId(0), req(FrameLength::Continuous)),
                AnimationProgress::Running
            );
        }
    }

    #[test]
    fn test_runs_are_per_actor_and_node() {
        let mut runs = AnimationRuns::new(1, 1);
        let frames = FrameLength::GameFrames(2);
        runs.request(ActorId(1), NodeId(0), req(frames));
        assert!(runs.is_running(ActorId(1), NodeId(0)));
        assert!(!runs.is_running(ActorId(2), NodeId(0)));
        assert_eq!(
            runs.request(ActorId(2), NodeId(0), req(frames)),
            AnimationProgress::Running
        );
        runs.forget_actor(ActorId(1));
        assert!(!runs.is_running(ActorId(1), NodeId(0)));
        assert!(runs.is_running(ActorId(2), NodeId(0)));
    }

    #[test]
    fn test_changed_request_restarts_run() {
        let mut runs = AnimationRuns::new(1, 1);
        runs.request(ActorId(1), NodeId(0), req(FrameLength::GameFrames(3)));
        runs.request(ActorId(1), NodeId(0), req(FrameLength::GameFrames(3)));
        assert_eq!(ticks_until_done(&mut runs, FrameLength::GameFrames(4)), 4);
    }

    #[test]
    fn test_sweep_drops_abandoned_runs() {
        let mut runs = AnimationRuns::new(1, 1);
        let frames = FrameLength::GameFrames(5);
        runs.request(ActorId(1), NodeId(0), req(frames));
        runs.request(ActorId(2), NodeId(0), req(frames));
        runs.sweep();
        assert_eq!(runs.len(), 2);

        // Only actor 2 keeps asking.
        runs.request(ActorId(2), NodeId(0), req(frames));
        runs.sweep();
        assert!(!runs.is_running(ActorId(1), NodeId(0)));
        assert!(runs.is_running(ActorId(2), NodeId(0)));

        runs.sweep();
        assert!(runs.is_empty());
    }
}

//! The interpreter: evaluates one root node for one actor on one tick.
//!
//! Evaluation is a synchronous depth-first walk. Each node kind is handled by
//! a single dispatch in [`Interpreter::apply`]. Node faults never escape: the
//! node fails, a warning is logged and the fault is returned in the
//! [`Evaluation`] report.

use std::cmp::Ordering;

use glam::Vec2;
use log::{debug, trace, warn};

use super::error::{LookupError, NodeFault, RuntimeFault, VariableError};
use super::graph::NodeGraph;
use super::node::{
    CompareOps, Edge, FrameSpec, NodeDefinition, NodeId, NodeKind, SetOp, Signal, SwitchMode,
};
use super::physics::{self, JumpProfile};
use super::services::{
    AnimationProgress, AnimationRequest, FrameLength, MapContext, MusicRequest, SpawnRequest,
    TextRequest,
};
use super::signal::{Axis, AxisLocks, SignalBus};
use super::value::{FromValue, Param, Value, VariableLookup};
use super::variables::{self, ScopedLookup};
use crate::components::actor::ActorInstance;
use crate::components::animation::{AnimationType, Direction};

/// Default bound on nested node evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn from_bool(ok: bool) -> Self {
        if ok { Outcome::Success } else { Outcome::Failure }
    }

    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

/// Result of one `evaluate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub outcome: Outcome,
    /// Whether any node raised STOP.
    pub stop_raised: bool,
    pub faults: Vec<NodeFault>,
}

/// State threaded through one evaluation.
struct Frame<'f, 'c> {
    actor: &'f mut ActorInstance,
    ctx: &'f mut MapContext<'c>,
    dt: f32,
    bus: SignalBus,
    faults: Vec<NodeFault>,
}

impl Frame<'_, '_> {
    fn vars(&self) -> ScopedLookup<'_> {
        ScopedLookup {
            actor: &*self.actor,
            map: &*self.ctx.variables,
        }
    }

    fn read<T: FromValue + Clone>(&self, param: &Param<T>) -> Result<T, RuntimeFault> {
        Ok(param.resolve(&self.vars())?)
    }

    fn count(&self, param: &Param<i32>) -> Result<u32, RuntimeFault> {
        Ok(self.read(param)?.max(0) as u32)
    }

    /// Like [`Frame::count`], but a negative value is a fault.
    fn index(&self, param: &Param<i32>, property: &'static str) -> Result<u32, RuntimeFault> {
        let value = self.read(param)?;
        u32::try_from(value).map_err(|_| RuntimeFault::InvalidParameter {
            property,
            reason: format!("{value} is negative"),
        })
    }

    /// Apply `f` to one velocity component unless the axis is held elsewhere.
    fn drive(&mut self, axis: Axis, factor: f32, f: impl FnOnce(f32, f32) -> f32) {
        if factor == 0.0 || !self.bus.may_use(axis) {
            return;
        }
        let dt = self.dt;
        let v = match axis {
            Axis::X => &mut self.actor.velocity.x,
            Axis::Y => &mut self.actor.velocity.y,
        };
        *v = f(*v, dt);
        self.bus.claim(axis);
    }

    fn hint_animation(&mut self, node: NodeId, kind: AnimationType) {
        if kind == AnimationType::None {
            return;
        }
        self.actor.animation.apply(kind, Direction::Current);
        let request = AnimationRequest {
            kind: self.actor.animation.kind,
            direction: self.actor.animation.direction,
            frames: FrameLength::Continuous,
        };
        self.ctx.animation.request(self.actor.id, node, request);
    }
}

/// Walks nodes of a [`NodeGraph`].
#[derive(Debug, Clone, Copy)]
pub struct Interpreter<'g> {
    graph: &'g NodeGraph,
    max_depth: usize,
}

impl<'g> Interpreter<'g> {
    pub fn new(graph: &'g NodeGraph) -> Self {
        Self {
            graph,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn graph(&self) -> &'g NodeGraph {
        self.graph
    }

    /// Root-event invocation for the game loop.
    pub fn tick(
        &self,
        actor: &mut ActorInstance,
        root: &str,
        ctx: &mut MapContext<'_>,
        dt: f32,
    ) -> Outcome {
        self.evaluate(root, actor, ctx, dt).outcome
    }

    /// Evaluate the node named `root`, looked up in the actor's namespace and
    /// then map-global.
    pub fn evaluate(
        &self,
        root: &str,
        actor: &mut ActorInstance,
        ctx: &mut MapContext<'_>,
        dt: f32,
    ) -> Evaluation {
        let namespace = actor.namespace();
        match self.graph.resolve_name(&namespace, root, false) {
            Some(id) => self.evaluate_node(id, actor, ctx, dt, &mut AxisLocks::default()),
            None => {
                let fault = RuntimeFault::Lookup(LookupError::NameNotFound {
                    namespace,
                    name: root.to_string(),
                });
                warn!("Root event '{}' failed: {}", root, fault);
                Evaluation {
                    outcome: Outcome::Failure,
                    stop_raised: false,
                    faults: vec![NodeFault {
                        node: root.to_string(),
                        fault,
                    }],
                }
            }
        }
    }

    /// Evaluate `root` honoring axes already held in `locks`; the axes this
    /// evaluation drives are added to `locks`.
    pub fn evaluate_node(
        &self,
        root: NodeId,
        actor: &mut ActorInstance,
        ctx: &mut MapContext<'_>,
        dt: f32,
        locks: &mut AxisLocks,
    ) -> Evaluation {
        let mut frame = Frame {
            actor,
            ctx,
            dt,
            bus: SignalBus::new(*locks),
            faults: Vec::new(),
        };
        let outcome = self.run(&mut frame, root, 0);
        *locks = frame.bus.locks();
        Evaluation {
            outcome,
            stop_raised: frame.bus.stopped(),
            faults: frame.faults,
        }
    }

    fn run(&self, frame: &mut Frame<'_, '_>, id: NodeId, depth: usize) -> Outcome {
        let node = self.graph.node(id);
        if depth > self.max_depth {
            return self.fail(frame, node, RuntimeFault::DepthExceeded(self.max_depth));
        }
        trace!("{} '{}' for actor {:?}", node.kind.tag(), node.name, frame.actor.id);
        match self.apply(frame, id, node, depth) {
            Ok(Outcome::Success) => {
                let deferred = matches!(node.kind, NodeKind::Animate { .. });
                if node.signal == Some(Signal::Stop) && !deferred {
                    frame.bus.raise_stop();
                }
                Outcome::Success
            }
            Ok(Outcome::Failure) => Outcome::Failure,
            Err(fault) => self.fail(frame, node, fault),
        }
    }

    fn fail(&self, frame: &mut Frame<'_, '_>, node: &NodeDefinition<Edge>, fault: RuntimeFault) -> Outcome {
        warn!("Node '{}' failed: {}", node.name, fault);
        frame.faults.push(NodeFault {
            node: node.name.clone(),
            fault,
        });
        Outcome::Failure
    }

    fn target(
        &self,
        frame: &Frame<'_, '_>,
        node: &NodeDefinition<Edge>,
        edge: &Edge,
        map_only: bool,
    ) -> Result<NodeId, RuntimeFault> {
        match edge {
            Edge::Node(id) => Ok(*id),
            Edge::Indirect(var) => {
                let value = frame
                    .vars()
                    .lookup(var)
                    .ok_or_else(|| VariableError::VariableNotFound(var.clone()))?;
                let dynamic = || RuntimeFault::DynamicTarget {
                    variable: var.clone(),
                };
                let name = value.as_str().ok_or_else(dynamic)?;
                self.graph
                    .resolve_name(&node.namespace, name, map_only)
                    .ok_or_else(dynamic)
            }
        }
    }

    fn run_edge(
        &self,
        frame: &mut Frame<'_, '_>,
        node: &NodeDefinition<Edge>,
        edge: &Edge,
        depth: usize,
        map_only: bool,
    ) -> Outcome {
        match self.target(frame, node, edge, map_only) {
            Ok(id) => self.run(frame, id, depth + 1),
            Err(fault) => self.fail(frame, node, fault),
        }
    }

    /// Run the SUCCESS or FAILURE branch of a test, or return the decision.
    fn branch(
        &self,
        frame: &mut Frame<'_, '_>,
        node: &NodeDefinition<Edge>,
        decision: bool,
        depth: usize,
    ) -> Outcome {
        let edge = if decision {
            node.children.success.as_ref()
        } else {
            node.children.failure.as_ref()
        };
        match edge {
            Some(edge) => self.run_edge(frame, node, edge, depth, false),
            None => Outcome::from_bool(decision),
        }
    }

    fn apply(
        &self,
        frame: &mut Frame<'_, '_>,
        id: NodeId,
        node: &NodeDefinition<Edge>,
        depth: usize,
    ) -> Result<Outcome, RuntimeFault> {
        match &node.kind {
            NodeKind::Accelerate {
                x_factor,
                y_factor,
                x_max,
                y_max,
            } => {
                let fx = frame.read(x_factor)?;
                let fy = frame.read(y_factor)?;
                let mx = x_max.as_ref().map(|p| frame.read(p)).transpose()?;
                let my = y_max.as_ref().map(|p| frame.read(p)).transpose()?;
                frame.drive(Axis::X, fx, |v, dt| physics::accelerate(v, fx, mx, dt));
                frame.drive(Axis::Y, fy, |v, dt| physics::accelerate(v, fy, my, dt));
                Ok(Outcome::Success)
            }
            NodeKind::Decelerate { x_factor, y_factor } => {
                let fx = frame.read(x_factor)?;
                let fy = frame.read(y_factor)?;
                frame.drive(Axis::X, fx, |v, dt| physics::decelerate(v, fx, dt));
                frame.drive(Axis::Y, fy, |v, dt| physics::decelerate(v, fy, dt));
                Ok(Outcome::Success)
            }
            NodeKind::Move => {
                frame.actor.position =
                    physics::integrate(frame.actor.position, frame.actor.velocity, frame.dt);
                Ok(Outcome::Success)
            }
            NodeKind::Fall {
                acceleration,
                max_speed,
                animation,
            } => {
                let acc = frame.read(acceleration)?;
                let max = frame.read(max_speed)?;
                if frame.ctx.collision.support_distance(frame.actor) <= 0.0 {
                    // Landed: stop moving into the ground.
                    if frame.actor.velocity.y > 0.0 && frame.bus.may_use(Axis::Y) {
                        frame.actor.velocity.y = 0.0;
                    }
                    return Ok(Outcome::Success);
                }
                frame.drive(Axis::Y, acc, |v, dt| physics::accelerate(v, acc, Some(max), dt));
                frame.hint_animation(id, *animation);
                Ok(Outcome::Success)
            }
            NodeKind::Jump {
                height,
                duration,
                slow_factor,
                animation,
            } => {
                let h = frame.read(height)?;
                let t = frame.read(duration)?;
                let s = frame.read(slow_factor)?;
                let profile =
                    JumpProfile::new(h, t, s).ok_or_else(|| RuntimeFault::InvalidParameter {
                        property: "JUMP_DURATION",
                        reason: format!("apex time {} is not positive", t * (1.0 - s)),
                    })?;
                if frame.bus.may_use(Axis::Y) {
                    frame.actor.velocity.y = -profile.initial_speed;
                    frame.bus.claim(Axis::Y);
                }
                frame.hint_animation(id, *animation);
                Ok(Outcome::Success)
            }
            NodeKind::Multi => {
                let faults_before = frame.faults.len();
                for (_, edge) in &node.children.ordered {
                    self.run_edge(frame, node, edge, depth, false);
                    if frame.bus.stopped() {
                        trace!("Multi '{}' stopped early", node.name);
                        break;
                    }
                }
                Ok(Outcome::from_bool(frame.faults.len() == faults_before))
            }
            NodeKind::SetVar {
                name,
                value,
                op,
                global,
            } => {
                let value = frame.read(value)?;
                if *global {
                    let store = &mut *frame.ctx.variables;
                    match op {
                        SetOp::Assign => store.set(name.as_str(), value, false)?,
                        SetOp::Add => store.set(name.as_str(), value, true)?,
                        SetOp::Multiply => store.multiply(name.as_str(), value)?,
                    }
                } else {
                    let actor = &mut *frame.actor;
                    match op {
                        SetOp::Assign => variables::write_actor(actor, name, value, false)?,
                        SetOp::Add => variables::write_actor(actor, name, value, true)?,
                        SetOp::Multiply => variables::multiply_actor(actor, name, value)?,
                    }
                }
                Ok(Outcome::Success)
            }
            NodeKind::Animate {
                animation,
                direction,
                frames,
            } => {
                let frames = match frames {
                    FrameSpec::Once => FrameLength::Once,
                    FrameSpec::Continuous => FrameLength::Continuous,
                    FrameSpec::GameFrames(p) => FrameLength::GameFrames(frame.count(p)?),
                    FrameSpec::Cycles(p) => FrameLength::Cycles(frame.count(p)?),
                    FrameSpec::AnimationFrames(p) => FrameLength::AnimationFrames(frame.count(p)?),
                };
                frame.actor.animation.apply(*animation, *direction);
                let request = AnimationRequest {
                    kind: frame.actor.animation.kind,
                    direction: frame.actor.animation.direction,
                    frames,
                };
                let progress = frame.ctx.animation.request(frame.actor.id, id, request);
                if progress == AnimationProgress::Completed && node.signal == Some(Signal::Stop)
                {
                    debug!("Animation '{}' completed, raising STOP", node.name);
                    frame.bus.raise_stop();
                }
                Ok(Outcome::Success)
            }
            NodeKind::Sound { path } => {
                let path = frame.read(path)?;
                frame.ctx.host.play(&path);
                Ok(Outcome::Success)
            }
            NodeKind::PlayMusic {
                path,
                repetitions,
                fade_in_ms,
            } => {
                let music = MusicRequest {
                    path: frame.read(path)?,
                    repetitions: frame.read(repetitions)?,
                    fade_in_ms: frame.index(fade_in_ms, "FADE IN")?,
                };
                frame.ctx.host.play_music(music);
                Ok(Outcome::Success)
            }
            NodeKind::Rotate { degrees, absolute } => {
                let deg = frame.read(degrees)?;
                if *absolute {
                    frame.actor.rotation = deg;
                } else {
                    frame.actor.rotation += deg;
                }
                Ok(Outcome::Success)
            }
            NodeKind::SpawnText { text, layer, style } => {
                let text = frame.read(text)?;
                let request = TextRequest {
                    text,
                    layer: layer.clone(),
                    position: frame.actor.position,
                    color: style.color,
                    bold: style.bold,
                    italic: style.italic,
                    underline: style.underline,
                };
                frame.ctx.host.spawn_text(request);
                Ok(Outcome::Success)
            }
            NodeKind::EraseSelf => {
                debug!("Actor {:?} marked for removal", frame.actor.id);
                frame.actor.pending_removal = true;
                Ok(Outcome::Success)
            }
            NodeKind::SpawnActor {
                template,
                layer,
                x_offset,
                y_offset,
                name,
            } => {
                let offset = Vec2::new(frame.read(x_offset)?, frame.read(y_offset)?);
                frame.ctx.host.spawn_actor(SpawnRequest {
                    template: template.clone(),
                    layer: layer.clone(),
                    position: frame.actor.position + offset,
                    name: name.clone(),
                });
                Ok(Outcome::Success)
            }
            NodeKind::SetAnimFrame {
                animation,
                direction,
                frame: index,
            } => {
                let index = frame.index(index, "ANIMATION_FRAME")?;
                frame.actor.animation.set_frame(*animation, *direction, index);
                Ok(Outcome::Success)
            }
            NodeKind::EngineWrapper => match &node.children.event {
                Some(edge) => Ok(self.run_edge(frame, node, edge, depth, true)),
                None => Ok(Outcome::Failure),
            },
            NodeKind::OnGround { tolerance } => {
                let tolerance = frame.read(tolerance)?;
                let distance = frame.ctx.collision.support_distance(frame.actor);
                Ok(self.branch(frame, node, distance <= tolerance, depth))
            }
            NodeKind::Switch { mode } => {
                let mut decision = *mode == SwitchMode::All;
                for (_, edge) in &node.children.ordered {
                    let outcome = self.run_edge(frame, node, edge, depth, false);
                    match (mode, outcome) {
                        (SwitchMode::Any, Outcome::Success) => {
                            decision = true;
                            break;
                        }
                        (SwitchMode::All, Outcome::Failure) => {
                            decision = false;
                            break;
                        }
                        _ => {}
                    }
                }
                Ok(self.branch(frame, node, decision, depth))
            }
            NodeKind::SingleGuard => {
                if !frame.actor.guards.insert(id) {
                    return Ok(Outcome::Failure);
                }
                if let Some(edge) = &node.children.event {
                    self.run_edge(frame, node, edge, depth, false);
                }
                Ok(Outcome::Success)
            }
            NodeKind::Collision {
                my_hitbox,
                other_hitbox,
                other_name,
            } => {
                let hit = frame.ctx.collision.overlaps(
                    frame.actor.id,
                    my_hitbox,
                    other_hitbox,
                    other_name.as_deref(),
                );
                Ok(self.branch(frame, node, hit, depth))
            }
            NodeKind::MouseButton(query) => {
                let state = frame.ctx.pointer.button(query.button);
                let decision = (query.pressed && state.pressed)
                    || (query.released && state.released)
                    || (query.down && state.down);
                Ok(self.branch(frame, node, decision, depth))
            }
            NodeKind::Compare { left, right, ops } => {
                let l = frame.read(left)?;
                let r = frame.read(right)?;
                let decision = compare(&l, &r, *ops)?;
                Ok(self.branch(frame, node, decision, depth))
            }
            NodeKind::LayerState { layer, hidden } => {
                let layer = frame.read(layer)?;
                frame.ctx.host.set_hidden(&layer, *hidden);
                Ok(Outcome::Success)
            }
            NodeKind::TemplateLayer {
                source,
                destination,
            } => {
                frame.ctx.host.instantiate_template(source, destination);
                Ok(Outcome::Success)
            }
            NodeKind::ChangeMap { path, preserve } => {
                let path = frame.read(path)?;
                frame.ctx.host.change_map(&path, *preserve);
                Ok(Outcome::Success)
            }
            NodeKind::CloseMap => {
                frame.ctx.host.close_map();
                Ok(Outcome::Success)
            }
            NodeKind::Quit => {
                frame.ctx.host.quit();
                Ok(Outcome::Success)
            }
        }
    }
}

/// Apply the enabled relations to two values of compatible types.
fn compare(left: &Value, right: &Value, ops: CompareOps) -> Result<bool, RuntimeFault> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => left
            .as_f32()
            .zip(right.as_f32())
            .and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::Str(a) | Value::File(a), Value::Str(b) | Value::File(b)) => Some(a.cmp(b)),
        (Value::Bool(_), Value::Bool(_)) | (Value::Color(_), Value::Color(_)) => {
            if ops.lt || ops.gt {
                return Err(RuntimeFault::Incomparable(left.type_name(), right.type_name()));
            }
            Some(if left == right {
                Ordering::Equal
            } else {
                Ordering::Less
            })
        }
        _ => return Err(RuntimeFault::Incomparable(left.type_name(), right.type_name())),
    };
    Ok(match ordering {
        Some(Ordering::Equal) => ops.eq,
        Some(Ordering::Less) => ops.ne || ops.lt,
        Some(Ordering::Greater) => ops.ne || ops.gt,
        None => ops.ne,
    })
}

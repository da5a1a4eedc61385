//! Collaborator interfaces the interpreter calls into.
//!
//! Rendering, audio and map management live outside the interpreter. Nodes
//! only issue requests through these traits. [`Outbox`] records the
//! fire-and-forget requests so the host can forward them later; the small
//! stand-ins at the bottom serve headless runs and tests.

use glam::Vec2;

use super::node::NodeId;
use super::value::Color;
use super::variables::VariableStore;
use crate::components::actor::{ActorId, ActorInstance};
use crate::components::animation::{AnimationType, Direction};

/// An animation change requested by a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationRequest {
    pub kind: AnimationType,
    pub direction: Direction,
    pub frames: FrameLength,
}

/// Resolved run length of an animation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLength {
    Once,
    GameFrames(u32),
    Cycles(u32),
    AnimationFrames(u32),
    Continuous,
}

impl FrameLength {
    pub fn is_hint(&self) -> bool {
        matches!(self, FrameLength::Continuous)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationProgress {
    Running,
    Completed,
}

/// Drives actor animations. Runs are keyed by actor and requesting node, so
/// repeated requests from the same node continue the same run.
pub trait AnimationController {
    fn request(
        &mut self,
        actor: ActorId,
        node: NodeId,
        request: AnimationRequest,
    ) -> AnimationProgress;
}

/// Background music started by `play-music`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicRequest {
    pub path: String,
    /// Negative loops forever.
    pub repetitions: i32,
    pub fade_in_ms: u32,
}

pub trait AudioService {
    fn play(&mut self, path: &str);
    fn play_music(&mut self, music: MusicRequest);
}

/// Actor created by `spawn-actor`, positioned in map space.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub template: String,
    pub layer: String,
    pub position: Vec2,
    pub name: Option<String>,
}

pub trait MapHost {
    fn change_map(&mut self, path: &str, preserve: bool);
    fn close_map(&mut self);
    fn quit(&mut self);
    fn instantiate_template(&mut self, source: &str, destination: &str);
    fn spawn_actor(&mut self, spawn: SpawnRequest);
}

/// Text overlay created by `spawn-text`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub text: String,
    pub layer: String,
    pub position: Vec2,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

pub trait LayerHost {
    fn set_hidden(&mut self, layer: &str, hidden: bool);
    fn spawn_text(&mut self, text: TextRequest);
}

pub trait CollisionService {
    /// Whether `actor`'s hitbox `mine` overlaps hitbox `theirs` of another
    /// actor this tick, optionally restricted to actors of template `other`.
    fn overlaps(&self, actor: ActorId, mine: &str, theirs: &str, other: Option<&str>) -> bool;

    /// Vertical distance from the actor's feet to the surface below it.
    fn support_distance(&self, actor: &ActorInstance) -> f32;
}

/// State of one pointer button this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub pressed: bool,
    pub released: bool,
    pub down: bool,
}

pub trait PointerState {
    /// Button `index` in 1..=5 (left, middle, right, extra1, extra2).
    fn button(&self, index: u8) -> ButtonState;
}

/// The fire-and-forget collaborators, usually one [`Outbox`].
pub trait Host: AudioService + MapHost + LayerHost {}

impl<T: AudioService + MapHost + LayerHost> Host for T {}

/// Map-level state and collaborators available to one evaluation.
pub struct MapContext<'a> {
    pub variables: &'a mut VariableStore,
    pub animation: &'a mut dyn AnimationController,
    pub host: &'a mut dyn Host,
    pub collision: &'a dyn CollisionService,
    pub pointer: &'a dyn PointerState,
}

/// A recorded collaborator request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    PlaySound(String),
    PlayMusic(MusicRequest),
    ChangeMap { path: String, preserve: bool },
    CloseMap,
    Quit,
    InstantiateTemplate { source: String, destination: String },
    SetLayerHidden { layer: String, hidden: bool },
    SpawnText(TextRequest),
    SpawnActor(SpawnRequest),
}

/// Records audio, map and layer requests in issue order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outbox {
    pub requests: Vec<Request>,
}

impl Outbox {
    pub fn drain(&mut self) -> std::vec::Drain<'_, Request> {
        self.requests.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl AudioService for Outbox {
    fn play(&mut self, path: &str) {
        self.requests.push(Request::PlaySound(path.to_string()));
    }

    fn play_music(&mut self, music: MusicRequest) {
        self.requests.push(Request::PlayMusic(music));
    }
}

impl MapHost for Outbox {
    fn change_map(&mut self, path: &str, preserve: bool) {
        self.requests.push(Request::ChangeMap {
            path: path.to_string(),
            preserve,
        });
    }

    fn close_map(&mut self) {
        self.requests.push(Request::CloseMap);
    }

    fn quit(&mut self) {
        self.requests.push(Request::Quit);
    }

    fn instantiate_template(&mut self, source: &str, destination: &str) {
        self.requests.push(Request::InstantiateTemplate {
            source: source.to_string(),
            destination: destination.to_string(),
        });
    }

    fn spawn_actor(&mut self, spawn: SpawnRequest) {
        self.requests.push(Request::SpawnActor(spawn));
    }
}

impl LayerHost for Outbox {
    fn set_hidden(&mut self, layer: &str, hidden: bool) {
        self.requests.push(Request::SetLayerHidden {
            layer: layer.to_string(),
            hidden,
        });
    }

    fn spawn_text(&mut self, text: TextRequest) {
        self.requests.push(Request::SpawnText(text));
    }
}

/// Fixed collision answers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticCollision {
    pub overlapping: bool,
    pub support: f32,
}

impl Default for StaticCollision {
    fn default() -> Self {
        Self {
            overlapping: false,
            support: f32::INFINITY,
        }
    }
}

impl CollisionService for StaticCollision {
    fn overlaps(&self, _actor: ActorId, _mine: &str, _theirs: &str, _other: Option<&str>) -> bool {
        self.overlapping
    }

    fn support_distance(&self, _actor: &ActorInstance) -> f32 {
        self.support
    }
}

/// Fixed pointer button states, index 1 first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerSnapshot {
    pub buttons: [ButtonState; 5],
}

impl PointerState for PointerSnapshot {
    fn button(&self, index: u8) -> ButtonState {
        index
            .checked_sub(1)
            .and_then(|i| self.buttons.get(i as usize))
            .copied()
            .unwrap_or_default()
    }
}

/// Animation controller whose runs complete on the first request.
#[derive(Debug, Clone, Default)]
pub struct InstantAnimation {
    pub requests: Vec<(ActorId, AnimationRequest)>,
}

impl AnimationController for InstantAnimation {
    fn request(
        &mut self,
        actor: ActorId,
        _node: NodeId,
        request: AnimationRequest,
    ) -> AnimationProgress {
        self.requests.push((actor, request));
        if request.frames.is_hint() {
            AnimationProgress::Running
        } else {
            AnimationProgress::Completed
        }
    }
}

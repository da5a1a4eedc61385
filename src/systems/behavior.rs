//! The behavior system: one interpreter pass over every actor per tick.
//!
//! Actors are evaluated sequentially in spawn order. For each actor:
//! 1. `ON_SPAWN` on its first tick
//! 2. key bindings through the [`KeyBindingDispatcher`]
//! 3. `ON_ALWAYS`
//! 4. `ON_COLLISION` when the collision snapshot shows it touching another actor
//!
//! Fire-and-forget requests are collected in an [`Outbox`] and written out as
//! messages once every actor has run. Animation runs nobody asked for this
//! tick are dropped.

use bevy_ecs::prelude::*;
use bevy_ecs::system::SystemParam;
use log::warn;

use crate::behavior::dispatch::KeyBindingDispatcher;
use crate::behavior::engine::Interpreter;
use crate::behavior::graph::ActorTemplate;
use crate::behavior::node::NodeId;
use crate::behavior::services::{MapContext, Outbox, Request};
use crate::components::actor::ActorInstance;
use crate::events::audio::AudioCmd;
use crate::events::layer::LayerCmd;
use crate::events::map::MapCmd;
use crate::resources::animationruns::AnimationRuns;
use crate::resources::behaviorgraph::BehaviorGraph;
use crate::resources::collisionworld::CollisionWorld;
use crate::resources::input::InputState;
use crate::resources::mapstate::MapState;
use crate::resources::worldtime::WorldTime;

/// Message writers for the collaborator requests.
#[derive(SystemParam)]
pub struct RequestWriters<'w> {
    pub audio_cmds: MessageWriter<'w, AudioCmd>,
    pub map_cmds: MessageWriter<'w, MapCmd>,
    pub layer_cmds: MessageWriter<'w, LayerCmd>,
}

impl RequestWriters<'_> {
    /// Forward every recorded request, in issue order.
    pub fn flush(&mut self, outbox: &mut Outbox) {
        for request in outbox.drain() {
            match request {
                Request::PlaySound(path) => {
                    self.audio_cmds.write(AudioCmd::PlayFx { path });
                }
                Request::ChangeMap { path, preserve } => {
                    self.map_cmds.write(MapCmd::Change { path, preserve });
                }
                Request::CloseMap => {
                    self.map_cmds.write(MapCmd::Close);
                }
                Request::Quit => {
                    self.map_cmds.write(MapCmd::Quit);
                }
                Request::InstantiateTemplate {
                    source,
                    destination,
                } => {
                    self.map_cmds.write(MapCmd::InstantiateTemplate {
                        source,
                        destination,
                    });
                }
                Request::SetLayerHidden { layer, hidden } => {
                    self.layer_cmds.write(LayerCmd::SetHidden { layer, hidden });
                }
                Request::SpawnText(text) => {
                    self.layer_cmds.write(LayerCmd::SpawnText(text));
                }
                Request::PlayMusic(music) => {
                    self.audio_cmds.write(AudioCmd::PlayMusic(music));
                }
                Request::SpawnActor(spawn) => {
                    self.map_cmds.write(MapCmd::SpawnActor(spawn));
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn behavior_system(
    graph: Res<BehaviorGraph>,
    input: Res<InputState>,
    collision: Res<CollisionWorld>,
    time: Res<WorldTime>,
    mut map: ResMut<MapState>,
    mut runs: ResMut<AnimationRuns>,
    mut actors: Query<&mut ActorInstance>,
    mut writers: RequestWriters,
) {
    let interpreter = graph.interpreter();
    let dispatcher = KeyBindingDispatcher::new(interpreter);
    let mut outbox = Outbox::default();
    let dt = time.delta;

    let mut ordered: Vec<Mut<ActorInstance>> = actors.iter_mut().collect();
    ordered.sort_by_key(|actor| actor.id);

    for mut actor in ordered {
        if actor.pending_removal {
            continue;
        }
        let template = match graph.graph.template(&actor.template) {
            Ok(template) => template,
            Err(e) => {
                warn!("Actor {:?} skipped: {}", actor.id, e);
                continue;
            }
        };
        let mut ctx = MapContext {
            variables: &mut map.variables,
            animation: &mut *runs,
            host: &mut outbox,
            collision: &*collision,
            pointer: &*input,
        };
        let touching = collision.touching(actor.id);
        let actor = &mut *actor;

        if !actor.spawned {
            actor.spawned = true;
            run_response(&interpreter, template.responses.on_spawn, actor, &mut ctx, dt);
        }
        if actor.pending_removal {
            continue;
        }
        dispatch_keys(&dispatcher, template, actor, &input, &mut ctx, dt);
        if actor.pending_removal {
            continue;
        }
        run_response(&interpreter, template.responses.on_always, actor, &mut ctx, dt);
        if touching && !actor.pending_removal {
            run_response(&interpreter, template.responses.on_collision, actor, &mut ctx, dt);
        }
    }

    runs.sweep();
    writers.flush(&mut outbox);
}

fn run_response(
    interpreter: &Interpreter<'_>,
    root: Option<NodeId>,
    actor: &mut ActorInstance,
    ctx: &mut MapContext<'_>,
    dt: f32,
) {
    if let Some(root) = root {
        interpreter.evaluate_node(root, actor, ctx, dt, &mut Default::default());
    }
}

fn dispatch_keys(
    dispatcher: &KeyBindingDispatcher<'_>,
    template: &ActorTemplate,
    actor: &mut ActorInstance,
    input: &InputState,
    ctx: &mut MapContext<'_>,
    dt: f32,
) {
    if template.bindings.is_empty() {
        return;
    }
    dispatcher.dispatch(template, actor, input, ctx, dt);
}

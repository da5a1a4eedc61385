//! actiongraph main entry point.
//!
//! Loads the configuration and the JSON tables, reports every load error, and
//! optionally runs a number of headless ticks with scripted key holds.
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --tables assets/tables.json --check
//! cargo run --release -- --ticks 120 --spawn Hero@0,0 --hold D:1:60 --hold SPACE:30:30
//! ```

use actiongraph::behavior::graph::NodeGraph;
use actiongraph::behavior::table::GameTables;
use actiongraph::components::actor::ActorInstance;
use actiongraph::game::{build_schedule, run_ticks, setup_world, spawn_actor};
use actiongraph::resources::audio::AudioLog;
use actiongraph::resources::behaviorgraph::BehaviorGraph;
use actiongraph::resources::gameconfig::GameConfig;
use actiongraph::resources::input::{KeyHold, ScriptedInput};
use actiongraph::resources::mapstate::MapState;
use bevy_ecs::prelude::*;
use clap::Parser;
use glam::Vec2;
use log::{error, warn};
use std::path::PathBuf;

/// Behavior graph interpreter for 2D platformer actors
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// INI configuration file.
    #[arg(long, value_name = "PATH", default_value = "./config.ini")]
    config: PathBuf,

    /// Table document to load instead of the one named in the configuration.
    #[arg(long, value_name = "PATH")]
    tables: Option<PathBuf>,

    /// Validate the tables and exit.
    #[arg(long)]
    check: bool,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Actor to spawn, optionally at a position. Repeatable. Defaults to one
    /// actor of every template.
    #[arg(long = "spawn", value_name = "TEMPLATE[@X,Y]")]
    spawn: Vec<String>,

    /// Hold a key from tick FROM through tick TO (1-based). Repeatable.
    #[arg(long = "hold", value_name = "KEY:FROM:TO", value_parser = KeyHold::parse)]
    hold: Vec<KeyHold>,
}

/// Split `TEMPLATE[@X,Y]`.
fn parse_spawn(text: &str) -> Result<(String, Vec2), String> {
    let Some((name, at)) = text.split_once('@') else {
        return Ok((text.to_string(), Vec2::ZERO));
    };
    let (x, y) = at
        .split_once(',')
        .ok_or_else(|| format!("expected TEMPLATE@X,Y, got '{}'", text))?;
    let x: f32 = x.trim().parse().map_err(|e| format!("invalid x '{}': {}", x, e))?;
    let y: f32 = y.trim().parse().map_err(|e| format!("invalid y '{}': {}", y, e))?;
    Ok((name.to_string(), Vec2::new(x, y)))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = GameConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        warn!("{}; using defaults", e);
    }
    let tables_path = cli.tables.clone().unwrap_or_else(|| config.tables_path.clone());

    let tables = match GameTables::load_from_file(&tables_path) {
        Ok(tables) => tables,
        Err(e) => {
            eprintln!("Error loading {}: {}", tables_path.display(), e);
            std::process::exit(1);
        }
    };

    // Early-exit: validate only
    if cli.check {
        match NodeGraph::load(&tables) {
            Ok(graph) => {
                println!(
                    "{}: {} nodes, {} actor templates, no errors",
                    tables_path.display(),
                    graph.len(),
                    graph.templates().count()
                );
                return;
            }
            Err(errors) => {
                for e in &errors.0 {
                    eprintln!("Error: {e}");
                }
                eprintln!("{} load error(s)", errors.0.len());
                std::process::exit(1);
            }
        }
    }

    let mut world = World::new();
    if let Err(errors) = setup_world(&mut world, &config, &tables) {
        for e in &errors.0 {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
    world.insert_resource(ScriptedInput::new(cli.hold.clone()));

    let spawns: Vec<String> = if cli.spawn.is_empty() {
        let graph = world.resource::<BehaviorGraph>();
        let mut names: Vec<String> = graph.graph.templates().map(|t| t.name.clone()).collect();
        names.sort();
        names
    } else {
        cli.spawn.clone()
    };
    for spawn in &spawns {
        let spawned = parse_spawn(spawn)
            .and_then(|(name, pos)| spawn_actor(&mut world, &name, pos).map_err(|e| e.to_string()));
        if let Err(e) = spawned {
            error!("Cannot spawn '{}': {}", spawn, e);
            std::process::exit(1);
        }
    }

    let mut update = build_schedule();
    let ran = run_ticks(&mut world, &mut update, cli.ticks, config.tick_delta());

    // --------------- Summary ---------------
    println!("Ran {} tick(s)", ran);
    let mut actors: Vec<ActorInstance> = world
        .query::<&ActorInstance>()
        .iter(&world)
        .cloned()
        .collect();
    actors.sort_by_key(|a| a.id);
    for actor in &actors {
        println!(
            "actor {} '{}'{}: pos=({:.2}, {:.2}) vel=({:.2}, {:.2}) rot={:.1} anim={:?}/{:?}",
            actor.id.0,
            actor.template,
            actor
                .name
                .as_ref()
                .map(|name| format!(" \"{name}\""))
                .unwrap_or_default(),
            actor.position.x,
            actor.position.y,
            actor.velocity.x,
            actor.velocity.y,
            actor.rotation,
            actor.animation.kind,
            actor.animation.direction
        );
        let mut vars: Vec<_> = actor.variables.iter().collect();
        vars.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in vars {
            println!("  {} = {}", name, value);
        }
    }
    let map = world.resource::<MapState>();
    let mut vars: Vec<_> = map.variables.iter().collect();
    vars.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in vars {
        println!("map {} = {}", name, value);
    }
    for path in &world.resource::<AudioLog>().played {
        println!("sound {}", path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spawn() {
        assert_eq!(parse_spawn("Hero").unwrap(), ("Hero".into(), Vec2::ZERO));
        assert_eq!(
            parse_spawn("Hero@10,-4.5").unwrap(),
            ("Hero".into(), Vec2::new(10.0, -4.5))
        );
        assert!(parse_spawn("Hero@10").is_err());
        assert!(parse_spawn("Hero@a,b").is_err());
    }

    #[test]
    fn test_cli_parses_holds() {
        let cli = Cli::try_parse_from([
            "actiongraph",
            "--ticks",
            "5",
            "--hold",
            "D:1:3",
            "--spawn",
            "Hero",
        ])
        .unwrap();
        assert_eq!(cli.ticks, 5);
        assert_eq!(cli.hold.len(), 1);
        assert_eq!(cli.spawn, vec!["Hero".to_string()]);
        assert!(Cli::try_parse_from(["actiongraph", "--hold", "D"]).is_err());
    }
}

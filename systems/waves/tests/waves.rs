use std::time::Duration;

use bastion_core::{
    CellCoord, Command, EnemyCatalog, EnemySettings, EnemyTypeId, Event, LevelDefinition,
    MapDefinition, RoundConfig, RoundOutcome, SpawnGroup, TowerCatalog, WaveDefinition, WavePhase,
};
use bastion_system_waves::{Config, Waves};
use bastion_world::{self as world, map::Map, query, World};

const FRAME: Duration = Duration::from_millis(100);

fn corridor_world(speed: f32, wave_count: usize) -> World {
    let map = Map::from_definition(&MapDefinition {
        cell_length: 10.0,
        grid: vec!["......".to_owned()],
        spawn_points: vec![CellCoord::new(0, 0)],
        target_area: vec![CellCoord::new(5, 0)],
        default_target: CellCoord::new(5, 0),
    })
    .expect("valid map");
    let enemies = EnemyCatalog::new(vec![EnemySettings {
        name: "walker".to_owned(),
        life: 10.0,
        speed,
        money_factor: 1,
        sprite: String::new(),
    }]);
    World::new(
        RoundConfig::default(),
        map,
        enemies,
        TowerCatalog::default(),
        wave_count,
    )
}

fn wave(count: u32, max_duration: f32) -> WaveDefinition {
    WaveDefinition {
        countdown: 1.0,
        max_duration,
        spawns: vec![vec![SpawnGroup {
            kind: EnemyTypeId::new(0),
            count,
        }]],
    }
}

/// Drives the world the way the simulation does and returns every event.
fn run(world: &mut World, waves: &mut Waves, frames: usize) -> Vec<Event> {
    let mut events = Vec::new();
    let mut commands = Vec::new();
    for _ in 0..frames {
        if query::outcome(world).is_some() {
            break;
        }
        commands.clear();
        waves.handle(FRAME, query::enemy_count(world), &mut commands);
        for command in commands.drain(..) {
            world::apply(world, command, &mut events);
        }
        world::apply(world, Command::Tick { dt: FRAME }, &mut events);
        world::apply(world, Command::Reap, &mut events);
    }
    events
}

fn phases(events: &[Event]) -> Vec<(usize, WavePhase)> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::WavePhaseChanged { wave, phase } => Some((*wave, *phase)),
            _ => None,
        })
        .collect()
}

#[test]
fn waves_progress_in_order_and_end_in_victory() {
    let level = LevelDefinition {
        name: "two waves".to_owned(),
        waves: vec![wave(2, 0.0), wave(1, 0.0)],
    };
    let mut world = corridor_world(200.0, level.waves.len());
    let mut waves = Waves::new(Config::from_secs(0.5), &level);

    let events = run(&mut world, &mut waves, 200);

    assert_eq!(
        phases(&events),
        vec![
            (0, WavePhase::Spawning),
            (0, WavePhase::InWave),
            (1, WavePhase::Countdown),
            (1, WavePhase::Spawning),
            (1, WavePhase::InWave),
            (2, WavePhase::Exhausted),
        ]
    );
    let spawned = events
        .iter()
        .filter(|event| matches!(event, Event::EnemySpawned { .. }))
        .count();
    assert_eq!(spawned, 3);
    assert_eq!(query::lives(&world), 17, "every leaked enemy costs one life");
    assert_eq!(query::outcome(&world), Some(RoundOutcome::Victory));
    let endings = events
        .iter()
        .filter(|event| matches!(event, Event::RoundEnded { .. }))
        .count();
    assert_eq!(endings, 1);
}

#[test]
fn max_duration_forces_the_next_wave_while_enemies_remain() {
    let level = LevelDefinition {
        name: "stalled".to_owned(),
        waves: vec![wave(1, 2.0), wave(1, 0.0)],
    };
    let mut world = corridor_world(0.0, level.waves.len());
    let mut waves = Waves::new(Config::from_secs(0.5), &level);

    let _ = run(&mut world, &mut waves, 60);

    assert_eq!(waves.wave(), 1, "the second wave started");
    assert_eq!(query::enemy_count(&world), 2, "no enemy ever left the map");
    assert_eq!(query::outcome(&world), None);
}

#[test]
fn first_spawn_follows_the_countdown_immediately() {
    let level = LevelDefinition {
        name: "single".to_owned(),
        waves: vec![wave(3, 0.0)],
    };
    let mut world = corridor_world(0.0, 1);
    let mut waves = Waves::new(Config::from_secs(0.5), &level);

    // Countdown of 1s elapses on frame 11, the first spawn lands on frame 12.
    let events = run(&mut world, &mut waves, 11);
    assert_eq!(waves.phase(), WavePhase::Spawning);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::EnemySpawned { .. })));

    let events = run(&mut world, &mut waves, 1);
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, Event::EnemySpawned { .. }))
            .count(),
        1
    );
    assert_eq!(waves.pending_spawns(), 2);
}

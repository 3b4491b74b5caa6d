use std::time::Duration;

use bastion_core::{
    CellCoord, EnemyCatalog, EnemySettings, EnemyTypeId, Event, LevelDefinition, MapDefinition,
    RoundConfig, RoundOutcome, SimulationError, SpawnGroup, TowerCatalog, TowerSettings,
    TowerStage, TowerTypeId, WaveDefinition,
};
use bastion_simulation::{Setup, Simulation};
use glam::Vec2;

const FRAME: Duration = Duration::from_millis(100);
const ARCHER: TowerTypeId = TowerTypeId::new(0);
const SLOW: EnemyTypeId = EnemyTypeId::new(0);
const FAST: EnemyTypeId = EnemyTypeId::new(1);
const BOTTOM_CELL: CellCoord = CellCoord::new(2, 2);
const TOP_CELL: CellCoord = CellCoord::new(2, 0);

fn stage(cooldown: f32, range: f32, attacks: u32, power: f32, cost: i64) -> TowerStage {
    TowerStage {
        cooldown,
        range,
        attacks,
        power,
        speed: 400.0,
        offsets: vec![Vec2::new(16.0, 16.0)],
        center: Vec2::new(16.0, 16.0),
        sprite: format!("archer-{cost}"),
        projectile: "arrow".to_owned(),
        cost,
    }
}

fn setup(waves: Vec<WaveDefinition>) -> Setup {
    Setup {
        config: RoundConfig::default(),
        map: MapDefinition {
            cell_length: 32.0,
            grid: vec!["##T##".to_owned(), ".....".to_owned(), "##H##".to_owned()],
            spawn_points: vec![CellCoord::new(0, 1)],
            target_area: vec![CellCoord::new(4, 1)],
            default_target: CellCoord::new(4, 1),
        },
        enemies: EnemyCatalog::new(vec![
            EnemySettings {
                name: "slug".to_owned(),
                life: 3.0,
                speed: 16.0,
                money_factor: 2,
                sprite: "slug".to_owned(),
            },
            EnemySettings {
                name: "hare".to_owned(),
                life: 100.0,
                speed: 400.0,
                money_factor: 1,
                sprite: "hare".to_owned(),
            },
        ]),
        towers: TowerCatalog::new(vec![TowerSettings {
            name: "Archer".to_owned(),
            tag: "archer".to_owned(),
            stages: vec![stage(0.5, 64.0, 2, 1.0, 50), stage(0.25, 80.0, 3, 2.0, 40)],
        }]),
        level: LevelDefinition {
            name: "fixture".to_owned(),
            waves,
        },
    }
}

fn wave(countdown: f32, kind: EnemyTypeId, count: u32) -> WaveDefinition {
    WaveDefinition {
        countdown,
        max_duration: 0.0,
        spawns: vec![vec![SpawnGroup { kind, count }]],
    }
}

fn run(simulation: &mut Simulation, frames: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..frames {
        if !simulation.is_running() {
            break;
        }
        let _ = simulation.step(FRAME);
        events.extend(simulation.drain_events());
    }
    events
}

fn count(events: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|event| predicate(event)).count()
}

#[test]
fn archer_kills_the_nearest_enemy_and_the_round_is_won() {
    let mut simulation = Simulation::new(setup(vec![wave(0.0, SLOW, 1)])).expect("valid setup");
    let _ = simulation.build_tower(ARCHER, TOP_CELL).expect("buildable");
    assert_eq!(simulation.status().money, 150);

    let events = run(&mut simulation, 400);

    let spawned: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            Event::EnemySpawned { enemy, .. } => Some(*enemy),
            _ => None,
        })
        .collect();
    assert_eq!(spawned.len(), 1);
    assert!(
        events.iter().all(|event| match event {
            Event::ProjectileFired { target, .. } => *target == spawned[0],
            _ => true,
        }),
        "every arrow flies at the only enemy"
    );
    assert_eq!(
        count(&events, |event| matches!(event, Event::EnemyKilled { reward: 10, .. })),
        1
    );
    assert_eq!(simulation.outcome(), Some(RoundOutcome::Victory));
    assert_eq!(simulation.status().money, 160);
    assert_eq!(simulation.status().lives, 20);
    assert!(!simulation.is_running());
}

#[test]
fn each_leaked_enemy_costs_exactly_one_life() {
    let mut simulation = Simulation::new(setup(vec![wave(0.0, FAST, 2)])).expect("valid setup");

    let events = run(&mut simulation, 400);

    assert_eq!(count(&events, |event| matches!(event, Event::LifeLost { .. })), 2);
    assert_eq!(simulation.status().lives, 18);
    assert_eq!(simulation.outcome(), Some(RoundOutcome::Victory));
    assert_eq!(
        count(&events, |event| matches!(event, Event::EnemyKilled { .. })),
        0,
        "leaked enemies are never credited"
    );
}

#[test]
fn running_out_of_lives_ends_the_round_regardless_of_remaining_waves() {
    let mut setup = setup(vec![wave(0.0, FAST, 3), wave(1.0, FAST, 5)]);
    setup.config.start_lives = 2;
    let mut simulation = Simulation::new(setup).expect("valid setup");

    let events = run(&mut simulation, 400);

    assert_eq!(simulation.outcome(), Some(RoundOutcome::Defeat));
    assert_eq!(simulation.status().lives, 0);
    assert_eq!(simulation.status().wave, 0);
    assert_eq!(
        count(&events, |event| matches!(
            event,
            Event::RoundEnded {
                outcome: RoundOutcome::Defeat
            }
        )),
        1
    );

    let before = simulation.snapshot();
    let after = simulation.step(FRAME);
    assert_eq!(before, after, "a decided round no longer changes");
    assert!(simulation.drain_events().is_empty());
}

#[test]
fn towers_attack_at_most_once_per_frame() {
    let mut setup = setup(vec![wave(1_000.0, SLOW, 1)]);
    let mut towers = setup.towers.iter().map(|(_, tower)| tower.clone()).collect::<Vec<_>>();
    towers[0].stages[0].cooldown = 0.05;
    setup.towers = TowerCatalog::new(towers);
    let mut simulation = Simulation::new(setup).expect("valid setup");
    let _ = simulation.build_tower(ARCHER, BOTTOM_CELL).expect("buildable");

    let events = run(&mut simulation, 20);

    assert_eq!(
        count(&events, |event| matches!(event, Event::TowerReady { .. })),
        20,
        "a cooldown shorter than the frame is capped by the frame rate"
    );
}

#[test]
fn slow_cooldowns_follow_the_frame_grid() {
    let mut simulation =
        Simulation::new(setup(vec![wave(1_000.0, SLOW, 1)])).expect("valid setup");
    let _ = simulation.build_tower(ARCHER, BOTTOM_CELL).expect("buildable");

    let events = run(&mut simulation, 20);

    // Ready on the first frame, then once per half second of frames.
    assert_eq!(
        count(&events, |event| matches!(event, Event::TowerReady { .. })),
        4
    );
}

#[test]
fn upgrade_clamps_cooldown_and_rejects_the_last_stage() {
    let mut simulation =
        Simulation::new(setup(vec![wave(1_000.0, SLOW, 1)])).expect("valid setup");
    let tower = simulation.build_tower(ARCHER, BOTTOM_CELL).expect("buildable");
    let _ = simulation.step(FRAME);

    let cooldown = |simulation: &Simulation| {
        simulation
            .snapshot()
            .towers
            .iter()
            .find(|snapshot| snapshot.id == tower)
            .map(|snapshot| snapshot.cooldown_remaining)
    };
    assert_eq!(cooldown(&simulation), Some(0.5));
    assert!(simulation.can_upgrade(tower));
    assert_eq!(simulation.upgrade_cost(tower), Some(40));

    simulation.upgrade_tower(tower).expect("second stage exists");
    assert_eq!(cooldown(&simulation), Some(0.25));
    assert_eq!(simulation.status().money, 110);
    assert_eq!(simulation.upgrade_cost(tower), None);
    assert!(!simulation.can_upgrade(tower));

    assert_eq!(
        simulation.upgrade_tower(tower),
        Err(SimulationError::InvalidStage {
            tower,
            stage: 1,
            stages: 2
        })
    );
    assert_eq!(simulation.status().money, 110, "a failed upgrade costs nothing");
}

#[test]
fn selling_refunds_everything_invested_and_frees_the_cell() {
    let mut simulation =
        Simulation::new(setup(vec![wave(1_000.0, SLOW, 1)])).expect("valid setup");
    let tower = simulation.build_tower(ARCHER, BOTTOM_CELL).expect("buildable");
    simulation.upgrade_tower(tower).expect("upgrade");

    assert_eq!(simulation.sell_tower(tower), Ok(90));
    assert_eq!(simulation.status().money, 200);
    assert_eq!(simulation.tower_at(BOTTOM_CELL), None);
    assert_eq!(
        simulation.upgrade_tower(tower),
        Err(SimulationError::MissingTower { tower })
    );

    let rebuilt = simulation.build_tower(ARCHER, BOTTOM_CELL).expect("cell was freed");
    let snapshot = simulation.step(FRAME);
    let ids: Vec<_> = snapshot.towers.iter().map(|tower| tower.id).collect();
    assert_eq!(ids, vec![rebuilt], "the sold tower is pruned");
}

#[test]
fn building_requires_a_free_tower_cell() {
    let mut simulation =
        Simulation::new(setup(vec![wave(1_000.0, SLOW, 1)])).expect("valid setup");
    let path = CellCoord::new(1, 1);

    assert_eq!(
        simulation.build_tower(ARCHER, path),
        Err(SimulationError::Unbuildable { cell: path })
    );
    let _ = simulation.build_tower(ARCHER, BOTTOM_CELL).expect("buildable");
    assert_eq!(
        simulation.build_tower(ARCHER, BOTTOM_CELL),
        Err(SimulationError::Unbuildable { cell: BOTTOM_CELL })
    );
    assert_eq!(
        simulation.build_tower(TowerTypeId::new(9), TOP_CELL),
        Err(SimulationError::UnknownTowerSettings {
            kind: TowerTypeId::new(9)
        })
    );
}

#[test]
fn snapshot_draws_lower_towers_last() {
    let mut simulation =
        Simulation::new(setup(vec![wave(1_000.0, SLOW, 1)])).expect("valid setup");
    let bottom = simulation.build_tower(ARCHER, BOTTOM_CELL).expect("buildable");
    let top = simulation.build_tower(ARCHER, TOP_CELL).expect("buildable");

    let snapshot = simulation.step(FRAME);
    let ids: Vec<_> = snapshot.towers.iter().map(|tower| tower.id).collect();
    assert_eq!(ids, vec![top, bottom]);

    let ranges: Vec<_> = snapshot.towers.iter().map(|tower| tower.range).collect();
    assert_eq!(ranges, vec![64.0, 64.0 * 1.3], "only the H cell grants bonus range");
}

#[test]
fn unknown_tower_tags_are_rejected_up_front() {
    let mut setup = setup(vec![wave(0.0, SLOW, 1)]);
    let mut towers = setup.towers.iter().map(|(_, tower)| tower.clone()).collect::<Vec<_>>();
    towers[0].tag = "trebuchet".to_owned();
    setup.towers = TowerCatalog::new(towers);

    assert_eq!(
        Simulation::new(setup).err(),
        Some(SimulationError::UnknownTowerType {
            tag: "trebuchet".to_owned()
        })
    );
}

#[test]
fn waves_must_match_the_map_and_enemy_catalog() {
    let mut out_of_range = setup(vec![wave(0.0, SLOW, 1)]);
    out_of_range.level.waves[0].spawns.push(vec![SpawnGroup {
        kind: SLOW,
        count: 1,
    }]);
    assert_eq!(
        Simulation::new(out_of_range).err(),
        Some(SimulationError::SpawnPointOutOfRange { index: 1, count: 1 })
    );

    let unknown = setup(vec![wave(0.0, EnemyTypeId::new(7), 1)]);
    assert_eq!(
        Simulation::new(unknown).err(),
        Some(SimulationError::UnknownEnemyType {
            kind: EnemyTypeId::new(7)
        })
    );

    let mut empty = setup(vec![wave(0.0, SLOW, 1)]);
    empty.map.spawn_points.clear();
    assert_eq!(
        Simulation::new(empty).err(),
        Some(SimulationError::NoSpawnPoints)
    );
}

#[test]
fn undrained_events_are_kept_for_one_step_only() {
    let mut simulation =
        Simulation::new(setup(vec![wave(1_000.0, SLOW, 1)])).expect("valid setup");
    let _ = simulation.build_tower(ARCHER, BOTTOM_CELL).expect("buildable");
    for _ in 0..5 {
        let _ = simulation.step(FRAME);
    }

    let events = simulation.drain_events();
    assert_eq!(
        count(&events, |event| matches!(event, Event::TimeAdvanced { .. })),
        1,
        "only the latest step is retained"
    );
    assert_eq!(
        count(&events, |event| matches!(event, Event::TowerPlaced { .. })),
        0
    );

    let _ = simulation.build_tower(ARCHER, TOP_CELL).expect("buildable");
    let _ = simulation.step(FRAME);
    let events = simulation.drain_events();
    assert_eq!(
        count(&events, |event| matches!(event, Event::TowerPlaced { .. })),
        1,
        "actions issued since the previous step survive the next one"
    );
}

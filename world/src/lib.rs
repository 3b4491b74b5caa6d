#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Bastion.
//!
//! The world owns every enemy, tower and projectile together with the round
//! economy. Systems never touch it directly: they read views produced by the
//! [`query`] module and submit [`Command`] values through [`apply`].

use bastion_core::{
    CellCoord, Command, EnemyCatalog, EnemyId, Event, RoundConfig, RoundOutcome,
    SimulationError, TowerCatalog, TowerId, TowerTypeId, WavePhase,
};
use slotmap::SlotMap;
use tracing::{debug, info, warn};

mod enemies;
pub mod map;
mod navigation;
mod projectiles;
mod towers;

use enemies::Enemy;
use map::Map;
use projectiles::Projectile;
use towers::Tower;

/// Represents the authoritative Bastion world state.
#[derive(Debug)]
pub struct World {
    config: RoundConfig,
    map: Map,
    enemy_catalog: EnemyCatalog,
    tower_catalog: TowerCatalog,
    enemies: SlotMap<EnemyId, Enemy>,
    towers: SlotMap<TowerId, Tower>,
    projectiles: Vec<Projectile>,
    next_serial: u64,
    money: i64,
    lives: u32,
    wave: usize,
    wave_count: usize,
    phase: WavePhase,
    outcome: Option<RoundOutcome>,
}

impl World {
    /// Creates a world at the start of a round.
    #[must_use]
    pub fn new(
        config: RoundConfig,
        map: Map,
        enemy_catalog: EnemyCatalog,
        tower_catalog: TowerCatalog,
        wave_count: usize,
    ) -> Self {
        Self {
            money: config.start_money,
            lives: config.start_lives,
            config,
            map,
            enemy_catalog,
            tower_catalog,
            enemies: SlotMap::with_key(),
            towers: SlotMap::with_key(),
            projectiles: Vec::new(),
            next_serial: 0,
            wave: 0,
            wave_count,
            phase: if wave_count == 0 {
                WavePhase::Exhausted
            } else {
                WavePhase::Countdown
            },
            outcome: None,
        }
    }

    fn enemies_in_spawn_order(&self) -> Vec<EnemyId> {
        let mut ids: Vec<(u64, EnemyId)> = self
            .enemies
            .iter()
            .map(|(id, enemy)| (enemy.serial, id))
            .collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    fn towers_in_order(&self) -> Vec<TowerId> {
        let mut ids: Vec<TowerId> = self.towers.keys().collect();
        ids.sort_unstable();
        ids
    }

    fn conclude(&mut self, outcome: RoundOutcome, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);
        info!(?outcome, money = self.money, lives = self.lives, "round ended");
        out_events.push(Event::RoundEnded { outcome });
    }

    fn advance_enemies(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        for id in self.enemies_in_spawn_order() {
            let Some(enemy) = self.enemies.get_mut(id) else {
                continue;
            };
            if !enemy.advance(dt, &self.map) {
                continue;
            }

            self.lives = self.lives.saturating_sub(1);
            debug!(enemy = ?id, lives = self.lives, "enemy reached the target area");
            out_events.push(Event::EnemyStruck { enemy: id });
            out_events.push(Event::LifeLost {
                remaining: self.lives,
            });
            if self.lives == 0 {
                self.conclude(RoundOutcome::Defeat, out_events);
            }
        }
    }

    fn advance_projectiles(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        let hit_distance = self.config.hit_distance;
        for projectile in &mut self.projectiles {
            if let Some(impact) = projectile.update(dt, hit_distance, &mut self.enemies) {
                out_events.push(Event::ProjectileHit {
                    enemy: impact.enemy,
                    damage: impact.damage,
                });
            }
        }
    }

    fn advance_towers(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        for id in self.towers_in_order() {
            let Some(tower) = self.towers.get_mut(id) else {
                continue;
            };
            if tower.sold {
                continue;
            }
            if tower.tick(dt) {
                out_events.push(Event::TowerReady { tower: id });
            }
        }
    }

    fn reap(&mut self, out_events: &mut Vec<Event>) {
        for id in self.enemies_in_spawn_order() {
            let Some(enemy) = self.enemies.get(id) else {
                continue;
            };
            if !enemy.is_dead() {
                continue;
            }
            let reward = self.config.money_per_enemy * i64::from(enemy.money_factor);
            self.money += reward;
            debug!(enemy = ?id, reward, money = self.money, "enemy killed");
            out_events.push(Event::EnemyKilled { enemy: id, reward });
        }

        self.enemies.retain(|_, enemy| !enemy.is_irrelevant());
        self.projectiles.retain(|projectile| !projectile.hit);
        self.towers.retain(|_, tower| !tower.sold);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            let seconds = dt.as_secs_f32();
            world.advance_enemies(seconds, out_events);
            world.advance_projectiles(seconds, out_events);
            world.advance_towers(seconds, out_events);
        }
        Command::SpawnEnemy { spawn_point, kind } => {
            let Some(settings) = world.enemy_catalog.get(kind) else {
                warn!(?kind, "ignoring spawn of an unknown enemy type");
                return;
            };
            let Some(position) = world.map.spawn_position(spawn_point) else {
                warn!(spawn_point, "ignoring spawn at an unknown spawn point");
                return;
            };

            let serial = world.next_serial;
            world.next_serial += 1;
            let enemy = Enemy::spawn(serial, kind, settings, position, &world.map);
            let id = world.enemies.insert(enemy);
            debug!(enemy = ?id, ?kind, spawn_point, serial, "enemy spawned");
            out_events.push(Event::EnemySpawned {
                enemy: id,
                kind,
                spawn_point,
            });
        }
        Command::AnnounceWave { wave, phase } => {
            world.wave = wave;
            world.phase = phase;
            info!(wave, ?phase, "wave phase changed");
            out_events.push(Event::WavePhaseChanged { wave, phase });
        }
        Command::ConcludeRound { outcome } => {
            world.conclude(outcome, out_events);
        }
        Command::AssignTarget { tower, target } => {
            if let Some(state) = world.towers.get_mut(tower) {
                state.target = target;
                out_events.push(Event::TargetAcquired { tower, target });
            }
        }
        Command::FireProjectile {
            tower,
            target,
            origin,
            power,
            speed,
            sprite,
        } => {
            if !world.towers.get(tower).map_or(false, |state| !state.sold) {
                return;
            }
            let Some(enemy) = world.enemies.get(target) else {
                return;
            };
            world.projectiles.push(Projectile::launch(
                origin,
                target,
                enemy.position,
                power,
                speed,
                sprite,
            ));
            out_events.push(Event::ProjectileFired { tower, target });
        }
        Command::Reap => world.reap(out_events),
    }
}

/// Builds a tower of the provided type on a free tower cell.
///
/// The first stage's cost is debited unconditionally; callers decide whether
/// the player can afford it beforehand.
pub fn place_tower(
    world: &mut World,
    kind: TowerTypeId,
    cell: CellCoord,
    out_events: &mut Vec<Event>,
) -> Result<TowerId, SimulationError> {
    let settings = world
        .tower_catalog
        .get(kind)
        .ok_or(SimulationError::UnknownTowerSettings { kind })?;
    if !world.map.is_buildable(cell) {
        return Err(SimulationError::Unbuildable { cell });
    }

    let position = world.map.cell_center(cell);
    let high_range = world.map.is_high_range(position);
    let tower = Tower::build(
        kind,
        settings,
        cell,
        position,
        high_range,
        world.config.high_range_factor,
    )?;
    if !world.map.place_tower(cell) {
        return Err(SimulationError::Unbuildable { cell });
    }

    world.money -= tower.invested;
    let cost = tower.invested;
    let id = world.towers.insert(tower);
    debug!(tower = ?id, ?kind, column = cell.column(), row = cell.row(), cost, "tower placed");
    out_events.push(Event::TowerPlaced {
        tower: id,
        kind,
        cell,
    });
    Ok(id)
}

/// Advances a tower to its next stage, debiting the stage's cost.
pub fn upgrade_tower(
    world: &mut World,
    tower: TowerId,
    out_events: &mut Vec<Event>,
) -> Result<(), SimulationError> {
    let factor = world.config.high_range_factor;
    let state = world
        .towers
        .get_mut(tower)
        .filter(|state| !state.sold)
        .ok_or(SimulationError::MissingTower { tower })?;
    let settings = world
        .tower_catalog
        .get(state.kind)
        .ok_or(SimulationError::UnknownTowerSettings { kind: state.kind })?;

    let cost = state.upgrade(tower, settings, factor)?;
    let stage = state.stage;
    world.money -= cost;
    debug!(tower = ?tower, stage, cost, "tower upgraded");
    out_events.push(Event::TowerUpgraded { tower, stage });
    Ok(())
}

/// Sells a tower, crediting the refund and freeing its cell immediately.
///
/// The tower stops acting at once and is removed during the next reap.
pub fn sell_tower(
    world: &mut World,
    tower: TowerId,
    out_events: &mut Vec<Event>,
) -> Result<i64, SimulationError> {
    let ratio = f64::from(world.config.sell_refund_ratio);
    let state = world
        .towers
        .get_mut(tower)
        .filter(|state| !state.sold)
        .ok_or(SimulationError::MissingTower { tower })?;

    state.sold = true;
    state.target = None;
    let refund = (state.invested as f64 * ratio).floor() as i64;
    let cell = state.cell;
    let _ = world.map.remove_tower(cell);
    world.money += refund;
    debug!(tower = ?tower, refund, money = world.money, "tower sold");
    out_events.push(Event::TowerSold { tower, refund });
    Ok(refund)
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::cmp::Ordering;

    use super::{Map, World};
    use bastion_core::{
        CellCoord, EnemyCatalog, EnemyView, ProjectileSnapshot, RoundConfig, RoundOutcome,
        RoundStatus, Snapshot, TowerCatalog, TowerId, TowerSnapshot, TowerTypeId, TowerView,
    };

    /// Round configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &RoundConfig {
        &world.config
    }

    /// Provides read-only access to the battlefield.
    #[must_use]
    pub fn map(world: &World) -> &Map {
        &world.map
    }

    /// Tower settings known to the world.
    #[must_use]
    pub fn tower_catalog(world: &World) -> &TowerCatalog {
        &world.tower_catalog
    }

    /// Enemy settings known to the world.
    #[must_use]
    pub fn enemy_catalog(world: &World) -> &EnemyCatalog {
        &world.enemy_catalog
    }

    /// Money available to the player.
    #[must_use]
    pub fn money(world: &World) -> i64 {
        world.money
    }

    /// Lives left.
    #[must_use]
    pub fn lives(world: &World) -> u32 {
        world.lives
    }

    /// Outcome of the round once decided.
    #[must_use]
    pub fn outcome(world: &World) -> Option<RoundOutcome> {
        world.outcome
    }

    /// Number of enemies still held by the pool.
    #[must_use]
    pub fn enemy_count(world: &World) -> usize {
        world.enemies.len()
    }

    /// Captures a read-only view of the enemies in spawn order.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(
            world
                .enemies
                .iter()
                .map(|(id, enemy)| enemy.snapshot(id))
                .collect(),
        )
    }

    /// Captures a read-only view of the towers, sold ones included.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(
            world
                .towers
                .iter()
                .map(|(id, tower)| tower.snapshot(id))
                .collect(),
        )
    }

    /// Projectiles in creation order.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter()
            .map(|projectile| projectile.snapshot())
            .collect()
    }

    /// Tower standing on the provided cell, if any.
    #[must_use]
    pub fn tower_at(world: &World, cell: CellCoord) -> Option<TowerId> {
        world
            .towers
            .iter()
            .find(|(_, tower)| tower.cell == cell && !tower.sold)
            .map(|(id, _)| id)
    }

    /// Reports whether the player can pay for a new tower of the given type.
    #[must_use]
    pub fn can_afford(world: &World, kind: TowerTypeId) -> bool {
        world
            .tower_catalog
            .get(kind)
            .map_or(false, |settings| settings.base_cost() <= world.money)
    }

    /// Cost of the tower's next stage, or `None` at the last stage.
    #[must_use]
    pub fn upgrade_cost(world: &World, tower: TowerId) -> Option<i64> {
        let state = world.towers.get(tower).filter(|state| !state.sold)?;
        let settings = world.tower_catalog.get(state.kind)?;
        settings.stage(state.stage + 1).map(|stage| stage.cost)
    }

    /// Round bookkeeping.
    #[must_use]
    pub fn status(world: &World) -> RoundStatus {
        RoundStatus {
            wave: world.wave,
            wave_count: world.wave_count,
            phase: world.phase,
            money: world.money,
            lives: world.lives,
            outcome: world.outcome,
        }
    }

    /// Assembles the presentation snapshot in draw order.
    #[must_use]
    pub fn snapshot(world: &World) -> Snapshot {
        let mut towers: Vec<TowerSnapshot> = tower_view(world).into_vec();
        towers.sort_by(|a, b| {
            a.position
                .y
                .partial_cmp(&b.position.y)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });

        Snapshot {
            towers,
            enemies: enemy_view(world).into_vec(),
            projectiles: projectiles(world),
            status: status(world),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::{EnemySettings, MapDefinition, TowerSettings, TowerStage};
    use glam::Vec2;
    use std::time::Duration;

    fn world() -> World {
        let map = Map::from_definition(&MapDefinition {
            cell_length: 20.0,
            grid: vec!["T.H".to_owned(), "...".to_owned()],
            spawn_points: vec![CellCoord::new(0, 1)],
            target_area: vec![CellCoord::new(2, 1)],
            default_target: CellCoord::new(2, 1),
        })
        .expect("valid map");
        let enemies = EnemyCatalog::new(vec![EnemySettings {
            name: "grunt".to_owned(),
            life: 1.0,
            speed: 0.0,
            money_factor: 3,
            sprite: String::new(),
        }]);
        let towers = TowerCatalog::new(vec![TowerSettings {
            name: "Archer".to_owned(),
            tag: "archer".to_owned(),
            stages: vec![
                TowerStage {
                    cooldown: 1.0,
                    range: 50.0,
                    attacks: 1,
                    power: 1.0,
                    speed: 100.0,
                    offsets: Vec::new(),
                    center: Vec2::ZERO,
                    sprite: String::new(),
                    projectile: String::new(),
                    cost: 40,
                },
                TowerStage {
                    cooldown: 0.5,
                    range: 60.0,
                    attacks: 1,
                    power: 2.0,
                    speed: 100.0,
                    offsets: Vec::new(),
                    center: Vec2::ZERO,
                    sprite: String::new(),
                    projectile: String::new(),
                    cost: 25,
                },
            ],
        }]);
        World::new(RoundConfig::default(), map, enemies, towers, 1)
    }

    #[test]
    fn placing_a_tower_debits_money_and_claims_the_cell() {
        let mut world = world();
        let mut events = Vec::new();
        let cell = CellCoord::new(0, 0);

        let tower = place_tower(&mut world, TowerTypeId::new(0), cell, &mut events)
            .expect("buildable cell");

        assert_eq!(query::money(&world), 160);
        assert_eq!(query::tower_at(&world, cell), Some(tower));
        assert_eq!(
            place_tower(&mut world, TowerTypeId::new(0), cell, &mut events),
            Err(SimulationError::Unbuildable { cell })
        );
        assert_eq!(
            place_tower(&mut world, TowerTypeId::new(0), CellCoord::new(1, 0), &mut events),
            Err(SimulationError::Unbuildable {
                cell: CellCoord::new(1, 0)
            })
        );
    }

    #[test]
    fn high_range_cell_scales_tower_range() {
        let mut world = world();
        let mut events = Vec::new();
        let tower = place_tower(
            &mut world,
            TowerTypeId::new(0),
            CellCoord::new(2, 0),
            &mut events,
        )
        .expect("buildable cell");

        let view = query::tower_view(&world);
        let range = view.get(tower).map(|snapshot| snapshot.range);
        assert_eq!(range, Some(50.0 * 1.3));
    }

    #[test]
    fn selling_refunds_investment_and_frees_the_cell() {
        let mut world = world();
        let mut events = Vec::new();
        let cell = CellCoord::new(0, 0);
        let tower =
            place_tower(&mut world, TowerTypeId::new(0), cell, &mut events).expect("build");
        upgrade_tower(&mut world, tower, &mut events).expect("upgrade");
        assert_eq!(query::money(&world), 135);

        let refund = sell_tower(&mut world, tower, &mut events).expect("sell");
        assert_eq!(refund, 65);
        assert_eq!(query::money(&world), 200);
        assert!(query::map(&world).is_buildable(cell));
        assert_eq!(
            sell_tower(&mut world, tower, &mut events),
            Err(SimulationError::MissingTower { tower })
        );

        apply(&mut world, Command::Reap, &mut events);
        assert_eq!(query::tower_view(&world).iter().count(), 0);
    }

    #[test]
    fn reap_credits_dead_enemies_once() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnEnemy {
                spawn_point: 0,
                kind: bastion_core::EnemyTypeId::new(0),
            },
            &mut events,
        );
        let enemy = query::enemy_view(&world)
            .iter()
            .next()
            .map(|snapshot| snapshot.id)
            .expect("spawned enemy");
        if let Some(state) = world.enemies.get_mut(enemy) {
            state.damage(5.0);
        }

        apply(&mut world, Command::Reap, &mut events);
        apply(&mut world, Command::Reap, &mut events);

        assert_eq!(query::money(&world), 215);
        assert_eq!(query::enemy_count(&world), 0);
        let kills = events
            .iter()
            .filter(|event| matches!(event, Event::EnemyKilled { .. }))
            .count();
        assert_eq!(kills, 1);
    }

    #[test]
    fn ticking_reports_ready_towers_once_per_cooldown() {
        let mut world = world();
        let mut events = Vec::new();
        let tower = place_tower(
            &mut world,
            TowerTypeId::new(0),
            CellCoord::new(0, 0),
            &mut events,
        )
        .expect("build");

        let mut ready = 0;
        for _ in 0..10 {
            events.clear();
            apply(
                &mut world,
                Command::Tick {
                    dt: Duration::from_millis(250),
                },
                &mut events,
            );
            ready += events
                .iter()
                .filter(|event| **event == Event::TowerReady { tower })
                .count();
        }

        assert_eq!(ready, 3, "ready at 0.25s, 1.25s and 2.25s");
    }
}

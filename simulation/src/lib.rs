#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame driver that owns the world and every system.
//!
//! [`Simulation::step`] is the single entry point of a frame. It runs wave
//! admission, the entity update, the attack phase and the reap phase in that
//! order and returns the snapshot presentation draws from. The caller owns
//! the clock and decides the frame cadence.

use std::time::Duration;

use bastion_core::{
    CellCoord, Command, EnemyCatalog, Event, LevelDefinition, MapDefinition, RoundConfig,
    RoundOutcome, RoundStatus, SimulationError, Snapshot, TowerCatalog, TowerId, TowerTarget,
    TowerTypeId, TowerVariant,
};
use bastion_system_tower_combat::TowerCombat;
use bastion_system_tower_targeting::TowerTargeting;
use bastion_system_waves::{Config as WaveConfig, Waves};
use bastion_world::{self as world, map::Map, query, World};
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

/// Everything needed to start a round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    /// Round tunables.
    #[serde(default)]
    pub config: RoundConfig,
    /// Battlefield layout.
    pub map: MapDefinition,
    /// Enemy stat table indexed by enemy type id.
    pub enemies: EnemyCatalog,
    /// Tower stat table indexed by tower type id.
    pub towers: TowerCatalog,
    /// Waves to play.
    pub level: LevelDefinition,
}

/// A running round of the game.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    waves: Waves,
    targeting: TowerTargeting,
    combat: TowerCombat,
    commands: Vec<Command>,
    events: Vec<Event>,
    stale_events: usize,
    ready: Vec<TowerId>,
    decisions: Vec<TowerTarget>,
}

impl Simulation {
    /// Validates the setup and creates a simulation at the first countdown.
    ///
    /// Every tower type tag, every enemy type referenced by a wave and every
    /// spawn point used by a wave is checked here so that stepping never
    /// fails later on.
    pub fn new(setup: Setup) -> Result<Self, SimulationError> {
        for (kind, settings) in setup.towers.iter() {
            let _ = TowerVariant::from_tag(&settings.tag)?;
            if settings.stages.is_empty() {
                return Err(SimulationError::UnknownTowerSettings { kind });
            }
        }

        let map = Map::from_definition(&setup.map)?;
        let count = map.spawn_point_count();
        if count == 0 {
            return Err(SimulationError::NoSpawnPoints);
        }

        for wave in &setup.level.waves {
            for (index, groups) in wave.spawns.iter().enumerate() {
                if groups.is_empty() {
                    continue;
                }
                if index >= count {
                    return Err(SimulationError::SpawnPointOutOfRange { index, count });
                }
                if let Some(group) = groups
                    .iter()
                    .find(|group| setup.enemies.get(group.kind).is_none())
                {
                    return Err(SimulationError::UnknownEnemyType { kind: group.kind });
                }
            }
        }

        let waves = Waves::new(
            WaveConfig::from_secs(setup.config.spawn_interval),
            &setup.level,
        );
        info!(
            level = %setup.level.name,
            waves = setup.level.waves.len(),
            spawn_points = count,
            money = setup.config.start_money,
            lives = setup.config.start_lives,
            "round prepared"
        );
        let world = World::new(
            setup.config,
            map,
            setup.enemies,
            setup.towers,
            setup.level.waves.len(),
        );

        Ok(Self {
            world,
            waves,
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            commands: Vec::new(),
            events: Vec::new(),
            stale_events: 0,
            ready: Vec::new(),
            decisions: Vec::new(),
        })
    }

    /// Advances the round by `dt` and returns the resulting snapshot.
    ///
    /// Once the round is decided the world no longer changes and every call
    /// returns the final snapshot.
    ///
    /// Events of the previous step that were not drained are discarded here;
    /// see [`Simulation::drain_events`].
    pub fn step(&mut self, dt: Duration) -> Snapshot {
        let _ = self.events.drain(..self.stale_events);
        self.stale_events = 0;
        if !self.is_running() {
            return query::snapshot(&self.world);
        }

        self.commands.clear();
        self.waves
            .handle(dt, query::enemy_count(&self.world), &mut self.commands);
        self.flush_commands();

        let tick_start = self.events.len();
        world::apply(&mut self.world, Command::Tick { dt }, &mut self.events);
        self.ready.clear();
        self.ready.extend(self.events[tick_start..].iter().filter_map(|event| {
            match event {
                Event::TowerReady { tower } => Some(*tower),
                _ => None,
            }
        }));

        if !self.ready.is_empty() {
            let towers = query::tower_view(&self.world);
            let enemies = query::enemy_view(&self.world);
            self.targeting
                .handle(&self.ready, &towers, &enemies, &mut self.decisions);
            self.commands.clear();
            self.combat.handle(
                &self.decisions,
                &towers,
                &enemies,
                query::tower_catalog(&self.world),
                &mut self.commands,
            );
            self.flush_commands();
        }

        world::apply(&mut self.world, Command::Reap, &mut self.events);
        self.stale_events = self.events.len();

        let snapshot = query::snapshot(&self.world);
        trace!(
            enemies = snapshot.enemies.len(),
            projectiles = snapshot.projectiles.len(),
            money = snapshot.status.money,
            lives = snapshot.status.lives,
            "frame stepped"
        );
        snapshot
    }

    fn flush_commands(&mut self) {
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }
    }

    /// Builds a tower on a free tower cell, debiting its base cost.
    ///
    /// Affordability is not checked; see [`Simulation::can_afford`].
    pub fn build_tower(
        &mut self,
        kind: TowerTypeId,
        cell: CellCoord,
    ) -> Result<TowerId, SimulationError> {
        world::place_tower(&mut self.world, kind, cell, &mut self.events)
    }

    /// Upgrades a tower to its next stage, debiting the stage's cost.
    ///
    /// Affordability is not checked; see [`Simulation::can_upgrade`].
    pub fn upgrade_tower(&mut self, tower: TowerId) -> Result<(), SimulationError> {
        world::upgrade_tower(&mut self.world, tower, &mut self.events)
    }

    /// Sells a tower and returns the money credited for it.
    pub fn sell_tower(&mut self, tower: TowerId) -> Result<i64, SimulationError> {
        world::sell_tower(&mut self.world, tower, &mut self.events)
    }

    /// Reports whether the player can pay for a tower of the given type.
    #[must_use]
    pub fn can_afford(&self, kind: TowerTypeId) -> bool {
        query::can_afford(&self.world, kind)
    }

    /// Cost of the tower's next stage, or `None` when it is fully upgraded.
    #[must_use]
    pub fn upgrade_cost(&self, tower: TowerId) -> Option<i64> {
        query::upgrade_cost(&self.world, tower)
    }

    /// Reports whether the tower has a next stage the player can pay for.
    #[must_use]
    pub fn can_upgrade(&self, tower: TowerId) -> bool {
        self.upgrade_cost(tower)
            .map_or(false, |cost| cost <= query::money(&self.world))
    }

    /// Tower standing on the provided cell, if any.
    #[must_use]
    pub fn tower_at(&self, cell: CellCoord) -> Option<TowerId> {
        query::tower_at(&self.world, cell)
    }

    /// Reports whether the round is still undecided.
    #[must_use]
    pub fn is_running(&self) -> bool {
        query::outcome(&self.world).is_none()
    }

    /// Outcome of the round once decided.
    #[must_use]
    pub fn outcome(&self) -> Option<RoundOutcome> {
        query::outcome(&self.world)
    }

    /// Round bookkeeping.
    #[must_use]
    pub fn status(&self) -> RoundStatus {
        query::status(&self.world)
    }

    /// Snapshot of the current state without advancing time.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        query::snapshot(&self.world)
    }

    /// Read-only access to the world for queries not covered here.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Takes the events emitted since the previous drain.
    ///
    /// The buffer holds at most one step's events plus those of player
    /// actions issued after it: the next [`Simulation::step`] drops whatever
    /// the previous step left undrained.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.stale_events = 0;
        std::mem::take(&mut self.events)
    }
}

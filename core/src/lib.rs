#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Bastion tower-defense engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views, and respond exclusively with new command batches.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

mod level;
mod settings;

pub use level::{CellKind, LevelDefinition, MapDefinition, SpawnGroup, WaveDefinition};
pub use settings::{
    EnemyCatalog, EnemySettings, TowerCatalog, TowerSettings, TowerStage, TowerVariant,
};

slotmap::new_key_type! {
    /// Generation-checked handle of an enemy owned by the world.
    ///
    /// Towers and projectiles keep these as weak references: once the enemy
    /// is pruned the handle resolves to nothing, and it never aliases an
    /// enemy spawned later.
    pub struct EnemyId;

    /// Generation-checked handle of a tower owned by the world.
    pub struct TowerId;
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances enemies, projectiles and tower cooldowns by the provided delta.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a new enemy enter the map at a spawn point.
    SpawnEnemy {
        /// Index of the spawn point the enemy enters from.
        spawn_point: usize,
        /// Type of enemy to create.
        kind: EnemyTypeId,
    },
    /// Records that the wave state machine entered a new phase.
    AnnounceWave {
        /// Zero-based index of the wave the phase belongs to.
        wave: usize,
        /// Phase that became active.
        phase: WavePhase,
    },
    /// Requests that the round end with the provided outcome.
    ConcludeRound {
        /// Outcome recorded for the round.
        outcome: RoundOutcome,
    },
    /// Stores the target a tower should remember for its next attacks.
    AssignTarget {
        /// Tower whose target changes.
        tower: TowerId,
        /// Enemy to track, or `None` to clear the target.
        target: Option<EnemyId>,
    },
    /// Launches a projectile from a tower toward an enemy.
    FireProjectile {
        /// Tower that fired the projectile.
        tower: TowerId,
        /// Enemy the projectile homes in on.
        target: EnemyId,
        /// World position the projectile starts from.
        origin: Vec2,
        /// Damage dealt on impact.
        power: f32,
        /// Travel speed in world units per second.
        speed: f32,
        /// Sprite identifier forwarded to presentation.
        sprite: String,
    },
    /// Credits rewards for dead enemies and prunes every finished entity.
    Reap,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an enemy entered the map.
    EnemySpawned {
        /// Handle assigned to the new enemy.
        enemy: EnemyId,
        /// Type of the enemy.
        kind: EnemyTypeId,
        /// Spawn point the enemy entered from.
        spawn_point: usize,
    },
    /// Reports that an enemy reached the target area.
    EnemyStruck {
        /// Enemy that reached the target area.
        enemy: EnemyId,
    },
    /// Reports that the player lost a life.
    LifeLost {
        /// Lives left after the loss.
        remaining: u32,
    },
    /// Reports that a projectile reached the point it was homing in on.
    ProjectileHit {
        /// Enemy that took damage, or `None` when the target was already gone.
        enemy: Option<EnemyId>,
        /// Damage dealt to the enemy.
        damage: f32,
    },
    /// Reports that a dead enemy was credited and removed.
    EnemyKilled {
        /// Enemy that died.
        enemy: EnemyId,
        /// Money credited for the kill.
        reward: i64,
    },
    /// Reports that a tower's cooldown elapsed and it may attack this frame.
    TowerReady {
        /// Tower that became ready.
        tower: TowerId,
    },
    /// Reports that a tower changed its remembered target.
    TargetAcquired {
        /// Tower whose target changed.
        tower: TowerId,
        /// New target, or `None` when the tower lost its target.
        target: Option<EnemyId>,
    },
    /// Confirms that a projectile was launched.
    ProjectileFired {
        /// Tower that fired.
        tower: TowerId,
        /// Enemy the projectile homes in on.
        target: EnemyId,
    },
    /// Confirms that a tower was built.
    TowerPlaced {
        /// Handle assigned to the tower.
        tower: TowerId,
        /// Tower type that was built.
        kind: TowerTypeId,
        /// Cell the tower occupies.
        cell: CellCoord,
    },
    /// Confirms that a tower advanced to its next stage.
    TowerUpgraded {
        /// Tower that was upgraded.
        tower: TowerId,
        /// Stage the tower reached.
        stage: usize,
    },
    /// Confirms that a tower was sold.
    TowerSold {
        /// Tower that was sold.
        tower: TowerId,
        /// Money credited for the sale.
        refund: i64,
    },
    /// Announces that the wave state machine entered a new phase.
    WavePhaseChanged {
        /// Zero-based wave index.
        wave: usize,
        /// Phase that became active.
        phase: WavePhase,
    },
    /// Announces that the round was decided.
    RoundEnded {
        /// Outcome of the round.
        outcome: RoundOutcome,
    },
}

/// Phases of the wave state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WavePhase {
    /// Waiting for the wave's countdown to elapse.
    Countdown,
    /// Emitting enemies from the spawn queues.
    Spawning,
    /// All enemies emitted; waiting for the map to clear or the time limit.
    InWave,
    /// Every wave of the level has been played.
    Exhausted,
}

/// Final result of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// Every wave was cleared with lives to spare.
    Victory,
    /// The player ran out of lives.
    Defeat,
}

/// Identifier of an enemy type within the [`EnemyCatalog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyTypeId(u32);

impl EnemyTypeId {
    /// Creates a new enemy type identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a tower type within the [`TowerCatalog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TowerTypeId(u32);

impl TowerTypeId {
    /// Creates a new tower type identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Tunables of a round that do not belong to any level or settings table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Money available when the round starts.
    pub start_money: i64,
    /// Lives available when the round starts.
    pub start_lives: u32,
    /// Base reward for a kill, scaled by the enemy's money factor.
    pub money_per_enemy: i64,
    /// Seconds between two spawns from the same spawn point.
    pub spawn_interval: f32,
    /// Range multiplier for towers standing on high-range cells.
    pub high_range_factor: f32,
    /// Distance in world units under which a projectile registers a hit.
    pub hit_distance: f32,
    /// Share of the invested money credited back when a tower is sold.
    pub sell_refund_ratio: f32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            start_money: 200,
            start_lives: 20,
            money_per_enemy: 5,
            spawn_interval: 0.5,
            high_range_factor: 1.3,
            hit_distance: 10.0,
            sell_refund_ratio: 1.0,
        }
    }
}

/// Target decision produced by the targeting system for a ready tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerTarget {
    /// Tower that is about to attack.
    pub tower: TowerId,
    /// Enemy to attack, or `None` when nothing is in range.
    pub target: Option<EnemyId>,
    /// Whether the decision differs from the tower's remembered target.
    pub retargeted: bool,
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Handle of the enemy.
    pub id: EnemyId,
    /// Monotonic spawn order; lower values entered the map earlier.
    pub serial: u64,
    /// Type of the enemy.
    pub kind: EnemyTypeId,
    /// Current world position.
    pub position: Vec2,
    /// Remaining hit points.
    pub life: f32,
    /// Whether the enemy died or reached the target area.
    pub irrelevant: bool,
    /// Sprite identifier forwarded to presentation.
    pub sprite: String,
}

/// Read-only snapshot describing all enemies in spawn order.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.serial);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over enemies that may still be targeted.
    pub fn eligible(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter().filter(|snapshot| !snapshot.irrelevant)
    }

    /// Looks up the snapshot of the provided enemy.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&EnemySnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == id)
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Handle of the tower.
    pub id: TowerId,
    /// Tower type the tower was built from.
    pub kind: TowerTypeId,
    /// Attack pattern of the tower.
    pub variant: TowerVariant,
    /// Cell the tower occupies.
    pub cell: CellCoord,
    /// World position of the cell centre.
    pub position: Vec2,
    /// Position minus the stage's sprite centre; projectile offsets are
    /// relative to this point.
    pub render_origin: Vec2,
    /// Zero-based upgrade stage.
    pub stage: usize,
    /// Effective targeting range including the high-range bonus.
    pub range: f32,
    /// Seconds until the next attack.
    pub cooldown_remaining: f32,
    /// Remembered target.
    pub target: Option<EnemyId>,
    /// Money spent on building and upgrading the tower.
    pub invested: i64,
    /// Whether the tower was sold and awaits removal.
    pub sold: bool,
    /// Sprite identifier of the current stage.
    pub sprite: String,
}

/// Read-only snapshot describing all towers in handle order.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of the provided tower.
    #[must_use]
    pub fn get(&self, id: TowerId) -> Option<&TowerSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a projectile in flight.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Current world position.
    pub position: Vec2,
    /// Heading in degrees measured against the negative x axis.
    pub rotation: f32,
    /// Sprite identifier forwarded to presentation.
    pub sprite: String,
    /// Whether the projectile already hit and awaits removal.
    pub hit: bool,
}

/// Round level bookkeeping exposed to presentation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoundStatus {
    /// Zero-based index of the current wave.
    pub wave: usize,
    /// Number of waves in the level.
    pub wave_count: usize,
    /// Phase of the wave state machine.
    pub phase: WavePhase,
    /// Money available to the player.
    pub money: i64,
    /// Lives left.
    pub lives: u32,
    /// Outcome once the round is decided.
    pub outcome: Option<RoundOutcome>,
}

/// Read-only picture of the simulation handed to presentation every frame.
///
/// Towers are ordered by their `y` coordinate then handle so that lower
/// towers overlap higher ones, enemies by spawn order and projectiles by
/// creation order.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Towers in draw order.
    pub towers: Vec<TowerSnapshot>,
    /// Enemies in draw order.
    pub enemies: Vec<EnemySnapshot>,
    /// Projectiles in draw order.
    pub projectiles: Vec<ProjectileSnapshot>,
    /// Round bookkeeping.
    pub status: RoundStatus,
}

/// Failures surfaced by the simulation to its caller.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// The tower is already at its last stage.
    #[error("tower {tower:?} cannot leave stage {stage}: only {stages} stages are defined")]
    InvalidStage {
        /// Tower that was asked to upgrade.
        tower: TowerId,
        /// Stage the tower is at.
        stage: usize,
        /// Number of stages defined for the tower type.
        stages: usize,
    },
    /// A settings table names a tower type tag nobody implements.
    #[error("unknown tower type `{tag}`")]
    UnknownTowerType {
        /// Offending type tag.
        tag: String,
    },
    /// A tower type id is missing from the tower catalog.
    #[error("tower type {kind:?} is not in the tower catalog")]
    UnknownTowerSettings {
        /// Offending tower type.
        kind: TowerTypeId,
    },
    /// An enemy type id is missing from the enemy catalog.
    #[error("enemy type {kind:?} is not in the enemy catalog")]
    UnknownEnemyType {
        /// Offending enemy type.
        kind: EnemyTypeId,
    },
    /// The cell cannot host a tower right now.
    #[error("cell ({}, {}) cannot host a tower", cell.column(), cell.row())]
    Unbuildable {
        /// Requested cell.
        cell: CellCoord,
    },
    /// The tower handle no longer resolves.
    #[error("tower {tower:?} does not exist")]
    MissingTower {
        /// Requested tower.
        tower: TowerId,
    },
    /// The map defines no spawn point.
    #[error("the map defines no spawn points")]
    NoSpawnPoints,
    /// A wave spawns from a spawn point the map does not define.
    #[error("spawn point {index} is out of range: the map defines {count}")]
    SpawnPointOutOfRange {
        /// Spawn point index used by the wave.
        index: usize,
        /// Number of spawn points on the map.
        count: usize,
    },
    /// The map definition is malformed.
    #[error("invalid map: {reason}")]
    InvalidMap {
        /// Description of the problem.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn enemy(id: EnemyId, serial: u64, irrelevant: bool) -> EnemySnapshot {
        EnemySnapshot {
            id,
            serial,
            kind: EnemyTypeId::new(0),
            position: Vec2::ZERO,
            life: 1.0,
            irrelevant,
            sprite: String::new(),
        }
    }

    #[test]
    fn enemy_view_orders_by_spawn_serial() {
        let mut keys: SlotMap<EnemyId, ()> = SlotMap::with_key();
        let first = keys.insert(());
        let second = keys.insert(());
        let third = keys.insert(());

        let view = EnemyView::from_snapshots(vec![
            enemy(third, 9, false),
            enemy(first, 2, false),
            enemy(second, 5, true),
        ]);

        let serials: Vec<u64> = view.iter().map(|snapshot| snapshot.serial).collect();
        assert_eq!(serials, vec![2, 5, 9]);

        let eligible: Vec<EnemyId> = view.eligible().map(|snapshot| snapshot.id).collect();
        assert_eq!(eligible, vec![first, third]);
        assert_eq!(view.get(second).map(|snapshot| snapshot.serial), Some(5));
    }

    #[test]
    fn removed_enemy_handle_never_aliases_a_new_enemy() {
        let mut keys: SlotMap<EnemyId, u32> = SlotMap::with_key();
        let stale = keys.insert(1);
        let _ = keys.remove(stale);
        let fresh = keys.insert(2);

        assert_ne!(stale, fresh);
        assert!(keys.get(stale).is_none());
    }

    #[test]
    fn round_config_defaults_fill_missing_fields() {
        let config: RoundConfig = toml::from_str("start_money = 75").expect("parse config");
        assert_eq!(config.start_money, 75);
        assert_eq!(config.start_lives, 20);
        assert!((config.spawn_interval - 0.5).abs() < f32::EPSILON);
        assert!((config.sell_refund_ratio - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn spawn_groups_expand_into_ordered_queues() {
        let wave = WaveDefinition {
            countdown: 1.0,
            max_duration: 0.0,
            spawns: vec![
                vec![
                    SpawnGroup {
                        kind: EnemyTypeId::new(0),
                        count: 2,
                    },
                    SpawnGroup {
                        kind: EnemyTypeId::new(1),
                        count: 1,
                    },
                ],
                Vec::new(),
            ],
        };

        assert_eq!(
            wave.spawn_queues(),
            vec![
                vec![EnemyTypeId::new(0), EnemyTypeId::new(0), EnemyTypeId::new(1)],
                Vec::new(),
            ]
        );
        assert_eq!(wave.enemy_count(), 3);
    }
}

//! Level, wave and map definitions consumed by the simulation.

use serde::{Deserialize, Serialize};

use crate::{CellCoord, EnemyTypeId};

/// Ordered list of waves played during a round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    /// Display name of the level.
    #[serde(default)]
    pub name: String,
    /// Waves played in order.
    pub waves: Vec<WaveDefinition>,
}

/// Contents and timing of a single wave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// Seconds to wait before the first enemy of the wave spawns.
    pub countdown: f32,
    /// Seconds after which the wave is force-ended. Zero means unbounded.
    #[serde(default)]
    pub max_duration: f32,
    /// One ordered list of spawn groups per spawn point.
    pub spawns: Vec<Vec<SpawnGroup>>,
}

impl WaveDefinition {
    /// Expands the spawn groups into one queue of enemy types per spawn point.
    ///
    /// The first element of every returned queue spawns first.
    #[must_use]
    pub fn spawn_queues(&self) -> Vec<Vec<EnemyTypeId>> {
        self.spawns
            .iter()
            .map(|groups| {
                groups
                    .iter()
                    .flat_map(|group| {
                        std::iter::repeat(group.kind).take(group.count as usize)
                    })
                    .collect()
            })
            .collect()
    }

    /// Total number of enemies spawned by the wave.
    #[must_use]
    pub fn enemy_count(&self) -> u64 {
        self.spawns
            .iter()
            .flatten()
            .map(|group| u64::from(group.count))
            .sum()
    }
}

/// A run of identical enemies emitted from one spawn point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnGroup {
    /// Enemy type spawned by the group.
    pub kind: EnemyTypeId,
    /// Number of enemies in the group.
    pub count: u32,
}

/// Terrain classification of a single map cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Scenery: neither walkable nor buildable.
    Blocked,
    /// Walkable by enemies.
    Path,
    /// Accepts a tower.
    Tower,
    /// Accepts a tower and grants it the high-range bonus.
    HighTower,
}

impl CellKind {
    /// Parses the single character used in textual map grids.
    ///
    /// `#` is blocked, `.` is path, `T` is a tower cell and `H` a high-range
    /// tower cell.
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '#' => Some(Self::Blocked),
            '.' => Some(Self::Path),
            'T' => Some(Self::Tower),
            'H' => Some(Self::HighTower),
            _ => None,
        }
    }

    /// Reports whether towers may be placed on cells of this kind.
    #[must_use]
    pub const fn accepts_tower(self) -> bool {
        matches!(self, Self::Tower | Self::HighTower)
    }
}

/// Static description of the battlefield.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    /// Side length of a square cell in world units.
    pub cell_length: f32,
    /// Rows of cell glyphs, see [`CellKind::from_glyph`]. All rows must share
    /// the same length.
    pub grid: Vec<String>,
    /// Cells at which enemies enter the map, indexed by spawn point.
    pub spawn_points: Vec<CellCoord>,
    /// Cells enemies try to reach. Entering one costs the player a life.
    pub target_area: Vec<CellCoord>,
    /// Cell enemies walk toward when the target area is unreachable.
    pub default_target: CellCoord,
}

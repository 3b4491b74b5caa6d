//! Immutable stat tables for enemy and tower types.
//!
//! The tables are produced by outer loaders and handed to the simulation at
//! construction time. Nothing in the simulation mutates them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{EnemyTypeId, SimulationError, TowerTypeId};

/// Stats shared by every enemy of one type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemySettings {
    /// Human readable name of the enemy type.
    pub name: String,
    /// Hit points a freshly spawned enemy starts with.
    pub life: f32,
    /// Walking speed measured in world units per second.
    pub speed: f32,
    /// Multiplier applied to the base kill reward.
    #[serde(default = "default_money_factor")]
    pub money_factor: u32,
    /// Sprite identifier forwarded to presentation.
    #[serde(default)]
    pub sprite: String,
}

fn default_money_factor() -> u32 {
    1
}

/// Table of enemy settings indexed by [`EnemyTypeId`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyCatalog {
    entries: Vec<EnemySettings>,
}

impl EnemyCatalog {
    /// Creates a catalog where the entry at index `n` describes type `n`.
    #[must_use]
    pub fn new(entries: Vec<EnemySettings>) -> Self {
        Self { entries }
    }

    /// Looks up the settings for the provided enemy type.
    #[must_use]
    pub fn get(&self, kind: EnemyTypeId) -> Option<&EnemySettings> {
        usize::try_from(kind.get())
            .ok()
            .and_then(|index| self.entries.get(index))
    }

    /// Number of enemy types described by the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A single upgrade tier of a tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerStage {
    /// Seconds between two attacks.
    pub cooldown: f32,
    /// Targeting radius in world units before the high-range bonus.
    pub range: f32,
    /// Number of shots per attack.
    pub attacks: u32,
    /// Damage dealt by each projectile.
    pub power: f32,
    /// Projectile speed in world units per second.
    pub speed: f32,
    /// Per-shot launch offsets relative to the tower's render origin.
    ///
    /// Shots beyond the end of the table reuse the last entry.
    #[serde(default)]
    pub offsets: Vec<Vec2>,
    /// Pivot of the stage sprite, subtracted from the tower position to
    /// obtain the render origin.
    #[serde(default)]
    pub center: Vec2,
    /// Sprite identifier of the tower at this stage.
    #[serde(default)]
    pub sprite: String,
    /// Sprite identifier of the projectiles fired at this stage.
    #[serde(default)]
    pub projectile: String,
    /// Price of this stage: the build cost for the first stage, the upgrade
    /// cost for every later one.
    pub cost: i64,
}

impl TowerStage {
    /// Offset used by the shot with the provided zero-based index.
    ///
    /// The last defined offset is reused for shots beyond the table, and an
    /// empty table launches every shot from the render origin.
    #[must_use]
    pub fn shot_offset(&self, shot: usize) -> Vec2 {
        self.offsets
            .get(shot)
            .or_else(|| self.offsets.last())
            .copied()
            .unwrap_or(Vec2::ZERO)
    }
}

/// Stats and upgrade path of one tower type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerSettings {
    /// Human readable name of the tower type.
    pub name: String,
    /// Type tag selecting the attack pattern, see [`TowerVariant::from_tag`].
    pub tag: String,
    /// Upgrade stages in ascending order. Must not be empty.
    pub stages: Vec<TowerStage>,
}

impl TowerSettings {
    /// Retrieves the stage with the provided index.
    #[must_use]
    pub fn stage(&self, index: usize) -> Option<&TowerStage> {
        self.stages.get(index)
    }

    /// Cost of constructing the tower.
    #[must_use]
    pub fn base_cost(&self) -> i64 {
        self.stages.first().map_or(0, |stage| stage.cost)
    }

    /// Reports whether a tower at `stage` has a further stage available.
    #[must_use]
    pub fn has_stage_after(&self, stage: usize) -> bool {
        stage + 1 < self.stages.len()
    }
}

/// Table of tower settings indexed by [`TowerTypeId`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TowerCatalog {
    entries: Vec<TowerSettings>,
}

impl TowerCatalog {
    /// Creates a catalog where the entry at index `n` describes type `n`.
    #[must_use]
    pub fn new(entries: Vec<TowerSettings>) -> Self {
        Self { entries }
    }

    /// Looks up the settings for the provided tower type.
    #[must_use]
    pub fn get(&self, kind: TowerTypeId) -> Option<&TowerSettings> {
        usize::try_from(kind.get())
            .ok()
            .and_then(|index| self.entries.get(index))
    }

    /// Iterates over all tower types together with their identifiers.
    pub fn iter(&self) -> impl Iterator<Item = (TowerTypeId, &TowerSettings)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, settings)| (TowerTypeId::new(index as u32), settings))
    }

    /// Number of tower types described by the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Attack pattern selected by a tower's type tag.
///
/// Variants only differ in the volley they emit once a target is known;
/// cooldown, staging, upgrades and selling are shared by all towers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerVariant {
    /// Fires every shot of the volley at the current target.
    Archer,
    /// Fires a single shell carrying the damage of the whole volley.
    Cannon,
    /// Spreads the volley over the nearest enemies in range.
    Tea,
}

impl TowerVariant {
    /// Resolves the variant named by a settings type tag.
    pub fn from_tag(tag: &str) -> Result<Self, SimulationError> {
        match tag {
            "archer" => Ok(Self::Archer),
            "cannon" | "canon" => Ok(Self::Cannon),
            "tea" => Ok(Self::Tea),
            other => Err(SimulationError::UnknownTowerType {
                tag: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_with_offsets(offsets: Vec<Vec2>) -> TowerStage {
        TowerStage {
            cooldown: 1.0,
            range: 100.0,
            attacks: 5,
            power: 1.0,
            speed: 200.0,
            offsets,
            center: Vec2::ZERO,
            sprite: String::new(),
            projectile: String::new(),
            cost: 10,
        }
    }

    #[test]
    fn shots_past_the_table_reuse_the_last_offset() {
        let first = Vec2::new(-4.0, 2.0);
        let last = Vec2::new(4.0, 2.0);
        let stage = stage_with_offsets(vec![first, last]);

        assert_eq!(stage.shot_offset(0), first);
        assert_eq!(stage.shot_offset(1), last);
        assert_eq!(stage.shot_offset(2), last);
        assert_eq!(stage.shot_offset(3), last);
        assert_eq!(stage.shot_offset(4), last);
    }

    #[test]
    fn empty_offset_table_launches_from_origin() {
        let stage = stage_with_offsets(Vec::new());
        assert_eq!(stage.shot_offset(3), Vec2::ZERO);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(
            TowerVariant::from_tag("ballista"),
            Err(SimulationError::UnknownTowerType {
                tag: "ballista".to_owned()
            })
        );
        assert_eq!(TowerVariant::from_tag("canon"), Ok(TowerVariant::Cannon));
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic tower targets from world snapshots.

use bastion_core::{EnemyId, EnemyView, TowerId, TowerSnapshot, TowerTarget, TowerView};
use glam::Vec2;

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    tower_workspace: Vec<TowerId>,
    enemy_workspace: Vec<EnemyCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides the target of every tower that became ready this frame.
    ///
    /// A tower keeps its remembered target while that enemy still exists, is
    /// relevant and stays within range. Otherwise it picks the nearest
    /// relevant enemy, preferring the one that spawned first on ties, and
    /// ends up without a target when that enemy is out of range.
    ///
    /// The output buffer is cleared before populating it with one decision
    /// per ready tower, in ascending tower order.
    pub fn handle(
        &mut self,
        ready: &[TowerId],
        towers: &TowerView,
        enemies: &EnemyView,
        out: &mut Vec<TowerTarget>,
    ) {
        out.clear();

        if ready.is_empty() {
            return;
        }

        self.tower_workspace.clear();
        self.tower_workspace.extend_from_slice(ready);
        self.tower_workspace.sort_unstable();
        self.tower_workspace.dedup();

        self.prepare_enemy_workspace(enemies);

        for id in &self.tower_workspace {
            let Some(tower) = towers.get(*id) else {
                continue;
            };
            if tower.sold {
                continue;
            }

            let target = self.retained_target(tower).or_else(|| self.acquire(tower));
            out.push(TowerTarget {
                tower: tower.id,
                target,
                retargeted: target != tower.target,
            });
        }
    }

    fn prepare_enemy_workspace(&mut self, enemies: &EnemyView) {
        self.enemy_workspace.clear();
        self.enemy_workspace
            .extend(enemies.eligible().map(|snapshot| EnemyCandidate {
                id: snapshot.id,
                serial: snapshot.serial,
                position: snapshot.position,
            }));
    }

    fn retained_target(&self, tower: &TowerSnapshot) -> Option<EnemyId> {
        let current = tower.target?;
        self.enemy_workspace
            .iter()
            .find(|candidate| candidate.id == current)
            .filter(|candidate| candidate.position.distance(tower.position) <= tower.range)
            .map(|candidate| candidate.id)
    }

    fn acquire(&self, tower: &TowerSnapshot) -> Option<EnemyId> {
        let mut best: Option<BestCandidate> = None;

        for candidate in &self.enemy_workspace {
            let current = BestCandidate {
                distance_sq: candidate.position.distance_squared(tower.position),
                serial: candidate.serial,
                enemy: candidate.id,
            };

            match &mut best {
                Some(existing) => {
                    if current.precedes(existing) {
                        *existing = current;
                    }
                }
                None => best = Some(current),
            }
        }

        best.filter(|candidate| candidate.distance_sq.sqrt() <= tower.range)
            .map(|candidate| candidate.enemy)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct EnemyCandidate {
    id: EnemyId,
    serial: u64,
    position: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BestCandidate {
    distance_sq: f32,
    serial: u64,
    enemy: EnemyId,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance_sq != other.distance_sq {
            return self.distance_sq < other.distance_sq;
        }

        self.serial < other.serial
    }
}

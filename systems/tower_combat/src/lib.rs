#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns targeting decisions into projectile volleys.

use bastion_core::{
    Command, EnemyId, EnemyView, TowerCatalog, TowerSnapshot, TowerStage, TowerTarget,
    TowerVariant, TowerView,
};
use glam::Vec2;

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
    spread: Vec<(f32, u64, EnemyId)>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::AssignTarget` for every changed decision followed by
    /// the `Command::FireProjectile` volley of each tower that has a target.
    pub fn handle(
        &mut self,
        decisions: &[TowerTarget],
        towers: &TowerView,
        enemies: &EnemyView,
        catalog: &TowerCatalog,
        out: &mut Vec<Command>,
    ) {
        if decisions.is_empty() {
            return;
        }

        self.scratch.clear();

        for decision in decisions {
            if decision.retargeted {
                self.scratch.push(Command::AssignTarget {
                    tower: decision.tower,
                    target: decision.target,
                });
            }

            let Some(target) = decision.target else {
                continue;
            };
            let Some(tower) = towers.get(decision.tower) else {
                continue;
            };
            let Some(stage) = catalog
                .get(tower.kind)
                .and_then(|settings| settings.stage(tower.stage))
            else {
                continue;
            };

            match tower.variant {
                TowerVariant::Archer => {
                    for shot in 0..stage.attacks as usize {
                        self.fire(tower, stage, shot, target, stage.power);
                    }
                }
                TowerVariant::Cannon => {
                    if stage.attacks > 0 {
                        self.fire(tower, stage, 0, target, stage.power * stage.attacks as f32);
                    }
                }
                TowerVariant::Tea => {
                    self.rank_neighbours(tower, target, enemies);
                    let extra: Vec<EnemyId> = self
                        .spread
                        .iter()
                        .take((stage.attacks as usize).saturating_sub(1))
                        .map(|(_, _, id)| *id)
                        .collect();
                    for shot in 0..stage.attacks as usize {
                        let victim = match shot {
                            0 => target,
                            _ => extra.get(shot - 1).copied().unwrap_or(target),
                        };
                        self.fire(tower, stage, shot, victim, stage.power);
                    }
                }
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }

    fn fire(
        &mut self,
        tower: &TowerSnapshot,
        stage: &TowerStage,
        shot: usize,
        target: EnemyId,
        power: f32,
    ) {
        self.scratch.push(Command::FireProjectile {
            tower: tower.id,
            target,
            origin: launch_point(tower, stage, shot),
            power,
            speed: stage.speed,
            sprite: stage.projectile.clone(),
        });
    }

    /// Orders the relevant enemies in range other than `target` by distance,
    /// earlier spawns first on ties.
    fn rank_neighbours(&mut self, tower: &TowerSnapshot, target: EnemyId, enemies: &EnemyView) {
        self.spread.clear();
        self.spread.extend(
            enemies
                .eligible()
                .filter(|enemy| enemy.id != target)
                .map(|enemy| {
                    (
                        enemy.position.distance_squared(tower.position),
                        enemy.serial,
                        enemy.id,
                    )
                })
                .filter(|(distance_sq, _, _)| distance_sq.sqrt() <= tower.range),
        );
        self.spread.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
    }
}

/// World position of the given shot: the tower's render origin plus the
/// stage offset, reusing the last offset for shots past the table.
#[must_use]
pub fn launch_point(tower: &TowerSnapshot, stage: &TowerStage, shot: usize) -> Vec2 {
    tower.render_origin + stage.shot_offset(shot)
}

//! Authoritative tower state management utilities.

use bastion_core::{
    CellCoord, EnemyId, SimulationError, TowerId, TowerSettings, TowerSnapshot, TowerStage,
    TowerTypeId, TowerVariant,
};
use glam::Vec2;

/// Tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Tower {
    pub(crate) kind: TowerTypeId,
    pub(crate) variant: TowerVariant,
    pub(crate) cell: CellCoord,
    pub(crate) position: Vec2,
    high_range: bool,
    pub(crate) stage: usize,
    stats: StageStats,
    pub(crate) cooldown_timer: f32,
    pub(crate) target: Option<EnemyId>,
    pub(crate) invested: i64,
    pub(crate) sold: bool,
}

/// Stats derived from the active stage, refreshed whenever the stage changes.
#[derive(Clone, Debug, PartialEq)]
struct StageStats {
    cooldown: f32,
    range: f32,
    center: Vec2,
    sprite: String,
}

impl StageStats {
    fn derive(stage: &TowerStage, high_range: bool, high_range_factor: f32) -> Self {
        let range = if high_range {
            stage.range * high_range_factor
        } else {
            stage.range
        };
        Self {
            cooldown: stage.cooldown,
            range,
            center: stage.center,
            sprite: stage.sprite.clone(),
        }
    }
}

impl Tower {
    /// Creates a stage-zero tower ready to attack on its first update.
    pub(crate) fn build(
        kind: TowerTypeId,
        settings: &TowerSettings,
        cell: CellCoord,
        position: Vec2,
        high_range: bool,
        high_range_factor: f32,
    ) -> Result<Self, SimulationError> {
        let variant = TowerVariant::from_tag(&settings.tag)?;
        let first = settings
            .stage(0)
            .ok_or(SimulationError::UnknownTowerSettings { kind })?;

        Ok(Self {
            kind,
            variant,
            cell,
            position,
            high_range,
            stage: 0,
            stats: StageStats::derive(first, high_range, high_range_factor),
            cooldown_timer: 0.0,
            target: None,
            invested: first.cost,
            sold: false,
        })
    }

    /// Counts the cooldown down and reports whether the tower attacks now.
    ///
    /// The timer only decays while positive; once it reaches zero the tower
    /// is ready and the timer restarts at the full cooldown, so a tower
    /// attacks at most once per update.
    pub(crate) fn tick(&mut self, dt: f32) -> bool {
        if self.cooldown_timer > 0.0 {
            self.cooldown_timer -= dt;
        }

        if self.cooldown_timer <= 0.0 {
            self.cooldown_timer = self.stats.cooldown;
            return true;
        }
        false
    }

    /// Advances to the next stage and returns its cost.
    pub(crate) fn upgrade(
        &mut self,
        id: TowerId,
        settings: &TowerSettings,
        high_range_factor: f32,
    ) -> Result<i64, SimulationError> {
        let next = self.stage + 1;
        let stage = settings
            .stage(next)
            .ok_or(SimulationError::InvalidStage {
                tower: id,
                stage: self.stage,
                stages: settings.stages.len(),
            })?;

        self.stage = next;
        self.stats = StageStats::derive(stage, self.high_range, high_range_factor);
        if self.cooldown_timer > self.stats.cooldown {
            self.cooldown_timer = self.stats.cooldown;
        }
        self.invested += stage.cost;
        Ok(stage.cost)
    }

    /// Position minus the stage sprite centre.
    pub(crate) fn render_origin(&self) -> Vec2 {
        self.position - self.stats.center
    }

    pub(crate) fn snapshot(&self, id: TowerId) -> TowerSnapshot {
        TowerSnapshot {
            id,
            kind: self.kind,
            variant: self.variant,
            cell: self.cell,
            position: self.position,
            render_origin: self.render_origin(),
            stage: self.stage,
            range: self.stats.range,
            cooldown_remaining: self.cooldown_timer.max(0.0),
            target: self.target,
            invested: self.invested,
            sold: self.sold,
            sprite: self.stats.sprite.clone(),
        }
    }
}

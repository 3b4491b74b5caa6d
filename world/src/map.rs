//! Battlefield geometry and the queries every other component consults.

use std::collections::BTreeSet;

use bastion_core::{CellCoord, CellKind, MapDefinition, SimulationError};
use glam::Vec2;

use crate::navigation::NavigationField;

/// Grid of terrain cells plus the set of cells currently holding a tower.
#[derive(Clone, Debug)]
pub struct Map {
    columns: u32,
    rows: u32,
    cell_length: f32,
    cells: Vec<CellKind>,
    towers: BTreeSet<CellCoord>,
    spawn_points: Vec<CellCoord>,
    target_area: BTreeSet<CellCoord>,
    default_target: CellCoord,
    navigation: NavigationField,
}

impl Map {
    /// Parses and validates a map definition.
    pub fn from_definition(definition: &MapDefinition) -> Result<Self, SimulationError> {
        if definition.cell_length.is_nan() || definition.cell_length <= 0.0 {
            return Err(invalid("cell length must be positive"));
        }

        let rows = u32::try_from(definition.grid.len()).map_err(|_| invalid("too many rows"))?;
        let first = definition
            .grid
            .first()
            .ok_or_else(|| invalid("the grid has no rows"))?;
        let columns =
            u32::try_from(first.chars().count()).map_err(|_| invalid("too many columns"))?;
        if columns == 0 {
            return Err(invalid("the grid has no columns"));
        }

        let mut cells = Vec::with_capacity(definition.grid.len() * first.len());
        for (row, line) in definition.grid.iter().enumerate() {
            if line.chars().count() != first.chars().count() {
                return Err(invalid(format!(
                    "row {row} has {} cells, expected {columns}",
                    line.chars().count()
                )));
            }
            for glyph in line.chars() {
                let kind = CellKind::from_glyph(glyph)
                    .ok_or_else(|| invalid(format!("unknown cell glyph `{glyph}` in row {row}")))?;
                cells.push(kind);
            }
        }

        let in_bounds = |cell: &CellCoord| cell.column() < columns && cell.row() < rows;
        if let Some(cell) = definition.spawn_points.iter().find(|cell| !in_bounds(cell)) {
            return Err(invalid(format!(
                "spawn point ({}, {}) lies outside the grid",
                cell.column(),
                cell.row()
            )));
        }
        if definition.target_area.is_empty() {
            return Err(invalid("the target area is empty"));
        }
        if let Some(cell) = definition.target_area.iter().find(|cell| !in_bounds(cell)) {
            return Err(invalid(format!(
                "target cell ({}, {}) lies outside the grid",
                cell.column(),
                cell.row()
            )));
        }
        if !in_bounds(&definition.default_target) {
            return Err(invalid("the default target lies outside the grid"));
        }

        let target_area: BTreeSet<CellCoord> = definition.target_area.iter().copied().collect();
        let goals: Vec<CellCoord> = target_area.iter().copied().collect();
        let width = usize::try_from(columns).unwrap_or(usize::MAX);
        let navigation = NavigationField::build(columns, rows, &goals, |cell| {
            if target_area.contains(&cell) || definition.spawn_points.contains(&cell) {
                return true;
            }
            let index = cell.row() as usize * width + cell.column() as usize;
            cells.get(index) == Some(&CellKind::Path)
        });

        Ok(Self {
            columns,
            rows,
            cell_length: definition.cell_length,
            cells,
            towers: BTreeSet::new(),
            spawn_points: definition.spawn_points.clone(),
            target_area,
            default_target: definition.default_target,
            navigation,
        })
    }

    /// Number of cell columns.
    #[must_use]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of cell rows.
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a cell in world units.
    #[must_use]
    pub fn cell_length(&self) -> f32 {
        self.cell_length
    }

    /// Terrain of the provided cell, if it lies on the map.
    #[must_use]
    pub fn cell_kind(&self, cell: CellCoord) -> Option<CellKind> {
        self.index(cell).and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether a tower may be placed on the cell right now.
    #[must_use]
    pub fn is_buildable(&self, cell: CellCoord) -> bool {
        !self.towers.contains(&cell)
            && self
                .cell_kind(cell)
                .map_or(false, CellKind::accepts_tower)
    }

    /// Marks the cell as holding a tower. Returns `false` when it was not
    /// buildable.
    pub fn place_tower(&mut self, cell: CellCoord) -> bool {
        self.is_buildable(cell) && self.towers.insert(cell)
    }

    /// Frees a cell previously claimed by [`Map::place_tower`].
    pub fn remove_tower(&mut self, cell: CellCoord) -> bool {
        self.towers.remove(&cell)
    }

    /// Reports whether the cell currently holds a tower.
    #[must_use]
    pub fn has_tower(&self, cell: CellCoord) -> bool {
        self.towers.contains(&cell)
    }

    /// Number of spawn points defined by the map.
    #[must_use]
    pub fn spawn_point_count(&self) -> usize {
        self.spawn_points.len()
    }

    /// World position at which enemies of the given spawn point appear.
    #[must_use]
    pub fn spawn_position(&self, index: usize) -> Option<Vec2> {
        self.spawn_points
            .get(index)
            .map(|cell| self.cell_center(*cell))
    }

    /// World position enemies walk toward when the target area is out of reach.
    #[must_use]
    pub fn default_target_position(&self) -> Vec2 {
        self.cell_center(self.default_target)
    }

    /// Reports whether a tower at this world position receives the range bonus.
    #[must_use]
    pub fn is_high_range(&self, position: Vec2) -> bool {
        self.cell_at(position)
            .and_then(|cell| self.cell_kind(cell))
            == Some(CellKind::HighTower)
    }

    /// Reports whether the world position lies inside the target area.
    #[must_use]
    pub fn is_in_target_area(&self, position: Vec2) -> bool {
        self.cell_at(position)
            .map_or(false, |cell| self.target_area.contains(&cell))
    }

    /// Cell containing the world position, if it lies on the map.
    #[must_use]
    pub fn cell_at(&self, position: Vec2) -> Option<CellCoord> {
        if position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        let column = (position.x / self.cell_length).floor() as u32;
        let row = (position.y / self.cell_length).floor() as u32;
        (column < self.columns && row < self.rows).then(|| CellCoord::new(column, row))
    }

    /// World position of the cell's centre.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(
            (cell.column() as f32 + 0.5) * self.cell_length,
            (cell.row() as f32 + 0.5) * self.cell_length,
        )
    }

    /// Next point an enemy standing at `position` should walk toward.
    ///
    /// Enemies follow the shortest walkable route to the target area and
    /// stop at the centre of the first target cell they reach. Enemies that
    /// cannot reach the target area walk straight to the default target.
    #[must_use]
    pub fn next_waypoint(&self, position: Vec2) -> Vec2 {
        let Some(cell) = self.cell_at(position) else {
            return self.default_target_position();
        };

        if self.target_area.contains(&cell) {
            return self.cell_center(cell);
        }

        match self.navigation.downhill(cell) {
            Some(next) => self.cell_center(next),
            None => self.default_target_position(),
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

fn invalid(reason: impl Into<String>) -> SimulationError {
    SimulationError::InvalidMap {
        reason: reason.into(),
    }
}

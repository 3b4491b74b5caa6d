//! Static path-following field built once per map.

use std::{cmp::Reverse, collections::BinaryHeap};

use bastion_core::CellCoord;

/// Neighbour offsets in fixed order: N, NE, E, SE, S, SW, W, NW.
const NEIGHBORS: [(i64, i64); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

const CARDINAL_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

/// Dense weighted-distance grid seeded from the target area.
///
/// Distances default to `u32::MAX` for cells enemies cannot walk or from
/// which the target area is unreachable.
#[derive(Clone, Debug, Default)]
pub(crate) struct NavigationField {
    width: u32,
    height: u32,
    distances: Vec<u32>,
}

impl NavigationField {
    /// Builds the field with a multi-source Dijkstra search from `goals`.
    ///
    /// Diagonal moves are only allowed when both adjacent cardinal cells are
    /// walkable, so enemies never cut blocked corners.
    pub(crate) fn build<F>(width: u32, height: u32, goals: &[CellCoord], is_walkable: F) -> Self
    where
        F: Fn(CellCoord) -> bool,
    {
        let width_usize = usize::try_from(width).unwrap_or(0);
        let height_usize = usize::try_from(height).unwrap_or(0);
        let cell_count = width_usize.checked_mul(height_usize).unwrap_or(0);

        let mut field = Self {
            width,
            height,
            distances: vec![u32::MAX; cell_count],
        };

        if cell_count == 0 {
            return field;
        }

        let mut heap: BinaryHeap<Reverse<(u32, usize)>> = BinaryHeap::new();

        for &goal in goals {
            if !is_walkable(goal) {
                continue;
            }

            if let Some(goal_index) = field.index(goal) {
                field.distances[goal_index] = 0;
                heap.push(Reverse((0, goal_index)));
            }
        }

        while let Some(Reverse((distance, current))) = heap.pop() {
            if distance > field.distances[current] {
                continue;
            }

            let cell = field.coord(current);

            for (slot, &(dx, dy)) in NEIGHBORS.iter().enumerate() {
                let Some(neighbor) = field.offset(cell, dx, dy) else {
                    continue;
                };

                if !is_walkable(neighbor) {
                    continue;
                }

                let diagonal = slot % 2 == 1;
                if diagonal && !field.corner_clear(cell, dx, dy, &is_walkable) {
                    continue;
                }

                let Some(neighbor_index) = field.index(neighbor) else {
                    continue;
                };

                let step = if diagonal { DIAGONAL_COST } else { CARDINAL_COST };
                let next = distance.saturating_add(step);
                if next < field.distances[neighbor_index] {
                    field.distances[neighbor_index] = next;
                    heap.push(Reverse((next, neighbor_index)));
                }
            }
        }

        field
    }

    /// Distance captured for the provided cell, if it lies within the field
    /// and reaches a goal.
    #[must_use]
    pub(crate) fn distance(&self, cell: CellCoord) -> Option<u32> {
        self.index(cell)
            .and_then(|index| self.distances.get(index).copied())
            .filter(|distance| *distance != u32::MAX)
    }

    /// Neighbour that brings an enemy standing on `cell` closest to a goal.
    ///
    /// Returns `None` when `cell` is a goal itself or cannot reach one. Ties
    /// keep the first neighbour in N, NE, E, SE, S, SW, W, NW order.
    #[must_use]
    pub(crate) fn downhill(&self, cell: CellCoord) -> Option<CellCoord> {
        let current = self.distance(cell)?;
        if current == 0 {
            return None;
        }

        let mut best: Option<(u32, CellCoord)> = None;
        for (slot, &(dx, dy)) in NEIGHBORS.iter().enumerate() {
            let Some(neighbor) = self.offset(cell, dx, dy) else {
                continue;
            };
            if slot % 2 == 1 && !self.corner_clear(cell, dx, dy, &|side| self.distance(side).is_some())
            {
                continue;
            }
            let Some(distance) = self.distance(neighbor) else {
                continue;
            };
            if distance >= current {
                continue;
            }
            if best.map_or(true, |(best_distance, _)| distance < best_distance) {
                best = Some((distance, neighbor));
            }
        }

        best.map(|(_, neighbor)| neighbor)
    }

    fn corner_clear<F>(&self, cell: CellCoord, dx: i64, dy: i64, is_walkable: &F) -> bool
    where
        F: Fn(CellCoord) -> bool,
    {
        let horizontal = self.offset(cell, dx, 0);
        let vertical = self.offset(cell, 0, dy);
        matches!((horizontal, vertical), (Some(a), Some(b)) if is_walkable(a) && is_walkable(b))
    }

    fn offset(&self, cell: CellCoord, dx: i64, dy: i64) -> Option<CellCoord> {
        let column = i64::from(cell.column()) + dx;
        let row = i64::from(cell.row()) + dy;
        if column < 0 || row < 0 || column >= i64::from(self.width) || row >= i64::from(self.height)
        {
            return None;
        }
        Some(CellCoord::new(
            u32::try_from(column).ok()?,
            u32::try_from(row).ok()?,
        ))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.width || cell.row() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    fn coord(&self, index: usize) -> CellCoord {
        let width = usize::try_from(self.width).unwrap_or(1).max(1);
        let column = u32::try_from(index % width).unwrap_or(u32::MAX);
        let row = u32::try_from(index / width).unwrap_or(u32::MAX);
        CellCoord::new(column, row)
    }
}

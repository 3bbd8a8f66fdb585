//! Sparse hash grid for efficient spatial queries

use ahash::AHashMap;

use crate::core::types::{EntityId, Vec2};

/// Sparse hash grid for proximity queries over point entities
#[derive(Debug, Clone)]
pub struct SparseHashGrid {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<(EntityId, Vec2)>>,
}

impl SparseHashGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(0.01),
            cells: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(Vec::is_empty)
    }

    pub fn insert(&mut self, entity: EntityId, pos: Vec2) {
        let coord = self.cell_coord(pos);
        self.cells.entry(coord).or_default().push((entity, pos));
    }

    pub fn remove(&mut self, entity: EntityId, pos: Vec2) -> bool {
        let coord = self.cell_coord(pos);
        if let Some(cell) = self.cells.get_mut(&coord) {
            let before = cell.len();
            cell.retain(|(e, _)| *e != entity);
            let removed = cell.len() != before;
            if cell.is_empty() {
                self.cells.remove(&coord);
            }
            return removed;
        }
        false
    }

    /// Query entities within radius, in a deterministic order
    pub fn query_radius(&self, center: Vec2, radius: f32) -> Vec<(EntityId, Vec2)> {
        let reach = (radius / self.cell_size).ceil() as i32;
        let (cx, cy) = self.cell_coord(center);

        let mut found = Vec::new();
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                if let Some(cell) = self.cells.get(&(cx + dx, cy + dy)) {
                    found.extend(
                        cell.iter()
                            .filter(|(_, pos)| center.distance(pos) <= radius)
                            .copied(),
                    );
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_radius_filters_by_distance() {
        let mut grid = SparseHashGrid::new(2.0);
        let near = EntityId::new();
        let far = EntityId::new();
        grid.insert(near, Vec2::new(1.0, 1.0));
        grid.insert(far, Vec2::new(9.0, 9.0));

        let hits = grid.query_radius(Vec2::new(0.0, 0.0), 3.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, near);
    }

    #[test]
    fn test_query_radius_spans_multiple_cells() {
        let mut grid = SparseHashGrid::new(1.0);
        let e = EntityId::new();
        grid.insert(e, Vec2::new(4.5, 0.0));

        // Five cells away from the query center
        assert_eq!(grid.query_radius(Vec2::ZERO, 4.0).len(), 0);
        assert_eq!(grid.query_radius(Vec2::ZERO, 5.0).len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut grid = SparseHashGrid::new(5.0);
        let e = EntityId::new();
        let pos = Vec2::new(3.0, 3.0);
        grid.insert(e, pos);
        assert_eq!(grid.len(), 1);

        assert!(grid.remove(e, pos));
        assert!(!grid.remove(e, pos));
        assert!(grid.is_empty());
    }
}

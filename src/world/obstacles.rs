//! Reference vision collaborator: walls plus point emitters
//!
//! Walls are axis-aligned boxes; emitters (noise makers, decoys) live in a
//! sparse hash grid so proximity queries stay cheap.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Vec2};
use crate::spatial::sparse_hash::SparseHashGrid;
use crate::world::collaborators::{LayerMask, OverlapHit, VisionQuery};

/// Axis-aligned wall
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub min: Vec2,
    pub max: Vec2,
}

impl Wall {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Slab test: does the segment `from -> to` pass through this box?
    pub fn intersects_segment(&self, from: Vec2, to: Vec2) -> bool {
        let dir = to - from;
        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;

        for (origin, delta, lo, hi) in [
            (from.x, dir.x, self.min.x, self.max.x),
            (from.y, dir.y, self.min.y, self.max.y),
        ] {
            if delta.abs() < 1e-6 {
                if origin < lo || origin > hi {
                    return false;
                }
            } else {
                let inv = 1.0 / delta;
                let mut t1 = (lo - origin) * inv;
                let mut t2 = (hi - origin) * inv;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                t_min = t_min.max(t1);
                t_max = t_max.min(t2);
                if t_min > t_max {
                    return false;
                }
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct ObstacleMap {
    walls: Vec<Wall>,
    emitters: SparseHashGrid,
    emitter_info: AHashMap<EntityId, (Vec2, LayerMask)>,
}

impl ObstacleMap {
    pub fn new(cell_size: f32) -> Self {
        Self {
            walls: Vec::new(),
            emitters: SparseHashGrid::new(cell_size),
            emitter_info: AHashMap::new(),
        }
    }

    pub fn with_walls(cell_size: f32, walls: Vec<Wall>) -> Self {
        let mut map = Self::new(cell_size);
        map.walls = walls;
        map
    }

    pub fn add_wall(&mut self, wall: Wall) {
        self.walls.push(wall);
    }

    pub fn add_emitter(&mut self, position: Vec2, layer: LayerMask) -> EntityId {
        let id = EntityId::new();
        self.emitters.insert(id, position);
        self.emitter_info.insert(id, (position, layer));
        id
    }

    pub fn remove_emitter(&mut self, id: EntityId) -> bool {
        match self.emitter_info.remove(&id) {
            Some((position, _)) => self.emitters.remove(id, position),
            None => false,
        }
    }
}

impl VisionQuery for ObstacleMap {
    fn raycast_clear(&self, from: Vec2, to: Vec2, mask: LayerMask) -> bool {
        if !mask.contains(LayerMask::OBSTACLE) {
            return true;
        }
        !self.walls.iter().any(|w| w.intersects_segment(from, to))
    }

    fn overlap_query(&self, point: Vec2, radius: f32, mask: LayerMask) -> Vec<OverlapHit> {
        self.emitters
            .query_radius(point, radius)
            .into_iter()
            .filter_map(|(entity, position)| {
                let (_, layer) = self.emitter_info.get(&entity)?;
                layer.intersects(mask).then_some(OverlapHit {
                    entity,
                    position,
                    layer: *layer,
                })
            })
            .collect()
    }
}

// Sparse uniform grid for broadphase collision detection. Only occupied cells are stored.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::collision::aabb::AABB;
use crate::collision::collider::{ColliderId, ColliderSet};
use crate::config::SparseHashGridConfig;
use crate::math::{Ray, Vec2};
use crate::objects::BodySet;

use super::CollisionProcessor;

type CellKey = (i64, i64);

/// Inclusive range of cells covered by a collider's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    min_col: i64,
    min_row: i64,
    max_col: i64,
    max_row: i64,
}

impl CellRange {
    fn keys(self) -> impl Iterator<Item = CellKey> {
        (self.min_row..=self.max_row).flat_map(move |row| (self.min_col..=self.max_col).map(move |col| (col, row)))
    }
}

#[derive(Debug, Clone)]
struct Proxy {
    bounds: AABB,
    range: CellRange,
}

/// Colliders bucketed into square cells keyed by integer coordinates.
#[derive(Debug, Clone)]
pub struct SparseHashGrid {
    cell_size: f64,
    inv_cell_size: f64,
    cells: HashMap<CellKey, Vec<ColliderId>>,
    proxies: HashMap<ColliderId, Proxy>,
}

impl SparseHashGrid {
    /// Non-positive or non-finite cell sizes fall back to the default of 100.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            warn!("invalid grid cell size {cell_size}, using the default");
            SparseHashGridConfig::default().cell_size
        };
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            proxies: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, id: ColliderId) -> bool {
        self.proxies.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ColliderId> + '_ {
        self.proxies.keys().copied()
    }

    /// Converts world coordinates to cell coordinates (col, row).
    #[inline]
    fn cell_of(&self, point: Vec2) -> CellKey {
        (
            (point.x * self.inv_cell_size).floor() as i64,
            (point.y * self.inv_cell_size).floor() as i64,
        )
    }

    fn cell_range(&self, bounds: &AABB) -> CellRange {
        let (min_col, min_row) = self.cell_of(bounds.min);
        let (max_col, max_row) = self.cell_of(bounds.max);
        CellRange {
            min_col,
            min_row,
            max_col,
            max_row,
        }
    }

    fn bucket(&mut self, id: ColliderId, range: CellRange) {
        for key in range.keys() {
            self.cells.entry(key).or_default().push(id);
        }
    }

    fn unbucket(&mut self, id: ColliderId, range: CellRange) {
        for key in range.keys() {
            if let Some(cell) = self.cells.get_mut(&key) {
                cell.retain(|c| *c != id);
                if cell.is_empty() {
                    self.cells.remove(&key);
                }
            }
        }
    }

    /// Inserts a collider, replacing any previous entry for it.
    pub fn insert(&mut self, id: ColliderId, bounds: AABB) {
        self.remove(id);
        let range = self.cell_range(&bounds);
        self.bucket(id, range);
        self.proxies.insert(id, Proxy { bounds, range });
    }

    pub fn remove(&mut self, id: ColliderId) {
        if let Some(proxy) = self.proxies.remove(&id) {
            self.unbucket(id, proxy.range);
        }
    }

    /// Stores new bounds; re-buckets only when the covered cells changed. Returns true on re-bucket.
    pub fn update(&mut self, id: ColliderId, bounds: AABB) -> bool {
        let range = self.cell_range(&bounds);
        let Some(proxy) = self.proxies.get_mut(&id) else {
            return false;
        };
        proxy.bounds = bounds;
        if proxy.range == range {
            return false;
        }
        let old = proxy.range;
        proxy.range = range;
        self.unbucket(id, old);
        self.bucket(id, range);
        true
    }

    /// Colliders whose stored bounds overlap `bounds`.
    pub fn query(&self, bounds: &AABB) -> Vec<ColliderId> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for key in self.cell_range(bounds).keys() {
            let Some(cell) = self.cells.get(&key) else {
                continue;
            };
            for &id in cell {
                if seen.insert(id) && self.proxies.get(&id).is_some_and(|p| p.bounds.overlaps(bounds)) {
                    found.push(id);
                }
            }
        }
        found
    }

    /// Pairs of colliders sharing at least one cell, each reported once with the lower id first.
    pub fn potential_pairs(&self) -> Vec<(ColliderId, ColliderId)> {
        let mut pairs = HashSet::new();
        for cell in self.cells.values() {
            for (i, &a) in cell.iter().enumerate() {
                for &b in &cell[i + 1..] {
                    pairs.insert(if a < b { (a, b) } else { (b, a) });
                }
            }
        }
        let mut pairs: Vec<_> = pairs.into_iter().collect();
        pairs.sort();
        pairs
    }

    /// Colliders in the cells the ray walks through (DDA), in walk order, within `max_distance`.
    pub fn ray_query(&self, ray: &Ray, max_distance: f64) -> Vec<ColliderId> {
        // Never walk past the occupied area
        let Some(extent) = self.proxies.values().map(|p| p.bounds).reduce(|a, b| a.combine(&b)) else {
            return Vec::new();
        };
        let Some(exit) = exit_distance(&extent, ray) else {
            return Vec::new();
        };
        let limit = max_distance.min(exit);

        let (mut col, mut row) = self.cell_of(ray.origin);
        let step_col: i64 = if ray.dir.x > 0.0 { 1 } else { -1 };
        let step_row: i64 = if ray.dir.y > 0.0 { 1 } else { -1 };
        let boundary = |cell: i64, origin: f64, dir: f64| {
            if dir > 0.0 {
                ((cell + 1) as f64 * self.cell_size - origin) / dir
            } else if dir < 0.0 {
                (cell as f64 * self.cell_size - origin) / dir
            } else {
                f64::INFINITY
            }
        };
        let mut t_max_x = boundary(col, ray.origin.x, ray.dir.x);
        let mut t_max_y = boundary(row, ray.origin.y, ray.dir.y);
        let t_delta_x = if ray.dir.x != 0.0 { self.cell_size / ray.dir.x.abs() } else { f64::INFINITY };
        let t_delta_y = if ray.dir.y != 0.0 { self.cell_size / ray.dir.y.abs() } else { f64::INFINITY };

        let mut seen = HashSet::new();
        let mut found = Vec::new();
        loop {
            if let Some(cell) = self.cells.get(&(col, row)) {
                for &id in cell {
                    if seen.insert(id) && self.proxies.get(&id).is_some_and(|p| p.bounds.ray_cast(ray, max_distance)) {
                        found.push(id);
                    }
                }
            }
            let next = t_max_x.min(t_max_y);
            if next > limit || !next.is_finite() {
                break;
            }
            if t_max_x < t_max_y {
                col += step_col;
                t_max_x += t_delta_x;
            } else {
                row += step_row;
                t_max_y += t_delta_y;
            }
        }
        found
    }
}

/// Distance at which the ray leaves `bounds`, if it touches it at all.
fn exit_distance(bounds: &AABB, ray: &Ray) -> Option<f64> {
    let x_inv = if ray.dir.x == 0.0 { f64::MAX } else { 1.0 / ray.dir.x };
    let y_inv = if ray.dir.y == 0.0 { f64::MAX } else { 1.0 / ray.dir.y };
    let tx1 = (bounds.min.x - ray.origin.x) * x_inv;
    let tx2 = (bounds.max.x - ray.origin.x) * x_inv;
    let ty1 = (bounds.min.y - ray.origin.y) * y_inv;
    let ty2 = (bounds.max.y - ray.origin.y) * y_inv;
    let t_min = tx1.min(tx2).max(ty1.min(ty2));
    let t_max = tx1.max(tx2).min(ty1.max(ty2));
    (t_max >= t_min.max(0.0)).then_some(t_max)
}

/// Broadphase backed by a `SparseHashGrid`.
#[derive(Debug, Clone)]
pub struct SparseHashGridProcessor {
    grid: SparseHashGrid,
}

impl SparseHashGridProcessor {
    pub fn new(config: SparseHashGridConfig) -> Self {
        Self {
            grid: SparseHashGrid::new(config.cell_size),
        }
    }

    pub fn grid(&self) -> &SparseHashGrid {
        &self.grid
    }
}

impl CollisionProcessor for SparseHashGridProcessor {
    fn track(&mut self, id: ColliderId, colliders: &ColliderSet, bodies: &BodySet) {
        match colliders.bounds(id, bodies) {
            Some(bounds) => self.grid.insert(id, bounds),
            None => warn!("cannot track collider {id}: no geometry"),
        }
    }

    fn untrack(&mut self, id: ColliderId) {
        self.grid.remove(id);
    }

    fn tracked(&self) -> Vec<ColliderId> {
        let mut ids: Vec<ColliderId> = self.grid.ids().collect();
        ids.sort();
        ids
    }

    fn update(&mut self, colliders: &ColliderSet, bodies: &BodySet) -> usize {
        let mut updated = 0;
        for id in self.tracked() {
            match colliders.bounds(id, bodies) {
                Some(bounds) => {
                    if self.grid.update(id, bounds) {
                        updated += 1;
                    }
                }
                None => self.grid.remove(id),
            }
        }
        updated
    }

    fn query(&self, bounds: &AABB) -> Vec<ColliderId> {
        self.grid.query(bounds)
    }

    fn ray_query(&self, ray: &Ray, max_distance: f64) -> Vec<ColliderId> {
        self.grid.ray_query(ray, max_distance)
    }
}

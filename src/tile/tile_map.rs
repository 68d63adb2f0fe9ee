use serde::{Deserialize, Serialize};

use crate::collision::AABB;
use crate::error::{PhysicsError, Result};
use crate::math::Vec2;

use super::CellMap;

/// Uniform grid of cells, some of which are solid. `position` is the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMap {
    pub position: Vec2,
    columns: usize,
    rows: usize,
    tile_width: f64,
    tile_height: f64,
    /// Row-major solid flags.
    solid: Vec<bool>,
}

impl TileMap {
    /// Creates a map with every cell empty.
    pub fn new(position: Vec2, columns: usize, rows: usize, tile_width: f64, tile_height: f64) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(PhysicsError::InvalidTileMap(format!("{columns}x{rows} cells")));
        }
        if !(tile_width > 0.0 && tile_height > 0.0) {
            return Err(PhysicsError::InvalidTileMap(format!(
                "tile size {tile_width}x{tile_height}"
            )));
        }
        Ok(Self {
            position,
            columns,
            rows,
            tile_width,
            tile_height,
            solid: vec![false; columns * rows],
        })
    }

    /// Builds a map from text rows where `#` marks a solid cell and anything else is empty.
    pub fn from_rows(position: Vec2, tile_width: f64, tile_height: f64, rows: &[&str]) -> Result<Self> {
        let columns = rows.first().map_or(0, |r| r.chars().count());
        if rows.iter().any(|r| r.chars().count() != columns) {
            return Err(PhysicsError::InvalidTileMap("rows have different lengths".to_string()));
        }
        let mut map = Self::new(position, columns, rows.len(), tile_width, tile_height)?;
        for (row, line) in rows.iter().enumerate() {
            for (column, c) in line.chars().enumerate() {
                map.solid[row * columns + column] = c == '#';
            }
        }
        Ok(map)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Marks a cell solid or empty. Out-of-range cells are ignored.
    pub fn set_solid(&mut self, column: usize, row: usize, solid: bool) {
        if let Some(index) = self.index(column, row) {
            self.solid[index] = solid;
        }
    }

    pub fn is_solid(&self, column: usize, row: usize) -> bool {
        self.index(column, row).is_some_and(|i| self.solid[i])
    }

    pub fn cell_bounds(&self, column: usize, row: usize) -> AABB {
        let min = self.position + Vec2::new(column as f64 * self.tile_width, row as f64 * self.tile_height);
        AABB::new(min, min + Vec2::new(self.tile_width, self.tile_height))
    }

    /// Cell containing `point`, if it lies inside the map.
    pub fn cell_at(&self, point: Vec2) -> Option<(usize, usize)> {
        let local = point - self.position;
        let column = (local.x / self.tile_width).floor();
        let row = (local.y / self.tile_height).floor();
        if column < 0.0 || row < 0.0 || column >= self.columns as f64 || row >= self.rows as f64 {
            return None;
        }
        Some((column as usize, row as usize))
    }

    fn index(&self, column: usize, row: usize) -> Option<usize> {
        (column < self.columns && row < self.rows).then(|| row * self.columns + column)
    }
}

impl CellMap for TileMap {
    fn bounds(&self) -> AABB {
        let size = Vec2::new(
            self.columns as f64 * self.tile_width,
            self.rows as f64 * self.tile_height,
        );
        AABB::new(self.position, self.position + size)
    }

    fn cell_size(&self) -> Vec2 {
        Vec2::new(self.tile_width, self.tile_height)
    }

    fn solid_cell_at(&self, point: Vec2) -> Option<AABB> {
        let (column, row) = self.cell_at(point)?;
        self.is_solid(column, row).then(|| self.cell_bounds(column, row))
    }
}

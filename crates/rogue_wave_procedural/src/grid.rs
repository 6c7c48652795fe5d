//! # Level Grid
//!
//! Row-major 2D array of placed tiles, dimensions fixed at creation.

use serde::{Deserialize, Serialize};

use crate::tile::{Direction, TileId, TilePalette};

/// Coordinates of a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    /// Column, 0 at the west edge.
    pub x: u32,
    /// Row, 0 at the south edge.
    pub y: u32,
}

impl GridCoord {
    /// Creates a coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another cell.
    #[inline]
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// A placed occurrence of a tile definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInstance {
    /// Where the tile sits.
    pub coord: GridCoord,
    /// Which definition was placed.
    pub tile: TileId,
    /// True when the tile came from the level's fixed placements.
    pub pre_placed: bool,
}

/// Fixed-size grid of optional tile instances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelGrid {
    x_size: u32,
    y_size: u32,
    cells: Vec<Option<TileInstance>>,
}

impl LevelGrid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new(x_size: u32, y_size: u32) -> Self {
        Self {
            x_size,
            y_size,
            cells: vec![None; (x_size as usize) * (y_size as usize)],
        }
    }

    /// Width in cells.
    #[inline]
    #[must_use]
    pub const fn x_size(&self) -> u32 {
        self.x_size
    }

    /// Height in cells.
    #[inline]
    #[must_use]
    pub const fn y_size(&self) -> u32 {
        self.y_size
    }

    /// Checks whether a coordinate is on the grid.
    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.x < self.x_size && coord.y < self.y_size
    }

    #[inline]
    fn index(&self, coord: GridCoord) -> usize {
        coord.y as usize * self.x_size as usize + coord.x as usize
    }

    /// Normalised centre of a cell as a fraction of the map extent.
    #[inline]
    #[must_use]
    pub fn normalized(&self, coord: GridCoord) -> (f32, f32) {
        (
            (coord.x as f32 + 0.5) / self.x_size as f32,
            (coord.y as f32 + 0.5) / self.y_size as f32,
        )
    }

    /// Returns the tile at a coordinate.
    #[must_use]
    pub fn get(&self, coord: GridCoord) -> Option<&TileInstance> {
        if !self.in_bounds(coord) {
            return None;
        }
        self.cells[self.index(coord)].as_ref()
    }

    /// Places a tile. Out-of-bounds coordinates are ignored.
    pub fn set(&mut self, instance: TileInstance) {
        if self.in_bounds(instance.coord) {
            let i = self.index(instance.coord);
            self.cells[i] = Some(instance);
        }
    }

    /// Clears every cell.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    /// Returns the neighbouring coordinate in a direction, if on the grid.
    #[must_use]
    pub fn neighbor_coord(&self, coord: GridCoord, direction: Direction) -> Option<GridCoord> {
        let (dx, dy) = direction.offset();
        let x = i64::from(coord.x) + dx;
        let y = i64::from(coord.y) + dy;
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        let next = GridCoord::new(x, y);
        self.in_bounds(next).then_some(next)
    }

    /// Returns the tile next to `coord` in `direction`.
    #[must_use]
    pub fn neighbor(&self, coord: GridCoord, direction: Direction) -> Option<&TileInstance> {
        self.neighbor_coord(coord, direction)
            .and_then(|c| self.get(c))
    }

    /// Iterates coordinates in scan order (row-major, south to north).
    pub fn coords(&self) -> impl Iterator<Item = GridCoord> {
        let (xs, ys) = (self.x_size, self.y_size);
        (0..ys).flat_map(move |y| (0..xs).map(move |x| GridCoord::new(x, y)))
    }

    /// Iterates placed tiles in scan order.
    pub fn tiles(&self) -> impl Iterator<Item = &TileInstance> {
        self.cells.iter().flatten()
    }

    /// Returns true when every cell holds a tile.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Finds the first cell holding `tile` in scan order.
    #[must_use]
    pub fn find(&self, tile: &TileId) -> Option<GridCoord> {
        self.tiles().find(|t| &t.tile == tile).map(|t| t.coord)
    }

    /// Counts the cells holding `tile`.
    #[must_use]
    pub fn count(&self, tile: &TileId) -> usize {
        self.tiles().filter(|t| &t.tile == tile).count()
    }

    /// Renders the grid as text, north row first, one character per cell.
    ///
    /// Each tile is drawn with the first character of its id; empty cells are `.`.
    #[must_use]
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.x_size as usize + 1) * self.y_size as usize);
        for y in (0..self.y_size).rev() {
            for x in 0..self.x_size {
                let c = self
                    .get(GridCoord::new(x, y))
                    .and_then(|t| t.tile.as_str().chars().next())
                    .unwrap_or('.');
                out.push(c);
            }
            out.push('\n');
        }
        out
    }

    /// Lists every violated constraint in the grid.
    ///
    /// Checks that each cell is filled, lies inside its definition's region
    /// and is accepted by all four neighbours (both edge directions).
    #[must_use]
    pub fn violations(&self, palette: &TilePalette) -> Vec<String> {
        let mut problems = Vec::new();

        for coord in self.coords() {
            let Some(instance) = self.get(coord) else {
                problems.push(format!("({}, {}) is empty", coord.x, coord.y));
                continue;
            };
            let Some(def) = palette.get(&instance.tile) else {
                problems.push(format!("({}, {}) holds unknown tile {}", coord.x, coord.y, instance.tile));
                continue;
            };

            let (u, v) = self.normalized(coord);
            if !def.region.contains(u, v) {
                problems.push(format!(
                    "({}, {}) {} is outside its placement region",
                    coord.x, coord.y, def.id
                ));
            }

            for direction in Direction::ALL {
                let Some(neighbor) = self.neighbor(coord, direction) else {
                    continue;
                };
                let Some(neighbor_def) = palette.get(&neighbor.tile) else {
                    continue;
                };
                if palette.compatible(def, direction, neighbor_def).is_none() {
                    problems.push(format!(
                        "({}, {}) {} rejects {} to the {:?}",
                        coord.x, coord.y, def.id, neighbor_def.id, direction
                    ));
                }
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_uses_cell_centre() {
        let grid = LevelGrid::new(5, 5);
        assert_eq!(grid.normalized(GridCoord::new(2, 2)), (0.5, 0.5));
        assert_eq!(grid.normalized(GridCoord::new(0, 4)), (0.1, 0.9));
    }

    #[test]
    fn test_neighbors_at_boundary() {
        let grid = LevelGrid::new(3, 2);
        let corner = GridCoord::new(0, 0);
        assert_eq!(grid.neighbor_coord(corner, Direction::West), None);
        assert_eq!(grid.neighbor_coord(corner, Direction::South), None);
        assert_eq!(grid.neighbor_coord(corner, Direction::North), Some(GridCoord::new(0, 1)));
        assert_eq!(grid.neighbor_coord(GridCoord::new(2, 1), Direction::East), None);
    }

    #[test]
    fn test_scan_order_is_row_major() {
        let grid = LevelGrid::new(2, 2);
        let order: Vec<_> = grid.coords().collect();
        assert_eq!(
            order,
            vec![
                GridCoord::new(0, 0),
                GridCoord::new(1, 0),
                GridCoord::new(0, 1),
                GridCoord::new(1, 1),
            ]
        );
    }

    #[test]
    fn test_set_get_and_ascii() {
        let mut grid = LevelGrid::new(2, 1);
        grid.set(TileInstance {
            coord: GridCoord::new(1, 0),
            tile: TileId::from("road"),
            pre_placed: false,
        });
        assert!(grid.get(GridCoord::new(0, 0)).is_none());
        assert_eq!(grid.find(&TileId::from("road")), Some(GridCoord::new(1, 0)));
        assert!(!grid.is_complete());
        assert_eq!(grid.to_ascii(), ".r\n");
    }
}

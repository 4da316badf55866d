//! Tile grid coordinates, capture rectangles and surface bounds

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Edge length of one canvas tile in pixels
pub const DEFAULT_TILE_SIZE: u32 = 1000;

/// Index of one square tile in the server's grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    pub x: u32,
    pub y: u32,
}

impl TileIndex {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Offset of a pixel inside its tile
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LocalPixel {
    pub x: u32,
    pub y: u32,
}

impl LocalPixel {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Pixel position in the single coordinate space spanning all tiles
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GlobalPixel {
    pub x: u64,
    pub y: u64,
}

impl GlobalPixel {
    pub fn new(x: u64, y: u64) -> Self {
        Self { x, y }
    }
}

/// A point in tile + local form, as the overlay displays it
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    #[serde(rename = "tlx")]
    pub tile_x: u32,
    #[serde(rename = "tly")]
    pub tile_y: u32,
    pub px: u32,
    pub py: u32,
}

impl TileCoord {
    pub fn new(tile_x: u32, tile_y: u32, px: u32, py: u32) -> Self {
        Self {
            tile_x,
            tile_y,
            px,
            py,
        }
    }

    pub fn tile(&self) -> TileIndex {
        TileIndex::new(self.tile_x, self.tile_y)
    }

    pub fn local(&self) -> LocalPixel {
        LocalPixel::new(self.px, self.py)
    }

    /// Whether the local offset lies inside a tile of `grid`
    pub fn is_valid_for(&self, grid: TileGrid) -> bool {
        self.px < grid.tile_size && self.py < grid.tile_size
    }

    /// Compact `tlx,tly,px,py` form used on the command line
    pub fn compact(&self) -> String {
        format!("{},{},{},{}", self.tile_x, self.tile_y, self.px, self.py)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(Tl X: {}, Tl Y: {}, Px X: {}, Px Y: {})",
            self.tile_x, self.tile_y, self.px, self.py
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected four non-negative integers `tlx,tly,px,py`, got `{0}`")]
pub struct ParseTileCoordError(String);

impl FromStr for TileCoord {
    type Err = ParseTileCoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| ParseTileCoordError(s.to_string()))?;
        match parts.as_slice() {
            [tile_x, tile_y, px, py] => Ok(Self::new(*tile_x, *tile_y, *px, *py)),
            _ => Err(ParseTileCoordError(s.to_string())),
        }
    }
}

/// The server's tile grid: every conversion between tile and global space
/// goes through the grid's fixed tile edge length
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub tile_size: u32,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl TileGrid {
    pub fn new(tile_size: u32) -> Self {
        debug_assert!(tile_size > 0, "tile size must be positive");
        Self { tile_size }
    }

    fn size(&self) -> u64 {
        u64::from(self.tile_size)
    }

    /// `gx = tileX*T + px`, `gy = tileY*T + py`
    pub fn to_global(&self, tile: TileIndex, local: LocalPixel) -> GlobalPixel {
        debug_assert!(local.x < self.tile_size && local.y < self.tile_size);
        GlobalPixel {
            x: u64::from(tile.x) * self.size() + u64::from(local.x),
            y: u64::from(tile.y) * self.size() + u64::from(local.y),
        }
    }

    pub fn coord_to_global(&self, coord: TileCoord) -> GlobalPixel {
        self.to_global(coord.tile(), coord.local())
    }

    /// Inverse of [`TileGrid::to_global`]
    pub fn to_tile_local(&self, global: GlobalPixel) -> TileCoord {
        let tile_x = global.x / self.size();
        let tile_y = global.y / self.size();
        TileCoord {
            tile_x: tile_x as u32,
            tile_y: tile_y as u32,
            px: (global.x - tile_x * self.size()) as u32,
            py: (global.y - tile_y * self.size()) as u32,
        }
    }

    /// Tile containing the given global pixel
    pub fn tile_of(&self, global: GlobalPixel) -> TileIndex {
        self.to_tile_local(global).tile()
    }

    /// Global position of a tile's top-left pixel
    pub fn tile_origin(&self, tile: TileIndex) -> GlobalPixel {
        self.to_global(tile, LocalPixel::default())
    }
}

/// Inclusive rectangle in global pixel space
///
/// Built with [`CaptureRect::normalize`] the edges are always ordered;
/// [`CaptureRect::width`] and [`CaptureRect::height`] are signed so a
/// hand-built rectangle with crossed edges reports a non-positive size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureRect {
    pub left: u64,
    pub top: u64,
    pub right: u64,
    pub bottom: u64,
}

impl CaptureRect {
    /// Canonical rectangle spanned by two corners given in any order
    pub fn normalize(a: GlobalPixel, b: GlobalPixel) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    /// Rectangle of `width × height` pixels starting at `origin`
    pub fn from_origin(origin: GlobalPixel, width: u32, height: u32) -> Self {
        Self {
            left: origin.x,
            top: origin.y,
            right: (origin.x + u64::from(width)).saturating_sub(1),
            bottom: (origin.y + u64::from(height)).saturating_sub(1),
        }
    }

    pub fn width(&self) -> i64 {
        self.right as i64 - self.left as i64 + 1
    }

    pub fn height(&self) -> i64 {
        self.bottom as i64 - self.top as i64 + 1
    }

    pub fn top_left(&self) -> GlobalPixel {
        GlobalPixel::new(self.left, self.top)
    }
}

/// Screen-space rectangle of the live surface, half-open on the right and bottom
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Create a new rectangle from coordinates
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from its position and size
    pub fn from_xywh(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            left: x,
            top: y,
            right: x.saturating_add_unsigned(width),
            bottom: y.saturating_add_unsigned(height),
        }
    }

    /// Check if this rectangle contains a point
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected `x,y,width,height`, got `{0}`")]
pub struct ParseRectError(String);

impl FromStr for Rect {
    type Err = ParseRectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRectError(s.to_string());
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, w, h] = parts.as_slice() else {
            return Err(err());
        };
        Ok(Rect::from_xywh(
            x.parse().map_err(|_| err())?,
            y.parse().map_err(|_| err())?,
            w.parse().map_err(|_| err())?,
            h.parse().map_err(|_| err())?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_global_and_back() {
        let grid = TileGrid::default();
        let coord = TileCoord::new(1, 2, 10, 20);
        let global = grid.coord_to_global(coord);
        assert_eq!(global, GlobalPixel::new(1010, 2020));
        assert_eq!(grid.to_tile_local(global), coord);
    }

    #[test]
    fn test_round_trip_over_tile_boundaries() {
        let grid = TileGrid::new(7);
        for gx in 0..50u64 {
            for gy in [0u64, 6, 7, 8, 13, 14, 99] {
                let g = GlobalPixel::new(gx, gy);
                let c = grid.to_tile_local(g);
                assert!(c.is_valid_for(grid));
                assert_eq!(grid.coord_to_global(c), g);
            }
        }
        for tx in 0..4 {
            for px in 0..7 {
                let c = TileCoord::new(tx, 3, px, 6 - px);
                assert_eq!(grid.to_tile_local(grid.coord_to_global(c)), c);
            }
        }
    }

    #[test]
    fn test_large_tile_indices_do_not_overflow() {
        let grid = TileGrid::default();
        let c = TileCoord::new(2047, 2047, 999, 999);
        let g = grid.coord_to_global(c);
        assert_eq!(g, GlobalPixel::new(2_047_999, 2_047_999));
        assert_eq!(grid.to_tile_local(g), c);
    }

    #[test]
    fn test_normalize_is_order_independent() {
        let a = GlobalPixel::new(1050, 2020);
        let b = GlobalPixel::new(1010, 2060);
        let r = CaptureRect::normalize(a, b);
        assert_eq!(r, CaptureRect::normalize(b, a));
        assert_eq!(
            r,
            CaptureRect {
                left: 1010,
                top: 2020,
                right: 1050,
                bottom: 2060
            }
        );
        assert_eq!((r.width(), r.height()), (41, 41));
    }

    #[test]
    fn test_single_point_rectangle() {
        let p = GlobalPixel::new(999, 999);
        let r = CaptureRect::normalize(p, p);
        assert_eq!((r.width(), r.height()), (1, 1));
        assert_eq!(r.top_left(), p);
    }

    #[test]
    fn test_crossed_edges_have_non_positive_size() {
        let r = CaptureRect {
            left: 10,
            top: 10,
            right: 8,
            bottom: 10,
        };
        assert_eq!(r.width(), -1);
        assert_eq!(r.height(), 1);
    }

    #[test]
    fn test_from_origin() {
        let r = CaptureRect::from_origin(GlobalPixel::new(5, 6), 3, 2);
        assert_eq!((r.left, r.top, r.right, r.bottom), (5, 6, 7, 7));
        assert_eq!((r.width(), r.height()), (3, 2));
    }

    #[test]
    fn test_tile_coord_from_str() {
        assert_eq!(
            "1, 2,3,4".parse::<TileCoord>(),
            Ok(TileCoord::new(1, 2, 3, 4))
        );
        assert!("1,2,3".parse::<TileCoord>().is_err());
        assert!("1,2,3,-4".parse::<TileCoord>().is_err());
        assert_eq!(TileCoord::new(1, 2, 3, 4).compact(), "1,2,3,4");
    }

    #[test]
    fn test_surface_rect_contains_point() {
        let r: Rect = "10,20,100,50".parse().unwrap();
        assert_eq!(r, Rect::new(10, 20, 110, 70));
        assert!(r.contains_point(10, 20));
        assert!(r.contains_point(109, 69));
        assert!(!r.contains_point(110, 30));
        assert!(!r.contains_point(50, 19));
    }
}

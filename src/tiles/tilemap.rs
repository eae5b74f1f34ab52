use bevy::prelude::*;

use super::constants::*;
use super::tile::{Tile, TileFlags};
use super::types::TileId;

/// Dense tile grid covering the whole map, row-major with y growing downward
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct Tilemap {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl Tilemap {
    /// Create a map filled with tile 0
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![Tile::default(); (width as usize) * (height as usize)],
        }
    }

    /// Build a map from raw tiles. Returns None if the tile count doesn't match.
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Tile>) -> Option<Self> {
        if tiles.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            tiles,
        })
    }

    /// Vertical stripes two tiles wide cycling grass, dirt, sand, gravel
    pub fn generate_striped(width: u32, height: u32) -> Self {
        let mut map = Self::new(width, height);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let id = match x % 8 {
                    0 | 1 => TILE_GRASS,
                    2 | 3 => TILE_DIRT,
                    4 | 5 => TILE_SAND,
                    _ => TILE_GRAVEL,
                };
                map.set(x, y, id);
            }
        }
        map
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// Map size in world pixels
    pub fn pixel_size(&self, tile_size: u32) -> Vec2 {
        (self.size() * tile_size).as_vec2()
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&Tile> {
        self.index(x, y).map(|i| &self.tiles[i])
    }

    /// Tile id at a position, None outside the map
    pub fn tile_id(&self, x: i32, y: i32) -> Option<TileId> {
        self.get(x, y).map(|tile| tile.id)
    }

    /// Set the tile id, keeping flags. Returns false outside the map.
    pub fn set(&mut self, x: i32, y: i32, id: TileId) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.tiles[i].id = id;
                true
            }
            None => false,
        }
    }

    /// Replace the whole tile. Returns false outside the map.
    pub fn set_tile(&mut self, x: i32, y: i32, tile: Tile) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.tiles[i] = tile;
                true
            }
            None => false,
        }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Number of tiles carrying all of the given flags
    pub fn count_flagged(&self, flags: TileFlags) -> usize {
        self.tiles.iter().filter(|t| t.flags.contains(flags)).count()
    }
}

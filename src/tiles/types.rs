use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Type alias for tile IDs
pub type TileId = u16;

/// Chunk position in chunk coordinates (not world/tile coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Convert from tile position to chunk position
    pub fn from_tile(tile_pos: IVec2, chunk_size: i32) -> Self {
        Self {
            x: tile_pos.x.div_euclid(chunk_size),
            y: tile_pos.y.div_euclid(chunk_size),
        }
    }

    /// Tile coordinate of the chunk's top-left corner
    pub fn tile_origin(&self, chunk_size: i32) -> IVec2 {
        IVec2::new(self.x * chunk_size, self.y * chunk_size)
    }

    /// Get all chunks in a square radius around this chunk
    pub fn chunks_in_radius(&self, radius: i32) -> Vec<ChunkPos> {
        if radius < 0 {
            return Vec::new();
        }
        let mut chunks = Vec::with_capacity(((radius * 2 + 1) * (radius * 2 + 1)) as usize);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                chunks.push(ChunkPos::new(self.x + dx, self.y + dy));
            }
        }
        chunks
    }

    /// Chebyshev distance (square/max distance) between two chunk positions.
    /// Matches the square load radius.
    pub fn chebyshev_distance(&self, other: &ChunkPos) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

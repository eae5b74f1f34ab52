use super::{tilemap::Tilemap, types::*};
use bevy::prelude::*;
use bevy::sprite_render::TileData;

/// Component marking a chunk texture entity with its position
#[derive(Component, Debug, Clone, Copy)]
pub struct Chunk {
    pub position: ChunkPos,
}

impl Chunk {
    pub fn new(position: ChunkPos) -> Self {
        Self { position }
    }
}

/// Tile ids covered by a chunk, row-major with row 0 at the top.
/// Positions outside the map are None.
pub fn chunk_tiles(tilemap: &Tilemap, pos: ChunkPos, chunk_size: u32) -> Vec<Option<TileId>> {
    let size = chunk_size as i32;
    let origin = pos.tile_origin(size);
    let mut tiles = Vec::with_capacity((chunk_size * chunk_size) as usize);
    for ly in 0..size {
        for lx in 0..size {
            tiles.push(tilemap.tile_id(origin.x + lx, origin.y + ly));
        }
    }
    tiles
}

/// Convert chunk tiles to Bevy's TilemapChunkTileData layout.
/// Tile ids map straight onto tileset layers.
pub fn to_tilemap_data(tiles: &[Option<TileId>]) -> Vec<Option<TileData>> {
    tiles
        .iter()
        .map(|tile| tile.map(TileData::from_tileset_index))
        .collect()
}

/// Helper functions for chunk coordinate conversions
pub mod coords {
    use super::*;

    /// Chunk containing a tile
    pub fn chunk_of(tile: IVec2, chunk_size: u32) -> ChunkPos {
        ChunkPos::from_tile(tile, chunk_size as i32)
    }

    /// Tile position within its chunk (0..chunk_size)
    pub fn local_of(tile: IVec2, chunk_size: u32) -> UVec2 {
        let size = chunk_size as i32;
        UVec2::new(tile.x.rem_euclid(size) as u32, tile.y.rem_euclid(size) as u32)
    }

    /// Map tile from a chunk and a local offset
    pub fn tile_of(chunk: ChunkPos, local: UVec2, chunk_size: u32) -> IVec2 {
        chunk.tile_origin(chunk_size as i32) + local.as_ivec2()
    }

    /// World-space (y-down, pixels) top-left corner of a chunk
    pub fn chunk_world_origin(chunk: ChunkPos, chunk_size: u32, tile_size: u32) -> Vec2 {
        (chunk.tile_origin(chunk_size as i32) * tile_size as i32).as_vec2()
    }
}

/// Map width and height in tiles
pub const MAP_SIZE: u32 = 128;

/// Pixel size of each tile
pub const TILE_SIZE: u32 = 16;

/// Size of each chunk in tiles (width and height)
pub const CHUNK_SIZE: u32 = 16;

/// Hard ceiling on the number of rects an atlas may hold
pub const ATLAS_MAX_CAPACITY: usize = 500;

// Tile type constants
pub const TILE_GRASS: u16 = 0;
pub const TILE_DIRT: u16 = 1;
pub const TILE_SAND: u16 = 2;
pub const TILE_GRAVEL: u16 = 3;

/// Solid wall, the default brush
pub const TILE_WALL: u16 = 4;

/// Z-positions in world space
pub const Z_CHUNKS: f32 = 0.0;
pub const Z_PLAYER: f32 = 10.0;

pub mod atlas;
pub mod chunk;
pub mod constants;
pub mod registry;
pub mod tile;
pub mod tilemap;
pub mod types;

// Re-export commonly used items
pub use atlas::{build_tile_array, Atlas, AtlasError, AtlasTable};
pub use chunk::{chunk_tiles, coords, to_tilemap_data, Chunk};
pub use constants::*;
pub use registry::{TileProperties, TileRegistry};
pub use tile::{Tile, TileFlags};
pub use tilemap::Tilemap;
pub use types::{ChunkPos, TileId};

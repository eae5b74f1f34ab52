pub mod loader;
pub mod manager;
pub mod serialization;

// Re-export commonly used items
pub use loader::{
    build_chunk_tileset, chunk_center, format_chunk_grid, register_chunk_observers, stream_chunks,
    ChunkTileset,
};
pub use manager::{ChunkManager, ChunkRenderData, ChunkStats, Observer, RenderPlan, StreamingDelta};
pub use serialization::{load_map, save_map, MapIoError};

use bevy::prelude::*;

use crate::camera::world_to_bevy;
use crate::config::GameConfig;
use crate::tiles::{coords, ChunkPos};
use crate::world::{format_chunk_grid, ChunkManager};

const LAST_CLICK_COLOR: Color = Color::srgb(1.0, 0.0, 0.0);
const CHUNK_VISIBLE_COLOR: Color = Color::srgb(0.2, 0.9, 0.2);
const CHUNK_HIDDEN_COLOR: Color = Color::srgb(0.9, 0.9, 0.2);
const CHUNK_LOADED_COLOR: Color = Color::srgba(0.6, 0.6, 0.6, 0.6);
const OBSERVER_COLOR: Color = Color::srgb(0.2, 0.9, 0.9);

#[derive(Resource, Debug, Default)]
pub struct DebugState {
    pub enabled: bool,
    /// Tile most recently edited by a click
    pub last_click: Option<IVec2>,
}

/// Bevy-space centre and size of a tile-aligned rect
fn tile_rect(origin_tile: IVec2, tiles: u32, tile_size: u32) -> (Vec2, Vec2) {
    let size = Vec2::splat((tiles * tile_size) as f32);
    let top_left = (origin_tile * tile_size as i32).as_vec2();
    (world_to_bevy(top_left + size * 0.5), size)
}

pub fn draw_debug_overlay(
    mut gizmos: Gizmos,
    debug_state: Res<DebugState>,
    chunks: Res<ChunkManager>,
    config: Res<GameConfig>,
) {
    if !debug_state.enabled {
        return;
    }
    let tile_size = config.map.tile_size;
    let chunk_size = chunks.chunk_size();

    for (pos, data) in chunks.chunks() {
        let color = match (data.texture, data.visible) {
            (Some(_), true) => CHUNK_VISIBLE_COLOR,
            (Some(_), false) => CHUNK_HIDDEN_COLOR,
            (None, _) => CHUNK_LOADED_COLOR,
        };
        let (center, size) = tile_rect(pos.tile_origin(chunk_size as i32), chunk_size, tile_size);
        gizmos.rect_2d(Isometry2d::from_translation(center), size, color);
    }

    for tile in chunks.manual_observers() {
        let (center, size) = tile_rect(tile, 1, tile_size);
        let half = size * 0.5;
        gizmos.line_2d(center - half, center + half, OBSERVER_COLOR);
        gizmos.line_2d(center + Vec2::new(-half.x, half.y), center + Vec2::new(half.x, -half.y), OBSERVER_COLOR);
    }

    if let Some(tile) = debug_state.last_click {
        let (center, size) = tile_rect(tile, 1, tile_size);
        gizmos.rect_2d(Isometry2d::from_translation(center), size, LAST_CLICK_COLOR);
    }
}

/// True on the off-to-on edge only; other DebugState writes such as `last_click` do not count
fn switched_on(enabled: bool, was_enabled: &mut bool) -> bool {
    let edge = enabled && !*was_enabled;
    *was_enabled = enabled;
    edge
}

/// Dump the chunk grid whenever the overlay is switched on
pub fn log_chunk_grid_on_toggle(
    debug_state: Res<DebugState>,
    chunks: Res<ChunkManager>,
    mut was_enabled: Local<bool>,
) {
    if !switched_on(debug_state.enabled, &mut was_enabled) {
        return;
    }
    let center = chunks
        .observer_chunks()
        .first()
        .copied()
        .unwrap_or(ChunkPos::new(0, 0));
    info!("{}", format_chunk_grid(&chunks, center));
    info!("{}", chunks.stats());
}

/// Chunk holding the last clicked tile, for the HUD
pub fn last_click_chunk(debug_state: &DebugState, chunk_size: u32) -> Option<ChunkPos> {
    debug_state
        .last_click
        .map(|tile| coords::chunk_of(tile, chunk_size))
}

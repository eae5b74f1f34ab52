use bevy::prelude::*;

use crate::camera::{AspectFit, CameraFit, GameCamera};
use crate::config::GameConfig;
use crate::debug::DebugState;
use crate::entities::{clamp_to_map, Player, Position};
use crate::input::{PendingMapIo, PendingPlacements};
use crate::tiles::{TileFlags, TileId, Tilemap, TILE_WALL};
use crate::ui::{is_pointer_over_ui, PopupState};
use crate::world::{load_map, save_map, ChunkManager};

/// Tile id painted by a click
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush(pub TileId);

impl Default for Brush {
    fn default() -> Self {
        Self(TILE_WALL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed(IVec2),
    /// Click landed on the popup
    OverUi,
    /// Click landed in the letterbox bars
    OutsideView,
    OutOfBounds(IVec2),
}

/// Paint the brush tile under a window-space cursor and flag its chunk for redraw
pub fn place_tile_at_cursor(
    cursor: Vec2,
    popup: &PopupState,
    camera: &GameCamera,
    fit: &AspectFit,
    chunks: &mut ChunkManager,
    tilemap: &mut Tilemap,
    brush: TileId,
) -> PlaceOutcome {
    if is_pointer_over_ui(popup, cursor) {
        return PlaceOutcome::OverUi;
    }
    let Some(tile) = chunks.handle_click(cursor, camera, fit) else {
        return PlaceOutcome::OutsideView;
    };
    let Some(mut painted) = tilemap.get(tile.x, tile.y).copied() else {
        return PlaceOutcome::OutOfBounds(tile);
    };

    painted.id = brush;
    painted.set_flag(TileFlags::EDITED);
    tilemap.set_tile(tile.x, tile.y, painted);
    chunks.mark_chunk_dirty(tile);
    PlaceOutcome::Placed(tile)
}

/// Apply clicks deferred from command processing, now that the camera is up to date
#[allow(clippy::too_many_arguments)]
pub fn apply_pending_placements(
    mut placements: ResMut<PendingPlacements>,
    popup: Res<PopupState>,
    camera: Res<GameCamera>,
    fit: Res<CameraFit>,
    brush: Res<Brush>,
    mut chunks: ResMut<ChunkManager>,
    mut tilemap: ResMut<Tilemap>,
    mut debug_state: ResMut<DebugState>,
) {
    if placements.0.is_empty() {
        return;
    }
    for cursor in placements.0.drain(..) {
        match place_tile_at_cursor(
            cursor,
            &popup,
            &camera,
            &fit.0,
            &mut chunks,
            &mut tilemap,
            brush.0,
        ) {
            PlaceOutcome::Placed(tile) => {
                debug!("Placed tile {} at {}", brush.0, tile);
                debug_state.last_click = Some(tile);
            }
            PlaceOutcome::OverUi => debug!("Click at {} blocked by UI", cursor),
            PlaceOutcome::OutsideView => debug!("Click at {} outside the view", cursor),
            PlaceOutcome::OutOfBounds(tile) => debug!("Click on {} is off the map", tile),
        }
    }
}

/// Run save/load requests
pub fn run_map_io(
    mut commands: Commands,
    mut map_io: ResMut<PendingMapIo>,
    config: Res<GameConfig>,
    mut tilemap: ResMut<Tilemap>,
    mut chunks: ResMut<ChunkManager>,
    mut player_query: Query<&mut Position, With<Player>>,
) {
    if !map_io.save && !map_io.load {
        return;
    }
    let path = &config.save.path;

    if std::mem::take(&mut map_io.save) {
        match save_map(&tilemap, path) {
            Ok(()) => info!("Saved map to {}", path.display()),
            Err(e) => error!("Failed to save map to {}: {}", path.display(), e),
        }
    }

    if std::mem::take(&mut map_io.load) {
        match load_map(path) {
            Ok(loaded) => {
                info!(
                    "Loaded {}x{} map from {}",
                    loaded.width(),
                    loaded.height(),
                    path.display()
                );
                *tilemap = loaded;
                for texture in chunks.set_map_size(tilemap.size()) {
                    commands.entity(texture).despawn();
                }
                chunks.mark_all_dirty();
                for mut position in &mut player_query {
                    *position = clamp_to_map(*position, &tilemap);
                }
            }
            Err(e) => error!("Failed to load map from {}: {}", path.display(), e),
        }
    }
}

use bevy::prelude::*;

use super::provider::BevyInputProvider;
use super::queue::{InputCommand, InputSystem};
use crate::camera::GameCamera;
use crate::debug::DebugState;
use crate::entities::{try_step, Player, Position};
use crate::tiles::{TileRegistry, Tilemap};
use crate::ui::PopupState;
use crate::world::ChunkManager;

/// Most tile placements applied in one frame; extra clicks are dropped
pub const MAX_PENDING_PLACEMENTS: usize = 64;

/// Clicks waiting for the camera to settle before they become tile edits
#[derive(Resource, Debug, Default)]
pub struct PendingPlacements(pub Vec<Vec2>);

/// Map save/load requests, run after edits
#[derive(Resource, Debug, Default)]
pub struct PendingMapIo {
    pub save: bool,
    pub load: bool,
}

/// Capture this frame's input and queue the resulting commands
pub fn poll_input(mut provider: BevyInputProvider, mut input: ResMut<InputSystem>) {
    input.poll(&mut provider);
    let queued = input.process_snapshot();
    if queued > 0 {
        debug!("Queued {} input commands", queued);
    }
}

/// Apply queued commands. Tile placements and map IO are deferred to later in the frame.
#[allow(clippy::too_many_arguments)]
pub fn drain_commands(
    mut input: ResMut<InputSystem>,
    mut debug_state: ResMut<DebugState>,
    mut camera: ResMut<GameCamera>,
    mut placements: ResMut<PendingPlacements>,
    mut map_io: ResMut<PendingMapIo>,
    mut popup: ResMut<PopupState>,
    mut chunks: ResMut<ChunkManager>,
    mut player_query: Query<&mut Position, With<Player>>,
    tilemap: Res<Tilemap>,
    registry: Res<TileRegistry>,
) {
    while let Some(command) = input.pop() {
        match command {
            InputCommand::ToggleDebug => {
                debug_state.enabled = !debug_state.enabled;
                info!("Debug overlay {}", if debug_state.enabled { "on" } else { "off" });
            }
            InputCommand::Zoom { wheel } => {
                if camera.apply_zoom(wheel) {
                    debug!("Zoom {:.2}", camera.zoom);
                }
            }
            InputCommand::Move { dx, dy } => {
                let Ok(mut position) = player_query.single_mut() else {
                    continue;
                };
                match try_step(*position, dx, dy, &tilemap, &registry) {
                    Some(next) => *position = next,
                    None => debug!(
                        "Move blocked from ({}, {}) by ({}, {})",
                        position.x, position.y, dx, dy
                    ),
                }
            }
            InputCommand::PlaceTile { cursor } => {
                if placements.0.len() < MAX_PENDING_PLACEMENTS {
                    placements.0.push(cursor);
                } else {
                    debug!("Dropped tile placement at {:?}, frame limit reached", cursor);
                }
            }
            InputCommand::TogglePopup => popup.toggle(),
            InputCommand::ToggleManualObserver => {
                let Ok(position) = player_query.single() else {
                    continue;
                };
                let tile = position.as_ivec2();
                if chunks.toggle_manual_observer(tile) {
                    info!("Manual observer added at {}", tile);
                } else {
                    info!("Manual observer removed at {}", tile);
                }
            }
            InputCommand::SaveMap => map_io.save = true,
            InputCommand::LoadMap => map_io.load = true,
        }
    }
}

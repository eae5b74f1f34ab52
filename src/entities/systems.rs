use bevy::prelude::*;

use super::{Position, TileSprite};
use crate::camera::world_to_bevy;
use crate::config::GameConfig;
use crate::tiles::{AtlasTable, TileRegistry, Tilemap};

/// Bevy-space centre of a tile
pub fn tile_center(position: Position, tile_size: u32) -> Vec2 {
    let world = (position.as_ivec2().as_vec2() + Vec2::splat(0.5)) * tile_size as f32;
    world_to_bevy(world)
}

/// Where a one-tile step would land, or None if the target is off the map or not walkable
pub fn try_step(
    position: Position,
    dx: i32,
    dy: i32,
    tilemap: &Tilemap,
    registry: &TileRegistry,
) -> Option<Position> {
    let target = position.offset(dx, dy);
    let tile = tilemap.get(target.x, target.y)?;
    registry.is_walkable(tile.id).then_some(target)
}

/// Nearest position inside the map
pub fn clamp_to_map(position: Position, tilemap: &Tilemap) -> Position {
    let max = tilemap.size().as_ivec2() - IVec2::ONE;
    position.as_ivec2().clamp(IVec2::ZERO, max.max(IVec2::ZERO)).into()
}

/// Keep the drawn sprite on its tile and showing its atlas rect
pub fn sync_sprite_visuals(
    mut query: Query<
        (&Position, &TileSprite, &mut Transform, &mut Sprite),
        Or<(Changed<Position>, Changed<TileSprite>)>,
    >,
    atlases: Res<AtlasTable>,
    config: Res<GameConfig>,
) {
    for (position, tile_sprite, mut transform, mut sprite) in &mut query {
        let center = tile_center(*position, config.map.tile_size);
        transform.translation.x = center.x;
        transform.translation.y = center.y;

        match atlases.get(&tile_sprite.atlas) {
            Some(atlas) => sprite.rect = atlas.rect(tile_sprite.index).map(|r| r.as_rect()),
            None => warn!("Sprite references unknown atlas '{}'", tile_sprite.atlas),
        }
    }
}

use bevy::prelude::*;

use super::{systems::tile_center, ChunkObserver, Health, Player, Position, TileSprite};
use crate::config::GameConfig;
use crate::tiles::{Atlas, Z_PLAYER};

/// Sprite cut from an atlas rect, drawn one tile large
pub fn atlas_sprite(atlas: &Atlas, index: u32, tile_size: u32) -> Sprite {
    Sprite {
        image: atlas.texture().clone(),
        rect: atlas.rect(index).map(|rect| rect.as_rect()),
        custom_size: Some(Vec2::splat(tile_size as f32)),
        ..default()
    }
}

/// Spawns the player at the centre of the map
pub fn spawn_player(commands: &mut Commands, config: &GameConfig, atlas: &Atlas) -> Entity {
    let center = (config.map.size / 2) as i32;
    let position = Position::new(center, center);
    let translation = tile_center(position, config.map.tile_size);

    commands
        .spawn((
            Player,
            ChunkObserver,
            position,
            Health::new(config.player.max_health),
            TileSprite::new(config.atlas.name.clone(), config.player.sprite_index),
            atlas_sprite(atlas, config.player.sprite_index, config.map.tile_size),
            Transform::from_xyz(translation.x, translation.y, Z_PLAYER),
        ))
        .id()
}

use bevy::prelude::*;

use crate::camera::GameCamera;
use crate::debug::{last_click_chunk, DebugState};
use crate::edit::Brush;
use crate::entities::{Health, Player, Position};
use crate::tiles::{TileFlags, TileRegistry, Tilemap};
use crate::world::ChunkManager;

#[derive(Component)]
pub struct HudText;

#[derive(Component)]
pub struct DebugText;

pub fn spawn_hud(commands: &mut Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(10.0),
                top: Val::Px(10.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(4.0),
                padding: UiRect::all(Val::Px(6.0)),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.5)),
            BorderRadius::all(Val::Px(4.0)),
        ))
        .with_children(|hud| {
            hud.spawn((
                HudText,
                Text::new(""),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
            hud.spawn((
                DebugText,
                Text::new(""),
                TextFont {
                    font_size: 12.0,
                    ..default()
                },
                TextColor(Color::srgb(0.7, 1.0, 0.7)),
            ));
        });
}

pub fn format_status(position: Position, zoom: f32, health: &Health, brush_name: &str) -> String {
    format!(
        "Player: ({}, {})  Zoom: {:.2}\nHP: {:.0}/{:.0}\nBrush: {}",
        position.x, position.y, zoom, health.current, health.max, brush_name
    )
}

#[allow(clippy::too_many_arguments)]
pub fn update_hud(
    player_query: Query<(&Position, &Health), With<Player>>,
    camera: Res<GameCamera>,
    brush: Res<Brush>,
    registry: Res<TileRegistry>,
    debug_state: Res<DebugState>,
    chunks: Res<ChunkManager>,
    tilemap: Res<Tilemap>,
    mut status_query: Query<&mut Text, (With<HudText>, Without<DebugText>)>,
    mut debug_query: Query<&mut Text, (With<DebugText>, Without<HudText>)>,
) {
    if let (Ok((position, health)), Ok(mut text)) = (player_query.single(), status_query.single_mut()) {
        let status = format_status(*position, camera.zoom, health, registry.name(brush.0));
        if text.0 != status {
            text.0 = status;
        }
    }

    let Ok(mut text) = debug_query.single_mut() else {
        return;
    };
    if !debug_state.enabled {
        if !text.0.is_empty() {
            text.0.clear();
        }
        return;
    }

    let last_click = match (debug_state.last_click, last_click_chunk(&debug_state, chunks.chunk_size())) {
        (Some(tile), Some(chunk)) => format!("({}, {}) in chunk {}", tile.x, tile.y, chunk),
        _ => "none".to_string(),
    };
    text.0 = format!(
        "{}\nEdited tiles: {}  Last click: {}",
        chunks.stats(),
        tilemap.count_flagged(TileFlags::EDITED),
        last_click
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn test_format_status() {
        let status = format_status(Position::new(64, 12), 1.5, &Health::new(100.0), "wall");
        assert_eq!(status, "Player: (64, 12)  Zoom: 1.50\nHP: 100/100\nBrush: wall");
    }

    #[test]
    fn test_update_hud() {
        let config = GameConfig::default();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(GameCamera::new(config.logical_size(), &config.camera))
            .insert_resource(Brush(1))
            .insert_resource(TileRegistry::default())
            .insert_resource(DebugState {
                enabled: true,
                last_click: Some(IVec2::new(20, 3)),
            })
            .insert_resource(ChunkManager::from_config(&config))
            .insert_resource(Tilemap::new(4, 4))
            .add_systems(Update, update_hud);

        app.world_mut()
            .spawn((Player, Position::new(2, 3), Health::new(80.0)));
        let status = app.world_mut().spawn((HudText, Text::new(""))).id();
        let debug = app.world_mut().spawn((DebugText, Text::new(""))).id();
        app.update();

        assert_eq!(
            app.world().get::<Text>(status).unwrap().0,
            "Player: (2, 3)  Zoom: 1.00\nHP: 80/80\nBrush: dirt"
        );
        let debug_text = &app.world().get::<Text>(debug).unwrap().0;
        assert!(debug_text.contains("Edited tiles: 0"));
        assert!(debug_text.contains("Last click: (20, 3) in chunk (1, 0)"));

        app.world_mut().resource_mut::<DebugState>().enabled = false;
        app.update();
        assert!(app.world().get::<Text>(debug).unwrap().0.is_empty());
    }
}

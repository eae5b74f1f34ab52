use bevy::{log::LogPlugin, prelude::*, window::WindowResolution};
use clap::Parser;

mod camera;
mod config;
mod debug;
mod edit;
mod entities;
mod input;
mod tiles;
mod ui;
mod world;

use camera::{CameraFit, GameCamera};
use config::{Cli, ConfigError, GameConfig};
use debug::DebugState;
use edit::Brush;
use input::{InputSystem, PendingMapIo, PendingPlacements};
use tiles::{Atlas, AtlasTable, TileRegistry, Tilemap};
use ui::PopupState;
use world::{ChunkManager, ChunkTileset};

/// Frame stages, run in this order every update
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FrameSet {
    Input,
    Commands,
    Camera,
    Edit,
    Streaming,
    Render,
    Ui,
}

/// Problems found while loading the config, logged once logging is up
#[derive(Resource, Default)]
struct StartupNotes {
    config_error: Option<ConfigError>,
    fixes: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    let (mut config, config_error) = GameConfig::load_or_default(&cli.config);
    config.apply_cli(&cli);
    let fixes = config.validate();

    let tilemap = Tilemap::generate_striped(config.map.size, config.map.size);
    let registry = TileRegistry::new(config.tiles.clone());
    let popup = PopupState::for_tiles(registry.len());
    let chunks = ChunkManager::from_config(&config);
    let camera = GameCamera::new(config.logical_size(), &config.camera);
    let window = Window {
        title: config.window.title.clone(),
        resolution: WindowResolution::new(config.window.width, config.window.height),
        ..default()
    };
    let log_filter = format!("wgpu=error,naga=warn,tilestream={}", cli.log_level);

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(ImagePlugin::default_nearest())
                .set(WindowPlugin {
                    primary_window: Some(window),
                    ..default()
                })
                .set(LogPlugin {
                    filter: log_filter,
                    ..default()
                }),
        )
        .insert_resource(ClearColor(Color::srgb(1.0, 1.0, 0.0)))
        .insert_resource(DebugState {
            enabled: cli.debug,
            last_click: None,
        })
        .insert_resource(StartupNotes {
            config_error,
            fixes,
        })
        .insert_resource(tilemap)
        .insert_resource(registry)
        .insert_resource(popup)
        .insert_resource(chunks)
        .insert_resource(camera)
        .insert_resource(config)
        .init_resource::<CameraFit>()
        .init_resource::<AtlasTable>()
        .init_resource::<ChunkTileset>()
        .init_resource::<InputSystem>()
        .init_resource::<PendingPlacements>()
        .init_resource::<PendingMapIo>()
        .init_resource::<Brush>()
        .configure_sets(
            Update,
            (
                FrameSet::Input,
                FrameSet::Commands,
                FrameSet::Camera,
                FrameSet::Edit,
                FrameSet::Streaming,
                FrameSet::Render,
                FrameSet::Ui,
            )
                .chain(),
        )
        .add_systems(Startup, (report_startup, setup_world).chain())
        .add_systems(
            Update,
            (
                input::poll_input.in_set(FrameSet::Input),
                input::drain_commands.in_set(FrameSet::Commands),
                (camera::follow_player, camera::fit_and_clamp)
                    .chain()
                    .in_set(FrameSet::Camera),
                (edit::apply_pending_placements, edit::run_map_io)
                    .chain()
                    .in_set(FrameSet::Edit),
                (
                    world::build_chunk_tileset,
                    world::register_chunk_observers,
                    world::stream_chunks,
                )
                    .chain()
                    .in_set(FrameSet::Streaming),
                (
                    entities::sync_sprite_visuals,
                    camera::sync_render_camera,
                    debug::draw_debug_overlay,
                    debug::log_chunk_grid_on_toggle,
                )
                    .in_set(FrameSet::Render),
                (
                    ui::drag_popup,
                    ui::sync_popup_node,
                    ui::highlight_brush,
                    ui::update_hud,
                )
                    .chain()
                    .in_set(FrameSet::Ui),
            ),
        )
        .run();
}

fn report_startup(mut notes: ResMut<StartupNotes>, config: Res<GameConfig>) {
    if let Some(e) = notes.config_error.take() {
        match e {
            ConfigError::Io { .. } => error!("{}; using defaults", e),
            ConfigError::Parse { .. } => warn!("{}; using defaults", e),
        }
    }
    for fix in notes.fixes.drain(..) {
        warn!("Config adjusted: {}", fix);
    }
    info!(
        "Map {}x{} tiles, chunks of {}, radius {}/{}",
        config.map.size,
        config.map.size,
        config.streaming.chunk_size,
        config.streaming.render_radius,
        config.streaming.simulation_radius
    );
}

fn setup_world(
    mut commands: Commands,
    assets: Res<AssetServer>,
    config: Res<GameConfig>,
    registry: Res<TileRegistry>,
    popup: Res<PopupState>,
    mut atlases: ResMut<AtlasTable>,
) {
    commands.spawn((Camera2d, Transform::from_xyz(0.0, 0.0, 999.0)));

    let texture = assets.load(config.atlas.path.clone());
    let atlas = match Atlas::grid(
        texture,
        config.atlas.tile_count,
        config.atlas.tile_px,
        config.atlas.capacity,
    ) {
        Ok(atlas) => atlas,
        Err(e) => {
            error!("Failed to build atlas '{}': {}", config.atlas.name, e);
            return;
        }
    };

    let player = entities::spawn_player(&mut commands, &config, &atlas);
    ui::spawn_hud(&mut commands);
    ui::spawn_popup(&mut commands, &popup, &registry, &atlas);
    atlases.add(config.atlas.name.clone(), atlas);

    info!("World setup complete, player {:?}", player);
}

use super::manager::ChunkManager;
use crate::camera::{world_to_bevy, GameCamera};
use crate::config::GameConfig;
use crate::entities::{ChunkObserver, Position};
use crate::tiles::{
    build_tile_array, chunk_tiles, coords, to_tilemap_data, AtlasTable, Chunk, ChunkPos, Tilemap,
    Z_CHUNKS,
};
use bevy::prelude::*;
use bevy::sprite_render::{TilemapChunk, TilemapChunkTileData};

/// Largest radius the chunk grid dump will draw
const MAX_GRID_RADIUS: i32 = 8;

/// Array texture every chunk samples from, built once the atlas image has loaded
#[derive(Resource, Debug, Default)]
pub struct ChunkTileset(pub Option<Handle<Image>>);

/// Keep the manager's entity observers in step with the `ChunkObserver` marker
pub fn register_chunk_observers(
    added: Query<Entity, Added<ChunkObserver>>,
    mut removed: RemovedComponents<ChunkObserver>,
    mut chunks: ResMut<ChunkManager>,
) {
    for entity in &added {
        if chunks.add_entity_observer(entity) {
            debug!("Chunk observer added: {:?}", entity);
        }
    }
    for entity in removed.read() {
        if chunks.remove_entity_observer(entity) {
            debug!("Chunk observer removed: {:?}", entity);
        }
    }
}

/// Rebuild the chunk tileset whenever the atlas image finishes loading or changes
pub fn build_chunk_tileset(
    mut events: MessageReader<AssetEvent<Image>>,
    mut images: ResMut<Assets<Image>>,
    atlases: Res<AtlasTable>,
    config: Res<GameConfig>,
    mut tileset: ResMut<ChunkTileset>,
) {
    let Some(atlas) = atlases.get(&config.atlas.name) else {
        events.clear();
        return;
    };
    let source_id = atlas.texture().id();
    let changed = events
        .read()
        .any(|event| event.is_loaded_with_dependencies(source_id) || event.is_modified(source_id));
    if !changed {
        return;
    }

    let Some(source) = images.get(source_id) else {
        return;
    };
    let array = match build_tile_array(atlas, source, config.atlas.tile_px) {
        Ok(array) => array,
        Err(e) => {
            error!("Failed to build chunk tileset from '{}': {}", config.atlas.name, e);
            return;
        }
    };

    let existing = tileset.0.clone();
    match existing.as_ref().and_then(|handle| images.get_mut(handle)) {
        Some(image) => *image = array,
        None => tileset.0 = Some(images.add(array)),
    }
    info!(
        "Chunk tileset built with {} layers from '{}'",
        atlas.layer_count(),
        config.atlas.name
    );
}

/// Bevy-space centre of a chunk; `TilemapChunk` meshes are centred on their transform
pub fn chunk_center(pos: ChunkPos, chunk_size: u32, tile_size: u32) -> Vec2 {
    let half = (chunk_size * tile_size) as f32 * 0.5;
    world_to_bevy(coords::chunk_world_origin(pos, chunk_size, tile_size) + Vec2::splat(half))
}

fn spawn_chunk_texture(
    commands: &mut Commands,
    tilemap: &Tilemap,
    pos: ChunkPos,
    chunk_size: u32,
    tile_size: u32,
    tileset: Handle<Image>,
) -> Entity {
    let center = chunk_center(pos, chunk_size, tile_size);
    commands
        .spawn((
            TilemapChunk {
                chunk_size: UVec2::splat(chunk_size),
                tile_display_size: UVec2::splat(tile_size),
                tileset,
                ..default()
            },
            TilemapChunkTileData(to_tilemap_data(&chunk_tiles(tilemap, pos, chunk_size))),
            Chunk::new(pos),
            Transform::from_xyz(center.x, center.y, Z_CHUNKS),
        ))
        .id()
}

/// Stream chunks around observers, then bring chunk textures in render range up to date
#[allow(clippy::too_many_arguments)]
pub fn stream_chunks(
    mut commands: Commands,
    mut chunks: ResMut<ChunkManager>,
    camera: Res<GameCamera>,
    tilemap: Res<Tilemap>,
    tileset: Res<ChunkTileset>,
    positions: Query<&Position>,
    mut tile_data_query: Query<&mut TilemapChunkTileData, With<Chunk>>,
    mut visibility_query: Query<&mut Visibility, With<Chunk>>,
) {
    if chunks.fit_to_view(camera.view_size()) {
        debug!(
            "Chunk radii now {}/{}",
            chunks.render_radius(),
            chunks.simulation_radius()
        );
    }

    let observer_tiles =
        chunks.observer_tiles(|entity| positions.get(entity).ok().map(Position::as_ivec2));
    let delta = chunks.update(&observer_tiles);
    for texture in &delta.to_despawn {
        commands.entity(*texture).despawn();
    }
    if !delta.is_empty() {
        debug!(
            "Loaded {} chunks, unloaded {}",
            delta.loaded.len(),
            delta.unloaded.len()
        );
        #[cfg(feature = "debug_chunks")]
        if let Some(center) = chunks.observer_chunks().first().copied() {
            info!("{}", format_chunk_grid(&chunks, center));
        }
    }

    let plan = chunks.plan_render();
    if plan.is_empty() {
        return;
    }
    let chunk_size = chunks.chunk_size();
    let tile_size = chunks.tile_size();

    if let Some(tileset) = &tileset.0 {
        for pos in plan.materialize {
            let entity =
                spawn_chunk_texture(&mut commands, &tilemap, pos, chunk_size, tile_size, tileset.clone());
            if !chunks.attach_texture(pos, entity) {
                commands.entity(entity).despawn();
            }
        }
    }

    for (pos, entity) in plan.redraw {
        if let Ok(mut data) = tile_data_query.get_mut(entity) {
            data.0 = to_tilemap_data(&chunk_tiles(&tilemap, pos, chunk_size));
        }
    }
    for entity in plan.show {
        if let Ok(mut visibility) = visibility_query.get_mut(entity) {
            *visibility = Visibility::Inherited;
        }
    }
    for entity in plan.hide {
        if let Ok(mut visibility) = visibility_query.get_mut(entity) {
            *visibility = Visibility::Hidden;
        }
    }
}

/// Text picture of the chunks around `center`, one cell per chunk, rows top to bottom
pub fn format_chunk_grid(chunks: &ChunkManager, center: ChunkPos) -> String {
    let view_radius = (chunks.simulation_radius() + 1).min(MAX_GRID_RADIUS);
    let render_radius = chunks.render_radius();
    let observers = chunks.observer_chunks();

    let mut grid = String::new();
    grid.push_str("\n╔═══════════════ Chunk Grid ═══════════════╗\n");

    grid.push_str("    ");
    for x in (center.x - view_radius)..=(center.x + view_radius) {
        grid.push_str(&format!("{:3}", x));
    }
    grid.push('\n');

    for y in (center.y - view_radius)..=(center.y + view_radius) {
        grid.push_str(&format!("{:4}", y));
        for x in (center.x - view_radius)..=(center.x + view_radius) {
            let pos = ChunkPos::new(x, y);
            let in_render_radius = observers
                .iter()
                .any(|c| c.chebyshev_distance(&pos) <= render_radius);

            let symbol = if observers.contains(&pos) {
                " @ "
            } else {
                match chunks.chunk(pos) {
                    Some(data) if data.visible => " ■ ",
                    Some(data) if data.texture.is_some() => " ▓ ",
                    Some(_) => " █ ",
                    None if in_render_radius && chunks.chunk_in_bounds(pos) => " ░ ",
                    None => " · ",
                }
            };
            grid.push_str(symbol);
        }
        grid.push('\n');
    }

    grid.push_str("╚══════════════════════════════════════════╝\n");
    grid.push_str(
        "Legend: @ = Observer  ■ = Visible  ▓ = Hidden  █ = Loaded  ░ = Pending  · = Unloaded\n",
    );
    grid.push_str(&format!("Center: {} | {}\n", center, chunks.stats()));
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::Atlas;
    use bevy::asset::RenderAssetUsages;
    use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
    use bevy::sprite_render::{TilemapChunkMaterial, TilemapChunkMeshCache};

    /// Skip the leading blank line, box top and column header
    fn grid_rows(grid: &str, count: usize) -> Vec<&str> {
        grid.lines().skip(3).take(count).collect()
    }

    #[test]
    fn test_chunk_center() {
        assert_eq!(chunk_center(ChunkPos::new(0, 0), 16, 16), Vec2::new(128.0, -128.0));
        assert_eq!(chunk_center(ChunkPos::new(2, 1), 16, 16), Vec2::new(640.0, -384.0));
    }

    #[test]
    fn test_format_chunk_grid() {
        let mut manager = ChunkManager::new(16, 16, UVec2::splat(128), 1, 2);
        manager.update(&[IVec2::new(64, 64)]);
        let texture = World::new().spawn_empty().id();
        manager.plan_render();
        manager.attach_texture(ChunkPos::new(4, 3), texture);

        let grid = format_chunk_grid(&manager, ChunkPos::new(4, 4));
        // Radius 3 around (4, 4): 7 rows of 7 cells
        let rows = grid_rows(&grid, 7);
        assert!(rows[0].trim_start().starts_with('1'));
        assert_eq!(rows[0].matches(" · ").count(), 7);
        assert_eq!(rows[3].matches(" @ ").count(), 1);
        // Row y = 3 holds the textured chunk directly above the observer
        assert_eq!(rows[2].matches(" ■ ").count(), 1);
        assert_eq!(rows[2].matches(" █ ").count(), 4);
        assert!(grid.contains("Legend:"));
        assert!(grid.contains("Center: (4, 4) | Chunks: 25 loaded"));
    }

    #[test]
    fn test_register_chunk_observers() {
        let config = GameConfig::default();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(ChunkManager::from_config(&config))
            .add_systems(Update, register_chunk_observers);

        let observer = app.world_mut().spawn(ChunkObserver).id();
        app.update();
        assert_eq!(app.world().resource::<ChunkManager>().observers().len(), 1);

        app.world_mut().despawn(observer);
        app.update();
        assert!(app.world().resource::<ChunkManager>().observers().is_empty());
    }

    fn streaming_app() -> App {
        let config = GameConfig::default();
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(ChunkManager::new(16, 16, UVec2::splat(128), 1, 2))
            .insert_resource(GameCamera::new(Vec2::new(160.0, 90.0), &config.camera))
            .insert_resource(Tilemap::generate_striped(128, 128))
            .insert_resource(ChunkTileset::default())
            .add_systems(Update, stream_chunks);
        app
    }

    #[test]
    fn test_stream_chunks_follows_observer_position() {
        let mut app = streaming_app();
        let player = app.world_mut().spawn(Position::new(64, 64)).id();
        app.world_mut()
            .resource_mut::<ChunkManager>()
            .add_entity_observer(player);
        app.update();

        let manager = app.world().resource::<ChunkManager>();
        assert_eq!(manager.stats().loaded, 25);
        assert_eq!(manager.observer_chunks(), &[ChunkPos::new(4, 4)]);
        // No tileset yet, so nothing is textured
        assert_eq!(manager.stats().textured, 0);

        app.world_mut().get_mut::<Position>(player).unwrap().x = 127;
        app.update();
        let manager = app.world().resource::<ChunkManager>();
        assert!(!manager.is_loaded(ChunkPos::new(2, 4)));
        assert!(manager.is_loaded(ChunkPos::new(7, 4)));
    }

    /// Streaming app with the asset storage the `TilemapChunk` insert hook writes into
    fn textured_app() -> App {
        let mut app = streaming_app();
        app.add_plugins(AssetPlugin::default())
            .init_asset::<Image>()
            .init_asset::<Mesh>()
            .init_asset::<TilemapChunkMaterial>()
            .init_resource::<TilemapChunkMeshCache>();
        let tileset = app
            .world_mut()
            .resource_mut::<Assets<Image>>()
            .add(Image::default());
        app.insert_resource(ChunkTileset(Some(tileset)));
        app
    }

    #[test]
    fn test_stream_chunks_spawns_textures_in_render_radius() {
        let mut app = textured_app();
        app.world_mut()
            .resource_mut::<ChunkManager>()
            .add_manual_observer(IVec2::new(64, 64));
        app.update();

        let stats = app.world().resource::<ChunkManager>().stats();
        assert_eq!(stats.loaded, 25);
        assert_eq!(stats.textured, 9);
        assert_eq!(stats.visible, 9);

        let mut query = app
            .world_mut()
            .query_filtered::<(&Chunk, &Transform, &TilemapChunkTileData), With<TilemapChunk>>();
        let spawned: Vec<_> = query.iter(app.world()).collect();
        assert_eq!(spawned.len(), 9);
        for (chunk, transform, data) in spawned {
            assert!(chunk.position.chebyshev_distance(&ChunkPos::new(4, 4)) <= 1);
            let center = chunk_center(chunk.position, 16, 16);
            assert_eq!(transform.translation, center.extend(Z_CHUNKS));
            assert_eq!(data.0.len(), 256);
        }

        // Already textured chunks are not spawned twice
        app.update();
        let mut query = app.world_mut().query_filtered::<(), With<TilemapChunk>>();
        assert_eq!(query.iter(app.world()).count(), 9);
    }

    fn tileset_app() -> (App, AssetId<Image>) {
        let config = GameConfig::default();
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Image>()
            .init_resource::<ChunkTileset>()
            .init_resource::<AtlasTable>()
            .add_systems(Update, build_chunk_tileset);

        let tile_px = config.atlas.tile_px;
        let source = Image::new_fill(
            Extent3d {
                width: tile_px * config.atlas.tile_count,
                height: tile_px,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            &[200, 40, 40, 255],
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::default(),
        );
        let handle = app.world_mut().resource_mut::<Assets<Image>>().add(source);
        let id = handle.id();
        let atlas = Atlas::grid(
            handle,
            config.atlas.tile_count,
            tile_px,
            config.atlas.capacity,
        )
        .unwrap();
        app.world_mut()
            .resource_mut::<AtlasTable>()
            .add(config.atlas.name.clone(), atlas);
        app.insert_resource(config);
        (app, id)
    }

    #[test]
    fn test_build_chunk_tileset_on_load_and_reload() {
        let (mut app, source) = tileset_app();
        app.update();
        assert!(app.world().resource::<ChunkTileset>().0.is_none());

        app.world_mut()
            .write_message(AssetEvent::<Image>::LoadedWithDependencies { id: source });
        app.update();

        let handle = app.world().resource::<ChunkTileset>().0.clone().unwrap();
        let images = app.world().resource::<Assets<Image>>();
        let array = images.get(&handle).unwrap();
        assert_eq!(array.texture_descriptor.size.depth_or_array_layers, 9);
        assert_eq!(array.width(), 16);
        assert_eq!(array.height(), 16);

        // Hot reload rebuilds into the same handle
        app.world_mut()
            .write_message(AssetEvent::<Image>::Modified { id: source });
        app.update();
        assert_eq!(
            app.world().resource::<ChunkTileset>().0.as_ref().map(Handle::id),
            Some(handle.id())
        );
        assert_eq!(app.world().resource::<Assets<Image>>().len(), 2);
    }

    #[test]
    fn test_stream_chunks_redraws_and_hides_textures() {
        let mut app = streaming_app();
        let pos = ChunkPos::new(4, 4);
        let texture = app
            .world_mut()
            .spawn((Chunk::new(pos), TilemapChunkTileData(Vec::new()), Visibility::Inherited))
            .id();
        {
            let mut manager = app.world_mut().resource_mut::<ChunkManager>();
            manager.add_manual_observer(IVec2::new(64, 64));
            manager.update(&[IVec2::new(64, 64)]);
            manager.plan_render();
            manager.attach_texture(pos, texture);
            manager.mark_chunk_dirty(IVec2::new(70, 70));
        }
        app.update();

        let data = app.world().get::<TilemapChunkTileData>(texture).unwrap();
        assert_eq!(data.0.len(), 256);
        assert!(data.0.iter().all(Option::is_some));
        assert!(!app.world().resource::<ChunkManager>().chunk(pos).unwrap().dirty);

        // Observer moves two chunks right: texture stays loaded but hidden
        {
            let mut manager = app.world_mut().resource_mut::<ChunkManager>();
            manager.remove_manual_observer(IVec2::new(64, 64));
            manager.add_manual_observer(IVec2::new(96, 64));
        }
        app.update();
        assert_eq!(
            *app.world().get::<Visibility>(texture).unwrap(),
            Visibility::Hidden
        );
        assert!(!app.world().resource::<ChunkManager>().chunk(pos).unwrap().visible);
    }
}

use crate::camera::{AspectFit, GameCamera};
use crate::config::GameConfig;
use crate::tiles::{coords, ChunkPos};
use bevy::prelude::*;
use std::collections::HashMap;

/// Something that keeps chunks around it loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observer {
    /// Follows an entity's tile position
    Entity(Entity),
    /// Fixed tile
    Manual(IVec2),
}

/// Per-chunk render state
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRenderData {
    /// Entity holding the chunk's tilemap texture, once materialized
    pub texture: Option<Entity>,
    /// Tiles changed since the texture was last drawn
    pub dirty: bool,
    pub loaded: bool,
    pub visible: bool,
    pub last_update_frame: u64,
}

impl ChunkRenderData {
    fn new(frame: u64) -> Self {
        Self {
            texture: None,
            dirty: true,
            loaded: true,
            visible: false,
            last_update_frame: frame,
        }
    }
}

/// Chunks that entered or left the simulation radius during an update
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamingDelta {
    pub loaded: Vec<ChunkPos>,
    pub unloaded: Vec<ChunkPos>,
    /// Textures of unloaded chunks
    pub to_despawn: Vec<Entity>,
}

impl StreamingDelta {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty()
    }
}

/// Texture work needed to bring the render radius up to date
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderPlan {
    /// Chunks in render range without a texture
    pub materialize: Vec<ChunkPos>,
    /// Dirty textures to redraw from the tilemap
    pub redraw: Vec<(ChunkPos, Entity)>,
    pub show: Vec<Entity>,
    pub hide: Vec<Entity>,
}

impl RenderPlan {
    pub fn is_empty(&self) -> bool {
        self.materialize.is_empty()
            && self.redraw.is_empty()
            && self.show.is_empty()
            && self.hide.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkStats {
    pub loaded: usize,
    pub textured: usize,
    pub visible: usize,
    pub dirty: usize,
    pub observers: usize,
    pub render_radius: i32,
    pub simulation_radius: i32,
    pub frame: u64,
}

impl std::fmt::Display for ChunkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} loaded, {} textured, {} visible, {} dirty | Observers: {} | Radius: {}/{} | Frame: {}",
            self.loaded,
            self.textured,
            self.visible,
            self.dirty,
            self.observers,
            self.render_radius,
            self.simulation_radius,
            self.frame
        )
    }
}

/// Tracks which chunks are near observers, which have textures, and which need redrawing
#[derive(Resource, Debug)]
pub struct ChunkManager {
    chunks: HashMap<ChunkPos, ChunkRenderData>,
    observers: Vec<Observer>,
    chunk_size: u32,
    tile_size: u32,
    map_size: UVec2,
    base_render_radius: i32,
    base_simulation_radius: i32,
    render_radius: i32,
    simulation_radius: i32,
    current_frame: u64,
    /// Chunks containing an observer as of the last update
    observer_chunks: Vec<ChunkPos>,
}

impl ChunkManager {
    pub fn new(
        chunk_size: u32,
        tile_size: u32,
        map_size: UVec2,
        render_radius: i32,
        simulation_radius: i32,
    ) -> Self {
        let simulation_radius = simulation_radius.max(render_radius);
        Self {
            chunks: HashMap::new(),
            observers: Vec::new(),
            chunk_size: chunk_size.max(1),
            tile_size,
            map_size,
            base_render_radius: render_radius,
            base_simulation_radius: simulation_radius,
            render_radius,
            simulation_radius,
            current_frame: 0,
            observer_chunks: Vec::new(),
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.streaming.chunk_size,
            config.map.tile_size,
            UVec2::splat(config.map.size),
            config.streaming.render_radius,
            config.streaming.simulation_radius,
        )
    }

    // Observers

    /// Returns false if the entity is already observing
    pub fn add_entity_observer(&mut self, entity: Entity) -> bool {
        self.add_observer(Observer::Entity(entity))
    }

    pub fn remove_entity_observer(&mut self, entity: Entity) -> bool {
        self.remove_observer(Observer::Entity(entity))
    }

    /// Returns false if the tile is already observed
    pub fn add_manual_observer(&mut self, tile: IVec2) -> bool {
        self.add_observer(Observer::Manual(tile))
    }

    pub fn remove_manual_observer(&mut self, tile: IVec2) -> bool {
        self.remove_observer(Observer::Manual(tile))
    }

    /// Add or remove a manual observer. Returns whether it is present afterwards.
    pub fn toggle_manual_observer(&mut self, tile: IVec2) -> bool {
        if self.remove_manual_observer(tile) {
            false
        } else {
            self.add_manual_observer(tile)
        }
    }

    fn add_observer(&mut self, observer: Observer) -> bool {
        if self.observers.contains(&observer) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    fn remove_observer(&mut self, observer: Observer) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| *o != observer);
        self.observers.len() != before
    }

    pub fn observers(&self) -> &[Observer] {
        &self.observers
    }

    pub fn manual_observers(&self) -> impl Iterator<Item = IVec2> + '_ {
        self.observers.iter().filter_map(|o| match o {
            Observer::Manual(tile) => Some(*tile),
            Observer::Entity(_) => None,
        })
    }

    /// Resolve every observer to a tile. Entities the lookup can't place are skipped.
    pub fn observer_tiles(&self, lookup: impl Fn(Entity) -> Option<IVec2>) -> Vec<IVec2> {
        self.observers
            .iter()
            .filter_map(|o| match o {
                Observer::Entity(entity) => lookup(*entity),
                Observer::Manual(tile) => Some(*tile),
            })
            .collect()
    }

    // Streaming

    /// Advance one frame: load every in-bounds chunk within the simulation radius
    /// of an observer and tear down everything beyond it.
    pub fn update(&mut self, observer_tiles: &[IVec2]) -> StreamingDelta {
        self.current_frame += 1;
        let frame = self.current_frame;

        let mut observer_chunks: Vec<ChunkPos> = observer_tiles
            .iter()
            .map(|tile| coords::chunk_of(*tile, self.chunk_size))
            .collect();
        observer_chunks.sort();
        observer_chunks.dedup();
        self.observer_chunks = observer_chunks;

        let mut delta = StreamingDelta::default();

        for center in self.observer_chunks.clone() {
            for pos in center.chunks_in_radius(self.simulation_radius) {
                if !self.chunk_in_bounds(pos) || self.chunks.contains_key(&pos) {
                    continue;
                }
                self.chunks.insert(pos, ChunkRenderData::new(frame));
                delta.loaded.push(pos);
            }
        }

        let radius = self.simulation_radius;
        let observer_chunks = &self.observer_chunks;
        self.chunks.retain(|pos, data| {
            let keep = observer_chunks
                .iter()
                .any(|c| c.chebyshev_distance(pos) <= radius);
            if !keep {
                delta.unloaded.push(*pos);
                delta.to_despawn.extend(data.texture.take());
            }
            keep
        });

        delta.loaded.sort();
        delta.unloaded.sort();
        delta
    }

    /// Work out texture changes for chunks within the render radius.
    /// Dirty chunks handed out for redraw are marked clean.
    pub fn plan_render(&mut self) -> RenderPlan {
        let frame = self.current_frame;
        let radius = self.render_radius;
        let observer_chunks = &self.observer_chunks;
        let mut plan = RenderPlan::default();

        for (pos, data) in self.chunks.iter_mut() {
            let in_range = observer_chunks
                .iter()
                .any(|c| c.chebyshev_distance(pos) <= radius);

            match (data.texture, in_range) {
                (None, true) => plan.materialize.push(*pos),
                (Some(texture), true) => {
                    if data.dirty {
                        plan.redraw.push((*pos, texture));
                        data.dirty = false;
                        data.last_update_frame = frame;
                    }
                    if !data.visible {
                        plan.show.push(texture);
                        data.visible = true;
                    }
                }
                (Some(texture), false) => {
                    if data.visible {
                        plan.hide.push(texture);
                        data.visible = false;
                    }
                }
                (None, false) => {}
            }
        }

        plan.materialize.sort();
        plan.redraw.sort_by_key(|(pos, _)| *pos);
        plan
    }

    /// Record a freshly drawn texture. Returns false if the chunk is no longer loaded.
    pub fn attach_texture(&mut self, pos: ChunkPos, texture: Entity) -> bool {
        let frame = self.current_frame;
        match self.chunks.get_mut(&pos) {
            Some(data) => {
                data.texture = Some(texture);
                data.dirty = false;
                data.visible = true;
                data.last_update_frame = frame;
                true
            }
            None => false,
        }
    }

    /// Grow the radii so the render radius covers a view of the given size in world pixels.
    /// Returns true if the radii changed.
    pub fn fit_to_view(&mut self, view_px: Vec2) -> bool {
        let chunk_px = (self.chunk_size * self.tile_size).max(1) as f32;
        let visible = (view_px.max_element() / chunk_px).ceil() as i32;
        let render_radius = visible.max(self.base_render_radius);
        let simulation_radius =
            render_radius + (self.base_simulation_radius - self.base_render_radius);

        let changed =
            render_radius != self.render_radius || simulation_radius != self.simulation_radius;
        self.render_radius = render_radius;
        self.simulation_radius = simulation_radius;
        changed
    }

    // Coordinates and edits

    pub fn get_chunk_coord(&self, tile: IVec2) -> ChunkPos {
        coords::chunk_of(tile, self.chunk_size)
    }

    pub fn get_tile_coord(&self, chunk: ChunkPos, local: UVec2) -> IVec2 {
        coords::tile_of(chunk, local, self.chunk_size)
    }

    /// Tile under a window-space cursor, or None outside the letterboxed view.
    /// The tile may lie outside the map.
    pub fn handle_click(&self, cursor: Vec2, camera: &GameCamera, fit: &AspectFit) -> Option<IVec2> {
        if fit.scale <= 0.0 || !fit.contains(cursor) {
            return None;
        }
        let world = camera.screen_to_world(fit, cursor);
        Some((world / self.tile_size as f32).floor().as_ivec2())
    }

    /// Flag the chunk holding `tile` for redraw. Returns false if it isn't loaded.
    pub fn mark_chunk_dirty(&mut self, tile: IVec2) -> bool {
        let pos = self.get_chunk_coord(tile);
        match self.chunks.get_mut(&pos) {
            Some(data) => {
                data.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_dirty(&mut self) {
        for data in self.chunks.values_mut() {
            data.dirty = true;
        }
    }

    /// Change the map bounds, dropping chunks that fall outside.
    /// Returns textures to despawn.
    pub fn set_map_size(&mut self, map_size: UVec2) -> Vec<Entity> {
        self.map_size = map_size;
        let mut textures = Vec::new();
        let chunk_size = self.chunk_size;
        self.chunks.retain(|pos, data| {
            let keep = chunk_in_bounds(*pos, chunk_size, map_size);
            if !keep {
                textures.extend(data.texture.take());
            }
            keep
        });
        textures
    }

    /// Drop every chunk and observer. Returns textures to despawn.
    pub fn cleanup(&mut self) -> Vec<Entity> {
        let textures = self
            .chunks
            .drain()
            .filter_map(|(_, data)| data.texture)
            .collect();
        self.observers.clear();
        self.observer_chunks.clear();
        textures
    }

    // Queries

    pub fn chunk_in_bounds(&self, pos: ChunkPos) -> bool {
        chunk_in_bounds(pos, self.chunk_size, self.map_size)
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&ChunkRenderData> {
        self.chunks.get(&pos)
    }

    pub fn chunks(&self) -> impl Iterator<Item = (&ChunkPos, &ChunkRenderData)> {
        self.chunks.iter()
    }

    pub fn is_loaded(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn observer_chunks(&self) -> &[ChunkPos] {
        &self.observer_chunks
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn render_radius(&self) -> i32 {
        self.render_radius
    }

    pub fn simulation_radius(&self) -> i32 {
        self.simulation_radius
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn stats(&self) -> ChunkStats {
        let mut stats = ChunkStats {
            loaded: self.chunks.len(),
            textured: 0,
            visible: 0,
            dirty: 0,
            observers: self.observers.len(),
            render_radius: self.render_radius,
            simulation_radius: self.simulation_radius,
            frame: self.current_frame,
        };
        for data in self.chunks.values() {
            stats.textured += data.texture.is_some() as usize;
            stats.visible += data.visible as usize;
            stats.dirty += data.dirty as usize;
        }
        stats
    }
}

fn chunk_in_bounds(pos: ChunkPos, chunk_size: u32, map_size: UVec2) -> bool {
    let origin = pos.tile_origin(chunk_size as i32);
    origin.x >= 0
        && origin.y >= 0
        && (origin.x as u32) < map_size.x
        && (origin.y as u32) < map_size.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    /// 8x8 chunks of 16 tiles, render radius 1, simulation radius 2
    fn manager() -> ChunkManager {
        ChunkManager::new(16, 16, UVec2::splat(128), 1, 2)
    }

    fn entities(n: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    #[test]
    fn test_update_loads_simulation_radius() {
        let mut manager = manager();
        let delta = manager.update(&[IVec2::new(64, 64)]);

        // Observer in chunk (4, 4), radius 2 -> 5x5
        assert_eq!(delta.loaded.len(), 25);
        assert!(delta.unloaded.is_empty());
        assert_eq!(manager.current_frame(), 1);

        let data = manager.chunk(ChunkPos::new(2, 6)).unwrap();
        assert!(data.loaded && data.dirty);
        assert_eq!(data.texture, None);
        assert!(!manager.is_loaded(ChunkPos::new(1, 4)));

        // Nothing new on a repeat update
        assert!(manager.update(&[IVec2::new(64, 64)]).is_empty());
        assert_eq!(manager.current_frame(), 2);
    }

    #[test]
    fn test_update_skips_out_of_bounds_chunks() {
        let mut manager = manager();
        let delta = manager.update(&[IVec2::new(0, 0)]);

        // Only the 3x3 corner inside the map
        assert_eq!(delta.loaded.len(), 9);
        assert!(manager.chunks().all(|(pos, _)| pos.x >= 0 && pos.y >= 0));
    }

    #[test]
    fn test_update_unloads_and_returns_textures() {
        let mut manager = manager();
        let textures = entities(1);

        manager.update(&[IVec2::new(0, 0)]);
        let plan = manager.plan_render();
        assert!(plan.materialize.contains(&ChunkPos::new(0, 0)));
        assert!(manager.attach_texture(ChunkPos::new(0, 0), textures[0]));

        // Move far away: origin corner falls out of the simulation radius
        let delta = manager.update(&[IVec2::new(127, 127)]);
        assert!(delta.unloaded.contains(&ChunkPos::new(0, 0)));
        assert_eq!(delta.to_despawn, vec![textures[0]]);
        assert!(!manager.is_loaded(ChunkPos::new(0, 0)));
        assert!(manager.is_loaded(ChunkPos::new(7, 7)));
    }

    #[test]
    fn test_no_observers_unloads_everything() {
        let mut manager = manager();
        manager.update(&[IVec2::new(64, 64)]);
        let delta = manager.update(&[]);
        assert_eq!(delta.unloaded.len(), 25);
        assert_eq!(manager.stats().loaded, 0);
    }

    #[test]
    fn test_plan_render_materializes_render_radius_only() {
        let mut manager = manager();
        manager.update(&[IVec2::new(64, 64)]);

        let plan = manager.plan_render();
        assert_eq!(plan.materialize.len(), 9);
        assert!(plan.materialize.iter().all(|p| p.chebyshev_distance(&ChunkPos::new(4, 4)) <= 1));
        assert!(plan.redraw.is_empty());
    }

    #[test]
    fn test_dirty_chunk_redrawn_once() {
        let mut manager = manager();
        let textures = entities(1);
        let pos = ChunkPos::new(4, 4);

        manager.update(&[IVec2::new(64, 64)]);
        manager.plan_render();
        manager.attach_texture(pos, textures[0]);
        assert!(!manager.chunk(pos).unwrap().dirty);

        manager.update(&[IVec2::new(64, 64)]);
        assert!(manager.mark_chunk_dirty(IVec2::new(70, 75)));
        assert!(manager.chunk(pos).unwrap().dirty);

        let plan = manager.plan_render();
        assert_eq!(plan.redraw, vec![(pos, textures[0])]);
        let data = manager.chunk(pos).unwrap();
        assert!(!data.dirty);
        assert_eq!(data.last_update_frame, 2);

        assert!(manager.plan_render().redraw.is_empty());

        // Unloaded chunks can't be dirtied
        assert!(!manager.mark_chunk_dirty(IVec2::new(0, 0)));
    }

    #[test]
    fn test_hide_and_show_on_render_radius() {
        let mut manager = manager();
        let textures = entities(1);
        let pos = ChunkPos::new(4, 4);

        manager.update(&[IVec2::new(64, 64)]);
        manager.plan_render();
        manager.attach_texture(pos, textures[0]);

        // Observer moves two chunks right: (4, 4) is loaded but out of render range
        manager.update(&[IVec2::new(96, 64)]);
        let plan = manager.plan_render();
        assert_eq!(plan.hide, vec![textures[0]]);
        assert!(!manager.chunk(pos).unwrap().visible);
        assert!(manager.plan_render().hide.is_empty());

        manager.update(&[IVec2::new(64, 64)]);
        let plan = manager.plan_render();
        assert_eq!(plan.show, vec![textures[0]]);
        assert!(manager.chunk(pos).unwrap().visible);
    }

    #[test]
    fn test_attach_texture_to_unloaded_chunk() {
        let mut manager = manager();
        let textures = entities(1);
        assert!(!manager.attach_texture(ChunkPos::new(3, 3), textures[0]));
    }

    #[test]
    fn test_multiple_observers_union() {
        let mut manager = manager();
        let delta = manager.update(&[IVec2::new(0, 0), IVec2::new(127, 127)]);
        // Two 3x3 corners
        assert_eq!(delta.loaded.len(), 18);
        assert_eq!(manager.observer_chunks().len(), 2);
    }

    #[test]
    fn test_observer_registration() {
        let mut manager = manager();
        let e = entities(2);

        assert!(manager.add_entity_observer(e[0]));
        assert!(!manager.add_entity_observer(e[0]));
        assert!(manager.add_manual_observer(IVec2::new(5, 5)));
        assert!(!manager.add_manual_observer(IVec2::new(5, 5)));
        assert_eq!(manager.observers().len(), 2);

        assert!(!manager.remove_entity_observer(e[1]));
        assert!(manager.remove_entity_observer(e[0]));
        assert!(manager.remove_manual_observer(IVec2::new(5, 5)));
        assert!(!manager.remove_manual_observer(IVec2::new(5, 5)));
        assert!(manager.observers().is_empty());

        assert!(manager.toggle_manual_observer(IVec2::new(1, 2)));
        assert_eq!(manager.manual_observers().collect::<Vec<_>>(), vec![IVec2::new(1, 2)]);
        assert!(!manager.toggle_manual_observer(IVec2::new(1, 2)));
        assert_eq!(manager.manual_observers().count(), 0);
    }

    #[test]
    fn test_observer_tiles_lookup() {
        let mut manager = manager();
        let e = entities(2);
        manager.add_entity_observer(e[0]);
        manager.add_entity_observer(e[1]);
        manager.add_manual_observer(IVec2::new(9, 9));

        let tiles = manager.observer_tiles(|entity| (entity == e[0]).then_some(IVec2::new(1, 1)));
        assert_eq!(tiles, vec![IVec2::new(1, 1), IVec2::new(9, 9)]);
    }

    #[test]
    fn test_fit_to_view() {
        let mut manager = manager();

        // 256px chunks, small view keeps the configured radii
        assert!(!manager.fit_to_view(Vec2::new(200.0, 100.0)));
        assert_eq!(manager.render_radius(), 1);
        assert_eq!(manager.simulation_radius(), 2);

        // 1600px wide view needs 7 chunks, gap to simulation radius kept
        assert!(manager.fit_to_view(Vec2::new(1600.0, 900.0)));
        assert_eq!(manager.render_radius(), 7);
        assert_eq!(manager.simulation_radius(), 8);

        assert!(manager.fit_to_view(Vec2::new(100.0, 100.0)));
        assert_eq!(manager.render_radius(), 1);
    }

    #[test]
    fn test_coords() {
        let manager = manager();
        assert_eq!(manager.get_chunk_coord(IVec2::new(17, 40)), ChunkPos::new(1, 2));
        assert_eq!(
            manager.get_tile_coord(ChunkPos::new(1, 2), UVec2::new(1, 8)),
            IVec2::new(17, 40)
        );
    }

    #[test]
    fn test_handle_click() {
        let manager = manager();
        let mut camera = GameCamera::new(Vec2::new(1600.0, 900.0), &CameraConfig::default());
        camera.pos = Vec2::new(32.0, 48.0);
        camera.zoom = 2.0;
        // Window twice as wide as needed: 400px bars on each side
        let fit = AspectFit::compute(camera.logical_size, Vec2::new(2400.0, 900.0));

        assert_eq!(manager.handle_click(Vec2::new(100.0, 100.0), &camera, &fit), None);

        // Top-left of the view is tile (2, 3)
        assert_eq!(
            manager.handle_click(Vec2::new(400.0, 0.0), &camera, &fit),
            Some(IVec2::new(2, 3))
        );
        // 64 screen px at zoom 2 is 32 world px, two tiles
        assert_eq!(
            manager.handle_click(Vec2::new(464.0, 64.0), &camera, &fit),
            Some(IVec2::new(4, 5))
        );
    }

    #[test]
    fn test_set_map_size_drops_out_of_bounds() {
        let mut manager = manager();
        let textures = entities(1);
        manager.update(&[IVec2::new(64, 64)]);
        manager.plan_render();
        manager.attach_texture(ChunkPos::new(5, 5), textures[0]);

        let dropped = manager.set_map_size(UVec2::splat(80));
        assert_eq!(dropped, vec![textures[0]]);
        assert!(manager.chunks().all(|(pos, _)| pos.x < 5 && pos.y < 5));

        manager.mark_all_dirty();
        assert_eq!(manager.stats().dirty, manager.stats().loaded);
    }

    #[test]
    fn test_cleanup() {
        let mut manager = manager();
        let textures = entities(2);
        manager.add_manual_observer(IVec2::new(64, 64));
        manager.update(&[IVec2::new(64, 64)]);
        manager.plan_render();
        manager.attach_texture(ChunkPos::new(4, 4), textures[0]);
        manager.attach_texture(ChunkPos::new(4, 5), textures[1]);

        let mut despawn = manager.cleanup();
        despawn.sort();
        let mut expected = textures.clone();
        expected.sort();
        assert_eq!(despawn, expected);
        assert_eq!(manager.stats().loaded, 0);
        assert!(manager.observers().is_empty());
    }

    #[test]
    fn test_stats_display() {
        let mut manager = manager();
        manager.update(&[IVec2::new(64, 64)]);
        let stats = manager.stats();
        assert_eq!(stats.loaded, 25);
        assert_eq!(stats.dirty, 25);
        assert_eq!(stats.textured, 0);
        assert!(stats.to_string().starts_with("Chunks: 25 loaded"));
    }
}

use bevy::camera::{ScalingMode, Viewport};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::config::{CameraConfig, GameConfig};
use crate::entities::{Player, Position};
use crate::tiles::Tilemap;

/// Offset applied to the initial camera position, in world pixels
const INITIAL_OFFSET: f32 = 200.0;

/// Letterboxed placement of the logical screen inside the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectFit {
    /// Destination rect in window pixels
    pub dest: Rect,
    /// Window pixels per logical pixel
    pub scale: f32,
}

impl AspectFit {
    pub fn compute(logical: Vec2, window: Vec2) -> Self {
        let scale = (window.x / logical.x).min(window.y / logical.y).max(0.0);
        let size = logical * scale;
        let min = (window - size) * 0.5;
        Self {
            dest: Rect::from_corners(min, min + size),
            scale,
        }
    }

    /// Edges count as inside
    pub fn contains(&self, screen: Vec2) -> bool {
        self.dest.contains(screen)
    }
}

impl Default for AspectFit {
    fn default() -> Self {
        Self {
            dest: Rect::default(),
            scale: 1.0,
        }
    }
}

/// Latest fit, recomputed every frame from the primary window
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct CameraFit(pub AspectFit);

/// Scrolling camera in world pixels. `pos` is the top-left corner of the view, y grows down.
#[derive(Resource, Debug, Clone)]
pub struct GameCamera {
    pub pos: Vec2,
    pub zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
    pub logical_size: Vec2,
}

impl GameCamera {
    pub fn new(logical_size: Vec2, config: &CameraConfig) -> Self {
        Self {
            pos: logical_size * 0.5 - Vec2::splat(INITIAL_OFFSET),
            zoom: 1.0,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            zoom_step: config.zoom_step,
            logical_size,
        }
    }

    /// World pixels visible at the current zoom
    pub fn view_size(&self) -> Vec2 {
        self.logical_size / self.zoom
    }

    pub fn view_rect(&self) -> Rect {
        Rect::from_corners(self.pos, self.pos + self.view_size())
    }

    /// Returns true if the zoom changed
    pub fn apply_zoom(&mut self, wheel: f32) -> bool {
        if wheel == 0.0 {
            return false;
        }
        let zoom = (self.zoom + wheel * self.zoom_step).clamp(self.min_zoom, self.max_zoom);
        let changed = zoom != self.zoom;
        self.zoom = zoom;
        changed
    }

    pub fn center_on(&mut self, world: Vec2) {
        self.pos = world - self.view_size() * 0.5;
    }

    pub fn follow_tile(&mut self, tile: IVec2, tile_size: u32) {
        self.center_on((tile.as_vec2() + Vec2::splat(0.5)) * tile_size as f32);
    }

    /// Keep the view inside the map. Maps smaller than the view pin to the origin.
    pub fn clamp_to_bounds(&mut self, map_px: Vec2) {
        let max = (map_px - self.view_size()).max(Vec2::ZERO);
        self.pos = self.pos.clamp(Vec2::ZERO, max);
    }

    pub fn world_to_screen(&self, fit: &AspectFit, world: Vec2) -> Vec2 {
        fit.dest.min + (world - self.pos) * self.zoom * fit.scale
    }

    pub fn screen_to_world(&self, fit: &AspectFit, screen: Vec2) -> Vec2 {
        self.pos + (screen - fit.dest.min) / (self.zoom * fit.scale)
    }
}

/// Flip a y-down world position into Bevy's y-up space
pub fn world_to_bevy(world: Vec2) -> Vec2 {
    Vec2::new(world.x, -world.y)
}

pub fn follow_player(
    player_query: Query<&Position, With<Player>>,
    mut camera: ResMut<GameCamera>,
    config: Res<GameConfig>,
) {
    if let Ok(position) = player_query.single() {
        camera.follow_tile(position.as_ivec2(), config.map.tile_size);
    }
}

pub fn fit_and_clamp(
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut camera: ResMut<GameCamera>,
    mut fit: ResMut<CameraFit>,
    tilemap: Res<Tilemap>,
    config: Res<GameConfig>,
) {
    if let Ok(window) = window_query.single() {
        fit.0 = AspectFit::compute(camera.logical_size, window.size());
    }
    let map_px = tilemap.pixel_size(config.map.tile_size);
    camera.clamp_to_bounds(map_px);
}

/// Drive the Bevy camera from the logical camera: letterboxed viewport,
/// fixed logical projection scaled by zoom, centred on the view.
pub fn sync_render_camera(
    camera: Res<GameCamera>,
    fit: Res<CameraFit>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut render_query: Query<(&mut Camera, &mut Transform, &mut Projection), With<Camera2d>>,
) {
    let Ok(window) = window_query.single() else {
        return;
    };
    let Ok((mut render_camera, mut transform, mut projection)) = render_query.single_mut() else {
        return;
    };

    let physical = UVec2::new(window.physical_width(), window.physical_height());
    let sf = window.scale_factor();
    let pos = (fit.0.dest.min * sf).round().as_uvec2().min(physical);
    let size = (fit.0.dest.size() * sf).round().as_uvec2().min(physical - pos);

    render_camera.viewport = if size.x == 0 || size.y == 0 {
        None
    } else {
        Some(Viewport {
            physical_position: pos,
            physical_size: size,
            ..default()
        })
    };

    if let Projection::Orthographic(ref mut ortho) = projection.as_mut() {
        ortho.scaling_mode = ScalingMode::Fixed {
            width: camera.logical_size.x,
            height: camera.logical_size.y,
        };
        ortho.scale = 1.0 / camera.zoom;
    }

    let center = world_to_bevy(camera.view_rect().center());
    transform.translation.x = center.x;
    transform.translation.y = center.y;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> GameCamera {
        GameCamera::new(Vec2::new(1600.0, 900.0), &CameraConfig::default())
    }

    #[test]
    fn test_initial_position() {
        let cam = camera();
        assert_eq!(cam.pos, Vec2::new(600.0, 250.0));
        assert_eq!(cam.zoom, 1.0);
        assert_eq!(cam.view_size(), Vec2::new(1600.0, 900.0));
    }

    #[test]
    fn test_aspect_fit_letterbox() {
        // Wider window: bars on the sides
        let fit = AspectFit::compute(Vec2::new(1600.0, 900.0), Vec2::new(2000.0, 900.0));
        assert_eq!(fit.scale, 1.0);
        assert_eq!(fit.dest.min, Vec2::new(200.0, 0.0));
        assert_eq!(fit.dest.max, Vec2::new(1800.0, 900.0));

        // Taller window: bars top and bottom
        let fit = AspectFit::compute(Vec2::new(1600.0, 900.0), Vec2::new(800.0, 800.0));
        assert_eq!(fit.scale, 0.5);
        assert_eq!(fit.dest.min, Vec2::new(0.0, 175.0));
        assert_eq!(fit.dest.size(), Vec2::new(800.0, 450.0));

        assert!(fit.contains(Vec2::new(0.0, 175.0)));
        assert!(fit.contains(Vec2::new(800.0, 625.0)));
        assert!(!fit.contains(Vec2::new(400.0, 100.0)));
    }

    #[test]
    fn test_zoom_clamps() {
        let mut cam = camera();
        assert!(!cam.apply_zoom(0.0));

        assert!(cam.apply_zoom(5.0));
        assert!((cam.zoom - 1.5).abs() < 1e-5);

        cam.apply_zoom(100.0);
        assert_eq!(cam.zoom, 4.0);
        assert!(!cam.apply_zoom(1.0));

        cam.apply_zoom(-100.0);
        assert_eq!(cam.zoom, 0.5);
    }

    #[test]
    fn test_follow_tile_centres_view() {
        let mut cam = camera();
        cam.zoom = 2.0;
        cam.follow_tile(IVec2::new(64, 64), 16);
        // Tile centre is (1032, 1032), view is 800x450
        assert_eq!(cam.pos, Vec2::new(632.0, 807.0));
        assert_eq!(cam.view_rect().center(), Vec2::new(1032.0, 1032.0));
    }

    #[test]
    fn test_clamp_to_bounds() {
        let mut cam = camera();
        let map_px = Vec2::splat(2048.0);

        cam.pos = Vec2::new(-50.0, 5000.0);
        cam.clamp_to_bounds(map_px);
        assert_eq!(cam.pos, Vec2::new(0.0, 2048.0 - 900.0));

        // Map smaller than the view pins to the origin
        cam.zoom = 0.5;
        cam.pos = Vec2::new(300.0, 300.0);
        cam.clamp_to_bounds(map_px);
        assert_eq!(cam.pos, Vec2::new(0.0, 248.0));
        cam.clamp_to_bounds(Vec2::splat(100.0));
        assert_eq!(cam.pos, Vec2::ZERO);
    }

    #[test]
    fn test_screen_world_inverse() {
        let mut cam = camera();
        cam.pos = Vec2::new(123.0, 456.0);
        cam.zoom = 1.7;
        let fit = AspectFit::compute(Vec2::new(1600.0, 900.0), Vec2::new(1280.0, 1024.0));

        for world in [Vec2::ZERO, Vec2::new(500.0, 700.0), Vec2::new(1024.5, 33.25)] {
            let back = cam.screen_to_world(&fit, cam.world_to_screen(&fit, world));
            assert!((back - world).length() < 1e-3, "{world} -> {back}");
        }

        // Top-left of the letterbox is the camera position
        assert_eq!(cam.screen_to_world(&fit, fit.dest.min), cam.pos);
    }

    #[test]
    fn test_sync_render_camera() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);

        let mut cam = camera();
        cam.pos = Vec2::new(100.0, 200.0);
        cam.zoom = 2.0;
        let fit = AspectFit::compute(cam.logical_size, Vec2::new(1600.0, 1000.0));
        app.insert_resource(cam);
        app.insert_resource(CameraFit(fit));

        app.world_mut().spawn((Window::default(), PrimaryWindow));
        let render = app
            .world_mut()
            .spawn((
                Camera2d,
                Camera::default(),
                Transform::default(),
                Projection::Orthographic(OrthographicProjection::default_2d()),
            ))
            .id();

        app.add_systems(Update, sync_render_camera);
        app.update();

        let transform = app.world().get::<Transform>(render).unwrap();
        assert_eq!(transform.translation.truncate(), Vec2::new(500.0, -425.0));

        let Some(Projection::Orthographic(ortho)) = app.world().get::<Projection>(render) else {
            panic!("expected orthographic projection");
        };
        assert_eq!(ortho.scale, 0.5);
    }
}

use bevy::prelude::*;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::tiles::{TileProperties, CHUNK_SIZE, MAP_SIZE, TILE_SIZE};

/// Default location of the game configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/game.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Command line overrides
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tilestream", about = "Chunk-streamed 2D tile map prototype")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Start with the debug overlay enabled
    #[arg(long)]
    pub debug: bool,

    /// Override the map size (tiles per side)
    #[arg(long)]
    pub map_size: Option<u32>,

    /// Log filter level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 900,
            title: "Tilestream".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Tiles per side
    pub size: u32,
    /// Pixels per tile side
    pub tile_size: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            size: MAP_SIZE,
            tile_size: TILE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub logical_width: f32,
    pub logical_height: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            logical_width: 1600.0,
            logical_height: 900.0,
            min_zoom: 0.5,
            max_zoom: 4.0,
            zoom_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Tiles per chunk side
    pub chunk_size: u32,
    /// Chunks kept drawn around each observer
    pub render_radius: i32,
    /// Chunks kept loaded around each observer
    pub simulation_radius: i32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            render_radius: 2,
            simulation_radius: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub name: String,
    pub path: String,
    pub tile_count: u32,
    pub tile_px: u32,
    pub capacity: usize,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            name: "ground".to_string(),
            path: "resources/spritesheet-export.png".to_string(),
            tile_count: 9,
            tile_px: 16,
            capacity: 400,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub sprite_index: u32,
    pub max_health: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sprite_index: 8,
            max_health: 100.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub path: PathBuf,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("saves/map.bin"),
        }
    }
}

/// Everything tunable about a session, loaded once at startup
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub window: WindowConfig,
    pub map: MapConfig,
    pub camera: CameraConfig,
    pub streaming: StreamingConfig,
    pub atlas: AtlasConfig,
    pub player: PlayerConfig,
    pub tiles: Vec<TileProperties>,
    pub save: SaveConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            map: MapConfig::default(),
            camera: CameraConfig::default(),
            streaming: StreamingConfig::default(),
            atlas: AtlasConfig::default(),
            player: PlayerConfig::default(),
            tiles: TileProperties::defaults(),
            save: SaveConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse a config file, failing on IO or TOML errors
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the config, falling back to defaults. A missing file is not an error;
    /// anything else is handed back so it can be logged once logging is up.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<ConfigError>) {
        let path = path.as_ref();
        if !path.exists() {
            return (Self::default(), None);
        }
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Apply command line overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(size) = cli.map_size {
            self.map.size = size;
        }
    }

    /// Clamp values that would break streaming or the camera.
    /// Returns a description of every adjustment made.
    pub fn validate(&mut self) -> Vec<String> {
        let mut fixes = Vec::new();

        if self.map.size == 0 {
            self.map.size = 1;
            fixes.push("map.size raised to 1".to_string());
        }
        if self.map.tile_size == 0 {
            self.map.tile_size = 1;
            fixes.push("map.tile_size raised to 1".to_string());
        }
        if self.streaming.chunk_size == 0 {
            self.streaming.chunk_size = 1;
            fixes.push("streaming.chunk_size raised to 1".to_string());
        }
        if self.streaming.render_radius < 0 {
            self.streaming.render_radius = 0;
            fixes.push("streaming.render_radius raised to 0".to_string());
        }
        if self.streaming.simulation_radius < self.streaming.render_radius {
            self.streaming.simulation_radius = self.streaming.render_radius;
            fixes.push(format!(
                "streaming.simulation_radius raised to {}",
                self.streaming.render_radius
            ));
        }
        // Zoom bounds feed f32::clamp, which panics on NaN or inverted bounds
        if !self.camera.min_zoom.is_finite() || self.camera.min_zoom <= 0.0 {
            self.camera.min_zoom = 0.1;
            fixes.push("camera.min_zoom reset to 0.1".to_string());
        }
        if !self.camera.max_zoom.is_finite() {
            self.camera.max_zoom = CameraConfig::default().max_zoom.max(self.camera.min_zoom);
            fixes.push(format!("camera.max_zoom reset to {}", self.camera.max_zoom));
        }
        if self.camera.max_zoom < self.camera.min_zoom {
            self.camera.max_zoom = self.camera.min_zoom;
            fixes.push(format!("camera.max_zoom raised to {}", self.camera.min_zoom));
        }
        if !self.player.max_health.is_finite() || self.player.max_health < 0.0 {
            self.player.max_health = PlayerConfig::default().max_health;
            fixes.push(format!(
                "player.max_health reset to {}",
                self.player.max_health
            ));
        }
        if self.tiles.is_empty() {
            self.tiles = TileProperties::defaults();
            fixes.push("tiles was empty, using built-in tile kinds".to_string());
        }

        fixes
    }

    pub fn logical_size(&self) -> Vec2 {
        Vec2::new(self.camera.logical_width, self.camera.logical_height)
    }
}

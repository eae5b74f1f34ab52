use bevy::prelude::*;
use thiserror::Error;

/// Tile position component, y grows downward
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn as_ivec2(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<IVec2> for Position {
    fn from(v: IVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum HealthError {
    #[error("health value {0} is not finite")]
    NotFinite(f32),
}

/// Health component
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    /// Negative or NaN max becomes 0
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Set current health, clamped to [0, max]
    pub fn set(&mut self, value: f32) -> Result<(), HealthError> {
        if !value.is_finite() {
            return Err(HealthError::NotFinite(value));
        }
        self.current = value.clamp(0.0, self.max.max(0.0));
        Ok(())
    }

    /// 0.0..=1.0, zero for a zero max
    pub fn percent(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }
}

/// Which atlas rect to draw for an entity
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct TileSprite {
    pub atlas: String,
    pub index: u32,
}

impl TileSprite {
    pub fn new(atlas: impl Into<String>, index: u32) -> Self {
        Self {
            atlas: atlas.into(),
            index,
        }
    }
}

/// Marker component for the player character
#[derive(Component)]
pub struct Player;

/// Entities with this component keep the chunks around them streamed in
#[derive(Component)]
pub struct ChunkObserver;

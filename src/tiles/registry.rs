use bevy::prelude::*;
use serde::Deserialize;

use super::types::TileId;

/// Properties of a tile kind. The tile id is its index in the registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TileProperties {
    pub name: String,
    #[serde(default = "default_walkable")]
    pub walkable: bool,
}

fn default_walkable() -> bool {
    true
}

impl TileProperties {
    pub fn new(name: impl Into<String>, walkable: bool) -> Self {
        Self {
            name: name.into(),
            walkable,
        }
    }

    /// Built-in tile kinds, matching the ground atlas layout
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("grass", true),
            Self::new("dirt", true),
            Self::new("sand", true),
            Self::new("gravel", true),
            Self::new("wall", false),
        ]
    }
}

/// Tile registry for storing tile properties and metadata
#[derive(Resource, Debug, Clone)]
pub struct TileRegistry {
    tiles: Vec<TileProperties>,
}

impl TileRegistry {
    pub fn new(tiles: Vec<TileProperties>) -> Self {
        Self { tiles }
    }

    /// Check if a tile ID is registered
    pub fn is_valid_tile(&self, tile_id: TileId) -> bool {
        (tile_id as usize) < self.tiles.len()
    }

    pub fn get(&self, tile_id: TileId) -> Option<&TileProperties> {
        self.tiles.get(tile_id as usize)
    }

    /// Unknown tiles are treated as walkable
    pub fn is_walkable(&self, tile_id: TileId) -> bool {
        self.get(tile_id).map_or(true, |props| props.walkable)
    }

    pub fn name(&self, tile_id: TileId) -> &str {
        self.get(tile_id).map_or("unknown", |props| props.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TileId, &TileProperties)> {
        self.tiles
            .iter()
            .enumerate()
            .map(|(i, props)| (i as TileId, props))
    }
}

impl Default for TileRegistry {
    fn default() -> Self {
        Self::new(TileProperties::defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::{TILE_GRASS, TILE_WALL};

    #[test]
    fn test_default_registry() {
        let registry = TileRegistry::default();
        assert_eq!(registry.len(), 5);
        assert!(registry.is_valid_tile(TILE_WALL));
        assert!(!registry.is_valid_tile(5));
        assert_eq!(registry.name(TILE_GRASS), "grass");
        assert_eq!(registry.name(99), "unknown");
    }

    #[test]
    fn test_walkability() {
        let registry = TileRegistry::default();
        assert!(registry.is_walkable(TILE_GRASS));
        assert!(!registry.is_walkable(TILE_WALL));
        assert!(registry.is_walkable(42));
    }

    #[test]
    fn test_iter_assigns_ids_by_position() {
        let registry = TileRegistry::new(vec![
            TileProperties::new("a", true),
            TileProperties::new("b", false),
        ]);
        let ids: Vec<(TileId, &str)> = registry.iter().map(|(id, p)| (id, p.name.as_str())).collect();
        assert_eq!(ids, vec![(0, "a"), (1, "b")]);
    }
}

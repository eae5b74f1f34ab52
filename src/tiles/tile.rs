use bitflags::bitflags;

use super::types::TileId;

bitflags! {
    /// Per-tile state bits
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TileFlags: u8 {
        /// Painted by the player since the map was generated
        const EDITED = 1 << 0;
    }
}

/// A single map cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tile {
    pub id: TileId,
    pub flags: TileFlags,
}

impl Tile {
    pub const fn new(id: TileId) -> Self {
        Self {
            id,
            flags: TileFlags::empty(),
        }
    }

    pub fn set_flag(&mut self, flag: TileFlags) {
        self.flags.insert(flag);
    }

    pub fn clear_flag(&mut self, flag: TileFlags) {
        self.flags.remove(flag);
    }

    pub fn has_flag(&self, flag: TileFlags) -> bool {
        self.flags.contains(flag)
    }
}

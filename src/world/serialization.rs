use crate::tiles::{Tile, TileFlags, Tilemap};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Magic number for map files ("TMAP" in ASCII)
const MAGIC_NUMBER: [u8; 4] = [b'T', b'M', b'A', b'P'];

/// Current map file format version
const VERSION: u16 = 1;

/// Magic, version and payload length
const HEADER_LEN: u64 = 10;
/// Trailing checksum
const TRAILER_LEN: u64 = 4;

/// Error type for map save/load
#[derive(Debug, Error)]
pub enum MapIoError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid magic number")]
    InvalidMagicNumber,
    #[error("Invalid version: {0}")]
    InvalidVersion(u16),
    #[error("Checksum mismatch")]
    InvalidChecksum,
    #[error("Header declares a {declared} byte payload but the file holds {actual}")]
    PayloadLength { declared: u64, actual: u64 },
    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("Map is {width}x{height} but holds {tiles} tiles")]
    InvalidTileCount { width: u32, height: u32, tiles: usize },
}

/// On-disk payload
#[derive(Debug, Serialize, Deserialize)]
struct MapSnapshot {
    width: u32,
    height: u32,
    /// (tile id, flag bits), row-major
    tiles: Vec<(u16, u8)>,
}

impl MapSnapshot {
    fn from_tilemap(tilemap: &Tilemap) -> Self {
        Self {
            width: tilemap.width(),
            height: tilemap.height(),
            tiles: tilemap
                .tiles()
                .iter()
                .map(|tile| (tile.id, tile.flags.bits()))
                .collect(),
        }
    }

    fn into_tilemap(self) -> Result<Tilemap, MapIoError> {
        let count = self.tiles.len();
        let tiles = self
            .tiles
            .into_iter()
            .map(|(id, bits)| Tile {
                id,
                flags: TileFlags::from_bits_truncate(bits),
            })
            .collect();
        Tilemap::from_tiles(self.width, self.height, tiles).ok_or(MapIoError::InvalidTileCount {
            width: self.width,
            height: self.height,
            tiles: count,
        })
    }
}

/// Save the whole tilemap to disk in binary format
pub fn save_map<P: AsRef<Path>>(tilemap: &Tilemap, path: P) -> Result<(), MapIoError> {
    // Ensure directory exists
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }

    let payload = bincode::serialize(&MapSnapshot::from_tilemap(tilemap))?;

    let mut file = File::create(path)?;

    // Write header
    file.write_all(&MAGIC_NUMBER)?;
    file.write_all(&VERSION.to_le_bytes())?;
    file.write_all(&(payload.len() as u32).to_le_bytes())?;

    file.write_all(&payload)?;

    // Checksum (CRC32) of the payload
    let checksum = crc32fast::hash(&payload);
    file.write_all(&checksum.to_le_bytes())?;

    file.sync_all()?;
    Ok(())
}

/// Load a tilemap from disk
pub fn load_map<P: AsRef<Path>>(path: P) -> Result<Tilemap, MapIoError> {
    let mut file = File::open(path)?;

    // Read and verify magic number
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)?;
    if magic != MAGIC_NUMBER {
        return Err(MapIoError::InvalidMagicNumber);
    }

    // Read and verify version
    let mut version_bytes = [0u8; 2];
    file.read_exact(&mut version_bytes)?;
    let version = u16::from_le_bytes(version_bytes);
    if version != VERSION {
        return Err(MapIoError::InvalidVersion(version));
    }

    let mut len_bytes = [0u8; 4];
    file.read_exact(&mut len_bytes)?;
    let declared = u64::from(u32::from_le_bytes(len_bytes));
    let actual = file
        .metadata()?
        .len()
        .saturating_sub(HEADER_LEN + TRAILER_LEN);
    if declared != actual {
        return Err(MapIoError::PayloadLength { declared, actual });
    }
    let mut payload = vec![0u8; declared as usize];
    file.read_exact(&mut payload)?;

    // Read and verify checksum
    let mut checksum_bytes = [0u8; 4];
    file.read_exact(&mut checksum_bytes)?;
    if crc32fast::hash(&payload) != u32::from_le_bytes(checksum_bytes) {
        return Err(MapIoError::InvalidChecksum);
    }

    let snapshot: MapSnapshot = bincode::deserialize(&payload)?;
    snapshot.into_tilemap()
}

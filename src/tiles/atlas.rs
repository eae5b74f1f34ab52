use bevy::asset::RenderAssetUsages;
use bevy::image::ImageSampler;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use super::constants::ATLAS_MAX_CAPACITY;

const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Error, PartialEq)]
pub enum AtlasError {
    #[error("atlas capacity {requested} exceeds maximum of {max}")]
    CapacityTooLarge { requested: usize, max: usize },
    #[error("atlas is full ({capacity} rects)")]
    CapacityExceeded { capacity: usize },
    #[error("rect {index} ({rect:?}) lies outside the {width}x{height} image")]
    RectOutOfBounds {
        index: u32,
        rect: URect,
        width: u32,
        height: u32,
    },
    #[error("rect {index} is {actual:?}, expected {expected}x{expected}")]
    RectSizeMismatch { index: u32, actual: UVec2, expected: u32 },
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    PixelDataSize { actual: usize, expected: usize },
    #[error("unsupported texture format {0:?}, expected RGBA8")]
    UnsupportedFormat(TextureFormat),
    #[error("image has no CPU-side pixel data")]
    MissingData,
    #[error("atlas has no rects")]
    Empty,
}

/// A texture plus a table of indexed sub-rectangles
#[derive(Debug, Clone)]
pub struct Atlas {
    texture: Handle<Image>,
    rects: BTreeMap<u32, URect>,
    capacity: usize,
}

impl Atlas {
    pub fn new(texture: Handle<Image>, capacity: usize) -> Result<Self, AtlasError> {
        if capacity > ATLAS_MAX_CAPACITY {
            return Err(AtlasError::CapacityTooLarge {
                requested: capacity,
                max: ATLAS_MAX_CAPACITY,
            });
        }
        Ok(Self {
            texture,
            rects: BTreeMap::new(),
            capacity,
        })
    }

    /// Square tiles laid out left to right along the top row
    pub fn grid(
        texture: Handle<Image>,
        count: u32,
        tile_px: u32,
        capacity: usize,
    ) -> Result<Self, AtlasError> {
        let mut atlas = Self::new(texture, capacity)?;
        for i in 0..count {
            let min = UVec2::new(i * tile_px, 0);
            atlas.add_rect(i, URect::from_corners(min, min + UVec2::splat(tile_px)))?;
        }
        Ok(atlas)
    }

    /// Insert or replace the rect at `index`
    pub fn add_rect(&mut self, index: u32, rect: URect) -> Result<(), AtlasError> {
        if !self.rects.contains_key(&index) && self.rects.len() >= self.capacity {
            return Err(AtlasError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.rects.insert(index, rect);
        Ok(())
    }

    pub fn rect(&self, index: u32) -> Option<URect> {
        self.rects.get(&index).copied()
    }

    pub fn remove_rect(&mut self, index: u32) -> Option<URect> {
        self.rects.remove(&index)
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn texture(&self) -> &Handle<Image> {
        &self.texture
    }

    pub fn set_texture(&mut self, texture: Handle<Image>) {
        self.texture = texture;
    }

    /// One layer per index up to the highest rect, so layer `i` is rect `i`
    pub fn layer_count(&self) -> u32 {
        self.rects.keys().next_back().map_or(0, |max| max + 1)
    }

    /// Copy every rect out of an RGBA8 pixel buffer into a vertically stacked
    /// buffer of `tile_px` square layers. Indices with no rect stay transparent.
    pub fn slice_layers(
        &self,
        pixels: &[u8],
        image_size: UVec2,
        tile_px: u32,
    ) -> Result<Vec<u8>, AtlasError> {
        if self.is_empty() {
            return Err(AtlasError::Empty);
        }

        let expected = image_size.x as usize * image_size.y as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(AtlasError::PixelDataSize {
                actual: pixels.len(),
                expected,
            });
        }

        let row_bytes = tile_px as usize * BYTES_PER_PIXEL;
        let layer_bytes = row_bytes * tile_px as usize;
        let mut out = vec![0u8; layer_bytes * self.layer_count() as usize];

        for (&index, rect) in &self.rects {
            if rect.max.x > image_size.x || rect.max.y > image_size.y {
                return Err(AtlasError::RectOutOfBounds {
                    index,
                    rect: *rect,
                    width: image_size.x,
                    height: image_size.y,
                });
            }
            if rect.size() != UVec2::splat(tile_px) {
                return Err(AtlasError::RectSizeMismatch {
                    index,
                    actual: rect.size(),
                    expected: tile_px,
                });
            }

            let layer_start = index as usize * layer_bytes;
            for row in 0..tile_px as usize {
                let src_y = rect.min.y as usize + row;
                let src = (src_y * image_size.x as usize + rect.min.x as usize) * BYTES_PER_PIXEL;
                let dst = layer_start + row * row_bytes;
                out[dst..dst + row_bytes].copy_from_slice(&pixels[src..src + row_bytes]);
            }
        }

        Ok(out)
    }
}

/// Named atlases
#[derive(Resource, Debug, Default)]
pub struct AtlasTable {
    atlases: HashMap<String, Atlas>,
}

impl AtlasTable {
    /// Register an atlas, returning the one it replaced
    pub fn add(&mut self, name: impl Into<String>, atlas: Atlas) -> Option<Atlas> {
        self.atlases.insert(name.into(), atlas)
    }

    pub fn get(&self, name: &str) -> Option<&Atlas> {
        self.atlases.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Atlas> {
        self.atlases.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Atlas> {
        self.atlases.remove(name)
    }

    pub fn len(&self) -> usize {
        self.atlases.len()
    }
}

/// Build the 2D array texture `TilemapChunk` samples from, one layer per atlas rect
pub fn build_tile_array(atlas: &Atlas, source: &Image, tile_px: u32) -> Result<Image, AtlasError> {
    let format = source.texture_descriptor.format;
    if !matches!(
        format,
        TextureFormat::Rgba8UnormSrgb | TextureFormat::Rgba8Unorm
    ) {
        return Err(AtlasError::UnsupportedFormat(format));
    }
    let Some(ref data) = source.data else {
        return Err(AtlasError::MissingData);
    };

    let size = UVec2::new(source.width(), source.height());
    let stacked = atlas.slice_layers(data, size, tile_px)?;
    let layers = atlas.layer_count();
    // reinterpret_stacked_2d_as_array panics on zero layers
    if layers == 0 {
        return Err(AtlasError::Empty);
    }

    let mut image = Image::new(
        Extent3d {
            width: tile_px,
            height: tile_px * layers,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        stacked,
        format,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    // Vertically stacked layers become the array texture; height is tile_px * layers
    image.reinterpret_stacked_2d_as_array(layers);
    image.sampler = ImageSampler::nearest();

    Ok(image)
}

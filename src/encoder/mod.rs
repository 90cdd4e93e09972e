// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::codecs::raw::RawCodec;
use crate::codecs::Encoder as _;
use crate::codecs::EncoderCodec;
use crate::decoder::ContainerMetadata;
use crate::decoder::ContainerSource;
use crate::decoder::ItemInfo;
use crate::decoder::ToneMapInfo;
use crate::gainmap::tmap::write_tmap;
use crate::gainmap::GainMap;
use crate::grid;
use crate::image::*;
use crate::internal_utils::*;
use crate::*;

type Tiles = [Vec<Vec<u8>>; Category::COUNT];

/// A container held in memory, as produced by Encoder::finish(). It can be fed to
/// decoder::Decoder::set_source().
#[derive(Clone, Debug, Default)]
pub struct MemoryContainer {
    metadata: ContainerMetadata,
    // Coded tiles of each frame, per category, in row major order.
    frames: Vec<Tiles>,
}

impl MemoryContainer {
    /// Creates an empty container described by |metadata|. Tiles are added with add_tile().
    pub fn create(metadata: ContainerMetadata) -> Self {
        Self {
            metadata,
            frames: Vec::new(),
        }
    }

    pub fn add_tile(
        &mut self,
        frame_index: u32,
        category: Category,
        payload: Vec<u8>,
    ) -> AvifResult<()> {
        let frame_index = usize_from_u32(frame_index)?;
        if self.frames.len() <= frame_index {
            self.frames
                .try_reserve(frame_index + 1 - self.frames.len())
                .or(Err(AvifError::OutOfMemory))?;
            self.frames.resize_with(frame_index + 1, Default::default);
        }
        self.frames[frame_index][category.usize()].push(payload);
        Ok(())
    }
}

impl ContainerSource for MemoryContainer {
    fn metadata(&mut self) -> AvifResult<ContainerMetadata> {
        Ok(self.metadata.clone())
    }

    fn tile_payload(
        &mut self,
        category: Category,
        frame_index: u32,
        tile_index: u32,
    ) -> AvifResult<&[u8]> {
        self.frames
            .get(usize_from_u32(frame_index)?)
            .and_then(|tiles| tiles[category.usize()].get(tile_index as usize))
            .map(|payload| payload.as_slice())
            .ok_or(AvifError::TruncatedData)
    }
}

fn tone_map_info(
    gainmap: &GainMap,
    base: &Image,
    grid_columns: u32,
    grid_rows: u32,
) -> AvifResult<ToneMapInfo> {
    let Some(gainmap_image) = &gainmap.image else {
        log::debug!("a gain map cannot be encoded without its image");
        return AvifError::invalid_argument();
    };
    let mut item = ItemInfo::from_image(gainmap_image, grid_columns, grid_rows);
    item.alpha_present = false;
    Ok(ToneMapInfo {
        gainmap: item,
        metadata: write_tmap(&gainmap.metadata)?,
        alt_color_primaries: gainmap.alt_color_primaries,
        alt_transfer_characteristics: gainmap.alt_transfer_characteristics,
        alt_matrix_coefficients: gainmap.alt_matrix_coefficients,
        alt_yuv_range: gainmap.alt_yuv_range,
        alt_plane_count: if gainmap.alt_plane_count > 0 { gainmap.alt_plane_count } else { 3 },
        alt_plane_depth: if gainmap.alt_plane_depth > 0 {
            gainmap.alt_plane_depth
        } else {
            std::cmp::max(base.depth, gainmap_image.depth)
        },
        alt_clli: gainmap.alt_clli,
    })
}

/// Stores images as uncompressed tiles in a MemoryContainer.
pub struct Encoder {
    codec: EncoderCodec,
    metadata: Option<ContainerMetadata>,
    frames: Vec<Tiles>,
    is_sequence: bool,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            codec: Box::<RawCodec>::default(),
            metadata: None,
            frames: Vec::new(),
            is_sequence: false,
        }
    }
}

impl Encoder {
    pub fn create() -> Self {
        Self::default()
    }

    fn add_image_impl(
        &mut self,
        grid_columns: u32,
        grid_rows: u32,
        cell_images: &[&Image],
        is_single_image: bool,
    ) -> AvifResult<()> {
        // Checks every cell before anything is encoded.
        let (grid, _) = grid::validate_cells(cell_images, grid_columns, grid_rows)?;
        let first_image = cell_images[0];
        let gainmap = first_image.gainmap.as_deref();
        match &self.metadata {
            None => {}
            Some(_) if is_single_image || !self.is_sequence => {
                log::debug!("an image was already added");
                return AvifError::invalid_argument();
            }
            Some(metadata) => {
                if gainmap.is_some() || metadata.tone_map.is_some() {
                    log::debug!("gain maps are not supported in image sequences");
                    return AvifError::not_implemented();
                }
                // Another frame in an image sequence.
                if ItemInfo::from_image(first_image, grid_columns, grid_rows) != metadata.color {
                    log::debug!("frame properties differ from the first frame");
                    return AvifError::invalid_argument();
                }
            }
        }
        let tone_map = match gainmap {
            Some(gainmap) => Some(tone_map_info(gainmap, first_image, grid_columns, grid_rows)?),
            None => None,
        };

        let mut tiles: Tiles = Default::default();
        for cell in cell_images {
            let mut payload = Vec::new();
            self.codec
                .encode_image(cell, Category::Color, &mut payload)?;
            tiles[Category::Color.usize()].push(payload);
            if first_image.has_alpha() {
                let mut payload = Vec::new();
                self.codec
                    .encode_image(cell, Category::Alpha, &mut payload)?;
                tiles[Category::Alpha.usize()].push(payload);
            }
            if let Some(gainmap_image) = cell.gainmap.as_ref().and_then(|x| x.image.as_ref()) {
                let mut payload = Vec::new();
                self.codec
                    .encode_image(gainmap_image, Category::Gainmap, &mut payload)?;
                tiles[Category::Gainmap.usize()].push(payload);
            }
        }
        log::trace!(
            "encoded frame {} of {}x{} in {grid_columns}x{grid_rows} cells",
            self.frames.len(),
            grid.width,
            grid.height
        );

        self.frames
            .try_reserve(1)
            .or(Err(AvifError::OutOfMemory))?;
        self.frames.push(tiles);
        let metadata = self.metadata.get_or_insert_with(|| ContainerMetadata {
            color: ItemInfo::from_image(first_image, grid_columns, grid_rows),
            tone_map,
            frame_count: 0,
        });
        metadata.frame_count = u32_from_usize(self.frames.len())?;
        self.is_sequence = !is_single_image;
        Ok(())
    }

    /// Adds a still image, possibly owning a gain map.
    pub fn add_image(&mut self, image: &Image) -> AvifResult<()> {
        self.add_image_impl(1, 1, &[image], true)
    }

    /// Adds a frame of an image sequence. Only the first frame may own a gain map, and a sequence
    /// whose first frame owns one cannot be extended.
    pub fn add_image_for_sequence(&mut self, image: &Image) -> AvifResult<()> {
        self.add_image_impl(1, 1, &[image], false)
    }

    /// Adds a still image made of |images| in row major order. Either every cell owns a gain map
    /// or none does.
    pub fn add_image_grid(
        &mut self,
        grid_columns: u32,
        grid_rows: u32,
        images: &[&Image],
    ) -> AvifResult<()> {
        self.add_image_impl(grid_columns, grid_rows, images, true)
    }

    pub fn finish(&mut self) -> AvifResult<MemoryContainer> {
        let Some(metadata) = self.metadata.take() else {
            return AvifError::no_content();
        };
        let container = MemoryContainer {
            metadata,
            frames: std::mem::take(&mut self.frames),
        };
        self.is_sequence = false;
        Ok(container)
    }
}

// Copyright 2024 Google LLC
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
use crate::codecs::Codec;
use crate::codecs::DecoderConfig;
use crate::gainmap::tmap::parse_tmap;
use crate::gainmap::GainMap;
use crate::grid;
use crate::grid::Grid;
use crate::image::*;
use crate::internal_utils::*;
use crate::*;

pub const DEFAULT_IMAGE_SIZE_LIMIT: u32 = 16384 * 16384;
pub const DEFAULT_IMAGE_DIMENSION_LIMIT: u32 = 32768;

#[derive(Clone, Debug)]
pub struct Settings {
    /// When set, only the gain map (if enabled) is decoded. The base image geometry and color
    /// properties are still available after parse().
    pub ignore_color_and_alpha: bool,
    pub enable_decoding_gainmap: bool,
    pub enable_parsing_gainmap_metadata: bool,
    pub image_size_limit: u32,
    pub image_dimension_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ignore_color_and_alpha: false,
            enable_decoding_gainmap: false,
            enable_parsing_gainmap_metadata: false,
            image_size_limit: DEFAULT_IMAGE_SIZE_LIMIT,
            image_dimension_limit: DEFAULT_IMAGE_DIMENSION_LIMIT,
        }
    }
}

/// Properties of one coded item (the base image or the gain map image) as stored in a container.
/// Items that are not grids have a 1x1 layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ItemInfo {
    pub cell_width: u32,
    pub cell_height: u32,
    pub grid_columns: u32,
    pub grid_rows: u32,
    pub depth: u8,
    pub yuv_format: PixelFormat,
    pub yuv_range: YuvRange,
    pub alpha_present: bool,
    pub color_primaries: ColorPrimaries,
    pub transfer_characteristics: TransferCharacteristics,
    pub matrix_coefficients: MatrixCoefficients,
    pub clli: Option<ContentLightLevelInformation>,
}

impl ItemInfo {
    pub fn from_image(image: &Image, grid_columns: u32, grid_rows: u32) -> Self {
        Self {
            cell_width: image.width,
            cell_height: image.height,
            grid_columns,
            grid_rows,
            depth: image.depth,
            yuv_format: image.yuv_format,
            yuv_range: image.yuv_range,
            alpha_present: image.has_alpha(),
            color_primaries: image.color_primaries,
            transfer_characteristics: image.transfer_characteristics,
            matrix_coefficients: image.matrix_coefficients,
            clli: image.clli,
        }
    }

    fn cell_descriptor(&self) -> ImageDescriptor {
        ImageDescriptor {
            width: self.cell_width,
            height: self.cell_height,
            depth: self.depth,
            yuv_format: self.yuv_format,
        }
    }

    // Checks the layout as if every cell had been decoded with the announced geometry.
    fn grid(&self) -> AvifResult<Grid> {
        if self.grid_columns == 0 || self.grid_rows == 0 {
            return AvifError::invalid_image_grid(format!(
                "invalid grid size {}x{}",
                self.grid_columns, self.grid_rows
            ));
        }
        let cell_count = usize_from_u32(checked_mul!(self.grid_columns, self.grid_rows)?)?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(cell_count)
            .or(Err(AvifError::OutOfMemory))?;
        cells.resize(cell_count, self.cell_descriptor());
        grid::validate(&cells, self.grid_columns, self.grid_rows)
    }

    // An image carrying the properties of this item without any sample.
    fn image(&self, width: u32, height: u32) -> Image {
        Image {
            width,
            height,
            depth: self.depth,
            yuv_format: self.yuv_format,
            yuv_range: self.yuv_range,
            alpha_present: self.alpha_present,
            color_primaries: self.color_primaries,
            transfer_characteristics: self.transfer_characteristics,
            matrix_coefficients: self.matrix_coefficients,
            clli: self.clli,
            ..Default::default()
        }
    }

    fn decoder_config(&self, category: Category) -> DecoderConfig {
        DecoderConfig {
            width: self.cell_width,
            height: self.cell_height,
            depth: self.depth,
            yuv_format: self.yuv_format,
            category,
        }
    }
}

/// Describes the gain map of a container: how its pixels are stored, its serialized metadata and
/// the rendition it reconstructs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToneMapInfo {
    pub gainmap: ItemInfo,
    /// A tmap payload, see gainmap::tmap.
    pub metadata: Vec<u8>,
    pub alt_color_primaries: ColorPrimaries,
    pub alt_transfer_characteristics: TransferCharacteristics,
    pub alt_matrix_coefficients: MatrixCoefficients,
    pub alt_yuv_range: YuvRange,
    pub alt_plane_count: u8,
    pub alt_plane_depth: u8,
    pub alt_clli: ContentLightLevelInformation,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContainerMetadata {
    pub color: ItemInfo,
    pub tone_map: Option<ToneMapInfo>,
    pub frame_count: u32,
}

/// The container layer as seen by the decoder: item properties plus coded tile payloads.
pub trait ContainerSource {
    fn metadata(&mut self) -> AvifResult<ContainerMetadata>;
    // Returns the coded payload of one tile. Tiles are numbered in row major order. Alpha tiles
    // exist only when the color item has alpha, gain map tiles only when a tone map is present.
    fn tile_payload(
        &mut self,
        category: Category,
        frame_index: u32,
        tile_index: u32,
    ) -> AvifResult<&[u8]>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParseState {
    #[default]
    Unparsed,
    HeaderParsed,
    PixelsDecoded,
}

#[derive(Default)]
pub struct Decoder {
    pub settings: Settings,
    pub image_count: u32,
    pub image_index: i32,
    pub gainmap_present: bool,
    image: Image,
    // Snapshot of |settings| taken by parse().
    parsed_settings: Settings,
    metadata: ContainerMetadata,
    source: Option<Box<dyn ContainerSource>>,
    parse_state: ParseState,
}

fn create_codec(config: &DecoderConfig) -> AvifResult<Codec> {
    let mut codec: Codec = Box::<RawCodec>::default();
    codec.initialize(config)?;
    Ok(codec)
}

fn check_limits(width: u32, height: u32, settings: &Settings) -> AvifResult<()> {
    if !crate::internal_utils::check_limits(
        width,
        height,
        settings.image_size_limit,
        settings.image_dimension_limit,
    ) {
        log::debug!(
            "image of {width}x{height} exceeds the limits of {} pixels or {} pixels per side",
            settings.image_size_limit,
            settings.image_dimension_limit
        );
        return AvifError::invalid_argument();
    }
    Ok(())
}

// Decodes every tile of one frame of |item| for |categories| and assembles the cells.
fn decode_item(
    source: &mut dyn ContainerSource,
    item: &ItemInfo,
    frame_index: u32,
    categories: &[Category],
) -> AvifResult<Image> {
    let mut codecs: Vec<Codec> = Vec::new();
    for category in categories {
        codecs.push(create_codec(&item.decoder_config(*category))?);
    }
    let cell_count = checked_mul!(item.grid_columns, item.grid_rows)?;
    let mut cells: Vec<Image> = Vec::new();
    cells
        .try_reserve_exact(usize_from_u32(cell_count)?)
        .or(Err(AvifError::OutOfMemory))?;
    for tile_index in 0..cell_count {
        let mut cell = item.image(item.cell_width, item.cell_height);
        cell.alpha_present = false;
        for (category, codec) in categories.iter().zip(codecs.iter_mut()) {
            let payload = source.tile_payload(*category, frame_index, tile_index)?;
            codec.get_next_image(payload, &mut cell, *category)?;
        }
        cells.push(cell);
    }
    if cells.len() == 1 {
        return cells.pop().ok_or(AvifError::NoContent);
    }
    let cell_refs: Vec<&Image> = cells.iter().collect();
    grid::validate_and_assemble_grid(&cell_refs, item.grid_columns, item.grid_rows)
}

impl Decoder {
    pub fn set_source(&mut self, source: Box<dyn ContainerSource>) {
        self.source = Some(source);
        self.parse_state = ParseState::Unparsed;
        self.image = Image::default();
        self.metadata = ContainerMetadata::default();
        self.gainmap_present = false;
        self.image_count = 0;
        self.image_index = -1;
    }

    pub fn parse_state(&self) -> ParseState {
        self.parse_state
    }

    /// Reads the container metadata. The image geometry and color properties become available
    /// through image() without any pixel. The gain map, if any, is reported by gainmap_present;
    /// its metadata is populated when enable_parsing_gainmap_metadata is set.
    pub fn parse(&mut self) -> AvifResult<()> {
        if self.parse_state != ParseState::Unparsed {
            return Ok(());
        }
        let settings = self.settings.clone();
        let Some(source) = self.source.as_deref_mut() else {
            return AvifError::io_not_set();
        };
        let metadata = source.metadata()?;
        if metadata.frame_count == 0 {
            return AvifError::no_content();
        }
        let color_grid = metadata.color.grid()?;
        check_limits(color_grid.width, color_grid.height, &settings)?;
        let mut image = metadata.color.image(color_grid.width, color_grid.height);

        let gainmap_present = metadata.tone_map.is_some();
        if let Some(tone_map) = &metadata.tone_map {
            let gainmap_grid = tone_map.gainmap.grid().map_err(|err| match err {
                AvifError::InvalidImageGrid(message) => {
                    AvifError::InvalidImageGrid(format!("gain map {message}"))
                }
                err => err,
            })?;
            check_limits(gainmap_grid.width, gainmap_grid.height, &settings)?;
            if settings.enable_parsing_gainmap_metadata || settings.enable_decoding_gainmap {
                let mut gainmap = GainMap::default();
                if settings.enable_parsing_gainmap_metadata {
                    gainmap.metadata = parse_tmap(&tone_map.metadata)?;
                    gainmap.alt_color_primaries = tone_map.alt_color_primaries;
                    gainmap.alt_transfer_characteristics = tone_map.alt_transfer_characteristics;
                    gainmap.alt_matrix_coefficients = tone_map.alt_matrix_coefficients;
                    gainmap.alt_yuv_range = tone_map.alt_yuv_range;
                    gainmap.alt_plane_count = tone_map.alt_plane_count;
                    gainmap.alt_plane_depth = tone_map.alt_plane_depth;
                    gainmap.alt_clli = tone_map.alt_clli;
                }
                if settings.enable_decoding_gainmap {
                    gainmap.image =
                        Some(tone_map.gainmap.image(gainmap_grid.width, gainmap_grid.height));
                }
                image.gainmap = Some(Box::new(gainmap));
            }
        }
        log::trace!(
            "parsed {}x{} image, {} frames, gain map present: {gainmap_present}",
            image.width,
            image.height,
            metadata.frame_count
        );

        self.image = image;
        self.image_count = metadata.frame_count;
        self.image_index = -1;
        self.gainmap_present = gainmap_present;
        self.metadata = metadata;
        self.parsed_settings = settings;
        self.parse_state = ParseState::HeaderParsed;
        Ok(())
    }

    /// Decodes the pixels of the next frame: the base image unless ignore_color_and_alpha is set
    /// and the gain map image if enable_decoding_gainmap is set and a gain map is present.
    pub fn next_image(&mut self) -> AvifResult<()> {
        self.parse()?;
        let settings = &self.parsed_settings;
        let decode_color = !settings.ignore_color_and_alpha;
        let decode_gainmap = settings.enable_decoding_gainmap && self.gainmap_present;
        if !decode_color && !decode_gainmap {
            log::debug!("neither the base image nor the gain map pixels were requested");
            return AvifError::no_content();
        }
        let next_image_index = self.image_index + 1;
        if next_image_index < 0 || next_image_index as u32 >= self.image_count {
            return AvifError::no_images_remaining();
        }
        let frame_index = next_image_index as u32;
        let Some(source) = self.source.as_deref_mut() else {
            return AvifError::io_not_set();
        };

        let color = if decode_color {
            let color_item = &self.metadata.color;
            let categories: &[Category] = if color_item.alpha_present {
                &[Category::Color, Category::Alpha]
            } else {
                &[Category::Color]
            };
            Some(decode_item(source, color_item, frame_index, categories)?)
        } else {
            None
        };
        let gainmap_image = match &self.metadata.tone_map {
            Some(tone_map) if decode_gainmap => Some(decode_item(
                source,
                &tone_map.gainmap,
                frame_index,
                &[Category::Gainmap],
            )?),
            _ => None,
        };

        if let Some(mut color) = color {
            color.gainmap = self.image.gainmap.take();
            self.image = color;
        }
        if let (Some(gainmap), Some(gainmap_image)) = (self.image.gainmap.as_mut(), gainmap_image)
        {
            gainmap.image = Some(gainmap_image);
        }
        self.image_index = next_image_index;
        self.parse_state = ParseState::PixelsDecoded;
        Ok(())
    }

    /// Decodes the frame at |index|. Every frame is independently coded.
    pub fn nth_image(&mut self, index: u32) -> AvifResult<()> {
        self.parse()?;
        if index >= self.image_count {
            return AvifError::no_images_remaining();
        }
        self.image_index = i32::try_from(index)
            .or(Err(AvifError::UnknownError("frame index overflow".into())))?
            - 1;
        self.next_image()
    }

    pub fn image(&self) -> &Image {
        &self.image
    }
}

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

use crate::gainmap::GainMap;
use crate::grid::Grid;
use crate::internal_utils::*;
use crate::utils::pixels::*;
use crate::*;

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Plane {
    Y = 0,
    U = 1,
    V = 2,
    A = 3,
}

impl From<usize> for Plane {
    fn from(plane: usize) -> Self {
        match plane {
            1 => Plane::U,
            2 => Plane::V,
            3 => Plane::A,
            _ => Plane::Y,
        }
    }
}

impl Plane {
    pub fn as_usize(&self) -> usize {
        match self {
            Plane::Y => 0,
            Plane::U => 1,
            Plane::V => 2,
            Plane::A => 3,
        }
    }

    fn is_chroma(&self) -> bool {
        matches!(self, Plane::U | Plane::V)
    }
}

pub const MAX_PLANE_COUNT: usize = 4;
pub const YUV_PLANES: [Plane; 3] = [Plane::Y, Plane::U, Plane::V];
pub const A_PLANE: [Plane; 1] = [Plane::A];
pub const ALL_PLANES: [Plane; MAX_PLANE_COUNT] = [Plane::Y, Plane::U, Plane::V, Plane::A];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum YuvRange {
    Limited = 0,
    #[default]
    Full = 1,
}

/// The shape of an image, without its samples. Grid cells are compared by descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub width: u32,
    pub height: u32,
    pub depth: u8,
    pub yuv_format: PixelFormat,
}

impl From<&Image> for ImageDescriptor {
    fn from(image: &Image) -> Self {
        Self {
            width: image.width,
            height: image.height,
            depth: image.depth,
            yuv_format: image.yuv_format,
        }
    }
}

#[derive(Debug, Default)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub depth: u8,

    pub yuv_format: PixelFormat,
    pub yuv_range: YuvRange,

    pub alpha_present: bool,

    pub row_bytes: [u32; MAX_PLANE_COUNT],
    pub planes: [Option<Pixels>; MAX_PLANE_COUNT],

    pub color_primaries: ColorPrimaries,
    pub transfer_characteristics: TransferCharacteristics,
    pub matrix_coefficients: MatrixCoefficients,

    pub clli: Option<ContentLightLevelInformation>,

    pub gainmap: Option<Box<GainMap>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaneData {
    pub width: u32,
    pub height: u32,
    pub row_bytes: u32,
    pub pixel_size: u32,
}

impl Image {
    pub fn descriptor(&self) -> ImageDescriptor {
        ImageDescriptor::from(self)
    }

    pub fn depth_valid(&self) -> bool {
        matches!(self.depth, 8 | 10 | 12 | 16)
    }

    pub fn max_channel(&self) -> u16 {
        ((1i32 << self.depth) - 1) as u16
    }

    pub fn max_channel_f(&self) -> f32 {
        self.max_channel() as f32
    }

    pub fn has_plane(&self, plane: Plane) -> bool {
        let plane_index = plane.as_usize();
        match &self.planes[plane_index] {
            Some(pixels) => self.row_bytes[plane_index] != 0 && pixels.has_data(),
            None => false,
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.has_plane(Plane::A)
    }

    pub fn width(&self, plane: Plane) -> u32 {
        match plane {
            Plane::Y | Plane::A => self.width,
            _ if self.yuv_format.is_monochrome() => 0,
            _ => self.yuv_format.apply_chroma_shift_x(self.width),
        }
    }

    pub fn height(&self, plane: Plane) -> u32 {
        match plane {
            Plane::Y | Plane::A => self.height,
            _ if self.yuv_format.is_monochrome() => 0,
            _ => self.yuv_format.apply_chroma_shift_y(self.height),
        }
    }

    pub fn plane_data(&self, plane: Plane) -> Option<PlaneData> {
        if !self.has_plane(plane) {
            return None;
        }
        Some(PlaneData {
            width: self.width(plane),
            height: self.height(plane),
            row_bytes: self.row_bytes[plane.as_usize()],
            pixel_size: if self.depth == 8 { 1 } else { 2 },
        })
    }

    fn pixels(&self, plane: Plane) -> AvifResult<&Pixels> {
        match &self.planes[plane.as_usize()] {
            Some(pixels) => Ok(pixels),
            None => AvifError::no_content(),
        }
    }

    fn pixels_mut(&mut self, plane: Plane) -> AvifResult<&mut Pixels> {
        match &mut self.planes[plane.as_usize()] {
            Some(pixels) => Ok(pixels),
            None => AvifError::no_content(),
        }
    }

    // Returns exactly width(plane) samples of the given row.
    pub fn row(&self, plane: Plane, row: u32) -> AvifResult<&[u8]> {
        let row_bytes = self.row_bytes[plane.as_usize()];
        let width = self.width(plane);
        self.pixels(plane)?
            .slice(checked_mul!(row, row_bytes)?, width)
    }

    pub fn row_mut(&mut self, plane: Plane, row: u32) -> AvifResult<&mut [u8]> {
        let row_bytes = self.row_bytes[plane.as_usize()];
        let width = self.width(plane);
        self.pixels_mut(plane)?
            .slice_mut(checked_mul!(row, row_bytes)?, width)
    }

    pub fn row16(&self, plane: Plane, row: u32) -> AvifResult<&[u16]> {
        let row_bytes = self.row_bytes[plane.as_usize()];
        let width = self.width(plane);
        self.pixels(plane)?
            .slice16(checked_mul!(row, row_bytes / 2)?, width)
    }

    pub fn row16_mut(&mut self, plane: Plane, row: u32) -> AvifResult<&mut [u16]> {
        let row_bytes = self.row_bytes[plane.as_usize()];
        let width = self.width(plane);
        self.pixels_mut(plane)?
            .slice16_mut(checked_mul!(row, row_bytes / 2)?, width)
    }

    pub fn allocate_planes(&mut self, category: Category) -> AvifResult<()> {
        if !self.depth_valid() {
            return AvifError::unsupported_depth();
        }
        if self.width == 0 || self.height == 0 || self.yuv_format == PixelFormat::None {
            return AvifError::invalid_argument();
        }
        let pixel_size: u32 = if self.depth == 8 { 1 } else { 2 };
        for plane in category.planes() {
            let plane = *plane;
            let plane_index = plane.as_usize();
            let width = self.width(plane);
            let height = self.height(plane);
            if width == 0 {
                // Monochrome images have no chroma planes.
                self.planes[plane_index] = None;
                self.row_bytes[plane_index] = 0;
                continue;
            }
            let plane_size = usize_from_u32(checked_mul!(width, height)?)?;
            let default_value = if plane == Plane::A { self.max_channel() } else { 0 };
            self.planes[plane_index] = Some(Pixels::create(self.depth, plane_size, default_value)?);
            self.row_bytes[plane_index] = checked_mul!(width, pixel_size)?;
        }
        if category == Category::Alpha {
            self.alpha_present = true;
        }
        Ok(())
    }

    pub fn has_same_properties(&self, other: &Image) -> bool {
        self.descriptor() == other.descriptor()
    }

    pub fn has_same_cicp(&self, other: &Image) -> bool {
        self.color_primaries == other.color_primaries
            && self.transfer_characteristics == other.transfer_characteristics
            && self.matrix_coefficients == other.matrix_coefficients
            && self.yuv_range == other.yuv_range
    }

    /// Copies everything except the samples and the gain map.
    pub fn shallow_clone(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
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

    pub fn try_clone(&self) -> AvifResult<Self> {
        let mut image = self.shallow_clone();
        for plane in ALL_PLANES {
            let plane_index = plane.as_usize();
            if let Some(pixels) = &self.planes[plane_index] {
                image.planes[plane_index] = Some(pixels.try_clone()?);
                image.row_bytes[plane_index] = self.row_bytes[plane_index];
            }
        }
        if let Some(gainmap) = &self.gainmap {
            image.gainmap = Some(Box::new(gainmap.try_clone()?));
        }
        Ok(image)
    }

    pub(crate) fn copy_from_tile(
        &mut self,
        tile: &Image,
        grid: &Grid,
        index: u32,
        category: Category,
    ) -> AvifResult<()> {
        let row_index = index / grid.columns;
        let column_index = index % grid.columns;
        for plane in category.planes() {
            let plane = *plane;
            let Some(src_plane) = tile.plane_data(plane) else {
                continue;
            };
            let dst_plane = self.plane_data(plane).ok_or(AvifError::NoContent)?;
            let (shift_x, shift_y) = if plane.is_chroma() {
                (
                    self.yuv_format.chroma_shift_x(),
                    self.yuv_format.chroma_shift_y(),
                )
            } else {
                (0, 0)
            };
            let dst_x = checked_mul!(column_index, tile.width)? >> shift_x;
            let dst_y = checked_mul!(row_index, tile.height)? >> shift_y;
            if dst_x >= dst_plane.width || dst_y >= dst_plane.height {
                return AvifError::invalid_image_grid(format!(
                    "cell {index} does not fit in the {}x{} image",
                    self.width, self.height
                ));
            }
            let copy_width = usize_from_u32(src_plane.width.min(dst_plane.width - dst_x))?;
            let copy_height = src_plane.height.min(dst_plane.height - dst_y);
            let dst_x = usize_from_u32(dst_x)?;
            for y in 0..copy_height {
                if self.depth == 8 {
                    let src_row = &tile.row(plane, y)?[..copy_width];
                    let dst_row = self.row_mut(plane, dst_y + y)?;
                    dst_row[dst_x..dst_x + copy_width].copy_from_slice(src_row);
                } else {
                    let src_row = &tile.row16(plane, y)?[..copy_width];
                    let dst_row = self.row16_mut(plane, dst_y + y)?;
                    dst_row[dst_x..dst_x + copy_width].copy_from_slice(src_row);
                }
            }
        }
        Ok(())
    }

    // Reads the samples of one row as unnormalized floats.
    pub(crate) fn read_row_f32(&self, plane: Plane, y: u32, out: &mut [f32]) -> AvifResult<()> {
        if self.depth == 8 {
            for (dst, src) in out.iter_mut().zip(self.row(plane, y)?) {
                *dst = *src as f32;
            }
        } else {
            for (dst, src) in out.iter_mut().zip(self.row16(plane, y)?) {
                *dst = *src as f32;
            }
        }
        Ok(())
    }

    pub(crate) fn write_row_u16(&mut self, plane: Plane, y: u32, values: &[u16]) -> AvifResult<()> {
        if self.depth == 8 {
            for (dst, src) in self.row_mut(plane, y)?.iter_mut().zip(values) {
                *dst = *src as u8;
            }
        } else {
            self.row16_mut(plane, y)?.copy_from_slice(values);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn new_image(width: u32, height: u32, depth: u8, yuv_format: PixelFormat) -> Image {
        Image {
            width,
            height,
            depth,
            yuv_format,
            ..Default::default()
        }
    }

    #[test_case(PixelFormat::Yuv444, 5, 3, 5, 3)]
    #[test_case(PixelFormat::Yuv422, 5, 3, 3, 3)]
    #[test_case(PixelFormat::Yuv420, 5, 3, 3, 2)]
    #[test_case(PixelFormat::Yuv400, 5, 3, 0, 0)]
    fn chroma_plane_sizes(
        yuv_format: PixelFormat,
        width: u32,
        height: u32,
        chroma_width: u32,
        chroma_height: u32,
    ) {
        let image = new_image(width, height, 8, yuv_format);
        assert_eq!(image.width(Plane::Y), width);
        assert_eq!(image.height(Plane::A), height);
        assert_eq!(image.width(Plane::U), chroma_width);
        assert_eq!(image.height(Plane::V), chroma_height);
    }

    #[test]
    fn allocate_planes() -> AvifResult<()> {
        let mut image = new_image(4, 2, 10, PixelFormat::Yuv400);
        image.allocate_planes(Category::Color)?;
        assert!(image.has_plane(Plane::Y));
        assert!(!image.has_plane(Plane::U));
        assert!(!image.has_alpha());
        assert_eq!(image.row_bytes[0], 8);
        image.allocate_planes(Category::Alpha)?;
        assert!(image.has_alpha());
        assert_eq!(image.row16(Plane::A, 1)?, &[1023; 4]);

        let mut image = new_image(4, 2, 9, PixelFormat::Yuv444);
        assert_eq!(
            image.allocate_planes(Category::Color),
            Err(AvifError::UnsupportedDepth)
        );
        Ok(())
    }

    #[test]
    fn row_access_checks_depth() -> AvifResult<()> {
        let mut image = new_image(3, 2, 8, PixelFormat::Yuv420);
        image.allocate_planes(Category::Color)?;
        image.row_mut(Plane::U, 0)?[1] = 200;
        assert_eq!(image.row(Plane::U, 0)?, &[0, 200]);
        assert!(image.row16(Plane::Y, 0).is_err());
        assert!(image.row(Plane::Y, 2).is_err());
        assert!(image.row(Plane::A, 0).is_err());
        Ok(())
    }

    #[test]
    fn copy_from_tile_places_cells() -> AvifResult<()> {
        let grid = Grid {
            rows: 2,
            columns: 2,
            width: 4,
            height: 4,
        };
        let mut dst = new_image(4, 4, 12, PixelFormat::Yuv420);
        dst.allocate_planes(Category::Color)?;
        for index in 0..4u32 {
            let mut tile = new_image(2, 2, 12, PixelFormat::Yuv420);
            tile.allocate_planes(Category::Color)?;
            for plane in YUV_PLANES {
                for y in 0..tile.height(plane) {
                    tile.row16_mut(plane, y)?.fill(index as u16 + 1);
                }
            }
            dst.copy_from_tile(&tile, &grid, index, Category::Color)?;
        }
        assert_eq!(dst.row16(Plane::Y, 0)?, &[1, 1, 2, 2]);
        assert_eq!(dst.row16(Plane::Y, 3)?, &[3, 3, 4, 4]);
        assert_eq!(dst.row16(Plane::U, 0)?, &[1, 2]);
        assert_eq!(dst.row16(Plane::V, 1)?, &[3, 4]);
        Ok(())
    }

    #[test]
    fn try_clone_is_deep() -> AvifResult<()> {
        let mut image = new_image(2, 2, 8, PixelFormat::Yuv444);
        image.clli = Some(ContentLightLevelInformation {
            max_cll: 10,
            max_pall: 5,
        });
        image.allocate_planes(Category::Color)?;
        let clone = image.try_clone()?;
        image.row_mut(Plane::Y, 0)?[0] = 9;
        assert_eq!(clone.row(Plane::Y, 0)?, &[0, 0]);
        assert_eq!(clone.clli, image.clli);
        assert!(clone.has_same_properties(&image));
        assert!(clone.has_same_cicp(&image));
        Ok(())
    }
}

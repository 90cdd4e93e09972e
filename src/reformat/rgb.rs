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

use super::rgb_impl;

use crate::image::Plane;
use crate::internal_utils::*;
use crate::utils::pixels::*;
use crate::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    Rgb,
    #[default]
    Rgba,
    Argb,
    Bgr,
    Bgra,
    Abgr,
}

impl Format {
    pub(crate) fn offsets(&self) -> [usize; 4] {
        match self {
            Format::Rgb => [0, 1, 2, 0],
            Format::Rgba => [0, 1, 2, 3],
            Format::Argb => [1, 2, 3, 0],
            Format::Bgr => [2, 1, 0, 0],
            Format::Bgra => [2, 1, 0, 3],
            Format::Abgr => [3, 2, 1, 0],
        }
    }

    pub fn r_offset(&self) -> usize {
        self.offsets()[0]
    }

    pub fn g_offset(&self) -> usize {
        self.offsets()[1]
    }

    pub fn b_offset(&self) -> usize {
        self.offsets()[2]
    }

    pub fn alpha_offset(&self) -> usize {
        self.offsets()[3]
    }

    pub fn has_alpha(&self) -> bool {
        !matches!(self, Format::Rgb | Format::Bgr)
    }

    pub fn channel_count(&self) -> u32 {
        if self.has_alpha() {
            4
        } else {
            3
        }
    }
}

/// An interleaved RGB(A) image.
#[derive(Debug, Default)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub depth: u8,
    pub format: Format,
    pub pixels: Option<Pixels>,
    pub row_bytes: u32,
}

impl Image {
    pub fn max_channel(&self) -> u16 {
        ((1i32 << self.depth) - 1) as u16
    }

    pub(crate) fn max_channel_f(&self) -> f32 {
        self.max_channel() as f32
    }

    pub fn create_from_yuv(image: &image::Image) -> Self {
        Self {
            width: image.width,
            height: image.height,
            depth: image.depth,
            format: Format::Rgba,
            pixels: None,
            row_bytes: 0,
        }
    }

    pub fn row(&self, row: u32) -> AvifResult<&[u8]> {
        self.pixels
            .as_ref()
            .ok_or(AvifError::NoContent)?
            .slice(checked_mul!(row, self.row_bytes)?, self.row_bytes)
    }

    pub fn row_mut(&mut self, row: u32) -> AvifResult<&mut [u8]> {
        self.pixels
            .as_mut()
            .ok_or(AvifError::NoContent)?
            .slice_mut(checked_mul!(row, self.row_bytes)?, self.row_bytes)
    }

    pub fn row16(&self, row: u32) -> AvifResult<&[u16]> {
        self.pixels
            .as_ref()
            .ok_or(AvifError::NoContent)?
            .slice16(checked_mul!(row, self.row_bytes / 2)?, self.row_bytes / 2)
    }

    pub fn row16_mut(&mut self, row: u32) -> AvifResult<&mut [u16]> {
        self.pixels
            .as_mut()
            .ok_or(AvifError::NoContent)?
            .slice16_mut(checked_mul!(row, self.row_bytes / 2)?, self.row_bytes / 2)
    }

    pub fn allocate(&mut self) -> AvifResult<()> {
        if !self.depth_valid() || self.width == 0 || self.height == 0 {
            return AvifError::reformat_failed();
        }
        let row_bytes = checked_mul!(self.width, self.pixel_size())?;
        let sample_count = checked_mul!(row_bytes / self.channel_size(), self.height)?;
        self.pixels = Some(Pixels::create(self.depth, usize_from_u32(sample_count)?, 0)?);
        self.row_bytes = row_bytes;
        Ok(())
    }

    pub(crate) fn depth_valid(&self) -> bool {
        matches!(self.depth, 8 | 10 | 12 | 16)
    }

    pub fn has_alpha(&self) -> bool {
        self.format.has_alpha()
    }

    pub(crate) fn channel_size(&self) -> u32 {
        if self.depth > 8 {
            2
        } else {
            1
        }
    }

    pub fn channel_count(&self) -> u32 {
        self.format.channel_count()
    }

    pub(crate) fn pixel_size(&self) -> u32 {
        self.channel_size() * self.channel_count()
    }

    pub(crate) fn ensure_allocated(&mut self) -> AvifResult<()> {
        let expected_row_bytes = checked_mul!(self.width, self.pixel_size())?;
        let allocated = match &self.pixels {
            Some(pixels) => {
                self.row_bytes == expected_row_bytes
                    && pixels.size()
                        >= usize_from_u32(checked_mul!(
                            self.row_bytes / self.channel_size(),
                            self.height
                        )?)?
            }
            None => false,
        };
        if !allocated {
            self.allocate()?;
        }
        Ok(())
    }

    /// Reads every pixel as (R, G, B) normalized to [0, 1], in row major order.
    pub(crate) fn read_f32(&self) -> AvifResult<Vec<[f32; 3]>> {
        let width = usize_from_u32(self.width)?;
        let pixel_count = checked_mul!(width, usize_from_u32(self.height)?)?;
        let mut rgb = try_vec(pixel_count, [0.0f32; 3])?;
        let offsets = self.format.offsets();
        let channel_count = self.channel_count() as usize;
        let max_channel = self.max_channel_f();
        for y in 0..self.height {
            let dst = &mut rgb[y as usize * width..(y as usize + 1) * width];
            if self.depth == 8 {
                let row = self.row(y)?;
                for (x, pixel) in dst.iter_mut().enumerate() {
                    let src = &row[x * channel_count..];
                    for c in 0..3 {
                        pixel[c] = src[offsets[c]] as f32 / max_channel;
                    }
                }
            } else {
                let row = self.row16(y)?;
                for (x, pixel) in dst.iter_mut().enumerate() {
                    let src = &row[x * channel_count..];
                    for c in 0..3 {
                        pixel[c] = src[offsets[c]] as f32 / max_channel;
                    }
                }
            }
        }
        Ok(rgb)
    }

    /// Writes (R, G, B) values in [0, 1], in row major order. Alpha samples are left untouched.
    pub(crate) fn write_f32(&mut self, rgb: &[[f32; 3]]) -> AvifResult<()> {
        let width = usize_from_u32(self.width)?;
        if rgb.len() != checked_mul!(width, usize_from_u32(self.height)?)? {
            return AvifError::reformat_failed();
        }
        let offsets = self.format.offsets();
        let channel_count = self.channel_count() as usize;
        let max_channel = self.max_channel_f();
        for y in 0..self.height {
            let src = &rgb[y as usize * width..(y as usize + 1) * width];
            if self.depth == 8 {
                let row = self.row_mut(y)?;
                for (x, pixel) in src.iter().enumerate() {
                    let dst = &mut row[x * channel_count..];
                    for c in 0..3 {
                        dst[offsets[c]] = quantize(pixel[c], max_channel) as u8;
                    }
                }
            } else {
                let row = self.row16_mut(y)?;
                for (x, pixel) in src.iter().enumerate() {
                    let dst = &mut row[x * channel_count..];
                    for c in 0..3 {
                        dst[offsets[c]] = quantize(pixel[c], max_channel);
                    }
                }
            }
        }
        Ok(())
    }

    /// Fills the alpha channel from the alpha plane of |image|, or with opaque values if it has
    /// none.
    pub(crate) fn import_alpha_from(&mut self, image: &image::Image) -> AvifResult<()> {
        if !self.has_alpha() {
            return Ok(());
        }
        let alpha_offset = self.format.alpha_offset();
        let channel_count = self.channel_count() as usize;
        let max_channel = self.max_channel();
        let width = usize_from_u32(self.width)?;
        let mut alpha = try_vec(width, 0.0f32)?;
        for y in 0..self.height {
            if image.has_alpha() {
                image.read_row_f32(Plane::A, y, &mut alpha)?;
                let scale = self.max_channel_f() / image.max_channel_f();
                alpha.iter_mut().for_each(|a| *a = (*a * scale).round());
            } else {
                alpha.fill(max_channel as f32);
            }
            if self.depth == 8 {
                let row = self.row_mut(y)?;
                for (x, a) in alpha.iter().enumerate() {
                    row[x * channel_count + alpha_offset] = *a as u8;
                }
            } else {
                let row = self.row16_mut(y)?;
                for (x, a) in alpha.iter().enumerate() {
                    row[x * channel_count + alpha_offset] = *a as u16;
                }
            }
        }
        Ok(())
    }

    fn export_alpha_to(&self, image: &mut image::Image) -> AvifResult<()> {
        image.allocate_planes(Category::Alpha)?;
        let alpha_offset = self.format.alpha_offset();
        let channel_count = self.channel_count() as usize;
        let scale = image.max_channel_f() / self.max_channel_f();
        let width = usize_from_u32(self.width)?;
        let mut alpha = try_vec(width, 0u16)?;
        for y in 0..self.height {
            if self.depth == 8 {
                let row = self.row(y)?;
                for (x, a) in alpha.iter_mut().enumerate() {
                    *a = (row[x * channel_count + alpha_offset] as f32 * scale).round() as u16;
                }
            } else {
                let row = self.row16(y)?;
                for (x, a) in alpha.iter_mut().enumerate() {
                    *a = (row[x * channel_count + alpha_offset] as f32 * scale).round() as u16;
                }
            }
            image.write_row_u16(Plane::A, y, &alpha)?;
        }
        Ok(())
    }

    /// Converts the samples of |image| into this RGB image, allocating it if needed. The
    /// dimensions are taken from |image|, the depth and format of this image are kept.
    pub fn convert_from_yuv(&mut self, image: &image::Image) -> AvifResult<()> {
        if !image.has_plane(Plane::Y) || !image.depth_valid() || !self.depth_valid() {
            return AvifError::reformat_failed();
        }
        self.width = image.width;
        self.height = image.height;
        self.ensure_allocated()?;
        let rgb = rgb_impl::yuv_to_rgb_f32(image)?;
        self.write_f32(&rgb)?;
        self.import_alpha_from(image)
    }

    /// Converts this RGB image into |image|. The depth, pixel format, range and matrix
    /// coefficients of |image| must be set by the caller. Its planes are (re)allocated.
    pub fn convert_to_yuv(&self, image: &mut image::Image) -> AvifResult<()> {
        if !self.depth_valid() || !image.depth_valid() || self.pixels.is_none() {
            return AvifError::reformat_failed();
        }
        image.width = self.width;
        image.height = self.height;
        image.allocate_planes(Category::Color)?;
        let rgb = self.read_f32()?;
        rgb_impl::rgb_f32_to_yuv(&rgb, image)?;
        if self.has_alpha() {
            self.export_alpha_to(image)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::YuvRange;
    use test_case::test_case;

    fn gradient(width: u32, height: u32, depth: u8, format: Format) -> Image {
        let mut rgb = Image {
            width,
            height,
            depth,
            format,
            ..Default::default()
        };
        rgb.allocate().unwrap();
        let max_channel = rgb.max_channel() as u32;
        let channel_count = rgb.channel_count() as usize;
        for y in 0..height {
            for x in 0..width as usize {
                let values = [
                    (x as u32 * max_channel) / width,
                    (y * max_channel) / height,
                    ((x as u32 + y) * max_channel) / (width + height),
                    max_channel - x as u32,
                ];
                for c in 0..channel_count {
                    let offset = x * channel_count + format.offsets()[c];
                    if depth == 8 {
                        rgb.row_mut(y).unwrap()[offset] = values[c] as u8;
                    } else {
                        rgb.row16_mut(y).unwrap()[offset] = values[c] as u16;
                    }
                }
            }
        }
        rgb
    }

    #[test_case(Format::Rgb, 3)]
    #[test_case(Format::Bgra, 4)]
    #[test_case(Format::Abgr, 4)]
    fn channel_count(format: Format, count: u32) {
        assert_eq!(format.channel_count(), count);
        let rgb = Image {
            width: 2,
            depth: 10,
            format,
            ..Default::default()
        };
        assert_eq!(rgb.pixel_size(), count * 2);
    }

    #[test_case(Format::Rgba, 8)]
    #[test_case(Format::Bgr, 8)]
    #[test_case(Format::Argb, 10)]
    #[test_case(Format::Rgb, 12)]
    fn identity_round_trip_is_lossless(format: Format, depth: u8) -> AvifResult<()> {
        let rgb = gradient(13, 7, depth, format);
        let mut yuv = image::Image {
            depth,
            yuv_format: PixelFormat::Yuv444,
            matrix_coefficients: MatrixCoefficients::Identity,
            ..Default::default()
        };
        rgb.convert_to_yuv(&mut yuv)?;
        assert_eq!(yuv.has_alpha(), format.has_alpha());
        let mut decoded = Image {
            depth,
            format,
            ..Default::default()
        };
        decoded.convert_from_yuv(&yuv)?;
        for y in 0..rgb.height {
            if depth == 8 {
                assert_eq!(decoded.row(y)?, rgb.row(y)?);
            } else {
                assert_eq!(decoded.row16(y)?, rgb.row16(y)?);
            }
        }
        Ok(())
    }

    #[test_case(PixelFormat::Yuv444, YuvRange::Full, 3)]
    #[test_case(PixelFormat::Yuv444, YuvRange::Limited, 4)]
    #[test_case(PixelFormat::Yuv420, YuvRange::Full, 20)]
    #[test_case(PixelFormat::Yuv422, YuvRange::Limited, 20)]
    fn matrix_round_trip_is_close(
        yuv_format: PixelFormat,
        yuv_range: YuvRange,
        tolerance: i32,
    ) -> AvifResult<()> {
        let rgb = gradient(16, 16, 8, Format::Rgb);
        let mut yuv = image::Image {
            depth: 8,
            yuv_format,
            yuv_range,
            matrix_coefficients: MatrixCoefficients::Bt709,
            ..Default::default()
        };
        rgb.convert_to_yuv(&mut yuv)?;
        let mut decoded = Image {
            depth: 8,
            format: Format::Rgb,
            ..Default::default()
        };
        decoded.convert_from_yuv(&yuv)?;
        for y in 0..16 {
            for (a, b) in decoded.row(y)?.iter().zip(rgb.row(y)?) {
                assert!((*a as i32 - *b as i32).abs() <= tolerance, "{a} vs {b}");
            }
        }
        Ok(())
    }

    #[test]
    fn gray_becomes_monochrome() -> AvifResult<()> {
        let mut rgb = Image {
            width: 4,
            height: 2,
            depth: 8,
            format: Format::Rgb,
            ..Default::default()
        };
        rgb.allocate()?;
        rgb.row_mut(1)?.fill(128);
        let mut yuv = image::Image {
            depth: 8,
            yuv_format: PixelFormat::Yuv400,
            ..Default::default()
        };
        rgb.convert_to_yuv(&mut yuv)?;
        assert!(!yuv.has_plane(Plane::U));
        assert_eq!(yuv.row(Plane::Y, 0)?, &[0; 4]);
        assert_eq!(yuv.row(Plane::Y, 1)?, &[128; 4]);
        Ok(())
    }

    #[test]
    fn opaque_alpha_is_added() -> AvifResult<()> {
        let mut yuv = image::Image {
            width: 2,
            height: 2,
            depth: 10,
            yuv_format: PixelFormat::Yuv444,
            ..Default::default()
        };
        yuv.allocate_planes(Category::Color)?;
        let mut rgb = Image {
            depth: 8,
            format: Format::Argb,
            ..Default::default()
        };
        rgb.convert_from_yuv(&yuv)?;
        assert_eq!(rgb.row(0)?[0], 255);
        assert_eq!(rgb.row(1)?[4], 255);
        Ok(())
    }

    #[test]
    fn unsupported_matrix() {
        let rgb = gradient(4, 4, 8, Format::Rgb);
        let mut yuv = image::Image {
            depth: 8,
            yuv_format: PixelFormat::Yuv444,
            matrix_coefficients: MatrixCoefficients::Ictcp,
            ..Default::default()
        };
        assert_eq!(rgb.convert_to_yuv(&mut yuv), Err(AvifError::NotImplemented));
        yuv.matrix_coefficients = MatrixCoefficients::Identity;
        yuv.yuv_format = PixelFormat::Yuv420;
        assert_eq!(rgb.convert_to_yuv(&mut yuv), Err(AvifError::NotImplemented));
    }
}

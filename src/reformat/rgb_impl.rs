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

use super::coeffs::*;

use crate::image;
use crate::image::Plane;
use crate::image::YuvRange;
use crate::internal_utils::*;
use crate::utils::pixels::*;
use crate::*;

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    YuvCoefficients,
    Identity,
    Monochrome,
}

struct YuvColorSpaceInfo {
    kr: f32,
    kg: f32,
    kb: f32,
    max_channel: f32,
    bias_y: f32,
    bias_uv: f32,
    range_y: f32,
    range_uv: f32,
    mode: Mode,
}

impl YuvColorSpaceInfo {
    fn create_from(image: &image::Image) -> AvifResult<Self> {
        if !image.depth_valid() {
            return AvifError::reformat_failed();
        }
        match image.matrix_coefficients {
            MatrixCoefficients::Ycgco
            | MatrixCoefficients::YcgcoRe
            | MatrixCoefficients::YcgcoRo
            | MatrixCoefficients::Bt2020Cl
            | MatrixCoefficients::Smpte2085
            | MatrixCoefficients::ChromaDerivedCl
            | MatrixCoefficients::Ictcp => return AvifError::not_implemented(),
            _ => {}
        }
        let mode = if image.yuv_format.is_monochrome() {
            Mode::Monochrome
        } else if image.matrix_coefficients == MatrixCoefficients::Identity {
            if image.yuv_format != PixelFormat::Yuv444 {
                return AvifError::not_implemented();
            }
            Mode::Identity
        } else {
            Mode::YuvCoefficients
        };
        let [kr, kg, kb] = calculate_yuv_coefficients(image.matrix_coefficients);
        let max_channel = image.max_channel_f();
        let limited = image.yuv_range == YuvRange::Limited;
        let depth_shift = image.depth - 8;
        Ok(Self {
            kr,
            kg,
            kb,
            max_channel,
            bias_y: if limited { (16u32 << depth_shift) as f32 } else { 0.0 },
            bias_uv: (1u32 << (image.depth - 1)) as f32,
            range_y: if limited { (219u32 << depth_shift) as f32 } else { max_channel },
            range_uv: if limited { (224u32 << depth_shift) as f32 } else { max_channel },
            mode,
        })
    }

    fn luma(&self, rgb: &[f32; 3]) -> f32 {
        self.kr * rgb[0] + self.kg * rgb[1] + self.kb * rgb[2]
    }

    fn to_code(&self, value: f32, bias: f32, range: f32) -> u16 {
        (value * range + bias).round().clamp(0.0, self.max_channel) as u16
    }
}

/// Converts the color planes of |image| to (R, G, B) values in [0, 1], in row major order.
/// Subsampled chroma is upsampled by replication.
pub(crate) fn yuv_to_rgb_f32(image: &image::Image) -> AvifResult<Vec<[f32; 3]>> {
    let info = YuvColorSpaceInfo::create_from(image)?;
    let width = usize_from_u32(image.width)?;
    let pixel_count = checked_mul!(width, usize_from_u32(image.height)?)?;
    let mut rgb = try_vec(pixel_count, [0.0f32; 3])?;
    let chroma_width = usize_from_u32(image.width(Plane::U))?;
    let shift_x = image.yuv_format.chroma_shift_x();
    let shift_y = image.yuv_format.chroma_shift_y();
    let mut y_row = try_vec(width, 0.0f32)?;
    let mut u_row = try_vec(chroma_width, 0.0f32)?;
    let mut v_row = try_vec(chroma_width, 0.0f32)?;
    for y in 0..image.height {
        image.read_row_f32(Plane::Y, y, &mut y_row)?;
        if info.mode != Mode::Monochrome {
            image.read_row_f32(Plane::U, y >> shift_y, &mut u_row)?;
            image.read_row_f32(Plane::V, y >> shift_y, &mut v_row)?;
        }
        let dst = &mut rgb[y as usize * width..(y as usize + 1) * width];
        for (x, pixel) in dst.iter_mut().enumerate() {
            let luma = (y_row[x] - info.bias_y) / info.range_y;
            let uv_x = x >> shift_x;
            *pixel = match info.mode {
                Mode::Monochrome => [luma; 3],
                Mode::Identity => [
                    (v_row[uv_x] - info.bias_y) / info.range_y,
                    luma,
                    (u_row[uv_x] - info.bias_y) / info.range_y,
                ],
                Mode::YuvCoefficients => {
                    let cb = (u_row[uv_x] - info.bias_uv) / info.range_uv;
                    let cr = (v_row[uv_x] - info.bias_uv) / info.range_uv;
                    let r = luma + 2.0 * (1.0 - info.kr) * cr;
                    let b = luma + 2.0 * (1.0 - info.kb) * cb;
                    let g = (luma - info.kr * r - info.kb * b) / info.kg;
                    [r, g, b]
                }
            };
            for channel in pixel.iter_mut() {
                *channel = channel.clamp(0.0, 1.0);
            }
        }
    }
    Ok(rgb)
}

/// Writes (R, G, B) values in [0, 1], in row major order, into the allocated color planes of
/// |image|. Subsampled chroma is the average of the covered pixels.
pub(crate) fn rgb_f32_to_yuv(rgb: &[[f32; 3]], image: &mut image::Image) -> AvifResult<()> {
    let info = YuvColorSpaceInfo::create_from(image)?;
    let width = usize_from_u32(image.width)?;
    let height = usize_from_u32(image.height)?;
    if rgb.len() != checked_mul!(width, height)? {
        return AvifError::reformat_failed();
    }
    let mut y_row = try_vec(width, 0u16)?;
    for y in 0..height {
        let src = &rgb[y * width..(y + 1) * width];
        for (x, pixel) in src.iter().enumerate() {
            let luma = if info.mode == Mode::Identity { pixel[1] } else { info.luma(pixel) };
            y_row[x] = info.to_code(luma, info.bias_y, info.range_y);
        }
        image.write_row_u16(Plane::Y, u32_from_usize(y)?, &y_row)?;
    }
    if info.mode == Mode::Monochrome {
        return Ok(());
    }
    let chroma_width = usize_from_u32(image.width(Plane::U))?;
    let chroma_height = image.height(Plane::U);
    let shift_x = image.yuv_format.chroma_shift_x();
    let shift_y = image.yuv_format.chroma_shift_y();
    let mut u_row = try_vec(chroma_width, 0u16)?;
    let mut v_row = try_vec(chroma_width, 0u16)?;
    for uv_y in 0..chroma_height {
        let y_start = usize_from_u32(uv_y << shift_y)?;
        let y_end = usize_from_u32((uv_y + 1) << shift_y)?.min(height);
        for uv_x in 0..chroma_width {
            let x_start = uv_x << shift_x;
            let x_end = ((uv_x + 1) << shift_x).min(width);
            let mut sum = [0.0f32; 3];
            for row in rgb[y_start * width..y_end * width].chunks_exact(width) {
                for pixel in &row[x_start..x_end] {
                    for c in 0..3 {
                        sum[c] += pixel[c];
                    }
                }
            }
            let count = ((y_end - y_start) * (x_end - x_start)) as f32;
            let average = sum.map(|x| x / count);
            if info.mode == Mode::Identity {
                u_row[uv_x] = info.to_code(average[2], info.bias_y, info.range_y);
                v_row[uv_x] = info.to_code(average[0], info.bias_y, info.range_y);
            } else {
                let luma = info.luma(&average);
                let cb = (average[2] - luma) / (2.0 * (1.0 - info.kb));
                let cr = (average[0] - luma) / (2.0 * (1.0 - info.kr));
                u_row[uv_x] = info.to_code(cb, info.bias_uv, info.range_uv);
                v_row[uv_x] = info.to_code(cr, info.bias_uv, info.range_uv);
            }
        }
        image.write_row_u16(Plane::U, uv_y, &u_row)?;
        image.write_row_u16(Plane::V, uv_y, &v_row)?;
    }
    Ok(())
}

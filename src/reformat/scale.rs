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

use crate::image::*;
use crate::internal_utils::*;
use crate::utils::pixels::*;
use crate::*;

// Source taps and weights contributing to one destination sample.
type Taps = Vec<(usize, f32)>;

// Box filter when shrinking, bilinear interpolation of sample centers when enlarging.
fn axis_taps(src_len: usize, dst_len: usize) -> AvifResult<Vec<Taps>> {
    let mut taps: Vec<Taps> = Vec::new();
    taps.try_reserve_exact(dst_len)
        .or(Err(AvifError::OutOfMemory))?;
    let ratio = src_len as f64 / dst_len as f64;
    for i in 0..dst_len {
        if src_len == dst_len {
            taps.push(vec![(i, 1.0)]);
        } else if src_len > dst_len {
            let start = i as f64 * ratio;
            let end = start + ratio;
            let mut weights = Vec::new();
            let mut j = start.floor() as usize;
            while (j as f64) < end && j < src_len {
                let coverage = (end.min(j as f64 + 1.0) - start.max(j as f64)) as f32;
                if coverage > 0.0 {
                    weights.push((j, coverage / ratio as f32));
                }
                j += 1;
            }
            taps.push(weights);
        } else {
            let center = ((i as f64 + 0.5) * ratio - 0.5).clamp(0.0, (src_len - 1) as f64);
            let left = center.floor() as usize;
            let right = (left + 1).min(src_len - 1);
            let fraction = (center - left as f64) as f32;
            taps.push(vec![(left, 1.0 - fraction), (right, fraction)]);
        }
    }
    Ok(taps)
}

/// Resamples an interleaved buffer of |channels| samples per pixel.
pub(crate) fn scale_f32(
    src: &[f32],
    channels: usize,
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> AvifResult<Vec<f32>> {
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return AvifError::invalid_argument();
    }
    let src_width = usize_from_u32(src_width)?;
    let src_height = usize_from_u32(src_height)?;
    let dst_width = usize_from_u32(dst_width)?;
    let dst_height = usize_from_u32(dst_height)?;
    if src.len() != checked_mul!(checked_mul!(src_width, src_height)?, channels)? {
        return AvifError::invalid_argument();
    }
    let horizontal = axis_taps(src_width, dst_width)?;
    let vertical = axis_taps(src_height, dst_height)?;

    // Horizontal pass: src_height rows of dst_width pixels.
    let mut tmp = try_vec(
        checked_mul!(checked_mul!(dst_width, src_height)?, channels)?,
        0.0f32,
    )?;
    for y in 0..src_height {
        let src_row = &src[y * src_width * channels..(y + 1) * src_width * channels];
        let dst_row = &mut tmp[y * dst_width * channels..(y + 1) * dst_width * channels];
        for (x, taps) in horizontal.iter().enumerate() {
            for c in 0..channels {
                dst_row[x * channels + c] = taps
                    .iter()
                    .map(|(j, weight)| src_row[j * channels + c] * weight)
                    .sum();
            }
        }
    }

    // Vertical pass.
    let row_len = dst_width * channels;
    let mut dst = try_vec(checked_mul!(row_len, dst_height)?, 0.0f32)?;
    for (y, taps) in vertical.iter().enumerate() {
        let dst_row = &mut dst[y * row_len..(y + 1) * row_len];
        for (j, weight) in taps {
            let tmp_row = &tmp[j * row_len..(j + 1) * row_len];
            for (d, s) in dst_row.iter_mut().zip(tmp_row) {
                *d += s * weight;
            }
        }
    }
    Ok(dst)
}

pub(crate) fn scale_rgb_f32(
    rgb: &[[f32; 3]],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> AvifResult<Vec<[f32; 3]>> {
    if src_width == dst_width && src_height == dst_height {
        let mut copy = Vec::new();
        copy.try_reserve_exact(rgb.len())
            .or(Err(AvifError::OutOfMemory))?;
        copy.extend_from_slice(rgb);
        return Ok(copy);
    }
    let flat: Vec<f32> = rgb.iter().flatten().copied().collect();
    let scaled = scale_f32(&flat, 3, src_width, src_height, dst_width, dst_height)?;
    Ok(scaled.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
}

impl Image {
    /// Resamples every plane to |width| x |height|.
    pub fn scale(&mut self, width: u32, height: u32) -> AvifResult<()> {
        if self.width == width && self.height == height {
            return Ok(());
        }
        if width == 0 || height == 0 {
            return AvifError::invalid_argument();
        }
        let mut dst = self.shallow_clone();
        dst.width = width;
        dst.height = height;
        dst.alpha_present = false;
        if self.has_plane(Plane::Y) {
            dst.allocate_planes(Category::Color)?;
        }
        if self.has_alpha() {
            dst.allocate_planes(Category::Alpha)?;
        }
        let max_channel = self.max_channel_f();
        for plane in ALL_PLANES {
            if !self.has_plane(plane) {
                continue;
            }
            let src_width = self.width(plane);
            let src_height = self.height(plane);
            let mut samples =
                try_vec(usize_from_u32(checked_mul!(src_width, src_height)?)?, 0.0f32)?;
            for (y, row) in samples
                .chunks_exact_mut(usize_from_u32(src_width)?)
                .enumerate()
            {
                self.read_row_f32(plane, u32_from_usize(y)?, row)?;
            }
            let scaled = scale_f32(
                &samples,
                1,
                src_width,
                src_height,
                dst.width(plane),
                dst.height(plane),
            )?;
            let dst_width = usize_from_u32(dst.width(plane))?;
            for (y, row) in scaled.chunks_exact(dst_width).enumerate() {
                let values: Vec<u16> = row
                    .iter()
                    .map(|v| v.round().clamp(0.0, max_channel) as u16)
                    .collect();
                dst.write_row_u16(plane, u32_from_usize(y)?, &values)?;
            }
        }
        dst.gainmap = self.gainmap.take();
        *self = dst;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn box_filter_averages() -> AvifResult<()> {
        let src = [0.0, 2.0, 4.0, 6.0, 1.0, 3.0, 5.0, 7.0];
        let dst = scale_f32(&src, 1, 4, 2, 2, 1)?;
        assert_eq!(dst, vec![1.5, 5.5]);
        Ok(())
    }

    #[test]
    fn bilinear_interpolates_centers() -> AvifResult<()> {
        let src = [0.0, 10.0];
        let dst = scale_f32(&src, 1, 2, 1, 4, 1)?;
        assert_eq!(dst, vec![0.0, 2.5, 7.5, 10.0]);
        Ok(())
    }

    #[test]
    fn interleaved_channels_are_independent() -> AvifResult<()> {
        let src = [1.0, 100.0, 3.0, 300.0];
        let dst = scale_f32(&src, 2, 2, 1, 1, 1)?;
        assert_eq!(dst, vec![2.0, 200.0]);
        Ok(())
    }

    #[test]
    fn rgb_pixels_keep_their_channels() -> AvifResult<()> {
        let src = [[0.0, 0.5, 1.0], [1.0, 0.5, 0.0]];
        assert_eq!(scale_rgb_f32(&src, 2, 1, 2, 1)?, src.to_vec());
        assert_eq!(scale_rgb_f32(&src, 2, 1, 1, 1)?, vec![[0.5, 0.5, 0.5]]);
        Ok(())
    }

    #[test_case(4, 4, 2, 2 ; "shrink")]
    #[test_case(3, 5, 7, 11 ; "enlarge")]
    #[test_case(6, 4, 3, 9 ; "mixed")]
    fn constant_planes_stay_constant(width: u32, height: u32, new_width: u32, new_height: u32) {
        let mut image = Image {
            width,
            height,
            depth: 10,
            yuv_format: PixelFormat::Yuv420,
            ..Default::default()
        };
        image.allocate_planes(Category::Color).unwrap();
        image.allocate_planes(Category::Alpha).unwrap();
        for plane in YUV_PLANES {
            for y in 0..image.height(plane) {
                image.row16_mut(plane, y).unwrap().fill(700);
            }
        }
        image.scale(new_width, new_height).unwrap();
        assert_eq!((image.width, image.height), (new_width, new_height));
        assert!(image.has_alpha());
        for plane in ALL_PLANES {
            let expected = if plane == Plane::A { 1023 } else { 700 };
            for y in 0..image.height(plane) {
                assert!(image.row16(plane, y).unwrap().iter().all(|v| *v == expected));
            }
        }
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut image = Image {
            width: 2,
            height: 2,
            depth: 8,
            yuv_format: PixelFormat::Yuv400,
            ..Default::default()
        };
        assert_eq!(image.scale(0, 2), Err(AvifError::InvalidArgument));
    }
}

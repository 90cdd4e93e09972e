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

// Not all functions are used from all test targets. So allow dead code in this module.
#![allow(dead_code)]

use avif_gainmap::decoder::*;
use avif_gainmap::encoder::*;
use avif_gainmap::gainmap::*;
use avif_gainmap::image::*;
use avif_gainmap::reformat::rgb;
use avif_gainmap::reformat::transfer;
use avif_gainmap::utils::*;
use avif_gainmap::*;

fn full_to_limited_pixel(min: i32, max: i32, full: i32, v: u16) -> u16 {
    let v = v as i32;
    let v = (((v * (max - min)) + (full / 2)) / full) + min;
    v.clamp(min, max) as u16
}

fn full_to_limited(v: u16, plane: Plane, depth: u8) -> u16 {
    match (plane, depth) {
        (Plane::Y, 8) => full_to_limited_pixel(16, 235, 255, v),
        (Plane::Y, 10) => full_to_limited_pixel(64, 940, 1023, v),
        (Plane::Y, 12) => full_to_limited_pixel(256, 3760, 4095, v),
        (Plane::U | Plane::V, 8) => full_to_limited_pixel(16, 240, 255, v),
        (Plane::U | Plane::V, 10) => full_to_limited_pixel(64, 960, 1023, v),
        (Plane::U | Plane::V, 12) => full_to_limited_pixel(256, 3840, 4095, v),
        _ => v,
    }
}

pub fn generate_gradient_image(
    width: u32,
    height: u32,
    depth: u8,
    yuv_format: PixelFormat,
    yuv_range: YuvRange,
    alpha: bool,
) -> AvifResult<Image> {
    let mut image = Image {
        width,
        height,
        depth,
        yuv_format,
        yuv_range,
        ..Default::default()
    };
    image.allocate_planes(Category::Color)?;
    if alpha {
        image.allocate_planes(Category::Alpha)?;
    }
    let max_channel = image.max_channel() as u32;
    for plane in ALL_PLANES {
        let Some(plane_data) = image.plane_data(plane) else {
            continue;
        };
        let max_xy_sum = plane_data.width + plane_data.height - 2;
        for y in 0..plane_data.height {
            for x in 0..plane_data.width {
                let value = (x + y) % (max_xy_sum + 1);
                let mut value = (value * max_channel / std::cmp::max(1, max_xy_sum)) as u16;
                if yuv_range == YuvRange::Limited && plane != Plane::A {
                    value = full_to_limited(value, plane, depth);
                }
                if depth == 8 {
                    image.row_mut(plane, y)?[x as usize] = value as u8;
                } else {
                    image.row16_mut(plane, y)?[x as usize] = value;
                }
            }
        }
    }
    Ok(image)
}

pub fn are_planes_equal(image1: &Image, image2: &Image, plane: Plane) -> AvifResult<bool> {
    if !image1.has_same_properties(image2)
        || !image1.has_same_cicp(image2)
        || image1.has_plane(plane) != image2.has_plane(plane)
    {
        return Ok(false);
    }
    if !image1.has_plane(plane) {
        return Ok(true);
    }
    for y in 0..image1.height(plane) {
        if image1.depth > 8 {
            if image1.row16(plane, y)? != image2.row16(plane, y)? {
                return Ok(false);
            }
        } else if image1.row(plane, y)? != image2.row(plane, y)? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub fn are_images_equal(image1: &Image, image2: &Image) -> AvifResult<bool> {
    for plane in ALL_PLANES {
        if !are_planes_equal(image1, image2, plane)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn psnr_from_error(diff_sum: f64, num_samples: u64, max_channel: f64) -> f64 {
    if diff_sum == 0.0 {
        return 99.0;
    }
    let normalized_error = diff_sum / (num_samples as f64 * max_channel * max_channel);
    if normalized_error <= f64::EPSILON {
        98.99
    } else {
        (-10.0 * normalized_error.log10()).min(98.99)
    }
}

/// PSNR over the red, green and blue channels of two RGB images of the same shape. Alpha is
/// ignored.
pub fn rgb_psnr(image1: &rgb::Image, image2: &rgb::Image) -> AvifResult<f64> {
    assert_eq!(
        (image1.width, image1.height, image1.depth),
        (image2.width, image2.height, image2.depth)
    );
    let offsets1 = [
        image1.format.r_offset(),
        image1.format.g_offset(),
        image1.format.b_offset(),
    ];
    let offsets2 = [
        image2.format.r_offset(),
        image2.format.g_offset(),
        image2.format.b_offset(),
    ];
    let channels1 = image1.format.channel_count() as usize;
    let channels2 = image2.format.channel_count() as usize;
    let mut diff_sum = 0.0f64;
    let mut num_samples = 0u64;
    for y in 0..image1.height {
        let (row1, row2): (Vec<u16>, Vec<u16>) = if image1.depth == 8 {
            (
                image1.row(y)?.iter().map(|v| *v as u16).collect(),
                image2.row(y)?.iter().map(|v| *v as u16).collect(),
            )
        } else {
            (image1.row16(y)?.to_vec(), image2.row16(y)?.to_vec())
        };
        for x in 0..image1.width as usize {
            for c in 0..3 {
                let diff = row1[x * channels1 + offsets1[c]] as f64
                    - row2[x * channels2 + offsets2[c]] as f64;
                diff_sum += diff * diff;
                num_samples += 1;
            }
        }
    }
    Ok(psnr_from_error(
        diff_sum,
        num_samples,
        image1.max_channel() as f64,
    ))
}

pub fn to_rgb(image: &Image, depth: u8, format: rgb::Format) -> AvifResult<rgb::Image> {
    let mut rgb = rgb::Image {
        depth,
        format,
        ..Default::default()
    };
    rgb.convert_from_yuv(image)?;
    Ok(rgb)
}

// A smooth test scene in linear light, at most 1.0 (SDR white).
pub fn scene_sdr(x: u32, y: u32, width: u32, height: u32) -> [f32; 3] {
    let u = x as f32 / std::cmp::max(width - 1, 1) as f32;
    let v = y as f32 / std::cmp::max(height - 1, 1) as f32;
    [0.05 + 0.9 * u, 0.05 + 0.9 * v, 0.05 + 0.45 * (u + v)]
}

// The same scene with highlights boosted by up to 2^3.
pub fn scene_hdr(x: u32, y: u32, width: u32, height: u32) -> [f32; 3] {
    let pixel = scene_sdr(x, y, width, height);
    let luma = 0.2126 * pixel[0] + 0.7152 * pixel[1] + 0.0722 * pixel[2];
    let boost = (3.0 * luma).exp2();
    pixel.map(|v| v * boost)
}

/// Encodes |scene| with |transfer_characteristics| into a full range 4:4:4 BT.709 image.
pub fn image_from_scene(
    width: u32,
    height: u32,
    depth: u8,
    transfer_characteristics: TransferCharacteristics,
    scene: fn(u32, u32, u32, u32) -> [f32; 3],
) -> AvifResult<Image> {
    let mut rgb = rgb::Image {
        width,
        height,
        depth,
        format: rgb::Format::Rgb,
        ..Default::default()
    };
    rgb.allocate()?;
    let max_channel = rgb.max_channel() as f32;
    let max_linear = transfer::max_linear(transfer_characteristics);
    for y in 0..height {
        for x in 0..width {
            let pixel = scene(x, y, width, height);
            for c in 0..3 {
                let v = transfer::from_linear(
                    transfer_characteristics,
                    pixel[c].clamp(0.0, max_linear),
                );
                let v = (v * max_channel).round().clamp(0.0, max_channel);
                let index = x as usize * 3 + c;
                if depth == 8 {
                    rgb.row_mut(y)?[index] = v as u8;
                } else {
                    rgb.row16_mut(y)?[index] = v as u16;
                }
            }
        }
    }
    let mut image = Image {
        depth,
        yuv_format: PixelFormat::Yuv444,
        yuv_range: YuvRange::Full,
        color_primaries: ColorPrimaries::Bt709,
        transfer_characteristics,
        matrix_coefficients: MatrixCoefficients::Bt709,
        ..Default::default()
    };
    rgb.convert_to_yuv(&mut image)?;
    Ok(image)
}

pub fn sdr_scene_image(width: u32, height: u32) -> AvifResult<Image> {
    image_from_scene(width, height, 8, TransferCharacteristics::Srgb, scene_sdr)
}

pub fn hdr_scene_image(width: u32, height: u32) -> AvifResult<Image> {
    image_from_scene(width, height, 10, TransferCharacteristics::Pq, scene_hdr)
}

/// A 12x34 base image with a 6x17 gain map and metadata with a distinct value in every field.
pub fn create_test_image_with_gainmap(base_is_hdr: bool) -> AvifResult<Image> {
    let mut image =
        generate_gradient_image(12, 34, 10, PixelFormat::Yuv420, YuvRange::Full, true)?;
    image.color_primaries = ColorPrimaries::Bt709;
    image.transfer_characteristics =
        if base_is_hdr { TransferCharacteristics::Pq } else { TransferCharacteristics::Srgb };
    image.matrix_coefficients = MatrixCoefficients::Bt601;

    let mut gainmap_image =
        generate_gradient_image(6, 17, 8, PixelFormat::Yuv420, YuvRange::Full, false)?;
    gainmap_image.matrix_coefficients = MatrixCoefficients::Bt601;

    let mut metadata = GainMapMetadata {
        use_base_color_space: true,
        backward_direction: base_is_hdr,
        base_hdr_headroom: UFraction(if base_is_hdr { 6 } else { 0 }, 2),
        alternate_hdr_headroom: UFraction(if base_is_hdr { 0 } else { 6 }, 2),
        ..Default::default()
    };
    for c in 0..3 {
        let n = c as u32 + 1;
        metadata.base_offset[c] = Fraction(10 * c as i32, 1000);
        metadata.alternate_offset[c] = Fraction(20 * c as i32, 1000);
        metadata.gamma[c] = UFraction(1, n);
        metadata.min[c] = Fraction(-1, n);
        metadata.max[c] = Fraction(10 + n as i32, n);
    }
    let clli = ContentLightLevelInformation {
        max_cll: 10,
        max_pall: 5,
    };
    let mut gainmap = GainMap {
        image: Some(gainmap_image),
        metadata,
        alt_color_primaries: ColorPrimaries::Bt709,
        alt_transfer_characteristics: if base_is_hdr {
            TransferCharacteristics::Srgb
        } else {
            TransferCharacteristics::Pq
        },
        alt_matrix_coefficients: MatrixCoefficients::Bt601,
        alt_yuv_range: YuvRange::Full,
        alt_plane_count: 3,
        alt_plane_depth: if base_is_hdr { 8 } else { 10 },
        ..Default::default()
    };
    if base_is_hdr {
        image.clli = Some(clli);
    } else {
        gainmap.alt_clli = clli;
    }
    image.gainmap = Some(Box::new(gainmap));
    Ok(image)
}

pub fn encode(image: &Image) -> AvifResult<MemoryContainer> {
    let mut encoder = Encoder::create();
    encoder.add_image(image)?;
    encoder.finish()
}

pub fn decoder_for(container: MemoryContainer, settings: Settings) -> Decoder {
    let mut decoder = Decoder::default();
    decoder.settings = settings;
    decoder.set_source(Box::new(container));
    decoder
}

pub fn all_gainmap_settings() -> Settings {
    Settings {
        enable_decoding_gainmap: true,
        enable_parsing_gainmap_metadata: true,
        ..Default::default()
    }
}

pub fn merge_cells_into_grid_image(
    columns: u32,
    rows: u32,
    cell_images: &[&Image],
) -> AvifResult<Image> {
    let first = cell_images[0];
    let mut image = first.shallow_clone();
    image.width = columns * first.width;
    image.height = rows * first.height;
    image.alpha_present = false;
    image.allocate_planes(Category::Color)?;
    if first.has_alpha() {
        image.allocate_planes(Category::Alpha)?;
    }
    for (cell_index, cell) in cell_images.iter().enumerate() {
        let row_index = cell_index as u32 / columns;
        let column_index = cell_index as u32 % columns;
        for plane in ALL_PLANES {
            let Some(src_plane) = cell.plane_data(plane) else {
                continue;
            };
            let dst_y_start = row_index * src_plane.height;
            let dst_x_offset = (column_index * src_plane.width) as usize;
            let dst_x_offset_end = dst_x_offset + src_plane.width as usize;
            for y in 0..src_plane.height {
                if image.depth == 8 {
                    let src_row = cell.row(plane, y)?;
                    image.row_mut(plane, dst_y_start + y)?[dst_x_offset..dst_x_offset_end]
                        .copy_from_slice(src_row);
                } else {
                    let src_row = cell.row16(plane, y)?;
                    image.row16_mut(plane, dst_y_start + y)?[dst_x_offset..dst_x_offset_end]
                        .copy_from_slice(src_row);
                }
            }
        }
    }
    Ok(image)
}

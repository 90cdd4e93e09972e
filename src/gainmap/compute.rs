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

use super::convert::GainMapMetadataFloat;
use super::*;

use crate::image::*;
use crate::reformat::coeffs::calculate_yuv_coefficients;
use crate::reformat::rgb_impl::*;
use crate::reformat::scale::scale_rgb_f32;
use crate::reformat::transfer::*;

// Both renditions get the same small offset so that black pixels do not produce infinite gains.
const OFFSET: f64 = 1.0 / 64.0;
// Floor applied to the terms of the gain ratio.
const EPSILON: f32 = 1e-6;

/// Shape of the gain map image to compute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GainMapDescriptor {
    pub width: u32,
    pub height: u32,
    pub depth: u8,
    pub yuv_format: PixelFormat,
}

fn is_hdr(transfer_characteristics: TransferCharacteristics) -> bool {
    matches!(
        transfer_characteristics,
        TransferCharacteristics::Pq | TransferCharacteristics::Hlg
    )
}

fn linear_rgb(image: &Image) -> AvifResult<Vec<[f32; 3]>> {
    let mut rgb = yuv_to_rgb_f32(image)?;
    for pixel in &mut rgb {
        for channel in pixel.iter_mut() {
            *channel = to_linear(image.transfer_characteristics, *channel);
        }
    }
    Ok(rgb)
}

// Stops above SDR white. Images with an SDR transfer curve have no headroom.
fn headroom(image: &Image, linear: &[[f32; 3]]) -> f64 {
    if !is_hdr(image.transfer_characteristics) {
        return 0.0;
    }
    let max_linear = match image.clli {
        Some(clli) if clli.max_cll > 0 => clli.max_cll as f32 / SDR_WHITE_NITS,
        _ => linear
            .iter()
            .flat_map(|pixel| pixel.iter())
            .fold(0.0f32, |max, v| max.max(*v)),
    };
    (max_linear.max(1.0) as f64).log2()
}

// The HDR rendition must have more headroom than the SDR one for the gain map to be applicable.
// When the transfer curves do not tell them apart (two SDR renditions for example), the headroom
// of the HDR rendition is the largest gain stored in the map.
fn hdr_rendition_headroom(sdr_headroom: f64, hdr_headroom: f64, max_gain: &[f32; 3]) -> f64 {
    if hdr_headroom > sdr_headroom {
        return hdr_headroom;
    }
    let max_gain = max_gain.iter().fold(0.0f32, |max, v| max.max(*v)) as f64;
    log::trace!(
        "hdr rendition headroom {hdr_headroom} does not exceed {sdr_headroom}, using the maximum \
         gain {max_gain}"
    );
    sdr_headroom + max_gain
}

fn validate(base: &Image, alternate: &Image, descriptor: &GainMapDescriptor) -> AvifResult<()> {
    for image in [base, alternate] {
        if !image.has_plane(Plane::Y) || !image.depth_valid() {
            return AvifError::invalid_argument();
        }
    }
    if descriptor.width == 0
        || descriptor.height == 0
        || !matches!(descriptor.depth, 8 | 10 | 12 | 16)
        || descriptor.yuv_format == PixelFormat::None
    {
        log::debug!("invalid gain map descriptor {descriptor:?}");
        return AvifError::invalid_argument();
    }
    check_aspect_ratio(base, alternate)
}

/// Computes the gain map that turns |base| into |alternate|. When |backward_direction| is set,
/// |base| is the HDR rendition and |alternate| the SDR one, otherwise the other way around. The
/// pixels of both images are resampled to the size of |descriptor|.
pub fn compute_gainmap(
    base: &Image,
    alternate: &Image,
    backward_direction: bool,
    descriptor: &GainMapDescriptor,
) -> AvifResult<GainMap> {
    validate(base, alternate, descriptor)?;
    let base_linear = linear_rgb(base)?;
    let alternate_linear = linear_rgb(alternate)?;
    let base_headroom = headroom(base, &base_linear);
    let alternate_headroom = headroom(alternate, &alternate_linear);

    let (width, height) = (descriptor.width, descriptor.height);
    let base_linear = scale_rgb_f32(&base_linear, base.width, base.height, width, height)?;
    let alternate_linear =
        scale_rgb_f32(&alternate_linear, alternate.width, alternate.height, width, height)?;

    let monochrome = descriptor.yuv_format.is_monochrome();
    let channel_count = if monochrome { 1 } else { 3 };
    let [kr, kg, kb] = calculate_yuv_coefficients(base.matrix_coefficients);
    let luma = |p: &[f32; 3]| kr * p[0] + kg * p[1] + kb * p[2];
    let offset = OFFSET as f32;

    let mut gains = Vec::new();
    gains
        .try_reserve_exact(base_linear.len())
        .or(Err(AvifError::OutOfMemory))?;
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for (base_pixel, alternate_pixel) in base_linear.iter().zip(&alternate_linear) {
        let (base_pixel, alternate_pixel) = if monochrome {
            ([luma(base_pixel); 3], [luma(alternate_pixel); 3])
        } else {
            (*base_pixel, *alternate_pixel)
        };
        let mut gain = [0.0f32; 3];
        for c in 0..channel_count {
            let base_value = (base_pixel[c] + offset).max(EPSILON);
            let alternate_value = (alternate_pixel[c] + offset).max(EPSILON);
            gain[c] = if backward_direction {
                (base_value / alternate_value).log2()
            } else {
                (alternate_value / base_value).log2()
            };
            min[c] = min[c].min(gain[c]);
            max[c] = max[c].max(gain[c]);
        }
        gains.push(gain);
    }
    if monochrome {
        min = [min[0]; 3];
        max = [max[0]; 3];
    }
    let (sdr_headroom, hdr_headroom) = if backward_direction {
        (alternate_headroom, base_headroom)
    } else {
        (base_headroom, alternate_headroom)
    };
    let hdr_headroom = hdr_rendition_headroom(sdr_headroom, hdr_headroom, &max);
    let (base_headroom, alternate_headroom) = if backward_direction {
        (hdr_headroom, sdr_headroom)
    } else {
        (sdr_headroom, hdr_headroom)
    };
    log::trace!(
        "gain map min {min:?} max {max:?} base headroom {base_headroom} alternate headroom \
         {alternate_headroom}"
    );

    // Normalize to [0, 1]. Gamma is 1 so no curve is applied.
    for gain in &mut gains {
        let source = *gain;
        for c in 0..3 {
            let value = if monochrome { source[0] } else { source[c] };
            let range = max[c] - min[c];
            gain[c] = if range > 0.0 { (value - min[c]) / range } else { 0.5 };
        }
    }

    let mut image = Image {
        width,
        height,
        depth: descriptor.depth,
        yuv_format: descriptor.yuv_format,
        yuv_range: YuvRange::Full,
        matrix_coefficients: if descriptor.yuv_format == PixelFormat::Yuv444 {
            MatrixCoefficients::Identity
        } else {
            MatrixCoefficients::Bt601
        },
        ..Default::default()
    };
    image.allocate_planes(Category::Color)?;
    rgb_f32_to_yuv(&gains, &mut image)?;

    let metadata = GainMapMetadataFloat {
        min: min.map(|x| x as f64),
        max: max.map(|x| x as f64),
        gamma: [1.0; 3],
        base_offset: [OFFSET; 3],
        alternate_offset: [OFFSET; 3],
        base_hdr_headroom: base_headroom,
        alternate_hdr_headroom: alternate_headroom,
        backward_direction,
        use_base_color_space: true,
    };
    Ok(GainMap {
        image: Some(image),
        metadata: GainMapMetadata::try_from(&metadata)?,
        alt_color_primaries: alternate.color_primaries,
        alt_transfer_characteristics: alternate.transfer_characteristics,
        alt_matrix_coefficients: alternate.matrix_coefficients,
        alt_yuv_range: alternate.yuv_range,
        alt_plane_count: if alternate.yuv_format.is_monochrome() { 1 } else { 3 },
        alt_plane_depth: alternate.depth,
        alt_clli: alternate.clli.unwrap_or_default(),
    })
}

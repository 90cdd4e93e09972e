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

use crate::image::Plane;
use crate::reformat::rgb;
use crate::reformat::rgb_impl::yuv_to_rgb_f32;
use crate::reformat::scale::scale_rgb_f32;
use crate::reformat::transfer::*;

fn metadata_float(gainmap: &GainMap) -> AvifResult<GainMapMetadataFloat> {
    let float = gainmap
        .metadata
        .is_valid()
        .and_then(|_| GainMapMetadataFloat::try_from(&gainmap.metadata));
    match float {
        Ok(float) => Ok(float),
        Err(err) => {
            log::debug!("cannot apply gain map: {err}");
            AvifError::invalid_argument()
        }
    }
}

// Signed fraction of the gain to apply. Negative when the base is the HDR rendition.
fn gainmap_weight(hdr_headroom: f64, metadata: &GainMapMetadataFloat) -> f64 {
    let base = metadata.base_hdr_headroom;
    let alternate = metadata.alternate_hdr_headroom;
    if base == alternate {
        return 0.0;
    }
    let weight = ((hdr_headroom - base) / (alternate - base)).clamp(0.0, 1.0);
    if metadata.backward_direction {
        -weight
    } else {
        weight
    }
}

fn light_level(linear: &[[f32; 3]]) -> ContentLightLevelInformation {
    if linear.is_empty() {
        return ContentLightLevelInformation::default();
    }
    let mut max = 0.0f64;
    let mut sum = 0.0f64;
    for pixel in linear {
        let brightest = pixel[0].max(pixel[1]).max(pixel[2]) as f64;
        max = max.max(brightest);
        sum += brightest;
    }
    let nits = |linear: f64| (linear * SDR_WHITE_NITS as f64).round().min(u16::MAX as f64) as u16;
    ContentLightLevelInformation {
        max_cll: nits(max),
        max_pall: nits(sum / linear.len() as f64),
    }
}

fn to_linear_rgb(image: &Image) -> AvifResult<Vec<[f32; 3]>> {
    let mut linear = yuv_to_rgb_f32(image)?;
    for pixel in &mut linear {
        *pixel = pixel.map(|v| to_linear(image.transfer_characteristics, v));
    }
    Ok(linear)
}

/// Tone maps |base| to a display with |hdr_headroom| stops of headroom above SDR white, writing
/// the result into |rgb| encoded with |output_transfer|. The depth and format of |rgb| are
/// preserved, its dimensions are set to those of |base|.
///
/// Returns the light level of the tone mapped pixels.
pub fn apply_gainmap(
    base: &Image,
    gainmap: &GainMap,
    hdr_headroom: f32,
    output_transfer: TransferCharacteristics,
    rgb: &mut rgb::Image,
) -> AvifResult<ContentLightLevelInformation> {
    if !(hdr_headroom >= 0.0) {
        log::debug!("invalid hdr headroom {hdr_headroom}");
        return AvifError::invalid_argument();
    }
    let Some(gainmap_image) = &gainmap.image else {
        log::debug!("gain map has no pixels");
        return AvifError::invalid_argument();
    };
    if !base.has_plane(Plane::Y) || !gainmap_image.has_plane(Plane::Y) || !rgb.depth_valid() {
        return AvifError::invalid_argument();
    }
    check_aspect_ratio(base, gainmap_image)?;
    let metadata = metadata_float(gainmap)?;
    let weight = gainmap_weight(hdr_headroom as f64, &metadata);
    log::trace!("applying gain map with weight {weight}");

    if weight == 0.0 && output_transfer == base.transfer_characteristics {
        let clli = match base.clli {
            Some(clli) => clli,
            None => light_level(&to_linear_rgb(base)?),
        };
        rgb.convert_from_yuv(base)?;
        return Ok(clli);
    }

    let mut linear = to_linear_rgb(base)?;
    let gains = scale_rgb_f32(
        &yuv_to_rgb_f32(gainmap_image)?,
        gainmap_image.width,
        gainmap_image.height,
        base.width,
        base.height,
    )?;
    let max_output = max_linear(output_transfer);
    let inverse_gamma = metadata.gamma.map(|gamma| (1.0 / gamma) as f32);
    let min = metadata.min.map(|x| x as f32);
    let max = metadata.max.map(|x| x as f32);
    let base_offset = metadata.base_offset.map(|x| x as f32);
    let alternate_offset = metadata.alternate_offset.map(|x| x as f32);
    let weight = weight as f32;
    for (pixel, gain) in linear.iter_mut().zip(&gains) {
        for c in 0..3 {
            let normalized = gain[c].powf(inverse_gamma[c]);
            let log2_gain = min[c] + (max[c] - min[c]) * normalized;
            let value = (pixel[c] + base_offset[c]) * (log2_gain * weight).exp2()
                - alternate_offset[c];
            pixel[c] = value.clamp(0.0, max_output);
        }
    }

    let clli = if weight.abs() == 1.0 && !gainmap.alt_clli.is_empty() {
        gainmap.alt_clli
    } else {
        light_level(&linear)
    };
    for pixel in &mut linear {
        *pixel = pixel.map(|v| from_linear(output_transfer, v));
    }
    rgb.width = base.width;
    rgb.height = base.height;
    rgb.ensure_allocated()?;
    rgb.write_f32(&linear)?;
    rgb.import_alpha_from(base)?;
    Ok(clli)
}

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

pub mod apply;
pub mod compute;
pub mod convert;
pub mod tmap;

use crate::image::Image;
use crate::image::YuvRange;
use crate::utils::*;
use crate::*;

/// Gain map parameters in the form they are stored in.
///
/// The gain encoded in the gain map image is always log2 of the HDR rendition over the SDR one.
/// When `backward_direction` is set, the base image is the HDR rendition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GainMapMetadata {
    pub min: [Fraction; 3],
    pub max: [Fraction; 3],
    pub gamma: [UFraction; 3],
    pub base_offset: [Fraction; 3],
    pub alternate_offset: [Fraction; 3],
    pub base_hdr_headroom: UFraction,
    pub alternate_hdr_headroom: UFraction,
    pub backward_direction: bool,
    pub use_base_color_space: bool,
}

impl GainMapMetadata {
    pub fn is_valid(&self) -> AvifResult<()> {
        for i in 0..3 {
            let fields = [
                ("min", self.min[i].1),
                ("max", self.max[i].1),
                ("gamma", self.gamma[i].1),
                ("base offset", self.base_offset[i].1),
                ("alternate offset", self.alternate_offset[i].1),
            ];
            for (name, denominator) in fields {
                if denominator == 0 {
                    return AvifError::invalid_gainmap_metadata(format!(
                        "channel {i}: {name} has a zero denominator"
                    ));
                }
            }
            if self.max[i].as_f64()? < self.min[i].as_f64()? {
                return AvifError::invalid_gainmap_metadata(format!(
                    "channel {i}: max is smaller than min"
                ));
            }
            if self.gamma[i].0 == 0 {
                return AvifError::invalid_gainmap_metadata(format!("channel {i}: gamma is zero"));
            }
        }
        if self.base_hdr_headroom.1 == 0 || self.alternate_hdr_headroom.1 == 0 {
            return AvifError::invalid_gainmap_metadata("headroom has a zero denominator");
        }
        Ok(())
    }

    pub(crate) fn identical_channels(&self) -> bool {
        (1..3).all(|i| {
            self.min[0] == self.min[i]
                && self.max[0] == self.max[i]
                && self.gamma[0] == self.gamma[i]
                && self.base_offset[0] == self.base_offset[i]
                && self.alternate_offset[0] == self.alternate_offset[i]
        })
    }

    pub fn channel_count(&self) -> u8 {
        if self.identical_channels() {
            1
        } else {
            3
        }
    }

    /// Describes the same gain map as seen from the alternate rendition: applying the swapped
    /// metadata to the alternate image reconstructs the base image.
    pub fn swap_base_and_alternate(&mut self) {
        self.backward_direction = !self.backward_direction;
        self.use_base_color_space = !self.use_base_color_space;
        std::mem::swap(&mut self.base_hdr_headroom, &mut self.alternate_hdr_headroom);
        std::mem::swap(&mut self.base_offset, &mut self.alternate_offset);
    }
}

// Images of different sizes describe the same scene if their aspect ratios match, allowing for
// one pixel of rounding in either dimension of |other|.
pub(crate) fn check_aspect_ratio(base: &Image, other: &Image) -> AvifResult<()> {
    let (bw, bh) = (base.width as u64, base.height as u64);
    let (ow, oh) = (other.width as u64, other.height as u64);
    if bw == 0 || bh == 0 || ow == 0 || oh == 0 || (ow * bh).abs_diff(oh * bw) > bw + bh {
        log::debug!("aspect ratio of {ow}x{oh} does not match {bw}x{bh}");
        return AvifError::invalid_argument();
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct GainMap {
    /// None when the gain map pixels were not requested.
    pub image: Option<Image>,
    pub metadata: GainMapMetadata,

    pub alt_color_primaries: ColorPrimaries,
    pub alt_transfer_characteristics: TransferCharacteristics,
    pub alt_matrix_coefficients: MatrixCoefficients,
    pub alt_yuv_range: YuvRange,

    pub alt_plane_count: u8,
    pub alt_plane_depth: u8,

    pub alt_clli: ContentLightLevelInformation,
}

impl PartialEq for GainMap {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata
            && self.alt_color_primaries == other.alt_color_primaries
            && self.alt_transfer_characteristics == other.alt_transfer_characteristics
            && self.alt_matrix_coefficients == other.alt_matrix_coefficients
            && self.alt_yuv_range == other.alt_yuv_range
            && self.alt_plane_count == other.alt_plane_count
            && self.alt_plane_depth == other.alt_plane_depth
            && self.alt_clli == other.alt_clli
    }
}

impl GainMap {
    /// Copies everything but the gain map image.
    pub fn shallow_clone(&self) -> Self {
        Self {
            image: None,
            metadata: self.metadata,
            alt_color_primaries: self.alt_color_primaries,
            alt_transfer_characteristics: self.alt_transfer_characteristics,
            alt_matrix_coefficients: self.alt_matrix_coefficients,
            alt_yuv_range: self.alt_yuv_range,
            alt_plane_count: self.alt_plane_count,
            alt_plane_depth: self.alt_plane_depth,
            alt_clli: self.alt_clli,
        }
    }

    pub fn try_clone(&self) -> AvifResult<Self> {
        let mut gainmap = self.shallow_clone();
        if let Some(image) = &self.image {
            gainmap.image = Some(image.try_clone()?);
        }
        Ok(gainmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    pub(crate) fn valid_metadata() -> GainMapMetadata {
        GainMapMetadata {
            min: [Fraction(-1, 2); 3],
            max: [Fraction(3, 1); 3],
            gamma: [UFraction(1, 1); 3],
            base_offset: [Fraction(1, 64); 3],
            alternate_offset: [Fraction(1, 32); 3],
            base_hdr_headroom: UFraction(0, 1),
            alternate_hdr_headroom: UFraction(3, 1),
            backward_direction: false,
            use_base_color_space: true,
        }
    }

    #[test]
    fn identical_channels() {
        let mut metadata = valid_metadata();
        assert!(metadata.identical_channels());
        assert_eq!(metadata.channel_count(), 1);
        for i in 1..3 {
            metadata = valid_metadata();
            metadata.max[i] = Fraction(5, 2);
            assert_eq!(metadata.channel_count(), 3);
            metadata = valid_metadata();
            metadata.gamma[i] = UFraction(1, 2);
            assert_eq!(metadata.channel_count(), 3);
            metadata = valid_metadata();
            metadata.alternate_offset[i] = Fraction(0, 1);
            assert_eq!(metadata.channel_count(), 3);
        }
    }

    #[test]
    fn validity() {
        assert!(valid_metadata().is_valid().is_ok());
        assert!(matches!(
            GainMapMetadata::default().is_valid(),
            Err(AvifError::InvalidGainMapMetadata(_))
        ));
        let mut metadata = valid_metadata();
        metadata.min[2] = Fraction(4, 1);
        assert_eq!(
            metadata.is_valid(),
            Err(AvifError::InvalidGainMapMetadata(
                "channel 2: max is smaller than min".into()
            ))
        );
        let mut metadata = valid_metadata();
        metadata.gamma[1] = UFraction(0, 5);
        assert!(metadata.is_valid().is_err());
        let mut metadata = valid_metadata();
        metadata.alternate_hdr_headroom = UFraction(3, 0);
        assert!(metadata.is_valid().is_err());
    }

    #[test]
    fn swap_is_an_involution() {
        let mut metadata = valid_metadata();
        metadata.swap_base_and_alternate();
        assert!(metadata.backward_direction);
        assert!(!metadata.use_base_color_space);
        assert_eq!(metadata.base_hdr_headroom, UFraction(3, 1));
        assert_eq!(metadata.alternate_offset, [Fraction(1, 64); 3]);
        assert_eq!(metadata.min, valid_metadata().min);
        metadata.swap_base_and_alternate();
        assert_eq!(metadata, valid_metadata());
    }

    #[test_case(12, 34, 6, 17, true ; "half")]
    #[test_case(12, 34, 1, 1, true ; "single pixel")]
    #[test_case(12, 34, 24, 68, true ; "double")]
    #[test_case(13, 35, 7, 17, true ; "rounded")]
    #[test_case(100, 50, 50, 50, false ; "square")]
    #[test_case(100, 50, 0, 50, false ; "empty")]
    fn aspect_ratio(width: u32, height: u32, other_width: u32, other_height: u32, ok: bool) {
        let base = Image { width, height, ..Default::default() };
        let other = Image { width: other_width, height: other_height, ..Default::default() };
        assert_eq!(check_aspect_ratio(&base, &other).is_ok(), ok);
    }

    #[test]
    fn equality_ignores_pixels() {
        let gainmap = GainMap {
            image: Some(Image::default()),
            metadata: valid_metadata(),
            alt_plane_depth: 10,
            ..Default::default()
        };
        let clone = gainmap.try_clone().unwrap();
        assert!(clone.image.is_some());
        assert_eq!(gainmap.shallow_clone(), gainmap);
    }
}

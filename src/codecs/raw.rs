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

//! Uncompressed tile codec. A payload is the concatenation of the rows of every present plane of
//! the category, one byte per sample for 8-bit images and two big-endian bytes otherwise.

use crate::codecs::Decoder;
use crate::codecs::DecoderConfig;
use crate::codecs::Encoder;
use crate::image::Image;
use crate::internal_utils::stream::*;
use crate::internal_utils::*;
use crate::*;

#[derive(Debug, Default)]
pub struct RawCodec {
    config: Option<DecoderConfig>,
}

fn decode_failed<T>(category: Category) -> AvifResult<T> {
    let err = match category {
        Category::Color => AvifError::DecodeColorFailed,
        Category::Alpha => AvifError::DecodeAlphaFailed,
        Category::Gainmap => AvifError::DecodeGainMapFailed,
    };
    log::debug!("raw payload does not match the tile geometry: {err}");
    Err(err)
}

fn encode_failed<T>(category: Category) -> AvifResult<T> {
    Err(match category {
        Category::Color => AvifError::EncodeColorFailed,
        Category::Alpha => AvifError::EncodeAlphaFailed,
        Category::Gainmap => AvifError::EncodeGainMapFailed,
    })
}

fn payload_size(image: &Image, category: Category) -> AvifResult<usize> {
    let sample_size = if image.depth == 8 { 1 } else { 2 };
    let mut size = 0usize;
    for plane in category.planes() {
        let samples = checked_mul!(image.width(*plane), image.height(*plane))?;
        size = checked_add!(size, checked_mul!(usize_from_u32(samples)?, sample_size)?)?;
    }
    Ok(size)
}

impl Decoder for RawCodec {
    fn initialize(&mut self, config: &DecoderConfig) -> AvifResult<()> {
        if config.width == 0 || config.height == 0 {
            return AvifError::invalid_argument();
        }
        self.config = Some(*config);
        Ok(())
    }

    fn get_next_image(
        &mut self,
        payload: &[u8],
        image: &mut Image,
        category: Category,
    ) -> AvifResult<()> {
        let Some(config) = &self.config else {
            return AvifError::unknown_error("raw decoder was not initialized");
        };
        image.width = config.width;
        image.height = config.height;
        image.depth = config.depth;
        image.yuv_format = config.yuv_format;
        if payload.len() != payload_size(image, category)? {
            return decode_failed(category);
        }
        image.allocate_planes(category)?;
        let mut stream = IStream::create(payload);
        for plane in category.planes() {
            let plane = *plane;
            if !image.has_plane(plane) {
                continue;
            }
            for y in 0..image.height(plane) {
                if image.depth == 8 {
                    for sample in image.row_mut(plane, y)? {
                        *sample = stream.read_u8()?;
                    }
                } else {
                    let max_channel = image.max_channel();
                    for sample in image.row16_mut(plane, y)? {
                        *sample = stream.read_u16()?;
                        if *sample > max_channel {
                            return decode_failed(category);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Encoder for RawCodec {
    fn encode_image(
        &mut self,
        image: &Image,
        category: Category,
        output: &mut Vec<u8>,
    ) -> AvifResult<()> {
        let mut stream = OStream::default();
        for plane in category.planes() {
            let plane = *plane;
            if image.width(plane) == 0 {
                continue;
            }
            if !image.has_plane(plane) {
                return encode_failed(category);
            }
            for y in 0..image.height(plane) {
                if image.depth == 8 {
                    for sample in image.row(plane, y)? {
                        stream.write_u8(*sample)?;
                    }
                } else {
                    for sample in image.row16(plane, y)? {
                        stream.write_u16(*sample)?;
                    }
                }
            }
        }
        output
            .try_reserve(stream.data.len())
            .or(Err(AvifError::OutOfMemory))?;
        output.extend_from_slice(&stream.data);
        Ok(())
    }
}

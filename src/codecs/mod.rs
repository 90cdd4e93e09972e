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

pub mod raw;

use crate::image::Image;
use crate::image::ImageDescriptor;
use crate::AvifResult;
use crate::Category;

/// The shape of the tiles a decoder instance will be fed, known from the container before any
/// payload is read.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecoderConfig {
    pub width: u32,
    pub height: u32,
    pub depth: u8,
    pub yuv_format: crate::PixelFormat,
    pub category: Category,
}

impl From<&DecoderConfig> for ImageDescriptor {
    fn from(config: &DecoderConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            depth: config.depth,
            yuv_format: config.yuv_format,
        }
    }
}

pub trait Decoder {
    fn initialize(&mut self, config: &DecoderConfig) -> AvifResult<()>;
    // Decode a single tile and write the planes of |category| into |image|. |image| carries the
    // geometry of the tile; its planes are allocated by the decoder.
    fn get_next_image(
        &mut self,
        payload: &[u8],
        image: &mut Image,
        category: Category,
    ) -> AvifResult<()>;
    // Destruction must be implemented using Drop.
}

pub trait Encoder {
    // Encode the planes of |category| of a single tile and append the payload to |output|.
    fn encode_image(
        &mut self,
        image: &Image,
        category: Category,
        output: &mut Vec<u8>,
    ) -> AvifResult<()>;
}

pub(crate) type Codec = Box<dyn Decoder>;
pub(crate) type EncoderCodec = Box<dyn Encoder>;

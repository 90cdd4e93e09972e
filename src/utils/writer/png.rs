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
use crate::reformat::rgb;
use crate::AvifError;
use crate::AvifResult;

use std::fs::File;

use super::Writer;

#[derive(Default)]
pub struct PngWriter {
    /// 8 or 16. Defaults to 8 for 8-bit images and 16 otherwise.
    pub depth: Option<u8>,
}

fn scale_to_8bit(pixel: u16, max_channel: u16) -> u8 {
    (pixel as u32 * 255 / max_channel as u32) as u8
}

fn scale_to_16bit(pixel: u16, max_channel: u16) -> u16 {
    ((pixel as u32 * 65535) / max_channel as u32) as u16
}

fn push_sample(buffer: &mut Vec<u8>, pixel: u16, max_channel: u16, depth: u8) {
    if depth == 8 {
        buffer.push(scale_to_8bit(pixel, max_channel));
    } else {
        buffer.extend_from_slice(&scale_to_16bit(pixel, max_channel).to_be_bytes());
    }
}

impl PngWriter {
    fn output_depth(&self, input_depth: u8) -> AvifResult<u8> {
        match self.depth {
            None => Ok(if input_depth == 8 { 8 } else { 16 }),
            Some(depth @ (8 | 16)) => Ok(depth),
            Some(_) => Err(AvifError::UnsupportedDepth),
        }
    }

    fn encode(
        file: &mut File,
        width: u32,
        height: u32,
        color_type: png::ColorType,
        depth: u8,
        data: &[u8],
    ) -> AvifResult<()> {
        let mut encoder = png::Encoder::new(file, width, height);
        encoder.set_color(color_type);
        encoder.set_depth(if depth == 8 { png::BitDepth::Eight } else { png::BitDepth::Sixteen });
        let mut writer = encoder.write_header().or(Err(AvifError::UnknownError(
            "Could not write the PNG header".into(),
        )))?;
        writer
            .write_image_data(data)
            .or(Err(AvifError::UnknownError(
                "Could not write PNG image data".into(),
            )))?;
        writer.finish().or(Err(AvifError::UnknownError(
            "Could not finalize the PNG encoder".into(),
        )))?;
        Ok(())
    }
}

impl Writer for PngWriter {
    fn write_frame(&mut self, file: &mut File, image: &Image) -> AvifResult<()> {
        if !image.yuv_format.is_monochrome() {
            let mut rgb = rgb::Image::create_from_yuv(image);
            rgb.format = if image.has_alpha() { rgb::Format::Rgba } else { rgb::Format::Rgb };
            rgb.allocate()?;
            rgb.convert_from_yuv(image)?;
            return self.write_rgb(file, &rgb);
        }
        // Gain maps are often single channel.
        let depth = self.output_depth(image.depth)?;
        let max_channel = image.max_channel();
        let mut buffer: Vec<u8> = Vec::new();
        for y in 0..image.height {
            if image.depth == 8 {
                for pixel in image.row(Plane::Y, y)? {
                    push_sample(&mut buffer, *pixel as u16, max_channel, depth);
                }
            } else {
                for pixel in image.row16(Plane::Y, y)? {
                    push_sample(&mut buffer, *pixel, max_channel, depth);
                }
            }
        }
        Self::encode(
            file,
            image.width,
            image.height,
            png::ColorType::Grayscale,
            depth,
            &buffer,
        )
    }

    fn write_rgb(&mut self, file: &mut File, rgb: &rgb::Image) -> AvifResult<()> {
        let depth = self.output_depth(rgb.depth)?;
        let max_channel = rgb.max_channel();
        let format = rgb.format;
        let mut offsets = vec![format.r_offset(), format.g_offset(), format.b_offset()];
        if format.has_alpha() {
            offsets.push(format.alpha_offset());
        }
        let channel_count = format.channel_count() as usize;
        let mut buffer: Vec<u8> = Vec::new();
        for y in 0..rgb.height {
            if rgb.depth == 8 {
                for pixel in rgb.row(y)?.chunks_exact(channel_count) {
                    for offset in &offsets {
                        push_sample(&mut buffer, pixel[*offset] as u16, max_channel, depth);
                    }
                }
            } else {
                for pixel in rgb.row16(y)?.chunks_exact(channel_count) {
                    for offset in &offsets {
                        push_sample(&mut buffer, pixel[*offset], max_channel, depth);
                    }
                }
            }
        }
        let color_type = if format.has_alpha() { png::ColorType::Rgba } else { png::ColorType::Rgb };
        Self::encode(file, rgb.width, rgb.height, color_type, depth, &buffer)
    }
}

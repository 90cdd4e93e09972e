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

use super::GainMapMetadata;

use crate::internal_utils::stream::*;
use crate::utils::*;
use crate::*;

const FLAG_MULTICHANNEL: u8 = 1 << 0;
const FLAG_USE_BASE_COLOR_SPACE: u8 = 1 << 1;
const FLAG_BACKWARD_DIRECTION: u8 = 1 << 2;
const FLAG_COMMON_DENOMINATOR: u8 = 1 << 3;

fn common_denominator(metadata: &GainMapMetadata, channel_count: usize) -> Option<u32> {
    let denominator = metadata.base_hdr_headroom.1;
    let mut denominators = vec![metadata.alternate_hdr_headroom.1];
    for i in 0..channel_count {
        denominators.extend_from_slice(&[
            metadata.min[i].1,
            metadata.max[i].1,
            metadata.gamma[i].1,
            metadata.base_offset[i].1,
            metadata.alternate_offset[i].1,
        ]);
    }
    denominators
        .iter()
        .all(|d| *d == denominator)
        .then_some(denominator)
}

/// Serializes |metadata| into a tone map (tmap) item payload.
pub fn write_tmap(metadata: &GainMapMetadata) -> AvifResult<Vec<u8>> {
    metadata.is_valid()?;
    let channel_count = metadata.channel_count() as usize;
    let common_denominator = common_denominator(metadata, channel_count);
    let mut flags = 0u8;
    if channel_count == 3 {
        flags |= FLAG_MULTICHANNEL;
    }
    if metadata.use_base_color_space {
        flags |= FLAG_USE_BASE_COLOR_SPACE;
    }
    if metadata.backward_direction {
        flags |= FLAG_BACKWARD_DIRECTION;
    }
    if common_denominator.is_some() {
        flags |= FLAG_COMMON_DENOMINATOR;
    }

    let mut stream = OStream::default();
    // unsigned int(8) version = 0;
    stream.write_u8(0)?;
    // unsigned int(8) flags;
    stream.write_u8(flags)?;
    if let Some(denominator) = common_denominator {
        stream.write_u32(denominator)?;
        stream.write_u32(metadata.base_hdr_headroom.0)?;
        stream.write_u32(metadata.alternate_hdr_headroom.0)?;
        for i in 0..channel_count {
            stream.write_i32(metadata.min[i].0)?;
            stream.write_i32(metadata.max[i].0)?;
            stream.write_u32(metadata.gamma[i].0)?;
            stream.write_i32(metadata.base_offset[i].0)?;
            stream.write_i32(metadata.alternate_offset[i].0)?;
        }
    } else {
        stream.write_ufraction(metadata.base_hdr_headroom)?;
        stream.write_ufraction(metadata.alternate_hdr_headroom)?;
        for i in 0..channel_count {
            stream.write_fraction(metadata.min[i])?;
            stream.write_fraction(metadata.max[i])?;
            stream.write_ufraction(metadata.gamma[i])?;
            stream.write_fraction(metadata.base_offset[i])?;
            stream.write_fraction(metadata.alternate_offset[i])?;
        }
    }
    Ok(stream.data)
}

fn parse_tmap_fields(stream: &mut IStream) -> AvifResult<GainMapMetadata> {
    // unsigned int(8) version = 0;
    let version = stream.read_u8()?;
    if version != 0 {
        return AvifError::invalid_tone_mapped_image(format!("unsupported version {version}"));
    }
    // unsigned int(8) flags;
    let flags = stream.read_u8()?;
    let channel_count = if (flags & FLAG_MULTICHANNEL) != 0 { 3 } else { 1 };
    let mut metadata = GainMapMetadata {
        use_base_color_space: (flags & FLAG_USE_BASE_COLOR_SPACE) != 0,
        backward_direction: (flags & FLAG_BACKWARD_DIRECTION) != 0,
        ..GainMapMetadata::default()
    };
    if (flags & FLAG_COMMON_DENOMINATOR) != 0 {
        let denominator = stream.read_u32()?;
        metadata.base_hdr_headroom = UFraction(stream.read_u32()?, denominator);
        metadata.alternate_hdr_headroom = UFraction(stream.read_u32()?, denominator);
        for i in 0..channel_count {
            metadata.min[i] = Fraction(stream.read_i32()?, denominator);
            metadata.max[i] = Fraction(stream.read_i32()?, denominator);
            metadata.gamma[i] = UFraction(stream.read_u32()?, denominator);
            metadata.base_offset[i] = Fraction(stream.read_i32()?, denominator);
            metadata.alternate_offset[i] = Fraction(stream.read_i32()?, denominator);
        }
    } else {
        metadata.base_hdr_headroom = stream.read_ufraction()?;
        metadata.alternate_hdr_headroom = stream.read_ufraction()?;
        for i in 0..channel_count {
            metadata.min[i] = stream.read_fraction()?;
            metadata.max[i] = stream.read_fraction()?;
            metadata.gamma[i] = stream.read_ufraction()?;
            metadata.base_offset[i] = stream.read_fraction()?;
            metadata.alternate_offset[i] = stream.read_fraction()?;
        }
    }
    // Fill the remaining values by copying those from the first channel.
    for i in channel_count..3 {
        metadata.min[i] = metadata.min[0];
        metadata.max[i] = metadata.max[0];
        metadata.gamma[i] = metadata.gamma[0];
        metadata.base_offset[i] = metadata.base_offset[0];
        metadata.alternate_offset[i] = metadata.alternate_offset[0];
    }
    if stream.has_bytes_left()? {
        return AvifError::invalid_tone_mapped_image(format!(
            "{} trailing bytes",
            stream.bytes_left()?
        ));
    }
    Ok(metadata)
}

/// Parses a tone map (tmap) item payload.
pub fn parse_tmap(data: &[u8]) -> AvifResult<GainMapMetadata> {
    let mut stream = IStream::create(data);
    match parse_tmap_fields(&mut stream) {
        Err(AvifError::TruncatedData) => {
            AvifError::invalid_tone_mapped_image(format!("truncated after {} bytes", stream.offset))
        }
        result => result,
    }
}

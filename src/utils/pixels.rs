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

use crate::internal_utils::*;
use crate::*;

// This enum must not derive the default `Clone` trait as it has to be cloned with error
// checking using the `try_clone` function.
#[derive(Debug)]
pub enum Pixels {
    // Used for 8-bit images.
    Buffer(Vec<u8>),
    // Used for 10-bit, 12-bit and 16-bit images.
    Buffer16(Vec<u16>),
}

pub(crate) fn try_vec<T: Copy>(size: usize, value: T) -> AvifResult<Vec<T>> {
    let mut buffer: Vec<T> = Vec::new();
    if buffer.try_reserve_exact(size).is_err() {
        return AvifError::out_of_memory();
    }
    buffer.resize(size, value);
    Ok(buffer)
}

impl Pixels {
    pub(crate) fn create(depth: u8, size: usize, default: u16) -> AvifResult<Self> {
        if depth > 8 {
            Ok(Pixels::Buffer16(try_vec(size, default)?))
        } else {
            Ok(Pixels::Buffer(try_vec(size, default as u8)?))
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Pixels::Buffer(buffer) => buffer.len(),
            Pixels::Buffer16(buffer) => buffer.len(),
        }
    }

    pub(crate) fn has_data(&self) -> bool {
        self.size() != 0
    }

    pub(crate) fn try_clone(&self) -> AvifResult<Pixels> {
        match self {
            Pixels::Buffer(buffer) => {
                let mut cloned_buffer: Vec<u8> = vec![];
                cloned_buffer
                    .try_reserve_exact(buffer.len())
                    .or(Err(AvifError::OutOfMemory))?;
                cloned_buffer.extend_from_slice(buffer);
                Ok(Pixels::Buffer(cloned_buffer))
            }
            Pixels::Buffer16(buffer16) => {
                let mut cloned_buffer16: Vec<u16> = vec![];
                cloned_buffer16
                    .try_reserve_exact(buffer16.len())
                    .or(Err(AvifError::OutOfMemory))?;
                cloned_buffer16.extend_from_slice(buffer16);
                Ok(Pixels::Buffer16(cloned_buffer16))
            }
        }
    }

    pub fn slice(&self, offset: u32, size: u32) -> AvifResult<&[u8]> {
        let offset: usize = usize_from_u32(offset)?;
        let size: usize = usize_from_u32(size)?;
        match self {
            Pixels::Buffer(buffer) => {
                let end = offset.checked_add(size).ok_or(AvifError::NoContent)?;
                let range = offset..end;
                check_slice_range(buffer.len(), &range)?;
                Ok(&buffer[range])
            }
            Pixels::Buffer16(_) => AvifError::no_content(),
        }
    }

    pub(crate) fn slice_mut(&mut self, offset: u32, size: u32) -> AvifResult<&mut [u8]> {
        let offset: usize = usize_from_u32(offset)?;
        let size: usize = usize_from_u32(size)?;
        match self {
            Pixels::Buffer(buffer) => {
                let end = offset.checked_add(size).ok_or(AvifError::NoContent)?;
                let range = offset..end;
                check_slice_range(buffer.len(), &range)?;
                Ok(&mut buffer[range])
            }
            Pixels::Buffer16(_) => AvifError::no_content(),
        }
    }

    pub fn slice16(&self, offset: u32, size: u32) -> AvifResult<&[u16]> {
        let offset: usize = usize_from_u32(offset)?;
        let size: usize = usize_from_u32(size)?;
        match self {
            Pixels::Buffer(_) => AvifError::no_content(),
            Pixels::Buffer16(buffer) => {
                let end = offset.checked_add(size).ok_or(AvifError::NoContent)?;
                let range = offset..end;
                check_slice_range(buffer.len(), &range)?;
                Ok(&buffer[range])
            }
        }
    }

    pub(crate) fn slice16_mut(&mut self, offset: u32, size: u32) -> AvifResult<&mut [u16]> {
        let offset: usize = usize_from_u32(offset)?;
        let size: usize = usize_from_u32(size)?;
        match self {
            Pixels::Buffer(_) => AvifError::no_content(),
            Pixels::Buffer16(buffer) => {
                let end = offset.checked_add(size).ok_or(AvifError::NoContent)?;
                let range = offset..end;
                check_slice_range(buffer.len(), &range)?;
                Ok(&mut buffer[range])
            }
        }
    }
}

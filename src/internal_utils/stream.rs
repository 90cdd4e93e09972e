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

use crate::utils::*;
use crate::*;

#[derive(Debug)]
pub struct IStream<'a> {
    // The bytes to parse.
    pub data: &'a [u8],
    // The number of bytes read so far within self.data.
    pub offset: usize,
}

impl IStream<'_> {
    pub(crate) fn create(data: &[u8]) -> IStream<'_> {
        IStream { data, offset: 0 }
    }

    fn check(&self, size: usize) -> AvifResult<()> {
        if self.bytes_left()? < size {
            return AvifError::truncated_data();
        }
        Ok(())
    }

    pub(crate) fn bytes_left(&self) -> AvifResult<usize> {
        checked_sub!(self.data.len(), self.offset)
    }

    pub(crate) fn has_bytes_left(&self) -> AvifResult<bool> {
        Ok(self.bytes_left()? > 0)
    }

    fn get_slice(&mut self, size: usize) -> AvifResult<&[u8]> {
        self.check(size)?;
        let offset_start = self.offset;
        self.offset = checked_add!(self.offset, size)?;
        Ok(&self.data[offset_start..offset_start + size])
    }

    pub(crate) fn read_u8(&mut self) -> AvifResult<u8> {
        self.check(1)?;
        let value = self.data[self.offset];
        self.offset += 1;
        Ok(value)
    }

    pub(crate) fn read_u16(&mut self) -> AvifResult<u16> {
        Ok(u16::from_be_bytes(self.get_slice(2)?.try_into().unwrap()))
    }

    pub(crate) fn read_u32(&mut self) -> AvifResult<u32> {
        Ok(u32::from_be_bytes(self.get_slice(4)?.try_into().unwrap()))
    }

    pub(crate) fn read_i32(&mut self) -> AvifResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub(crate) fn read_fraction(&mut self) -> AvifResult<Fraction> {
        Ok(Fraction(self.read_i32()?, self.read_u32()?))
    }

    pub(crate) fn read_ufraction(&mut self) -> AvifResult<UFraction> {
        Ok(UFraction(self.read_u32()?, self.read_u32()?))
    }
}

#[derive(Default)]
pub struct OStream {
    pub data: Vec<u8>,
}

impl OStream {
    fn try_reserve(&mut self, size: usize) -> AvifResult<()> {
        self.data
            .try_reserve(size)
            .or(Err(AvifError::OutOfMemory))
    }

    pub(crate) fn write_u8(&mut self, value: u8) -> AvifResult<()> {
        self.try_reserve(1)?;
        self.data.push(value);
        Ok(())
    }

    pub(crate) fn write_u16(&mut self, value: u16) -> AvifResult<()> {
        self.try_reserve(2)?;
        self.data.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub(crate) fn write_u32(&mut self, value: u32) -> AvifResult<()> {
        self.try_reserve(4)?;
        self.data.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub(crate) fn write_i32(&mut self, value: i32) -> AvifResult<()> {
        self.write_u32(value as u32)
    }

    pub(crate) fn write_fraction(&mut self, value: Fraction) -> AvifResult<()> {
        self.write_i32(value.0)?;
        self.write_u32(value.1)
    }

    pub(crate) fn write_ufraction(&mut self, value: UFraction) -> AvifResult<()> {
        self.write_u32(value.0)?;
        self.write_u32(value.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_big_endian() -> AvifResult<()> {
        let data = [0x01, 0x02, 0x03, 0xff, 0xff, 0xff, 0xfe, 0x00, 0x00, 0x00, 0x07];
        let mut stream = IStream::create(&data);
        assert_eq!(stream.read_u16()?, 0x0102);
        assert_eq!(stream.read_u8()?, 0x03);
        assert_eq!(stream.read_fraction()?, Fraction(-2, 7));
        assert!(!stream.has_bytes_left()?);
        assert_eq!(stream.read_u8(), Err(AvifError::TruncatedData));
        Ok(())
    }

    #[test]
    fn truncated_read_does_not_advance() -> AvifResult<()> {
        let data = [0x00, 0x01, 0x02];
        let mut stream = IStream::create(&data);
        assert_eq!(stream.read_u32(), Err(AvifError::TruncatedData));
        assert_eq!(stream.offset, 0);
        assert_eq!(stream.read_u16()?, 1);
        Ok(())
    }

    #[test]
    fn write_big_endian() -> AvifResult<()> {
        let mut stream = OStream::default();
        stream.write_u8(9)?;
        stream.write_u16(0x0a0b)?;
        stream.write_fraction(Fraction(-1, 2))?;
        stream.write_ufraction(UFraction(3, 4))?;
        assert_eq!(
            stream.data,
            vec![9, 0x0a, 0x0b, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4]
        );
        Ok(())
    }
}

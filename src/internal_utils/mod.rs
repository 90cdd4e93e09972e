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

use crate::*;

use std::ops::Range;

macro_rules! checked_add {
    ($a:expr, $b:expr) => {
        $a.checked_add($b)
            .ok_or(AvifError::UnknownError("integer overflow".into()))
    };
}

macro_rules! checked_sub {
    ($a:expr, $b:expr) => {
        $a.checked_sub($b)
            .ok_or(AvifError::UnknownError("integer underflow".into()))
    };
}

macro_rules! checked_mul {
    ($a:expr, $b:expr) => {
        $a.checked_mul($b)
            .ok_or(AvifError::UnknownError("integer overflow".into()))
    };
}

pub(crate) mod stream;

pub(crate) fn usize_from_u32(value: u32) -> AvifResult<usize> {
    usize::try_from(value).or(Err(AvifError::UnknownError(
        "u32 does not fit in usize".into(),
    )))
}

pub(crate) fn u32_from_usize(value: usize) -> AvifResult<u32> {
    u32::try_from(value).or(Err(AvifError::UnknownError(
        "usize does not fit in u32".into(),
    )))
}

pub(crate) fn check_slice_range(len: usize, range: &Range<usize>) -> AvifResult<()> {
    if range.start >= len || range.end > len {
        return AvifError::no_content();
    }
    Ok(())
}

pub(crate) fn check_limits(width: u32, height: u32, size_limit: u32, dimension_limit: u32) -> bool {
    if height == 0 {
        return false;
    }
    if width > size_limit / height {
        return false;
    }
    if dimension_limit != 0 && (width > dimension_limit || height > dimension_limit) {
        return false;
    }
    true
}

// Maps a value in [0, 1] to the nearest code value of a |max_channel| range.
pub(crate) fn quantize(value: f32, max_channel: f32) -> u16 {
    (value.clamp(0.0, 1.0) * max_channel).round() as u16
}

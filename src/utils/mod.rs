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

pub(crate) mod error;
pub mod pixels;
#[cfg(feature = "png")]
pub mod writer;

// Gain map offsets and log2 bounds can be negative, hence Fraction and UFraction.
// The denominator is always unsigned.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fraction(pub i32, pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UFraction(pub u32, pub u32);

// The golden ratio needs 39 continued fraction steps, every other value converges faster.
const MAX_CONTINUED_FRACTION_STEPS: usize = 39;

// Best approximation of |value| with numerator <= max_numerator and denominator <= u32::MAX,
// found by walking the continued fraction expansion of |value|.
fn approximate_unsigned(value: f64, max_numerator: u32) -> Option<(u32, u32)> {
    if value.is_nan() || value < 0.0 || value > max_numerator as f64 {
        return None;
    }
    let max_denominator = (max_numerator as f64 / value).min(u32::MAX as f64).floor() as u64;
    let mut denominator: u64 = 1;
    let mut previous_denominator: u64 = 0;
    let mut remainder = value - value.floor();
    for _ in 0..MAX_CONTINUED_FRACTION_STEPS {
        let exact_numerator = denominator as f64 * value;
        if exact_numerator.round() == exact_numerator {
            break;
        }
        remainder = 1.0 / remainder;
        let next_denominator = match (remainder.floor() as u64)
            .checked_mul(denominator)
            .and_then(|x| x.checked_add(previous_denominator))
        {
            Some(next_denominator) if next_denominator <= max_denominator => next_denominator,
            _ => break,
        };
        previous_denominator = denominator;
        denominator = next_denominator;
        remainder -= remainder.floor();
    }
    let numerator = (denominator as f64 * value).round();
    if numerator > max_numerator as f64 {
        return None;
    }
    Some((numerator as u32, u32::try_from(denominator).ok()?))
}

impl Fraction {
    pub fn is_valid(&self) -> AvifResult<()> {
        match self.1 {
            0 => Err(AvifError::InvalidArgument),
            _ => Ok(()),
        }
    }

    pub fn as_f64(&self) -> AvifResult<f64> {
        self.is_valid()?;
        Ok(self.0 as f64 / self.1 as f64)
    }

    pub fn from_f64(value: f64) -> AvifResult<Self> {
        let (numerator, denominator) = approximate_unsigned(value.abs(), i32::MAX as u32)
            .ok_or(AvifError::InvalidArgument)?;
        let numerator = numerator as i32;
        Ok(Self(if value < 0.0 { -numerator } else { numerator }, denominator))
    }
}

impl UFraction {
    pub fn is_valid(&self) -> AvifResult<()> {
        match self.1 {
            0 => Err(AvifError::InvalidArgument),
            _ => Ok(()),
        }
    }

    pub fn as_f64(&self) -> AvifResult<f64> {
        self.is_valid()?;
        Ok(self.0 as f64 / self.1 as f64)
    }

    pub fn from_f64(value: f64) -> AvifResult<Self> {
        let (numerator, denominator) =
            approximate_unsigned(value, u32::MAX).ok_or(AvifError::InvalidArgument)?;
        Ok(Self(numerator, denominator))
    }
}

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

#[macro_use]
mod internal_utils;

pub mod codecs;
pub mod decoder;
#[cfg(feature = "encoder")]
pub mod encoder;
pub mod gainmap;
pub mod grid;
pub mod image;
pub mod reformat;
pub mod utils;

use image::Plane;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PixelFormat {
    #[default]
    None = 0,
    Yuv444 = 1,
    Yuv422 = 2,
    Yuv420 = 3,
    Yuv400 = 4,
}

impl PixelFormat {
    pub fn is_monochrome(&self) -> bool {
        *self == Self::Yuv400
    }

    pub fn plane_count(&self) -> usize {
        match self {
            PixelFormat::None => 0,
            PixelFormat::Yuv400 => 1,
            PixelFormat::Yuv420 | PixelFormat::Yuv422 | PixelFormat::Yuv444 => 3,
        }
    }

    pub fn chroma_shift_x(&self) -> u32 {
        match self {
            Self::Yuv422 | Self::Yuv420 => 1,
            _ => 0,
        }
    }

    pub fn apply_chroma_shift_x(&self, value: u32) -> u32 {
        (value + self.chroma_shift_x()) >> self.chroma_shift_x()
    }

    pub fn chroma_shift_y(&self) -> u32 {
        match self {
            Self::Yuv420 => 1,
            _ => 0,
        }
    }

    pub fn apply_chroma_shift_y(&self, value: u32) -> u32 {
        (value + self.chroma_shift_y()) >> self.chroma_shift_y()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Category {
    #[default]
    Color,
    Alpha,
    Gainmap,
}

impl Category {
    pub(crate) const COUNT: usize = 3;
    pub(crate) const ALL: [Category; Category::COUNT] = [Self::Color, Self::Alpha, Self::Gainmap];

    pub(crate) fn usize(self) -> usize {
        match self {
            Category::Color => 0,
            Category::Alpha => 1,
            Category::Gainmap => 2,
        }
    }

    pub fn planes(&self) -> &[Plane] {
        match self {
            Category::Alpha => &image::A_PLANE,
            _ => &image::YUV_PLANES,
        }
    }
}

// Values follow the CICP code points of ISO/IEC 23091-2.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorPrimaries {
    Unknown = 0,
    Srgb = 1,
    #[default]
    Unspecified = 2,
    Bt470m = 4,
    Bt470bg = 5,
    Bt601 = 6,
    Smpte240 = 7,
    GenericFilm = 8,
    Bt2020 = 9,
    Xyz = 10,
    Smpte431 = 11,
    Smpte432 = 12,
    Ebu3213 = 22,
}

impl From<u16> for ColorPrimaries {
    fn from(value: u16) -> Self {
        match value {
            1 => Self::Srgb,
            2 => Self::Unspecified,
            4 => Self::Bt470m,
            5 => Self::Bt470bg,
            6 => Self::Bt601,
            7 => Self::Smpte240,
            8 => Self::GenericFilm,
            9 => Self::Bt2020,
            10 => Self::Xyz,
            11 => Self::Smpte431,
            12 => Self::Smpte432,
            22 => Self::Ebu3213,
            _ => Self::Unknown,
        }
    }
}

#[allow(non_upper_case_globals)]
impl ColorPrimaries {
    pub const Bt709: Self = Self::Srgb;
    pub const Iec61966_2_4: Self = Self::Srgb;
    pub const Bt2100: Self = Self::Bt2020;
    pub const Dci_p3: Self = Self::Smpte432;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransferCharacteristics {
    Unknown = 0,
    Bt709 = 1,
    #[default]
    Unspecified = 2,
    Reserved = 3,
    Bt470m = 4,  // 2.2 gamma
    Bt470bg = 5, // 2.8 gamma
    Bt601 = 6,
    Smpte240 = 7,
    Linear = 8,
    Log100 = 9,
    Log100Sqrt10 = 10,
    Iec61966 = 11,
    Bt1361 = 12,
    Srgb = 13,
    Bt2020_10bit = 14,
    Bt2020_12bit = 15,
    Pq = 16, // Perceptual Quantizer (HDR); BT.2100 PQ
    Smpte428 = 17,
    Hlg = 18, // Hybrid Log-Gamma (HDR); ARIB STD-B67; BT.2100 HLG
}

impl From<u16> for TransferCharacteristics {
    fn from(value: u16) -> Self {
        match value {
            1 => Self::Bt709,
            2 => Self::Unspecified,
            3 => Self::Reserved,
            4 => Self::Bt470m,
            5 => Self::Bt470bg,
            6 => Self::Bt601,
            7 => Self::Smpte240,
            8 => Self::Linear,
            9 => Self::Log100,
            10 => Self::Log100Sqrt10,
            11 => Self::Iec61966,
            12 => Self::Bt1361,
            13 => Self::Srgb,
            14 => Self::Bt2020_10bit,
            15 => Self::Bt2020_12bit,
            16 => Self::Pq,
            17 => Self::Smpte428,
            18 => Self::Hlg,
            _ => Self::Unknown,
        }
    }
}

#[allow(non_upper_case_globals)]
impl TransferCharacteristics {
    pub const Smpte2084: Self = Self::Pq;

    pub fn is_hdr(&self) -> bool {
        matches!(self, Self::Pq | Self::Hlg)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatrixCoefficients {
    Identity = 0,
    Bt709 = 1,
    Unspecified = 2,
    Reserved = 3,
    Fcc = 4,
    Bt470bg = 5,
    #[default]
    Bt601 = 6,
    Smpte240 = 7,
    Ycgco = 8,
    Bt2020Ncl = 9,
    Bt2020Cl = 10,
    Smpte2085 = 11,
    ChromaDerivedNcl = 12,
    ChromaDerivedCl = 13,
    Ictcp = 14,
    YcgcoRe = 16,
    YcgcoRo = 17,
    Unknown = 18,
}

impl From<u16> for MatrixCoefficients {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Identity,
            1 => Self::Bt709,
            2 => Self::Unspecified,
            3 => Self::Reserved,
            4 => Self::Fcc,
            5 => Self::Bt470bg,
            6 => Self::Bt601,
            7 => Self::Smpte240,
            8 => Self::Ycgco,
            9 => Self::Bt2020Ncl,
            10 => Self::Bt2020Cl,
            11 => Self::Smpte2085,
            12 => Self::ChromaDerivedNcl,
            13 => Self::ChromaDerivedCl,
            14 => Self::Ictcp,
            16 => Self::YcgcoRe,
            17 => Self::YcgcoRo,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentLightLevelInformation {
    pub max_cll: u16,
    pub max_pall: u16,
}

impl ContentLightLevelInformation {
    pub fn is_empty(&self) -> bool {
        self.max_cll == 0 && self.max_pall == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AvifError {
    UnknownError(String),
    NoContent,
    ReformatFailed,
    UnsupportedDepth,
    EncodeColorFailed,
    EncodeAlphaFailed,
    EncodeGainMapFailed,
    DecodeColorFailed,
    DecodeAlphaFailed,
    DecodeGainMapFailed,
    InvalidImageGrid(String),
    InvalidGainMapMetadata(String),
    InvalidToneMappedImage(String),
    TruncatedData,
    IoNotSet,
    InvalidArgument,
    NotImplemented,
    OutOfMemory,
    NoImagesRemaining,
}

impl std::fmt::Display for AvifError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AvifError::UnknownError(msg) => write!(f, "internal error: {msg}"),
            AvifError::NoContent => write!(f, "no content"),
            AvifError::ReformatFailed => write!(f, "RGB/YUV conversion failed"),
            AvifError::UnsupportedDepth => write!(f, "unsupported bit depth"),
            AvifError::EncodeColorFailed => write!(f, "encoding the color planes failed"),
            AvifError::EncodeAlphaFailed => write!(f, "encoding the alpha plane failed"),
            AvifError::EncodeGainMapFailed => write!(f, "encoding the gain map planes failed"),
            AvifError::DecodeColorFailed => write!(f, "decoding the color planes failed"),
            AvifError::DecodeAlphaFailed => write!(f, "decoding the alpha plane failed"),
            AvifError::DecodeGainMapFailed => write!(f, "decoding the gain map planes failed"),
            AvifError::InvalidImageGrid(msg) => write!(f, "invalid image grid: {msg}"),
            AvifError::InvalidGainMapMetadata(msg) => {
                write!(f, "invalid gain map metadata: {msg}")
            }
            AvifError::InvalidToneMappedImage(msg) => {
                write!(f, "invalid tone mapped image payload: {msg}")
            }
            AvifError::TruncatedData => write!(f, "truncated data"),
            AvifError::IoNotSet => write!(f, "no container source was set"),
            AvifError::InvalidArgument => write!(f, "invalid argument"),
            AvifError::NotImplemented => write!(f, "not implemented"),
            AvifError::OutOfMemory => write!(f, "out of memory"),
            AvifError::NoImagesRemaining => write!(f, "no images remaining"),
        }
    }
}

impl std::error::Error for AvifError {}

pub type AvifResult<T> = Result<T, AvifError>;

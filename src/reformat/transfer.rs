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

//! Transfer curves between encoded samples in [0, 1] and linear light.
//!
//! Linear values are relative to SDR reference white: 1.0 is 203 nits for PQ and HLG, and the
//! nominal peak for every SDR curve.

use crate::*;

pub const SDR_WHITE_NITS: f32 = 203.0;
pub const PQ_MAX_NITS: f32 = 10000.0;
pub const HLG_PEAK_NITS: f32 = 1000.0;

const PQ_M1: f32 = 2610.0 / 16384.0;
const PQ_M2: f32 = 2523.0 / 4096.0 * 128.0;
const PQ_C1: f32 = 3424.0 / 4096.0;
const PQ_C2: f32 = 2413.0 / 4096.0 * 32.0;
const PQ_C3: f32 = 2392.0 / 4096.0 * 32.0;

const HLG_A: f32 = 0.17883277;
const HLG_B: f32 = 0.28466892;
const HLG_C: f32 = 0.55991073;
// System gamma of the HLG reference OOTF on a 1000 nit display.
const HLG_GAMMA: f32 = 1.2;

fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn srgb_from_linear(l: f32) -> f32 {
    if l <= 0.0031308 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

// BT.709, BT.601 and BT.2020 share this curve. The inverse OETF is used as the EOTF.
fn bt709_to_linear(v: f32) -> f32 {
    if v < 0.081 {
        v / 4.5
    } else {
        ((v + 0.099) / 1.099).powf(1.0 / 0.45)
    }
}

fn bt709_from_linear(l: f32) -> f32 {
    if l < 0.018 {
        l * 4.5
    } else {
        1.099 * l.powf(0.45) - 0.099
    }
}

fn smpte240_to_linear(v: f32) -> f32 {
    if v < 0.0913 {
        v / 4.0
    } else {
        ((v + 0.1115) / 1.1115).powf(1.0 / 0.45)
    }
}

fn smpte240_from_linear(l: f32) -> f32 {
    if l < 0.0228 {
        l * 4.0
    } else {
        1.1115 * l.powf(0.45) - 0.1115
    }
}

fn log100_to_linear(v: f32) -> f32 {
    if v <= 0.0 {
        0.0
    } else {
        10f32.powf(2.0 * (v - 1.0))
    }
}

fn log100_from_linear(l: f32) -> f32 {
    if l < 0.01 {
        0.0
    } else {
        1.0 + l.log10() / 2.0
    }
}

fn log100_sqrt10_to_linear(v: f32) -> f32 {
    if v <= 0.0 {
        0.0
    } else {
        10f32.powf(2.5 * (v - 1.0))
    }
}

fn log100_sqrt10_from_linear(l: f32) -> f32 {
    if l < 0.003_162_277_7 {
        0.0
    } else {
        1.0 + l.log10() / 2.5
    }
}

fn smpte428_to_linear(v: f32) -> f32 {
    v.max(0.0).powf(2.6) * 52.37 / 48.0
}

fn smpte428_from_linear(l: f32) -> f32 {
    (l.max(0.0) * 48.0 / 52.37).powf(1.0 / 2.6)
}

// Returns nits / PQ_MAX_NITS.
fn pq_eotf(v: f32) -> f32 {
    if v <= 0.0 {
        return 0.0;
    }
    let e = v.powf(1.0 / PQ_M2);
    let numerator = (e - PQ_C1).max(0.0);
    let denominator = PQ_C2 - PQ_C3 * e;
    if denominator <= 0.0 {
        return 1.0;
    }
    (numerator / denominator).powf(1.0 / PQ_M1)
}

fn pq_inverse_eotf(l: f32) -> f32 {
    if l <= 0.0 {
        return 0.0;
    }
    let y = l.min(1.0).powf(PQ_M1);
    ((PQ_C1 + PQ_C2 * y) / (1.0 + PQ_C3 * y)).powf(PQ_M2)
}

fn hlg_inverse_oetf(v: f32) -> f32 {
    if v <= 0.0 {
        0.0
    } else if v <= 0.5 {
        v * v / 3.0
    } else {
        (((v - HLG_C) / HLG_A).exp() + HLG_B) / 12.0
    }
}

fn hlg_oetf(l: f32) -> f32 {
    if l <= 0.0 {
        0.0
    } else if l <= 1.0 / 12.0 {
        (3.0 * l).sqrt()
    } else {
        HLG_A * (12.0 * l - HLG_B).ln() + HLG_C
    }
}

/// Converts an encoded sample in [0, 1] to linear light relative to SDR white.
pub fn to_linear(transfer_characteristics: TransferCharacteristics, v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    match transfer_characteristics {
        TransferCharacteristics::Bt709
        | TransferCharacteristics::Bt601
        | TransferCharacteristics::Bt2020_10bit
        | TransferCharacteristics::Bt2020_12bit => bt709_to_linear(v),
        TransferCharacteristics::Bt470m => v.powf(2.2),
        TransferCharacteristics::Bt470bg => v.powf(2.8),
        TransferCharacteristics::Smpte240 => smpte240_to_linear(v),
        TransferCharacteristics::Linear => v,
        TransferCharacteristics::Log100 => log100_to_linear(v),
        TransferCharacteristics::Log100Sqrt10 => log100_sqrt10_to_linear(v),
        TransferCharacteristics::Pq => pq_eotf(v) * PQ_MAX_NITS / SDR_WHITE_NITS,
        TransferCharacteristics::Hlg => {
            hlg_inverse_oetf(v).powf(HLG_GAMMA) * HLG_PEAK_NITS / SDR_WHITE_NITS
        }
        TransferCharacteristics::Smpte428 => smpte428_to_linear(v),
        // sRGB and unknown curves.
        _ => srgb_to_linear(v),
    }
}

/// Converts linear light relative to SDR white to an encoded sample in [0, 1]. Values outside of
/// the range of the curve are clamped.
pub fn from_linear(transfer_characteristics: TransferCharacteristics, l: f32) -> f32 {
    let l = l.max(0.0);
    let v = match transfer_characteristics {
        TransferCharacteristics::Bt709
        | TransferCharacteristics::Bt601
        | TransferCharacteristics::Bt2020_10bit
        | TransferCharacteristics::Bt2020_12bit => bt709_from_linear(l.min(1.0)),
        TransferCharacteristics::Bt470m => l.min(1.0).powf(1.0 / 2.2),
        TransferCharacteristics::Bt470bg => l.min(1.0).powf(1.0 / 2.8),
        TransferCharacteristics::Smpte240 => smpte240_from_linear(l.min(1.0)),
        TransferCharacteristics::Linear => l,
        TransferCharacteristics::Log100 => log100_from_linear(l.min(1.0)),
        TransferCharacteristics::Log100Sqrt10 => log100_sqrt10_from_linear(l.min(1.0)),
        TransferCharacteristics::Pq => pq_inverse_eotf(l * SDR_WHITE_NITS / PQ_MAX_NITS),
        TransferCharacteristics::Hlg => {
            hlg_oetf((l * SDR_WHITE_NITS / HLG_PEAK_NITS).min(1.0).powf(1.0 / HLG_GAMMA))
        }
        TransferCharacteristics::Smpte428 => smpte428_from_linear(l),
        _ => srgb_from_linear(l.min(1.0)),
    };
    v.clamp(0.0, 1.0)
}

/// Largest linear value that |transfer_characteristics| can encode.
pub fn max_linear(transfer_characteristics: TransferCharacteristics) -> f32 {
    match transfer_characteristics {
        TransferCharacteristics::Pq => PQ_MAX_NITS / SDR_WHITE_NITS,
        TransferCharacteristics::Hlg => HLG_PEAK_NITS / SDR_WHITE_NITS,
        _ => 1.0,
    }
}

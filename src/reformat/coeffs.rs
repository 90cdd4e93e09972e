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

fn kr_kb(matrix_coefficients: MatrixCoefficients) -> Option<(f32, f32)> {
    match matrix_coefficients {
        MatrixCoefficients::Bt709 => Some((0.2126, 0.0722)),
        MatrixCoefficients::Fcc => Some((0.30, 0.11)),
        MatrixCoefficients::Bt470bg | MatrixCoefficients::Bt601 => Some((0.299, 0.114)),
        MatrixCoefficients::Smpte240 => Some((0.212, 0.087)),
        MatrixCoefficients::Bt2020Ncl => Some((0.2627, 0.0593)),
        _ => None,
    }
}

/// Returns the (Kr, Kg, Kb) luma weights of |matrix_coefficients|, falling back to BT.601 for
/// matrices without fixed weights.
pub fn calculate_yuv_coefficients(matrix_coefficients: MatrixCoefficients) -> [f32; 3] {
    let (kr, kb) = kr_kb(matrix_coefficients).unwrap_or((0.299, 0.114));
    [kr, 1.0 - kr - kb, kb]
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    // Kr,Kg,Kb as https://en.wikipedia.org/wiki/YCbCr
    #[test_case(MatrixCoefficients::Bt601, [0.299, 0.587, 0.114])]
    #[test_case(MatrixCoefficients::Unspecified, [0.299, 0.587, 0.114] ; "falls back to bt601")]
    #[test_case(MatrixCoefficients::Smpte240, [0.212, 1.0 - 0.212 - 0.087, 0.087])]
    #[test_case(MatrixCoefficients::Bt2020Ncl, [0.2627, 0.678, 0.0593])]
    fn yuv_coefficients(matrix_coefficients: MatrixCoefficients, expected: [f32; 3]) {
        let coeffs = calculate_yuv_coefficients(matrix_coefficients);
        for i in 0..3 {
            assert!((coeffs[i] - expected[i]).abs() <= 1e-6);
        }
    }
}

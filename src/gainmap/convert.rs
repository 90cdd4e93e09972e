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

use crate::utils::*;
use crate::*;

/// Gain map parameters as floating point values. This is the form the gain map algorithms work
/// with; it is never stored.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GainMapMetadataFloat {
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub gamma: [f64; 3],
    pub base_offset: [f64; 3],
    pub alternate_offset: [f64; 3],
    pub base_hdr_headroom: f64,
    pub alternate_hdr_headroom: f64,
    pub backward_direction: bool,
    pub use_base_color_space: bool,
}

fn to_fraction(value: f64, field: &str, channel: usize) -> AvifResult<Fraction> {
    Fraction::from_f64(value).or_else(|_| {
        AvifError::invalid_gainmap_metadata(format!(
            "channel {channel}: {field} {value} cannot be represented as a fraction"
        ))
    })
}

fn to_ufraction(value: f64, field: &str) -> AvifResult<UFraction> {
    UFraction::from_f64(value).or_else(|_| {
        AvifError::invalid_gainmap_metadata(format!(
            "{field} {value} cannot be represented as an unsigned fraction"
        ))
    })
}

fn to_f64(fraction: Fraction, field: &str, channel: usize) -> AvifResult<f64> {
    fraction.as_f64().or_else(|_| {
        AvifError::invalid_gainmap_metadata(format!(
            "channel {channel}: {field} has a zero denominator"
        ))
    })
}

impl TryFrom<&GainMapMetadataFloat> for GainMapMetadata {
    type Error = AvifError;

    fn try_from(metadata: &GainMapMetadataFloat) -> AvifResult<Self> {
        let mut rational = GainMapMetadata {
            base_hdr_headroom: to_ufraction(metadata.base_hdr_headroom, "base headroom")?,
            alternate_hdr_headroom: to_ufraction(
                metadata.alternate_hdr_headroom,
                "alternate headroom",
            )?,
            backward_direction: metadata.backward_direction,
            use_base_color_space: metadata.use_base_color_space,
            ..Default::default()
        };
        for i in 0..3 {
            if !(metadata.gamma[i] > 0.0) {
                return AvifError::invalid_gainmap_metadata(format!(
                    "channel {i}: gamma {} is not positive",
                    metadata.gamma[i]
                ));
            }
            rational.min[i] = to_fraction(metadata.min[i], "min", i)?;
            rational.max[i] = to_fraction(metadata.max[i], "max", i)?;
            rational.gamma[i] = to_ufraction(metadata.gamma[i], "gamma")?;
            if rational.gamma[i].0 == 0 {
                return AvifError::invalid_gainmap_metadata(format!(
                    "channel {i}: gamma {} is too small",
                    metadata.gamma[i]
                ));
            }
            rational.base_offset[i] = to_fraction(metadata.base_offset[i], "base offset", i)?;
            rational.alternate_offset[i] =
                to_fraction(metadata.alternate_offset[i], "alternate offset", i)?;
        }
        Ok(rational)
    }
}

impl TryFrom<&GainMapMetadata> for GainMapMetadataFloat {
    type Error = AvifError;

    fn try_from(metadata: &GainMapMetadata) -> AvifResult<Self> {
        let mut float = GainMapMetadataFloat {
            base_hdr_headroom: metadata.base_hdr_headroom.as_f64().or_else(|_| {
                AvifError::invalid_gainmap_metadata("base headroom has a zero denominator")
            })?,
            alternate_hdr_headroom: metadata.alternate_hdr_headroom.as_f64().or_else(|_| {
                AvifError::invalid_gainmap_metadata("alternate headroom has a zero denominator")
            })?,
            backward_direction: metadata.backward_direction,
            use_base_color_space: metadata.use_base_color_space,
            ..Default::default()
        };
        for i in 0..3 {
            float.min[i] = to_f64(metadata.min[i], "min", i)?;
            float.max[i] = to_f64(metadata.max[i], "max", i)?;
            float.gamma[i] = metadata.gamma[i].as_f64().or_else(|_| {
                AvifError::invalid_gainmap_metadata(format!(
                    "channel {i}: gamma has a zero denominator"
                ))
            })?;
            float.base_offset[i] = to_f64(metadata.base_offset[i], "base offset", i)?;
            float.alternate_offset[i] =
                to_f64(metadata.alternate_offset[i], "alternate offset", i)?;
        }
        Ok(float)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use test_case::test_case;

    fn float_metadata() -> GainMapMetadataFloat {
        GainMapMetadataFloat {
            min: [1.0, 1.1, 1.2],
            max: [10.0, 10.1, 10.2],
            gamma: [1.0, 1.0, 1.2],
            base_offset: [1.0 / 32.0, 1.0 / 64.0, 1.0 / 128.0],
            alternate_offset: [0.004564, 0.0, 0.0],
            base_hdr_headroom: 1.0,
            alternate_hdr_headroom: 10.0,
            backward_direction: true,
            use_base_color_space: false,
        }
    }

    fn assert_near(a: &GainMapMetadataFloat, b: &GainMapMetadataFloat, epsilon: f64) {
        for i in 0..3 {
            assert!((a.min[i] - b.min[i]).abs() < epsilon);
            assert!((a.max[i] - b.max[i]).abs() < epsilon);
            assert!((a.gamma[i] - b.gamma[i]).abs() < epsilon);
            assert!((a.base_offset[i] - b.base_offset[i]).abs() < epsilon);
            assert!((a.alternate_offset[i] - b.alternate_offset[i]).abs() < epsilon);
        }
        assert!((a.base_hdr_headroom - b.base_hdr_headroom).abs() < epsilon);
        assert!((a.alternate_hdr_headroom - b.alternate_hdr_headroom).abs() < epsilon);
        assert_eq!(a.backward_direction, b.backward_direction);
        assert_eq!(a.use_base_color_space, b.use_base_color_space);
    }

    #[test]
    fn convert_metadata() -> AvifResult<()> {
        let metadata = float_metadata();
        let rational = GainMapMetadata::try_from(&metadata)?;
        assert_eq!(rational.base_offset[0], Fraction(1, 32));
        assert_eq!(rational.alternate_hdr_headroom, UFraction(10, 1));
        assert!(rational.is_valid().is_ok());
        let back = GainMapMetadataFloat::try_from(&rational)?;
        assert_near(&back, &metadata, 1e-6);
        Ok(())
    }

    #[test]
    fn random_metadata_round_trips() -> AvifResult<()> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x6761696e);
        for _ in 0..200 {
            let mut metadata = GainMapMetadataFloat {
                base_hdr_headroom: rng.gen_range(0.0..6.0),
                alternate_hdr_headroom: rng.gen_range(0.0..6.0),
                backward_direction: rng.gen(),
                use_base_color_space: rng.gen(),
                ..Default::default()
            };
            for i in 0..3 {
                metadata.min[i] = rng.gen_range(-8.0..0.0);
                metadata.max[i] = rng.gen_range(0.0..8.0);
                metadata.gamma[i] = rng.gen_range(0.1..4.0);
                metadata.base_offset[i] = rng.gen_range(-0.1..0.1);
                metadata.alternate_offset[i] = rng.gen_range(-0.1..0.1);
            }
            let rational = GainMapMetadata::try_from(&metadata)?;
            let back = GainMapMetadataFloat::try_from(&rational)?;
            assert_near(&back, &metadata, 1e-6);
        }
        Ok(())
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-1.0 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    fn invalid_gamma(gamma: f64) {
        let mut metadata = float_metadata();
        metadata.gamma[1] = gamma;
        assert!(matches!(
            GainMapMetadata::try_from(&metadata),
            Err(AvifError::InvalidGainMapMetadata(_))
        ));
    }

    #[test]
    fn out_of_range_values() {
        let mut metadata = float_metadata();
        metadata.max[0] = 1e10;
        assert!(GainMapMetadata::try_from(&metadata).is_err());
        let mut metadata = float_metadata();
        metadata.base_hdr_headroom = -1.0;
        assert!(GainMapMetadata::try_from(&metadata).is_err());
        let mut metadata = float_metadata();
        metadata.alternate_offset[2] = f64::INFINITY;
        assert!(GainMapMetadata::try_from(&metadata).is_err());
    }

    thread_local! {
        static ERRORS_LOGGED: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
    }

    // Counts the error records logged on the calling thread.
    struct ErrorCounter;

    impl log::Log for ErrorCounter {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if record.args().to_string().starts_with("returning error") {
                ERRORS_LOGGED.with(|count| count.set(count.get() + 1));
            }
        }

        fn flush(&self) {}
    }

    static ERROR_COUNTER: ErrorCounter = ErrorCounter;

    fn errors_logged() -> usize {
        static INSTALL: std::sync::Once = std::sync::Once::new();
        INSTALL.call_once(|| {
            let _ = log::set_logger(&ERROR_COUNTER);
            log::set_max_level(log::LevelFilter::Debug);
        });
        ERRORS_LOGGED.with(|count| count.get())
    }

    #[test]
    fn successful_conversion_logs_no_error() -> AvifResult<()> {
        let before = errors_logged();
        let rational = GainMapMetadata::try_from(&float_metadata())?;
        GainMapMetadataFloat::try_from(&rational)?;
        assert_eq!(errors_logged(), before);

        let mut metadata = float_metadata();
        metadata.max[0] = 1e10;
        assert!(GainMapMetadata::try_from(&metadata).is_err());
        assert_eq!(errors_logged(), before + 1);
        Ok(())
    }

    #[test]
    fn zero_denominator() -> AvifResult<()> {
        let mut rational = GainMapMetadata::try_from(&float_metadata())?;
        rational.base_offset[1].1 = 0;
        assert_eq!(
            GainMapMetadataFloat::try_from(&rational),
            Err(AvifError::InvalidGainMapMetadata(
                "channel 1: base offset has a zero denominator".into()
            ))
        );
        let mut rational = GainMapMetadata::try_from(&float_metadata())?;
        rational.alternate_hdr_headroom.1 = 0;
        assert!(GainMapMetadataFloat::try_from(&rational).is_err());
        Ok(())
    }
}

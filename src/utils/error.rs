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

// To be used instead of direct AvifError enum variants in order to surface
// unexpected Err propagations as early as possible in the call stack.
impl AvifError {
    fn on_error(self) -> Self {
        log::debug!("returning error: {self}");
        self
    }

    pub(crate) fn no_content<T>() -> AvifResult<T> {
        Err(AvifError::NoContent.on_error())
    }

    pub(crate) fn reformat_failed<T>() -> AvifResult<T> {
        Err(AvifError::ReformatFailed.on_error())
    }

    pub(crate) fn unsupported_depth<T>() -> AvifResult<T> {
        Err(AvifError::UnsupportedDepth.on_error())
    }

    pub(crate) fn truncated_data<T>() -> AvifResult<T> {
        Err(AvifError::TruncatedData.on_error())
    }

    pub(crate) fn invalid_argument<T>() -> AvifResult<T> {
        Err(AvifError::InvalidArgument.on_error())
    }

    pub(crate) fn not_implemented<T>() -> AvifResult<T> {
        Err(AvifError::NotImplemented.on_error())
    }

    pub(crate) fn io_not_set<T>() -> AvifResult<T> {
        Err(AvifError::IoNotSet.on_error())
    }

    pub(crate) fn no_images_remaining<T>() -> AvifResult<T> {
        Err(AvifError::NoImagesRemaining.on_error())
    }

    pub(crate) fn out_of_memory<T>() -> AvifResult<T> {
        Err(AvifError::OutOfMemory.on_error())
    }

    pub(crate) fn unknown_error<T>(message: impl Into<String>) -> AvifResult<T> {
        Err(AvifError::UnknownError(message.into()).on_error())
    }

    pub(crate) fn invalid_image_grid<T>(message: impl Into<String>) -> AvifResult<T> {
        Err(AvifError::InvalidImageGrid(message.into()).on_error())
    }

    pub(crate) fn invalid_gainmap_metadata<T>(message: impl Into<String>) -> AvifResult<T> {
        Err(AvifError::InvalidGainMapMetadata(message.into()).on_error())
    }

    pub(crate) fn invalid_tone_mapped_image<T>(message: impl Into<String>) -> AvifResult<T> {
        Err(AvifError::InvalidToneMappedImage(message.into()).on_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_carry_kind_and_message() {
        let err = AvifError::invalid_image_grid::<()>("cell 1: height 90 does not match 100")
            .unwrap_err();
        assert!(matches!(err, AvifError::InvalidImageGrid(_)));
        assert_eq!(
            err.to_string(),
            "invalid image grid: cell 1: height 90 does not match 100"
        );
        assert_eq!(AvifError::NoContent.to_string(), "no content");
    }
}

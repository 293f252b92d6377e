//! Generation parameters for the different tool input shapes.
//!
//! [`JobParams`] is generic over the file handle so the same value can
//! describe a request before upload (`UploadedMedia`) and after upload
//! (`RemoteFileReference`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::RemoteFileReference;

/// Maximum prompt length accepted by the tools, in characters.
pub const MAX_PROMPT_CHARS: usize = 2000;

/// The input variants accepted across tool pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobParams<F> {
    /// One image, no prompt (enhancement, upscale, background removal).
    SingleImage { image: F },
    /// Source face and target image (face swap, clothes swap).
    TwoImages { source: F, target: F },
    /// One image plus an instruction or motion prompt.
    ImageWithPrompt { image: F, prompt: String },
    /// Prompt only (text-to-image, text-to-video).
    TextOnly { prompt: String },
    /// Content and reference images with an optional prompt.
    ImagePair {
        first: F,
        second: F,
        prompt: Option<String>,
    },
}

/// Shape of a [`JobParams`] value, independent of its file handle type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputShape {
    SingleImage,
    TwoImages,
    ImageWithPrompt,
    TextOnly,
    ImagePair,
}

impl InputShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleImage => "single_image",
            Self::TwoImages => "two_images",
            Self::ImageWithPrompt => "image_with_prompt",
            Self::TextOnly => "text_only",
            Self::ImagePair => "image_pair",
        }
    }

    /// Number of files a request of this shape uploads.
    pub fn file_count(self) -> usize {
        match self {
            Self::TextOnly => 0,
            Self::SingleImage | Self::ImageWithPrompt => 1,
            Self::TwoImages | Self::ImagePair => 2,
        }
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<F> JobParams<F> {
    pub fn shape(&self) -> InputShape {
        match self {
            Self::SingleImage { .. } => InputShape::SingleImage,
            Self::TwoImages { .. } => InputShape::TwoImages,
            Self::ImageWithPrompt { .. } => InputShape::ImageWithPrompt,
            Self::TextOnly { .. } => InputShape::TextOnly,
            Self::ImagePair { .. } => InputShape::ImagePair,
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        match self {
            Self::ImageWithPrompt { prompt, .. } | Self::TextOnly { prompt } => Some(prompt),
            Self::ImagePair { prompt, .. } => prompt.as_deref(),
            Self::SingleImage { .. } | Self::TwoImages { .. } => None,
        }
    }

    /// Check prompt constraints and that the shape matches what the
    /// tool expects.
    pub fn validate(&self, expected: InputShape) -> Result<(), CoreError> {
        let actual = self.shape();
        if actual != expected {
            return Err(CoreError::ShapeMismatch {
                expected: expected.as_str(),
                actual: actual.as_str(),
            });
        }

        match self.prompt() {
            Some(prompt) => validate_prompt(prompt),
            None => Ok(()),
        }
    }

    /// File handles in upload order.
    pub fn files(&self) -> Vec<&F> {
        match self {
            Self::SingleImage { image } | Self::ImageWithPrompt { image, .. } => vec![image],
            Self::TwoImages { source, target } => vec![source, target],
            Self::ImagePair { first, second, .. } => vec![first, second],
            Self::TextOnly { .. } => Vec::new(),
        }
    }

    /// Borrow the file handles, keeping the shape and cloning prompts.
    pub fn borrowed(&self) -> JobParams<&F> {
        match self {
            Self::SingleImage { image } => JobParams::SingleImage { image },
            Self::TwoImages { source, target } => JobParams::TwoImages { source, target },
            Self::ImageWithPrompt { image, prompt } => JobParams::ImageWithPrompt {
                image,
                prompt: prompt.clone(),
            },
            Self::TextOnly { prompt } => JobParams::TextOnly {
                prompt: prompt.clone(),
            },
            Self::ImagePair {
                first,
                second,
                prompt,
            } => JobParams::ImagePair {
                first,
                second,
                prompt: prompt.clone(),
            },
        }
    }

    /// Convert every file handle, stopping at the first error.
    pub fn try_map_files<G, E>(
        self,
        mut f: impl FnMut(F) -> Result<G, E>,
    ) -> Result<JobParams<G>, E> {
        Ok(match self {
            Self::SingleImage { image } => JobParams::SingleImage { image: f(image)? },
            Self::TwoImages { source, target } => JobParams::TwoImages {
                source: f(source)?,
                target: f(target)?,
            },
            Self::ImageWithPrompt { image, prompt } => JobParams::ImageWithPrompt {
                image: f(image)?,
                prompt,
            },
            Self::TextOnly { prompt } => JobParams::TextOnly { prompt },
            Self::ImagePair {
                first,
                second,
                prompt,
            } => JobParams::ImagePair {
                first: f(first)?,
                second: f(second)?,
                prompt,
            },
        })
    }
}

/// Reject prompts that are blank or over [`MAX_PROMPT_CHARS`].
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".into()));
    }
    let chars = prompt.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(CoreError::Validation(format!(
            "Prompt is {chars} characters; the limit is {MAX_PROMPT_CHARS}"
        )));
    }
    Ok(())
}

/// A fully uploaded request ready for the submit endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    /// Tool action understood by the backend proxy, e.g. `image-to-video`.
    pub action: String,
    /// Optional RunningHub web-app identifier.
    pub webapp_id: Option<String>,
    pub params: JobParams<RemoteFileReference>,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn shape_matches_variant() {
        let params: JobParams<u8> = JobParams::ImagePair {
            first: 1,
            second: 2,
            prompt: None,
        };
        assert_eq!(params.shape(), InputShape::ImagePair);
        assert_eq!(params.shape().file_count(), 2);
    }

    #[test]
    fn files_follow_upload_order() {
        let params: JobParams<u8> = JobParams::TwoImages {
            source: 1,
            target: 2,
        };
        assert_eq!(params.files(), vec![&1, &2]);

        let text: JobParams<u8> = JobParams::TextOnly {
            prompt: "a cat".into(),
        };
        assert!(text.files().is_empty());
    }

    #[test]
    fn validate_rejects_wrong_shape() {
        let params: JobParams<u8> = JobParams::SingleImage { image: 1 };
        assert_matches!(
            params.validate(InputShape::TwoImages),
            Err(CoreError::ShapeMismatch {
                expected: "two_images",
                actual: "single_image",
            })
        );
    }

    #[test]
    fn validate_rejects_blank_prompt() {
        let params: JobParams<u8> = JobParams::TextOnly {
            prompt: "   ".into(),
        };
        assert_matches!(
            params.validate(InputShape::TextOnly),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn validate_rejects_overlong_prompt() {
        let params: JobParams<u8> = JobParams::ImageWithPrompt {
            image: 1,
            prompt: "a".repeat(MAX_PROMPT_CHARS + 1),
        };
        assert!(params.validate(InputShape::ImageWithPrompt).is_err());
    }

    #[test]
    fn optional_prompt_may_be_absent() {
        let params: JobParams<u8> = JobParams::ImagePair {
            first: 1,
            second: 2,
            prompt: None,
        };
        assert!(params.validate(InputShape::ImagePair).is_ok());
    }

    #[test]
    fn try_map_files_preserves_prompt() {
        let params: JobParams<u8> = JobParams::ImageWithPrompt {
            image: 7,
            prompt: "make it move".into(),
        };
        let mapped: JobParams<String> = params
            .try_map_files(|n| Ok::<_, ()>(format!("file-{n}")))
            .unwrap();
        assert_eq!(
            mapped,
            JobParams::ImageWithPrompt {
                image: "file-7".into(),
                prompt: "make it move".into(),
            }
        );
    }

    #[test]
    fn try_map_files_stops_at_first_error() {
        let params: JobParams<u8> = JobParams::TwoImages {
            source: 1,
            target: 2,
        };
        let mut seen = Vec::new();
        let result: Result<JobParams<u8>, &str> = params.try_map_files(|n| {
            seen.push(n);
            Err("boom")
        });
        assert_eq!(result, Err("boom"));
        assert_eq!(seen, vec![1]);
    }
}

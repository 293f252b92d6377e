//! User-selected media and the selection-time checks applied to it.
//!
//! Files are validated when they are selected, before any network
//! transfer: the content must sniff as an image. The 10 MiB size limit
//! is advisory only; callers log a warning but still upload.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Advisory upload size shown to users (10 MiB).
pub const SIZE_GUIDELINE_BYTES: usize = 10 * 1024 * 1024;

/// A local file chosen by the user, ready to be uploaded.
#[derive(Debug, Clone)]
pub struct UploadedMedia {
    file_name: String,
    mime_type: &'static str,
    bytes: Vec<u8>,
    preview_data_url: String,
}

impl UploadedMedia {
    /// Validate raw file content and build an upload candidate.
    ///
    /// The MIME type is derived from the magic bytes rather than the
    /// file name, so a renamed text file is still rejected.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, CoreError> {
        let file_name = file_name.into();

        if bytes.is_empty() {
            return Err(CoreError::Validation(format!("{file_name} is empty")));
        }

        let format = image::guess_format(&bytes).map_err(|_| {
            CoreError::Validation(format!("{file_name} is not a supported image file"))
        })?;
        let mime_type = format.to_mime_type();

        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let preview_data_url = format!("data:{mime_type};base64,{encoded}");

        Ok(Self {
            file_name,
            mime_type,
            bytes,
            preview_data_url,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Inline `data:` URL for previewing the selection.
    pub fn preview_data_url(&self) -> &str {
        &self.preview_data_url
    }

    /// Whether the file is larger than [`SIZE_GUIDELINE_BYTES`].
    pub fn exceeds_size_guideline(&self) -> bool {
        self.bytes.len() > SIZE_GUIDELINE_BYTES
    }
}

/// What kind of media a tool produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Image,
    Video,
}

impl ResultKind {
    /// Extension used when the result URL does not carry one.
    pub fn default_extension(self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Video => "mp4",
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn accepts_png_by_magic_bytes() {
        let media = UploadedMedia::from_bytes("photo.png", PNG_MAGIC.to_vec()).unwrap();
        assert_eq!(media.mime_type(), "image/png");
        assert!(media.preview_data_url().starts_with("data:image/png;base64,"));
        assert_eq!(media.size(), PNG_MAGIC.len());
    }

    #[test]
    fn accepts_jpeg_regardless_of_file_name() {
        let media = UploadedMedia::from_bytes("upload.bin", JPEG_MAGIC.to_vec()).unwrap();
        assert_eq!(media.mime_type(), "image/jpeg");
    }

    #[test]
    fn rejects_non_image_content() {
        let result = UploadedMedia::from_bytes("notes.png", b"hello world".to_vec());
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_empty_file() {
        let result = UploadedMedia::from_bytes("empty.png", Vec::new());
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn size_guideline_is_advisory() {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(SIZE_GUIDELINE_BYTES + 1, 0);
        let media = UploadedMedia::from_bytes("big.png", bytes).unwrap();
        assert!(media.exceeds_size_guideline());
    }

    #[test]
    fn default_extensions() {
        assert_eq!(ResultKind::Image.default_extension(), "png");
        assert_eq!(ResultKind::Video.default_extension(), "mp4");
    }
}

//! Catalogue of the media tools and their polling configuration.
//!
//! Every tool page runs the same upload/submit/poll pipeline; what
//! differs is the input shape, the kind of result, how often the
//! status endpoint is polled and how long users are expected to wait.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::CoreError;
use crate::media::ResultKind;
use crate::params::InputShape;
use crate::polling::PollPolicy;
use crate::progress::CurvePreset;

// ---------------------------------------------------------------------------
// Poll cadence
// ---------------------------------------------------------------------------

/// Image tools poll every 2 seconds.
pub const IMAGE_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Video tools poll every 5 seconds.
pub const VIDEO_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// 30 minutes at the video interval.
pub const VIDEO_MAX_ATTEMPTS: u32 = 360;
/// 10 minutes for single-pass image filters.
pub const QUICK_IMAGE_MAX_ATTEMPTS: u32 = 300;
/// 12 minutes for diffusion-based image tools.
pub const IMAGE_MAX_ATTEMPTS: u32 = 360;

// ---------------------------------------------------------------------------
// Tool kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    ImageToVideo,
    TextToVideo,
    ImageEnhance,
    ImageUpscale,
    PhotoRestore,
    Colorize,
    BackgroundRemoval,
    FaceSwap,
    ClothesSwap,
    StyleTransfer,
    TextToImage,
    ImageEdit,
    AnimePortrait,
    ProductShot,
    ObjectRemoval,
}

impl ToolKind {
    pub const ALL: [ToolKind; 15] = [
        Self::ImageToVideo,
        Self::TextToVideo,
        Self::ImageEnhance,
        Self::ImageUpscale,
        Self::PhotoRestore,
        Self::Colorize,
        Self::BackgroundRemoval,
        Self::FaceSwap,
        Self::ClothesSwap,
        Self::StyleTransfer,
        Self::TextToImage,
        Self::ImageEdit,
        Self::AnimePortrait,
        Self::ProductShot,
        Self::ObjectRemoval,
    ];

    /// URL-style slug, also used as the backend `action`.
    pub fn slug(self) -> &'static str {
        match self {
            Self::ImageToVideo => "image-to-video",
            Self::TextToVideo => "text-to-video",
            Self::ImageEnhance => "image-enhance",
            Self::ImageUpscale => "image-upscale",
            Self::PhotoRestore => "photo-restore",
            Self::Colorize => "colorize",
            Self::BackgroundRemoval => "background-removal",
            Self::FaceSwap => "face-swap",
            Self::ClothesSwap => "clothes-swap",
            Self::StyleTransfer => "style-transfer",
            Self::TextToImage => "text-to-image",
            Self::ImageEdit => "image-edit",
            Self::AnimePortrait => "anime-portrait",
            Self::ProductShot => "product-shot",
            Self::ObjectRemoval => "object-removal",
        }
    }

    pub fn profile(self) -> ToolProfile {
        use InputShape::*;

        let (input, output, interval, max_attempts, curve) = match self {
            Self::ImageToVideo => (
                ImageWithPrompt,
                ResultKind::Video,
                VIDEO_POLL_INTERVAL,
                VIDEO_MAX_ATTEMPTS,
                CurvePreset::Video,
            ),
            Self::TextToVideo => (
                TextOnly,
                ResultKind::Video,
                VIDEO_POLL_INTERVAL,
                VIDEO_MAX_ATTEMPTS,
                CurvePreset::Video,
            ),
            Self::ImageEnhance
            | Self::ImageUpscale
            | Self::PhotoRestore
            | Self::Colorize
            | Self::BackgroundRemoval => (
                SingleImage,
                ResultKind::Image,
                IMAGE_POLL_INTERVAL,
                QUICK_IMAGE_MAX_ATTEMPTS,
                CurvePreset::QuickImage,
            ),
            Self::AnimePortrait => (
                SingleImage,
                ResultKind::Image,
                IMAGE_POLL_INTERVAL,
                IMAGE_MAX_ATTEMPTS,
                CurvePreset::StandardImage,
            ),
            Self::FaceSwap => (
                TwoImages,
                ResultKind::Image,
                IMAGE_POLL_INTERVAL,
                IMAGE_MAX_ATTEMPTS,
                CurvePreset::StandardImage,
            ),
            Self::ClothesSwap => (
                TwoImages,
                ResultKind::Image,
                VIDEO_POLL_INTERVAL,
                180,
                CurvePreset::StandardImage,
            ),
            Self::StyleTransfer | Self::ProductShot => (
                ImagePair,
                ResultKind::Image,
                IMAGE_POLL_INTERVAL,
                IMAGE_MAX_ATTEMPTS,
                CurvePreset::StandardImage,
            ),
            Self::TextToImage => (
                TextOnly,
                ResultKind::Image,
                IMAGE_POLL_INTERVAL,
                IMAGE_MAX_ATTEMPTS,
                CurvePreset::StandardImage,
            ),
            Self::ImageEdit | Self::ObjectRemoval => (
                ImageWithPrompt,
                ResultKind::Image,
                IMAGE_POLL_INTERVAL,
                IMAGE_MAX_ATTEMPTS,
                CurvePreset::StandardImage,
            ),
        };

        ToolProfile {
            kind: self,
            action: self.slug().to_string(),
            input,
            output,
            policy: PollPolicy::new(interval, max_attempts),
            curve,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ToolKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| CoreError::UnknownTool(s.to_string()))
    }
}

/// Everything the pipeline needs to know about one tool.
#[derive(Debug, Clone)]
pub struct ToolProfile {
    pub kind: ToolKind,
    /// Action name sent to the submit endpoint.
    pub action: String,
    pub input: InputShape,
    pub output: ResultKind,
    pub policy: PollPolicy,
    pub curve: CurvePreset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_round_trip_through_from_str() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.slug().parse::<ToolKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_slug_is_rejected() {
        assert!(matches!(
            "hair-dye".parse::<ToolKind>(),
            Err(CoreError::UnknownTool(s)) if s == "hair-dye"
        ));
    }

    #[test]
    fn video_tools_poll_for_thirty_minutes() {
        let profile = ToolKind::ImageToVideo.profile();
        assert_eq!(profile.output, ResultKind::Video);
        assert_eq!(profile.policy.interval, VIDEO_POLL_INTERVAL);
        assert_eq!(profile.policy.time_budget(), Duration::from_secs(1800));
    }

    #[test]
    fn ceilings_stay_in_observed_range() {
        for kind in ToolKind::ALL {
            let policy = kind.profile().policy;
            assert!(
                (120..=360).contains(&policy.max_attempts),
                "{kind} has ceiling {}",
                policy.max_attempts
            );
            let budget = policy.time_budget();
            assert!(budget >= Duration::from_secs(600) && budget <= Duration::from_secs(1800));
        }
    }

    #[test]
    fn pair_tools_take_two_files() {
        assert_eq!(ToolKind::FaceSwap.profile().input.file_count(), 2);
        assert_eq!(ToolKind::StyleTransfer.profile().input.file_count(), 2);
        assert_eq!(ToolKind::TextToImage.profile().input.file_count(), 0);
    }

    #[test]
    fn action_matches_slug() {
        assert_eq!(ToolKind::ImageEnhance.profile().action, "image-enhance");
    }
}

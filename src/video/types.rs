//! Core types for image-to-video animation.

use crate::error::Result;
use crate::image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Aspect ratios accepted by the video synthesis endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoAspectRatio {
    /// 9:16 portrait.
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    /// 16:9 landscape.
    #[serde(rename = "16:9")]
    Landscape,
}

impl VideoAspectRatio {
    /// Returns the aspect ratio as a string (e.g., "9:16").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
        }
    }
}

impl std::fmt::Display for VideoAspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VideoAspectRatio {
    type Err = crate::error::VibeGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "9:16" => Ok(Self::Portrait),
            "16:9" => Ok(Self::Landscape),
            other => Err(crate::error::VibeGenError::InvalidRequest(format!(
                "unsupported video aspect ratio: {other} (use 9:16 or 16:9)"
            ))),
        }
    }
}

/// Phases an animation job moves through, with the human-readable status
/// strings shown to the user at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    /// The job has been submitted to the remote service.
    Submitted,
    /// The remote service is rendering the video.
    Processing,
    /// The job finished; the result is being resolved.
    Finalizing,
    /// The finished video is being downloaded.
    Fetching,
}

impl std::fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::Submitted => "Starting video generation...",
            Self::Processing => "Processing your video... This may take a few minutes.",
            Self::Finalizing => "Finalizing video...",
            Self::Fetching => "Fetching video...",
        };
        write!(f, "{}", msg)
    }
}

/// Callback invoked on each phase transition of an animation job.
pub type ProgressCallback = dyn Fn(GenerationPhase) + Send + Sync;

/// Metadata about the video generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Wall-clock generation duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Video resolution.
    pub resolution: Option<String>,
}

/// A request to animate a source image into a short video.
#[derive(Debug, Clone)]
pub struct AnimationRequest {
    /// Raw bytes of the source image (first frame).
    pub image: Vec<u8>,
    /// MIME type of the source image; detected from magic bytes when absent.
    pub mime_type: Option<String>,
    /// The text prompt describing the desired motion.
    pub prompt: String,
    /// Aspect ratio for the generated video.
    pub aspect_ratio: VideoAspectRatio,
    /// Token that aborts the poll loop when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl AnimationRequest {
    /// Creates a new request from a source image and prompt.
    pub fn new(image: Vec<u8>, prompt: impl Into<String>) -> Self {
        Self {
            image,
            mime_type: None,
            prompt: prompt.into(),
            aspect_ratio: VideoAspectRatio::default(),
            cancel: None,
        }
    }

    /// Sets an explicit MIME type, bypassing magic-byte detection.
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: VideoAspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Attaches a cancellation token; cancelling it aborts polling.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the MIME type to send, detecting it from the bytes if needed.
    pub fn resolved_mime_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .unwrap_or_else(|| ImageFormat::mime_from_bytes(&self.image, "image/png"))
    }
}

/// A generated video with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated video should be saved or processed"]
pub struct GeneratedVideo {
    /// Raw video bytes.
    pub data: Vec<u8>,
    /// MIME type (e.g., "video/mp4").
    pub mime_type: String,
    /// Generation metadata.
    pub metadata: VideoMetadata,
}

impl GeneratedVideo {
    /// Creates a new generated video.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, metadata: VideoMetadata) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            metadata,
        }
    }

    /// Returns the size of the video data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the video to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the video data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the video as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_aspect_ratio_round_trip() {
        for ratio in ["9:16", "16:9"] {
            let parsed: VideoAspectRatio = ratio.parse().unwrap();
            assert_eq!(parsed.as_str(), ratio);
        }
        // Image-only ratios are not valid for video
        assert!("1:1".parse::<VideoAspectRatio>().is_err());
        assert!("4:3".parse::<VideoAspectRatio>().is_err());
    }

    #[test]
    fn test_phase_status_strings() {
        assert_eq!(
            GenerationPhase::Submitted.to_string(),
            "Starting video generation..."
        );
        assert_eq!(
            GenerationPhase::Processing.to_string(),
            "Processing your video... This may take a few minutes."
        );
        assert_eq!(
            GenerationPhase::Finalizing.to_string(),
            "Finalizing video..."
        );
        assert_eq!(GenerationPhase::Fetching.to_string(), "Fetching video...");
    }

    #[test]
    fn test_animation_request_mime_detection() {
        let png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let req = AnimationRequest::new(png, "slow zoom out");
        assert_eq!(req.resolved_mime_type(), "image/png");
        assert_eq!(req.aspect_ratio, VideoAspectRatio::Portrait);
        assert!(req.cancel.is_none());
    }

    #[test]
    fn test_generated_video_data_url() {
        let video = GeneratedVideo::new(vec![1, 2, 3], "video/mp4", VideoMetadata::default());
        assert_eq!(video.to_data_url(), "data:video/mp4;base64,AQID");
        assert_eq!(video.size(), 3);
    }
}

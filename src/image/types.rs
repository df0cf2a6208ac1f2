//! Core types for wallpaper generation and editing.

use crate::error::{Result, VibeGenError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prompt decoration applied to every wallpaper request.
const WALLPAPER_PROMPT_PREFIX: &str = "phone wallpaper, ";
const WALLPAPER_PROMPT_SUFFIX: &str = ", high-resolution, cinematic, detailed";

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG format (what Imagen returns for wallpapers).
    #[default]
    Jpeg,
    /// PNG format (lossless).
    Png,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }

    /// Detects a MIME type from raw bytes, with a fallback for unknown data.
    pub fn mime_from_bytes(data: &[u8], fallback: &'static str) -> &'static str {
        Self::from_magic_bytes(data)
            .map(|f| f.mime_type())
            .unwrap_or(fallback)
    }
}

/// Aspect ratios accepted by the image synthesis endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 9:16 portrait, the natural phone-wallpaper shape.
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    /// 16:9 landscape.
    #[serde(rename = "16:9")]
    Landscape,
    /// 1:1 square.
    #[serde(rename = "1:1")]
    Square,
    /// 4:3 standard landscape.
    #[serde(rename = "4:3")]
    Standard,
    /// 3:4 standard portrait.
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    /// Returns the aspect ratio as a string (e.g., "9:16").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
            Self::Square => "1:1",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = VibeGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "9:16" => Ok(Self::Portrait),
            "16:9" => Ok(Self::Landscape),
            "1:1" => Ok(Self::Square),
            "4:3" => Ok(Self::Standard),
            "3:4" => Ok(Self::StandardPortrait),
            other => Err(VibeGenError::InvalidRequest(format!(
                "unsupported aspect ratio: {other}"
            ))),
        }
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Whether safety filters were applied.
    pub safety_filtered: bool,
}

/// A request to generate a batch of wallpapers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallpaperRequest {
    /// The user's prompt describing the desired wallpaper.
    pub prompt: String,
    /// Aspect ratio for the generated images.
    pub aspect_ratio: AspectRatio,
    /// Number of images to generate per request.
    pub count: u32,
}

impl WallpaperRequest {
    /// Creates a new request with the given prompt, 9:16 ratio and a batch
    /// of four images.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::default(),
            count: 4,
        }
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Sets the number of images to generate.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Returns the prompt with the wallpaper style decoration applied.
    pub fn styled_prompt(&self) -> String {
        format!(
            "{}{}{}",
            WALLPAPER_PROMPT_PREFIX, self.prompt, WALLPAPER_PROMPT_SUFFIX
        )
    }
}

/// A request to edit an existing image with a text instruction.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Raw bytes of the source image.
    pub image: Vec<u8>,
    /// MIME type of the source image; detected from magic bytes when absent.
    pub mime_type: Option<String>,
    /// The editing instruction (e.g. "make it black and white").
    pub instruction: String,
}

impl EditRequest {
    /// Creates a new edit request.
    pub fn new(image: Vec<u8>, instruction: impl Into<String>) -> Self {
        Self {
            image,
            mime_type: None,
            instruction: instruction.into(),
        }
    }

    /// Sets an explicit MIME type, bypassing magic-byte detection.
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Returns the MIME type to send, detecting it from the bytes if needed.
    pub fn resolved_mime_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .unwrap_or_else(|| ImageFormat::mime_from_bytes(&self.image, "image/png"))
    }
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(data: Vec<u8>, format: ImageFormat, metadata: GenerationMetadata) -> Self {
        Self {
            data,
            format,
            metadata,
        }
    }

    /// Creates a new generated image, detecting format from magic bytes.
    pub fn from_bytes(data: Vec<u8>, metadata: GenerationMetadata) -> Result<Self> {
        let format = ImageFormat::from_magic_bytes(&data)
            .ok_or_else(|| VibeGenError::Decode("Unknown image format".into()))?;
        Ok(Self::new(data, format, metadata))
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            self.to_base64()
        )
    }
}

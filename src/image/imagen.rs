//! Imagen wallpaper synthesis client.
//!
//! Talks to the `:predict` endpoint of the Gemini Developer API and returns
//! a batch of generated images.

use crate::error::{classify_google_error, Result, VibeGenError};
use crate::image::types::{GeneratedImage, GenerationMetadata, ImageFormat, WallpaperRequest};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Imagen model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImagenModel {
    /// Imagen 4 - Google's text-to-image model.
    #[default]
    Imagen4,
}

impl ImagenModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imagen4 => "imagen-4.0-generate-001",
        }
    }
}

/// Builder for [`ImagenClient`].
#[derive(Debug, Clone, Default)]
pub struct ImagenClientBuilder {
    api_key: Option<String>,
    model: ImagenModel,
}

impl ImagenClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Imagen model variant.
    pub fn model(mut self, model: ImagenModel) -> Self {
        self.model = model;
        self
    }

    /// Builds the client, resolving the API key.
    pub fn build(self) -> Result<ImagenClient> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .ok_or_else(|| {
                VibeGenError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        Ok(ImagenClient {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
        })
    }
}

/// Imagen wallpaper synthesis client.
pub struct ImagenClient {
    client: reqwest::Client,
    api_key: String,
    model: ImagenModel,
}

impl ImagenClient {
    /// Creates a new `ImagenClientBuilder`.
    pub fn builder() -> ImagenClientBuilder {
        ImagenClientBuilder::new()
    }

    /// Generates a batch of wallpapers for the request.
    ///
    /// An empty prediction list means the prompt was rejected by the remote
    /// content policy and maps to [`VibeGenError::ContentBlocked`].
    pub async fn generate(&self, request: &WallpaperRequest) -> Result<Vec<GeneratedImage>> {
        let start = Instant::now();

        let url = format!("{}/models/{}:predict", API_BASE, self.model.as_str());
        let body = ImagenRequest::from_wallpaper_request(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_google_error(status.as_u16(), &text, &headers));
        }

        let imagen_response: ImagenResponse = response.json().await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        decode_predictions(imagen_response, self.model, duration_ms)
    }
}

/// Decodes a prediction batch into generated images.
///
/// An empty prediction list is the remote signal for a prompt rejected by
/// the content policy and maps to [`VibeGenError::ContentBlocked`].
fn decode_predictions(
    response: ImagenResponse,
    model: ImagenModel,
    duration_ms: u64,
) -> Result<Vec<GeneratedImage>> {
    if response.predictions.is_empty() {
        return Err(VibeGenError::ContentBlocked(
            "No images were generated. The prompt may have been blocked.".into(),
        ));
    }

    response
        .predictions
        .into_iter()
        .map(|prediction| {
            let data = base64::engine::general_purpose::STANDARD
                .decode(&prediction.bytes_base64_encoded)
                .map_err(|e| VibeGenError::Decode(e.to_string()))?;

            let format = prediction
                .mime_type
                .as_deref()
                .and_then(mime_to_format)
                .or_else(|| ImageFormat::from_magic_bytes(&data))
                .unwrap_or(ImageFormat::Jpeg);

            Ok(GeneratedImage::new(
                data,
                format,
                GenerationMetadata {
                    model: Some(model.as_str().to_string()),
                    duration_ms: Some(duration_ms),
                    safety_filtered: false,
                },
            ))
        })
        .collect()
}

fn mime_to_format(mime: &str) -> Option<ImageFormat> {
    match mime {
        "image/jpeg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ImagenRequest {
    instances: Vec<ImagenInstance>,
    parameters: ImagenParameters,
}

#[derive(Debug, Serialize)]
struct ImagenInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_mime_type: String,
}

impl ImagenRequest {
    fn from_wallpaper_request(req: &WallpaperRequest) -> Self {
        Self {
            instances: vec![ImagenInstance {
                prompt: req.styled_prompt(),
            }],
            parameters: ImagenParameters {
                sample_count: req.count,
                aspect_ratio: req.aspect_ratio.as_str().to_string(),
                output_mime_type: "image/jpeg".to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImagenResponse {
    #[serde(default)]
    predictions: Vec<ImagenPrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagenPrediction {
    bytes_base64_encoded: String,
    #[serde(default)]
    mime_type: Option<String>,
}

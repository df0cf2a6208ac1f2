//! Gemini image editing client.
//!
//! Sends a source image plus a text instruction to `generateContent` and
//! returns the single edited image.

use crate::error::{classify_google_error, Result, VibeGenError};
use crate::image::types::{EditRequest, GeneratedImage, GenerationMetadata, ImageFormat};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini editing model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditorModel {
    /// Gemini 2.5 Flash Image (fast, economical).
    #[default]
    Flash,
}

impl EditorModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flash => "gemini-2.5-flash-image",
        }
    }
}

/// Builder for [`ImageEditor`].
#[derive(Debug, Clone, Default)]
pub struct ImageEditorBuilder {
    api_key: Option<String>,
    model: EditorModel,
}

impl ImageEditorBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the editing model variant.
    pub fn model(mut self, model: EditorModel) -> Self {
        self.model = model;
        self
    }

    /// Builds the editor, resolving the API key.
    pub fn build(self) -> Result<ImageEditor> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .ok_or_else(|| {
                VibeGenError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        Ok(ImageEditor {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
        })
    }
}

/// Gemini image editing client.
pub struct ImageEditor {
    client: reqwest::Client,
    api_key: String,
    model: EditorModel,
}

impl ImageEditor {
    /// Creates a new `ImageEditorBuilder`.
    pub fn builder() -> ImageEditorBuilder {
        ImageEditorBuilder::new()
    }

    /// Applies the edit instruction to the source image.
    ///
    /// A response without image data means the instruction was rejected by
    /// the remote content policy and maps to
    /// [`VibeGenError::ContentBlocked`].
    pub async fn edit(&self, request: &EditRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let url = format!("{}/models/{}:generateContent", API_BASE, self.model.as_str());
        let body = EditWireRequest::from_edit_request(request);

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

        let edit_response: EditWireResponse = response.json().await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        extract_edited_image(edit_response, self.model, duration_ms)
    }
}

/// Extracts the edited image from a decoded response.
///
/// The service reports content-policy rejections in several shapes, all
/// over HTTP 200: `promptFeedback.blockReason`, a safety `finishReason` on
/// the candidate, or simply no `inlineData` part. Each one maps to
/// [`VibeGenError::ContentBlocked`].
fn extract_edited_image(
    response: EditWireResponse,
    model: EditorModel,
    duration_ms: u64,
) -> Result<GeneratedImage> {
    if let Some(ref feedback) = response.prompt_feedback {
        if let Some(ref reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .clone()
                .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
            return Err(VibeGenError::ContentBlocked(msg));
        }
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        VibeGenError::ContentBlocked(
            "Image editing returned no image. The prompt may have been blocked.".into(),
        )
    })?;

    if let Some(ref finish_reason) = candidate.finish_reason {
        match finish_reason.as_str() {
            "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST" => {
                return Err(VibeGenError::ContentBlocked(format!(
                    "Edit blocked by safety filter: {}",
                    finish_reason
                )));
            }
            _ => {} // STOP, MAX_TOKENS, etc. are normal
        }
    }

    let inline_data = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .find_map(|p| p.inline_data)
        .ok_or_else(|| {
            VibeGenError::ContentBlocked(
                "Image editing returned no image. The prompt may have been blocked.".into(),
            )
        })?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(&inline_data.data)
        .map_err(|e| VibeGenError::Decode(e.to_string()))?;

    let format = match inline_data.mime_type.as_str() {
        "image/jpeg" => ImageFormat::Jpeg,
        "image/webp" => ImageFormat::WebP,
        _ => ImageFormat::Png,
    };

    Ok(GeneratedImage::new(
        data,
        format,
        GenerationMetadata {
            model: Some(model.as_str().to_string()),
            duration_ms: Some(duration_ms),
            safety_filtered: false,
        },
    ))
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditWireRequest {
    contents: Vec<EditContent>,
    generation_config: EditConfig,
}

#[derive(Debug, Serialize)]
struct EditContent {
    parts: Vec<EditRequestPart>,
}

/// A part in an edit request: the source image or the instruction text.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EditRequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: EditInlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditConfig {
    response_modalities: Vec<String>,
}

impl EditWireRequest {
    fn from_edit_request(req: &EditRequest) -> Self {
        let parts = vec![
            EditRequestPart::InlineData {
                inline_data: EditInlineData {
                    mime_type: req.resolved_mime_type().to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(&req.image),
                },
            },
            EditRequestPart::Text {
                text: req.instruction.clone(),
            },
        ];

        Self {
            contents: vec![EditContent { parts }],
            generation_config: EditConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditWireResponse {
    #[serde(default)]
    candidates: Vec<EditCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditCandidate {
    #[serde(default)]
    content: Option<EditContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EditContentResponse {
    #[serde(default)]
    parts: Vec<EditPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

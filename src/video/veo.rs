//! Veo image-to-video animation client.
//!
//! Video synthesis is asynchronous on the remote side: submission returns an
//! operation handle which is polled on a fixed interval until the service
//! reports completion, then the result video is downloaded.

use crate::error::{classify_google_error, Result, VibeGenError};
use crate::video::types::{
    AnimationRequest, GeneratedVideo, GenerationPhase, ProgressCallback, VideoMetadata,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Veo model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VeoModel {
    /// Veo 3.1 Fast Preview - quick image-to-video generation.
    #[default]
    Veo31FastPreview,
}

impl VeoModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Veo31FastPreview => "veo-3.1-fast-generate-preview",
        }
    }
}

/// Builder for [`VeoClient`].
#[derive(Clone)]
pub struct VeoClientBuilder {
    api_key: Option<String>,
    model: VeoModel,
    poll_interval: Duration,
    timeout: Duration,
    progress: Option<Arc<ProgressCallback>>,
}

impl Default for VeoClientBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            model: VeoModel::default(),
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(600), // 10 minutes for video
            progress: None,
        }
    }
}

impl VeoClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Veo model variant.
    pub fn model(mut self, model: VeoModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the polling interval for async generation.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum time to wait for generation.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets a callback invoked at each phase transition.
    pub fn on_progress(
        mut self,
        callback: impl Fn(GenerationPhase) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Builds the client, resolving the API key.
    pub fn build(self) -> Result<VeoClient> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .ok_or_else(|| {
                VibeGenError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        Ok(VeoClient {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
            poll_interval: self.poll_interval,
            timeout: self.timeout,
            progress: self.progress,
        })
    }
}

/// Veo image-to-video animation client.
pub struct VeoClient {
    client: reqwest::Client,
    api_key: String,
    model: VeoModel,
    poll_interval: Duration,
    timeout: Duration,
    progress: Option<Arc<ProgressCallback>>,
}

impl VeoClient {
    /// Creates a new `VeoClientBuilder`.
    pub fn builder() -> VeoClientBuilder {
        VeoClientBuilder::new()
    }

    /// Animates the source image into a video.
    ///
    /// Submits the job, polls until the remote operation reports done, then
    /// downloads the result. Phase transitions are reported through the
    /// builder's progress callback.
    pub async fn animate(&self, request: &AnimationRequest) -> Result<GeneratedVideo> {
        let start = std::time::Instant::now();

        self.report(GenerationPhase::Submitted);
        let operation = self.submit(request).await?;
        tracing::debug!(operation = %operation.name, "submitted animation request");

        self.report(GenerationPhase::Processing);
        let name = operation.name.clone();
        let terminal = poll_until_done(
            operation,
            || self.fetch_status(&name),
            self.poll_interval,
            self.timeout,
            request.cancel.as_ref(),
        )
        .await?;

        self.report(GenerationPhase::Finalizing);
        let video_uri = extract_video_uri(terminal)?;
        tracing::debug!(uri = %video_uri, "video generation complete");

        self.report(GenerationPhase::Fetching);
        let data = self.download(&video_uri).await?;

        let duration_ms = start.elapsed().as_millis() as u64;

        Ok(GeneratedVideo::new(
            data,
            "video/mp4",
            VideoMetadata {
                model: Some(self.model.as_str().to_string()),
                duration_ms: Some(duration_ms),
                resolution: Some("720p".to_string()),
            },
        ))
    }

    fn report(&self, phase: GenerationPhase) {
        tracing::debug!(?phase, "animation phase transition");
        if let Some(ref callback) = self.progress {
            callback(phase);
        }
    }

    /// Submits an animation request, returning the initial operation state.
    async fn submit(&self, request: &AnimationRequest) -> Result<VeoOperation> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            API_BASE,
            self.model.as_str(),
        );
        let body = VeoWireRequest::from_animation_request(request);

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

        Ok(response.json().await?)
    }

    /// Queries the current state of an in-flight operation.
    async fn fetch_status(&self, operation_name: &str) -> Result<VeoOperation> {
        let url = format!("{}/{}", API_BASE, operation_name);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_google_error(status.as_u16(), &text, &headers));
        }

        Ok(response.json().await?)
    }

    /// Downloads the finished video from its result URI.
    async fn download(&self, uri: &str) -> Result<Vec<u8>> {
        if uri.starts_with("gs://") {
            return Err(VibeGenError::VideoGeneration(format!(
                "Veo returned a Google Cloud Storage URI ({}) which cannot be downloaded directly.",
                uri
            )));
        }

        // The download endpoint requires the key as a query parameter
        let url = if uri.contains('?') {
            format!("{}&key={}", uri, self.api_key)
        } else {
            format!("{}?key={}", uri, self.api_key)
        };

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VibeGenError::Api {
                status: response.status().as_u16(),
                message: "Failed to fetch the generated video".into(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Drives an operation to its terminal state.
///
/// Factored over a status-fetch closure so the loop itself carries the
/// contract: an already-done operation short-circuits with zero queries, a
/// not-done state is always followed by another query after `interval`,
/// transient query failures are tolerated until `deadline`, and an
/// invalidated key or a fired cancellation token terminates immediately.
async fn poll_until_done<F, Fut>(
    initial: VeoOperation,
    mut fetch_status: F,
    interval: Duration,
    deadline: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<VeoOperation>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<VeoOperation>>,
{
    let start = Instant::now();
    let mut operation = initial;

    loop {
        if operation.done.unwrap_or(false) {
            return Ok(operation);
        }

        if let Some(err) = operation.error.take() {
            return Err(VibeGenError::VideoGeneration(
                err.message.unwrap_or_else(|| "Unknown error".into()),
            ));
        }

        if start.elapsed() >= deadline {
            return Err(VibeGenError::Timeout(deadline));
        }

        match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => return Err(VibeGenError::Cancelled),
                _ = tokio::time::sleep(interval) => {}
            },
            None => tokio::time::sleep(interval).await,
        }

        match fetch_status().await {
            Ok(next) => operation = next,
            // An invalidated key never recovers; halt instead of retrying
            Err(VibeGenError::InvalidApiKey) => return Err(VibeGenError::InvalidApiKey),
            Err(e) => {
                tracing::warn!(
                    elapsed_secs = start.elapsed().as_secs(),
                    "transient polling error, retrying on next tick: {e}"
                );
            }
        }
    }
}

/// Extracts the download URI from a terminal operation.
fn extract_video_uri(operation: VeoOperation) -> Result<String> {
    if let Some(err) = operation.error {
        return Err(VibeGenError::VideoGeneration(
            err.message.unwrap_or_else(|| "Unknown error".into()),
        ));
    }

    if let Some(resp) = operation.response {
        if let Some(gen_resp) = resp.generate_video_response {
            // Filtered with nothing to show means the content was blocked
            if gen_resp.rai_media_filtered_count.unwrap_or(0) > 0
                && gen_resp
                    .generated_samples
                    .as_ref()
                    .map_or(true, |s| s.is_empty())
            {
                return Err(VibeGenError::ContentBlocked(
                    "Video was filtered by Veo safety filters".into(),
                ));
            }

            if let Some(samples) = gen_resp.generated_samples {
                if let Some(first) = samples.into_iter().next() {
                    if let Some(uri) = first.video.and_then(|v| v.uri) {
                        return Ok(uri);
                    }
                }
            }
        }
    }

    Err(VibeGenError::UnexpectedResponse(
        "Video generation succeeded, but no download link was found".into(),
    ))
}

// Request wire format

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoWireRequest {
    instances: Vec<VeoInstance>,
    parameters: VeoParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoInstance {
    prompt: String,
    image: VeoMediaData,
}

/// Media payload wrapping `inlineData`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoMediaData {
    inline_data: VeoInlineData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoParameters {
    number_of_videos: u32,
    resolution: String,
    aspect_ratio: String,
}

impl VeoWireRequest {
    fn from_animation_request(req: &AnimationRequest) -> Self {
        Self {
            instances: vec![VeoInstance {
                prompt: req.prompt.clone(),
                image: VeoMediaData {
                    inline_data: VeoInlineData {
                        mime_type: req.resolved_mime_type().to_string(),
                        data: base64::engine::general_purpose::STANDARD.encode(&req.image),
                    },
                },
            }],
            parameters: VeoParameters {
                number_of_videos: 1,
                resolution: "720p".to_string(),
                aspect_ratio: req.aspect_ratio.as_str().to_string(),
            },
        }
    }
}

// Operation wire format

/// An in-flight (or terminal) remote operation handle.
#[derive(Debug, Deserialize)]
struct VeoOperation {
    name: String,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    response: Option<VeoVideoResponse>,
    #[serde(default)]
    error: Option<VeoOperationError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoVideoResponse {
    #[serde(default)]
    generate_video_response: Option<VeoGenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoGenerateVideoResponse {
    #[serde(default)]
    generated_samples: Option<Vec<VeoGeneratedSample>>,
    #[serde(default)]
    rai_media_filtered_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct VeoGeneratedSample {
    #[serde(default)]
    video: Option<VeoVideo>,
}

#[derive(Debug, Deserialize)]
struct VeoVideo {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VeoOperationError {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::types::VideoAspectRatio;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const INTERVAL: Duration = Duration::from_secs(10);
    const DEADLINE: Duration = Duration::from_secs(600);

    fn pending_op(name: &str) -> VeoOperation {
        VeoOperation {
            name: name.to_string(),
            done: Some(false),
            response: None,
            error: None,
        }
    }

    fn done_op_with_uri(name: &str, uri: &str) -> VeoOperation {
        VeoOperation {
            name: name.to_string(),
            done: Some(true),
            response: Some(VeoVideoResponse {
                generate_video_response: Some(VeoGenerateVideoResponse {
                    generated_samples: Some(vec![VeoGeneratedSample {
                        video: Some(VeoVideo {
                            uri: Some(uri.to_string()),
                        }),
                    }]),
                    rai_media_filtered_count: None,
                }),
            }),
            error: None,
        }
    }

    fn done_op_without_uri(name: &str) -> VeoOperation {
        VeoOperation {
            name: name.to_string(),
            done: Some(true),
            response: Some(VeoVideoResponse {
                generate_video_response: Some(VeoGenerateVideoResponse {
                    generated_samples: None,
                    rai_media_filtered_count: None,
                }),
            }),
            error: None,
        }
    }

    /// Fetch closure backed by a queue of canned responses, counting calls.
    fn scripted_fetch(
        responses: Vec<Result<VeoOperation>>,
        calls: Arc<AtomicUsize>,
    ) -> impl FnMut() -> std::future::Ready<Result<VeoOperation>> {
        let queue = Mutex::new(VecDeque::from(responses));
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let next = queue
                .lock()
                .unwrap()
                .pop_front()
                .expect("fetch called more times than scripted");
            std::future::ready(next)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_immediately_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = scripted_fetch(vec![], Arc::clone(&calls));

        let op = done_op_with_uri("operations/1", "https://example.com/v.mp4");
        let terminal = poll_until_done(op, fetch, INTERVAL, DEADLINE, None)
            .await
            .unwrap();

        assert_eq!(terminal.done, Some(true));
        // Zero status queries for an already-done operation
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_done_always_followed_by_another_query() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = scripted_fetch(
            vec![
                Ok(pending_op("operations/1")),
                Ok(done_op_with_uri("operations/1", "https://example.com/v.mp4")),
            ],
            Arc::clone(&calls),
        );

        let start = Instant::now();
        let terminal = poll_until_done(pending_op("operations/1"), fetch, INTERVAL, DEADLINE, None)
            .await
            .unwrap();

        assert_eq!(terminal.done, Some(true));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // One tick per pending state observed before each query
        assert_eq!(start.elapsed(), INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_poll_yields_result_locator() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = scripted_fetch(
            vec![
                Ok(pending_op("operations/42")),
                Ok(done_op_with_uri("operations/42", "X")),
            ],
            Arc::clone(&calls),
        );

        let terminal =
            poll_until_done(pending_op("operations/42"), fetch, INTERVAL, DEADLINE, None)
                .await
                .unwrap();

        assert_eq!(extract_video_uri(terminal).unwrap(), "X");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_key_halts_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = scripted_fetch(
            vec![Err(VibeGenError::InvalidApiKey)],
            Arc::clone(&calls),
        );

        let err = poll_until_done(pending_op("operations/1"), fetch, INTERVAL, DEADLINE, None)
            .await
            .unwrap_err();

        assert!(matches!(err, VibeGenError::InvalidApiKey));
        // No further polling after the terminal error
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retries_on_next_tick() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = scripted_fetch(
            vec![
                Err(VibeGenError::Api {
                    status: 500,
                    message: "flaky".into(),
                }),
                Ok(done_op_with_uri("operations/1", "https://example.com/v.mp4")),
            ],
            Arc::clone(&calls),
        );

        let terminal = poll_until_done(pending_op("operations/1"), fetch, INTERVAL, DEADLINE, None)
            .await
            .unwrap();

        assert_eq!(terminal.done, Some(true));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_error_is_terminal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = scripted_fetch(
            vec![Ok(VeoOperation {
                name: "operations/1".into(),
                done: Some(false),
                response: None,
                error: Some(VeoOperationError {
                    message: Some("Quota exceeded".into()),
                }),
            })],
            Arc::clone(&calls),
        );

        let err = poll_until_done(pending_op("operations/1"), fetch, INTERVAL, DEADLINE, None)
            .await
            .unwrap_err();

        match err {
            VibeGenError::VideoGeneration(msg) => assert_eq!(msg, "Quota exceeded"),
            other => panic!("expected VideoGeneration, got: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_produces_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let queue: Vec<Result<VeoOperation>> =
            (0..10).map(|_| Ok(pending_op("operations/1"))).collect();
        let fetch = scripted_fetch(queue, Arc::clone(&calls));

        let err = poll_until_done(
            pending_op("operations/1"),
            fetch,
            INTERVAL,
            Duration::from_secs(25),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, VibeGenError::Timeout(_)));
        // Ticks at 10s and 20s fit inside a 25s deadline
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_poll_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = scripted_fetch(vec![], Arc::clone(&calls));

        let token = CancellationToken::new();
        token.cancel();

        let err = poll_until_done(
            pending_op("operations/1"),
            fetch,
            INTERVAL,
            DEADLINE,
            Some(&token),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, VibeGenError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_extract_uri_missing_link() {
        let err = extract_video_uri(done_op_without_uri("operations/1")).unwrap_err();
        match err {
            VibeGenError::UnexpectedResponse(msg) => {
                assert!(msg.contains("no download link"), "got: {}", msg);
            }
            other => panic!("expected UnexpectedResponse, got: {:?}", other),
        }
    }

    #[test]
    fn test_extract_uri_checks_error_first() {
        let op = VeoOperation {
            name: "operations/1".into(),
            done: Some(true),
            response: None,
            error: Some(VeoOperationError {
                message: Some("internal failure".into()),
            }),
        };
        let err = extract_video_uri(op).unwrap_err();
        assert!(matches!(err, VibeGenError::VideoGeneration(_)));
    }

    #[test]
    fn test_extract_uri_filtered_content() {
        let op = VeoOperation {
            name: "operations/1".into(),
            done: Some(true),
            response: Some(VeoVideoResponse {
                generate_video_response: Some(VeoGenerateVideoResponse {
                    generated_samples: Some(vec![]),
                    rai_media_filtered_count: Some(1),
                }),
            }),
            error: None,
        };
        let err = extract_video_uri(op).unwrap_err();
        assert!(matches!(err, VibeGenError::ContentBlocked(_)));
    }

    #[test]
    fn test_veo_model_as_str() {
        assert_eq!(
            VeoModel::Veo31FastPreview.as_str(),
            "veo-3.1-fast-generate-preview"
        );
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let client = VeoClientBuilder::new().api_key("test-key").build();
        assert!(client.is_ok());
    }

    #[test]
    fn test_builder_custom_timeouts() {
        let client = VeoClientBuilder::new()
            .api_key("test-key")
            .poll_interval(Duration::from_secs(30))
            .timeout(Duration::from_secs(900))
            .build()
            .unwrap();
        assert_eq!(client.poll_interval, Duration::from_secs(30));
        assert_eq!(client.timeout, Duration::from_secs(900));
    }

    #[test]
    fn test_request_wire_format() {
        let png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let expected_b64 = base64::engine::general_purpose::STANDARD.encode(&png);

        let req = AnimationRequest::new(png, "slow cinematic zoom")
            .with_aspect_ratio(VideoAspectRatio::Landscape);
        let wire = VeoWireRequest::from_animation_request(&req);
        let json = serde_json::to_value(&wire).unwrap();

        let instance = &json["instances"][0];
        assert_eq!(instance["prompt"], "slow cinematic zoom");
        assert_eq!(instance["image"]["inlineData"]["mimeType"], "image/png");
        assert_eq!(instance["image"]["inlineData"]["data"], expected_b64);

        let params = &json["parameters"];
        assert_eq!(params["numberOfVideos"], 1);
        assert_eq!(params["resolution"], "720p");
        assert_eq!(params["aspectRatio"], "16:9");
    }

    #[test]
    fn test_operation_deserialization_not_done() {
        let json = r#"{"name": "operations/123", "done": false}"#;
        let op: VeoOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op.name, "operations/123");
        assert_eq!(op.done, Some(false));
        assert!(op.response.is_none());
    }

    #[test]
    fn test_operation_deserialization_done_with_video() {
        let json = r#"{
            "name": "operations/123",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [{
                        "video": {"uri": "https://example.com/video.mp4"}
                    }]
                }
            }
        }"#;
        let op: VeoOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op.done, Some(true));
        assert_eq!(
            extract_video_uri(op).unwrap(),
            "https://example.com/video.mp4"
        );
    }

    #[test]
    fn test_gs_uri_download_is_rejected() {
        let client = VeoClientBuilder::new()
            .api_key("test-key")
            .build()
            .unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let result = rt.block_on(client.download("gs://my-bucket/video.mp4"));
        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("Google Cloud Storage"),
            "expected GCS error, got: {}",
            err
        );
    }
}

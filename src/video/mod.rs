//! Image-to-video animation module.

mod types;
mod veo;

pub use types::{
    AnimationRequest, GeneratedVideo, GenerationPhase, ProgressCallback, VideoAspectRatio,
    VideoMetadata,
};
pub use veo::{VeoClient, VeoClientBuilder, VeoModel};

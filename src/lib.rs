#![warn(missing_docs)]
//! VibeGen - AI phone-wallpaper generation via the Gemini API.
//!
//! This crate wraps three operations of Google's generative-media API:
//! wallpaper synthesis (Imagen), image editing (Gemini) and image-to-video
//! animation (Veo, asynchronous with polling).
//!
//! # Quick Start - Wallpapers
//!
//! ```no_run
//! use vibegen::{ImagenClient, WallpaperRequest};
//!
//! #[tokio::main]
//! async fn main() -> vibegen::Result<()> {
//!     let client = ImagenClient::builder().build()?;
//!     let request = WallpaperRequest::new("neon jellyfish drifting in the deep");
//!     for (i, image) in client.generate(&request).await?.iter().enumerate() {
//!         image.save(format!("wallpaper-{i}.jpg"))?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Animation
//!
//! ```no_run
//! use vibegen::{AnimationRequest, VeoClient};
//!
//! #[tokio::main]
//! async fn main() -> vibegen::Result<()> {
//!     let client = VeoClient::builder()
//!         .on_progress(|phase| println!("{phase}"))
//!         .build()?;
//!     let image = std::fs::read("wallpaper-0.jpg")?;
//!     let request = AnimationRequest::new(image, "a cinematic zoom out");
//!     let video = client.animate(&request).await?;
//!     video.save("wallpaper.mp4")?;
//!     Ok(())
//! }
//! ```

mod error;
pub mod image;
pub mod video;

// Re-export error types at crate root
pub use error::{Result, VibeGenError};

// Re-export commonly used image types
pub use image::{
    AspectRatio, EditRequest, EditorModel, GeneratedImage, GenerationMetadata, ImageEditor,
    ImageEditorBuilder, ImageFormat, ImagenClient, ImagenClientBuilder, ImagenModel,
    WallpaperRequest,
};

// Re-export commonly used video types
pub use video::{
    AnimationRequest, GeneratedVideo, GenerationPhase, VeoClient, VeoClientBuilder, VeoModel,
    VideoAspectRatio, VideoMetadata,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, VibeGenError};
    pub use crate::image::{
        EditRequest, GeneratedImage, ImageEditor, ImagenClient, WallpaperRequest,
    };
    pub use crate::video::{AnimationRequest, GeneratedVideo, GenerationPhase, VeoClient};
}

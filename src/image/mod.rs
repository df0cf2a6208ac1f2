//! Wallpaper generation and editing module.

mod editor;
mod imagen;
mod types;

pub use editor::{EditorModel, ImageEditor, ImageEditorBuilder};
pub use imagen::{ImagenClient, ImagenClientBuilder, ImagenModel};
pub use types::{
    AspectRatio, EditRequest, GeneratedImage, GenerationMetadata, ImageFormat, WallpaperRequest,
};

//! CLI for VibeGen - AI phone-wallpaper generation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use vibegen::{
    AnimationRequest, AspectRatio, EditRequest, ImageEditor, ImagenClient, VeoClient,
    VideoAspectRatio, WallpaperRequest,
};

#[derive(Parser)]
#[command(name = "vibegen")]
#[command(about = "Generate, edit and animate AI phone wallpapers via the Gemini API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API key (falls back to GOOGLE_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a batch of wallpapers from a text prompt
    Generate(GenerateArgs),

    /// Edit an image with a text instruction
    Edit(EditArgs),

    /// Animate an image into a short video
    Animate(AnimateArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the wallpaper
    prompt: String,

    /// Directory to save the generated images into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Aspect ratio
    #[arg(long, value_enum, default_value = "9:16")]
    aspect_ratio: AspectRatioArg,

    /// Number of images to generate
    #[arg(short, long, default_value_t = 4)]
    count: u32,
}

#[derive(Args)]
struct EditArgs {
    /// The editing instruction (e.g. "make it black and white")
    prompt: String,

    /// Source image file
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct AnimateArgs {
    /// The text prompt describing the desired motion
    prompt: String,

    /// Source image file (first frame)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Aspect ratio (video supports 9:16 and 16:9 only)
    #[arg(long, value_enum, default_value = "9:16")]
    aspect_ratio: VideoAspectRatioArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "1:1")]
    Square,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "3:4")]
    StandardPortrait,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::Standard => AspectRatio::Standard,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VideoAspectRatioArg {
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "16:9")]
    Landscape,
}

impl From<VideoAspectRatioArg> for VideoAspectRatio {
    fn from(arg: VideoAspectRatioArg) -> Self {
        match arg {
            VideoAspectRatioArg::Portrait => VideoAspectRatio::Portrait,
            VideoAspectRatioArg::Landscape => VideoAspectRatio::Landscape,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate(args, cli.api_key, cli.json).await?,
        Commands::Edit(args) => edit(args, cli.api_key, cli.json).await?,
        Commands::Animate(args) => animate(args, cli.api_key, cli.json).await?,
    }

    Ok(())
}

async fn generate(args: GenerateArgs, api_key: Option<String>, json_output: bool) -> anyhow::Result<()> {
    let mut builder = ImagenClient::builder();
    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }
    let client = builder.build()?;

    let request = WallpaperRequest::new(&args.prompt)
        .with_aspect_ratio(args.aspect_ratio.into())
        .with_count(args.count);

    let images = client.generate(&request).await?;

    std::fs::create_dir_all(&args.output_dir)?;
    let mut saved = Vec::with_capacity(images.len());
    for (i, image) in images.iter().enumerate() {
        let path = args
            .output_dir
            .join(format!("wallpaper-{}.{}", i, image.format.extension()));
        image.save(&path)?;
        saved.push(path);
    }

    if json_output {
        let result = serde_json::json!({
            "type": "image",
            "success": true,
            "outputs": saved.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "count": images.len(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for (path, image) in saved.iter().zip(&images) {
            println!("Generated: {} ({} bytes)", path.display(), image.size());
        }
    }

    Ok(())
}

async fn edit(args: EditArgs, api_key: Option<String>, json_output: bool) -> anyhow::Result<()> {
    let mut builder = ImageEditor::builder();
    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }
    let editor = builder.build()?;

    let source = std::fs::read(&args.input)?;
    let request = EditRequest::new(source, &args.prompt);

    let image = editor.edit(&request).await?;
    image.save(&args.output)?;

    if json_output {
        let result = serde_json::json!({
            "type": "image",
            "success": true,
            "output": args.output.display().to_string(),
            "size_bytes": image.size(),
            "format": image.format.extension(),
            "model": image.metadata.model,
            "duration_ms": image.metadata.duration_ms,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Edited image: {} ({} bytes)",
            args.output.display(),
            image.size()
        );
    }

    Ok(())
}

async fn animate(args: AnimateArgs, api_key: Option<String>, json_output: bool) -> anyhow::Result<()> {
    let mut builder = VeoClient::builder();
    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }
    if !json_output {
        builder = builder.on_progress(|phase| println!("{phase}"));
    }
    let client = builder.build()?;

    // Ctrl-C aborts the poll loop instead of killing the process mid-write
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let source = std::fs::read(&args.input)?;
    let request = AnimationRequest::new(source, &args.prompt)
        .with_aspect_ratio(args.aspect_ratio.into())
        .with_cancel_token(cancel);

    let video = client.animate(&request).await?;
    video.save(&args.output)?;

    if json_output {
        let result = serde_json::json!({
            "type": "video",
            "success": true,
            "output": args.output.display().to_string(),
            "size_bytes": video.size(),
            "model": video.metadata.model,
            "duration_ms": video.metadata.duration_ms,
            "resolution": video.metadata.resolution,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated video: {} ({} bytes)",
            args.output.display(),
            video.size()
        );
        if let Some(duration) = video.metadata.duration_ms {
            println!("Generation time: {}ms", duration);
        }
    }

    Ok(())
}

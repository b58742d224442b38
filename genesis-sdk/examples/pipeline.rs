//! End-to-end pipeline driver against a running backend.
//!
//! Usage:
//!   cargo run --example pipeline -- \
//!     --image-url https://cdn.example.com/product.jpg \
//!     --count 8 --platform Amazon --aspect-ratio 3:4
//!
//! Pass `--image-file ./product.jpg` instead of `--image-url` to upload a
//! local file first.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use genesis_sdk::{HttpApi, Studio, StudioConfig, StudioEvent};

#[derive(Parser)]
#[command(name = "pipeline", about = "Drive the Studio Genesis pipeline once")]
struct Args {
    #[arg(long, default_value = "http://localhost:8000/api/v1")]
    api_base: String,
    /// URL of an already-uploaded product image.
    #[arg(long, required_unless_present = "image_file")]
    image_url: Option<String>,
    /// Local image to upload first; the returned URL drives the run.
    #[arg(long, conflicts_with = "image_url")]
    image_file: Option<PathBuf>,
    #[arg(long, default_value_t = 8)]
    count: u32,
    #[arg(long, default_value = "Amazon")]
    platform: String,
    #[arg(long, default_value = "3:4")]
    aspect_ratio: String,
    /// Bearer token, if the deployment requires auth.
    #[arg(long, env = "GENESIS_TOKEN")]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut config = StudioConfig::new(&args.api_base);
    if let Some(token) = &args.token {
        config = config.with_auth_token(token);
    }

    let image_url = match (&args.image_file, &args.image_url) {
        (Some(path), _) => {
            let bytes = std::fs::read(path)?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("product.jpg");
            let url = HttpApi::new(config.clone()).upload_image(name, bytes).await?;
            println!("uploaded {} -> {url}", path.display());
            url
        }
        (None, Some(url)) => url.clone(),
        (None, None) => unreachable!("clap enforces one image source"),
    };

    let (studio, mut events) = Studio::connect(config);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                StudioEvent::Progress(p) => {
                    println!("  [{}] {}%", p.stage, p.progress);
                }
                StudioEvent::Failed { message } => eprintln!("  failed: {message}"),
                StudioEvent::Completed => println!("  completed"),
            }
        }
    });

    studio.set_image_url(&image_url);

    let analysis = studio
        .analyze(&image_url)
        .await
        .ok_or_else(|| anyhow::anyhow!(studio.error().unwrap_or_default()))?;
    println!("analyzed: {}", analysis.basic_info.product_name);

    studio
        .plan(args.count, &args.platform, &args.aspect_ratio)
        .await
        .ok_or_else(|| anyhow::anyhow!(studio.error().unwrap_or_default()))?;
    println!("plan ready");

    let images = studio.generate(&args.aspect_ratio).await;
    if images.is_empty() {
        anyhow::bail!(studio.error().unwrap_or_else(|| "generation failed".into()));
    }
    for image in &images {
        println!(
            "#{} {} -> {}",
            image.order,
            image.role,
            image.url.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

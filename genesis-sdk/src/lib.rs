//! Client SDK for the Studio Genesis detail-page image pipeline.
//!
//! A task walks four dependent stages against a remote backend: **analyze**
//! a product image, **plan** the detail-page image sequence, **generate**
//! the batch (with live progress streamed over WebSocket), and optionally
//! **regenerate** single images afterwards. [`Studio`] owns the state
//! machine; [`HttpApi`] and [`WsTransport`] are the production
//! collaborators, swappable behind [`StageApi`] and [`ProgressTransport`]
//! for testing.
//!
//! ```no_run
//! use genesis_sdk::{Studio, StudioConfig};
//!
//! # async fn run() -> Option<()> {
//! let (studio, _events) = Studio::connect(StudioConfig::default());
//! studio.set_image_url("https://cdn.example.com/product.jpg");
//! let analysis = studio.analyze("https://cdn.example.com/product.jpg").await?;
//! println!("analyzed {}", analysis.basic_info.product_name);
//! studio.plan(8, "Amazon", "3:4").await?;
//! let images = studio.generate("3:4").await;
//! println!("{} images", images.len());
//! # Some(())
//! # }
//! ```

pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod results;
pub mod task_id;
pub mod types;
pub mod ws;

pub use api::{HttpApi, StageApi};
pub use channel::ProgressTransport;
pub use config::StudioConfig;
pub use error::StageError;
pub use orchestrator::{Studio, StudioEvent};
pub use results::ResultSet;
pub use types::{
    GenerationResult, ImageSlot, LocalizedCopy, MultilingualCopy, PagePlan, ProductAnalysis,
    ProductInfo, ProgressEvent, ProgressStage, QualityAssessment, RegenerateRequest, TaskStatus,
};
pub use ws::WsTransport;

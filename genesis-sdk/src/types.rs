//! Wire types for the Studio Genesis protocol.
//!
//! The backend speaks a fixed JSON protocol: every POST replies with the
//! `{success, data, error}` envelope, and the progress channel pushes
//! [`ProgressEvent`] frames. Analysis and plan payloads are large
//! AI-authored documents; only the fields this SDK acts on are typed, the
//! rest rides along in flattened maps so nothing is lost on round trips.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StageError;

/// Where the task currently is. Owned exclusively by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Idle,
    Analyzing,
    Planning,
    Generating,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Terminal with respect to the current run. Only `reset()` (or a fresh
    /// `generate()` call) leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Idle => write!(f, "idle"),
            TaskStatus::Analyzing => write!(f, "analyzing"),
            TaskStatus::Planning => write!(f, "planning"),
            TaskStatus::Generating => write!(f, "generating"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Typed core of the product analysis; the part the generate stage sends
/// back to the server as `product_info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductInfo {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price_tier: String,
    #[serde(default)]
    pub target_platform: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Product analysis produced by the analyze stage. Immutable once stored,
/// except by `reset()` or a fresh analyze run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAnalysis {
    pub basic_info: ProductInfo,
    /// Selling points, audience, blueprint and style recommendations are
    /// opaque to the SDK, round-tripped verbatim to the plan stage.
    #[serde(flatten)]
    pub detail: Map<String, Value>,
}

/// One planned slot in the detail-page image sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSlot {
    pub order: u32,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub generation_prompt: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Detail-page plan produced by the plan stage; required input to generate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagePlan {
    #[serde(default)]
    pub image_sequence: Vec<ImageSlot>,
    #[serde(flatten)]
    pub strategy: Map<String, Value>,
}

/// Outcome of one generated image. Identity is `order` (1-based position in
/// the planned sequence), never arrival time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationResult {
    pub order: u32,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_overlay: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

impl GenerationResult {
    /// Entry synthesized from a progress event that carried an image.
    pub fn from_stream(order: u32, url: String) -> Self {
        Self {
            order,
            url: Some(url),
            success: true,
            ..Self::default()
        }
    }
}

/// Body of the regenerate call.
#[derive(Debug, Clone, Serialize)]
pub struct RegenerateRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub base_image_url: Option<String>,
    pub aspect_ratio: String,
    pub order: u32,
    pub role: String,
}

/// Quality assessment of one generated image (advisory endpoint).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualityAssessment {
    #[serde(default)]
    pub scores: HashMap<String, f64>,
    #[serde(default)]
    pub issues_found: Vec<String>,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
    #[serde(default)]
    pub regeneration_needed: bool,
    #[serde(default)]
    pub adjusted_prompt: Option<String>,
}

/// Localized marketing copy for one language.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedCopy {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub subheadline: String,
    #[serde(default)]
    pub bullet_points: Vec<String>,
    #[serde(default)]
    pub call_to_action: String,
    #[serde(default)]
    pub localization_notes: String,
}

/// Copy keyed by language code, e.g. `en`, `ja`.
pub type MultilingualCopy = HashMap<String, LocalizedCopy>;

/// Pipeline stage named in a progress frame.
///
/// `fusing` and `transferring` come from a sibling pipeline that shares the
/// channel format; they decode fine and are non-terminal here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Analyzing,
    Planning,
    Generating,
    Fusing,
    Transferring,
    Completed,
    Failed,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStage::Analyzing => write!(f, "analyzing"),
            ProgressStage::Planning => write!(f, "planning"),
            ProgressStage::Generating => write!(f, "generating"),
            ProgressStage::Fusing => write!(f, "fusing"),
            ProgressStage::Transferring => write!(f, "transferring"),
            ProgressStage::Completed => write!(f, "completed"),
            ProgressStage::Failed => write!(f, "failed"),
        }
    }
}

/// One frame from the progress channel. Transient: applied to derived state
/// and forwarded to the consumer, never retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub current: Option<u32>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The uniform `{success, data, error}` reply shape.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    // no serde(default) here: it would demand T: Default, and a missing
    // Option field decodes as None anyway
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Collapse into the payload or the service-reported failure.
    pub fn into_data(self, what: &str) -> Result<T, StageError> {
        if self.success {
            self.data.ok_or_else(|| {
                StageError::Malformed(format!("{what} reply had success=true but no data"))
            })
        } else {
            Err(StageError::Service(
                self.error.unwrap_or_else(|| format!("{what} failed")),
            ))
        }
    }
}

//! The Studio Genesis task orchestrator.
//!
//! Drives one image-generation task through analyze → plan → generate, with
//! per-image regeneration afterwards. The generate stage has two
//! asynchronous writers racing against the same state: the terminal HTTP
//! reply and the streamed progress events. Per-index result merges are
//! commutative, and the terminal transition is idempotent: whichever side
//! observes completion or failure first wins, the other becomes a no-op.
//!
//! One orchestrator instance owns one logical task session; consumers get a
//! cloneable handle plus an event receiver.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{HttpApi, StageApi};
use crate::channel::{ChannelGuard, ProgressTransport};
use crate::config::StudioConfig;
use crate::error::StageError;
use crate::results::ResultSet;
use crate::task_id;
use crate::types::{
    GenerationResult, MultilingualCopy, PagePlan, ProductAnalysis, ProgressEvent, ProgressStage,
    QualityAssessment, RegenerateRequest, TaskStatus,
};
use crate::ws::WsTransport;

const DEFAULT_ASPECT_RATIO: &str = "3:4";

/// Notifications pushed to the consumer while operations run.
#[derive(Debug, Clone)]
pub enum StudioEvent {
    /// A progress frame arrived on the channel (forwarded verbatim).
    Progress(ProgressEvent),
    /// A stage or regeneration failed; the message is also in the error slot.
    Failed { message: String },
    /// The generation run reached `completed`.
    Completed,
}

/// Mutable per-task state. One lock, never held across an await.
#[derive(Debug, Default)]
struct TaskState {
    status: TaskStatus,
    progress: u8,
    /// Display cursor 1..=5. UI affordance only, carries no preconditions.
    step: u8,
    error: Option<String>,
    image_url: Option<String>,
    analysis: Option<ProductAnalysis>,
    plan: Option<PagePlan>,
    results: ResultSet,
    aspect_ratio: Option<String>,
    /// Identity of the live generation run. Channel events are checked
    /// against this before they may touch anything; clearing it (reset, new
    /// run) retires every event still in flight from an old channel.
    task_id: Option<String>,
}

impl TaskState {
    fn new() -> Self {
        Self {
            step: 1,
            ..Self::default()
        }
    }
}

struct Inner<A, T> {
    config: StudioConfig,
    api: A,
    transport: T,
    state: Mutex<TaskState>,
    channel: Mutex<Option<ChannelGuard>>,
    events: mpsc::UnboundedSender<StudioEvent>,
}

/// Orchestrator handle. Cheap to clone; all clones share one task session.
pub struct Studio<A, T> {
    inner: Arc<Inner<A, T>>,
}

impl<A, T> Clone for Studio<A, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Studio<HttpApi, WsTransport> {
    /// Production wiring: reqwest + WebSocket against `config.api_base`.
    pub fn connect(config: StudioConfig) -> (Self, mpsc::UnboundedReceiver<StudioEvent>) {
        let api = HttpApi::new(config.clone());
        Self::new(config, api, WsTransport)
    }
}

impl<A: StageApi, T: ProgressTransport> Studio<A, T> {
    /// Create an orchestrator with explicit collaborators, plus the receiver
    /// its notifications arrive on.
    pub fn new(
        config: StudioConfig,
        api: A,
        transport: T,
    ) -> (Self, mpsc::UnboundedReceiver<StudioEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Inner {
            config,
            api,
            transport,
            state: Mutex::new(TaskState::new()),
            channel: Mutex::new(None),
            events: tx,
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            rx,
        )
    }

    // ── Observation ──

    pub fn status(&self) -> TaskStatus {
        self.inner.state.lock().status
    }

    pub fn progress(&self) -> u8 {
        self.inner.state.lock().progress
    }

    pub fn current_step(&self) -> u8 {
        self.inner.state.lock().step
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.lock().error.clone()
    }

    pub fn image_url(&self) -> Option<String> {
        self.inner.state.lock().image_url.clone()
    }

    pub fn analysis(&self) -> Option<ProductAnalysis> {
        self.inner.state.lock().analysis.clone()
    }

    pub fn plan_output(&self) -> Option<PagePlan> {
        self.inner.state.lock().plan.clone()
    }

    /// Snapshot of the result collection, `None` where still pending.
    pub fn results(&self) -> Vec<Option<GenerationResult>> {
        self.inner.state.lock().results.to_vec()
    }

    /// Identity of the current generation run, if one has started.
    pub fn task_id(&self) -> Option<String> {
        self.inner.state.lock().task_id.clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.status(),
            TaskStatus::Analyzing | TaskStatus::Planning | TaskStatus::Generating
        )
    }

    /// Record the uploaded source image the pipeline works from.
    pub fn set_image_url(&self, url: impl Into<String>) {
        self.inner.state.lock().image_url = Some(url.into());
    }

    // ── Stage operations ──

    /// Analyze the product image. `None` on failure; the message lands in
    /// the error slot and status flips to `failed`.
    ///
    /// Starting over retires any previous generation run: the progress
    /// channel is closed and the run identity cleared before anything else,
    /// so a late frame from the old channel cannot write into the restarted
    /// pipeline.
    pub async fn analyze(&self, image_url: &str) -> Option<ProductAnalysis> {
        let previous = self.inner.channel.lock().take();
        if let Some(channel) = previous {
            channel.close();
        }
        {
            let mut state = self.inner.state.lock();
            state.status = TaskStatus::Analyzing;
            state.step = 2;
            state.progress = 0;
            state.error = None;
            state.task_id = None;
        }
        match self.inner.api.analyze(image_url).await {
            Ok(analysis) => {
                let mut state = self.inner.state.lock();
                state.analysis = Some(analysis.clone());
                // a fresh analysis invalidates everything downstream
                state.plan = None;
                state.results.clear();
                state.step = 3;
                state.progress = 100;
                Some(analysis)
            }
            Err(e) => {
                self.fail_stage(e.to_string());
                None
            }
        }
    }

    /// Plan the detail-page image sequence from the stored analysis.
    pub async fn plan(&self, count: u32, platform: &str, aspect_ratio: &str) -> Option<PagePlan> {
        let analysis = {
            let state = self.inner.state.lock();
            state.analysis.clone()
        };
        let Some(analysis) = analysis else {
            self.fail_stage(
                StageError::Precondition("product analysis missing: run analyze first").to_string(),
            );
            return None;
        };
        {
            let mut state = self.inner.state.lock();
            state.status = TaskStatus::Planning;
            state.progress = 0;
            state.error = None;
        }
        match self
            .inner
            .api
            .plan(&analysis, count, platform, aspect_ratio)
            .await
        {
            Ok(plan) => {
                let mut state = self.inner.state.lock();
                state.plan = Some(plan.clone());
                state.progress = 100;
                Some(plan)
            }
            Err(e) => {
                self.fail_stage(e.to_string());
                None
            }
        }
    }

    /// Run the batch generation stage.
    ///
    /// Mints a fresh task identity, reopens the progress channel under it
    /// (closing any previous channel first), clears the result collection,
    /// then issues the generation request. Streamed events and the HTTP
    /// reply race to the terminal state; the first one there wins.
    pub async fn generate(&self, aspect_ratio: &str) -> Vec<GenerationResult> {
        let prereq = {
            let state = self.inner.state.lock();
            match (&state.plan, &state.analysis, &state.image_url) {
                (Some(plan), Some(analysis), Some(url)) => {
                    Some((plan.clone(), analysis.basic_info.clone(), url.clone()))
                }
                _ => None,
            }
        };
        let Some((plan, product_info, image_url)) = prereq else {
            self.fail_stage(
                StageError::Precondition(
                    "page plan missing: run analyze and plan against an uploaded image first",
                )
                .to_string(),
            );
            return Vec::new();
        };

        let id = task_id::mint();
        debug!(task_id = %id, "starting generation run");
        {
            let mut state = self.inner.state.lock();
            state.status = TaskStatus::Generating;
            state.step = 4;
            state.progress = 0;
            state.error = None;
            state.results.clear();
            state.aspect_ratio = Some(aspect_ratio.to_string());
            state.task_id = Some(id.clone());
        }

        if let Err(e) = self.open_channel(&id).await {
            // generation can still complete through the HTTP reply alone
            debug!(error = %e, "progress channel unavailable");
        }

        match self
            .inner
            .api
            .generate(&plan, &product_info, &image_url, &id, aspect_ratio)
            .await
        {
            Ok(results) => {
                let completed = {
                    let mut state = self.inner.state.lock();
                    if state.task_id.as_deref() == Some(id.as_str())
                        && !state.status.is_terminal()
                    {
                        state.results.replace_all(results.clone());
                        state.status = TaskStatus::Completed;
                        state.step = 5;
                        state.progress = 100;
                        true
                    } else {
                        false
                    }
                };
                if completed {
                    let _ = self.inner.events.send(StudioEvent::Completed);
                }
                results
            }
            Err(e) => {
                let message = e.to_string();
                let failed = {
                    let mut state = self.inner.state.lock();
                    if state.task_id.as_deref() == Some(id.as_str())
                        && !state.status.is_terminal()
                    {
                        state.status = TaskStatus::Failed;
                        state.error = Some(message.clone());
                        true
                    } else {
                        false
                    }
                };
                if failed {
                    let _ = self.inner.events.send(StudioEvent::Failed { message });
                }
                Vec::new()
            }
        }
    }

    /// Regenerate a single image in place. Task status is never touched;
    /// a failure here is scoped to this call.
    pub async fn regenerate(
        &self,
        index: usize,
        prompt: &str,
        negative_prompt: &str,
    ) -> Option<GenerationResult> {
        let (base_image_url, aspect_ratio, role, have_results) = {
            let state = self.inner.state.lock();
            (
                state.image_url.clone(),
                state
                    .aspect_ratio
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ASPECT_RATIO.to_string()),
                state
                    .results
                    .get(index)
                    .map(|entry| entry.role.clone())
                    .unwrap_or_default(),
                !state.results.is_empty(),
            )
        };
        if !have_results {
            let message = "no generation results to regenerate".to_string();
            self.inner.state.lock().error = Some(message.clone());
            let _ = self.inner.events.send(StudioEvent::Failed { message });
            return None;
        }

        let request = RegenerateRequest {
            prompt: prompt.to_string(),
            negative_prompt: negative_prompt.to_string(),
            base_image_url,
            aspect_ratio,
            order: (index + 1) as u32,
            role,
        };
        match self.inner.api.regenerate(&request).await {
            Ok(result) => {
                let mut replacement = result.clone();
                replacement.success = true;
                self.inner.state.lock().results.merge(index, replacement);
                Some(result)
            }
            Err(e) => {
                let message = e.to_string();
                self.inner.state.lock().error = Some(message.clone());
                let _ = self.inner.events.send(StudioEvent::Failed { message });
                None
            }
        }
    }

    // ── Advisory operations ──

    /// Score a generated image against its prompt. Errors return directly
    /// and never move task status.
    pub async fn assess_quality(
        &self,
        image_url: &str,
        original_prompt: &str,
    ) -> Result<QualityAssessment, StageError> {
        self.inner.api.assess_quality(image_url, original_prompt).await
    }

    /// Localized marketing copy for the analyzed product.
    pub async fn multilingual_copy(
        &self,
        languages: &[String],
    ) -> Result<MultilingualCopy, StageError> {
        let product_info = {
            let state = self.inner.state.lock();
            state.analysis.as_ref().map(|a| a.basic_info.clone())
        };
        let product_info = product_info.ok_or(StageError::Precondition(
            "product analysis missing: run analyze first",
        ))?;
        self.inner.api.multilingual_copy(&product_info, languages).await
    }

    // ── Lifecycle ──

    /// Drop the channel and return every piece of state to its initial
    /// value. The identity is cleared under the state lock before this
    /// returns, so nothing still in flight from the old channel can be
    /// applied afterwards.
    pub fn reset(&self) {
        let previous = self.inner.channel.lock().take();
        if let Some(channel) = previous {
            channel.close();
        }
        *self.inner.state.lock() = TaskState::new();
    }

    /// Move the display cursor without touching the pipeline. Out-of-range
    /// steps are ignored.
    pub fn go_to_step(&self, step: u8) {
        if (1..=5).contains(&step) {
            self.inner.state.lock().step = step;
        }
    }

    // ── Internals ──

    async fn open_channel(&self, id: &str) -> Result<(), StageError> {
        let previous = self.inner.channel.lock().take();
        if let Some(channel) = previous {
            channel.close();
        }
        let url = self.inner.config.ws_url(id);
        let rx = self.inner.transport.open(&url).await?;
        // the pump must not keep the orchestrator alive: it holds only a
        // weak handle, and dropping the last consumer handle drops `Inner`,
        // whose guard aborts the pump and closes the socket
        let guard = ChannelGuard::spawn(id.to_string(), rx, {
            let inner: Weak<Inner<A, T>> = Arc::downgrade(&self.inner);
            let id = id.to_string();
            move |event| match inner.upgrade() {
                Some(inner) => {
                    Studio { inner }.apply_event(&id, event);
                    true
                }
                None => false,
            }
        });
        *self.inner.channel.lock() = Some(guard);
        Ok(())
    }

    /// Single dispatch point for streamed progress events.
    ///
    /// Events are scoped to the identity their channel was opened under;
    /// once `reset()` or a newer `generate()` changes the live identity,
    /// anything still in flight from the old channel is dropped here. After
    /// the run turns terminal, state is frozen but frames are still
    /// forwarded to the consumer.
    fn apply_event(&self, channel_task: &str, event: ProgressEvent) {
        let mut completed = false;
        let mut terminal_failure = None;
        {
            let mut state = self.inner.state.lock();
            if state.task_id.as_deref() != Some(channel_task) {
                debug!(task_id = channel_task, "dropping event from stale channel");
                return;
            }
            if !state.status.is_terminal() {
                state.progress = event.progress.min(100);
                if let Some(url) = &event.image_url {
                    let index = event.current.unwrap_or(1).saturating_sub(1) as usize;
                    state.results.merge_image(index, url);
                }
                if event.stage == ProgressStage::Completed {
                    state.status = TaskStatus::Completed;
                    state.step = 5;
                    completed = true;
                } else if event.stage == ProgressStage::Failed || event.error.is_some() {
                    let message = event
                        .error
                        .clone()
                        .unwrap_or_else(|| "generation failed".to_string());
                    state.status = TaskStatus::Failed;
                    state.error = Some(message.clone());
                    terminal_failure = Some(message);
                }
            }
        }
        let _ = self.inner.events.send(StudioEvent::Progress(event));
        if completed {
            let _ = self.inner.events.send(StudioEvent::Completed);
        }
        if let Some(message) = terminal_failure {
            let _ = self.inner.events.send(StudioEvent::Failed { message });
        }
    }

    fn fail_stage(&self, message: String) {
        {
            let mut state = self.inner.state.lock();
            state.status = TaskStatus::Failed;
            state.error = Some(message.clone());
        }
        let _ = self.inner.events.send(StudioEvent::Failed { message });
    }
}

//! Stage executors: one outbound call per pipeline stage.
//!
//! Every endpoint is a POST with a JSON body replying with the uniform
//! `{success, data, error}` envelope; non-2xx statuses and `success=false`
//! both surface as [`StageError`]s. The orchestrator is generic over
//! [`StageApi`] so tests can substitute a scripted implementation.

use std::future::Future;

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::config::StudioConfig;
use crate::error::StageError;
use crate::types::{
    Envelope, GenerationResult, MultilingualCopy, PagePlan, ProductAnalysis, ProductInfo,
    QualityAssessment, RegenerateRequest,
};

/// The remote pipeline surface the orchestrator drives.
pub trait StageApi: Send + Sync + 'static {
    /// Deep product analysis of the uploaded image.
    fn analyze(
        &self,
        image_url: &str,
    ) -> impl Future<Output = Result<ProductAnalysis, StageError>> + Send;

    /// Detail-page structure plan derived from the analysis.
    fn plan(
        &self,
        analysis: &ProductAnalysis,
        count: u32,
        platform: &str,
        aspect_ratio: &str,
    ) -> impl Future<Output = Result<PagePlan, StageError>> + Send;

    /// Batch generation; progress streams separately under `task_id`.
    fn generate(
        &self,
        plan: &PagePlan,
        product_info: &ProductInfo,
        base_image_url: &str,
        task_id: &str,
        aspect_ratio: &str,
    ) -> impl Future<Output = Result<Vec<GenerationResult>, StageError>> + Send;

    /// Regenerate a single image.
    fn regenerate(
        &self,
        request: &RegenerateRequest,
    ) -> impl Future<Output = Result<GenerationResult, StageError>> + Send;

    /// Score a generated image against its prompt (advisory).
    fn assess_quality(
        &self,
        image_url: &str,
        original_prompt: &str,
    ) -> impl Future<Output = Result<QualityAssessment, StageError>> + Send;

    /// Localized marketing copy for the analyzed product (advisory).
    fn multilingual_copy(
        &self,
        product_info: &ProductInfo,
        languages: &[String],
    ) -> impl Future<Output = Result<MultilingualCopy, StageError>> + Send;
}

/// reqwest-backed implementation of [`StageApi`].
pub struct HttpApi {
    config: StudioConfig,
    http: reqwest::Client,
}

impl HttpApi {
    pub fn new(config: StudioConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn post<T, B>(&self, url: &str, body: &B, what: &str) -> Result<T, StageError>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!(%url, "POST {what}");
        let mut request = self.http.post(url).json(body);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::Status { status, body });
        }
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| StageError::Malformed(e.to_string()))?;
        envelope.into_data(what)
    }

    /// Upload a source image, returning its stable URL.
    ///
    /// Lives here rather than on [`StageApi`] because it is the image
    /// reference provider's concern, not a pipeline stage: the orchestrator
    /// only ever sees the returned URL.
    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StageError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let mut request = self.http.post(self.config.upload_endpoint()).multipart(form);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::Status { status, body });
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StageError::Malformed(e.to_string()))?;
        body.get("url")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StageError::Malformed("upload reply missing url".to_string()))
    }
}

impl StageApi for HttpApi {
    async fn analyze(&self, image_url: &str) -> Result<ProductAnalysis, StageError> {
        self.post(
            &self.config.endpoint("analyze"),
            &json!({ "image_url": image_url }),
            "analyze",
        )
        .await
    }

    async fn plan(
        &self,
        analysis: &ProductAnalysis,
        count: u32,
        platform: &str,
        aspect_ratio: &str,
    ) -> Result<PagePlan, StageError> {
        self.post(
            &self.config.endpoint("plan"),
            &json!({
                "product_analysis": analysis,
                "count": count,
                "platform": platform,
                "aspect_ratio": aspect_ratio,
            }),
            "plan",
        )
        .await
    }

    async fn generate(
        &self,
        plan: &PagePlan,
        product_info: &ProductInfo,
        base_image_url: &str,
        task_id: &str,
        aspect_ratio: &str,
    ) -> Result<Vec<GenerationResult>, StageError> {
        self.post(
            &self.config.endpoint("generate"),
            &json!({
                "page_plan": plan,
                "product_info": product_info,
                "base_image_url": base_image_url,
                "task_id": task_id,
                "aspect_ratio": aspect_ratio,
            }),
            "generate",
        )
        .await
    }

    async fn regenerate(
        &self,
        request: &RegenerateRequest,
    ) -> Result<GenerationResult, StageError> {
        self.post(&self.config.endpoint("regenerate"), request, "regenerate")
            .await
    }

    async fn assess_quality(
        &self,
        image_url: &str,
        original_prompt: &str,
    ) -> Result<QualityAssessment, StageError> {
        self.post(
            &self.config.endpoint("assess-quality"),
            &json!({
                "image_url": image_url,
                "original_prompt": original_prompt,
            }),
            "assess-quality",
        )
        .await
    }

    async fn multilingual_copy(
        &self,
        product_info: &ProductInfo,
        languages: &[String],
    ) -> Result<MultilingualCopy, StageError> {
        self.post(
            &self.config.endpoint("multilingual-copy"),
            &json!({
                "product_info": product_info,
                "target_languages": languages,
            }),
            "multilingual-copy",
        )
        .await
    }
}

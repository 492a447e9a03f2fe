//! reqwest-backed client for the job-board REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::backend::{BackendError, JobBotBackend};
use super::domain::{
    ApplicationRecord, ChoiceQuestion, EnhancedResume, EnhancementRequest, EvaluationRequest,
    EvaluationResult, JobId, UserId,
};
use crate::config::BackendConfig;

const GENERATE_QUESTIONS_ENDPOINT: &str = "/api/bot/generate-questions";
const EVALUATE_ENDPOINT: &str = "/api/bot/evaluate";
const RESUME_ENDPOINT: &str = "/api/bot/resume";
const ENHANCE_ENDPOINT: &str = "/api/bot/enhance-resume";
const APPLY_ENDPOINT: &str = "/api/applications/apply";
const CHECK_APPLIED_ENDPOINT: &str = "/api/applications/check";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateQuestionsRequest<'a> {
    job_title: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateQuestionsResponse {
    #[serde(default)]
    questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    question: String,
    #[serde(default)]
    options: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ResumeResponse {
    resume: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhanceResponse {
    enhanced_cv: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AppliedResponse {
    Flag(bool),
    Wrapped { applied: bool },
}

/// HTTP implementation of [`JobBotBackend`].
pub struct HttpJobBotBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJobBotBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| BackendError::Client(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn ensure_success(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        trace!(endpoint, %status, "backend responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        warn!(endpoint, %status, %body, "backend returned an error status");
        Err(BackendError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn read<R>(endpoint: &str, response: reqwest::Response) -> Result<R, BackendError>
    where
        R: DeserializeOwned,
    {
        Self::ensure_success(endpoint, response)
            .await?
            .json::<R>()
            .await
            .map_err(|err| BackendError::Decode {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            })
    }

    fn transport(endpoint: &str, err: reqwest::Error) -> BackendError {
        BackendError::Transport {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }

    async fn post_json<T, R>(&self, endpoint: &str, payload: &T) -> Result<R, BackendError>
    where
        T: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|err| Self::transport(endpoint, err))?;
        Self::read(endpoint, response).await
    }

    async fn get_json<R>(&self, endpoint: &str, path: &str) -> Result<R, BackendError>
    where
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.url(endpoint), path);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| Self::transport(endpoint, err))?;
        Self::read(endpoint, response).await
    }
}

#[async_trait]
impl JobBotBackend for HttpJobBotBackend {
    async fn generate_questions(
        &self,
        job_title: &str,
    ) -> Result<Vec<ChoiceQuestion>, BackendError> {
        let response: GenerateQuestionsResponse = self
            .post_json(
                GENERATE_QUESTIONS_ENDPOINT,
                &GenerateQuestionsRequest { job_title },
            )
            .await?;

        Ok(response
            .questions
            .into_iter()
            .map(|generated| ChoiceQuestion::new(generated.question, generated.options))
            .collect())
    }

    async fn evaluate_answers(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult, BackendError> {
        self.post_json(EVALUATE_ENDPOINT, request).await
    }

    async fn user_resume(&self, user_id: &UserId) -> Result<String, BackendError> {
        let response: ResumeResponse = self
            .get_json(RESUME_ENDPOINT, &format!("/{user_id}"))
            .await?;
        Ok(response.resume)
    }

    async fn enhance_resume(
        &self,
        request: &EnhancementRequest,
    ) -> Result<EnhancedResume, BackendError> {
        let response: EnhanceResponse = self.post_json(ENHANCE_ENDPOINT, request).await?;
        Ok(EnhancedResume {
            content: response.enhanced_cv,
        })
    }

    async fn apply_to_job(&self, record: &ApplicationRecord) -> Result<(), BackendError> {
        let url = self.url(APPLY_ENDPOINT);
        debug!(%url, job_id = %record.job_id, "POST");
        let response = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|err| Self::transport(APPLY_ENDPOINT, err))?;
        Self::ensure_success(APPLY_ENDPOINT, response).await?;
        Ok(())
    }

    async fn has_applied(&self, user_id: &UserId, job_id: &JobId) -> Result<bool, BackendError> {
        let url = self.url(CHECK_APPLIED_ENDPOINT);
        debug!(%url, %user_id, %job_id, "GET");
        let response = self
            .client
            .get(&url)
            .query(&[("userId", user_id.0.as_str()), ("jobId", job_id.0.as_str())])
            .send()
            .await
            .map_err(|err| Self::transport(CHECK_APPLIED_ENDPOINT, err))?;

        let applied: AppliedResponse = Self::read(CHECK_APPLIED_ENDPOINT, response).await?;
        Ok(match applied {
            AppliedResponse::Flag(flag) => flag,
            AppliedResponse::Wrapped { applied } => applied,
        })
    }
}

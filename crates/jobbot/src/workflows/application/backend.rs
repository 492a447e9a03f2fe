use async_trait::async_trait;

use super::domain::{
    ApplicationRecord, ChoiceQuestion, EnhancedResume, EnhancementRequest, EvaluationRequest,
    EvaluationResult, JobId, UserId,
};

/// Remote job-board operations the application bot depends on. The backend owns question
/// generation, scoring, resume storage, enhancement and application persistence.
#[async_trait]
pub trait JobBotBackend: Send + Sync {
    async fn generate_questions(&self, job_title: &str)
        -> Result<Vec<ChoiceQuestion>, BackendError>;

    async fn evaluate_answers(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult, BackendError>;

    async fn user_resume(&self, user_id: &UserId) -> Result<String, BackendError>;

    async fn enhance_resume(
        &self,
        request: &EnhancementRequest,
    ) -> Result<EnhancedResume, BackendError>;

    async fn apply_to_job(&self, record: &ApplicationRecord) -> Result<(), BackendError>;

    async fn has_applied(&self, user_id: &UserId, job_id: &JobId) -> Result<bool, BackendError>;
}

/// Failure talking to the job-board backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("could not decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("backend client misconfigured: {0}")]
    Client(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

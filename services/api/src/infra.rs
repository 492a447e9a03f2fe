use async_trait::async_trait;
use chrono::NaiveDate;
use jobbot::error::AppError;
use jobbot::workflows::application::{
    ApplicationRecord, BackendError, ChoiceQuestion, EnhancedResume, EnhancementRequest,
    EvaluationRequest, EvaluationResult, JobBotBackend, JobId, JobPosting, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Job board kept in memory for demos: fixed verdict, canned resume, and a log of submitted
/// applications.
pub(crate) struct InMemoryJobBoard {
    score: f64,
    pass_mark: f64,
    resume: String,
    applications: Mutex<Vec<ApplicationRecord>>,
}

impl InMemoryJobBoard {
    pub(crate) fn new(score: f64, pass_mark: f64) -> Self {
        Self {
            score,
            pass_mark,
            resume: "Backend developer, four years with Rust and PostgreSQL. Built payment \
                     reconciliation jobs and internal REST APIs."
                .to_string(),
            applications: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn applications(&self) -> Vec<ApplicationRecord> {
        self.applications
            .lock()
            .expect("applications mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl JobBotBackend for InMemoryJobBoard {
    async fn generate_questions(
        &self,
        job_title: &str,
    ) -> Result<Vec<ChoiceQuestion>, BackendError> {
        Ok(vec![
            ChoiceQuestion::new(
                format!("Which area of {job_title} work do you enjoy most?"),
                vec![
                    "API design".to_string(),
                    "Data modelling".to_string(),
                    "Operations".to_string(),
                ],
            ),
            ChoiceQuestion::new(
                "How do you prefer to collaborate?",
                vec![
                    "Pairing".to_string(),
                    "Async reviews".to_string(),
                ],
            ),
        ])
    }

    async fn evaluate_answers(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult, BackendError> {
        if request.questions.len() != request.answers.len() {
            return Err(BackendError::Unavailable(
                "questions and answers differ in length".to_string(),
            ));
        }
        Ok(EvaluationResult {
            score: self.score,
            qualified: self.score >= self.pass_mark,
        })
    }

    async fn user_resume(&self, _user_id: &UserId) -> Result<String, BackendError> {
        Ok(self.resume.clone())
    }

    async fn enhance_resume(
        &self,
        request: &EnhancementRequest,
    ) -> Result<EnhancedResume, BackendError> {
        Ok(EnhancedResume {
            content: format!(
                "{} role at {}\n\n{}\n\nTailored for: {}",
                request.job_title, request.company, request.resume, request.job_description
            ),
        })
    }

    async fn apply_to_job(&self, record: &ApplicationRecord) -> Result<(), BackendError> {
        self.applications
            .lock()
            .expect("applications mutex poisoned")
            .push(record.clone());
        Ok(())
    }

    async fn has_applied(&self, user_id: &UserId, job_id: &JobId) -> Result<bool, BackendError> {
        let guard = self.applications.lock().expect("applications mutex poisoned");
        Ok(guard
            .iter()
            .any(|record| &record.user_id == user_id && &record.job_id == job_id))
    }
}

pub(crate) fn sample_job() -> JobPosting {
    JobPosting {
        job_id: JobId("job-demo-001".to_string()),
        title: "Backend Engineer".to_string(),
        company: "Acme Logistics".to_string(),
        location: "Pune".to_string(),
        min_salary: Some(1_200_000),
        max_salary: Some(1_800_000),
        description: "Design and operate the order routing platform.".to_string(),
        requirements: Some("3+ years building HTTP services".to_string()),
        perks: Some("Hybrid work".to_string()),
        opening_date: NaiveDate::from_ymd_opt(2025, 9, 1),
        last_date: NaiveDate::from_ymd_opt(2025, 10, 31),
        openings: Some(2),
    }
}

/// Read a job posting from a JSON file in the job board's wire format.
pub(crate) fn load_job(path: &Path) -> Result<JobPosting, AppError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|err| {
        AppError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} is not a valid job posting: {err}", path.display()),
        ))
    })
}

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::application::backend::{BackendError, JobBotBackend};
use crate::workflows::application::domain::{
    Applicant, ApplicationRecord, ChoiceQuestion, EnhancedResume, EnhancementRequest,
    EvaluationRequest, EvaluationResult, JobId, JobPosting, PaymentAttempt, PaymentReceipt,
    UserId,
};
use crate::workflows::application::flow::{ApplicationFlow, FlowEffect};
use crate::workflows::application::payment::{
    PaymentError, PaymentGateway, SimulatedPaymentGateway,
};
use crate::workflows::application::service::ApplicationFlowService;

pub(super) fn job() -> JobPosting {
    JobPosting {
        job_id: JobId("job-42".to_string()),
        title: "Backend Engineer".to_string(),
        company: "Acme Logistics".to_string(),
        location: "Pune".to_string(),
        min_salary: Some(1_200_000),
        max_salary: Some(1_800_000),
        description: "Own the order routing services.".to_string(),
        requirements: Some("3+ years building HTTP services".to_string()),
        perks: None,
        opening_date: NaiveDate::from_ymd_opt(2025, 9, 1),
        last_date: NaiveDate::from_ymd_opt(2025, 10, 31),
        openings: Some(2),
    }
}

pub(super) fn applicant() -> Applicant {
    Applicant {
        user_id: UserId("user-7".to_string()),
    }
}

pub(super) fn generated_questions() -> Vec<ChoiceQuestion> {
    vec![
        ChoiceQuestion::new(
            "Which database have you operated in production?",
            vec![
                "PostgreSQL".to_string(),
                "MongoDB".to_string(),
                "None".to_string(),
            ],
        ),
        ChoiceQuestion::new(
            "How do you usually expose service APIs?",
            vec!["REST".to_string(), "gRPC".to_string()],
        ),
    ]
}

pub(super) const FIXED_ANSWERS: [&str; 5] = ["Pune", "yes", "yes", "B.Tech", "4"];

/// Flow with questions loaded and waiting on the first answer.
pub(super) fn answering_flow(dynamic: Vec<ChoiceQuestion>) -> ApplicationFlow {
    let mut flow = ApplicationFlow::new(job(), applicant());
    flow.start().expect("flow starts");
    flow.questions_loaded(Ok::<_, BackendError>(dynamic));
    flow
}

/// Answer every question, returning the scoring effect produced by the last answer.
pub(super) fn answer_all(flow: &mut ApplicationFlow) -> FlowEffect {
    let mut last = None;
    for answer in FIXED_ANSWERS {
        last = flow.answer_text(answer).expect("text answer accepted");
    }
    while last.is_none() {
        flow.select_option(0).expect("option selectable");
        last = flow.confirm_choice().expect("choice confirmed");
    }
    last.expect("last answer triggers scoring")
}

pub(super) fn evaluated_flow(score: f64, qualified: bool) -> ApplicationFlow {
    let mut flow = answering_flow(generated_questions());
    answer_all(&mut flow);
    flow.evaluation_received(Ok::<_, BackendError>(EvaluationResult { score, qualified }));
    flow
}

/// In-memory backend with scripted answers that records every call it receives.
pub(super) struct ScriptedBackend {
    questions: Option<Vec<ChoiceQuestion>>,
    evaluation: Option<EvaluationResult>,
    resume: Option<String>,
    enhanced: Option<String>,
    already_applied: bool,
    scoring_gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<&'static str>>,
    evaluations: Mutex<Vec<EvaluationRequest>>,
    enhancements: Mutex<Vec<EnhancementRequest>>,
    applications: Mutex<Vec<ApplicationRecord>>,
}

impl ScriptedBackend {
    pub(super) fn scoring(score: f64, qualified: bool) -> Self {
        Self {
            questions: Some(generated_questions()),
            evaluation: Some(EvaluationResult { score, qualified }),
            resume: Some("Backend developer with four years of Rust and Go.".to_string()),
            enhanced: Some(
                "Backend engineer with four years shipping Rust order-routing services."
                    .to_string(),
            ),
            already_applied: false,
            scoring_gate: None,
            calls: Mutex::new(Vec::new()),
            evaluations: Mutex::new(Vec::new()),
            enhancements: Mutex::new(Vec::new()),
            applications: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn without_generator(mut self) -> Self {
        self.questions = None;
        self
    }

    pub(super) fn without_scorer(mut self) -> Self {
        self.evaluation = None;
        self
    }

    pub(super) fn without_resume(mut self) -> Self {
        self.resume = None;
        self
    }

    /// Hold every scoring response until `gate` is notified.
    pub(super) fn with_scoring_gate(mut self, gate: Arc<Notify>) -> Self {
        self.scoring_gate = Some(gate);
        self
    }

    pub(super) fn without_enhancer(mut self) -> Self {
        self.enhanced = None;
        self
    }

    pub(super) fn with_existing_application(mut self) -> Self {
        self.already_applied = true;
        self
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }

    pub(super) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(super) fn evaluations(&self) -> Vec<EvaluationRequest> {
        self.evaluations
            .lock()
            .expect("evaluations mutex poisoned")
            .clone()
    }

    pub(super) fn enhancements(&self) -> Vec<EnhancementRequest> {
        self.enhancements
            .lock()
            .expect("enhancements mutex poisoned")
            .clone()
    }

    pub(super) fn applications(&self) -> Vec<ApplicationRecord> {
        self.applications
            .lock()
            .expect("applications mutex poisoned")
            .clone()
    }

    fn unavailable(call: &str) -> BackendError {
        BackendError::Unavailable(format!("{call} is scripted to fail"))
    }
}

#[async_trait]
impl JobBotBackend for ScriptedBackend {
    async fn generate_questions(
        &self,
        _job_title: &str,
    ) -> Result<Vec<ChoiceQuestion>, BackendError> {
        self.record("generate_questions");
        self.questions
            .clone()
            .ok_or_else(|| Self::unavailable("generate_questions"))
    }

    async fn evaluate_answers(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult, BackendError> {
        self.record("evaluate_answers");
        self.evaluations
            .lock()
            .expect("evaluations mutex poisoned")
            .push(request.clone());
        if let Some(gate) = &self.scoring_gate {
            gate.notified().await;
        }
        self.evaluation
            .ok_or_else(|| Self::unavailable("evaluate_answers"))
    }

    async fn user_resume(&self, _user_id: &UserId) -> Result<String, BackendError> {
        self.record("user_resume");
        self.resume
            .clone()
            .ok_or_else(|| Self::unavailable("user_resume"))
    }

    async fn enhance_resume(
        &self,
        request: &EnhancementRequest,
    ) -> Result<EnhancedResume, BackendError> {
        self.record("enhance_resume");
        self.enhancements
            .lock()
            .expect("enhancements mutex poisoned")
            .push(request.clone());
        self.enhanced
            .clone()
            .map(|content| EnhancedResume { content })
            .ok_or_else(|| Self::unavailable("enhance_resume"))
    }

    async fn apply_to_job(&self, record: &ApplicationRecord) -> Result<(), BackendError> {
        self.record("apply_to_job");
        self.applications
            .lock()
            .expect("applications mutex poisoned")
            .push(record.clone());
        Ok(())
    }

    async fn has_applied(&self, _user_id: &UserId, _job_id: &JobId) -> Result<bool, BackendError> {
        self.record("has_applied");
        Ok(self.already_applied)
    }
}

pub(super) fn instant_payments() -> Arc<SimulatedPaymentGateway> {
    Arc::new(SimulatedPaymentGateway::new(Duration::ZERO))
}

/// Gateway that refuses every payment, either declined or unavailable.
pub(super) struct FailingGateway {
    declined: bool,
}

impl FailingGateway {
    pub(super) fn declining() -> Arc<Self> {
        Arc::new(Self { declined: true })
    }

    pub(super) fn unavailable() -> Arc<Self> {
        Arc::new(Self { declined: false })
    }
}

#[async_trait]
impl PaymentGateway for FailingGateway {
    async fn settle(&self, attempt: &PaymentAttempt) -> Result<PaymentReceipt, PaymentError> {
        let method = attempt.method.label();
        if self.declined {
            Err(PaymentError::Declined(format!("{method} payment refused by issuer")))
        } else {
            Err(PaymentError::Unavailable(format!("{method} rail offline")))
        }
    }
}

pub(super) fn build_service(
    backend: ScriptedBackend,
) -> (
    Arc<ApplicationFlowService<ScriptedBackend, SimulatedPaymentGateway>>,
    Arc<ScriptedBackend>,
) {
    build_service_with(backend, instant_payments())
}

pub(super) fn build_service_with<P: PaymentGateway + 'static>(
    backend: ScriptedBackend,
    payments: Arc<P>,
) -> (Arc<ApplicationFlowService<ScriptedBackend, P>>, Arc<ScriptedBackend>) {
    let backend = Arc::new(backend);
    let service = Arc::new(ApplicationFlowService::new(Arc::clone(&backend), payments));
    (service, backend)
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}

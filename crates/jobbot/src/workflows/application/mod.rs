//! Applicant screening bot: fixed and generated screening questions, remote scoring, optional
//! paid resume enhancement, and the final application submit.

pub mod backend;
pub mod domain;
pub mod driver;
pub mod flow;
pub mod http;
pub mod payment;
pub(crate) mod questionnaire;
pub mod registry;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use backend::{BackendError, JobBotBackend};
pub use domain::{
    AnswerMap, AnswerValue, Applicant, ApplicationRecord, ChoiceQuestion, EnhancedResume,
    EnhancementRequest, EvaluationRequest, EvaluationResult, FixedQuestion, FixedTopic, JobId,
    JobPosting, PaymentAttempt, PaymentDetails, PaymentMethod, PaymentReceipt, QuestionId, UserId,
};
pub use driver::{EffectOutcome, FlowDriver};
pub use flow::{
    ApplicationFlow, EnhancementStage, FlowAction, FlowEffect, FlowError, FlowState, FlowView,
    QuestionView,
};
pub use http::HttpJobBotBackend;
pub use payment::{PaymentError, PaymentGateway, SimulatedPaymentGateway};
pub use questionnaire::{Progress, QuestionRef, Questionnaire, QuestionnaireError};
pub use registry::{FlowId, FlowRegistry};
pub use router::{flow_router, OpenFlowRequest};
pub use service::{ApplicationFlowService, FlowServiceError, FlowSnapshot};

use crate::workflows::application::domain::{
    ApplicationRecord, EnhancementRequest, EvaluationRequest, PaymentAttempt, UserId,
};

/// Remote call a transition needs before the flow can move on. The driver performs it and
/// feeds the outcome back through the matching `ApplicationFlow` response handler.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEffect {
    GenerateQuestions { job_title: String },
    EvaluateAnswers(EvaluationRequest),
    SettlePayment(PaymentAttempt),
    FetchResume { user_id: UserId },
    EnhanceResume(EnhancementRequest),
    SubmitApplication(ApplicationRecord),
}

impl FlowEffect {
    pub const fn label(&self) -> &'static str {
        match self {
            FlowEffect::GenerateQuestions { .. } => "generate_questions",
            FlowEffect::EvaluateAnswers(_) => "evaluate_answers",
            FlowEffect::SettlePayment(_) => "settle_payment",
            FlowEffect::FetchResume { .. } => "fetch_resume",
            FlowEffect::EnhanceResume(_) => "enhance_resume",
            FlowEffect::SubmitApplication(_) => "submit_application",
        }
    }
}

use std::sync::Arc;

use tracing::debug;

use super::backend::{BackendError, JobBotBackend};
use super::domain::{ChoiceQuestion, EnhancedResume, EvaluationResult, PaymentReceipt};
use super::flow::{ApplicationFlow, FlowEffect};
use super::payment::{PaymentError, PaymentGateway};
use super::registry::FlowHandle;

/// Response to one remote call, waiting to be handed back to its flow.
#[derive(Debug)]
pub enum EffectOutcome {
    QuestionsGenerated(Result<Vec<ChoiceQuestion>, BackendError>),
    AnswersEvaluated(Result<EvaluationResult, BackendError>),
    PaymentSettled(Result<PaymentReceipt, PaymentError>),
    ResumeFetched(Result<String, BackendError>),
    ResumeEnhanced(Result<EnhancedResume, BackendError>),
    ApplicationSubmitted(Result<(), BackendError>),
}

impl EffectOutcome {
    /// Run the matching response handler and track the follow-up call, if any.
    pub fn feed(self, flow: &mut ApplicationFlow) -> Option<FlowEffect> {
        let next = match self {
            EffectOutcome::QuestionsGenerated(outcome) => {
                flow.questions_loaded(outcome);
                None
            }
            EffectOutcome::AnswersEvaluated(outcome) => {
                flow.evaluation_received(outcome);
                None
            }
            EffectOutcome::PaymentSettled(outcome) => flow.payment_settled(outcome),
            EffectOutcome::ResumeFetched(outcome) => flow.resume_fetched(outcome),
            EffectOutcome::ResumeEnhanced(outcome) => {
                flow.resume_enhanced(outcome);
                None
            }
            EffectOutcome::ApplicationSubmitted(outcome) => {
                flow.application_submitted(outcome);
                None
            }
        };
        flow.track(next)
    }
}

/// Performs the remote calls a flow asks for and feeds each outcome back, one at a time.
pub struct FlowDriver<B: ?Sized, P: ?Sized> {
    backend: Arc<B>,
    payments: Arc<P>,
}

impl<B: ?Sized, P: ?Sized> Clone for FlowDriver<B, P> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            payments: Arc::clone(&self.payments),
        }
    }
}

impl<B, P> FlowDriver<B, P>
where
    B: JobBotBackend + ?Sized,
    P: PaymentGateway + ?Sized,
{
    pub fn new(backend: Arc<B>, payments: Arc<P>) -> Self {
        Self { backend, payments }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run `effect` and every call it chains into. The flow lock is only taken to feed an
    /// outcome back, so views and a close can get in while a call is out.
    pub async fn drive(&self, handle: &FlowHandle, effect: Option<FlowEffect>) {
        let mut pending = effect;
        while let Some(effect) = pending.take() {
            debug!(effect = effect.label(), "executing flow effect");
            let outcome = self.call(effect).await;
            pending = outcome.feed(&mut *handle.lock().await);
        }
    }

    pub async fn call(&self, effect: FlowEffect) -> EffectOutcome {
        match effect {
            FlowEffect::GenerateQuestions { job_title } => {
                EffectOutcome::QuestionsGenerated(self.backend.generate_questions(&job_title).await)
            }
            FlowEffect::EvaluateAnswers(request) => {
                EffectOutcome::AnswersEvaluated(self.backend.evaluate_answers(&request).await)
            }
            FlowEffect::SettlePayment(attempt) => {
                EffectOutcome::PaymentSettled(self.payments.settle(&attempt).await)
            }
            FlowEffect::FetchResume { user_id } => {
                EffectOutcome::ResumeFetched(self.backend.user_resume(&user_id).await)
            }
            FlowEffect::EnhanceResume(request) => {
                EffectOutcome::ResumeEnhanced(self.backend.enhance_resume(&request).await)
            }
            FlowEffect::SubmitApplication(record) => {
                EffectOutcome::ApplicationSubmitted(self.backend.apply_to_job(&record).await)
            }
        }
    }
}

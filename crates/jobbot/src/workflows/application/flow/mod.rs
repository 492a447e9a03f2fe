//! Explicit state machine behind the application bot.
//!
//! Transitions are synchronous. Anything that needs the network returns a [`FlowEffect`]; the
//! caller performs the call and hands the outcome to the matching response handler
//! (`questions_loaded`, `evaluation_received`, ...). Responses that arrive after the flow moved
//! on or closed are dropped.

mod action;
mod effect;
mod state;
mod view;

pub use action::FlowAction;
pub use effect::FlowEffect;
pub use state::{EnhancementStage, FlowState};
pub use view::{FlowView, QuestionView};

use std::fmt::Display;

use tracing::{debug, info, warn};

use super::domain::{
    Applicant, ApplicationRecord, ChoiceQuestion, EnhancedResume, EnhancementRequest,
    EvaluationResult, JobPosting, PaymentAttempt, PaymentDetails, PaymentMethod, PaymentReceipt,
};
use super::questionnaire::{Progress, Questionnaire, QuestionnaireError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("cannot {action} while the flow is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error(transparent)]
    Questionnaire(#[from] QuestionnaireError),
    #[error("payment details are for {provided} but {expected} was chosen")]
    PaymentMethodMismatch {
        expected: &'static str,
        provided: &'static str,
    },
    #[error("payment field `{0}` is required")]
    MissingPaymentField(&'static str),
}

/// One applicant working through the bot for one job.
#[derive(Debug, Clone)]
pub struct ApplicationFlow {
    job: JobPosting,
    applicant: Applicant,
    state: FlowState,
    questionnaire: Questionnaire,
    evaluation: Option<EvaluationResult>,
    application_dispatched: bool,
    application_acknowledged: bool,
    halted: Option<String>,
    outstanding: Option<&'static str>,
}

impl ApplicationFlow {
    pub fn new(job: JobPosting, applicant: Applicant) -> Self {
        let questionnaire = Questionnaire::for_job(&job);
        Self {
            job,
            applicant,
            state: FlowState::NotStarted,
            questionnaire,
            evaluation: None,
            application_dispatched: false,
            application_acknowledged: false,
            halted: None,
            outstanding: None,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn job(&self) -> &JobPosting {
        &self.job
    }

    pub fn applicant(&self) -> &Applicant {
        &self.applicant
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    pub fn evaluation(&self) -> Option<&EvaluationResult> {
        self.evaluation.as_ref()
    }

    pub fn score(&self) -> Option<f64> {
        self.evaluation.map(|result| result.score)
    }

    /// True once the scorer said yes; gates payment and enhancement.
    pub fn is_qualified(&self) -> bool {
        self.evaluation.is_some_and(|result| result.qualified)
    }

    pub fn application_dispatched(&self) -> bool {
        self.application_dispatched
    }

    pub fn application_acknowledged(&self) -> bool {
        self.application_acknowledged
    }

    /// Reason forward progress stopped after a failed remote call.
    pub fn halted(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    /// Remote call handed out by `apply` or the driver whose response has not come back yet.
    pub fn outstanding(&self) -> Option<&'static str> {
        self.outstanding
    }

    /// Record `effect` as the call now in flight and pass it through.
    pub fn track(&mut self, effect: Option<FlowEffect>) -> Option<FlowEffect> {
        self.outstanding = effect.as_ref().map(FlowEffect::label);
        effect
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, FlowState::Closed)
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            action,
            state: self.state.label(),
        }
    }

    fn halt(&mut self, step: &'static str, error: impl Display) {
        warn!(
            job_id = %self.job.job_id,
            state = self.state.label(),
            %error,
            "{step} failed; flow halted until closed"
        );
        self.halted = Some(format!("{step} failed: {error}"));
    }

    fn ignore_late(&self, response: &'static str) {
        debug!(
            job_id = %self.job.job_id,
            state = self.state.label(),
            response,
            "dropping response that no longer matches the flow state"
        );
    }

    /// Builds the application record; returns `None` once one has already been dispatched.
    fn dispatch_application(&mut self) -> Option<FlowEffect> {
        if self.application_dispatched {
            return None;
        }
        let evaluation = self.evaluation?;
        self.application_dispatched = true;
        Some(FlowEffect::SubmitApplication(ApplicationRecord {
            user_id: self.applicant.user_id.clone(),
            job_id: self.job.job_id.clone(),
            answers: self.questionnaire.answer_map(),
            score: evaluation.score,
            qualified: evaluation.qualified,
        }))
    }

    pub fn start(&mut self) -> Result<FlowEffect, FlowError> {
        if self.state != FlowState::NotStarted {
            return Err(self.invalid("start"));
        }
        self.state = FlowState::LoadingQuestions;
        info!(job_id = %self.job.job_id, title = %self.job.title, "application flow started");
        Ok(FlowEffect::GenerateQuestions {
            job_title: self.job.title.clone(),
        })
    }

    /// Generated questions arrived. A failed generator degrades to the fixed questions only.
    pub fn questions_loaded<E: Display>(&mut self, outcome: Result<Vec<ChoiceQuestion>, E>) {
        if self.state != FlowState::LoadingQuestions {
            self.ignore_late("generate_questions");
            return;
        }

        let generated = match outcome {
            Ok(questions) => questions,
            Err(error) => {
                warn!(
                    job_id = %self.job.job_id,
                    %error,
                    "question generation failed; continuing with fixed questions"
                );
                Vec::new()
            }
        };

        self.questionnaire.load_dynamic(generated);
        self.state = FlowState::AnsweringQuestions;
        debug!(
            job_id = %self.job.job_id,
            fixed = self.questionnaire.fixed_count(),
            dynamic = self.questionnaire.dynamic_count(),
            "questions ready"
        );
    }

    fn after_answer(&mut self, progress: Progress) -> Option<FlowEffect> {
        match progress {
            Progress::Advanced { .. } => None,
            Progress::Completed => {
                self.state = FlowState::Submitting;
                Some(FlowEffect::EvaluateAnswers(
                    self.questionnaire.evaluation_request(),
                ))
            }
        }
    }

    /// Record a free-text answer. Returns the scoring effect when it was the last question.
    pub fn answer_text(&mut self, answer: &str) -> Result<Option<FlowEffect>, FlowError> {
        if self.state != FlowState::AnsweringQuestions {
            return Err(self.invalid("answer a question"));
        }
        let progress = self.questionnaire.answer_text(answer)?;
        Ok(self.after_answer(progress))
    }

    pub fn select_option(&mut self, option: usize) -> Result<(), FlowError> {
        if self.state != FlowState::AnsweringQuestions {
            return Err(self.invalid("select an option"));
        }
        self.questionnaire.select_option(option)?;
        Ok(())
    }

    /// Record the selected option. Returns the scoring effect when it was the last question.
    pub fn confirm_choice(&mut self) -> Result<Option<FlowEffect>, FlowError> {
        if self.state != FlowState::AnsweringQuestions {
            return Err(self.invalid("confirm a choice"));
        }
        let progress = self.questionnaire.confirm_choice()?;
        Ok(self.after_answer(progress))
    }

    pub fn evaluation_received<E: Display>(&mut self, outcome: Result<EvaluationResult, E>) {
        if self.state != FlowState::Submitting {
            self.ignore_late("evaluate_answers");
            return;
        }

        match outcome {
            Ok(result) => {
                self.evaluation = Some(result);
                self.halted = None;
                self.state = if result.qualified {
                    FlowState::QualificationPassed
                } else {
                    FlowState::NotQualified
                };
                info!(
                    job_id = %self.job.job_id,
                    score = result.score,
                    qualified = result.qualified,
                    "answers evaluated"
                );
            }
            Err(error) => self.halt("scoring", error),
        }
    }

    /// Skip enhancement: the application goes out with the known score and the flow ends.
    pub fn decline(&mut self) -> Result<Option<FlowEffect>, FlowError> {
        if self.state != FlowState::QualificationPassed {
            return Err(self.invalid("decline enhancement"));
        }
        self.state = FlowState::Skipped;
        Ok(self.dispatch_application())
    }

    pub fn pay_and_enhance(&mut self) -> Result<(), FlowError> {
        if self.state != FlowState::QualificationPassed {
            return Err(self.invalid("pay for enhancement"));
        }
        self.state = FlowState::SelectingPaymentMethod;
        Ok(())
    }

    pub fn choose_payment_method(&mut self, method: PaymentMethod) -> Result<(), FlowError> {
        if self.state != FlowState::SelectingPaymentMethod {
            return Err(self.invalid("choose a payment method"));
        }
        self.state = FlowState::EnteringPaymentDetails { method };
        Ok(())
    }

    pub fn pay(&mut self, details: PaymentDetails) -> Result<FlowEffect, FlowError> {
        let FlowState::EnteringPaymentDetails { method } = self.state else {
            return Err(self.invalid("pay"));
        };
        if details.method() != method {
            return Err(FlowError::PaymentMethodMismatch {
                expected: method.label(),
                provided: details.method().label(),
            });
        }
        if let Some(field) = details.missing_field() {
            return Err(FlowError::MissingPaymentField(field));
        }

        let attempt = PaymentAttempt { method, details };
        self.state = FlowState::ProcessingPayment {
            attempt: attempt.clone(),
        };
        Ok(FlowEffect::SettlePayment(attempt))
    }

    pub fn payment_settled<E: Display>(
        &mut self,
        outcome: Result<PaymentReceipt, E>,
    ) -> Option<FlowEffect> {
        if !matches!(self.state, FlowState::ProcessingPayment { .. }) {
            self.ignore_late("settle_payment");
            return None;
        }

        match outcome {
            Ok(receipt) => {
                info!(
                    job_id = %self.job.job_id,
                    reference = %receipt.reference,
                    method = receipt.method.label(),
                    "payment settled"
                );
                self.state = FlowState::Enhancing {
                    stage: EnhancementStage::FetchingResume,
                };
                Some(FlowEffect::FetchResume {
                    user_id: self.applicant.user_id.clone(),
                })
            }
            Err(error) => {
                self.halt("payment", error);
                None
            }
        }
    }

    pub fn resume_fetched<E: Display>(&mut self, outcome: Result<String, E>) -> Option<FlowEffect> {
        if self.state
            != (FlowState::Enhancing {
                stage: EnhancementStage::FetchingResume,
            })
        {
            self.ignore_late("fetch_resume");
            return None;
        }

        match outcome {
            Ok(resume) => {
                self.state = FlowState::Enhancing {
                    stage: EnhancementStage::Rewriting,
                };
                Some(FlowEffect::EnhanceResume(EnhancementRequest {
                    resume,
                    job_title: self.job.title.clone(),
                    company: self.job.company.clone(),
                    job_description: self.job.description.clone(),
                }))
            }
            Err(error) => {
                self.halt("resume fetch", error);
                None
            }
        }
    }

    pub fn resume_enhanced<E: Display>(&mut self, outcome: Result<EnhancedResume, E>) {
        if self.state
            != (FlowState::Enhancing {
                stage: EnhancementStage::Rewriting,
            })
        {
            self.ignore_late("enhance_resume");
            return;
        }

        match outcome {
            Ok(resume) => {
                info!(
                    job_id = %self.job.job_id,
                    length = resume.content.len(),
                    "enhanced resume ready"
                );
                self.halted = None;
                self.state = FlowState::ResumeReady { resume };
            }
            Err(error) => self.halt("enhancement", error),
        }
    }

    /// Send the application after enhancement. Only the first call produces an effect.
    pub fn send_resume(&mut self) -> Result<Option<FlowEffect>, FlowError> {
        match self.state {
            FlowState::ResumeReady { .. } => Ok(self.dispatch_application()),
            FlowState::ResumeSent { .. } => Ok(None),
            _ => Err(self.invalid("send the resume")),
        }
    }

    pub fn application_submitted<E: Display>(&mut self, outcome: Result<(), E>) {
        match outcome {
            Ok(()) => {
                self.application_acknowledged = true;
                info!(
                    job_id = %self.job.job_id,
                    user_id = %self.applicant.user_id,
                    "application submitted"
                );
                if let FlowState::ResumeReady { resume } = &self.state {
                    self.state = FlowState::ResumeSent {
                        resume: resume.clone(),
                    };
                }
            }
            Err(error) => self.halt("application submit", error),
        }
    }

    /// Close from any state. Once qualification passed, an application that never went out is
    /// sent on the way out.
    pub fn close(&mut self) -> Option<FlowEffect> {
        if self.is_closed() {
            return None;
        }

        let effect = if self.is_qualified() {
            self.dispatch_application()
        } else {
            None
        };
        info!(
            job_id = %self.job.job_id,
            from = self.state.label(),
            sends_application = effect.is_some(),
            "application flow closed"
        );
        self.state = FlowState::Closed;
        effect
    }

    pub fn view(&self) -> FlowView {
        FlowView::of(self)
    }
}

use serde::Serialize;

use crate::workflows::application::domain::{EnhancedResume, PaymentAttempt, PaymentMethod};

/// Sub-phase of enhancement: the stored resume is fetched before it is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementStage {
    FetchingResume,
    Rewriting,
}

/// Every screen the application bot can be on. State-specific data lives in the variant so
/// combinations such as "payment form open while showing results" cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    NotStarted,
    LoadingQuestions,
    AnsweringQuestions,
    Submitting,
    NotQualified,
    QualificationPassed,
    SelectingPaymentMethod,
    EnteringPaymentDetails { method: PaymentMethod },
    ProcessingPayment { attempt: PaymentAttempt },
    Enhancing { stage: EnhancementStage },
    ResumeReady { resume: EnhancedResume },
    ResumeSent { resume: EnhancedResume },
    Skipped,
    Closed,
}

impl FlowState {
    pub const fn label(&self) -> &'static str {
        match self {
            FlowState::NotStarted => "not_started",
            FlowState::LoadingQuestions => "loading_questions",
            FlowState::AnsweringQuestions => "answering_questions",
            FlowState::Submitting => "submitting",
            FlowState::NotQualified => "not_qualified",
            FlowState::QualificationPassed => "qualification_passed",
            FlowState::SelectingPaymentMethod => "selecting_payment_method",
            FlowState::EnteringPaymentDetails { .. } => "entering_payment_details",
            FlowState::ProcessingPayment { .. } => "processing_payment",
            FlowState::Enhancing { .. } => "enhancing",
            FlowState::ResumeReady { .. } => "resume_ready",
            FlowState::ResumeSent { .. } => "resume_sent",
            FlowState::Skipped => "skipped",
            FlowState::Closed => "closed",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowState::NotQualified
                | FlowState::ResumeSent { .. }
                | FlowState::Skipped
                | FlowState::Closed
        )
    }

    /// Closing and declining both end the session; nothing is left to show or do.
    pub const fn ends_session(&self) -> bool {
        matches!(self, FlowState::Skipped | FlowState::Closed)
    }

    pub fn enhanced_resume(&self) -> Option<&EnhancedResume> {
        match self {
            FlowState::ResumeReady { resume } | FlowState::ResumeSent { resume } => Some(resume),
            _ => None,
        }
    }
}

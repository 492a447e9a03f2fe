use serde::Serialize;

use super::{ApplicationFlow, EnhancementStage, FlowState};
use crate::workflows::application::domain::{JobId, PaymentMethod};
use crate::workflows::application::questionnaire::QuestionRef;

/// The question currently on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionView {
    pub index: usize,
    pub total: usize,
    pub kind: &'static str,
    pub prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<usize>,
}

/// Render-ready snapshot of a flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowView {
    pub state: &'static str,
    pub job_id: JobId,
    pub job_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    pub answered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhancement_stage: Option<EnhancementStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_resume: Option<String>,
    pub application_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<String>,
    /// Remote call the flow is waiting on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting: Option<&'static str>,
}

impl FlowView {
    pub(super) fn of(flow: &ApplicationFlow) -> Self {
        let state = flow.state();
        let questionnaire = flow.questionnaire();

        let question = if *state == FlowState::AnsweringQuestions {
            questionnaire.current().map(|current| {
                let (options, selected) = match current {
                    QuestionRef::FreeText(_) => (Vec::new(), None),
                    QuestionRef::Choice { question, .. } => {
                        (question.options.clone(), question.selected)
                    }
                };
                QuestionView {
                    index: questionnaire.position(),
                    total: questionnaire.total(),
                    kind: current.kind_label(),
                    prompt: current.prompt().to_string(),
                    options,
                    selected,
                }
            })
        } else {
            None
        };

        let payment_method = match state {
            FlowState::EnteringPaymentDetails { method } => Some(*method),
            FlowState::ProcessingPayment { attempt } => Some(attempt.method),
            _ => None,
        };

        Self {
            state: state.label(),
            job_id: flow.job().job_id.clone(),
            job_title: flow.job().title.clone(),
            question,
            answered: questionnaire.answered(),
            score: flow.score(),
            qualified: flow.evaluation().map(|result| result.qualified),
            payment_method,
            enhancement_stage: match state {
                FlowState::Enhancing { stage } => Some(*stage),
                _ => None,
            },
            enhanced_resume: state
                .enhanced_resume()
                .map(|resume| resume.content.clone()),
            application_sent: flow.application_acknowledged(),
            halted: flow.halted().map(str::to_string),
            awaiting: flow.outstanding(),
        }
    }
}

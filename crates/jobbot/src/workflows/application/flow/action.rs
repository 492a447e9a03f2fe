use serde::{Deserialize, Serialize};

use super::{ApplicationFlow, FlowEffect, FlowError};
use crate::workflows::application::domain::{PaymentDetails, PaymentMethod};

/// User input that drives a flow, as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FlowAction {
    Start,
    AnswerText { answer: String },
    SelectOption { option: usize },
    ConfirmChoice,
    Decline,
    PayAndEnhance,
    ChoosePaymentMethod { method: PaymentMethod },
    Pay { details: PaymentDetails },
    SendResume,
    Close,
}

impl FlowAction {
    pub const fn is_close(&self) -> bool {
        matches!(self, FlowAction::Close)
    }

    pub const fn label(&self) -> &'static str {
        match self {
            FlowAction::Start => "start",
            FlowAction::AnswerText { .. } => "answer_text",
            FlowAction::SelectOption { .. } => "select_option",
            FlowAction::ConfirmChoice => "confirm_choice",
            FlowAction::Decline => "decline",
            FlowAction::PayAndEnhance => "pay_and_enhance",
            FlowAction::ChoosePaymentMethod { .. } => "choose_payment_method",
            FlowAction::Pay { .. } => "pay",
            FlowAction::SendResume => "send_resume",
            FlowAction::Close => "close",
        }
    }
}

impl ApplicationFlow {
    /// Route an action to its transition and track the call it hands out.
    pub fn apply(&mut self, action: FlowAction) -> Result<Option<FlowEffect>, FlowError> {
        let effect = match action {
            FlowAction::Start => self.start().map(Some),
            FlowAction::AnswerText { answer } => self.answer_text(&answer),
            FlowAction::SelectOption { option } => self.select_option(option).map(|()| None),
            FlowAction::ConfirmChoice => self.confirm_choice(),
            FlowAction::Decline => self.decline(),
            FlowAction::PayAndEnhance => self.pay_and_enhance().map(|()| None),
            FlowAction::ChoosePaymentMethod { method } => {
                self.choose_payment_method(method).map(|()| None)
            }
            FlowAction::Pay { details } => self.pay(details).map(Some),
            FlowAction::SendResume => self.send_resume(),
            FlowAction::Close => Ok(self.close()),
        }?;
        Ok(self.track(effect))
    }
}

use serde::Serialize;
use tracing::warn;

use super::domain::{
    AnswerMap, AnswerValue, ChoiceQuestion, EvaluationRequest, FixedQuestion, JobPosting,
    QuestionId,
};

/// Ordered screening questions (fixed first, then generated) with forward-only answers.
///
/// Answers are stored in asking order, so the number of recorded answers is always the index of
/// the question currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Questionnaire {
    fixed: Vec<FixedQuestion>,
    dynamic: Vec<ChoiceQuestion>,
    answers: Vec<AnswerValue>,
}

/// Borrowed view of the question awaiting an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionRef<'a> {
    FreeText(&'a FixedQuestion),
    Choice {
        position: usize,
        question: &'a ChoiceQuestion,
    },
}

impl QuestionRef<'_> {
    pub fn id(&self) -> QuestionId {
        match self {
            QuestionRef::FreeText(question) => question.id.clone(),
            QuestionRef::Choice { position, .. } => QuestionId::dynamic(*position),
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            QuestionRef::FreeText(question) => &question.prompt,
            QuestionRef::Choice { question, .. } => &question.prompt,
        }
    }

    pub const fn kind_label(&self) -> &'static str {
        match self {
            QuestionRef::FreeText(_) => "text",
            QuestionRef::Choice { .. } => "choice",
        }
    }
}

/// Outcome of recording an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Advanced { next_index: usize },
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionnaireError {
    #[error("answer must not be empty")]
    EmptyAnswer,
    #[error("select an option before continuing")]
    NoOptionSelected,
    #[error("option {index} is out of range ({available} options available)")]
    OptionOutOfRange { index: usize, available: usize },
    #[error("question {index} expects a {expected} answer")]
    QuestionKindMismatch { index: usize, expected: &'static str },
    #[error("every question has already been answered")]
    Exhausted,
}

impl Questionnaire {
    pub fn new(fixed: Vec<FixedQuestion>) -> Self {
        Self {
            fixed,
            dynamic: Vec::new(),
            answers: Vec::new(),
        }
    }

    pub fn for_job(job: &JobPosting) -> Self {
        Self::new(FixedQuestion::standard_set(job))
    }

    /// Attach generated questions after the fixed ones. Questions without options can never be
    /// answered and are dropped.
    pub fn with_dynamic(mut self, generated: Vec<ChoiceQuestion>) -> Self {
        self.load_dynamic(generated);
        self
    }

    pub fn load_dynamic(&mut self, generated: Vec<ChoiceQuestion>) {
        let before = generated.len();
        self.dynamic = generated
            .into_iter()
            .filter(|question| !question.options.is_empty())
            .map(|mut question| {
                question.selected = None;
                question
            })
            .collect();
        if self.dynamic.len() != before {
            warn!(
                dropped = before - self.dynamic.len(),
                "ignoring generated questions without options"
            );
        }
    }

    pub fn total(&self) -> usize {
        self.fixed.len() + self.dynamic.len()
    }

    pub fn fixed_count(&self) -> usize {
        self.fixed.len()
    }

    pub fn dynamic_count(&self) -> usize {
        self.dynamic.len()
    }

    /// Index of the question on screen; equals the number of recorded answers.
    pub fn position(&self) -> usize {
        self.answers.len()
    }

    pub fn answered(&self) -> usize {
        self.answers.len()
    }

    pub fn is_complete(&self) -> bool {
        self.answers.len() >= self.total()
    }

    fn question_at(&self, index: usize) -> Option<QuestionRef<'_>> {
        if let Some(question) = self.fixed.get(index) {
            return Some(QuestionRef::FreeText(question));
        }
        let position = index - self.fixed.len();
        self.dynamic
            .get(position)
            .map(|question| QuestionRef::Choice { position, question })
    }

    pub fn current(&self) -> Option<QuestionRef<'_>> {
        self.question_at(self.position())
    }

    pub fn answer_text(&mut self, raw: &str) -> Result<Progress, QuestionnaireError> {
        let index = self.position();
        match self.current() {
            None => return Err(QuestionnaireError::Exhausted),
            Some(QuestionRef::Choice { .. }) => {
                return Err(QuestionnaireError::QuestionKindMismatch {
                    index,
                    expected: "choice",
                })
            }
            Some(QuestionRef::FreeText(_)) => {}
        }

        let answer = raw.trim();
        if answer.is_empty() {
            return Err(QuestionnaireError::EmptyAnswer);
        }

        self.answers.push(AnswerValue::Text(answer.to_string()));
        Ok(self.progress())
    }

    /// Mark an option as selected without advancing; may be changed until confirmed.
    pub fn select_option(&mut self, option: usize) -> Result<(), QuestionnaireError> {
        let question = self.current_choice_mut()?;
        let available = question.options.len();
        if option >= available {
            return Err(QuestionnaireError::OptionOutOfRange {
                index: option,
                available,
            });
        }
        question.selected = Some(option);
        Ok(())
    }

    pub fn confirm_choice(&mut self) -> Result<Progress, QuestionnaireError> {
        let selected = self
            .current_choice_mut()?
            .selected
            .ok_or(QuestionnaireError::NoOptionSelected)?;
        self.answers.push(AnswerValue::Choice(selected));
        Ok(self.progress())
    }

    fn current_choice_mut(&mut self) -> Result<&mut ChoiceQuestion, QuestionnaireError> {
        let index = self.position();
        if index >= self.total() {
            return Err(QuestionnaireError::Exhausted);
        }
        if index < self.fixed.len() {
            return Err(QuestionnaireError::QuestionKindMismatch {
                index,
                expected: "text",
            });
        }
        let position = index - self.fixed.len();
        Ok(&mut self.dynamic[position])
    }

    fn progress(&self) -> Progress {
        if self.is_complete() {
            Progress::Completed
        } else {
            Progress::Advanced {
                next_index: self.position(),
            }
        }
    }

    /// Prompts and answers as parallel arrays for the scorer. Unanswered fixed questions map to
    /// an empty string, choice questions to the selected option text.
    pub fn evaluation_request(&self) -> EvaluationRequest {
        let mut questions = Vec::with_capacity(self.total());
        let mut answers = Vec::with_capacity(self.total());

        for (index, question) in self.fixed.iter().enumerate() {
            questions.push(question.prompt.clone());
            let answer = match self.answers.get(index) {
                Some(AnswerValue::Text(text)) => text.clone(),
                _ => String::new(),
            };
            answers.push(answer);
        }

        for (position, question) in self.dynamic.iter().enumerate() {
            questions.push(question.prompt.clone());
            // A confirmed choice keeps its selection, so only answered questions carry text.
            let answer = match self.answers.get(self.fixed.len() + position) {
                Some(AnswerValue::Choice(_)) => question.selected_text().to_string(),
                _ => String::new(),
            };
            answers.push(answer);
        }

        EvaluationRequest { questions, answers }
    }

    /// Recorded answers keyed by question id, for the application record.
    pub fn answer_map(&self) -> AnswerMap {
        self.answers
            .iter()
            .enumerate()
            .filter_map(|(index, answer)| {
                self.question_at(index)
                    .map(|question| (question.id(), answer.clone()))
            })
            .collect()
    }
}

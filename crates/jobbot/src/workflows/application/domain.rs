use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

/// Identifier wrapper for job seekers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job posting as served by the job board backend.
///
/// The flow only reads the title, company, description and salary range; the remaining fields
/// ride along so callers can hand over the posting exactly as they received it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub job_id: JobId,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub min_salary: Option<u64>,
    #[serde(default)]
    pub max_salary: Option<u64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub perks: Option<String>,
    #[serde(default)]
    pub opening_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_date: Option<NaiveDate>,
    #[serde(default)]
    pub openings: Option<u32>,
}

impl JobPosting {
    fn salary_bound(value: Option<u64>) -> String {
        value
            .map(|amount| amount.to_string())
            .unwrap_or_else(|| "not specified".to_string())
    }

    pub fn min_salary_label(&self) -> String {
        Self::salary_bound(self.min_salary)
    }

    pub fn max_salary_label(&self) -> String {
        Self::salary_bound(self.max_salary)
    }
}

/// The signed-in job seeker the flow runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub user_id: UserId,
}

/// Key used in the answer map sent with the application record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn dynamic(position: usize) -> Self {
        Self(format!("dynamic_{position}"))
    }
}

/// Static screening topics asked before any generated question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedTopic {
    Location,
    Relocate,
    Salary,
    Qualification,
    Experience,
}

impl FixedTopic {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Location,
            Self::Relocate,
            Self::Salary,
            Self::Qualification,
            Self::Experience,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Relocate => "relocate",
            Self::Salary => "salary",
            Self::Qualification => "qualification",
            Self::Experience => "experience",
        }
    }

    pub fn prompt(self, job: &JobPosting) -> String {
        match self {
            Self::Location => "Which place are you from?".to_string(),
            Self::Relocate => "Are you willing to relocate? (yes/no)".to_string(),
            Self::Salary => format!(
                "Are you okay with a salary between {} and {}? (yes/no)",
                job.min_salary_label(),
                job.max_salary_label()
            ),
            Self::Qualification => "What is your highest educational qualification?".to_string(),
            Self::Experience => {
                "How many years of relevant work experience do you have?".to_string()
            }
        }
    }
}

/// Free-text screening question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedQuestion {
    pub id: QuestionId,
    pub prompt: String,
}

impl FixedQuestion {
    /// The five static questions for a posting, in asking order.
    pub fn standard_set(job: &JobPosting) -> Vec<Self> {
        FixedTopic::ordered()
            .into_iter()
            .map(|topic| Self {
                id: QuestionId(topic.key().to_string()),
                prompt: topic.prompt(job),
            })
            .collect()
    }
}

/// Generated multiple-choice question; owns its options and the pending selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<usize>,
}

impl ChoiceQuestion {
    pub fn new(prompt: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            options,
            selected: None,
        }
    }

    /// Option text for the current selection, empty when nothing valid is selected.
    pub fn selected_text(&self) -> &str {
        self.selected
            .and_then(|index| self.options.get(index))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Recorded answer for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choice(usize),
}

/// Answer map keyed by question id, sent verbatim with the application record.
pub type AnswerMap = BTreeMap<QuestionId, AnswerValue>;

/// Parallel prompt/answer arrays submitted to the remote scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub questions: Vec<String>,
    pub answers: Vec<String>,
}

/// Scorer verdict for a completed questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub score: f64,
    pub qualified: bool,
}

/// Supported ways to pay for resume enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Upi,
    Card,
}

impl PaymentMethod {
    /// Same spelling as the serialized form.
    pub const fn label(self) -> &'static str {
        match self {
            PaymentMethod::Upi => "upi",
            PaymentMethod::Card => "card",
        }
    }
}

/// Method-specific payment fields; only checked for presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    Upi {
        upi_id: String,
    },
    Card {
        card_number: String,
        expiry: String,
        cvv: String,
    },
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::Upi { .. } => PaymentMethod::Upi,
            PaymentDetails::Card { .. } => PaymentMethod::Card,
        }
    }

    /// First required field left blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        let blank = |value: &str| value.trim().is_empty();
        match self {
            PaymentDetails::Upi { upi_id } if blank(upi_id) => Some("upi_id"),
            PaymentDetails::Upi { .. } => None,
            PaymentDetails::Card {
                card_number,
                expiry,
                cvv,
            } => {
                if blank(card_number) {
                    Some("card_number")
                } else if blank(expiry) {
                    Some("expiry")
                } else if blank(cvv) {
                    Some("cvv")
                } else {
                    None
                }
            }
        }
    }
}

/// A payment submitted for settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub method: PaymentMethod,
    pub details: PaymentDetails,
}

/// Confirmation returned once a payment settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub reference: String,
    pub method: PaymentMethod,
}

/// Resume rewrite request scoped to one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementRequest {
    pub resume: String,
    pub job_title: String,
    pub company: String,
    pub job_description: String,
}

/// Enhanced resume text offered for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedResume {
    pub content: String,
}

impl EnhancedResume {
    pub const DOWNLOAD_NAME: &'static str = "enhanced_resume.txt";
}

/// Final application payload submitted to the job board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub user_id: UserId,
    pub job_id: JobId,
    pub answers: AnswerMap,
    pub score: f64,
    pub qualified: bool,
}

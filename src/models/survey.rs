// src/models/survey.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{config::DEFAULT_THANK_YOU, error::AppError};

/// The four supported question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Rating,
    Text,
    Dropdown,
}

impl QuestionType {
    /// Choice questions carry a non-empty option list; the others carry none.
    pub fn is_choice(self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::Dropdown)
    }
}

/// A single question inside a survey definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    pub text: String,

    /// Present and non-empty iff the question is a choice question.
    #[serde(default)]
    pub options: Option<Vec<String>>,

    #[serde(default)]
    pub required: bool,

    /// Dense 0-based position within the survey.
    #[serde(default)]
    pub order: u32,

    /// Conditional display rules, stored for the client and never interpreted here.
    #[serde(default = "empty_object")]
    pub branch_logic: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// Per-survey behaviour switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveySettings {
    pub allow_anonymous: bool,
    pub collect_email: bool,
    pub one_response_per_ip: bool,
    pub show_results: bool,
    pub custom_thank_you: String,
}

impl Default for SurveySettings {
    fn default() -> Self {
        Self {
            allow_anonymous: true,
            collect_email: false,
            one_response_per_ip: true,
            show_results: true,
            custom_thank_you: DEFAULT_THANK_YOU.to_string(),
        }
    }
}

/// Partial settings supplied by a client; only present keys are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SettingsPatch {
    pub allow_anonymous: Option<bool>,
    pub collect_email: Option<bool>,
    pub one_response_per_ip: Option<bool>,
    pub show_results: Option<bool>,
    #[validate(length(max = 1000))]
    pub custom_thank_you: Option<String>,
}

impl SurveySettings {
    pub fn merge(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.allow_anonymous {
            self.allow_anonymous = v;
        }
        if let Some(v) = patch.collect_email {
            self.collect_email = v;
        }
        if let Some(v) = patch.one_response_per_ip {
            self.one_response_per_ip = v;
        }
        if let Some(v) = patch.show_results {
            self.show_results = v;
        }
        if let Some(v) = &patch.custom_thank_you {
            self.custom_thank_you = v.clone();
        }
    }
}

/// One stored answer slot. `answer` is `Null` when the respondent sent nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(default)]
    pub answer: Value,
}

/// Answers keyed by question id, in the order the respondent sent them.
pub type AnswerMap = IndexMap<String, Answer>;

/// One respondent's submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub submitted_at: DateTime<Utc>,

    /// Only used for the duplicate-address check; never sent to clients.
    #[serde(skip_serializing, default)]
    pub ip_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respondent_email: Option<String>,

    /// Keyed by question id.
    #[serde(default)]
    pub answers: AnswerMap,
}

/// A survey definition together with its collected responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub creator_id: i64,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_public: bool,
    pub shareable_link: Uuid,
    /// Submission order.
    pub responses: Vec<SurveyResponse>,
    pub collaborators: Vec<i64>,
    pub settings: SurveySettings,
}

impl Survey {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now > expires)
    }

    /// Creator or listed collaborator.
    pub fn is_member(&self, user_id: i64) -> bool {
        self.creator_id == user_id || self.collaborators.contains(&user_id)
    }
}

/// Lightweight row returned by survey listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveySummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub creator_id: i64,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub question_count: i64,
    pub response_count: i64,
}

impl From<&Survey> for SurveySummary {
    fn from(s: &Survey) -> Self {
        Self {
            id: s.id,
            title: s.title.clone(),
            description: s.description.clone(),
            creator_id: s.creator_id,
            is_public: s.is_public,
            created_at: s.created_at,
            updated_at: s.updated_at,
            expires_at: s.expires_at,
            question_count: s.questions.len() as i64,
            response_count: s.responses.len() as i64,
        }
    }
}

/// DTO for one question in a create or update payload.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct NewQuestion {
    /// Kept when editing an existing question; generated otherwise.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(length(min = 1, max = 1000, message = "Question text must be 1-1000 characters."))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub branch_logic: Option<Value>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    let mut seen = HashSet::new();
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_blank"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
        if !seen.insert(opt.as_str()) {
            return Err(validator::ValidationError::new("duplicate_option"));
        }
    }
    Ok(())
}

impl NewQuestion {
    /// Enforces "options present and non-empty iff choice question".
    pub fn check_options(&self) -> Result<(), AppError> {
        let has_options = self.options.as_ref().is_some_and(|o| !o.is_empty());
        match (self.question_type.is_choice(), has_options) {
            (true, false) => Err(AppError::Validation(format!(
                "Question \"{}\" needs at least one option",
                self.text
            ))),
            (false, true) => Err(AppError::Validation(format!(
                "Question \"{}\" does not take options",
                self.text
            ))),
            _ => Ok(()),
        }
    }

    /// Materialises the question at `order`.
    pub fn into_question(self, order: u32) -> Question {
        Question {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            question_type: self.question_type,
            text: self.text,
            options: if self.question_type.is_choice() {
                self.options
            } else {
                None
            },
            required: self.required,
            order,
            branch_logic: self.branch_logic.unwrap_or_else(empty_object),
        }
    }
}

/// DTO for creating a survey.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateSurveyRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters."))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<NewQuestion>,
    #[serde(default)]
    pub settings: Option<SettingsPatch>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

/// DTO for updating a survey. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSurveyRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters."))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// Full ordered replacement of the question list.
    pub questions: Option<Vec<NewQuestion>>,
    pub settings: Option<SettingsPatch>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_public: Option<bool>,
    pub collaborators: Option<Vec<i64>>,
}

/// One entry of a submission payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnswerEntry {
    #[serde(rename = "questionId")]
    pub question_id: String,
    #[serde(default)]
    pub value: Value,
}

/// DTO for a respondent's submission.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    pub answers: Vec<AnswerEntry>,
    #[serde(default)]
    pub respondent_email: Option<String>,
}

impl SubmitResponseRequest {
    /// Folds the entry list into the stored `question_id -> {answer}` mapping.
    /// A repeated question id keeps its last value.
    pub fn answer_map(&self) -> AnswerMap {
        self.answers
            .iter()
            .map(|entry| {
                (
                    entry.question_id.clone(),
                    Answer {
                        answer: entry.value.clone(),
                    },
                )
            })
            .collect()
    }
}

/// DTO returned after a successful submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponseResult {
    pub message: String,
    pub thank_you_message: String,
}

/// DTO returned by the raw results endpoint.
#[derive(Debug, Serialize)]
pub struct SurveyResults {
    pub total_responses: usize,
    pub responses: Vec<SurveyResponse>,
}

#[derive(Debug, Deserialize)]
pub struct AddCollaboratorRequest {
    pub user_id: i64,
}

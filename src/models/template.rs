// src/models/template.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::survey::{NewQuestion, QuestionType, SettingsPatch};

/// A reusable survey blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyTemplate {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub questions: Vec<TemplateQuestion>,
    #[serde(default)]
    pub settings: Option<TemplateSettings>,
    #[serde(default)]
    pub popularity: i32,
}

/// Question blueprint; ids are minted when a survey is created from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateQuestion {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
}

impl From<TemplateQuestion> for NewQuestion {
    fn from(q: TemplateQuestion) -> Self {
        NewQuestion {
            id: None,
            question_type: q.question_type,
            text: q.text,
            options: q.options,
            required: q.required,
            branch_logic: None,
        }
    }
}

/// Settings overrides a template applies on top of the defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateSettings {
    pub one_response_per_ip: Option<bool>,
    pub show_results: Option<bool>,
    pub custom_thank_you: Option<String>,
}

impl From<TemplateSettings> for SettingsPatch {
    fn from(s: TemplateSettings) -> Self {
        SettingsPatch {
            one_response_per_ip: s.one_response_per_ip,
            show_results: s.show_results,
            custom_thank_you: s.custom_thank_you,
            ..Default::default()
        }
    }
}

fn choice(text: &str, options: &[&str], required: bool) -> TemplateQuestion {
    TemplateQuestion {
        question_type: QuestionType::MultipleChoice,
        text: text.to_string(),
        options: Some(options.iter().map(|o| o.to_string()).collect()),
        required,
    }
}

fn plain(question_type: QuestionType, text: &str, required: bool) -> TemplateQuestion {
    TemplateQuestion {
        question_type,
        text: text.to_string(),
        options: None,
        required,
    }
}

/// Templates seeded into an empty template collection at startup.
pub fn default_templates() -> Vec<SurveyTemplate> {
    vec![
        SurveyTemplate {
            id: Uuid::new_v4(),
            title: "Customer Satisfaction".to_string(),
            description: "Measure how customers feel about your product or service.".to_string(),
            category: Some("business".to_string()),
            tags: vec!["customer".to_string(), "feedback".to_string()],
            questions: vec![
                plain(QuestionType::Rating, "How satisfied are you overall?", true),
                choice(
                    "How likely are you to recommend us?",
                    &["Very likely", "Somewhat likely", "Not likely"],
                    true,
                ),
                plain(QuestionType::Text, "What could we do better?", false),
            ],
            settings: None,
            popularity: 0,
        },
        SurveyTemplate {
            id: Uuid::new_v4(),
            title: "Event Feedback".to_string(),
            description: "Collect attendee impressions after an event.".to_string(),
            category: Some("events".to_string()),
            tags: vec!["event".to_string()],
            questions: vec![
                plain(QuestionType::Rating, "How would you rate the event?", true),
                TemplateQuestion {
                    question_type: QuestionType::Dropdown,
                    text: "Which session did you enjoy most?".to_string(),
                    options: Some(vec![
                        "Keynote".to_string(),
                        "Workshops".to_string(),
                        "Networking".to_string(),
                    ]),
                    required: false,
                },
                plain(QuestionType::Text, "Any other comments?", false),
            ],
            settings: Some(TemplateSettings {
                custom_thank_you: Some("Thanks for attending!".to_string()),
                ..Default::default()
            }),
            popularity: 0,
        },
    ]
}

// src/models/analytics.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::models::survey::{AnswerMap, QuestionType};

/// Derived per-survey report. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_responses: usize,
    /// In `[0, 1]`.
    pub completion_rate: f64,
    /// Aligned with the survey's question order.
    pub question_analytics: Vec<QuestionAnalytics>,
    pub responses: Vec<ResponseEcho>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalytics {
    pub question_id: String,
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub data: QuestionData,
}

/// Type-specific aggregate. Serialises to a bare object whose keys depend on the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuestionData {
    /// Option labels in declared order with parallel counts.
    Choice { labels: Vec<String>, values: Vec<u64> },
    /// Ratings `1..=max` with parallel counts and the mean of all valid ratings.
    Rating {
        labels: Vec<u64>,
        values: Vec<u64>,
        average: f64,
    },
    /// Raw text answers in submission order.
    Text { responses: Vec<Value> },
    /// A rating question without a single valid numeric answer.
    Empty {},
}

/// A raw response as echoed back alongside the analytics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEcho {
    pub submitted_at: DateTime<Utc>,
    pub answers: AnswerMap,
}

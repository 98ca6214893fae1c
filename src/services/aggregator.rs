// src/services/aggregator.rs

//! Turns a survey's questions and stored responses into [`Analytics`].
//!
//! Everything here is a pure function of its input: no store access, no
//! clock, no shared state.

use serde_json::Value;

use crate::{
    config::MAX_RATING,
    models::{
        analytics::{Analytics, QuestionAnalytics, QuestionData, ResponseEcho},
        survey::{Question, QuestionType, Survey, SurveyResponse},
    },
};

/// Share of responses whose present answers are all non-null.
///
/// Only answers that exist are inspected: a response that skipped an
/// optional (or even a required) question still counts as complete.
pub fn completion_rate(responses: &[SurveyResponse]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }

    let completed = responses
        .iter()
        .filter(|r| r.answers.values().all(|a| !a.answer.is_null()))
        .count();

    completed as f64 / responses.len() as f64
}

/// Non-null answers given to `question_id`, in submission order.
fn collect_answers<'a>(question_id: &str, responses: &'a [SurveyResponse]) -> Vec<&'a Value> {
    responses
        .iter()
        .filter_map(|r| r.answers.get(question_id))
        .map(|a| &a.answer)
        .filter(|v| !v.is_null())
        .collect()
}

/// Reads an answer as a rating: a JSON non-negative integer or a string made
/// only of ASCII digits. Anything else is not a rating.
pub fn parse_rating(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

fn choice_data(options: &[String], answers: &[&Value]) -> QuestionData {
    let values = options
        .iter()
        .map(|option| {
            answers
                .iter()
                .filter(|a| a.as_str() == Some(option.as_str()))
                .count() as u64
        })
        .collect();

    QuestionData::Choice {
        labels: options.to_vec(),
        values,
    }
}

fn rating_data(answers: &[&Value]) -> QuestionData {
    // Values stored before a question became a rating can exceed the bound.
    let ratings: Vec<u64> = answers
        .iter()
        .filter_map(|a| parse_rating(a))
        .filter(|r| *r <= MAX_RATING)
        .collect();

    let Some(&max) = ratings.iter().max() else {
        return QuestionData::Empty {};
    };

    let labels: Vec<u64> = (1..=max).collect();
    let values = labels
        .iter()
        .map(|label| ratings.iter().filter(|r| *r == label).count() as u64)
        .collect();
    let average = ratings.iter().sum::<u64>() as f64 / ratings.len() as f64;

    QuestionData::Rating {
        labels,
        values,
        average,
    }
}

/// Summarises every response's answer to one question.
pub fn analyze_question(question: &Question, responses: &[SurveyResponse]) -> QuestionAnalytics {
    let answers = collect_answers(&question.id, responses);

    let data = match question.question_type {
        QuestionType::MultipleChoice | QuestionType::Dropdown => {
            choice_data(question.options.as_deref().unwrap_or_default(), &answers)
        }
        QuestionType::Rating => rating_data(&answers),
        QuestionType::Text => QuestionData::Text {
            responses: answers.into_iter().cloned().collect(),
        },
    };

    QuestionAnalytics {
        question_id: question.id.clone(),
        question_text: question.text.clone(),
        question_type: question.question_type,
        data,
    }
}

/// Full report for one survey. Question analytics follow `survey.questions` order.
pub fn summarize(survey: &Survey) -> Analytics {
    let responses = &survey.responses;

    Analytics {
        total_responses: responses.len(),
        completion_rate: completion_rate(responses),
        question_analytics: survey
            .questions
            .iter()
            .map(|q| analyze_question(q, responses))
            .collect(),
        responses: responses
            .iter()
            .map(|r| ResponseEcho {
                submitted_at: r.submitted_at,
                answers: r.answers.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::models::survey::{Answer, AnswerMap, SurveySettings};

    fn question(id: &str, question_type: QuestionType, options: Option<&[&str]>) -> Question {
        Question {
            id: id.to_string(),
            question_type,
            text: format!("Question {}", id),
            options: options.map(|o| o.iter().map(|s| s.to_string()).collect()),
            required: false,
            order: 0,
            branch_logic: json!({}),
        }
    }

    fn response(answers: &[(&str, Value)]) -> SurveyResponse {
        SurveyResponse {
            submitted_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            ip_address: None,
            respondent_email: None,
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), Answer { answer: v.clone() }))
                .collect::<AnswerMap>(),
        }
    }

    fn survey(questions: Vec<Question>, responses: Vec<SurveyResponse>) -> Survey {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Survey {
            id: Uuid::new_v4(),
            title: "T".to_string(),
            description: String::new(),
            creator_id: 1,
            questions,
            created_at: now,
            updated_at: now,
            expires_at: None,
            is_public: true,
            shareable_link: Uuid::new_v4(),
            responses,
            collaborators: vec![],
            settings: SurveySettings::default(),
        }
    }

    #[test]
    fn completion_rate_of_nothing_is_zero() {
        assert_eq!(completion_rate(&[]), 0.0);
    }

    #[test]
    fn completion_rate_ignores_missing_answers_but_not_null_ones() {
        let responses = vec![
            response(&[("q1", json!("A"))]),
            response(&[("q1", json!("A")), ("q2", Value::Null)]),
            response(&[]),
            response(&[("q2", json!(4))]),
        ];
        let rate = completion_rate(&responses);
        assert_eq!(rate, 0.75);
        assert!((0.0..=1.0).contains(&rate));
    }

    #[test]
    fn multiple_choice_counts_follow_option_order() {
        let q = question("q1", QuestionType::MultipleChoice, Some(&["A", "B"]));
        let responses = vec![
            response(&[("q1", json!("A"))]),
            response(&[("q1", json!("A"))]),
            response(&[("q1", json!("B"))]),
        ];
        let result = analyze_question(&q, &responses);
        assert_eq!(
            result.data,
            QuestionData::Choice {
                labels: vec!["A".to_string(), "B".to_string()],
                values: vec![2, 1],
            }
        );
    }

    #[test]
    fn dropdown_keeps_unselected_options_and_ignores_strays() {
        let q = question("d", QuestionType::Dropdown, Some(&["X", "Y", "Z"]));
        let responses = vec![
            response(&[("d", json!("Y"))]),
            response(&[("d", json!("not an option"))]),
            response(&[("d", Value::Null)]),
        ];
        let result = analyze_question(&q, &responses);
        assert_eq!(
            result.data,
            QuestionData::Choice {
                labels: vec!["X".to_string(), "Y".to_string(), "Z".to_string()],
                values: vec![0, 1, 0],
            }
        );
    }

    #[test]
    fn rating_range_grows_with_the_highest_rating() {
        let q = question("r", QuestionType::Rating, None);
        let responses = vec![
            response(&[("r", json!(3))]),
            response(&[("r", json!("1"))]),
            response(&[("r", json!("3"))]),
            response(&[("r", json!(5))]),
            response(&[("r", json!("great"))]),
        ];
        let result = analyze_question(&q, &responses);
        assert_eq!(
            result.data,
            QuestionData::Rating {
                labels: vec![1, 2, 3, 4, 5],
                values: vec![1, 0, 2, 0, 1],
                average: 3.0,
            }
        );
    }

    #[test]
    fn rating_without_valid_numbers_has_no_average() {
        let q = question("r", QuestionType::Rating, None);
        let responses = vec![
            response(&[("r", json!("five"))]),
            response(&[("r", json!(-2))]),
            response(&[("r", json!(2.5))]),
        ];
        let result = analyze_question(&q, &responses);
        assert_eq!(result.data, QuestionData::Empty {});

        let encoded = serde_json::to_value(&result).unwrap();
        assert_eq!(encoded["data"], json!({}));
        assert!(encoded["data"].get("average").is_none());
    }

    #[test]
    fn out_of_range_ratings_are_ignored() {
        let q = question("r", QuestionType::Rating, None);
        let responses = vec![
            response(&[("r", json!(2))]),
            response(&[("r", json!("1000000000000"))]),
            response(&[("r", json!("18446744073709551615"))]),
            response(&[("r", json!(u64::MAX))]),
        ];
        let result = analyze_question(&q, &responses);
        assert_eq!(
            result.data,
            QuestionData::Rating {
                labels: vec![1, 2],
                values: vec![0, 1],
                average: 2.0,
            }
        );

        let only_huge = vec![response(&[("r", json!("1000000000000"))])];
        assert_eq!(analyze_question(&q, &only_huge).data, QuestionData::Empty {});
    }

    #[test]
    fn parse_rating_accepts_only_unsigned_integer_literals() {
        assert_eq!(parse_rating(&json!("07")), Some(7));
        assert_eq!(parse_rating(&json!(0)), Some(0));
        assert_eq!(parse_rating(&json!(" 3")), None);
        assert_eq!(parse_rating(&json!("")), None);
        assert_eq!(parse_rating(&json!(true)), None);
        assert_eq!(parse_rating(&json!(4.0)), None);
    }

    #[test]
    fn text_answers_are_echoed_in_order() {
        let q = question("t", QuestionType::Text, None);
        let responses = vec![
            response(&[("t", json!("first"))]),
            response(&[("other", json!("skip"))]),
            response(&[("t", json!("second"))]),
        ];
        let result = analyze_question(&q, &responses);
        assert_eq!(
            result.data,
            QuestionData::Text {
                responses: vec![json!("first"), json!("second")],
            }
        );
        assert_eq!(result.question_text, "Question t");
        assert_eq!(result.question_type, QuestionType::Text);
    }

    #[test]
    fn summary_is_aligned_with_questions_and_repeatable() {
        let questions = vec![
            question("t", QuestionType::Text, None),
            question("m", QuestionType::MultipleChoice, Some(&["yes", "no"])),
            question("r", QuestionType::Rating, None),
        ];
        let responses = vec![
            response(&[("m", json!("yes")), ("r", json!(2))]),
            response(&[("t", json!("hello")), ("m", Value::Null)]),
        ];
        let s = survey(questions, responses);

        let first = summarize(&s);
        assert_eq!(first.total_responses, 2);
        assert_eq!(first.completion_rate, 0.5);
        let ids: Vec<&str> = first
            .question_analytics
            .iter()
            .map(|q| q.question_id.as_str())
            .collect();
        assert_eq!(ids, ["t", "m", "r"]);
        assert_eq!(first.responses.len(), 2);

        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&summarize(&s)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn summary_uses_camel_case_keys() {
        let s = survey(vec![question("t", QuestionType::Text, None)], vec![]);
        let encoded = serde_json::to_value(summarize(&s)).unwrap();
        assert_eq!(encoded["totalResponses"], json!(0));
        assert_eq!(encoded["completionRate"], json!(0.0));
        assert_eq!(encoded["questionAnalytics"][0]["questionText"], json!("Question t"));
        assert_eq!(encoded["questionAnalytics"][0]["type"], json!("text"));
        assert_eq!(
            encoded["questionAnalytics"][0]["data"],
            json!({"responses": []})
        );
    }
}

// src/services/survey.rs

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::{
    config::MAX_RATING,
    error::AppError,
    models::{
        analytics::Analytics,
        survey::{
            CreateSurveyRequest, NewQuestion, Question, QuestionType, SubmitResponseRequest,
            SubmitResponseResult, Survey, SurveyResponse, SurveyResults, SurveySettings,
            SurveySummary, UpdateSurveyRequest,
        },
        template::SurveyTemplate,
        user::Role,
    },
    services::aggregator::{self, parse_rating},
    store::{SurveyStore, UserStore},
    utils::{html::clean_html, jwt::Claims},
};

/// The authenticated caller of a survey operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl TryFrom<&Claims> for Actor {
    type Error = AppError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        Ok(Actor {
            id: claims.user_id()?,
            role: claims.role,
        })
    }
}

/// Access rule shared by every survey read and write.
///
/// Public surveys are open to anyone when no role is required. Otherwise the
/// actor has to be the creator or a collaborator.
pub fn check_access(
    survey: &Survey,
    actor: Option<i64>,
    required_role: Option<Role>,
) -> Result<(), AppError> {
    if survey.is_public && required_role.is_none() {
        return Ok(());
    }

    match actor {
        Some(id) if survey.is_member(id) => Ok(()),
        _ => Err(AppError::AccessDenied("Unauthorized access".to_string())),
    }
}

/// Sanitises, validates and orders a question list.
fn build_questions(questions: Vec<NewQuestion>) -> Result<Vec<Question>, AppError> {
    let mut seen = HashSet::new();

    questions
        .into_iter()
        .enumerate()
        .map(|(position, mut q)| {
            q.validate()?;
            q.check_options()?;
            q.text = clean_html(&q.text);
            if q.text.trim().is_empty() {
                return Err(AppError::Validation("Question text cannot be empty".to_string()));
            }

            let question = q.into_question(position as u32);
            if !seen.insert(question.id.clone()) {
                return Err(AppError::Validation(format!(
                    "Duplicate question id '{}'",
                    question.id
                )));
            }
            Ok(question)
        })
        .collect()
}

/// Stored answers are keyed by question id, so a kept id must keep its type
/// once responses exist.
fn reject_retyped_questions(current: &[Question], updated: &[Question]) -> Result<(), AppError> {
    for question in updated {
        let retyped = current
            .iter()
            .any(|old| old.id == question.id && old.question_type != question.question_type);
        if retyped {
            return Err(AppError::Validation(format!(
                "Question \"{}\" already has responses; its type cannot change",
                question.text
            )));
        }
    }
    Ok(())
}

fn clean_title(title: &str) -> Result<String, AppError> {
    let cleaned = clean_html(title);
    if cleaned.trim().is_empty() {
        return Err(AppError::Validation("Title cannot be empty".to_string()));
    }
    Ok(cleaned)
}

/// Survey authoring, collection and reporting over an injected store.
#[derive(Clone)]
pub struct SurveyService {
    store: Arc<dyn SurveyStore>,
    users: Arc<dyn UserStore>,
}

impl SurveyService {
    pub fn new(store: Arc<dyn SurveyStore>, users: Arc<dyn UserStore>) -> Self {
        Self { store, users }
    }

    async fn load(&self, id: Uuid) -> Result<Survey, AppError> {
        self.store
            .get_survey(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Survey not found".to_string()))
    }

    pub async fn list_surveys(&self, actor: Option<i64>) -> Result<Vec<SurveySummary>, AppError> {
        self.store.list_surveys(actor).await
    }

    pub async fn get_survey(&self, id: Uuid, actor: Option<i64>) -> Result<Survey, AppError> {
        let survey = self.load(id).await?;
        check_access(&survey, actor, None)?;
        Ok(survey)
    }

    pub async fn create_survey(
        &self,
        req: CreateSurveyRequest,
        actor: &Actor,
    ) -> Result<Uuid, AppError> {
        if !actor.role.can_create_surveys() {
            return Err(AppError::AccessDenied("Unauthorized".to_string()));
        }
        req.validate()?;

        let mut settings = SurveySettings::default();
        if let Some(patch) = &req.settings {
            patch.validate()?;
            settings.merge(patch);
        }

        let now = Utc::now();
        let survey = Survey {
            id: Uuid::new_v4(),
            title: clean_title(&req.title)?,
            description: clean_html(&req.description),
            creator_id: actor.id,
            questions: build_questions(req.questions)?,
            created_at: now,
            updated_at: now,
            expires_at: req.expires_at,
            is_public: req.is_public.unwrap_or(true),
            shareable_link: Uuid::new_v4(),
            responses: Vec::new(),
            collaborators: Vec::new(),
            settings,
        };

        self.store.insert_survey(&survey).await?;
        tracing::info!(survey_id = %survey.id, creator_id = actor.id, "Survey created");

        Ok(survey.id)
    }

    pub async fn update_survey(
        &self,
        id: Uuid,
        req: UpdateSurveyRequest,
        actor: &Actor,
    ) -> Result<(), AppError> {
        let mut survey = self.load(id).await?;
        check_access(&survey, Some(actor.id), Some(Role::Creator))?;
        req.validate()?;

        if let Some(title) = &req.title {
            survey.title = clean_title(title)?;
        }
        if let Some(description) = &req.description {
            survey.description = clean_html(description);
        }
        if let Some(questions) = req.questions {
            let questions = build_questions(questions)?;
            if !survey.responses.is_empty() {
                reject_retyped_questions(&survey.questions, &questions)?;
            }
            survey.questions = questions;
        }
        if let Some(patch) = &req.settings {
            patch.validate()?;
            survey.settings.merge(patch);
        }
        if let Some(expires_at) = req.expires_at {
            survey.expires_at = Some(expires_at);
        }
        if let Some(is_public) = req.is_public {
            survey.is_public = is_public;
        }
        survey.updated_at = Utc::now();

        if !self.store.update_survey(&survey).await? {
            return Err(AppError::NotFound("Survey not found".to_string()));
        }

        // Written only when supplied, so concurrent additions are not clobbered.
        if let Some(collaborators) = req.collaborators {
            let mut seen = HashSet::new();
            let collaborators: Vec<i64> = collaborators
                .into_iter()
                .filter(|c| *c != survey.creator_id && seen.insert(*c))
                .collect();
            if !self.store.set_collaborators(id, &collaborators).await? {
                return Err(AppError::NotFound("Survey not found".to_string()));
            }
        }
        tracing::info!(survey_id = %id, actor_id = actor.id, "Survey updated");

        Ok(())
    }

    /// Creator or an admin only.
    pub async fn delete_survey(&self, id: Uuid, actor: &Actor) -> Result<(), AppError> {
        let survey = self.load(id).await?;

        if survey.creator_id != actor.id && actor.role != Role::Admin {
            return Err(AppError::AccessDenied("Unauthorized".to_string()));
        }

        if !self.store.delete_survey(id).await? {
            return Err(AppError::NotFound("Survey not found".to_string()));
        }
        tracing::info!(survey_id = %id, actor_id = actor.id, "Survey deleted");

        Ok(())
    }

    /// Records one response. Checks run in a fixed order: existence, expiry,
    /// duplicate address, required questions, then answer shape.
    pub async fn submit_response(
        &self,
        id: Uuid,
        req: SubmitResponseRequest,
        source_address: Option<&str>,
    ) -> Result<SubmitResponseResult, AppError> {
        let survey = self.load(id).await?;
        let now = Utc::now();

        if survey.is_expired_at(now) {
            return Err(AppError::Expired);
        }

        let ip_address = if survey.settings.one_response_per_ip {
            if let Some(addr) = source_address {
                if self.store.has_response_from(id, addr).await? {
                    tracing::warn!(survey_id = %id, addr, "Duplicate submission rejected");
                    return Err(AppError::DuplicateSubmission);
                }
            }
            source_address.map(str::to_string)
        } else {
            None
        };

        let answers = req.answer_map();

        if let Some(missing) = survey
            .questions
            .iter()
            .find(|q| q.required && !answers.contains_key(&q.id))
        {
            return Err(AppError::MissingRequiredAnswer(missing.text.clone()));
        }

        for (question_id, answer) in &answers {
            let question = survey.question(question_id).ok_or_else(|| {
                AppError::Validation(format!("Unknown question id '{}'", question_id))
            })?;
            if question.question_type == QuestionType::Rating
                && parse_rating(&answer.answer).is_some_and(|r| r > MAX_RATING)
            {
                return Err(AppError::Validation(format!(
                    "Rating for \"{}\" must not exceed {}",
                    question.text, MAX_RATING
                )));
            }
        }

        let respondent_email = req
            .respondent_email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        if survey.settings.collect_email
            && !respondent_email.as_ref().is_some_and(|e| e.validate_email())
        {
            return Err(AppError::Validation(
                "A valid respondent email is required".to_string(),
            ));
        }

        let response = SurveyResponse {
            submitted_at: now,
            ip_address,
            respondent_email,
            answers,
        };

        if !self.store.append_response(id, &response).await? {
            return Err(AppError::NotFound("Survey not found".to_string()));
        }
        tracing::info!(survey_id = %id, "Response recorded");

        Ok(SubmitResponseResult {
            message: "Response submitted successfully".to_string(),
            thank_you_message: survey.settings.custom_thank_you,
        })
    }

    /// Raw responses. Members always; others only for public surveys that
    /// publish their results.
    pub async fn get_results(&self, id: Uuid, actor: Option<i64>) -> Result<SurveyResults, AppError> {
        let survey = self.load(id).await?;

        let published = survey.is_public && survey.settings.show_results;
        if !published && check_access(&survey, actor, Some(Role::Creator)).is_err() {
            return Err(AppError::AccessDenied("Results are not public".to_string()));
        }

        Ok(SurveyResults {
            total_responses: survey.responses.len(),
            responses: survey.responses,
        })
    }

    pub async fn get_analytics(&self, id: Uuid, actor: Option<i64>) -> Result<Analytics, AppError> {
        let survey = self.load(id).await?;
        check_access(&survey, actor, Some(Role::Creator))?;
        Ok(aggregator::summarize(&survey))
    }

    /// Creator only. The collaborator has to be a registered user.
    pub async fn add_collaborator(
        &self,
        id: Uuid,
        actor: &Actor,
        collaborator_id: i64,
    ) -> Result<(), AppError> {
        let survey = self.load(id).await?;

        if survey.creator_id != actor.id {
            return Err(AppError::AccessDenied(
                "Only the survey creator can add collaborators".to_string(),
            ));
        }

        if self.users.find_by_id(collaborator_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        if !self.store.add_collaborator(id, collaborator_id).await? {
            return Err(AppError::NotFound("Survey not found".to_string()));
        }
        tracing::info!(survey_id = %id, collaborator_id, "Collaborator added");

        Ok(())
    }

    pub async fn list_templates(&self) -> Result<Vec<SurveyTemplate>, AppError> {
        self.store.list_templates().await
    }

    /// Creates a fresh survey owned by `actor` from a template.
    pub async fn use_template(&self, template_id: Uuid, actor: &Actor) -> Result<Uuid, AppError> {
        let template = self
            .store
            .get_template(template_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;

        let req = CreateSurveyRequest {
            title: format!("{} (Copy)", template.title),
            description: template.description,
            questions: template.questions.into_iter().map(NewQuestion::from).collect(),
            settings: template.settings.map(Into::into),
            expires_at: None,
            is_public: None,
        };

        self.create_survey(req, actor).await
    }

    /// Inserts the given templates when none exist yet.
    pub async fn seed_templates(&self, templates: Vec<SurveyTemplate>) -> Result<(), AppError> {
        if !self.store.list_templates().await?.is_empty() {
            return Ok(());
        }
        for template in &templates {
            self.store.insert_template(template).await?;
        }
        tracing::info!("Seeded {} survey templates", templates.len());
        Ok(())
    }
}

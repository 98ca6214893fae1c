// src/store/mod.rs

//! Persistence seams. Services only ever see these traits; `main` decides
//! which implementation backs them.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        survey::{Survey, SurveyResponse, SurveySummary},
        template::SurveyTemplate,
        user::{NewUser, User},
    },
};

/// Survey documents, their responses and survey templates.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    async fn insert_survey(&self, survey: &Survey) -> Result<(), AppError>;

    /// Loads the definition together with every response in submission order.
    async fn get_survey(&self, id: Uuid) -> Result<Option<Survey>, AppError>;

    /// Public surveys, plus those `actor` created or collaborates on.
    async fn list_surveys(&self, actor: Option<i64>) -> Result<Vec<SurveySummary>, AppError>;

    /// Replaces the definition fields. Stored responses and collaborators are
    /// left untouched. Returns `false` when the survey no longer exists.
    async fn update_survey(&self, survey: &Survey) -> Result<bool, AppError>;

    /// Replaces the collaborator list wholesale.
    async fn set_collaborators(&self, id: Uuid, collaborators: &[i64]) -> Result<bool, AppError>;

    async fn delete_survey(&self, id: Uuid) -> Result<bool, AppError>;

    /// Appends one response. Returns `false` when the survey no longer exists.
    async fn append_response(&self, id: Uuid, response: &SurveyResponse)
    -> Result<bool, AppError>;

    async fn has_response_from(&self, id: Uuid, ip_address: &str) -> Result<bool, AppError>;

    /// Set semantics: adding an existing collaborator is a no-op.
    async fn add_collaborator(&self, id: Uuid, user_id: i64) -> Result<bool, AppError>;

    async fn list_templates(&self) -> Result<Vec<SurveyTemplate>, AppError>;

    async fn get_template(&self, id: Uuid) -> Result<Option<SurveyTemplate>, AppError>;

    async fn insert_template(&self, template: &SurveyTemplate) -> Result<(), AppError>;
}

/// Accounts and password reset state.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError>;

    async fn set_reset_token(
        &self,
        id: i64,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Only returns a user whose token expires after `now`.
    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError>;

    /// Stores a new hash and clears any pending reset token.
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError>;
}

// src/store/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        survey::{Survey, SurveyResponse, SurveySummary},
        template::SurveyTemplate,
        user::{NewUser, User},
    },
    store::{SurveyStore, UserStore},
};

#[derive(Default)]
struct Inner {
    /// Insertion order.
    surveys: Vec<Survey>,
    templates: Vec<SurveyTemplate>,
    users: Vec<User>,
    next_user_id: i64,
}

/// Process-local store used when no database is configured, and by the tests.
/// Each method holds the lock for its whole read-modify-write.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SurveyStore for MemoryStore {
    async fn insert_survey(&self, survey: &Survey) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner.surveys.iter().any(|s| s.id == survey.id) {
            return Err(AppError::Conflict(format!("Survey {} already exists", survey.id)));
        }
        inner.surveys.push(survey.clone());
        Ok(())
    }

    async fn get_survey(&self, id: Uuid) -> Result<Option<Survey>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.surveys.iter().find(|s| s.id == id).cloned())
    }

    async fn list_surveys(&self, actor: Option<i64>) -> Result<Vec<SurveySummary>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .surveys
            .iter()
            .filter(|s| s.is_public || actor.is_some_and(|id| s.is_member(id)))
            .map(SurveySummary::from)
            .collect())
    }

    async fn update_survey(&self, survey: &Survey) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        let Some(existing) = inner.surveys.iter_mut().find(|s| s.id == survey.id) else {
            return Ok(false);
        };
        let responses = std::mem::take(&mut existing.responses);
        let collaborators = std::mem::take(&mut existing.collaborators);
        *existing = Survey {
            responses,
            collaborators,
            ..survey.clone()
        };
        Ok(true)
    }

    async fn set_collaborators(&self, id: Uuid, collaborators: &[i64]) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner.surveys.iter_mut().find(|s| s.id == id) {
            Some(survey) => {
                survey.collaborators = collaborators.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_survey(&self, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        let before = inner.surveys.len();
        inner.surveys.retain(|s| s.id != id);
        Ok(inner.surveys.len() != before)
    }

    async fn append_response(
        &self,
        id: Uuid,
        response: &SurveyResponse,
    ) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner.surveys.iter_mut().find(|s| s.id == id) {
            Some(survey) => {
                survey.responses.push(response.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn has_response_from(&self, id: Uuid, ip_address: &str) -> Result<bool, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .surveys
            .iter()
            .find(|s| s.id == id)
            .is_some_and(|s| {
                s.responses
                    .iter()
                    .any(|r| r.ip_address.as_deref() == Some(ip_address))
            }))
    }

    async fn add_collaborator(&self, id: Uuid, user_id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner.surveys.iter_mut().find(|s| s.id == id) {
            Some(survey) => {
                if !survey.collaborators.contains(&user_id) {
                    survey.collaborators.push(user_id);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_templates(&self) -> Result<Vec<SurveyTemplate>, AppError> {
        Ok(self.inner.read().await.templates.clone())
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<SurveyTemplate>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.templates.iter().find(|t| t.id == id).cloned())
    }

    async fn insert_template(&self, template: &SurveyTemplate) -> Result<(), AppError> {
        self.inner.write().await.templates.push(template.clone());
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        inner.next_user_id += 1;
        let created = User {
            id: inner.next_user_id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            role: user.role,
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
            reset_token: None,
            reset_token_expires: None,
        };
        inner.users.push(created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: i64,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.reset_token = Some(token.to_string());
            user.reset_token_expires = Some(expires);
        }
        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| {
                u.reset_token.as_deref() == Some(token)
                    && u.reset_token_expires.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.password_hash = password_hash.to_string();
            user.reset_token = None;
            user.reset_token_expires = None;
        }
        Ok(())
    }
}

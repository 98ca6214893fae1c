// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        survey::{AnswerMap, Question, Survey, SurveyResponse, SurveySettings, SurveySummary},
        template::{SurveyTemplate, TemplateQuestion, TemplateSettings},
        user::{NewUser, User},
    },
    store::{SurveyStore, UserStore},
};

/// PostgreSQL-backed store. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Represents the 'surveys' table.
#[derive(FromRow)]
struct SurveyRow {
    id: Uuid,
    title: String,
    description: String,
    creator_id: i64,
    questions: Json<Vec<Question>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_public: bool,
    shareable_link: Uuid,
    collaborators: Vec<i64>,
    settings: Json<SurveySettings>,
}

impl SurveyRow {
    fn into_survey(self, responses: Vec<SurveyResponse>) -> Survey {
        Survey {
            id: self.id,
            title: self.title,
            description: self.description,
            creator_id: self.creator_id,
            questions: self.questions.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
            expires_at: self.expires_at,
            is_public: self.is_public,
            shareable_link: self.shareable_link,
            responses,
            collaborators: self.collaborators,
            settings: self.settings.0,
        }
    }
}

/// Represents the 'survey_responses' table.
#[derive(FromRow)]
struct ResponseRow {
    submitted_at: DateTime<Utc>,
    ip_address: Option<String>,
    respondent_email: Option<String>,
    answers: Json<AnswerMap>,
}

impl From<ResponseRow> for SurveyResponse {
    fn from(r: ResponseRow) -> Self {
        SurveyResponse {
            submitted_at: r.submitted_at,
            ip_address: r.ip_address,
            respondent_email: r.respondent_email,
            answers: r.answers.0,
        }
    }
}

#[derive(FromRow)]
struct SummaryRow {
    id: Uuid,
    title: String,
    description: String,
    creator_id: i64,
    is_public: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    question_count: i64,
    response_count: i64,
}

impl From<SummaryRow> for SurveySummary {
    fn from(r: SummaryRow) -> Self {
        SurveySummary {
            id: r.id,
            title: r.title,
            description: r.description,
            creator_id: r.creator_id,
            is_public: r.is_public,
            created_at: r.created_at,
            updated_at: r.updated_at,
            expires_at: r.expires_at,
            question_count: r.question_count,
            response_count: r.response_count,
        }
    }
}

/// Represents the 'survey_templates' table.
#[derive(FromRow)]
struct TemplateRow {
    id: Uuid,
    title: String,
    description: String,
    category: Option<String>,
    tags: Vec<String>,
    questions: Json<Vec<TemplateQuestion>>,
    settings: Option<Json<TemplateSettings>>,
    popularity: i32,
}

impl From<TemplateRow> for SurveyTemplate {
    fn from(r: TemplateRow) -> Self {
        SurveyTemplate {
            id: r.id,
            title: r.title,
            description: r.description,
            category: r.category,
            tags: r.tags,
            questions: r.questions.0,
            settings: r.settings.map(|s| s.0),
            popularity: r.popularity,
        }
    }
}

/// Represents the 'users' table.
#[derive(FromRow)]
struct UserRow {
    id: i64,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
    reset_token: Option<String>,
    reset_token_expires: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: r.id,
            email: r.email,
            name: r.name,
            password_hash: r.password_hash,
            role: r.role.parse().map_err(AppError::InternalServerError)?,
            is_active: r.is_active,
            created_at: r.created_at,
            last_login: r.last_login,
            reset_token: r.reset_token,
            reset_token_expires: r.reset_token_expires,
        })
    }
}

const SURVEY_COLUMNS: &str = r#"
    id, title, description, creator_id, questions, created_at, updated_at,
    expires_at, is_public, shareable_link, collaborators, settings
"#;

const USER_COLUMNS: &str = r#"
    id, email, name, password_hash, role, is_active, created_at,
    last_login, reset_token, reset_token_expires
"#;

#[async_trait]
impl SurveyStore for PgStore {
    async fn insert_survey(&self, survey: &Survey) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO surveys
                (id, title, description, creator_id, questions, created_at, updated_at,
                 expires_at, is_public, shareable_link, collaborators, settings)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(survey.id)
        .bind(&survey.title)
        .bind(&survey.description)
        .bind(survey.creator_id)
        .bind(Json(&survey.questions))
        .bind(survey.created_at)
        .bind(survey.updated_at)
        .bind(survey.expires_at)
        .bind(survey.is_public)
        .bind(survey.shareable_link)
        .bind(&survey.collaborators)
        .bind(Json(&survey.settings))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert survey: {:?}", e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn get_survey(&self, id: Uuid) -> Result<Option<Survey>, AppError> {
        let row = sqlx::query_as::<_, SurveyRow>(&format!(
            "SELECT {} FROM surveys WHERE id = $1",
            SURVEY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let responses = sqlx::query_as::<_, ResponseRow>(
            r#"
            SELECT submitted_at, ip_address, respondent_email, answers
            FROM survey_responses
            WHERE survey_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.into_survey(
            responses.into_iter().map(SurveyResponse::from).collect(),
        )))
    }

    async fn list_surveys(&self, actor: Option<i64>) -> Result<Vec<SurveySummary>, AppError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT
                s.id, s.title, s.description, s.creator_id, s.is_public,
                s.created_at, s.updated_at, s.expires_at,
                jsonb_array_length(s.questions)::BIGINT AS question_count,
                (SELECT COUNT(*) FROM survey_responses r WHERE r.survey_id = s.id) AS response_count
            FROM surveys s
            WHERE s.is_public
               OR ($1::BIGINT IS NOT NULL AND (s.creator_id = $1 OR $1 = ANY(s.collaborators)))
            ORDER BY s.created_at ASC
            "#,
        )
        .bind(actor)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SurveySummary::from).collect())
    }

    async fn update_survey(&self, survey: &Survey) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE surveys SET
                title = $2, description = $3, questions = $4, updated_at = $5,
                expires_at = $6, is_public = $7, settings = $8
            WHERE id = $1
            "#,
        )
        .bind(survey.id)
        .bind(&survey.title)
        .bind(&survey.description)
        .bind(Json(&survey.questions))
        .bind(survey.updated_at)
        .bind(survey.expires_at)
        .bind(survey.is_public)
        .bind(Json(&survey.settings))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_collaborators(&self, id: Uuid, collaborators: &[i64]) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE surveys SET collaborators = $2 WHERE id = $1")
            .bind(id)
            .bind(collaborators)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_survey(&self, id: Uuid) -> Result<bool, AppError> {
        // Responses go with the survey via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM surveys WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn append_response(
        &self,
        id: Uuid,
        response: &SurveyResponse,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO survey_responses (survey_id, submitted_at, ip_address, respondent_email, answers)
            SELECT id, $2, $3, $4, $5::json FROM surveys WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(response.submitted_at)
        .bind(&response.ip_address)
        .bind(&response.respondent_email)
        // Sent as text: a JSONB parameter would reorder the keys.
        .bind(
            serde_json::to_string(&response.answers)
                .map_err(|e| AppError::InternalServerError(e.to_string()))?,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to append response: {:?}", e);
            AppError::from(e)
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn has_response_from(&self, id: Uuid, ip_address: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM survey_responses WHERE survey_id = $1 AND ip_address = $2)",
        )
        .bind(id)
        .bind(ip_address)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn add_collaborator(&self, id: Uuid, user_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE surveys SET collaborators = CASE
                WHEN $2 = ANY(collaborators) THEN collaborators
                ELSE array_append(collaborators, $2)
            END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_templates(&self) -> Result<Vec<SurveyTemplate>, AppError> {
        let rows = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, title, description, category, tags, questions, settings, popularity
            FROM survey_templates
            ORDER BY popularity DESC, title ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SurveyTemplate::from).collect())
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<SurveyTemplate>, AppError> {
        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, title, description, category, tags, questions, settings, popularity
            FROM survey_templates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SurveyTemplate::from))
    }

    async fn insert_template(&self, template: &SurveyTemplate) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO survey_templates
                (id, title, description, category, tags, questions, settings, popularity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(template.id)
        .bind(&template.title)
        .bind(&template.description)
        .bind(&template.category)
        .bind(&template.tags)
        .bind(Json(&template.questions))
        .bind(template.settings.as_ref().map(Json))
        .bind(template.popularity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let duplicate =
                matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
            if duplicate {
                AppError::Conflict("Email already registered".to_string())
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })?;

        row.try_into()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: i64,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET reset_token = $2, reset_token_expires = $3 WHERE id = $1")
            .bind(id)
            .bind(token)
            .bind(expires)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE reset_token = $1 AND reset_token_expires > $2",
            USER_COLUMNS
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, reset_token = NULL, reset_token_expires = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

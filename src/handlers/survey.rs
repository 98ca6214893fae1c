// src/handlers/survey.rs

use std::{convert::Infallible, net::SocketAddr};

use axum::{
    Extension, Json,
    extract::{ConnectInfo, FromRef, FromRequestParts, Path, State},
    http::{HeaderMap, StatusCode, request::Parts},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    handlers::parse_id,
    models::survey::{
        AddCollaboratorRequest, CreateSurveyRequest, SubmitResponseRequest, UpdateSurveyRequest,
    },
    services::survey::{Actor, SurveyService},
    utils::jwt::{Claims, bearer_claims},
};

/// Network address of the respondent, used for the one-response-per-address rule.
///
/// Taken from the first `X-Forwarded-For` entry when the deployment trusts
/// its proxy, otherwise from the peer socket (IP only).
pub struct SourceAddress(pub Option<String>);

impl<S> FromRequestParts<S> for SourceAddress
where
    S: Send + Sync,
    Config: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if Config::from_ref(state).trust_forwarded_for {
            let forwarded = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(addr) = forwarded {
                return Ok(Self(Some(addr.to_string())));
            }
        }

        Ok(Self(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string()),
        ))
    }
}

/// Lists public surveys, plus the caller's own and shared ones when a valid
/// bearer token is supplied.
pub async fn list_surveys(
    State(surveys): State<SurveyService>,
    State(config): State<Config>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let actor = bearer_claims(&headers, &config.jwt_secret)
        .map(|claims| claims.user_id())
        .transpose()?;

    Ok(Json(surveys.list_surveys(actor).await?))
}

/// Creates a survey. Requires the `creator` or `admin` role.
pub async fn create_survey(
    State(surveys): State<SurveyService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSurveyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::try_from(&claims)?;
    let id = surveys.create_survey(payload, &actor).await?;

    Ok((StatusCode::CREATED, Json(json!({ "_id": id }))))
}

pub async fn get_survey(
    State(surveys): State<SurveyService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "Survey")?;

    Ok(Json(surveys.get_survey(id, Some(claims.user_id()?)).await?))
}

pub async fn update_survey(
    State(surveys): State<SurveyService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateSurveyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "Survey")?;
    surveys
        .update_survey(id, payload, &Actor::try_from(&claims)?)
        .await?;

    Ok(Json(json!({ "message": "Survey updated successfully" })))
}

pub async fn delete_survey(
    State(surveys): State<SurveyService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "Survey")?;
    surveys.delete_survey(id, &Actor::try_from(&claims)?).await?;

    Ok(Json(json!({ "message": "Survey deleted successfully" })))
}

/// Public endpoint: anyone holding the survey id may respond.
pub async fn submit_response(
    State(surveys): State<SurveyService>,
    Path(id): Path<String>,
    SourceAddress(source): SourceAddress,
    Json(payload): Json<SubmitResponseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "Survey")?;

    Ok(Json(
        surveys
            .submit_response(id, payload, source.as_deref())
            .await?,
    ))
}

pub async fn get_results(
    State(surveys): State<SurveyService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "Survey")?;

    Ok(Json(surveys.get_results(id, Some(claims.user_id()?)).await?))
}

pub async fn get_analytics(
    State(surveys): State<SurveyService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "Survey")?;

    Ok(Json(
        surveys
            .get_analytics(id, Some(claims.user_id()?))
            .await?,
    ))
}

pub async fn add_collaborator(
    State(surveys): State<SurveyService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<AddCollaboratorRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "Survey")?;
    surveys
        .add_collaborator(id, &Actor::try_from(&claims)?, payload.user_id)
        .await?;

    Ok(Json(json!({ "message": "Collaborator added successfully" })))
}

pub async fn list_templates(
    State(surveys): State<SurveyService>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(surveys.list_templates().await?))
}

/// Copies a template into a new survey owned by the caller.
pub async fn use_template(
    State(surveys): State<SurveyService>,
    Extension(claims): Extension<Claims>,
    Path(template_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let template_id = parse_id(&template_id, "Template")?;
    let id = surveys
        .use_template(template_id, &Actor::try_from(&claims)?)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "_id": id }))))
}

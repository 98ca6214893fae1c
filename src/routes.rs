// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, survey},
    state::AppState,
    utils::jwt::auth_middleware,
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Assembles the main application router.
///
/// * Public routes: registration, login, password reset, survey listing,
///   templates and response submission.
/// * Everything else sits behind the bearer-token middleware.
/// * Global middleware: Trace, CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password/{token}", post(auth::reset_password))
        .merge(
            Router::new()
                .route("/change-password", post(auth::change_password))
                .route("/me", get(auth::me))
                .layer(require_auth.clone()),
        );

    let survey_routes = Router::new()
        .route("/", get(survey::list_surveys))
        .route("/templates", get(survey::list_templates))
        .route("/{id}/respond", post(survey::submit_response))
        // Protected survey routes
        .merge(
            Router::new()
                .route("/", post(survey::create_survey))
                .route("/templates/{id}/use", post(survey::use_template))
                .route(
                    "/{id}",
                    get(survey::get_survey)
                        .put(survey::update_survey)
                        .delete(survey::delete_survey),
                )
                .route("/{id}/results", get(survey::get_results))
                .route("/{id}/analytics", get(survey::get_analytics))
                .route("/results/{id}/analytics", get(survey::get_analytics))
                .route("/{id}/collaborators", post(survey::add_collaborator))
                .layer(require_auth),
        );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/surveys", survey_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

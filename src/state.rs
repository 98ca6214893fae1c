use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::{auth::AuthService, survey::SurveyService},
    store::{SurveyStore, UserStore},
    utils::mailer::Mailer,
};

#[derive(Clone)]
pub struct AppState {
    pub surveys: SurveyService,
    pub auth: AuthService,
    pub config: Config,
}

impl AppState {
    /// Wires both services onto the given store handles.
    pub fn new(
        surveys: Arc<dyn SurveyStore>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        config: Config,
    ) -> Self {
        Self {
            surveys: SurveyService::new(surveys, users.clone()),
            auth: AuthService::new(users, mailer, config.clone()),
            config,
        }
    }
}

impl FromRef<AppState> for SurveyService {
    fn from_ref(state: &AppState) -> Self {
        state.surveys.clone()
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

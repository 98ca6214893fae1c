// src/services/auth.rs

use std::sync::Arc;

use chrono::{Duration, Utc};
use validator::Validate;

use crate::{
    config::{Config, RESET_TOKEN_TTL_SECS},
    error::AppError,
    models::user::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, NewUser,
        RegisterRequest, ResetPasswordRequest, Role, User, UserProfile,
    },
    store::UserStore,
    utils::{
        hash::{generate_reset_token, hash_password, verify_password},
        jwt::sign_jwt,
        mailer::Mailer,
    },
};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration, login and credential management.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    config: Config,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        Self {
            users,
            mailer,
            config,
        }
    }

    async fn load(&self, id: i64) -> Result<User, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Creates an account. Admin accounts cannot be self-registered.
    pub async fn register(&self, req: RegisterRequest) -> Result<UserProfile, AppError> {
        req.validate()?;

        let role = req.role.unwrap_or(Role::Creator);
        if role == Role::Admin {
            return Err(AppError::Validation("Cannot register as admin".to_string()));
        }

        let user = self
            .users
            .create_user(NewUser {
                email: normalize_email(&req.email),
                name: req.name.trim().to_string(),
                password_hash: hash_password(&req.password)?,
                role,
            })
            .await?;

        tracing::info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user.into())
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        req.validate()?;

        let invalid = || AppError::AuthError("Invalid credentials".to_string());

        let user = self
            .users
            .find_by_email(&normalize_email(&req.email))
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&req.password, &user.password_hash)? {
            return Err(invalid());
        }

        if !user.is_active {
            return Err(AppError::AccessDenied("Account is deactivated".to_string()));
        }

        let now = Utc::now();
        self.users.record_login(user.id, now).await?;

        let token = sign_jwt(
            user.id,
            user.role,
            &self.config.jwt_secret,
            self.config.jwt_expiration,
        )?;

        let mut profile = UserProfile::from(user);
        profile.last_login = Some(now);

        Ok(LoginResponse {
            token,
            token_type: "Bearer",
            user: profile,
        })
    }

    /// Always succeeds from the caller's point of view so that registered
    /// addresses cannot be probed.
    pub async fn forgot_password(&self, req: ForgotPasswordRequest) -> Result<(), AppError> {
        req.validate()?;

        let Some(user) = self.users.find_by_email(&normalize_email(&req.email)).await? else {
            return Ok(());
        };

        let token = generate_reset_token();
        let expires = Utc::now() + Duration::seconds(RESET_TOKEN_TTL_SECS);
        self.users.set_reset_token(user.id, &token, expires).await?;

        let link = self.config.reset_link(&token);
        if let Err(e) = self.mailer.send_password_reset(&user.email, &link).await {
            tracing::error!("Failed to send reset email: {}", e);
        }

        Ok(())
    }

    pub async fn reset_password(
        &self,
        token: &str,
        req: ResetPasswordRequest,
    ) -> Result<(), AppError> {
        req.validate()?;

        let user = self
            .users
            .find_by_reset_token(token, Utc::now())
            .await?
            .ok_or_else(|| AppError::Validation("Invalid or expired reset token".to_string()))?;

        self.users
            .update_password(user.id, &hash_password(&req.password)?)
            .await?;
        tracing::info!(user_id = user.id, "Password reset");

        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        req: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        req.validate()?;

        let user = self.load(user_id).await?;
        if !verify_password(&req.current_password, &user.password_hash)? {
            return Err(AppError::AuthError("Current password is incorrect".to_string()));
        }

        self.users
            .update_password(user.id, &hash_password(&req.new_password)?)
            .await?;

        Ok(())
    }

    pub async fn me(&self, user_id: i64) -> Result<UserProfile, AppError> {
        Ok(self.load(user_id).await?.into())
    }

    /// Creates the configured admin account if it does not exist yet.
    pub async fn seed_admin(&self, email: &str, password: &str) -> Result<(), AppError> {
        let email = normalize_email(email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Ok(());
        }

        tracing::info!("Seeding admin user: {}", email);
        self.users
            .create_user(NewUser {
                email,
                name: "Administrator".to_string(),
                password_hash: hash_password(password)?,
                role: Role::Admin,
            })
            .await?;
        tracing::info!("Admin user created successfully.");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use url::Url;

    use super::*;
    use crate::{
        store::memory::MemoryStore,
        utils::{jwt::verify_jwt, mailer::LogMailer},
    };

    /// Keeps every reset link it is asked to send.
    #[derive(Default)]
    struct CapturingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Mailer for CapturingMailer {
        async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<(), AppError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), reset_link.to_string()));
            Ok(())
        }
    }

    fn config() -> Config {
        Config {
            database_url: None,
            jwt_secret: "auth_test_secret".to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            client_url: Url::parse("http://localhost:5173").unwrap(),
            cors_origins: vec![],
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            trust_forwarded_for: false,
            admin_email: None,
            admin_password: None,
        }
    }

    fn service() -> (AuthService, Arc<CapturingMailer>) {
        let mailer = Arc::new(CapturingMailer::default());
        let svc = AuthService::new(Arc::new(MemoryStore::new()), mailer.clone(), config());
        (svc, mailer)
    }

    fn register_req(email: &str, role: Option<Role>) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "password123".to_string(),
            name: "Grace".to_string(),
            role,
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login_issues_a_token() {
        let (svc, _) = service();
        let profile = svc.register(register_req("Grace@Example.com", None)).await.unwrap();
        assert_eq!(profile.role, Role::Creator);
        assert_eq!(profile.email, "grace@example.com");

        let login = svc
            .login(login_req("grace@example.com", "password123"))
            .await
            .unwrap();
        let claims = verify_jwt(&login.token, "auth_test_secret").unwrap();
        assert_eq!(claims.user_id().unwrap(), profile.id);
        assert!(login.user.last_login.is_some());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (svc, _) = service();
        svc.register(register_req("a@example.com", None)).await.unwrap();
        let err = svc
            .register(register_req("a@example.com", Some(Role::Respondent)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn admin_cannot_self_register() {
        let (svc, _) = service();
        let err = svc
            .register(register_req("root@example.com", Some(Role::Admin)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (svc, _) = service();
        svc.register(register_req("b@example.com", None)).await.unwrap();
        let a = svc.login(login_req("b@example.com", "wrongpass")).await.unwrap_err();
        let b = svc.login(login_req("nobody@example.com", "password123")).await.unwrap_err();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn reset_flow_replaces_the_password_once() {
        let (svc, mailer) = service();
        svc.register(register_req("c@example.com", None)).await.unwrap();

        svc.forgot_password(ForgotPasswordRequest {
            email: "c@example.com".to_string(),
        })
        .await
        .unwrap();
        svc.forgot_password(ForgotPasswordRequest {
            email: "ghost@example.com".to_string(),
        })
        .await
        .unwrap();

        let sent = mailer.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        let (to, link) = &sent[0];
        assert_eq!(to, "c@example.com");
        let token = link
            .strip_prefix("http://localhost:5173/reset-password/")
            .unwrap()
            .to_string();

        svc.reset_password(
            &token,
            ResetPasswordRequest {
                password: "brand-new-pass".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(svc.login(login_req("c@example.com", "brand-new-pass")).await.is_ok());
        assert!(svc.login(login_req("c@example.com", "password123")).await.is_err());

        let reused = svc
            .reset_password(
                &token,
                ResetPasswordRequest {
                    password: "another-pass".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(reused, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn forgot_password_stores_a_token_with_the_log_mailer() {
        let store = Arc::new(MemoryStore::new());
        let svc = AuthService::new(store.clone(), Arc::new(LogMailer), config());
        let profile = svc.register(register_req("e@example.com", None)).await.unwrap();

        svc.forgot_password(ForgotPasswordRequest {
            email: "e@example.com".to_string(),
        })
        .await
        .unwrap();

        let user = store.find_by_id(profile.id).await.unwrap().unwrap();
        let token = user.reset_token.expect("reset token stored");
        assert_eq!(token.len(), 64);
        assert!(user.reset_token_expires.unwrap() > Utc::now());
        let found = store.find_by_reset_token(&token, Utc::now()).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(profile.id));
    }

    #[tokio::test]
    async fn change_password_checks_the_current_one() {
        let (svc, _) = service();
        let profile = svc.register(register_req("d@example.com", None)).await.unwrap();

        let err = svc
            .change_password(
                profile.id,
                ChangePasswordRequest {
                    current_password: "not-it-at-all".to_string(),
                    new_password: "fresh-password".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));

        svc.change_password(
            profile.id,
            ChangePasswordRequest {
                current_password: "password123".to_string(),
                new_password: "fresh-password".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(svc.login(login_req("d@example.com", "fresh-password")).await.is_ok());
        assert_eq!(svc.me(profile.id).await.unwrap().email, "d@example.com");
    }

    #[tokio::test]
    async fn seeding_the_admin_is_idempotent() {
        let (svc, _) = service();
        svc.seed_admin("admin@example.com", "admin-password").await.unwrap();
        svc.seed_admin("admin@example.com", "admin-password").await.unwrap();
        let login = svc
            .login(login_req("admin@example.com", "admin-password"))
            .await
            .unwrap();
        assert_eq!(login.user.role, Role::Admin);
    }
}

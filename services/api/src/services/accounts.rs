//! services/api/src/services/accounts.rs
//!
//! Registration, login and profile management on top of the user repository,
//! plus the cookie sessions that stand in for the signed-in user.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::Arc;
use study_planner_core::domain::User;
use study_planner_core::ports::{AuthSessionStore, PortError, PortResult, UserRepository};
use tracing::{error, info};
use uuid::Uuid;

pub const SESSION_DAYS: i64 = 30;
pub const MIN_USERNAME_CHARS: usize = 3;
pub const MIN_FULL_NAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 6;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

//=========================================================================================
// Password hashing
//=========================================================================================

pub fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            PortError::Unexpected("Failed to hash password".to_string())
        })
}

/// `false` for a wrong password and for a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Failed to parse password hash: {:?}", e);
            false
        }
    }
}

pub fn looks_like_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN)
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}

fn validate_full_name(full_name: &str) -> PortResult<()> {
    if full_name.chars().count() < MIN_FULL_NAME_CHARS {
        return Err(PortError::Validation(format!(
            "Full name must be at least {} characters",
            MIN_FULL_NAME_CHARS
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> PortResult<()> {
    if email.is_empty() || !looks_like_email(email) {
        return Err(PortError::Validation("Enter a valid email address".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> PortResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(PortError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    Ok(())
}

//=========================================================================================
// Service
//=========================================================================================

/// A freshly issued login session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn AuthSessionStore>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, sessions: Arc<dyn AuthSessionStore>) -> Self {
        Self { users, sessions }
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> PortResult<User> {
        let username = username.trim();
        let email = email.trim().to_lowercase();
        let full_name = full_name.trim();

        if username.chars().count() < MIN_USERNAME_CHARS {
            return Err(PortError::Validation(format!(
                "Username must be at least {} characters",
                MIN_USERNAME_CHARS
            )));
        }
        validate_email(&email)?;
        validate_full_name(full_name)?;
        validate_password(password)?;

        if self.users.find_by_username(username).await?.is_some() {
            return Err(PortError::Conflict("This username is already registered".to_string()));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(PortError::Conflict("This email is already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email,
            full_name: full_name.to_string(),
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        };
        let user = self.users.insert(user).await?;
        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// `identifier` is a username or an email. An unknown account is `NotFound`,
    /// a wrong password `Unauthorized`.
    pub async fn login(&self, identifier: &str, password: &str) -> PortResult<User> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.trim().is_empty() {
            return Err(PortError::Validation(
                "Email/username and password are required".to_string(),
            ));
        }

        let user = self
            .users
            .find_by_identifier(identifier)
            .await?
            .ok_or_else(|| {
                PortError::NotFound("No account found for this email/username".to_string())
            })?;

        if !verify_password(password, &user.password_hash) {
            return Err(PortError::Unauthorized);
        }
        info!("User {} signed in", user.username);
        Ok(user)
    }

    pub async fn start_session(&self, user_id: Uuid) -> PortResult<IssuedSession> {
        let session = IssuedSession {
            id: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + Duration::days(SESSION_DAYS),
        };
        self.sessions
            .create_auth_session(&session.id, user_id, session.expires_at)
            .await?;
        Ok(session)
    }

    /// The user behind a session cookie. Unknown or expired sessions are `Unauthorized`.
    pub async fn resolve_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.sessions.validate_auth_session(session_id).await
    }

    pub async fn end_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.delete_auth_session(session_id).await
    }

    pub async fn current_user(&self, user_id: Uuid) -> PortResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        full_name: &str,
        email: &str,
    ) -> PortResult<User> {
        let full_name = full_name.trim();
        let email = email.trim().to_lowercase();
        validate_full_name(full_name)?;
        validate_email(&email)?;

        let mut user = self.current_user(user_id).await?;
        if let Some(owner) = self.users.find_by_email(&email).await? {
            if owner.id != user.id {
                return Err(PortError::Conflict("This email is already registered".to_string()));
            }
        }

        user.full_name = full_name.to_string();
        user.email = email;
        if !self.users.update(&user).await? {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(user)
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> PortResult<()> {
        let mut user = self.current_user(user_id).await?;
        if !verify_password(current_password, &user.password_hash) {
            return Err(PortError::Validation("Current password is incorrect".to_string()));
        }
        validate_password(new_password)?;

        user.password_hash = hash_password(new_password)?;
        self.users.update(&user).await?;
        info!("Password changed for user {}", user.username);
        Ok(())
    }
}

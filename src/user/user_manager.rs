use std::sync::Arc;

use anyhow::{bail, Context, Result};

use super::auth::{AuthToken, AuthTokenValue, PasswordCredentials};
use super::user_models::{User, UserRole};
use super::user_store::UserStore;

/// Account operations shared by the HTTP auth routes and the maintenance cli.
#[derive(Clone)]
pub struct UserManager {
    user_store: Arc<dyn UserStore>,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>) -> Self {
        Self { user_store }
    }

    pub fn add_user(&self, username: &str, role: UserRole) -> Result<i64> {
        if username.is_empty() {
            bail!("The username cannot be empty");
        }
        if self.user_store.get_user_by_username(username)?.is_some() {
            bail!("Username {} already exists", username);
        }
        self.user_store.create_user(username, role)
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.user_store.get_user(user_id)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_store.get_user_by_username(username)
    }

    pub fn all_usernames(&self) -> Result<Vec<String>> {
        self.user_store.get_all_usernames()
    }

    pub fn set_role(&self, user_id: i64, role: UserRole) -> Result<()> {
        self.user_store.set_user_role(user_id, role)
    }

    pub fn create_password_credentials(&self, user_id: i64, password: &str) -> Result<()> {
        let user = self
            .user_store
            .get_user(user_id)?
            .with_context(|| format!("No user with id {}", user_id))?;
        if self.user_store.get_password_credentials(user_id)?.is_some() {
            bail!("User {} already has a password, update it instead", user.username);
        }
        let credentials = PasswordCredentials::from_plain_password(user_id, password)?;
        self.user_store.upsert_password_credentials(&credentials)
    }

    pub fn update_password_credentials(&self, user_id: i64, password: &str) -> Result<()> {
        if self.user_store.get_password_credentials(user_id)?.is_none() {
            bail!("User {} has no password to update", user_id);
        }
        let credentials = PasswordCredentials::from_plain_password(user_id, password)?;
        self.user_store.upsert_password_credentials(&credentials)
    }

    pub fn delete_password_credentials(&self, user_id: i64) -> Result<bool> {
        self.user_store.delete_password_credentials(user_id)
    }

    pub fn get_password_credentials(&self, user_id: i64) -> Result<Option<PasswordCredentials>> {
        self.user_store.get_password_credentials(user_id)
    }

    /// Verifies a password without recording the attempt, for cli inspection.
    pub fn check_password(&self, user_id: i64, password: &str) -> Result<bool> {
        let credentials = self
            .user_store
            .get_password_credentials(user_id)?
            .with_context(|| format!("User {} has no password credentials", user_id))?;
        credentials.matches(password)
    }

    /// Checks a username and password pair, recording the attempt on the
    /// stored credentials. Returns the user only when the password matches.
    pub fn verify_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = match self.user_store.get_user_by_username(username)? {
            Some(user) => user,
            None => return Ok(None),
        };
        let credentials = match self.user_store.get_password_credentials(user.id)? {
            Some(credentials) => credentials,
            None => return Ok(None),
        };
        let matches = credentials.matches(password)?;
        self.user_store.record_password_attempt(user.id, matches)?;
        if matches {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Returns the user's reusable auth token, minting one on first use.
    pub fn issue_token(&self, user_id: i64) -> Result<AuthTokenValue> {
        Ok(self.user_store.get_or_create_auth_token(user_id)?.value)
    }

    pub fn record_login(&self, user_id: i64) -> Result<()> {
        self.user_store.set_last_login(user_id)
    }

    /// Resolves a session token to its user and stamps the token as used.
    pub fn session_user(&self, value: &AuthTokenValue) -> Result<Option<User>> {
        let token = match self.user_store.get_auth_token(value)? {
            Some(token) => token,
            None => return Ok(None),
        };
        self.user_store.touch_auth_token(value)?;
        self.user_store.get_user(token.user_id)
    }

    pub fn get_tokens(&self, user_id: i64) -> Result<Vec<AuthToken>> {
        self.user_store.get_user_auth_tokens(user_id)
    }
}

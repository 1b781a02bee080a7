use super::auth::{AuthToken, AuthTokenValue, PasswordCredentials};
use super::user_models::{User, UserRole};
use anyhow::Result;

pub trait UserStore: Send + Sync {
    /// Creates a new user and returns the user id.
    /// Returns Err if the username is already taken or on a database error.
    fn create_user(&self, username: &str, role: UserRole) -> Result<i64>;

    /// Returns the user with the given id.
    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: i64) -> Result<Option<User>>;

    /// Returns the user with the given username.
    /// Returns Ok(None) if the user does not exist.
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Returns all usernames.
    fn get_all_usernames(&self) -> Result<Vec<String>>;

    /// Changes the role of an existing user.
    fn set_user_role(&self, user_id: i64, role: UserRole) -> Result<()>;

    /// Stamps the user's last login time.
    fn set_last_login(&self, user_id: i64) -> Result<()>;

    /// Returns the user's password credentials.
    /// Returns Ok(None) if the user has none.
    fn get_password_credentials(&self, user_id: i64) -> Result<Option<PasswordCredentials>>;

    /// Inserts or replaces the user's password credentials.
    fn upsert_password_credentials(&self, credentials: &PasswordCredentials) -> Result<()>;

    /// Deletes the user's password credentials.
    /// Returns false if the user had none.
    fn delete_password_credentials(&self, user_id: i64) -> Result<bool>;

    /// Stamps the credential timestamps after a verification attempt,
    /// last_tried always and last_used only when it succeeded.
    fn record_password_attempt(&self, user_id: i64, succeeded: bool) -> Result<()>;

    /// Returns the token with the given value.
    /// Returns Ok(None) if the token does not exist.
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Returns the user's reusable token, creating it on first use.
    fn get_or_create_auth_token(&self, user_id: i64) -> Result<AuthToken>;

    /// Returns all tokens held by a user.
    fn get_user_auth_tokens(&self, user_id: i64) -> Result<Vec<AuthToken>>;

    /// Stamps a token's last used time.
    fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()>;
}

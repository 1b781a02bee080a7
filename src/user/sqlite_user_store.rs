use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use tracing::info;

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, OnDeleteAction, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};

use super::auth::{AcervoHasher, AuthToken, AuthTokenValue, PasswordCredentials};
use super::user_models::{User, UserRole};
use super::user_store::UserStore;

const USER_FK: ForeignKey = ForeignKey {
    table: "users",
    column: "id",
    on_delete: OnDeleteAction::Cascade,
};

const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("username", SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("role", SqlType::Text, non_null = true),
        sqlite_column!("last_login", SqlType::Integer),
        sqlite_column!(
            "date_joined",
            SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("index_users_username", "username")],
    unique_constraints: &[],
};

const PASSWORD_CREDENTIALS_TABLE: Table = Table {
    name: "password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(USER_FK)
        ),
        sqlite_column!("salt", SqlType::Text, non_null = true),
        sqlite_column!("hash", SqlType::Text, non_null = true),
        sqlite_column!("hasher", SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_tried", SqlType::Integer),
        sqlite_column!("last_used", SqlType::Integer),
    ],
    indices: &[],
    unique_constraints: &[],
};

// One reusable token per user, enforced by the unique user_id column.
const AUTH_TOKENS_TABLE: Table = Table {
    name: "auth_tokens",
    columns: &[
        sqlite_column!(
            "user_id",
            SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(USER_FK)
        ),
        sqlite_column!("value", SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", SqlType::Integer),
    ],
    indices: &[("index_auth_tokens_value", "value")],
    unique_constraints: &[],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[USERS_TABLE, PASSWORD_CREDENTIALS_TABLE, AUTH_TOKENS_TABLE],
    migration: None,
}];

fn system_time_from_unix(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(value as u64)
}

fn unix_from_system_time(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = if db_path.exists() {
            Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_context(|| format!("Failed to open user database at {:?}", db_path))?
        } else {
            let conn = Connection::open(db_path)?;
            USER_VERSIONED_SCHEMAS[USER_VERSIONED_SCHEMAS.len() - 1].create(&conn)?;
            info!("Created user database at {:?}", db_path);
            conn
        };
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let user_version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .context("Failed to read user database version")?;
        let db_version = user_version - BASE_DB_VERSION as i64;
        if db_version < 0 {
            bail!("User database predates schema versioning, refusing to open it");
        }
        let version = db_version as usize;
        if version >= USER_VERSIONED_SCHEMAS.len() {
            bail!(
                "User database is at schema version {} but this build only knows versions up to {}",
                version,
                USER_VERSIONED_SCHEMAS.len() - 1
            );
        }
        USER_VERSIONED_SCHEMAS[version].validate(&conn)?;
        Self::migrate_if_needed(&conn, version)?;

        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Looks for an existing users.db, first in the container data directory
    /// and then walking up from the current directory.
    pub fn infer_path() -> Option<PathBuf> {
        let container_path = PathBuf::from("/data/db/users.db");
        if container_path.exists() {
            return Some(container_path);
        }

        let mut current_dir = std::env::current_dir().ok()?;
        loop {
            let candidate = current_dir.join("users.db");
            if candidate.is_file() {
                return Some(candidate);
            }
            if let Some(parent) = current_dir.parent() {
                current_dir = parent.to_path_buf();
            } else {
                break;
            }
        }

        None
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest = version;
        for schema in USER_VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration) = schema.migration {
                info!(
                    "Migrating user database from version {} to {}",
                    latest, schema.version
                );
                migration(conn)?;
                latest = schema.version;
            }
        }
        conn.pragma_update(None, "user_version", BASE_DB_VERSION + latest)?;
        Ok(())
    }

    fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let role_text: String = row.get(2)?;
        let role = UserRole::from_str(&role_text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
        })?;
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            role,
            last_login: row
                .get::<_, Option<i64>>(3)?
                .map(system_time_from_unix),
            date_joined: system_time_from_unix(row.get(4)?),
        })
    }

    fn parse_credentials_row(row: &rusqlite::Row) -> rusqlite::Result<PasswordCredentials> {
        let hasher_text: String = row.get(3)?;
        let hasher = AcervoHasher::from_str(&hasher_text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
        })?;
        Ok(PasswordCredentials {
            user_id: row.get(0)?,
            salt: row.get(1)?,
            hash: row.get(2)?,
            hasher,
            created: system_time_from_unix(row.get(4)?),
            last_tried: row
                .get::<_, Option<i64>>(5)?
                .map(system_time_from_unix),
            last_used: row
                .get::<_, Option<i64>>(6)?
                .map(system_time_from_unix),
        })
    }

    fn parse_token_row(row: &rusqlite::Row) -> rusqlite::Result<AuthToken> {
        Ok(AuthToken {
            user_id: row.get(0)?,
            value: AuthTokenValue(row.get(1)?),
            created: system_time_from_unix(row.get(2)?),
            last_used: row
                .get::<_, Option<i64>>(3)?
                .map(system_time_from_unix),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, username: &str, role: UserRole) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (username, role) VALUES (?1, ?2)",
            params![username, role.to_string()],
        )
        .with_context(|| format!("Failed to create user {}", username))?;
        Ok(conn.last_insert_rowid())
    }

    fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, username, role, last_login, date_joined FROM users WHERE id = ?1",
        )?;
        match stmt.query_row(params![user_id], Self::parse_user_row) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, username, role, last_login, date_joined FROM users WHERE username = ?1",
        )?;
        match stmt.query_row(params![username], Self::parse_user_row) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_all_usernames(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT username FROM users ORDER BY id")?;
        let usernames = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(usernames)
    }

    fn set_user_role(&self, user_id: i64, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            params![role.to_string(), user_id],
        )?;
        if updated == 0 {
            bail!("No user with id {}", user_id);
        }
        Ok(())
    }

    fn set_last_login(&self, user_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![unix_from_system_time(SystemTime::now()), user_id],
        )?;
        Ok(())
    }

    fn get_password_credentials(&self, user_id: i64) -> Result<Option<PasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, salt, hash, hasher, created, last_tried, last_used \
             FROM password_credentials WHERE user_id = ?1",
        )?;
        match stmt.query_row(params![user_id], Self::parse_credentials_row) {
            Ok(credentials) => Ok(Some(credentials)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn upsert_password_credentials(&self, credentials: &PasswordCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO password_credentials (user_id, salt, hash, hasher) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (user_id) DO UPDATE SET \
             salt = excluded.salt, hash = excluded.hash, hasher = excluded.hasher",
            params![
                credentials.user_id,
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string()
            ],
        )?;
        Ok(())
    }

    fn delete_password_credentials(&self, user_id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM password_credentials WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(deleted > 0)
    }

    fn record_password_attempt(&self, user_id: i64, succeeded: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = unix_from_system_time(SystemTime::now());
        if succeeded {
            conn.execute(
                "UPDATE password_credentials SET last_tried = ?1, last_used = ?1 WHERE user_id = ?2",
                params![now, user_id],
            )?;
        } else {
            conn.execute(
                "UPDATE password_credentials SET last_tried = ?1 WHERE user_id = ?2",
                params![now, user_id],
            )?;
        }
        Ok(())
    }

    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, value, created, last_used FROM auth_tokens WHERE value = ?1",
        )?;
        match stmt.query_row(params![value.0], Self::parse_token_row) {
            Ok(token) => Ok(Some(token)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_or_create_auth_token(&self, user_id: i64) -> Result<AuthToken> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, value, created, last_used FROM auth_tokens WHERE user_id = ?1",
        )?;
        match stmt.query_row(params![user_id], Self::parse_token_row) {
            Ok(token) => return Ok(token),
            Err(rusqlite::Error::QueryReturnedNoRows) => {}
            Err(e) => return Err(e.into()),
        }

        let value = AuthTokenValue::generate();
        conn.execute(
            "INSERT INTO auth_tokens (user_id, value) VALUES (?1, ?2)",
            params![user_id, value.0],
        )?;
        let token = stmt
            .query_row(params![user_id], Self::parse_token_row)
            .context("Token row vanished after insert")?;
        Ok(token)
    }

    fn get_user_auth_tokens(&self, user_id: i64) -> Result<Vec<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, value, created, last_used FROM auth_tokens \
             WHERE user_id = ?1 ORDER BY created",
        )?;
        let tokens = stmt
            .query_map(params![user_id], Self::parse_token_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tokens)
    }

    fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_tokens SET last_used = ?1 WHERE value = ?2",
            params![unix_from_system_time(SystemTime::now()), value.0],
        )?;
        Ok(())
    }
}

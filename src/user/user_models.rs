//! User data models

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use anyhow::{bail, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Regular,
    Admin,
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "regular" => Ok(UserRole::Regular),
            "admin" => Ok(UserRole::Admin),
            _ => bail!("Unknown role {}, valid roles: regular, admin", s),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Regular => write!(f, "regular"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub last_login: Option<SystemTime>,
    pub date_joined: SystemTime,
}

impl User {
    pub fn is_superuser(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            is_superuser: self.is_superuser(),
            last_login: self.last_login.map(iso_utc),
            date_joined: iso_utc(self.date_joined),
        }
    }
}

/// Shape a user takes on the wire, timestamps as ISO 8601 UTC strings.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub is_superuser: bool,
    pub last_login: Option<String>,
    pub date_joined: String,
}

fn iso_utc(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn profile_formats_timestamps_as_iso_utc() {
        let user = User {
            id: 7,
            username: "irene".to_string(),
            role: UserRole::Admin,
            last_login: None,
            date_joined: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        };
        let profile = user.profile();
        assert!(profile.is_superuser);
        assert_eq!(profile.last_login, None);
        assert_eq!(profile.date_joined, "2023-11-14T22:13:20Z");
    }

    #[test]
    fn role_tags_round_trip() {
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::Regular.to_string(), "regular");
        assert!(UserRole::from_str("root").is_err());
    }
}

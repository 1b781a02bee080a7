//! Password hashing and bearer tokens.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use anyhow::{bail, Result};
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct AuthTokenValue(pub String);

impl AuthTokenValue {
    pub fn generate() -> AuthTokenValue {
        let rng = rand::rng();
        let random_string: String = rng
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        AuthTokenValue(random_string)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AuthToken {
    pub user_id: i64,
    pub value: AuthTokenValue,
    pub created: SystemTime,
    pub last_used: Option<SystemTime>,
}

mod acervo_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash<T: AsRef<str>>(plain: &[u8], b64_salt: T) -> Result<String> {
        let argon2 = Argon2::default();
        let salt = SaltString::from_b64(b64_salt.as_ref()).map_err(|err| anyhow!("{}", err))?;
        let hash_string = argon2
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify(plain_pw: &[u8], target_hash: &str) -> Result<bool> {
        let argon2 = Argon2::default();
        let password_hash = PasswordHash::new(target_hash).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2.verify_password(plain_pw, &password_hash).is_ok())
    }
}

/// Tag persisted next to every hash so the scheme can change without
/// invalidating stored credentials.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum AcervoHasher {
    Argon2,
}

impl FromStr for AcervoHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(AcervoHasher::Argon2),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl fmt::Display for AcervoHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcervoHasher::Argon2 => write!(f, "argon2"),
        }
    }
}

impl AcervoHasher {
    pub fn generate_b64_salt(&self) -> String {
        match self {
            AcervoHasher::Argon2 => acervo_argon2::generate_b64_salt(),
        }
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        match self {
            AcervoHasher::Argon2 => acervo_argon2::hash(plain, b64_salt),
        }
    }

    pub fn verify<T: AsRef<str>>(&self, plain_pw: T, target_hash: T) -> Result<bool> {
        match self {
            AcervoHasher::Argon2 => {
                acervo_argon2::verify(plain_pw.as_ref().as_bytes(), target_hash.as_ref())
            }
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PasswordCredentials {
    pub user_id: i64,
    pub salt: String,
    pub hash: String,
    pub hasher: AcervoHasher,

    pub created: SystemTime,
    pub last_tried: Option<SystemTime>,
    pub last_used: Option<SystemTime>,
}

impl PasswordCredentials {
    /// Hashes a fresh password with a new salt.
    pub fn from_plain_password(user_id: i64, password: &str) -> Result<Self> {
        let hasher = AcervoHasher::Argon2;
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(PasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_tried: None,
            last_used: None,
        })
    }

    pub fn matches(&self, password: &str) -> Result<bool> {
        self.hasher.verify(password, self.hash.as_str())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn argon2_hash_is_deterministic_per_salt() {
        let pw = "123mypw";
        let b64_salt = AcervoHasher::Argon2.generate_b64_salt();

        let hash1 = AcervoHasher::Argon2.hash(pw.as_bytes(), &b64_salt).unwrap();
        let hash2 = AcervoHasher::Argon2.hash(b"123mypw", &b64_salt).unwrap();
        assert_eq!(hash1, hash2);

        assert!(AcervoHasher::Argon2.verify("123mypw", &hash1).unwrap());
        assert!(!AcervoHasher::Argon2.verify("not the pw", &hash1).unwrap());
    }

    #[test]
    fn credentials_verify_their_own_password() {
        let credentials = PasswordCredentials::from_plain_password(1, "segredo").unwrap();
        assert!(credentials.matches("segredo").unwrap());
        assert!(!credentials.matches("errado").unwrap());
    }

    #[test]
    fn generated_tokens_are_long_and_alphanumeric() {
        let token = AuthTokenValue::generate();
        assert_eq!(token.0.len(), 64);
        assert!(token.0.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token.0, AuthTokenValue::generate().0);
    }

    #[test]
    fn hasher_tag_round_trips() {
        let tag = AcervoHasher::Argon2.to_string();
        assert_eq!(tag, "argon2");
        assert_eq!(AcervoHasher::from_str(&tag).unwrap(), AcervoHasher::Argon2);
        assert!(AcervoHasher::from_str("md5").is_err());
    }
}

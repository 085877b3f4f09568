//! Login exchange
//!
//! The Frostbite hashed login is a two-step exchange over ordinary requests:
//!
//! 1. `login.hashed` → `OK <challenge-hex>`
//! 2. `login.hashed <MD5(challenge-bytes ‖ password) as upper hex>` → `OK`
//!
//! Any other answer aborts the connection.

use std::fmt;

use async_trait::async_trait;
use md5::{Digest, Md5};

use fc_core::AuthError;

use crate::session::Session;

/// Command word used by both steps of the hashed login
pub const LOGIN_COMMAND: &str = "login.hashed";

/// Login sequence run by [`Session::connect`] once the socket is up
#[async_trait]
pub trait LoginHook: Send + Sync {
    /// Run the exchange; an error tears the connection down
    async fn login(&self, session: &Session) -> Result<(), AuthError>;
}

/// Challenge/response login with an MD5 password digest
#[derive(Clone)]
pub struct HashedLogin {
    password: String,
}

impl HashedLogin {
    /// Create a hook for `password`
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl fmt::Debug for HashedLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedLogin")
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl LoginHook for HashedLogin {
    async fn login(&self, session: &Session) -> Result<(), AuthError> {
        tracing::debug!("Requesting login challenge");
        let challenge = session
            .request([LOGIN_COMMAND])
            .await
            .map_err(AuthError::Challenge)?;

        let salt = challenge.first().ok_or(AuthError::MissingChallenge)?;
        let digest = login_digest(salt, &self.password)?;

        tracing::debug!("Sending password digest");
        session
            .request([LOGIN_COMMAND, digest.as_str()])
            .await
            .map_err(AuthError::Rejected)?;

        tracing::info!("Logged in");
        Ok(())
    }
}

/// Compute the upper-case hex digest sent in the second login step
pub fn login_digest(challenge: &str, password: &str) -> Result<String, AuthError> {
    let salt =
        hex::decode(challenge).map_err(|_| AuthError::MalformedChallenge(challenge.to_string()))?;

    let mut hasher = Md5::new();
    hasher.update(&salt);
    hasher.update(password.as_bytes());
    Ok(hex::encode_upper(hasher.finalize()))
}

//! Bearer token to identity.

use std::collections::BTreeMap;

use relay_config::ClerkConfig;
use relay_core::identity::AuthIdentity;

use crate::error::AuthError;
use crate::jwks::ClerkVerifier;

/// Resolves a bearer token to the calling user.
#[derive(Debug, Clone)]
pub enum Authenticator {
    /// Clerk session JWTs, validated via JWKS.
    Clerk(ClerkVerifier),
    /// Fixed token to identity map for local development and tests.
    Static(BTreeMap<String, AuthIdentity>),
}

impl Authenticator {
    /// Clerk when a secret key is configured, otherwise the configured
    /// development tokens.
    #[must_use]
    pub fn from_config(config: &ClerkConfig) -> Self {
        if config.is_configured() {
            return Self::Clerk(ClerkVerifier::new(&config.secret_key));
        }
        if config.dev_tokens.is_empty() {
            tracing::warn!("clerk is not configured and no dev tokens are set; every request will be rejected");
        } else {
            tracing::warn!(
                tokens = config.dev_tokens.len(),
                "clerk is not configured; accepting static development tokens"
            );
        }
        Self::Static(
            config
                .dev_tokens
                .iter()
                .map(|(token, user)| (token.clone(), AuthIdentity::personal(user.clone())))
                .collect(),
        )
    }

    /// Static authenticator from `(token, identity)` pairs.
    pub fn with_tokens(tokens: impl IntoIterator<Item = (String, AuthIdentity)>) -> Self {
        Self::Static(tokens.into_iter().collect())
    }

    /// Validate `token` and return who it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingToken` for an empty token,
    /// `AuthError::InvalidToken` or `AuthError::TokenExpired` otherwise.
    pub async fn authenticate(&self, token: &str) -> Result<AuthIdentity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        match self {
            Self::Clerk(verifier) => Ok(verifier.verify(token).await?.to_identity()),
            Self::Static(tokens) => tokens
                .get(token)
                .cloned()
                .ok_or_else(|| AuthError::InvalidToken("unknown token".into())),
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// # Errors
///
/// Returns `AuthError::MissingToken` if the header is absent, not a bearer
/// credential, or empty.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::MissingToken)?.trim();
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MissingToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingToken);
    }
    let token = token.trim();
    if token.is_empty() {
        Err(AuthError::MissingToken)
    } else {
        Ok(token)
    }
}

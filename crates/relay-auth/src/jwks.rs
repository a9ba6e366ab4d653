use std::sync::Arc;

use clerk_rs::ClerkConfiguration;
use clerk_rs::clerk::Clerk;
use clerk_rs::validators::authorizer::{ClerkError, validate_jwt};
use clerk_rs::validators::jwks::MemoryCacheJwksProvider;

use crate::claims::RelayClaims;
use crate::error::AuthError;

/// Validates Clerk session JWTs against the instance JWKS.
///
/// The provider fetches the public keys with the secret key on first use and
/// caches them in memory; clones share the cache.
#[derive(Clone)]
pub struct ClerkVerifier {
    provider: Arc<MemoryCacheJwksProvider>,
}

impl std::fmt::Debug for ClerkVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkVerifier").finish_non_exhaustive()
    }
}

/// Provider failures are Clerk's fault, not the caller's.
fn rejection(err: ClerkError) -> AuthError {
    match err {
        ClerkError::InternalServerError(msg) => {
            tracing::warn!(error = %msg, "clerk jwks unavailable");
            AuthError::ClerkApiError(msg)
        }
        other => {
            let msg = other.to_string();
            if msg.contains("Expired") {
                AuthError::TokenExpired
            } else {
                tracing::debug!(error = %msg, "clerk jwt rejected");
                AuthError::InvalidToken(msg)
            }
        }
    }
}

impl ClerkVerifier {
    #[must_use]
    pub fn new(secret_key: &str) -> Self {
        let config = ClerkConfiguration::new(None, None, Some(secret_key.to_string()), None);
        let clerk = Clerk::new(config);
        Self {
            provider: Arc::new(MemoryCacheJwksProvider::new(clerk)),
        }
    }

    /// Validate `jwt` and extract its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` for an expired session,
    /// `AuthError::ClerkApiError` when the JWKS cannot be fetched and
    /// `AuthError::InvalidToken` for anything else that fails validation.
    pub async fn verify(&self, jwt: &str) -> Result<RelayClaims, AuthError> {
        let clerk_jwt = validate_jwt(jwt, Arc::clone(&self.provider))
            .await
            .map_err(rejection)?;

        let expires_at = chrono::DateTime::from_timestamp(i64::from(clerk_jwt.exp), 0)
            .ok_or_else(|| AuthError::InvalidToken("invalid exp timestamp".into()))?;
        let org = clerk_jwt.org.as_ref();

        Ok(RelayClaims {
            raw_jwt: jwt.to_string(),
            user_id: clerk_jwt.sub.clone(),
            org_id: org.map(|o| o.id.clone()),
            org_slug: org.map(|o| o.slug.clone()),
            org_role: org.map(|o| o.role.clone()),
            expires_at,
        })
    }
}

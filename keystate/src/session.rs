//! Session/token service
//!
//! Schema 2 stored the account identity as loose keys, and some installs lost them while
//! keeping the access token. The `2 → 3` step asks a [`TokenService`] to recover identity
//! fields from the token in that case.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use thiserror::Error;

use crate::keystate_error::AnyhowErrorExt;

/// Errors returned by a [`TokenService`]
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Error, uniffi::Error)]
pub enum TokenServiceError {
    /// The access token could not be decoded
    #[error("malformed access token: {0}")]
    MalformedToken(String),
    /// Unexpected error in foreign callback
    #[error("unexpected error in foreign callback: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for TokenServiceError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(e.reason)
    }
}

/// Identity fields carried by an access token. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct TokenIdentity {
    /// Account identifier (`sub`)
    pub user_id: Option<String>,
    /// Account email
    pub email: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Whether the email was verified
    pub email_verified: Option<bool>,
    /// Whether the account has premium features
    pub premium: Option<bool>,
}

/// Decodes identity fields from an access token.
///
/// Hosts either implement this on top of their own session layer or use the built-in
/// [`jwt_token_service`].
#[uniffi::export(with_foreign)]
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Extracts the identity carried by `access_token`.
    ///
    /// # Errors
    /// - `TokenServiceError::MalformedToken` if the token cannot be decoded
    async fn decode_identity(
        &self,
        access_token: String,
    ) -> Result<TokenIdentity, TokenServiceError>;
}

/// Claims read from the token payload
#[derive(Debug, Deserialize)]
struct IdentityClaims {
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    email_verified: Option<bool>,
    premium: Option<bool>,
}

impl From<IdentityClaims> for TokenIdentity {
    fn from(claims: IdentityClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            name: claims.name,
            email_verified: claims.email_verified,
            premium: claims.premium,
        }
    }
}

/// [`TokenService`] that reads identity claims from a JWT access token.
///
/// The signature is **not** verified: the token comes from the device's own storage and
/// is only used to recover the identity it was issued for. Expiry is ignored for the same
/// reason.
#[derive(Debug, Default)]
pub struct JwtTokenService;

impl JwtTokenService {
    /// Creates the decoder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn decode_claims(access_token: &str) -> anyhow::Result<IdentityClaims> {
        let mut parts = access_token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            anyhow::bail!("expected three dot-separated segments");
        };

        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .context("payload is not base64url")?;

        serde_json::from_slice(&payload).context("payload is not a JSON claims object")
    }
}

#[async_trait]
impl TokenService for JwtTokenService {
    async fn decode_identity(
        &self,
        access_token: String,
    ) -> Result<TokenIdentity, TokenServiceError> {
        Self::decode_claims(&access_token)
            .map(TokenIdentity::from)
            .map_err(|e| TokenServiceError::MalformedToken(e.to_generic_message()))
    }
}

/// Returns the built-in JWT [`TokenService`].
///
/// ## Swift
///
/// ```swift
/// let controller = MigrationController(
///     documents: documentStore,
///     preferences: preferenceStore,
///     secure: secureStore,
///     tokenService: jwtTokenService()
/// )
/// ```
#[uniffi::export]
#[must_use]
pub fn jwt_token_service() -> Arc<dyn TokenService> {
    Arc::new(JwtTokenService::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_segment(json: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    fn token_with_payload(json: &str) -> String {
        format!(
            "{}.{}.signature",
            encode_segment(r#"{"alg":"RS256","typ":"JWT"}"#),
            encode_segment(json)
        )
    }

    #[tokio::test]
    async fn test_decodes_identity_claims() {
        let token = token_with_payload(
            r#"{"sub":"4b1d","email":"ada@example.com","name":"Ada","email_verified":true,"premium":false,"exp":1}"#,
        );

        let identity = JwtTokenService::new().decode_identity(token).await.unwrap();

        assert_eq!(
            identity,
            TokenIdentity {
                user_id: Some("4b1d".to_string()),
                email: Some("ada@example.com".to_string()),
                name: Some("Ada".to_string()),
                email_verified: Some(true),
                premium: Some(false),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_claims_are_none() {
        let token = token_with_payload(r#"{"sub":"4b1d"}"#);

        let identity = jwt_token_service().decode_identity(token).await.unwrap();

        assert_eq!(identity.user_id.as_deref(), Some("4b1d"));
        assert_eq!(identity.email, None);
        assert_eq!(identity.premium, None);
    }

    #[tokio::test]
    async fn test_rejects_token_without_three_segments() {
        let result = JwtTokenService::new()
            .decode_identity("not-a-jwt".to_string())
            .await;

        match result {
            Err(TokenServiceError::MalformedToken(message)) => {
                assert!(message.contains("three dot-separated segments"));
            }
            other => panic!("expected MalformedToken, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejects_payload_that_is_not_json() {
        let token = format!("header.{}.signature", encode_segment("plain text"));

        let result = JwtTokenService::new().decode_identity(token).await;

        match result {
            Err(TokenServiceError::MalformedToken(message)) => {
                assert!(message.contains("payload is not a JSON claims object"));
            }
            other => panic!("expected MalformedToken, got {other:?}"),
        }
    }
}

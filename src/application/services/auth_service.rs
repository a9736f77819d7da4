//! Credential Verification
//!
//! The hub never issues or hashes credentials itself. It only verifies
//! bearer tokens minted by the auth service and extracts the ids they carry.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::shared::error::AppError;

/// Token type accepted at the handshake
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// Identities carried by a verified token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: i64,
    pub credential_id: i64,
}

/// Verifies a bearer token and yields the identities it carries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialGateway: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AppError>;
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub auth_id: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: String,
}

/// HS256 JWT verifier
pub struct JwtCredentialGateway {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
    access_token_expiry_minutes: i64,
}

impl JwtCredentialGateway {
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            access_token_expiry_minutes: settings.access_token_expiry_minutes,
        }
    }

    /// Mint an access token with the same shape the auth service issues.
    ///
    /// Only used by tests and local tooling.
    pub fn issue_access_token(&self, user_id: i64, credential_id: i64) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            auth_id: credential_id,
            exp: (now + Duration::minutes(self.access_token_expiry_minutes)).timestamp(),
            iat: now.timestamp(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    fn decode_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::AuthenticationFailed("token expired".into())
                }
                _ => AppError::AuthenticationFailed("invalid token".into()),
            },
        )?;

        if token_data.claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(AppError::AuthenticationFailed(format!(
                "unexpected token type {}",
                token_data.claims.token_type
            )));
        }
        Ok(token_data.claims)
    }
}

#[async_trait]
impl CredentialGateway for JwtCredentialGateway {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AppError> {
        let claims = self.decode_access_token(token)?;
        Ok(VerifiedToken {
            user_id: claims.user_id,
            credential_id: claims.auth_id,
        })
    }
}

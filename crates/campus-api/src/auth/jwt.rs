// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! JWT token management.
//!
//! Tokens are signed with an asymmetric key pair: the private key signs, the
//! public key verifies. HMAC algorithms are refused so that verification never
//! needs the signing secret.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::claims::TokenKind;
use super::principal::PrincipalProfile;
use super::Claims;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// JwtConfig
// =============================================================================

/// JWT configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Algorithm to use for signing.
    #[serde(with = "algorithm_serde")]
    pub algorithm: Algorithm,
    /// Token issuer.
    pub issuer: String,
    /// PEM encoded private key used for signing.
    #[serde(skip_serializing)]
    pub private_key_pem: String,
    /// PEM encoded public key used for verification.
    pub public_key_pem: String,
    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_ttl: Duration,
    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_ttl: Duration,
    /// Clock skew tolerance in seconds.
    pub leeway_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::EdDSA,
            issuer: "campus".to_string(),
            private_key_pem: String::new(), // Must be set by user
            public_key_pem: String::new(),
            access_ttl: Duration::from_secs(3600),
            refresh_ttl: Duration::from_secs(86400 * 7),
            leeway_secs: 0,
        }
    }
}

impl JwtConfig {
    /// Creates a new configuration with the given PEM key pair.
    pub fn new(private_key_pem: impl Into<String>, public_key_pem: impl Into<String>) -> Self {
        Self {
            private_key_pem: private_key_pem.into(),
            public_key_pem: public_key_pem.into(),
            ..Default::default()
        }
    }

    /// Sets the signing algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the access token lifetime.
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Sets the refresh token lifetime.
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Returns the lifetime for a token kind in seconds.
    pub fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl.as_secs() as i64,
            TokenKind::Refresh => self.refresh_ttl.as_secs() as i64,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ApiResult<()> {
        KeyFamily::of(self.algorithm)?;
        if self.private_key_pem.trim().is_empty() {
            return Err(ApiError::internal("JWT private key is not configured"));
        }
        if self.public_key_pem.trim().is_empty() {
            return Err(ApiError::internal("JWT public key is not configured"));
        }
        if self.access_ttl >= self.refresh_ttl {
            tracing::warn!("Access token lifetime is not shorter than refresh token lifetime");
        }
        Ok(())
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("private_key_pem", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

// =============================================================================
// Key families
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFamily {
    Ed,
    Rsa,
    Ec,
}

impl KeyFamily {
    fn of(algorithm: Algorithm) -> ApiResult<Self> {
        match algorithm {
            Algorithm::EdDSA => Ok(KeyFamily::Ed),
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => Ok(KeyFamily::Rsa),
            Algorithm::ES256 | Algorithm::ES384 => Ok(KeyFamily::Ec),
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Err(ApiError::internal(
                "Symmetric JWT algorithms are not supported; use an asymmetric key pair",
            )),
        }
    }

    fn keys(self, private_pem: &[u8], public_pem: &[u8]) -> ApiResult<(EncodingKey, DecodingKey)> {
        let encoding = match self {
            KeyFamily::Ed => EncodingKey::from_ed_pem(private_pem),
            KeyFamily::Rsa => EncodingKey::from_rsa_pem(private_pem),
            KeyFamily::Ec => EncodingKey::from_ec_pem(private_pem),
        }
        .map_err(|e| ApiError::internal(format!("Invalid JWT private key: {}", e)))?;

        let decoding = match self {
            KeyFamily::Ed => DecodingKey::from_ed_pem(public_pem),
            KeyFamily::Rsa => DecodingKey::from_rsa_pem(public_pem),
            KeyFamily::Ec => DecodingKey::from_ec_pem(public_pem),
        }
        .map_err(|e| ApiError::internal(format!("Invalid JWT public key: {}", e)))?;

        Ok((encoding, decoding))
    }
}

// =============================================================================
// IssuedToken
// =============================================================================

/// A freshly signed token and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Encoded JWT.
    pub token: String,
    /// Expiration time (Unix timestamp).
    pub expires_at: i64,
}

// =============================================================================
// JwtManager
// =============================================================================

/// Manager for JWT token operations.
///
/// Issues access and refresh tokens and verifies presented ones.
#[derive(Clone)]
pub struct JwtManager {
    config: Arc<JwtConfig>,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl JwtManager {
    /// Creates a new JWT manager with the given configuration.
    pub fn new(config: JwtConfig) -> ApiResult<Self> {
        config.validate()?;

        let (encoding_key, decoding_key) = KeyFamily::of(config.algorithm)?.keys(
            config.private_key_pem.as_bytes(),
            config.public_key_pem.as_bytes(),
        )?;

        let mut validation = Validation::new(config.algorithm);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.leeway = config.leeway_secs;
        validation.validate_aud = false;

        Ok(Self {
            config: Arc::new(config),
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            validation: Arc::new(validation),
        })
    }

    /// Signs the claims exactly as given.
    pub fn sign(&self, claims: &Claims) -> ApiResult<String> {
        let header = Header::new(self.config.algorithm);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| ApiError::internal(format!("Failed to create token: {}", e)))
    }

    /// Issues a token of the given kind, stamping issuer, issue time and expiry.
    pub fn issue(&self, mut claims: Claims, kind: TokenKind) -> ApiResult<IssuedToken> {
        let now = chrono::Utc::now().timestamp();
        claims.iat = now;
        claims.exp = now + self.config.ttl_secs(kind);
        claims.refresh = kind == TokenKind::Refresh;
        claims.iss = Some(self.config.issuer.clone());

        let token = self.sign(&claims)?;
        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Issues an access token for a principal profile.
    pub fn issue_access(&self, profile: &PrincipalProfile) -> ApiResult<IssuedToken> {
        let claims = Claims::for_profile(profile, self.config.ttl_secs(TokenKind::Access));
        self.issue(claims, TokenKind::Access)
    }

    /// Issues a refresh token for a subject.
    pub fn issue_refresh(&self, subject: &str) -> ApiResult<IssuedToken> {
        let claims = Claims::refresh(subject, self.config.ttl_secs(TokenKind::Refresh));
        self.issue(claims, TokenKind::Refresh)
    }

    /// Verifies signature, issuer and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::unauthorized("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::unauthorized("Invalid token format")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ApiError::unauthorized("Invalid token signature")
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    ApiError::unauthorized("Invalid token issuer")
                }
                _ => ApiError::unauthorized(format!("Token validation failed: {}", e)),
            })
    }

    /// Verifies a token presented as a request credential.
    pub fn verify_access(&self, token: &str) -> ApiResult<Claims> {
        let claims = self.verify(token)?;
        if claims.refresh {
            return Err(ApiError::unauthorized(
                "Refresh token presented as access credential",
            ));
        }
        Ok(claims)
    }

    /// Verifies a token presented where a refresh token is expected.
    ///
    /// An otherwise valid access token is a client mistake, not an
    /// authentication failure, and yields `BadRequest`.
    pub fn verify_refresh(&self, token: &str) -> ApiResult<Claims> {
        let claims = self.verify(token)?;
        if !claims.refresh {
            return Err(ApiError::bad_request("Not a refresh token"));
        }
        Ok(claims)
    }

    /// Returns the access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.config.ttl_secs(TokenKind::Access)
    }

    /// Returns the refresh token lifetime in seconds.
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.config.ttl_secs(TokenKind::Refresh)
    }

    /// Returns the configured issuer.
    pub fn issuer(&self) -> &str {
        &self.config.issuer
    }
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("issuer", &self.config.issuer)
            .field("algorithm", &self.config.algorithm)
            .field("access_ttl", &self.config.access_ttl)
            .finish()
    }
}

// =============================================================================
// Algorithm Serialization
// =============================================================================

/// Parses an algorithm name such as `EdDSA` or `RS256`.
pub fn parse_algorithm(s: &str) -> Option<Algorithm> {
    match s {
        "HS256" => Some(Algorithm::HS256),
        "HS384" => Some(Algorithm::HS384),
        "HS512" => Some(Algorithm::HS512),
        "RS256" => Some(Algorithm::RS256),
        "RS384" => Some(Algorithm::RS384),
        "RS512" => Some(Algorithm::RS512),
        "ES256" => Some(Algorithm::ES256),
        "ES384" => Some(Algorithm::ES384),
        "PS256" => Some(Algorithm::PS256),
        "PS384" => Some(Algorithm::PS384),
        "PS512" => Some(Algorithm::PS512),
        "EdDSA" => Some(Algorithm::EdDSA),
        _ => None,
    }
}

mod algorithm_serde {
    use jsonwebtoken::Algorithm;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(algorithm: &Algorithm, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:?}", algorithm))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Algorithm, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_algorithm(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("Unknown algorithm: {}", s)))
    }
}

// =============================================================================
// Tests
// =============================================================================

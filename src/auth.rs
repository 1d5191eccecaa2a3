use std::sync::LazyLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::Modify;

use crate::error::ApiError;
use crate::model::Admin;
use crate::policy::Principal;
use crate::store;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminClaims {
    pub sub: String,
    pub admin_id: i32,
    pub role: String,
    pub exp: i64,
}

pub struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, admin: &Admin, ttl_hours: u64) -> Result<String, ApiError> {
        let exp = i64::try_from(ttl_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or(ApiError::TokenCreation)?
            .timestamp();
        let claims = AdminClaims {
            sub: admin.email.clone(),
            admin_id: admin.id,
            role: admin.role.clone(),
            exp,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| ApiError::TokenCreation)
    }

    pub fn decode(&self, token: &str) -> Result<AdminClaims, ApiError> {
        decode::<AdminClaims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("decode: {}", e);
                ApiError::Unauthorized
            })
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ApiError::PasswordHash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Verified against when no admin has the given email.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("no-such-admin").unwrap_or_default());

/// Returns the admin if `password` matches. A hash is checked even when the
/// email lookup found nobody.
pub fn authenticate(admin: Option<Admin>, password: &str) -> Option<Admin> {
    let hash = admin
        .as_ref()
        .map_or(DUMMY_HASH.as_str(), |admin| admin.password_hash.as_str());
    let verified = verify_password(password, hash);
    admin.filter(|_| verified)
}

/// Resolves the bearer token to the stored admin on every request, so the
/// principal always reflects the current role, scope and department.
#[async_trait]
impl FromRequestParts<crate::State> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &crate::State,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::Unauthorized)?;
        let claims = state.keys.decode(bearer.token())?;

        let mut conn = state.pool.get().await.map_err(|_| ApiError::DBConnection)?;
        let admin = store::find_admin(&mut conn, claims.admin_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Principal::try_from(&admin).map_err(|e| {
            tracing::debug!("principal for admin {}: {}", admin.id, e);
            ApiError::Unauthorized
        })
    }
}

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_jwt",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

//! Bearer-token identity guard.
//!
//! Protected routes are wrapped with [`require_user`], which rejects the
//! request with `401` before any body or path extraction happens unless the
//! `Authorization` header carries a valid, unexpired token for a user that
//! still exists. Handlers then take the resolved [`AuthUser`] as an argument.

use std::future::ready;

use actix_web::{
    body::MessageBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::header,
    middleware::Next,
    web::Data,
    FromRequest, HttpMessage, HttpRequest,
};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{db, errors::AppError, structs::User, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys for HS256 tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 5;
        validation
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            log::error!("Failed to sign token: {}", e);
            AppError::TokenError(e.to_string())
        })
    }

    /// Returns the user id carried by a valid token.
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Self::validation()).map_err(|e| {
            log::debug!("Rejected token: {}", e);
            AppError::Unauthorized("Invalid or expired token".to_owned())
        })?;
        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_owned()))
    }
}

/// Raw credential from `Authorization: Bearer <token>`.
#[derive(Debug)]
pub struct BearerToken(pub String);

impl BearerToken {
    fn from_headers(req: &HttpRequest) -> Result<Self, AppError> {
        let value = req
            .headers()
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("No token provided".to_owned()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_owned()))?;

        match value.split_once(' ') {
            Some((scheme, token))
                if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
            {
                Ok(BearerToken(token.trim().to_owned()))
            }
            _ => Err(AppError::Unauthorized(
                "Invalid authorization header".to_owned(),
            )),
        }
    }
}

/// The persisted user behind the request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    async fn load(
        token: Result<BearerToken, AppError>,
        state: Option<Data<AppState>>,
    ) -> Result<Self, AppError> {
        let BearerToken(token) = token?;
        let state = state.ok_or_else(|| {
            log::error!("AppState is not registered on the application");
            AppError::InternalServerError
        })?;
        let user_id = state.tokens.verify(&token)?;
        match db::get_user_by_id(&state, user_id).await? {
            Some(user) => Ok(AuthUser(user)),
            None => {
                log::warn!("Token presented for unknown user {}", user_id);
                Err(AppError::Unauthorized("User no longer exists".to_owned()))
            }
        }
    }
}

/// Resolves the caller before the wrapped handler extracts anything else, so
/// an unauthenticated request is a `401` whatever its body looks like.
pub async fn require_user(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let user = AuthUser::load(
        BearerToken::from_headers(req.request()),
        req.app_data::<Data<AppState>>().cloned(),
    )
    .await?;
    req.extensions_mut().insert(user);
    next.call(req).await
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthUser>().cloned() {
            return Box::pin(ready(Ok(user)));
        }
        // Not behind `require_user`: resolve the token here instead.
        Box::pin(Self::load(
            BearerToken::from_headers(req),
            req.app_data::<Data<AppState>>().cloned(),
        ))
    }
}

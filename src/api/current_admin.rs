//! Current admin service
//!
//! Get the current admin from the request based on the Authorization header

use std::marker::PhantomData;
use std::ops::Deref;

use axum::Extension;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use serde::Serialize;

use crate::admins::Admin;
use crate::api::Error;
use crate::api::StoreTimeout;
use crate::storage::Storage;
use crate::storage::bounded;

/// The keys used for encoding/decoding JWT tokens
#[derive(Clone)]
pub struct JwtKeys {
    /// The encoding key
    encoding: EncodingKey,

    /// The decoding key
    decoding: DecodingKey,

    /// Lifetime of issued tokens in seconds
    expires_in: i64,
}

impl JwtKeys {
    /// Create new encoding/decoding keys, derived from a secret
    pub fn new(secret: &[u8], expires_in: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            expires_in,
        }
    }
}

/// The JWT claims to identify an admin
#[derive(Debug, Deserialize, Serialize)]
struct Claims {
    /// The username
    sub: String,

    /// Moment the token expires, as a UNIX timestamp
    exp: i64,

    /// Moment the token was issued, as a UNIX timestamp
    iat: i64,
}

/// Token information served to the admin
///
/// Field names follow the OAuth 2.0 token response
#[derive(Debug, Serialize)]
#[allow(clippy::struct_field_names)]
pub struct Token {
    /// The access token to provide to follow up requests in the Authorization header
    access_token: String,

    /// Always `Bearer`
    token_type: &'static str,

    /// In how many seconds does the token expire
    expires_in: i64,
}

/// Generate a token for the outside world for a given admin
pub fn generate_token(jwt_keys: &JwtKeys, admin: &Admin) -> Result<Token, Error> {
    use jsonwebtoken::Header;
    use jsonwebtoken::encode;

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: admin.username.clone(),
        exp: now
            .checked_add(jwt_keys.expires_in)
            .ok_or_else(|| Error::internal_server_error("Token lifetime out of range"))?,
        iat: now,
    };

    let access_token = encode(&Header::default(), &claims, &jwt_keys.encoding)
        .map_err(Error::internal_server_error)?;

    Ok(Token {
        access_token,
        token_type: "Bearer",
        expires_in: jwt_keys.expires_in,
    })
}

/// Current admin service
///
/// Holding a valid token is not enough: the admin has to still exist at the time of the request
pub struct CurrentAdmin<S: Storage> {
    /// The actual admin
    admin: Admin,

    _storage: PhantomData<S>,
}

impl<S: Storage> Deref for CurrentAdmin<S> {
    type Target = Admin;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl<B, S> FromRequestParts<B> for CurrentAdmin<S>
where
    B: Send + Sync,
    S: Storage,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &B) -> Result<Self, Self::Rejection> {
        use jsonwebtoken::Validation;
        use jsonwebtoken::decode;

        // Extract the token from the authorization header
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| Error::unauthorized("Missing API token"))?;

        let Extension(jwt_keys) = parts
            .extract::<Extension<JwtKeys>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get JWT keys"))?;

        let Extension(storage) = parts
            .extract::<Extension<S>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get storage"))?;

        let Extension(store_timeout) = parts
            .extract::<Extension<StoreTimeout>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get store timeout"))?;

        let token_data =
            decode::<Claims>(bearer.token(), &jwt_keys.decoding, &Validation::default())
                .map_err(|err| {
                    tracing::debug!("Rejected API token: {err}");

                    Error::unauthorized("Unauthorized")
                })?;

        let username = token_data.claims.sub;

        let admin = bounded(store_timeout.0, storage.find_admin_by_username(&username))
            .await
            .map_err(Error::internal_server_error)?;

        if let Some(admin) = admin {
            Ok(Self {
                admin,
                _storage: PhantomData,
            })
        } else {
            tracing::info!("Token of unknown admin `{username}` used");

            Err(Error::unauthorized("Unauthorized"))
        }
    }
}

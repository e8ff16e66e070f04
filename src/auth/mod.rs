use actix_web::{
    Error as ActixError, FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized,
    web::Data,
};
use anyhow::{Result, anyhow};
use bcrypt::verify;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::future::{Ready, ready};
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::database::models::User;
use crate::database::repositories::UserRepository;

type HmacSha256 = Hmac<Sha256>;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub staff: bool,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> i64 {
        self.sub
    }

    pub fn requires_staff(&self) -> Result<(), crate::error::AppError> {
        if self.staff {
            Ok(())
        } else {
            Err(crate::error::AppError::PermissionDenied(
                "Staff access required".to_string(),
            ))
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    if let Some(header) = req.headers().get("Authorization") {
        if let Ok(value) = header.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }
    // Autologin sets a cookie instead of a header.
    req.cookie(AUTH_COOKIE).map(|c| c.value().to_string())
}

impl FromRequest for Claims {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(token) = bearer_token(req) else {
            return ready(Err(ErrorUnauthorized(
                "Missing or invalid authorization header",
            )));
        };

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(ErrorUnauthorized("Server configuration missing")));
        };

        match decode::<Claims>(
            &token,
            &DecodingKey::from_secret(config.jwt_secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        ) {
            Ok(token_data) => ready(Ok(token_data.claims)),
            Err(_) => ready(Err(ErrorUnauthorized("Invalid token"))),
        }
    }
}

/// Claims for an optionally authenticated caller; anonymous requests get
/// `OptionalClaims(None)` instead of a 401.
pub struct OptionalClaims(pub Option<Claims>);

impl FromRequest for OptionalClaims {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        match Claims::from_request(req, payload).into_inner() {
            Ok(claims) => ready(Ok(OptionalClaims(Some(claims)))),
            Err(_) => ready(Ok(OptionalClaims(None))),
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    config: Config,
}

impl AuthService {
    pub fn new(users: UserRepository, config: Config) -> Self {
        Self { users, config }
    }

    pub fn generate_token(&self, user: &User) -> Result<String> {
        let expiration = Utc::now() + Duration::days(self.config.jwt_expiration_days);
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            staff: user.is_staff,
            exp: expiration.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )
        .map_err(|e| anyhow!("Failed to generate token: {}", e))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String)> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| anyhow!("Invalid credentials"))?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or_else(|| anyhow!("Invalid credentials"))?;
        if !verify(password, hash)? {
            return Err(anyhow!("Invalid credentials"));
        }
        if !user.is_active {
            return Err(anyhow!("Account is disabled"));
        }

        self.users.update_last_login(user.id, Utc::now()).await?;
        let token = self.generate_token(&user)?;
        Ok((user, token))
    }

    /// Deep-link secret: an HMAC over the user id and their last login,
    /// keyed by the server secret. Changing `last_login` (i.e. any login)
    /// invalidates all outstanding links without a revocation store.
    pub fn autologin_secret(&self, user_id: i64, last_login: Option<DateTime<Utc>>) -> String {
        let payload = format!(
            "{}|{}",
            user_id,
            last_login.map(|t| t.timestamp().to_string()).unwrap_or_default()
        );

        let mut mac = HmacSha256::new_from_slice(self.config.jwt_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());
        digest[..32].to_string()
    }

    /// Constant-time comparison; the secret is attacker-supplied.
    pub fn check_autologin_secret(&self, user: &User, secret: &str) -> bool {
        let expected = self.autologin_secret(user.id, user.last_login);
        bool::from(expected.as_bytes().ct_eq(secret.as_bytes()))
    }

    pub fn autologin_url(&self, user: &User, target_path: &str) -> String {
        format!(
            "{}/go/{}/{}/{}",
            self.config.site_url,
            user.id,
            self.autologin_secret(user.id, user.last_login),
            target_path.trim_start_matches('/')
        )
    }
}

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use spg_common::Secret;
use storefront_engine::db_types::{Role, User};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id.
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

impl JwtClaims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ServerError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServerError::InsufficientPermissions("This action requires the admin role.".to_string()))
        }
    }
}

/// Extracts the verified claims for a handler. The token is either already verified and stashed in the request
/// extensions by the ACL middleware, or verified here directly from the `Authorization` header.
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        if let Some(claims) = req.extensions().get::<JwtClaims>() {
            return ready(Ok(claims.clone()));
        }
        let result = match req.app_data::<actix_web::web::Data<TokenVerifier>>() {
            Some(verifier) => verifier.verify_request(req).map_err(ServerError::from),
            None => Err(ServerError::Unspecified("No token verifier is registered.".to_string())),
        };
        ready(result)
    }
}

fn bearer_token(req: &HttpRequest) -> Result<String, AuthError> {
    let header = req.headers().get("Authorization").ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|_| AuthError::MissingToken)?;
    value
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

//-------------------------------------------------  TokenIssuer  -----------------------------------------------------
pub struct TokenIssuer {
    secret: Secret<String>,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { secret: config.jwt_secret.clone(), ttl_secs: config.token_ttl.as_secs() }
    }

    /// Issues an access token for a freshly authenticated user. Credential checks happen before this is called.
    pub fn issue_token(&self, user: &User) -> Result<String, ServerError> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let exp = (Utc::now().timestamp() as u64 + self.ttl_secs) as usize;
        let claims = JwtClaims {
            sub: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            exp,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.reveal().as_bytes()))
            .map_err(|e| ServerError::Unspecified(format!("Could not sign the access token. {e}")))
    }
}

//-------------------------------------------------  TokenVerifier  ---------------------------------------------------
#[derive(Clone)]
pub struct TokenVerifier {
    secret: Secret<String>,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self { secret: config.jwt_secret.clone() }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.reveal().as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::InvalidToken("expired".to_string()),
            _ => AuthError::InvalidToken(e.to_string()),
        })?;
        Ok(data.claims)
    }

    pub fn verify_request(&self, req: &HttpRequest) -> Result<JwtClaims, AuthError> {
        let token = bearer_token(req)?;
        self.verify(&token)
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use storefront_engine::db_types::{Role, User};

    use super::{TokenIssuer, TokenVerifier};
    use crate::config::AuthConfig;

    fn test_user(role: Role) -> User {
        User {
            id: "usr-1".to_string(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_tokens_verify() {
        let config = AuthConfig::default();
        let issuer = TokenIssuer::new(&config);
        let verifier = TokenVerifier::new(&config);
        let token = issuer.issue_token(&test_user(Role::Admin)).unwrap();
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, "usr-1");
        assert!(claims.is_admin());
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let verifier = TokenVerifier::new(&AuthConfig::default());
        let token = issuer.issue_token(&test_user(Role::User)).unwrap();
        assert!(verifier.verify(&token).is_err());
    }
}

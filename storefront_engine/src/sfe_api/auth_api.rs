use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use log::debug;

use crate::{
    db_types::{NewUser, Role, User},
    sfe_api::errors::AuthApiError,
    traits::{AuthManagement, PersistenceError, StorefrontDatabase},
};

/// Registration and credential verification. Stores argon2id hashes only; the JWT issuing happens in the server
/// crate, on top of the [`User`] this API returns.
pub struct AuthApi<B> {
    db: B,
}

impl<B> AuthApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AuthApi<B>
where B: StorefrontDatabase
{
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthApiError> {
        if name.trim().is_empty() {
            return Err(AuthApiError::Validation("A name is required.".to_string()));
        }
        if !email.contains('@') {
            return Err(AuthApiError::Validation("That does not look like an email address.".to_string()));
        }
        if password.len() < 8 {
            return Err(AuthApiError::Validation("Passwords must be at least 8 characters.".to_string()));
        }
        let password_hash = hash_password(password)?;
        let user = NewUser { name: name.trim().to_string(), email: email.to_string(), password_hash, role: Role::User };
        match self.db.create_user(user).await {
            Ok(u) => {
                debug!("🔐️ Registered user {} ({})", u.id, u.email);
                Ok(u)
            },
            Err(PersistenceError::DuplicateEmail(email)) => Err(AuthApiError::EmailTaken(email)),
            Err(e) => Err(e.into()),
        }
    }

    /// Verifies the credentials and returns the account. A missing account and a wrong password are
    /// indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthApiError> {
        let user = self.db.fetch_user_by_email(email).await?.ok_or(AuthApiError::InvalidCredentials)?;
        if verify_password(&user.password_hash, password)? {
            Ok(user)
        } else {
            Err(AuthApiError::InvalidCredentials)
        }
    }

    pub async fn fetch_user(&self, id: &str) -> Result<Option<User>, AuthApiError> {
        Ok(self.db.fetch_user_by_id(id).await?)
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthApiError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(stored_hash: &str, provided: &str) -> Result<bool, AuthApiError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AuthApiError::Hashing(e.to_string()))?;
    match Argon2::default().verify_password(provided.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthApiError::Hashing(e.to_string())),
    }
}

#[cfg(test)]
mod test {
    use super::{hash_password, verify_password};

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password(&hash, "correct horse battery staple").unwrap());
        assert!(!verify_password(&hash, "incorrect horse").unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }
}

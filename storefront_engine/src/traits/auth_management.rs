use crate::{
    db_types::{NewUser, User},
    traits::PersistenceError,
};

/// User storage for the identity service. Password hashing happens in [`crate::AuthApi`]; this layer only ever sees
/// the hash.
#[allow(async_fn_in_trait)]
pub trait AuthManagement: Clone {
    /// Fails with [`PersistenceError::DuplicateEmail`] if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, PersistenceError>;

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, PersistenceError>;

    async fn fetch_user_by_id(&self, id: &str) -> Result<Option<User>, PersistenceError>;
}

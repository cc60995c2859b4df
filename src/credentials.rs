use std::sync::Arc;

use bcrypt::{hash, verify};
use tracing::info;
use uuid::Uuid;

use crate::db::Store;
use crate::error::CredentialError;

/// Verifies and provisions username/password identities. Plaintext
/// passwords never reach the store.
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn Store>,
    cost: u32,
}

impl CredentialService {
    pub fn new(store: Arc<dyn Store>, cost: u32) -> Self {
        Self { store, cost }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Uuid, CredentialError> {
        let hashed = hash(password, self.cost)?;
        let user = self.store.create_user(username, &hashed).await?;
        info!(user_id = %user.id, username, "registered user");
        Ok(user.id)
    }

    /// bcrypt re-derives the hash with the stored salt and cost and compares
    /// in constant time.
    pub async fn login(&self, username: &str, password: &str) -> Result<Uuid, CredentialError> {
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or(CredentialError::NoSuchUser)?;

        if verify(password, &user.password_hash)? {
            Ok(user.id)
        } else {
            Err(CredentialError::WrongPassword)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service() -> (CredentialService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CredentialService::new(store.clone(), 4), store)
    }

    #[tokio::test]
    async fn register_then_login() {
        let (creds, store) = service();
        let id = creds.register("kody", "twixrox").await.unwrap();

        let stored = store.find_user_by_id(id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "twixrox");

        assert_eq!(creds.login("kody", "twixrox").await.unwrap(), id);
    }

    #[tokio::test]
    async fn login_rejects_unknown_user_and_bad_password() {
        let (creds, _) = service();
        creds.register("kody", "twixrox").await.unwrap();

        assert!(matches!(
            creds.login("nobody", "twixrox").await,
            Err(CredentialError::NoSuchUser)
        ));
        assert!(matches!(
            creds.login("kody", "twixrax").await,
            Err(CredentialError::WrongPassword)
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (creds, _) = service();
        creds.register("kody", "twixrox").await.unwrap();
        assert!(matches!(
            creds.register("kody", "another").await,
            Err(CredentialError::UsernameTaken)
        ));
    }
}

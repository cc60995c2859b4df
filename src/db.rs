use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Joke, JokeListItem, NewJoke, User};

/// Record access used by the services and handlers. Every call is a single
/// round trip; implementations provide their own concurrency control.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create_joke(&self, joke: NewJoke) -> Result<Joke, StoreError>;

    async fn find_joke(&self, id: Uuid) -> Result<Option<Joke>, StoreError>;

    async fn count_jokes(&self) -> Result<u64, StoreError>;

    /// Jokes in insertion order: skip `offset`, take one.
    async fn joke_at_offset(&self, offset: u64) -> Result<Option<Joke>, StoreError>;

    /// Newest jokes first.
    async fn recent_jokes(&self, limit: usize) -> Result<Vec<JokeListItem>, StoreError>;
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    usernames: HashMap<String, Uuid>,
    jokes: Vec<Joke>,
}

/// In-process store. State is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.usernames.contains_key(username) {
            return Err(StoreError::UniqueViolation { field: "username" });
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.usernames.insert(user.username.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn create_joke(&self, joke: NewJoke) -> Result<Joke, StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&joke.jokester_id) {
            return Err(StoreError::MissingRecord);
        }

        let joke = Joke {
            id: Uuid::new_v4(),
            name: joke.name,
            content: joke.content,
            jokester_id: joke.jokester_id,
            created_at: Utc::now(),
        };
        tables.jokes.push(joke.clone());
        Ok(joke)
    }

    async fn find_joke(&self, id: Uuid) -> Result<Option<Joke>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.jokes.iter().find(|j| j.id == id).cloned())
    }

    async fn count_jokes(&self) -> Result<u64, StoreError> {
        Ok(self.tables.lock().await.jokes.len() as u64)
    }

    async fn joke_at_offset(&self, offset: u64) -> Result<Option<Joke>, StoreError> {
        let tables = self.tables.lock().await;
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(None);
        };
        Ok(tables.jokes.get(offset).cloned())
    }

    async fn recent_jokes(&self, limit: usize) -> Result<Vec<JokeListItem>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .jokes
            .iter()
            .rev()
            .take(limit)
            .map(JokeListItem::from)
            .collect())
    }
}

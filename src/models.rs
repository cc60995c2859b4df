use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The part of a [`User`] that may leave the server.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Joke {
    pub id: Uuid,
    pub name: String,
    pub content: String,
    pub jokester_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJoke {
    pub name: String,
    pub content: String,
    pub jokester_id: Uuid,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JokeListItem {
    pub id: Uuid,
    pub name: String,
}

impl From<&Joke> for JokeListItem {
    fn from(joke: &Joke) -> Self {
        Self {
            id: joke.id,
            name: joke.name.clone(),
        }
    }
}

/// Fields of the new-joke form. Missing fields stay `None`.
#[derive(Debug, Default, Deserialize)]
pub struct NewJokeForm {
    pub name: Option<String>,
    pub content: Option<String>,
}

/// Fields of the combined login/register form.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub login_type: Option<String>,
    pub redirect_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    pub redirect_to: Option<String>,
}

/// Body of every 400 response: per-field errors, a form-level error and the
/// submitted values so the client can re-render the form.
#[derive(Debug, Default, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionData {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: BTreeMap<&'static str, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_error: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<&'static str, String>,
}

impl ActionData {
    pub fn form_error(message: impl Into<String>) -> Self {
        Self {
            form_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Records `error` against `field` if there is one.
    pub fn field(mut self, field: &'static str, error: Option<String>) -> Self {
        if let Some(error) = error {
            self.field_errors.insert(field, error);
        }
        self
    }

    pub fn value(mut self, field: &'static str, value: &str) -> Self {
        self.values.insert(field, value.to_owned());
        self
    }

    pub fn with_form_error(mut self, message: impl Into<String>) -> Self {
        self.form_error = Some(message.into());
        self
    }

    pub fn has_field_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

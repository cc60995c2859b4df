use actix_web::{get, http::header, post, web, HttpResponse};
use rand::Rng;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth::{get_user, CurrentUser, RequireUser};
use crate::error::AppError;
use crate::models::{ActionData, Joke, NewJoke, NewJokeForm};
use crate::AppState;

const MIN_NAME_LEN: usize = 10;
const MIN_CONTENT_LEN: usize = 10;
const JOKE_LIST_LEN: usize = 5;

pub fn validate_name(name: Option<&str>) -> Option<String> {
    match name {
        None => Some("You must provide a name".to_string()),
        Some(n) if n.chars().count() < MIN_NAME_LEN => {
            Some("That joke's name is too short".to_string())
        }
        Some(_) => None,
    }
}

pub fn validate_content(content: Option<&str>) -> Option<String> {
    match content {
        None => Some("You must provide a joke content".to_string()),
        Some(c) if c.chars().count() < MIN_CONTENT_LEN => Some("That joke is too short".to_string()),
        Some(_) => None,
    }
}

#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "title": "Jokes: So great, it's funny!",
        "description": "Home of the jokes app. Read a joke, add your own.",
    }))
}

/// Picks a joke uniformly at random. The count is checked first so an empty
/// table never produces an offset.
pub async fn random_joke(state: &AppState) -> Result<Joke, AppError> {
    let count = state.store.count_jokes().await?;
    if count == 0 {
        return Err(AppError::NotFound("No random joke found".to_string()));
    }

    let offset = rand::thread_rng().gen_range(0..count);
    state
        .store
        .joke_at_offset(offset)
        .await?
        .ok_or_else(|| AppError::NotFound("No random joke found".to_string()))
}

#[get("/jokes")]
pub async fn jokes_index(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let random_joke = random_joke(&state).await?;
    let joke_list_items = state.store.recent_jokes(JOKE_LIST_LEN).await?;
    let user = get_user(&state, user.0).await?;

    Ok(HttpResponse::Ok().json(json!({
        "randomJoke": random_joke,
        "jokeListItems": joke_list_items,
        "user": user,
    })))
}

#[get("/jokes/new")]
pub async fn new_joke_page(_user: RequireUser) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "fields": ["name", "content"] }))
}

#[post("/jokes/new")]
pub async fn create_joke(
    user: RequireUser,
    form: web::Form<NewJokeForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let RequireUser(user_id) = user;
    let form = form.into_inner();

    let (Some(name), Some(content)) = (form.name.as_deref(), form.content.as_deref()) else {
        return Err(AppError::BadRequest(
            ActionData::default()
                .field("name", validate_name(form.name.as_deref()))
                .field("content", validate_content(form.content.as_deref())),
        ));
    };

    let checked = ActionData::default()
        .field("name", validate_name(Some(name)))
        .field("content", validate_content(Some(content)));
    if checked.has_field_errors() {
        return Err(AppError::BadRequest(
            checked.value("name", name).value("content", content),
        ));
    }

    let joke = state
        .store
        .create_joke(NewJoke {
            name: name.to_string(),
            content: content.to_string(),
            jokester_id: user_id,
        })
        .await?;
    info!(joke_id = %joke.id, %user_id, "joke created");

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, format!("/jokes/{}", joke.id)))
        .finish())
}

#[get("/jokes/{joke_id}")]
pub async fn joke_detail(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let not_found = || AppError::NotFound("What a joke! Not found.".to_string());

    let id = Uuid::parse_str(&path).map_err(|_| not_found())?;
    let joke = state.store.find_joke(id).await?.ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(json!({ "joke": joke })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_field_uses_its_own_rule() {
        assert_eq!(
            validate_name(None).as_deref(),
            Some("You must provide a name")
        );
        assert_eq!(
            validate_content(None).as_deref(),
            Some("You must provide a joke content")
        );
        assert_eq!(
            validate_name(Some("short")).as_deref(),
            Some("That joke's name is too short")
        );
        assert_eq!(
            validate_content(Some("short")).as_deref(),
            Some("That joke is too short")
        );
        assert_eq!(validate_name(Some("Road worker")), None);
        assert_eq!(validate_content(Some("I never wanted to believe")), None);
    }
}
